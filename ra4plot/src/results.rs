//! Assembly of the per-bin results.

use super::datacard::Datacard;
use super::error::{Error, Result};
use super::fit_result::{Parameter, ResultFile};
use super::layout::{FitFile, Layout};
use super::stats::{self, Uncertainty};
use log::{debug, info, warn};
use std::path::Path;

/// The three fit-result files of a [`Layout`].
#[derive(Clone, Debug, Default)]
pub struct FitFiles {
    /// Pre-fit parameters.
    pub prefit: ResultFile,
    /// Post-fit parameters.
    pub postfit: ResultFile,
    /// Parameters of the bins not in the multidimensional fit.
    pub auxiliary: ResultFile,
}

impl FitFiles {
    /// Reads the files named in `layout` from `dir`.
    ///
    /// # Errors
    ///
    /// Returns an error if one of the files can not be read.
    pub fn read(layout: &Layout, dir: &Path) -> Result<Self> {
        let read = |name: &Path| {
            let path = dir.join(name);
            info!("reading fit result `{}`", path.display());
            ResultFile::read(&path)
        };

        Ok(Self {
            prefit: read(&layout.inputs.prefit)?,
            postfit: read(&layout.inputs.postfit)?,
            auxiliary: read(&layout.inputs.auxiliary)?,
        })
    }

    /// Returns the file selected by `file`.
    #[must_use]
    pub const fn get(&self, file: FitFile) -> &ResultFile {
        match file {
            FitFile::Prefit => &self.prefit,
            FitFile::Postfit => &self.postfit,
            FitFile::Auxiliary => &self.auxiliary,
        }
    }
}

/// Pulls of a single bin. A pull is `None` if one of its uncertainties vanishes.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct Pulls {
    /// Data against the pre-fit background.
    pub prefit: Option<f64>,
    /// Data against the post-fit background.
    pub postfit: Option<f64>,
    /// Signal+background against the pre-fit background.
    pub signal: Option<f64>,
}

/// Everything shown in the figure for one bin.
#[derive(Clone, Debug, PartialEq)]
pub struct BinResult {
    /// Name of the bin in the datacard.
    pub name: String,
    /// Region and subregion the bin belongs to.
    pub region: String,
    /// Pre-fit background.
    pub prefit: Parameter,
    /// Post-fit background.
    pub postfit: Parameter,
    /// Observed count.
    pub data: f64,
    /// Poisson errors of the observed count.
    pub data_error: Uncertainty,
    /// Signal yield added to the pre-fit background.
    pub signal: f64,
    /// Poisson errors of [`BinResult::signal`]. They depend only on the expectation itself, so a
    /// bin without observed events still has a finite downward error.
    pub signal_error: Uncertainty,
    /// Pulls.
    pub pulls: Pulls,
}

impl BinResult {
    /// `true` if the observation lies below the pre-fit background. This decides which side of
    /// the uncertainties enters the pulls of the data.
    #[must_use]
    pub fn below_prefit(&self) -> bool {
        self.data < self.prefit.value
    }
}

/// The results of all bins of a [`Layout`], in layout order.
#[derive(Clone, Debug)]
pub struct Results {
    layout: Layout,
    bins: Vec<BinResult>,
}

fn pull_or_warn(bin: &str, what: &str, pull: Result<f64>) -> Option<f64> {
    match pull {
        Ok(pull) => Some(pull),
        Err(err) => {
            warn!("no {what} pull for bin `{bin}`: {err}");
            None
        }
    }
}

impl Results {
    /// Reads the inputs of `layout` from `dir` and computes the results of every bin.
    ///
    /// # Errors
    ///
    /// Returns an error if an input can not be read or does not contain the quantities
    /// `layout` refers to.
    pub fn load(layout: Layout, dir: &Path) -> Result<Self> {
        let fits = FitFiles::read(&layout, dir)?;
        let path = dir.join(&layout.inputs.datacard);
        info!("reading datacard `{}`", path.display());
        let datacard = Datacard::read(&path)?;

        Self::new(layout, &fits, &datacard)
    }

    /// Computes the results of every bin of `layout` from already read inputs.
    ///
    /// # Errors
    ///
    /// Returns an error if a parameter, datacard column or signal rate referenced by `layout`
    /// is missing, or if a count is invalid.
    pub fn new(layout: Layout, fits: &FitFiles, datacard: &Datacard) -> Result<Self> {
        layout.validate()?;

        let regions = layout.bin_regions();
        let mut bins = Vec::with_capacity(layout.bins());

        for (index, (source, region)) in layout.bins.iter().zip(regions).enumerate() {
            let prefit = fits
                .get(source.prefit.file)
                .parameter(&source.prefit.list, source.prefit.index)?
                .clone();
            let postfit = fits
                .get(source.postfit.file)
                .parameter(&source.postfit.list, source.postfit.index)?
                .clone();
            let (name, data) = datacard.observation(source.data_column)?;

            let signal_yield = match &layout.signal.process {
                Some(process) => datacard.rate(process, name).ok_or_else(|| {
                    Error::Layout(format!("process `{process}` has no rate in bin `{name}`"))
                })?,
                None => layout.signal.yields[index],
            };
            let signal = signal_yield + prefit.value;

            let data_error = stats::poisson_errors(data)?;
            // independent of the observed count, see `BinResult::signal_error`
            let signal_error = stats::poisson_errors(signal)?;

            let below = data < prefit.value;
            let pulls = Pulls {
                prefit: pull_or_warn(
                    name,
                    "pre-fit",
                    stats::facing_pull(
                        data,
                        data_error,
                        prefit.value,
                        prefit.uncertainty(),
                        below,
                    ),
                ),
                // the side is chosen by the pre-fit comparison for both data pulls
                postfit: pull_or_warn(
                    name,
                    "post-fit",
                    stats::facing_pull(
                        data,
                        data_error,
                        postfit.value,
                        postfit.uncertainty(),
                        below,
                    ),
                ),
                signal: pull_or_warn(
                    name,
                    "signal",
                    stats::combined_pull(signal, signal_error.down, prefit.value, prefit.up()),
                ),
            };

            bins.push(BinResult {
                name: name.to_owned(),
                region,
                prefit,
                postfit,
                data,
                data_error,
                signal,
                signal_error,
                pulls,
            });
        }

        debug!("assembled {} bins", bins.len());

        Ok(Self { layout, bins })
    }

    /// The layout these results were computed for.
    #[must_use]
    pub const fn layout(&self) -> &Layout {
        &self.layout
    }

    /// Results of each bin.
    #[must_use]
    pub fn bins(&self) -> &[BinResult] {
        &self.bins
    }

    /// The fitted backgrounds and observations as parameter lists `prefit_values`,
    /// `postfit_values` and `observed_values`. Observations are named after their datacard bin
    /// and carry their Poisson errors.
    #[must_use]
    pub fn summary(&self) -> ResultFile {
        let mut summary = ResultFile::default();

        summary.insert(
            "prefit_values",
            self.bins.iter().map(|bin| bin.prefit.clone()).collect(),
        );
        summary.insert(
            "postfit_values",
            self.bins.iter().map(|bin| bin.postfit.clone()).collect(),
        );
        summary.insert(
            "observed_values",
            self.bins
                .iter()
                .map(|bin| Parameter {
                    name: bin.name.clone(),
                    value: bin.data,
                    error_hi: bin.data_error.up,
                    error_lo: -bin.data_error.down,
                })
                .collect(),
        );

        summary
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::layout::{BinSource, ParameterRef, Region, Subregion};
    use float_cmp::assert_approx_eq;

    fn parameter(name: &str, value: f64, up: f64, down: f64) -> Parameter {
        Parameter {
            name: name.to_owned(),
            value,
            error_hi: up,
            error_lo: -down,
        }
    }

    /// A layout with three bins, the first two from the multidimensional fits, the last one
    /// from the auxiliary file.
    pub(crate) fn small_layout() -> Layout {
        let mut layout = Layout::default();

        layout.bins = vec![
            BinSource {
                prefit: ParameterRef {
                    file: FitFile::Prefit,
                    list: "fit_mdf".to_owned(),
                    index: 1,
                },
                postfit: ParameterRef {
                    file: FitFile::Postfit,
                    list: "fit_mdf".to_owned(),
                    index: 1,
                },
                data_column: 2,
            },
            BinSource {
                prefit: ParameterRef {
                    file: FitFile::Prefit,
                    list: "fit_mdf".to_owned(),
                    index: 0,
                },
                postfit: ParameterRef {
                    file: FitFile::Postfit,
                    list: "fit_mdf".to_owned(),
                    index: 0,
                },
                data_column: 0,
            },
            BinSource {
                prefit: ParameterRef {
                    file: FitFile::Auxiliary,
                    list: "prefit".to_owned(),
                    index: 0,
                },
                postfit: ParameterRef {
                    file: FitFile::Auxiliary,
                    list: "postfit".to_owned(),
                    index: 0,
                },
                data_column: 1,
            },
        ];
        layout.signal.yields = vec![1.0, 2.0, 0.5];
        layout.regions = vec![
            Region {
                label: "Resolved".to_owned(),
                subregions: vec![Subregion {
                    label: "3b".to_owned(),
                    variable: "MET".to_owned(),
                    ranges: vec!["low".to_owned(), "high".to_owned()],
                }],
            },
            Region {
                label: "Boosted".to_owned(),
                subregions: vec![Subregion {
                    label: "1H".to_owned(),
                    variable: "MET".to_owned(),
                    ranges: vec!["all".to_owned()],
                }],
            },
        ];

        layout
    }

    pub(crate) fn small_inputs() -> (FitFiles, Datacard) {
        let mut fits = FitFiles::default();

        fits.prefit.insert(
            "fit_mdf",
            vec![
                parameter("r", 5.0, 0.1, 0.1),
                parameter("bin_a", 8.0, 2.0, 1.0),
            ],
        );
        fits.postfit.insert(
            "fit_mdf",
            vec![
                parameter("r", 1.0, 0.3, 0.2),
                parameter("bin_a", 10.0, 1.5, 1.25),
            ],
        );
        fits.auxiliary
            .insert("prefit", vec![parameter("boosted_0", 2.5, 0.5, 0.0)]);
        fits.auxiliary
            .insert("postfit", vec![parameter("boosted_0", 2.0, 0.4, 0.3)]);

        let datacard = Datacard::parse(
            "bin b1 b2 b3\nobservation 4 0 12\n\
             bin b1 b1 b2 b2 b3 b3\n\
             process sig bkg sig bkg sig bkg\n\
             process 0 1 0 1 0 1\n\
             rate 0.25 1 0.75 1 3.5 1\n",
        )
        .unwrap();

        (fits, datacard)
    }

    #[test]
    fn assemble_bins() {
        let (fits, datacard) = small_inputs();
        let results = Results::new(small_layout(), &fits, &datacard).unwrap();
        let bins = results.bins();

        assert_eq!(bins.len(), 3);
        assert_eq!(
            bins.iter().map(|bin| bin.name.as_str()).collect::<Vec<_>>(),
            ["b3", "b1", "b2"]
        );
        assert_eq!(bins[0].region, "Resolved/3b");
        assert_eq!(bins[2].region, "Boosted/1H");
        assert_eq!(bins[0].prefit.name, "bin_a");
        assert_eq!(bins[0].postfit.value, 10.0);
        assert_eq!(bins[0].data, 12.0);
        assert_eq!(bins[0].signal, 9.0);
        assert_eq!(bins[2].signal, 3.0);
    }

    #[test]
    fn pulls_follow_closed_form() {
        let (fits, datacard) = small_inputs();
        let results = Results::new(small_layout(), &fits, &datacard).unwrap();

        // data above the background: data down error, background up error
        let bin = &results.bins()[0];
        assert!(!bin.below_prefit());
        assert_approx_eq!(
            f64,
            bin.pulls.prefit.unwrap(),
            4.0 / f64::hypot(bin.data_error.down, 2.0),
            epsilon = 1e-12
        );
        assert_approx_eq!(
            f64,
            bin.pulls.postfit.unwrap(),
            2.0 / f64::hypot(bin.data_error.down, 1.5),
            epsilon = 1e-12
        );
        assert_approx_eq!(
            f64,
            bin.pulls.signal.unwrap(),
            1.0 / f64::hypot(bin.signal_error.down, 2.0),
            epsilon = 1e-12
        );

        // data below the background: data up error, background down error
        let bin = &results.bins()[1];
        assert!(bin.below_prefit());
        assert!(bin.pulls.prefit.unwrap() < 0.0);
        assert_approx_eq!(
            f64,
            bin.pulls.prefit.unwrap(),
            -1.0 / f64::hypot(bin.data_error.up, 0.1),
            epsilon = 1e-12
        );

        // the data lie above the post-fit background, but the sides follow the pre-fit one
        assert!(bin.data > bin.postfit.value);
        assert_approx_eq!(
            f64,
            bin.pulls.postfit.unwrap(),
            3.0 / f64::hypot(bin.data_error.up, 0.2),
            epsilon = 1e-12
        );
    }

    #[test]
    fn signal_interval_ignores_observation() {
        let (fits, datacard) = small_inputs();
        let results = Results::new(small_layout(), &fits, &datacard).unwrap();
        let bin = &results.bins()[2];

        assert_eq!(bin.data, 0.0);
        assert_eq!(bin.signal, 3.0);
        assert_eq!(bin.signal_error, stats::poisson_errors(3.0).unwrap());
        assert!(bin.signal_error.down < bin.signal);
        assert_approx_eq!(
            f64,
            bin.pulls.signal.unwrap(),
            0.5 / f64::hypot(bin.signal_error.down, 0.5),
            epsilon = 1e-12
        );
    }

    #[test]
    fn degenerate_pull_is_skipped() {
        let (fits, datacard) = small_inputs();
        let results = Results::new(small_layout(), &fits, &datacard).unwrap();

        // the auxiliary pre-fit background has no downward error and lies above the data
        let bin = &results.bins()[2];
        assert!(bin.below_prefit());
        assert_eq!(bin.pulls.prefit, None);
        assert!(bin.pulls.postfit.is_some());
        assert!(bin.pulls.signal.is_some());
    }

    #[test]
    fn signal_from_datacard() {
        let (fits, datacard) = small_inputs();
        let mut layout = small_layout();
        layout.signal.process = Some("sig".to_owned());
        layout.signal.yields.clear();

        let results = Results::new(layout.clone(), &fits, &datacard).unwrap();

        assert_eq!(results.bins()[0].signal, 11.5);
        assert_eq!(results.bins()[1].signal, 5.25);

        layout.signal.process = Some("other".to_owned());

        assert_eq!(
            Results::new(layout, &fits, &datacard)
                .unwrap_err()
                .to_string(),
            "invalid layout: process `other` has no rate in bin `b3`"
        );
    }

    #[test]
    fn missing_inputs() {
        let (mut fits, datacard) = small_inputs();
        let mut layout = small_layout();
        layout.bins[2].data_column = 3;

        assert!(matches!(
            Results::new(layout, &fits, &datacard),
            Err(Error::Datacard { line: 2, .. })
        ));

        fits.auxiliary.insert("postfit", Vec::new());

        assert!(matches!(
            Results::new(small_layout(), &fits, &datacard),
            Err(Error::MissingParameter { index: 0, .. })
        ));
    }

    #[test]
    fn summary_lists() {
        let (fits, datacard) = small_inputs();
        let results = Results::new(small_layout(), &fits, &datacard).unwrap();
        let summary = results.summary();

        assert_eq!(
            summary.list_names().collect::<Vec<_>>(),
            ["observed_values", "postfit_values", "prefit_values"]
        );

        let observed = summary.list("observed_values").unwrap();

        assert_eq!(observed[1].name, "b1");
        assert_eq!(observed[1].value, 4.0);
        assert!(observed[1].error_lo < 0.0);
        assert_eq!(summary.parameter("prefit_values", 2).unwrap().name, "boosted_0");
    }
}
