//! Where each bin of the figure comes from and how the figure is annotated.

use super::convert::f64_from_usize;
use super::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Positions of the resolved bins in the parameter list of the multidimensional fits.
const RESOLVED_PARAMETERS: [usize; 16] = [
    50, 52, 54, 56, 58, 60, 62, 64, 49, 51, 53, 55, 57, 59, 61, 63,
];

/// Columns of the observation block belonging to the figure's bins.
const DATA_COLUMNS: [usize; 22] = [
    23, 35, 47, 59, 24, 36, 48, 60, 17, 29, 41, 53, 18, 30, 42, 54, 3, 4, 5, 0, 1, 2,
];

const SIGNAL_YIELDS: [f64; 22] = [
    1.36, 5.06, 6.49, 5.17, 2.53, 9.76, 12.12, 10.76, 1.40, 4.18, 3.77, 2.43, 3.45, 10.18, 8.94,
    6.15, 3.21, 0.61, 0.13, 9.76, 1.46, 0.24,
];

const PTMISS: &str = "pₜᵐⁱˢˢ [GeV]";

/// The input files.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Inputs {
    /// Fit result holding the pre-fit background parameters.
    pub prefit: PathBuf,
    /// Fit result holding the post-fit background parameters.
    pub postfit: PathBuf,
    /// Additional fit result, used for bins not part of the multidimensional fit.
    pub auxiliary: PathBuf,
    /// Datacard with the observed counts.
    pub datacard: PathBuf,
}

/// Selects one of the fit-result files of [`Inputs`].
#[derive(Clone, Copy, Debug, Deserialize, Eq, Ord, PartialEq, PartialOrd, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FitFile {
    /// [`Inputs::prefit`].
    Prefit,
    /// [`Inputs::postfit`].
    Postfit,
    /// [`Inputs::auxiliary`].
    Auxiliary,
}

/// Address of a single fitted parameter.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ParameterRef {
    /// File the parameter is read from.
    pub file: FitFile,
    /// Name of the parameter list.
    pub list: String,
    /// Position in the parameter list.
    pub index: usize,
}

impl ParameterRef {
    fn new(file: FitFile, list: &str, index: usize) -> Self {
        Self {
            file,
            list: list.to_owned(),
            index,
        }
    }
}

/// Sources of a single bin.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct BinSource {
    /// Pre-fit background.
    pub prefit: ParameterRef,
    /// Post-fit background.
    pub postfit: ParameterRef,
    /// Zero-based column of the datacard's observation block, not counting the keyword.
    pub data_column: usize,
}

/// Signal model added on top of the pre-fit background.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Signal {
    /// Legend entry of the signal+background overlay.
    pub label: String,
    /// If given, the signal yields are the datacard rates of this process.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub process: Option<String>,
    /// Signal yields per bin, used if `process` is not given.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub yields: Vec<f64>,
}

/// A group of consecutive bins sharing one selection, for instance the b-tag multiplicity.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Subregion {
    /// Label printed above the group.
    pub label: String,
    /// Name of the variable that is binned within the group.
    pub variable: String,
    /// Range label of each bin.
    pub ranges: Vec<String>,
}

/// A group of subregions forming an analysis region.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Region {
    /// Label printed above the region.
    pub label: String,
    /// The subregions, in bin order.
    pub subregions: Vec<Subregion>,
}

impl Region {
    /// Number of bins in this region.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.subregions.iter().map(|sub| sub.ranges.len()).sum()
    }
}

/// Texts and ranges of the figure.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Labels {
    /// Experiment label in the top-left corner.
    pub experiment: String,
    /// Appended to the experiment label for preliminary figures.
    pub preliminary: String,
    /// Luminosity and energy in the top-right corner.
    pub luminosity: String,
    /// Legend entry of the pre-fit background.
    pub prefit: String,
    /// Legend entry of the post-fit background.
    pub postfit: String,
    /// Legend entry of the data.
    pub data: String,
    /// Lower end of the logarithmic yield axis.
    pub y_min: f64,
    /// Upper end of the logarithmic yield axis.
    pub y_max: f64,
    /// The pull axis spans `-pull_max` to `pull_max`.
    pub pull_max: f64,
}

/// Everything that ties the input files to the figure.
#[derive(Clone, Debug, Deserialize, PartialEq, Serialize)]
#[serde(deny_unknown_fields)]
pub struct Layout {
    /// Input files, relative to the input directory.
    pub inputs: Inputs,
    /// One entry per bin of the figure, in the order they are drawn.
    pub bins: Vec<BinSource>,
    /// Signal model.
    pub signal: Signal,
    /// Regions, covering all bins in order.
    pub regions: Vec<Region>,
    /// Texts and ranges.
    pub labels: Labels,
}

fn subregion(label: &str, ranges: &[&str]) -> Subregion {
    Subregion {
        label: label.to_owned(),
        variable: PTMISS.to_owned(),
        ranges: ranges.iter().map(|&range| range.to_owned()).collect(),
    }
}

impl Default for Layout {
    /// The results figure of the resolved and boosted HH(4b)+ptmiss search, SUS-20-007.
    fn default() -> Self {
        let resolved = RESOLVED_PARAMETERS.iter().map(|&index| {
            (
                ParameterRef::new(FitFile::Prefit, "fit_mdf", index),
                ParameterRef::new(FitFile::Postfit, "fit_mdf", index),
            )
        });
        let boosted = (0..6).map(|index| {
            (
                ParameterRef::new(FitFile::Auxiliary, "prefit", index),
                ParameterRef::new(FitFile::Auxiliary, "postfit", index),
            )
        });
        let bins = resolved
            .chain(boosted)
            .zip(DATA_COLUMNS)
            .map(|((prefit, postfit), data_column)| BinSource {
                prefit,
                postfit,
                data_column,
            })
            .collect();

        let resolved_ranges = ["150-200", "200-300", "300-400", ">400"];
        let boosted_ranges = ["300-500", "500-700", ">700"];

        Self {
            inputs: Inputs {
                prefit: "multidimfit_prefit.yaml".into(),
                postfit: "multidimfit_postfit.yaml".into(),
                auxiliary: "boosted_results.yaml".into(),
                datacard: "datacard_500.txt".into(),
            },
            bins,
            signal: Signal {
                label: "TChiHH(500,1)+bkg".to_owned(),
                process: None,
                yields: SIGNAL_YIELDS.to_vec(),
            },
            regions: vec![
                Region {
                    label: "Resolved, High ΔRₘₐₓ".to_owned(),
                    subregions: vec![
                        subregion("3b", &resolved_ranges),
                        subregion("4b", &resolved_ranges),
                    ],
                },
                Region {
                    label: "Resolved, Low ΔRₘₐₓ".to_owned(),
                    subregions: vec![
                        subregion("3b", &resolved_ranges),
                        subregion("4b", &resolved_ranges),
                    ],
                },
                Region {
                    label: "Boosted".to_owned(),
                    subregions: vec![
                        subregion("1H", &boosted_ranges),
                        subregion("2H", &boosted_ranges),
                    ],
                },
            ],
            labels: Labels {
                experiment: "CMS".to_owned(),
                preliminary: "Preliminary".to_owned(),
                luminosity: "137 fb⁻¹ (13 TeV)".to_owned(),
                prefit: "Pre-fit".to_owned(),
                postfit: "Post-fit".to_owned(),
                data: "Data".to_owned(),
                y_min: 0.051,
                y_max: 7000.0,
                pull_max: 2.9,
            },
        }
    }
}

/// A horizontal interval of bins in figure coordinates, where bin `i` (zero-based) is centred
/// at `i + 1`.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Span {
    /// Left edge.
    pub left: f64,
    /// Right edge.
    pub right: f64,
}

impl Span {
    fn new(first: usize, bins: usize) -> Self {
        Self {
            left: f64_from_usize(first) + 0.5,
            right: f64_from_usize(first + bins) + 0.5,
        }
    }

    /// Midpoint.
    #[must_use]
    pub const fn center(&self) -> f64 {
        0.5 * (self.left + self.right)
    }
}

impl Layout {
    /// Reads a layout from the YAML file at `path` and validates it.
    ///
    /// # Errors
    ///
    /// Returns an error if the file can not be read, is not a valid layout document or if
    /// [`Layout::validate`] fails.
    pub fn from_yaml(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path).map_err(Error::io(path))?;
        let layout: Self = serde_yaml::from_str(&contents).map_err(Error::yaml(path))?;

        layout.validate()?;

        Ok(layout)
    }

    /// Number of bins of the figure.
    #[must_use]
    pub fn bins(&self) -> usize {
        self.bins.len()
    }

    /// Checks the consistency of this layout.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Layout`] if there are no bins, if the signal yields do not match the
    /// number of bins, if a region or subregion is empty, if the regions do not cover exactly the
    /// bins or if the axis ranges are unusable.
    pub fn validate(&self) -> Result<()> {
        let bins = self.bins();

        if bins == 0 {
            return Err(Error::Layout("there are no bins".to_owned()));
        }

        if self.signal.process.is_none() && self.signal.yields.len() != bins {
            return Err(Error::Layout(format!(
                "{} signal yields given for {bins} bins",
                self.signal.yields.len()
            )));
        }

        if let Some(region) = self
            .regions
            .iter()
            .find(|region| region.subregions.is_empty())
        {
            return Err(Error::Layout(format!(
                "region `{}` contains no subregions",
                region.label
            )));
        }

        if let Some(sub) = self
            .regions
            .iter()
            .flat_map(|region| &region.subregions)
            .find(|sub| sub.ranges.is_empty())
        {
            return Err(Error::Layout(format!(
                "subregion `{}` contains no bins",
                sub.label
            )));
        }

        let covered: usize = self.regions.iter().map(Region::bins).sum();

        if covered != bins {
            return Err(Error::Layout(format!(
                "regions cover {covered} bins, but there are {bins}"
            )));
        }

        let labels = &self.labels;

        if !(labels.y_min > 0.0 && labels.y_min < labels.y_max) {
            return Err(Error::Layout(format!(
                "yield axis range {}..{} is not positive and increasing",
                labels.y_min, labels.y_max
            )));
        }

        if !(labels.pull_max > 0.0) {
            return Err(Error::Layout(format!(
                "pull axis range {} must be positive",
                labels.pull_max
            )));
        }

        Ok(())
    }

    /// Spans of the regions.
    #[must_use]
    pub fn region_spans(&self) -> Vec<(&Region, Span)> {
        let mut first = 0;

        self.regions
            .iter()
            .map(|region| {
                let span = Span::new(first, region.bins());
                first += region.bins();
                (region, span)
            })
            .collect()
    }

    /// Spans of all subregions.
    #[must_use]
    pub fn subregion_spans(&self) -> Vec<(&Subregion, Span)> {
        let mut first = 0;

        self.regions
            .iter()
            .flat_map(|region| &region.subregions)
            .map(|sub| {
                let span = Span::new(first, sub.ranges.len());
                first += sub.ranges.len();
                (sub, span)
            })
            .collect()
    }

    /// Positions of the separators between regions.
    #[must_use]
    pub fn region_separators(&self) -> Vec<f64> {
        let spans = self.region_spans();

        spans
            .iter()
            .take(spans.len().saturating_sub(1))
            .map(|(_, span)| span.right)
            .collect()
    }

    /// Positions of the separators between subregions of the same region.
    #[must_use]
    pub fn subregion_separators(&self) -> Vec<f64> {
        let mut first = 0;
        let mut separators = Vec::new();

        for region in &self.regions {
            if let Some((_, inner)) = region.subregions.split_last() {
                for sub in inner {
                    first += sub.ranges.len();
                    separators.push(f64_from_usize(first) + 0.5);
                }
            }

            first += region.subregions.last().map_or(0, |sub| sub.ranges.len());
        }

        separators
    }

    /// Label of the region and subregion of every bin, for instance `Boosted/1H`.
    #[must_use]
    pub fn bin_regions(&self) -> Vec<String> {
        self.regions
            .iter()
            .flat_map(|region| {
                region.subregions.iter().flat_map(move |sub| {
                    sub.ranges
                        .iter()
                        .map(move |_| format!("{}/{}", region.label, sub.label))
                })
            })
            .collect()
    }
}
