//! The results figure: background predictions, data and pulls per bin.

use super::convert::f64_from_usize;
use super::error::{Error, Result};
use super::layout::Labels;
use super::pdf::PdfBackend;
use super::results::Results;
use log::info;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::text_anchor::{HPos, Pos, VPos};
use plotters_backend::BackendCoord;
use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

/// Size of the canvas in pixels.
pub const SIZE: (u32, u32) = (1000, 500);

const PREFIT: RGBColor = RGBColor(204, 0, 102);
const POSTFIT: RGBColor = RGBColor(51, 153, 255);
const POSTFIT_LINE: RGBColor = RGBColor(0, 102, 204);
const SIGNAL: RGBColor = RGBColor(0, 102, 0);
const SIGNAL_PULL: RGBColor = RGBColor(153, 0, 0);
const GREY: RGBColor = RGBColor(153, 153, 153);
const POSTFIT_ALPHA: f64 = 0.35;

/// Share of the canvas height taken by the upper panel if the pulls are shown.
const TOP_FRACTION: f64 = 0.7;
/// Margins in units of the panel width or height.
const LEFT_MARGIN: f64 = 0.08;
const RIGHT_MARGIN: f64 = 0.02;
const TOP_MARGIN: f64 = 0.1;

/// Heights of the annotation rows in units of the upper end of the yield axis.
const REGION_ROW: f64 = 0.5;
const SUBREGION_ROW: f64 = 0.257;
const VARIABLE_ROW: f64 = 0.1286;
const RANGE_ROW: f64 = 0.05;
/// Subregion separators end here, in units of the upper end of the yield axis.
const SUBREGION_SEPARATOR: f64 = 0.4;

/// Switches of the figure.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct PlotOptions {
    /// Add the preliminary label and change the default output name.
    pub preliminary: bool,
    /// Add the panel with the pulls.
    pub pulls: bool,
    /// Overlay signal+background.
    pub signal: bool,
}

impl PlotOptions {
    /// Default output path of the figure.
    #[must_use]
    pub fn output(&self) -> PathBuf {
        if self.preliminary {
            PathBuf::from("plots/results_plot_preliminary.pdf")
        } else {
            PathBuf::from("plots/results_plot.pdf")
        }
    }
}

#[derive(Clone, Copy)]
enum LineStyle {
    Solid,
    Dashed,
    Dotted,
}

impl LineStyle {
    /// Lengths of dash and gap in pixels.
    const fn pattern(self) -> Option<(f64, f64)> {
        match self {
            Self::Solid => None,
            Self::Dashed => Some((8.0, 5.0)),
            Self::Dotted => Some((2.0, 3.0)),
        }
    }
}

#[derive(Clone, Copy)]
enum Entry {
    Prefit,
    Postfit,
    Data,
    Signal,
}

/// Font sizes in pixels. They scale with the panel height.
struct TextSizes {
    label: f64,
    title: f64,
    experiment: f64,
    luminosity: f64,
    legend: f64,
    region: f64,
    subregion: f64,
    variable: f64,
    range: f64,
}

impl TextSizes {
    fn new(pulls: bool, height: f64) -> Self {
        let fractions = if pulls {
            [0.06, 0.075, 0.09, 0.05, 0.05, 0.05, 0.045, 0.04, 0.03]
        } else {
            [0.04, 0.05, 0.07, 0.05, 0.04, 0.041, 0.04, 0.037, 0.0325]
        };
        let [label, title, experiment, luminosity, legend, region, subregion, variable, range] =
            fractions.map(|fraction| fraction * height);

        Self {
            label,
            title,
            experiment,
            luminosity,
            legend,
            region,
            subregion,
            variable,
            range,
        }
    }
}

fn plot_error<E: Display>(err: E) -> Error {
    Error::Plot(err.to_string())
}

fn px(x: f64) -> i32 {
    x.round() as i32
}

fn text_style(size: f64, font_style: FontStyle, pos: Pos) -> TextStyle<'static> {
    TextStyle::from(("sans-serif", size, font_style).into_font()).pos(pos)
}

fn format_count(y: &f64) -> String {
    if *y >= 1.0 {
        format!("{y:.0}")
    } else {
        format!("{y:.3}").trim_end_matches('0').to_owned()
    }
}

fn format_integer(x: &f64) -> String {
    if (x - x.round()).abs() < 1e-9 {
        // adding zero turns `-0` into `0`
        format!("{:.0}", x.round() + 0.0)
    } else {
        String::new()
    }
}

/// Splits a line of `length` pixels into dashes, returned as start and end fractions.
fn dash_fractions(length: f64, dash: f64, gap: f64) -> Vec<(f64, f64)> {
    if length <= 0.0 {
        return Vec::new();
    }

    let mut dashes = Vec::new();
    let mut start = 0.0;

    while start < length {
        dashes.push((start / length, (start + dash).min(length) / length));
        start += dash + gap;
    }

    dashes
}

/// Draws a line between the absolute backend coordinates `from` and `to` onto `area`.
fn draw_line<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    from: BackendCoord,
    to: BackendCoord,
    line: LineStyle,
    color: RGBColor,
) -> Result<()> {
    let (base_x, base_y) = area.get_base_pixel();
    let (x0, y0) = (f64::from(from.0 - base_x), f64::from(from.1 - base_y));
    let (x1, y1) = (f64::from(to.0 - base_x), f64::from(to.1 - base_y));

    let segments = match line.pattern() {
        None => vec![(0.0, 1.0)],
        Some((dash, gap)) => dash_fractions((x1 - x0).hypot(y1 - y0), dash, gap),
    };

    for (start, end) in segments {
        let point = |t: f64| (px((x1 - x0).mul_add(t, x0)), px((y1 - y0).mul_add(t, y0)));

        area.draw(&PathElement::new(vec![point(start), point(end)], color))
            .map_err(plot_error)?;
    }

    Ok(())
}

fn draw_legend<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    entries: &[(Entry, &str)],
    size: f64,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let style = text_style(size, FontStyle::Normal, Pos::new(HPos::Left, VPos::Center));

    let symbol = px(1.6 * size);
    let gap = px(0.4 * size);
    let spacing = px(1.2 * size);
    let half = px(0.35 * size);

    let mut widths = Vec::with_capacity(entries.len());

    for (_, label) in entries {
        let (text_width, _) = area
            .estimate_text_size(label, &style)
            .map_err(plot_error)?;
        widths.push(i32::try_from(text_width).map_err(plot_error)?);
    }

    let total = widths.iter().map(|width| symbol + gap + width).sum::<i32>()
        + spacing * i32::try_from(entries.len().saturating_sub(1)).map_err(plot_error)?;
    let mut x = px(0.55 * f64::from(width)) - total / 2;
    let y = px(0.06 * f64::from(height));

    for (&(entry, label), text_width) in entries.iter().zip(widths) {
        let (left, right, middle) = (x, x + symbol, x + symbol / 2);
        let (top, bottom) = (y - half, y + half);

        match entry {
            Entry::Prefit => {
                area.draw(&Rectangle::new([(left, top), (right, bottom)], PREFIT.stroke_width(1)))
                    .map_err(plot_error)?;
                area.draw(&PathElement::new(vec![(left, y), (right, y)], PREFIT))
                    .map_err(plot_error)?;
            }
            Entry::Postfit => {
                area.draw(&Rectangle::new(
                    [(left, top), (right, bottom)],
                    POSTFIT.mix(POSTFIT_ALPHA).filled(),
                ))
                .map_err(plot_error)?;
                area.draw(&PathElement::new(vec![(left, y), (right, y)], POSTFIT_LINE))
                    .map_err(plot_error)?;
            }
            Entry::Data => {
                area.draw(&PathElement::new(vec![(middle, top), (middle, bottom)], BLACK))
                    .map_err(plot_error)?;
                area.draw(&Circle::new((middle, y), 3, BLACK.filled()))
                    .map_err(plot_error)?;
            }
            Entry::Signal => {
                area.draw(&PathElement::new(
                    vec![(left, y), (right, y)],
                    SIGNAL.stroke_width(2),
                ))
                .map_err(plot_error)?;
                area.draw(&Circle::new((middle, y), 3, SIGNAL.filled()))
                    .map_err(plot_error)?;
            }
        }

        area.draw(&Text::new(label.to_owned(), (right + gap, y), style.clone()))
            .map_err(plot_error)?;

        x = right + gap + text_width + spacing;
    }

    Ok(())
}

fn draw_header<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    labels: &Labels,
    preliminary: bool,
    sizes: &TextSizes,
) -> Result<()> {
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (f64::from(width), f64::from(height));
    let baseline = px((1.0 - 0.92) * height);
    let left_bottom = Pos::new(HPos::Left, VPos::Bottom);

    let experiment = text_style(sizes.experiment, FontStyle::Bold, left_bottom);
    let x = px((LEFT_MARGIN + 0.005) * width);

    area.draw(&Text::new(
        labels.experiment.clone(),
        (x, baseline),
        experiment.clone(),
    ))
    .map_err(plot_error)?;

    if preliminary {
        let (experiment_width, _) = area
            .estimate_text_size(&labels.experiment, &experiment)
            .map_err(plot_error)?;
        let x = x
            + i32::try_from(experiment_width).map_err(plot_error)?
            + px(0.3 * sizes.experiment);

        area.draw(&Text::new(
            labels.preliminary.clone(),
            (x, baseline),
            text_style(0.8 * sizes.experiment, FontStyle::Italic, left_bottom),
        ))
        .map_err(plot_error)?;
    }

    area.draw(&Text::new(
        labels.luminosity.clone(),
        (px((1.0 - RIGHT_MARGIN - 0.005) * width), baseline),
        text_style(
            sizes.luminosity,
            FontStyle::Normal,
            Pos::new(HPos::Right, VPos::Bottom),
        ),
    ))
    .map_err(plot_error)?;

    Ok(())
}

fn draw_top<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    results: &Results,
    options: &PlotOptions,
) -> Result<()> {
    let layout = results.layout();
    let labels = &layout.labels;
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (f64::from(width), f64::from(height));
    let sizes = TextSizes::new(options.pulls, height);
    let bins = f64_from_usize(layout.bins());
    let (y_min, y_max) = (labels.y_min, labels.y_max);
    let clamp = |y: f64| y.clamp(y_min, y_max);

    let mut chart = ChartBuilder::on(area)
        .margin_top(px(TOP_MARGIN * height))
        .margin_right(px(RIGHT_MARGIN * width))
        .y_label_area_size(px(LEFT_MARGIN * width))
        .x_label_area_size(if options.pulls { 0 } else { px(0.1 * height) })
        .build_cartesian_2d(0.01..bins + 0.99, (y_min..y_max).log_scale())
        .map_err(plot_error)?;

    {
        let mut mesh = chart.configure_mesh();
        mesh.disable_x_mesh()
            .disable_y_mesh()
            .y_desc("Events / Bin")
            .y_labels(10)
            .y_label_formatter(&format_count)
            .label_style(("sans-serif", sizes.label))
            .axis_desc_style(("sans-serif", sizes.title));

        if !options.pulls {
            mesh.x_desc("Bin number")
                .x_labels(layout.bins() + 2)
                .x_label_formatter(&format_integer);
        }

        mesh.draw().map_err(plot_error)?;
    }

    let bins = results.bins();
    let positions = || (1..=bins.len()).map(f64_from_usize).zip(bins);

    chart
        .draw_series(positions().map(|(x, bin)| {
            Rectangle::new(
                [
                    (x - 0.5, clamp(bin.prefit.value + bin.prefit.up())),
                    (x + 0.5, clamp(bin.prefit.value - bin.prefit.down())),
                ],
                PREFIT.stroke_width(1),
            )
        }))
        .map_err(plot_error)?;
    chart
        .draw_series(positions().map(|(x, bin)| {
            let y = clamp(bin.prefit.value);
            PathElement::new(vec![(x - 0.5, y), (x + 0.5, y)], PREFIT)
        }))
        .map_err(plot_error)?;

    chart
        .draw_series(positions().map(|(x, bin)| {
            Rectangle::new(
                [
                    (x - 0.5, clamp(bin.postfit.value + bin.postfit.up())),
                    (x + 0.5, clamp(bin.postfit.value - bin.postfit.down())),
                ],
                POSTFIT.mix(POSTFIT_ALPHA).filled(),
            )
        }))
        .map_err(plot_error)?;
    chart
        .draw_series(positions().map(|(x, bin)| {
            let y = clamp(bin.postfit.value);
            PathElement::new(vec![(x - 0.5, y), (x + 0.5, y)], POSTFIT_LINE)
        }))
        .map_err(plot_error)?;

    if options.signal {
        chart
            .draw_series(positions().map(|(x, bin)| {
                let y = clamp(bin.signal);
                PathElement::new(vec![(x - 0.5, y), (x + 0.5, y)], SIGNAL.stroke_width(2))
            }))
            .map_err(plot_error)?;
        chart
            .draw_series(
                positions().map(|(x, bin)| Circle::new((x, clamp(bin.signal)), 3, SIGNAL.filled())),
            )
            .map_err(plot_error)?;
    }

    chart
        .draw_series(positions().map(|(x, bin)| {
            PathElement::new(
                vec![
                    (x, clamp(bin.data - bin.data_error.down)),
                    (x, clamp(bin.data + bin.data_error.up)),
                ],
                BLACK,
            )
        }))
        .map_err(plot_error)?;
    // a vanishing count has no place on a logarithmic axis
    chart
        .draw_series(
            positions()
                .filter(|(_, bin)| bin.data > 0.0)
                .map(|(x, bin)| Circle::new((x, clamp(bin.data)), 3, BLACK.filled())),
        )
        .map_err(plot_error)?;

    let mut entries = vec![
        (Entry::Prefit, labels.prefit.as_str()),
        (Entry::Postfit, labels.postfit.as_str()),
        (Entry::Data, labels.data.as_str()),
    ];

    if options.signal {
        entries.insert(2, (Entry::Signal, layout.signal.label.as_str()));
    }

    draw_legend(area, &entries, sizes.legend)?;
    draw_header(area, labels, options.preliminary, &sizes)?;

    let centered = |size: f64, v_pos: VPos| {
        text_style(size, FontStyle::Normal, Pos::new(HPos::Center, v_pos))
    };
    let plotting_area = chart.plotting_area();

    for (region, span) in layout.region_spans() {
        plotting_area
            .draw(&Text::new(
                region.label.clone(),
                (span.center(), REGION_ROW * y_max),
                centered(sizes.region, VPos::Bottom),
            ))
            .map_err(plot_error)?;
    }

    for (subregion, span) in layout.subregion_spans() {
        for (text, row, style) in [
            (
                &subregion.label,
                SUBREGION_ROW,
                centered(sizes.subregion, VPos::Bottom),
            ),
            (
                &subregion.variable,
                VARIABLE_ROW,
                centered(sizes.variable, VPos::Bottom),
            ),
        ] {
            plotting_area
                .draw(&Text::new(text.clone(), (span.center(), row * y_max), style))
                .map_err(plot_error)?;
        }

        for (range, x) in subregion.ranges.iter().zip(1..) {
            plotting_area
                .draw(&Text::new(
                    range.clone(),
                    (span.left + f64::from(x) - 0.5, RANGE_ROW * y_max),
                    centered(sizes.range, VPos::Top),
                ))
                .map_err(plot_error)?;
        }
    }

    for x in layout.region_separators() {
        draw_line(
            area,
            chart.backend_coord(&(x, y_min)),
            chart.backend_coord(&(x, y_max)),
            LineStyle::Dotted,
            BLACK,
        )?;
    }

    for x in layout.subregion_separators() {
        draw_line(
            area,
            chart.backend_coord(&(x, y_min)),
            chart.backend_coord(&(x, SUBREGION_SEPARATOR * y_max)),
            LineStyle::Dotted,
            BLACK,
        )?;
    }

    Ok(())
}

fn draw_bottom<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    results: &Results,
    options: &PlotOptions,
) -> Result<()> {
    let layout = results.layout();
    let pull_max = layout.labels.pull_max;
    let (width, height) = area.dim_in_pixel();
    let (width, height) = (f64::from(width), f64::from(height));
    let bins = f64_from_usize(layout.bins());
    let (x_min, x_max) = (0.01, bins + 0.99);

    let mut chart = ChartBuilder::on(area)
        .margin_right(px(RIGHT_MARGIN * width))
        .y_label_area_size(px(LEFT_MARGIN * width))
        .x_label_area_size(px(0.3 * height))
        .build_cartesian_2d(x_min..x_max, -pull_max..pull_max)
        .map_err(plot_error)?;

    chart
        .configure_mesh()
        .disable_x_mesh()
        .disable_y_mesh()
        .x_desc("Bin number")
        .y_desc("Pull")
        .x_labels(layout.bins() + 2)
        .x_label_formatter(&format_integer)
        .y_labels(7)
        .y_label_formatter(&format_integer)
        .label_style(("sans-serif", 0.12 * height))
        .axis_desc_style(("sans-serif", 0.15 * height))
        .draw()
        .map_err(plot_error)?;

    let bins = results.bins();
    let bar = |x: f64, pull: f64| {
        let pull = pull.clamp(-pull_max, pull_max);
        [(x - 0.5, pull.max(0.0)), (x + 0.5, pull.min(0.0))]
    };

    chart
        .draw_series(
            (1..=bins.len())
                .map(f64_from_usize)
                .zip(bins)
                .filter_map(|(x, bin)| bin.pulls.prefit.map(|pull| (x, pull)))
                .map(|(x, pull)| Rectangle::new(bar(x, pull), PREFIT.stroke_width(1))),
        )
        .map_err(plot_error)?;

    if options.signal {
        chart
            .draw_series(
                (1..=bins.len())
                    .map(f64_from_usize)
                    .zip(bins)
                    .filter_map(|(x, bin)| bin.pulls.signal.map(|pull| (x, pull)))
                    .map(|(x, pull)| Rectangle::new(bar(x, pull), SIGNAL_PULL.stroke_width(1))),
            )
            .map_err(plot_error)?;
    }

    for (x, color) in layout
        .region_separators()
        .into_iter()
        .map(|x| (x, BLACK))
        .chain(layout.subregion_separators().into_iter().map(|x| (x, GREY)))
    {
        draw_line(
            area,
            chart.backend_coord(&(x, -pull_max)),
            chart.backend_coord(&(x, pull_max)),
            LineStyle::Dotted,
            color,
        )?;
    }

    for (y, line) in [
        (0.0_f64, LineStyle::Solid),
        (-1.0, LineStyle::Dashed),
        (1.0, LineStyle::Dashed),
        (-2.0, LineStyle::Dotted),
        (2.0, LineStyle::Dotted),
    ] {
        if y.abs() < pull_max {
            draw_line(
                area,
                chart.backend_coord(&(x_min, y)),
                chart.backend_coord(&(x_max, y)),
                line,
                GREY,
            )?;
        }
    }

    Ok(())
}

/// Draws the figure for `results` onto `root`.
///
/// # Errors
///
/// Returns [`Error::Plot`] if the backend fails.
pub fn draw<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    results: &Results,
    options: &PlotOptions,
) -> Result<()> {
    root.fill(&WHITE).map_err(plot_error)?;

    if options.pulls {
        let (_, height) = root.dim_in_pixel();
        let (top, bottom) = root.split_vertically(px(TOP_FRACTION * f64::from(height)));

        draw_top(&top, results, options)?;
        draw_bottom(&bottom, results, options)
    } else {
        draw_top(root, results, options)
    }
}

/// Draws the figure for `results` into the PDF file `path`, creating its parent directories if
/// needed.
///
/// # Errors
///
/// Returns an error if the directories can not be created or the figure can not be drawn or
/// written.
pub fn render(path: &Path, results: &Results, options: &PlotOptions) -> Result<()> {
    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(Error::io(parent))?;
    }

    let root = PdfBackend::new(path, SIZE).into_drawing_area();

    draw(&root, results, options)?;
    root.present().map_err(plot_error)?;

    info!("wrote `{}`", path.display());

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::results::tests::{small_inputs, small_layout};
    use assert_fs::TempDir;

    fn results() -> Results {
        let (fits, datacard) = small_inputs();

        Results::new(small_layout(), &fits, &datacard).unwrap()
    }

    fn svg(options: &PlotOptions) -> String {
        let results = results();
        let mut svg = String::new();

        {
            let root = SVGBackend::with_string(&mut svg, SIZE).into_drawing_area();
            draw(&root, &results, options).unwrap();
            root.present().unwrap();
        }

        svg
    }

    #[test]
    fn output_names() {
        assert_eq!(
            PlotOptions::default().output(),
            Path::new("plots/results_plot.pdf")
        );
        assert_eq!(
            PlotOptions {
                preliminary: true,
                pulls: true,
                signal: true,
            }
            .output(),
            Path::new("plots/results_plot_preliminary.pdf")
        );
        assert_eq!(
            PlotOptions {
                pulls: true,
                ..PlotOptions::default()
            }
            .output(),
            PlotOptions::default().output()
        );
    }

    #[test]
    fn tick_labels() {
        assert_eq!(format_count(&1000.0), "1000");
        assert_eq!(format_count(&0.1), "0.1");
        assert_eq!(format_count(&0.05), "0.05");
        assert_eq!(format_integer(&3.0), "3");
        assert_eq!(format_integer(&-0.0), "0");
        assert_eq!(format_integer(&2.5), "");
    }

    #[test]
    fn dashes() {
        assert_eq!(dash_fractions(10.0, 2.0, 3.0), [(0.0, 0.2), (0.5, 0.7)]);
        assert_eq!(dash_fractions(6.0, 2.0, 3.0), [(0.0, 2.0 / 6.0), (5.0 / 6.0, 1.0)]);
        assert!(dash_fractions(0.0, 2.0, 3.0).is_empty());
    }

    #[test]
    fn single_panel() {
        let svg = svg(&PlotOptions::default());

        for text in ["Events / Bin", "Bin number", "Pre-fit", "Post-fit", "Data", "CMS"] {
            assert!(svg.contains(text), "`{text}` missing");
        }

        assert!(svg.contains("137 fb⁻¹ (13 TeV)"));
        assert!(svg.contains("Resolved"));
        assert!(svg.contains("Boosted"));
        assert!(!svg.contains("Preliminary"));
        assert!(!svg.contains("Pull"));
        assert!(!svg.contains("TChiHH"));
    }

    #[test]
    fn pull_panel() {
        let svg = svg(&PlotOptions {
            preliminary: true,
            pulls: true,
            signal: false,
        });

        assert!(svg.contains("Preliminary"));
        assert!(svg.contains("Pull"));
        assert!(svg.contains("Bin number"));
    }

    #[test]
    fn signal_overlay() {
        let svg = svg(&PlotOptions {
            signal: true,
            ..PlotOptions::default()
        });

        assert!(svg.contains("TChiHH(500,1)+bkg"));
    }

    #[test]
    fn render_pdf() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("plots").join("results_plot.pdf");

        render(
            &path,
            &results(),
            &PlotOptions {
                preliminary: true,
                pulls: true,
                signal: true,
            },
        )
        .unwrap();

        let bytes = fs::read(&path).unwrap();

        assert!(bytes.starts_with(b"%PDF-"));
    }
}
