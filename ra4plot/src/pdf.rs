//! A `plotters` backend writing single-page PDF documents.
//!
//! Text is set in the standard Helvetica fonts, which every PDF viewer provides, so no font
//! files are embedded. Greek letters and a few mathematical symbols are taken from the Symbol
//! font, and Unicode super- and subscripts are typeset as smaller, raised or lowered runs.

use pdf_writer::{Content, Finish, Name, Pdf, Rect, Ref, Str};
use plotters_backend::text_anchor::{HPos, VPos};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend,
    DrawingErrorKind, FontStyle, FontTransform,
};
use std::collections::BTreeSet;
use std::f32::consts::FRAC_PI_2;
use std::fs;
use std::io;
use std::mem;
use std::path::{Path, PathBuf};

/// Points per pixel: a 1000 pixel wide canvas becomes a 20 cm wide page.
const SCALE: f32 = 0.567;

/// Ascent and descent of Helvetica in units of the font size.
const ASCENT: f64 = 0.718;
const DESCENT: f64 = 0.207;

/// Size and baseline shift of super- and subscripts in units of the font size.
const SCRIPT_SCALE: f64 = 0.7;
const SUPERSCRIPT_RISE: f64 = 0.4;
const SUBSCRIPT_RISE: f64 = -0.2;

/// Bézier control-point distance approximating a quarter circle.
const KAPPA: f32 = 0.552_284_8;

/// Advance widths of the printable ASCII characters in Helvetica, per 1000 units of font size.
const HELVETICA: [u16; 95] = [
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 556, 278, 278, 584, 584, 584, 556, 1015, 667, 667, 722,
    722, 667, 611, 778, 722, 278, 500, 667, 556, 833, 722, 778, 667, 778, 722, 667, 611, 722,
    667, 944, 667, 667, 611, 278, 278, 278, 469, 556, 333, 556, 556, 500, 556, 556, 278, 556,
    556, 222, 222, 500, 222, 833, 556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500,
    500, 334, 260, 334, 584,
];

/// The same for Helvetica-Bold.
const HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278, 556, 556,
    556, 556, 556, 556, 556, 556, 556, 556, 333, 333, 584, 584, 584, 611, 975, 722, 722, 722,
    722, 667, 611, 778, 722, 278, 556, 722, 611, 833, 722, 778, 667, 778, 722, 667, 611, 722,
    667, 944, 667, 667, 611, 333, 278, 333, 584, 556, 333, 556, 611, 556, 611, 556, 333, 611,
    611, 278, 278, 556, 278, 889, 611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556,
    500, 389, 280, 389, 584,
];

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Font {
    Regular,
    Bold,
    Oblique,
    Symbol,
}

impl Font {
    const ALL: [Self; 4] = [Self::Regular, Self::Bold, Self::Oblique, Self::Symbol];

    const fn from_style(style: FontStyle) -> Self {
        match style {
            FontStyle::Normal => Self::Regular,
            FontStyle::Bold => Self::Bold,
            FontStyle::Italic | FontStyle::Oblique => Self::Oblique,
        }
    }

    const fn resource(self) -> &'static [u8] {
        match self {
            Self::Regular => b"F1",
            Self::Bold => b"F2",
            Self::Oblique => b"F3",
            Self::Symbol => b"F4",
        }
    }

    const fn base_font(self) -> &'static [u8] {
        match self {
            Self::Regular => b"Helvetica",
            Self::Bold => b"Helvetica-Bold",
            Self::Oblique => b"Helvetica-Oblique",
            Self::Symbol => b"Symbol",
        }
    }

    fn width(self, byte: u8) -> u16 {
        let ascii = usize::from(byte.wrapping_sub(b' '));

        match self {
            Self::Regular | Self::Oblique => HELVETICA.get(ascii).copied().unwrap_or(556),
            Self::Bold => HELVETICA_BOLD.get(ascii).copied().unwrap_or(556),
            Self::Symbol => match byte {
                b'D' => 612,
                b's' => 603,
                b'm' => 576,
                b'a' => 631,
                b'b' | b'c' | 0xA3 | 0xB3 => 549,
                b'g' => 411,
                0xA5 => 713,
                0xAE => 987,
                _ => 500,
            },
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq)]
enum Shift {
    Base,
    Superscript,
    Subscript,
}

impl Shift {
    const fn scale(self) -> f64 {
        match self {
            Self::Base => 1.0,
            Self::Superscript | Self::Subscript => SCRIPT_SCALE,
        }
    }

    const fn rise(self) -> f64 {
        match self {
            Self::Base => 0.0,
            Self::Superscript => SUPERSCRIPT_RISE,
            Self::Subscript => SUBSCRIPT_RISE,
        }
    }
}

fn superscript(c: char) -> Option<u8> {
    Some(match c {
        '⁰' => b'0',
        '¹' => b'1',
        '²' => b'2',
        '³' => b'3',
        '⁴'..='⁹' => b'4' + (u32::from(c) - u32::from('⁴')) as u8,
        '⁺' => b'+',
        '⁻' => b'-',
        'ⁱ' => b'i',
        'ⁿ' => b'n',
        'ᵐ' => b'm',
        'ˢ' => b's',
        _ => return None,
    })
}

fn subscript(c: char) -> Option<u8> {
    Some(match c {
        '₀'..='₉' => b'0' + (u32::from(c) - u32::from('₀')) as u8,
        'ₐ' => b'a',
        'ₑ' => b'e',
        'ₓ' => b'x',
        'ₘ' => b'm',
        'ₜ' => b't',
        _ => return None,
    })
}

fn symbol(c: char) -> Option<u8> {
    Some(match c {
        'α' => b'a',
        'β' => b'b',
        'γ' => b'g',
        'Δ' => b'D',
        'μ' => b'm',
        'σ' => b's',
        'χ' => b'c',
        '≤' => 0xA3,
        '∞' => 0xA5,
        '→' => 0xAE,
        '≥' => 0xB3,
        _ => return None,
    })
}

/// Maps `c` to a font, a baseline shift and a byte of the font's encoding.
fn glyph(c: char, font: Font) -> (Font, Shift, u8) {
    if let Some(byte) = superscript(c) {
        (font, Shift::Superscript, byte)
    } else if let Some(byte) = subscript(c) {
        (font, Shift::Subscript, byte)
    } else if let Some(byte) = symbol(c) {
        (Font::Symbol, Shift::Base, byte)
    } else if c == '−' {
        (font, Shift::Base, b'-')
    } else if let Ok(byte @ (b' '..=b'~' | 0xA0..=0xFF)) = u8::try_from(u32::from(c)) {
        // WinAnsiEncoding agrees with Latin-1 in these ranges
        (font, Shift::Base, byte)
    } else {
        (font, Shift::Base, b'?')
    }
}

#[derive(Debug, PartialEq)]
struct Run {
    font: Font,
    shift: Shift,
    bytes: Vec<u8>,
}

fn runs(text: &str, font: Font) -> Vec<Run> {
    let mut runs: Vec<Run> = Vec::new();

    for c in text.chars() {
        let (font, shift, byte) = glyph(c, font);

        match runs.last_mut() {
            Some(run) if run.font == font && run.shift == shift => run.bytes.push(byte),
            _ => runs.push(Run {
                font,
                shift,
                bytes: vec![byte],
            }),
        }
    }

    runs
}

/// Width of `runs` set at font size `size`, in the units of `size`.
fn width(runs: &[Run], size: f64) -> f64 {
    runs.iter()
        .map(|run| {
            let units: u32 = run
                .bytes
                .iter()
                .map(|&byte| u32::from(run.font.width(byte)))
                .sum();
            f64::from(units) * size * run.shift.scale() / 1000.0
        })
        .sum()
}

fn alpha_name(percent: u8) -> String {
    format!("A{percent}")
}

enum Target<'a> {
    File(PathBuf),
    Buffer(&'a mut Vec<u8>),
}

/// A `plotters` drawing backend producing a PDF document with a single page.
///
/// The document is written when [`DrawingBackend::present`] is called or when the backend is
/// dropped, whichever comes first.
pub struct PdfBackend<'a> {
    target: Target<'a>,
    size: (u32, u32),
    content: Content,
    stream: Vec<u8>,
    alphas: BTreeSet<u8>,
    saved: bool,
}

impl<'a> PdfBackend<'a> {
    fn with_target(target: Target<'a>, size: (u32, u32)) -> Self {
        Self {
            target,
            size,
            content: Content::new(),
            stream: Vec::new(),
            alphas: BTreeSet::new(),
            saved: false,
        }
    }

    /// Creates a backend writing a page of `size` pixels to the file at `path`.
    pub fn new<P: AsRef<Path> + ?Sized>(path: &P, size: (u32, u32)) -> Self {
        Self::with_target(Target::File(path.as_ref().to_path_buf()), size)
    }

    /// Creates a backend writing a page of `size` pixels into `buffer`.
    pub fn with_buffer(buffer: &'a mut Vec<u8>, size: (u32, u32)) -> Self {
        Self::with_target(Target::Buffer(buffer), size)
    }

    fn point(&self, (x, y): BackendCoord) -> (f32, f32) {
        (x as f32 * SCALE, (self.size.1 as f32 - y as f32) * SCALE)
    }

    /// Runs `draw` with fill and stroke colour set to `color`. Invisible colours are skipped.
    #[allow(clippy::cast_sign_loss)]
    fn paint(&mut self, color: BackendColor, draw: impl FnOnce(&mut Content)) {
        if color.alpha <= 0.0 {
            return;
        }

        self.content.save_state();

        if color.alpha < 1.0 {
            let percent = (color.alpha * 100.0).round().clamp(1.0, 99.0) as u8;
            self.alphas.insert(percent);
            self.content
                .set_parameters(Name(alpha_name(percent).as_bytes()));
        }

        let (r, g, b) = color.rgb;
        let (r, g, b) = (
            f32::from(r) / 255.0,
            f32::from(g) / 255.0,
            f32::from(b) / 255.0,
        );
        self.content.set_fill_rgb(r, g, b);
        self.content.set_stroke_rgb(r, g, b);

        draw(&mut self.content);

        self.content.restore_state();
    }

    fn stroke_path(&mut self, points: &[(f32, f32)], width: u32, color: BackendColor) {
        if points.len() < 2 || width == 0 {
            return;
        }

        self.paint(color, |content| {
            content.set_line_width(width as f32 * SCALE);
            content.move_to(points[0].0, points[0].1);
            for &(x, y) in &points[1..] {
                content.line_to(x, y);
            }
            content.stroke();
        });
    }

    fn document(&self) -> Vec<u8> {
        let catalog_id = Ref::new(1);
        let tree_id = Ref::new(2);
        let page_id = Ref::new(3);
        let content_id = Ref::new(4);
        let font_ids = || Font::ALL.into_iter().zip(5..);
        let alpha_ids = || self.alphas.iter().copied().zip(9..);

        let mut pdf = Pdf::new();
        pdf.catalog(catalog_id).pages(tree_id);
        pdf.pages(tree_id).kids([page_id]).count(1);

        {
            let mut page = pdf.page(page_id);
            page.parent(tree_id)
                .media_box(Rect::new(
                    0.0,
                    0.0,
                    self.size.0 as f32 * SCALE,
                    self.size.1 as f32 * SCALE,
                ))
                .contents(content_id);

            let mut resources = page.resources();
            let mut fonts = resources.fonts();
            for (font, id) in font_ids() {
                fonts.pair(Name(font.resource()), Ref::new(id));
            }
            fonts.finish();

            let mut states = resources.ext_g_states();
            for (percent, id) in alpha_ids() {
                states.pair(Name(alpha_name(percent).as_bytes()), Ref::new(id));
            }
            states.finish();
        }

        for (font, id) in font_ids() {
            let mut writer = pdf.type1_font(Ref::new(id));
            writer.base_font(Name(font.base_font()));

            if font != Font::Symbol {
                writer.encoding_predefined(Name(b"WinAnsiEncoding"));
            }
        }

        for (percent, id) in alpha_ids() {
            let alpha = f32::from(percent) / 100.0;
            pdf.ext_graphics(Ref::new(id))
                .non_stroking_alpha(alpha)
                .stroking_alpha(alpha);
        }

        pdf.stream(content_id, &self.stream);

        pdf.finish()
    }
}

impl DrawingBackend for PdfBackend<'_> {
    type ErrorType = io::Error;

    fn get_size(&self) -> (u32, u32) {
        self.size
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        self.saved = false;
        Ok(())
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<io::Error>> {
        if self.saved {
            return Ok(());
        }

        let content = mem::replace(&mut self.content, Content::new());
        self.stream.extend(content.finish());

        let document = self.document();

        match &mut self.target {
            Target::File(path) => {
                fs::write(path, document).map_err(DrawingErrorKind::DrawingError)?;
            }
            Target::Buffer(buffer) => {
                buffer.clear();
                buffer.extend(document);
            }
        }

        self.saved = true;

        Ok(())
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let (x, y) = self.point(point);

        self.paint(color, |content| {
            content.rect(x, y - SCALE, SCALE, SCALE);
            content.fill_nonzero();
        });

        Ok(())
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let points = [self.point(from), self.point(to)];
        self.stroke_path(&points, style.stroke_width(), style.color());

        Ok(())
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let (x0, y0) = self.point(upper_left);
        let (x1, y1) = self.point(bottom_right);
        let (x, y) = (x0.min(x1), y0.min(y1));
        let (width, height) = ((x1 - x0).abs(), (y1 - y0).abs());
        let line_width = style.stroke_width();

        if !fill && line_width == 0 {
            return Ok(());
        }

        self.paint(style.color(), |content| {
            content.rect(x, y, width, height);

            if fill {
                content.fill_nonzero();
            } else {
                content.set_line_width(line_width as f32 * SCALE);
                content.stroke();
            }
        });

        Ok(())
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let points: Vec<_> = path.into_iter().map(|point| self.point(point)).collect();
        self.stroke_path(&points, style.stroke_width(), style.color());

        Ok(())
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let (x, y) = self.point(center);
        let r = radius as f32 * SCALE;
        let k = KAPPA * r;
        let line_width = style.stroke_width();

        if !fill && line_width == 0 {
            return Ok(());
        }

        self.paint(style.color(), |content| {
            content.move_to(x + r, y);
            content.cubic_to(x + r, y + k, x + k, y + r, x, y + r);
            content.cubic_to(x - k, y + r, x - r, y + k, x - r, y);
            content.cubic_to(x - r, y - k, x - k, y - r, x, y - r);
            content.cubic_to(x + k, y - r, x + r, y - k, x + r, y);
            content.close_path();

            if fill {
                content.fill_nonzero();
            } else {
                content.set_line_width(line_width as f32 * SCALE);
                content.stroke();
            }
        });

        Ok(())
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let points: Vec<_> = vert.into_iter().map(|point| self.point(point)).collect();

        if points.len() < 3 {
            return Ok(());
        }

        self.paint(style.color(), |content| {
            content.move_to(points[0].0, points[0].1);
            for &(x, y) in &points[1..] {
                content.line_to(x, y);
            }
            content.close_path();
            content.fill_nonzero();
        });

        Ok(())
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<io::Error>> {
        let size = style.size();
        let runs = runs(text, Font::from_style(style.style()));
        let anchor = style.anchor();

        // offsets from the anchor to the start of the baseline, in pixels
        let along = match anchor.h_pos {
            HPos::Left => 0.0,
            HPos::Center => -0.5 * width(&runs, size),
            HPos::Right => -width(&runs, size),
        };
        let up = match anchor.v_pos {
            VPos::Top => -ASCENT * size,
            VPos::Center => -0.5 * ASCENT * size,
            VPos::Bottom => DESCENT * size,
        };

        // counterclockwise on the page, which has its y axis pointing upwards
        let angle: f32 = match style.transform() {
            FontTransform::None => 0.0,
            FontTransform::Rotate90 => -FRAC_PI_2,
            FontTransform::Rotate180 => 2.0 * FRAC_PI_2,
            FontTransform::Rotate270 => FRAC_PI_2,
        };
        let (sin, cos) = angle.sin_cos();
        let (along, up) = (along as f32 * SCALE, up as f32 * SCALE);
        let (x, y) = self.point(pos);
        let origin = (x + cos * along - sin * up, y + sin * along + cos * up);

        self.paint(style.color(), |content| {
            content.begin_text();
            content.set_text_matrix([cos, sin, -sin, cos, origin.0, origin.1]);

            for run in &runs {
                let scale = run.shift.scale();
                content.set_font(Name(run.font.resource()), (size * scale) as f32 * SCALE);
                content.set_rise((size * run.shift.rise()) as f32 * SCALE);
                content.show(Str(&run.bytes));
            }

            content.end_text();
        });

        Ok(())
    }

    #[allow(clippy::cast_sign_loss)]
    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<io::Error>> {
        let size = style.size();
        let width = width(&runs(text, Font::from_style(style.style())), size);

        Ok((width.ceil() as u32, size.ceil() as u32))
    }
}

impl Drop for PdfBackend<'_> {
    fn drop(&mut self) {
        if !self.saved {
            // errors can not be reported from here, call `present` to see them
            let _ = self.present();
        }
    }
}
