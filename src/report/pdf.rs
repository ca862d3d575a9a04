//! Flowing PDF writer.
//!
//! A thin cursor-based layer over `printpdf`: positions are in millimetres
//! measured from the top-left corner of an A4 page, text is laid out with
//! built-in fonts, and internal links are bound in two phases (allocate
//! now, point at a page later, emit on [`PdfWriter::save`]).
//!
//! `printpdf` only knows URI link actions, so internal links are written
//! afterwards: the serialized document is reopened with its `lopdf` and
//! every bound link becomes a `/Link` annotation with a `/Dest` on the
//! target page object.

use crate::charts::{Anchor, DrawOp, Figure, Rgb, TextRun};
use crate::config::{Align, FontSpec};
use crate::error::ReportError;
use crate::fonts::{FontFace, FontFamily};
use printpdf::lopdf::{self, Dictionary, Object};
use printpdf::path::{PaintMode, WindingOrder};
use printpdf::{
    BuiltinFont, Color, Image, ImageTransform, IndirectFontRef, Line, Mm, PdfDocument,
    PdfDocumentReference, PdfLayerIndex, PdfLayerReference, PdfPageIndex, Point, Polygon, Pt,
    Rect, TextMatrix,
};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::{debug, warn};

pub const PAGE_WIDTH: f32 = 210.0;
pub const PAGE_HEIGHT: f32 = 297.0;
pub const MARGIN_LEFT: f32 = 10.0;
pub const MARGIN_RIGHT: f32 = 10.0;
pub const MARGIN_TOP: f32 = 10.0;
pub const MARGIN_BOTTOM: f32 = 15.0;

/// Horizontal padding inside a cell.
const CELL_MARGIN: f32 = 1.0;

const MM_PER_PT: f32 = 25.4 / 72.0;

/// Handle of an internal link allocated with [`PdfWriter::add_link`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LinkId(usize);

/// A clickable area waiting for its link target.
#[derive(Debug, Clone, Copy)]
struct PendingLink {
    page: usize,
    x: f32,
    y: f32,
    w: f32,
    h: f32,
    link: LinkId,
}

/// A link whose target is known: clickable area in points (PDF user
/// space) on `page`, jumping to the top of `target`. Pages are 1-based.
#[derive(Debug, Clone, Copy, PartialEq)]
struct BoundLink {
    page: u32,
    rect: [f32; 4],
    target: u32,
}

/// Current font state.
#[derive(Debug, Clone, Copy)]
struct FontState {
    face: FontFace,
    size: f32,
    underline: bool,
}

impl FontState {
    fn size_mm(&self) -> f32 {
        self.size * MM_PER_PT
    }
}

/// One wrapped line of a text block.
#[derive(Debug, Clone, PartialEq)]
pub struct WrappedLine {
    pub text: String,
    /// Last line of its paragraph; never stretched when justifying.
    pub paragraph_end: bool,
}

/// Break `text` into lines no wider than `max_width`.
///
/// Explicit newlines start a new paragraph. Words wider than the line are
/// split between characters.
pub fn wrap_text(text: &str, max_width: f32, measure: impl Fn(&str) -> f32) -> Vec<WrappedLine> {
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        for word in paragraph.split(' ').filter(|w| !w.is_empty()) {
            let candidate = if current.is_empty() {
                word.to_string()
            } else {
                format!("{} {}", current, word)
            };
            if measure(&candidate) <= max_width {
                current = candidate;
                continue;
            }

            if !current.is_empty() {
                lines.push(WrappedLine {
                    text: std::mem::take(&mut current),
                    paragraph_end: false,
                });
            }

            if measure(word) <= max_width {
                current = word.to_string();
            } else {
                for c in word.chars() {
                    let mut next = current.clone();
                    next.push(c);
                    if measure(&next) > max_width && !current.is_empty() {
                        lines.push(WrappedLine {
                            text: std::mem::take(&mut current),
                            paragraph_end: false,
                        });
                    }
                    current.push(c);
                }
            }
        }
        lines.push(WrappedLine {
            text: current,
            paragraph_end: true,
        });
    }

    lines
}

/// Replace characters the built-in fonts cannot encode. Newlines are kept
/// so wrapped blocks still see their paragraphs.
pub fn sanitize(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{2018}' | '\u{2019}' => '\'',
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2013}' | '\u{2014}' => '-',
            '\n' => '\n',
            '\t' | '\r' => ' ',
            c if c.is_ascii() && !c.is_ascii_control() => c,
            _ => '?',
        })
        .collect()
}

/// Width of `text` set in `face` at `size` points, in millimetres.
pub fn text_width_mm(face: FontFace, text: &str, size: f32) -> f32 {
    face.text_width(&sanitize(text), (size * MM_PER_PT) as f64) as f32
}

fn pdf_error(e: impl std::fmt::Debug) -> ReportError {
    ReportError::Pdf(format!("{:?}", e))
}

fn pdf_color(color: Rgb) -> Color {
    let (r, g, b) = color.unit();
    Color::Rgb(printpdf::Rgb::new(r, g, b, None))
}

fn builtin(face: FontFace) -> BuiltinFont {
    match (face.family, face.bold, face.italic) {
        (FontFamily::Helvetica, false, false) => BuiltinFont::Helvetica,
        (FontFamily::Helvetica, true, false) => BuiltinFont::HelveticaBold,
        (FontFamily::Helvetica, false, true) => BuiltinFont::HelveticaOblique,
        (FontFamily::Helvetica, true, true) => BuiltinFont::HelveticaBoldOblique,
        (FontFamily::Times, false, false) => BuiltinFont::TimesRoman,
        (FontFamily::Times, true, false) => BuiltinFont::TimesBold,
        (FontFamily::Times, false, true) => BuiltinFont::TimesItalic,
        (FontFamily::Times, true, true) => BuiltinFont::TimesBoldItalic,
        (FontFamily::Courier, false, false) => BuiltinFont::Courier,
        (FontFamily::Courier, true, false) => BuiltinFont::CourierBold,
        (FontFamily::Courier, false, true) => BuiltinFont::CourierOblique,
        (FontFamily::Courier, true, true) => BuiltinFont::CourierBoldOblique,
    }
}

/// Cursor-based writer over a `printpdf` document.
pub struct PdfWriter {
    doc: PdfDocumentReference,
    pages: Vec<(PdfPageIndex, PdfLayerIndex)>,
    fonts: HashMap<FontFace, IndirectFontRef>,
    font: FontState,
    text_color: Rgb,
    x: f32,
    y: f32,
    auto_page_break: bool,
    /// Where the cursor lands on pages after the first.
    content_top: f32,
    /// Layer used instead of the page content layer while decorating.
    overlay: Option<(usize, PdfLayerReference)>,
    links: Vec<Option<usize>>,
    pending_links: Vec<PendingLink>,
}

impl PdfWriter {
    pub fn new(title: &str) -> Self {
        Self {
            doc: PdfDocument::empty(sanitize(title)),
            pages: Vec::new(),
            fonts: HashMap::new(),
            font: FontState {
                face: FontFace::HELVETICA,
                size: 12.0,
                underline: false,
            },
            text_color: Rgb::BLACK,
            x: MARGIN_LEFT,
            y: MARGIN_TOP,
            auto_page_break: true,
            content_top: MARGIN_TOP,
            overlay: None,
            links: Vec::new(),
            pending_links: Vec::new(),
        }
    }

    /// Cursor position for body pages, below the page header.
    pub fn set_content_top(&mut self, y: f32) {
        self.content_top = y;
    }

    pub fn add_page(&mut self) {
        let layer_name = format!("Page {}", self.pages.len() + 1);
        let (page, layer) = self
            .doc
            .add_page(Mm(PAGE_WIDTH), Mm(PAGE_HEIGHT), layer_name);
        self.pages.push((page, layer));
        self.x = MARGIN_LEFT;
        self.y = if self.pages.len() == 1 {
            MARGIN_TOP
        } else {
            self.content_top
        };
    }

    pub fn page_count(&self) -> usize {
        self.pages.len()
    }

    pub fn set_auto_page_break(&mut self, enabled: bool) {
        self.auto_page_break = enabled;
    }

    pub fn x(&self) -> f32 {
        self.x
    }

    pub fn y(&self) -> f32 {
        self.y
    }

    pub fn set_x(&mut self, x: f32) {
        self.x = x;
    }

    /// Move the cursor to `y` and back to the left margin. Negative values
    /// count from the bottom edge.
    pub fn set_y(&mut self, y: f32) {
        self.x = MARGIN_LEFT;
        self.y = if y < 0.0 { PAGE_HEIGHT + y } else { y };
    }

    /// Width between the side margins.
    pub fn content_width(&self) -> f32 {
        PAGE_WIDTH - MARGIN_LEFT - MARGIN_RIGHT
    }

    /// Vertical space left above the bottom margin.
    pub fn remaining_height(&self) -> f32 {
        PAGE_HEIGHT - MARGIN_BOTTOM - self.y
    }

    pub fn set_font(&mut self, spec: &FontSpec) {
        self.font = FontState {
            face: FontFace::from_spec(spec),
            size: spec.size,
            underline: spec.is_underline(),
        };
    }

    pub fn set_font_face(&mut self, face: FontFace, size: f32) {
        self.font = FontState {
            face,
            size,
            underline: false,
        };
    }

    pub fn set_text_color(&mut self, color: Rgb) {
        self.text_color = color;
    }

    /// Width of `text` in the current font, in millimetres.
    pub fn string_width(&self, text: &str) -> f32 {
        text_width_mm(self.font.face, text, self.font.size)
    }

    /// Number of lines `text` wraps to in a `w` wide block set in `spec`.
    pub fn line_count(&self, spec: &FontSpec, text: &str, w: f32) -> usize {
        let face = FontFace::from_spec(spec);
        wrap_text(&sanitize(text), w - 2.0 * CELL_MARGIN, |s| {
            text_width_mm(face, s, spec.size)
        })
        .len()
    }

    fn font_ref(&mut self, face: FontFace) -> Result<IndirectFontRef, ReportError> {
        if let Some(font) = self.fonts.get(&face) {
            return Ok(font.clone());
        }
        let font = self
            .doc
            .add_builtin_font(builtin(face))
            .map_err(pdf_error)?;
        self.fonts.insert(face, font.clone());
        Ok(font)
    }

    fn layer(&self) -> Result<PdfLayerReference, ReportError> {
        if let Some((_, ref layer)) = self.overlay {
            return Ok(layer.clone());
        }
        let &(page, layer) = self
            .pages
            .last()
            .ok_or_else(|| ReportError::Pdf("no page to draw on".to_string()))?;
        Ok(self.doc.get_page(page).get_layer(layer))
    }

    /// Redirect drawing to a fresh layer on top of page `page_no` until
    /// [`PdfWriter::end_overlay`].
    pub fn begin_overlay(&mut self, page_no: usize, name: &str) -> Result<(), ReportError> {
        let &(page, _) = self
            .pages
            .get(page_no.wrapping_sub(1))
            .ok_or_else(|| ReportError::Pdf(format!("page {} does not exist", page_no)))?;
        let layer = self.doc.get_page(page).add_layer(name);
        self.overlay = Some((page_no, layer));
        Ok(())
    }

    pub fn end_overlay(&mut self) {
        self.overlay = None;
    }

    /// Page the next drawing operation lands on.
    fn target_page(&self) -> usize {
        match self.overlay {
            Some((page_no, _)) => page_no,
            None => self.pages.len(),
        }
    }

    fn break_if_needed(&mut self, h: f32) {
        if self.auto_page_break
            && self.overlay.is_none()
            && self.y + h > PAGE_HEIGHT - MARGIN_BOTTOM
        {
            let x = self.x;
            self.add_page();
            self.x = x;
        }
    }

    /// Draw `text` with its baseline at (`x`, `y`), top-left coordinates.
    pub fn text_at(&mut self, x: f32, y: f32, text: &str) -> Result<(), ReportError> {
        let text = sanitize(text).replace('\n', " ");
        if text.is_empty() {
            return Ok(());
        }
        let font = self.font_ref(self.font.face)?;
        let layer = self.layer()?;
        layer.set_fill_color(pdf_color(self.text_color));
        layer.use_text(
            text.as_str(),
            self.font.size,
            Mm(x),
            Mm(PAGE_HEIGHT - y),
            &font,
        );

        if self.font.underline {
            let w = self.string_width(&text);
            let uy = y + self.font.size_mm() * 0.1;
            self.stroke_line(&[(x, uy), (x + w, uy)], self.text_color, self.font.size * 0.05)?;
        }
        Ok(())
    }

    /// Draw `text` with its baseline starting at (`x`, `y`), rotated
    /// counter-clockwise by `degrees`.
    pub fn rotated_text(&mut self, x: f32, y: f32, text: &str, degrees: f32) -> Result<(), ReportError> {
        let text = sanitize(text).replace('\n', " ");
        if text.is_empty() {
            return Ok(());
        }
        let font = self.font_ref(self.font.face)?;
        let layer = self.layer()?;
        layer.set_fill_color(pdf_color(self.text_color));
        layer.begin_text_section();
        layer.set_font(&font, self.font.size);
        layer.set_text_matrix(TextMatrix::TranslateRotate(
            Pt(x / MM_PER_PT),
            Pt((PAGE_HEIGHT - y) / MM_PER_PT),
            degrees,
        ));
        layer.write_text(text.as_str(), &font);
        layer.end_text_section();
        Ok(())
    }

    /// fpdf-style cell: an optional border box of `w` x `h` with one line of
    /// aligned text, vertically centered. `w == 0` extends to the right
    /// margin. With `new_line` the cursor moves to the start of the next
    /// line, otherwise to the right of the cell.
    pub fn cell(
        &mut self,
        w: f32,
        h: f32,
        text: &str,
        align: Align,
        border: bool,
        new_line: bool,
    ) -> Result<(), ReportError> {
        self.break_if_needed(h);
        let w = if w <= 0.0 {
            PAGE_WIDTH - MARGIN_RIGHT - self.x
        } else {
            w
        };

        if border {
            let (x, y) = (self.x, self.y);
            self.stroke_line(
                &[(x, y), (x + w, y), (x + w, y + h), (x, y + h), (x, y)],
                Rgb::BLACK,
                0.567,
            )?;
        }

        if !text.is_empty() {
            let tw = self.string_width(text);
            let tx = match align {
                Align::Center => self.x + (w - tw) / 2.0,
                Align::Right => self.x + w - CELL_MARGIN - tw,
                Align::Left | Align::Justify => self.x + CELL_MARGIN,
            };
            let baseline = self.y + h / 2.0 + 0.3 * self.font.size_mm();
            self.text_at(tx, baseline, text)?;
        }

        if new_line {
            self.x = MARGIN_LEFT;
            self.y += h;
        } else {
            self.x += w;
        }
        Ok(())
    }

    /// A cell whose area links to `link`.
    pub fn link_cell(
        &mut self,
        w: f32,
        h: f32,
        text: &str,
        align: Align,
        link: LinkId,
    ) -> Result<(), ReportError> {
        self.break_if_needed(h);
        let w = if w <= 0.0 {
            PAGE_WIDTH - MARGIN_RIGHT - self.x
        } else {
            w
        };
        self.pending_links.push(PendingLink {
            page: self.target_page(),
            x: self.x,
            y: self.y,
            w,
            h,
            link,
        });
        self.cell(w, h, text, align, false, true)
    }

    /// Wrapped text block, one line of height `h` per wrapped line.
    /// `w == 0` extends to the right margin.
    pub fn multi_cell(&mut self, w: f32, h: f32, text: &str, align: Align) -> Result<(), ReportError> {
        let w = if w <= 0.0 {
            PAGE_WIDTH - MARGIN_RIGHT - self.x
        } else {
            w
        };
        let left = self.x;
        let max_width = w - 2.0 * CELL_MARGIN;
        let lines = wrap_text(&sanitize(text), max_width, |s| self.string_width(s));

        for line in lines {
            self.break_if_needed(h);
            self.x = left;
            if align == Align::Justify && !line.paragraph_end {
                self.justified_line(&line.text, max_width, h)?;
                self.y += h;
            } else {
                self.cell(w, h, &line.text, align, false, true)?;
            }
        }
        self.x = MARGIN_LEFT;
        Ok(())
    }

    fn justified_line(&mut self, text: &str, max_width: f32, h: f32) -> Result<(), ReportError> {
        let words: Vec<&str> = text.split(' ').filter(|w| !w.is_empty()).collect();
        let baseline = self.y + h / 2.0 + 0.3 * self.font.size_mm();
        let x0 = self.x + CELL_MARGIN;
        if words.len() < 2 {
            return self.text_at(x0, baseline, text);
        }

        let words_width: f32 = words.iter().map(|w| self.string_width(w)).sum();
        let gap = (max_width - words_width) / (words.len() - 1) as f32;
        let mut x = x0;
        for word in words {
            self.text_at(x, baseline, word)?;
            x += self.string_width(word) + gap;
        }
        Ok(())
    }

    /// Line break: back to the left margin, `h` lower.
    pub fn ln(&mut self, h: f32) {
        self.x = MARGIN_LEFT;
        self.y += h;
    }

    pub fn fill_rect(&mut self, x: f32, y: f32, w: f32, h: f32, color: Rgb) -> Result<(), ReportError> {
        let layer = self.layer()?;
        layer.set_fill_color(pdf_color(color));
        layer.add_rect(
            Rect::new(
                Mm(x),
                Mm(PAGE_HEIGHT - y - h),
                Mm(x + w),
                Mm(PAGE_HEIGHT - y),
            )
            .with_mode(PaintMode::Fill),
        );
        Ok(())
    }

    /// Open polyline; `thickness` is in points.
    pub fn stroke_line(&mut self, points: &[(f32, f32)], color: Rgb, thickness: f32) -> Result<(), ReportError> {
        let layer = self.layer()?;
        layer.set_outline_color(pdf_color(color));
        layer.set_outline_thickness(thickness);
        layer.add_line(Line {
            points: points
                .iter()
                .map(|&(x, y)| (Point::new(Mm(x), Mm(PAGE_HEIGHT - y)), false))
                .collect(),
            is_closed: false,
        });
        Ok(())
    }

    pub fn fill_polygon(&mut self, points: &[(f32, f32)], color: Rgb) -> Result<(), ReportError> {
        let layer = self.layer()?;
        layer.set_fill_color(pdf_color(color));
        layer.add_polygon(Polygon {
            rings: vec![points
                .iter()
                .map(|&(x, y)| (Point::new(Mm(x), Mm(PAGE_HEIGHT - y)), false))
                .collect()],
            mode: PaintMode::Fill,
            winding_order: WindingOrder::NonZero,
        });
        Ok(())
    }

    /// Place a raster image with its top-left corner at (`x`, `y`). Exactly
    /// one of `w` or `h` should be given; the other follows the aspect
    /// ratio. Returns the drawn size.
    pub fn image(
        &mut self,
        path: &Path,
        x: f32,
        y: f32,
        w: Option<f32>,
        h: Option<f32>,
    ) -> Result<(f32, f32), ReportError> {
        const DPI: f32 = 300.0;

        let dynamic = printpdf::image_crate::open(path).map_err(|e| {
            ReportError::Pdf(format!("cannot load image {}: {}", path.display(), e))
        })?;
        let (px_w, px_h) = printpdf::image_crate::GenericImageView::dimensions(&dynamic);
        if px_w == 0 || px_h == 0 {
            return Ok((0.0, 0.0));
        }
        let natural_w = px_w as f32 / DPI * 25.4;
        let natural_h = px_h as f32 / DPI * 25.4;
        let scale = match (w, h) {
            (Some(w), _) => w / natural_w,
            (None, Some(h)) => h / natural_h,
            (None, None) => 1.0,
        };
        let (draw_w, draw_h) = (natural_w * scale, natural_h * scale);

        let layer = self.layer()?;
        Image::from_dynamic_image(&dynamic).add_to_layer(
            layer,
            ImageTransform {
                translate_x: Some(Mm(x)),
                translate_y: Some(Mm(PAGE_HEIGHT - y - draw_h)),
                scale_x: Some(scale),
                scale_y: Some(scale),
                dpi: Some(DPI),
                ..Default::default()
            },
        );
        Ok((draw_w, draw_h))
    }

    /// Replay a chart figure with its top-left corner at (`x`, `y`),
    /// scaled to `width` millimetres. Returns the drawn height.
    pub fn figure(&mut self, figure: &Figure, x: f32, y: f32, width: f32) -> Result<f32, ReportError> {
        let scale = width as f64 / figure.width;
        let map = |(fx, fy): (f64, f64)| (x + (fx * scale) as f32, y + (fy * scale) as f32);
        let height = (figure.height * scale) as f32;

        self.fill_rect(x, y, width, height, figure.background)?;
        for op in &figure.ops {
            match op {
                DrawOp::Rect {
                    x: rx,
                    y: ry,
                    w,
                    h,
                    fill,
                } => {
                    let (px, py) = map((*rx, *ry));
                    self.fill_rect(px, py, (w * scale) as f32, (h * scale) as f32, *fill)?;
                }
                DrawOp::Line {
                    points,
                    color,
                    width: line_width,
                } => {
                    let mapped: Vec<(f32, f32)> = points.iter().copied().map(map).collect();
                    let thickness = (line_width * scale) as f32 / MM_PER_PT;
                    self.stroke_line(&mapped, *color, thickness)?;
                }
                DrawOp::Polygon { points, fill } => {
                    let mapped: Vec<(f32, f32)> = points.iter().copied().map(map).collect();
                    self.fill_polygon(&mapped, *fill)?;
                }
                DrawOp::Text(run) => {
                    let (px, py) = map((run.x, run.y));
                    self.figure_text(run, px, py, scale)?;
                }
            }
        }
        Ok(height)
    }

    fn figure_text(&mut self, run: &TextRun, x: f32, y: f32, scale: f64) -> Result<(), ReportError> {
        let size_mm = run.size * scale;
        let saved = (self.font, self.text_color);
        self.set_font_face(run.face(), (size_mm as f32) / MM_PER_PT);
        self.set_text_color(run.color);

        let width = run.face().text_width(&sanitize(&run.text), size_mm) as f32;
        let offset = match run.anchor {
            Anchor::Start => 0.0,
            Anchor::Middle => width / 2.0,
            Anchor::End => width,
        };

        let result = if run.rotation == 0.0 {
            self.text_at(x - offset, y, &run.text)
        } else {
            // Shift the start point back along the rotated baseline
            let angle = (run.rotation as f32).to_radians();
            let sx = x - offset * angle.cos();
            let sy = y + offset * angle.sin();
            self.rotated_text(sx, sy, &run.text, run.rotation as f32)
        };

        self.font = saved.0;
        self.text_color = saved.1;
        result
    }

    /// Allocate a link whose target page is bound later.
    pub fn add_link(&mut self) -> LinkId {
        self.links.push(None);
        LinkId(self.links.len() - 1)
    }

    /// Point `link` at the current page.
    pub fn set_link(&mut self, link: LinkId) {
        if let Some(slot) = self.links.get_mut(link.0) {
            *slot = Some(self.pages.len());
        }
    }

    /// Target page of `link`, if bound.
    pub fn link_target(&self, link: LinkId) -> Option<usize> {
        self.links.get(link.0).copied().flatten()
    }

    /// Add an outline entry pointing at the current page.
    pub fn bookmark(&mut self, title: &str) {
        if let Some(&(page, _)) = self.pages.last() {
            self.doc.add_bookmark(sanitize(title), page);
        }
    }

    /// Drain the pending links, dropping any that were never bound.
    fn bound_links(&mut self) -> Vec<BoundLink> {
        let mut bound = Vec::new();
        for pending in std::mem::take(&mut self.pending_links) {
            let Some(target) = self.link_target(pending.link) else {
                warn!("Link on page {} was never bound, skipping", pending.page);
                continue;
            };
            bound.push(BoundLink {
                page: pending.page as u32,
                rect: [
                    pending.x / MM_PER_PT,
                    (PAGE_HEIGHT - pending.y - pending.h) / MM_PER_PT,
                    (pending.x + pending.w) / MM_PER_PT,
                    (PAGE_HEIGHT - pending.y) / MM_PER_PT,
                ],
                target: target as u32,
            });
        }
        bound
    }

    /// Write the document, with its internal links, to `path`.
    pub fn save(mut self, path: &Path) -> Result<(), ReportError> {
        let links = self.bound_links();
        let bytes = self.doc.save_to_bytes().map_err(pdf_error)?;
        let mut doc = lopdf::Document::load_mem(&bytes).map_err(pdf_error)?;
        write_links(&mut doc, &links)?;

        let file = File::create(path).map_err(|e| {
            ReportError::Pdf(format!("cannot create {}: {}", path.display(), e))
        })?;
        let mut out = BufWriter::new(file);
        doc.save_to(&mut out).map_err(pdf_error)?;
        out.flush().map_err(pdf_error)?;
        Ok(())
    }
}

/// Add a GoTo link annotation to the source page of every link.
fn write_links(doc: &mut lopdf::Document, links: &[BoundLink]) -> Result<(), ReportError> {
    let pages = doc.get_pages();
    for link in links {
        let (Some(&page_id), Some(&target_id)) = (pages.get(&link.page), pages.get(&link.target))
        else {
            warn!("Link {} -> {} points outside the document", link.page, link.target);
            continue;
        };

        let annotation = Dictionary::from_iter(vec![
            ("Type", Object::from("Annot")),
            ("Subtype", Object::from("Link")),
            (
                "Rect",
                Object::Array(link.rect.iter().map(|&v| Object::Real(v)).collect()),
            ),
            (
                "Border",
                Object::Array(vec![Object::Integer(0), Object::Integer(0), Object::Integer(0)]),
            ),
            (
                "Dest",
                Object::Array(vec![
                    Object::Reference(target_id),
                    Object::from("XYZ"),
                    Object::Null,
                    Object::Real(PAGE_HEIGHT / MM_PER_PT),
                    Object::Null,
                ]),
            ),
        ]);
        let annotation_id = doc.add_object(annotation);

        let page = doc.get_dictionary_mut(page_id).map_err(pdf_error)?;
        match page.get_mut(b"Annots") {
            Ok(Object::Array(annots)) => annots.push(Object::Reference(annotation_id)),
            _ => page.set("Annots", Object::Array(vec![Object::Reference(annotation_id)])),
        }
        debug!("Linked page {} -> page {}", link.page, link.target);
    }
    Ok(())
}

/// Text shown on one page of a saved document, one entry per `Tj` run.
#[cfg(test)]
pub(crate) fn page_texts(doc: &lopdf::Document, page_id: lopdf::ObjectId) -> Vec<String> {
    let content = doc.get_page_content(page_id).unwrap_or_default();
    let Ok(content) = lopdf::content::Content::decode(&content) else {
        return Vec::new();
    };
    content
        .operations
        .iter()
        .filter(|op| op.operator == "Tj")
        .filter_map(|op| op.operands.first())
        .filter_map(|operand| operand.as_str().ok())
        .map(|bytes| String::from_utf8_lossy(bytes).into_owned())
        .collect()
}

/// `(annotation rect, destination page id)` of every GoTo link on a page.
#[cfg(test)]
pub(crate) fn page_links(
    doc: &lopdf::Document,
    page_id: lopdf::ObjectId,
) -> Vec<(Vec<f32>, lopdf::ObjectId)> {
    doc.get_page_annotations(page_id)
        .into_iter()
        .filter_map(|annot| {
            let rect = annot
                .get(b"Rect")
                .and_then(Object::as_array)
                .ok()?
                .iter()
                .filter_map(|v| v.as_float().ok())
                .collect();
            let dest = annot
                .get(b"Dest")
                .and_then(Object::as_array)
                .ok()?
                .first()?
                .as_reference()
                .ok()?;
            Some((rect, dest))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chars(s: &str) -> f32 {
        s.chars().count() as f32
    }

    #[test]
    fn test_wrap_text_breaks_on_spaces() {
        let lines = wrap_text("aaa bbb ccc", 7.0, chars);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["aaa bbb", "ccc"]);
        assert!(!lines[0].paragraph_end);
        assert!(lines[1].paragraph_end);
    }

    #[test]
    fn test_wrap_text_splits_long_words() {
        let lines = wrap_text("ab abcdefghij", 4.0, chars);
        let texts: Vec<_> = lines.iter().map(|l| l.text.as_str()).collect();
        assert_eq!(texts, vec!["ab", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn test_wrap_text_keeps_paragraphs() {
        let lines = wrap_text("Storage Inventory\nAnalysis Report", 100.0, chars);
        assert_eq!(lines.len(), 2);
        assert!(lines.iter().all(|l| l.paragraph_end));
        assert_eq!(wrap_text("", 10.0, chars).len(), 1);
    }

    #[test]
    fn test_sanitize() {
        assert_eq!(sanitize("a\u{2019}b \u{2014} c"), "a'b - c");
        assert_eq!(sanitize("caf\u{e9}"), "caf?");
        assert_eq!(sanitize("one\ntwo\tthree\u{7}"), "one\ntwo three?");
    }

    fn saved(writer: PdfWriter) -> lopdf::Document {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.pdf");
        writer.save(&path).unwrap();
        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        lopdf::Document::load_mem(&bytes).unwrap()
    }

    #[test]
    fn test_multi_cell_breaks_on_newlines() {
        let mut writer = PdfWriter::new("t");
        writer.add_page();
        let spec = FontSpec::new("Helvetica", "B", 24.0);
        writer.set_font(&spec);
        writer.set_y(60.0);
        writer
            .multi_cell(0.0, 15.0, "Storage Inventory\nAnalysis Report", Align::Center)
            .unwrap();
        assert_eq!(writer.y(), 90.0);
        assert_eq!(
            writer.line_count(&spec, "Storage Inventory\nAnalysis Report", 190.0),
            2
        );

        let doc = saved(writer);
        let page = doc.get_pages()[&1];
        assert_eq!(
            page_texts(&doc, page),
            vec!["Storage Inventory", "Analysis Report"]
        );
    }

    #[test]
    fn test_cursor_and_page_breaks() {
        let mut writer = PdfWriter::new("t");
        writer.set_content_top(30.0);
        writer.add_page();
        assert_eq!(writer.y(), MARGIN_TOP);

        writer.add_page();
        assert_eq!(writer.y(), 30.0);
        writer.set_y(PAGE_HEIGHT - MARGIN_BOTTOM - 5.0);
        writer.cell(0.0, 10.0, "overflow", Align::Left, false, true).unwrap();
        assert_eq!(writer.page_count(), 3);
        assert_eq!(writer.y(), 40.0);

        writer.set_auto_page_break(false);
        writer.set_y(PAGE_HEIGHT - 5.0);
        writer.cell(0.0, 10.0, "no break", Align::Left, false, true).unwrap();
        assert_eq!(writer.page_count(), 3);
    }

    #[test]
    fn test_links_bind_in_two_phases() {
        let mut writer = PdfWriter::new("t");
        writer.add_page();
        let first = writer.add_link();
        let second = writer.add_link();
        let unbound = writer.add_link();
        writer.link_cell(0.0, 10.0, "one", Align::Left, first).unwrap();
        writer.link_cell(0.0, 10.0, "two", Align::Left, second).unwrap();
        writer.link_cell(0.0, 10.0, "never", Align::Left, unbound).unwrap();
        assert_eq!(writer.link_target(first), None);

        writer.add_page();
        writer.set_link(first);
        writer.add_page();
        writer.set_link(second);
        assert_eq!(writer.link_target(first), Some(2));
        assert_eq!(writer.link_target(second), Some(3));

        let doc = saved(writer);
        let pages = doc.get_pages();
        let links = page_links(&doc, pages[&1]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].1, pages[&2]);
        assert_eq!(links[1].1, pages[&3]);

        // First cell spans the content width at the top margin
        let rect = &links[0].0;
        assert!((rect[0] - MARGIN_LEFT / MM_PER_PT).abs() < 0.01);
        assert!((rect[3] - (PAGE_HEIGHT - MARGIN_TOP) / MM_PER_PT).abs() < 0.01);
        assert!((rect[2] - (PAGE_WIDTH - MARGIN_RIGHT) / MM_PER_PT).abs() < 0.01);
        assert!(page_links(&doc, pages[&2]).is_empty());
    }
}
