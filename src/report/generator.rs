//! PDF report generation.
//!
//! This module lays out the analysed sections into a single PDF: a cover,
//! a linked table of contents, one body section per source and the page
//! decorations (header, footer, watermark) on every page after the cover.

use super::pdf::{
    text_width_mm, LinkId, PdfWriter, MARGIN_LEFT, MARGIN_RIGHT, MARGIN_TOP, PAGE_HEIGHT,
    PAGE_WIDTH,
};
use crate::analysis::Explanations;
use crate::charts::{Figure, Rgb};
use crate::config::{Align, Config, DecorationLayout, FontSpec, HeaderConfig};
use crate::error::ReportError;
use crate::fonts::FontFace;
use crate::models::{
    format_bytes, with_thousands, AggregationResult, ChartKind, RankedEntry, ReportSection,
};
use anyhow::{Context, Result};
use chrono::Local;
use serde::Serialize;
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// File name of the generated document inside the output directory.
pub const REPORT_FILE_NAME: &str = "Storage_Analysis_Report.pdf";

/// Vertical space a chart block is expected to need before it is placed.
const CHART_BLOCK_HEIGHT: f32 = 120.0;

/// Titles never shrink below this size.
const MIN_TITLE_SIZE: f32 = 6.0;

/// Charts are drawn 20 mm narrower than the page on each side.
const IMAGE_WIDTH: f32 = PAGE_WIDTH - 40.0;

const TABLE_FONT_SIZE: f32 = 10.0;
const TABLE_ROW_HEIGHT: f32 = 10.0;
const DECORATION_FONT_SIZE: f32 = 8.0;
const RULE_THICKNESS: f32 = 0.567;

/// Cursor position where body content starts on pages with a header.
///
/// Mirrors the layout drawn by the header so the body never overlaps it.
pub fn content_top(header: &HeaderConfig) -> f32 {
    if !header.enabled {
        return MARGIN_TOP;
    }
    match header.layout {
        DecorationLayout::SingleLine => MARGIN_TOP + 10.0 + 3.0,
        DecorationLayout::MultiLine => {
            let mut y = MARGIN_TOP;
            if logo_exists(header.logo.as_deref()) {
                y += 9.0 + 2.0;
            }
            y += 5.0;
            if !header.phone.trim().is_empty() {
                y += 5.0;
            }
            y + 3.0 + 3.0
        }
    }
}

/// Largest size, stepping down by one point from `size`, at which the
/// longest word of `title` fits within `available` millimetres.
pub fn fit_title_size(face: FontFace, title: &str, size: f32, available: f32) -> f32 {
    let longest = title
        .split(' ')
        .fold("", |best, w| if w.chars().count() > best.chars().count() { w } else { best });

    let mut current = size;
    while current > MIN_TITLE_SIZE {
        if text_width_mm(face, longest, current) < available {
            break;
        }
        current -= 1.0;
    }
    current
}

/// Column widths for a table: each column's widest cell plus padding,
/// scaled down proportionally when the table would exceed `available`.
pub fn column_widths(
    rows: &[Vec<String>],
    measure: impl Fn(&str) -> f32,
    available: f32,
) -> Vec<f32> {
    let columns = rows.iter().map(|r| r.len()).max().unwrap_or(0);
    let max_widths: Vec<f32> = (0..columns)
        .map(|c| {
            rows.iter()
                .filter_map(|r| r.get(c))
                .map(|cell| measure(cell))
                .fold(0.0, f32::max)
        })
        .collect();

    let total: f32 = max_widths.iter().sum::<f32>() + 4.0 * columns as f32;
    let scale = if total > available { available / total } else { 1.0 };
    max_widths.iter().map(|w| (w + 4.0) * scale).collect()
}

/// Whether a block of `needed` millimetres should start on a fresh page.
/// A block that already starts at the top of a page stays there.
pub fn needs_page_break(remaining: f32, needed: f32, at_top: bool) -> bool {
    !at_top && remaining < needed.max(CHART_BLOCK_HEIGHT)
}

fn logo_exists(path: Option<&Path>) -> bool {
    path.map_or(false, Path::exists)
}

fn color(c: [u8; 3]) -> Rgb {
    Rgb::from_array(c)
}

fn summary_rows(aggregation: &AggregationResult) -> Vec<Vec<String>> {
    let summary = &aggregation.summary;
    let total = summary.total_bytes.map(|b| b as f64);
    vec![
        vec!["Metric".to_string(), "Value".to_string()],
        vec![
            "Total Objects".to_string(),
            with_thousands(summary.object_count),
        ],
        vec!["Total Storage".to_string(), format_bytes(total)],
        vec![
            "Avg Object Size".to_string(),
            format_bytes(Some(summary.average_bytes())),
        ],
    ]
}

fn ranked_rows(header: &str, entries: &[RankedEntry]) -> Vec<Vec<String>> {
    let mut rows = vec![vec![header.to_string(), "total_size".to_string()]];
    rows.extend(entries.iter().map(|e| {
        vec![
            e.key.clone(),
            format_bytes(Some(e.total_bytes as f64)),
        ]
    }));
    rows
}

/// Assembles the final PDF from analysed sections.
pub struct PdfReportGenerator<'a> {
    config: &'a Config,
    sections: &'a [ReportSection],
    output_dir: PathBuf,
    writer: PdfWriter,
}

impl<'a> PdfReportGenerator<'a> {
    pub fn new(config: &'a Config, sections: &'a [ReportSection], output_dir: &Path) -> Self {
        let mut writer = PdfWriter::new("Storage Inventory Analysis Report");
        writer.set_content_top(content_top(&config.header));
        Self {
            config,
            sections,
            output_dir: output_dir.to_path_buf(),
            writer,
        }
    }

    /// Where the document is written.
    pub fn final_path(&self) -> PathBuf {
        self.output_dir.join(REPORT_FILE_NAME)
    }

    /// Lay out the whole document and save it. Returns the PDF path.
    pub fn create_report(mut self) -> Result<PathBuf> {
        std::fs::create_dir_all(&self.output_dir).with_context(|| {
            format!(
                "Failed to create output directory: {}",
                self.output_dir.display()
            )
        })?;

        self.cover()?;

        let sections = self.sections;
        let links: Vec<LinkId> = sections.iter().map(|_| self.writer.add_link()).collect();
        self.toc(&links)?;

        for (section, link) in sections.iter().zip(&links) {
            self.writer.add_page();
            self.writer.set_link(*link);
            self.section(section)?;
        }

        self.decorate_pages()?;

        let path = self.final_path();
        info!(
            "Writing {} pages to {}",
            self.writer.page_count(),
            path.display()
        );
        self.writer.save(&path)?;
        Ok(path)
    }

    fn cover(&mut self) -> Result<(), ReportError> {
        let cover = &self.config.cover;
        let general = &self.config.general;
        let w = &mut self.writer;

        w.add_page();
        w.set_auto_page_break(false);

        if let Some(bg) = cover.bg_color {
            w.fill_rect(0.0, 0.0, PAGE_WIDTH, PAGE_HEIGHT, color(bg))?;
        }
        if let Some(ref image) = cover.bg_image {
            if image.exists() {
                if let Err(e) = w.image(image, 0.0, 0.0, Some(PAGE_WIDTH), None) {
                    warn!("Skipping cover background: {}", e);
                }
            }
        }

        w.set_y(60.0);
        w.set_font(&cover.title_font);
        w.set_text_color(color(cover.title_color));
        w.multi_cell(
            0.0,
            15.0,
            "Storage Inventory\nAnalysis Report",
            cover.title_justification,
        )?;
        w.ln(25.0);

        w.set_font(&cover.subtitle_font);
        w.set_text_color(color(cover.subtitle_color));
        let just = cover.subtitle_justification;
        w.cell(0.0, 10.0, &format!("Version: {}", general.version), just, false, true)?;
        w.cell(0.0, 10.0, &format!("Author: {}", general.author), just, false, true)?;
        w.cell(
            0.0,
            10.0,
            &format!("Generated: {}", Local::now().format("%Y-%m-%d")),
            just,
            false,
            true,
        )?;

        w.set_auto_page_break(true);
        w.set_text_color(Rgb::BLACK);
        Ok(())
    }

    fn toc(&mut self, links: &[LinkId]) -> Result<(), ReportError> {
        let toc = &self.config.toc;
        let w = &mut self.writer;

        w.add_page();
        w.set_font(&toc.title_font);
        w.set_text_color(color(toc.title_color));
        w.cell(0.0, 20.0, "Table of Contents", Align::Center, false, true)?;
        w.ln(10.0);

        w.set_font(&toc.entry_font);
        w.set_text_color(color(toc.entry_color));
        for (section, link) in self.sections.iter().zip(links) {
            w.link_cell(0.0, 10.0, &section.title, Align::Left, *link)?;
        }
        Ok(())
    }

    fn section(&mut self, section: &ReportSection) -> Result<(), ReportError> {
        let config = self.config;
        let body = &config.body;
        debug!("Laying out section '{}'", section.title);

        self.writer.bookmark(&section.title);
        self.title_block(
            &section.title,
            &body.section_title_font,
            body.section_title_color,
            body.section_title_justification,
            10.0,
        )?;

        let aggregation = &section.aggregation;
        self.table("Overall Summary", &summary_rows(aggregation))?;
        if !aggregation.top_projects.is_empty() {
            self.table(
                "Top 10 Projects by Size",
                &ranked_rows("project_id", &aggregation.top_projects),
            )?;
        }
        if !aggregation.top_buckets.is_empty() {
            self.table(
                "Top 10 Buckets by Size",
                &ranked_rows("bucket_name", &aggregation.top_buckets),
            )?;
        }

        // Every slot keeps its title and explanation; omitted charts only
        // lose the image.
        let explanations = Explanations::new(aggregation, &section.title).all();
        for kind in ChartKind::ALL {
            let explanation = explanations
                .get(&kind)
                .map(String::as_str)
                .unwrap_or("No description available.");
            let figure = section.charts.get(&kind).map(|artifact| &artifact.figure);

            let needed = self.chart_block_height(kind.label(), explanation, figure);
            let at_top = self.writer.y() <= content_top(&config.header) + 0.01;
            let remaining = self.writer.remaining_height();
            let new_page = match figure {
                Some(_) => needs_page_break(remaining, needed, at_top),
                None => !at_top && remaining < needed,
            };
            if new_page {
                self.writer.add_page();
            }

            self.title_block(
                kind.label(),
                &body.chart_title_font,
                body.chart_title_color,
                body.chart_title_justification,
                15.0,
            )?;

            self.writer.set_font(&body.font);
            self.writer.set_text_color(color(body.color));
            self.writer.multi_cell(0.0, 5.0, explanation, body.justification)?;
            self.writer.ln(5.0);

            let Some(figure) = figure else {
                debug!("{}: no chart for '{}'", section.title, kind);
                continue;
            };
            let (x, y) = (self.writer.x(), self.writer.y());
            let height = self.writer.figure(figure, x, y, IMAGE_WIDTH)?;
            self.writer.ln(height);
            self.writer.ln(5.0);
        }
        Ok(())
    }

    /// Expected height of a chart block: title, explanation and image, if any.
    fn chart_block_height(&self, title: &str, explanation: &str, figure: Option<&Figure>) -> f32 {
        let body = &self.config.body;
        let available = self.writer.content_width();
        let title_font = &body.chart_title_font;
        let title_size = fit_title_size(
            FontFace::from_spec(title_font),
            title,
            title_font.size,
            available,
        );
        let title_lines = self
            .writer
            .line_count(&title_font.with_size(title_size), title, available);
        let text_lines = self.writer.line_count(&body.font, explanation, available);
        let text = title_lines as f32 * 15.0 + 5.0 + text_lines as f32 * 5.0 + 5.0;

        match figure {
            Some(figure) => text + IMAGE_WIDTH * (figure.height / figure.width) as f32 + 5.0,
            None => text,
        }
    }

    /// A title shrunk until its longest word fits the content width.
    fn title_block(
        &mut self,
        title: &str,
        font: &FontSpec,
        title_color: [u8; 3],
        align: Align,
        line_height: f32,
    ) -> Result<(), ReportError> {
        let available = self.writer.content_width();
        let size = fit_title_size(FontFace::from_spec(font), title, font.size, available);

        self.writer.set_text_color(color(title_color));
        self.writer.set_font(&font.with_size(size));
        self.writer.multi_cell(available, line_height, title, align)?;
        self.writer.ln(5.0);
        self.writer.set_font(font);
        Ok(())
    }

    fn table(&mut self, title: &str, rows: &[Vec<String>]) -> Result<(), ReportError> {
        let config = self.config;
        let body = &config.body;
        self.title_block(
            title,
            &body.table_title_font,
            body.table_title_color,
            body.table_title_justification,
            15.0,
        )?;
        if rows.len() < 2 {
            return Ok(());
        }

        let header_font = FontSpec::new("Helvetica", "B", TABLE_FONT_SIZE);
        let widths = column_widths(
            rows,
            |s| text_width_mm(FontFace::HELVETICA_BOLD, s, TABLE_FONT_SIZE),
            PAGE_WIDTH - 40.0,
        );

        self.writer.set_font(&header_font);
        self.writer.set_text_color(Rgb::BLACK);
        for (cell, w) in rows[0].iter().zip(&widths) {
            self.writer
                .cell(*w, TABLE_ROW_HEIGHT, cell, Align::Center, true, false)?;
        }
        self.writer.ln(TABLE_ROW_HEIGHT);

        let highlight_first = title.contains("Buckets");
        let plain = FontSpec::new("Helvetica", "", TABLE_FONT_SIZE);
        let highlighted = FontSpec::new("Helvetica", &body.bucket_name_style, TABLE_FONT_SIZE);
        for row in &rows[1..] {
            for (i, (cell, w)) in row.iter().zip(&widths).enumerate() {
                let font = if highlight_first && i == 0 { &highlighted } else { &plain };
                self.writer.set_font(font);
                self.writer
                    .cell(*w, TABLE_ROW_HEIGHT, cell, body.justification, true, false)?;
            }
            self.writer.ln(TABLE_ROW_HEIGHT);
        }
        self.writer.ln(10.0);
        Ok(())
    }

    /// Draw header, footer and watermark on every page after the cover.
    fn decorate_pages(&mut self) -> Result<(), ReportError> {
        let pages = self.writer.page_count();
        for page in 2..=pages {
            self.writer.begin_overlay(page, "Decorations")?;
            if self.config.header.enabled {
                self.header()?;
            }
            if self.config.footer.enabled {
                self.footer(page)?;
            }
            if self.config.watermark.enabled {
                self.watermark()?;
            }
            self.writer.end_overlay();
        }
        Ok(())
    }

    fn logo(&mut self, path: &Path, x: f32, y: f32, h: f32) {
        if let Err(e) = self.writer.image(path, x, y, None, Some(h)) {
            warn!("Skipping logo: {}", e);
        }
    }

    fn header(&mut self) -> Result<(), ReportError> {
        let config = self.config;
        let header = &config.header;
        let logo = header.logo.as_deref().filter(|p| p.exists());

        self.writer
            .set_font(&FontSpec::new("Helvetica", "", DECORATION_FONT_SIZE));
        self.writer.set_text_color(Rgb::BLACK);
        self.writer.set_y(MARGIN_TOP);

        let rule_y = match header.layout {
            DecorationLayout::MultiLine => {
                if let Some(logo) = logo {
                    self.logo(logo, MARGIN_LEFT, MARGIN_TOP, 9.0);
                    self.writer.set_y(MARGIN_TOP + 9.0 + 2.0);
                }
                self.writer
                    .cell(0.0, 5.0, &header.text, header.text_align, false, true)?;
                if !header.phone.trim().is_empty() {
                    self.writer
                        .cell(0.0, 5.0, &header.phone, header.phone_align, false, true)?;
                }
                self.writer.y() + 3.0
            }
            DecorationLayout::SingleLine => {
                let mut start_x = MARGIN_LEFT;
                if let Some(logo) = logo {
                    self.logo(logo, MARGIN_LEFT, MARGIN_TOP, 9.0);
                    start_x = 30.0;
                }

                let text = [header.text.trim(), header.phone.trim()]
                    .into_iter()
                    .filter(|p| !p.is_empty())
                    .collect::<Vec<_>>()
                    .join(" | ");
                let width = self.writer.string_width(&text);
                let x = match header.text_align {
                    Align::Center => {
                        start_x + (PAGE_WIDTH - start_x - MARGIN_RIGHT - width) / 2.0
                    }
                    Align::Right => PAGE_WIDTH - MARGIN_RIGHT - width,
                    Align::Left | Align::Justify => start_x,
                };
                if !text.is_empty() {
                    self.writer.set_x(x);
                    self.writer.cell(width, 10.0, &text, Align::Left, false, false)?;
                }
                MARGIN_TOP + 10.0
            }
        };

        self.writer.stroke_line(
            &[(MARGIN_LEFT, rule_y), (PAGE_WIDTH - MARGIN_RIGHT, rule_y)],
            Rgb::BLACK,
            RULE_THICKNESS,
        )
    }

    fn footer(&mut self, page: usize) -> Result<(), ReportError> {
        let config = self.config;
        let footer = &config.footer;
        let logo = footer.logo.as_deref().filter(|p| p.exists());
        let page_label = format!("Page {}", page);
        let italic = FontSpec::new("Helvetica", "I", DECORATION_FONT_SIZE);
        let regular = FontSpec::new("Helvetica", "", DECORATION_FONT_SIZE);

        self.writer.set_y(-20.0);
        match footer.layout {
            DecorationLayout::MultiLine => {
                if let Some(logo) = logo {
                    let y = self.writer.y();
                    self.logo(logo, PAGE_WIDTH / 2.0 - 10.0, y, 7.0);
                    self.writer.ln(8.0);
                }
                self.writer.set_font(&italic);
                self.writer.set_text_color(Rgb(128, 128, 128));
                self.writer
                    .cell(0.0, 5.0, &page_label, footer.page_num_align, false, true)?;
                self.writer.set_font(&regular);
                self.writer.set_text_color(Rgb::BLACK);
                self.writer
                    .cell(0.0, 5.0, &footer.text, footer.text_align, false, true)?;
            }
            DecorationLayout::SingleLine => {
                if let Some(logo) = logo {
                    let y = self.writer.y() + 2.0;
                    self.logo(logo, MARGIN_LEFT, y, 5.0);
                }
                self.writer.set_y(-15.0);
                self.writer.set_font(&italic);
                self.writer.set_text_color(Rgb(128, 128, 128));
                self.writer
                    .cell(0.0, 10.0, &page_label, footer.page_num_align, false, false)?;
                if !footer.text.is_empty() {
                    self.writer.set_y(-15.0);
                    self.writer.set_font(&regular);
                    self.writer.set_text_color(Rgb::BLACK);
                    self.writer
                        .cell(0.0, 10.0, &footer.text, footer.text_align, false, false)?;
                }
            }
        }
        Ok(())
    }

    /// Large text rotated 45 degrees about the page center.
    fn watermark(&mut self) -> Result<(), ReportError> {
        let watermark = &self.config.watermark;
        self.writer
            .set_font(&FontSpec::new("Helvetica", "B", 50.0));
        self.writer.set_text_color(color(watermark.color));

        let (cx, cy) = (PAGE_WIDTH / 2.0, PAGE_HEIGHT / 2.0);
        let width = self.writer.string_width(&watermark.text);
        // Baseline start in the unrotated frame, then turned about the center
        let (dx, dy) = (-width / 2.0, 20.0);
        let angle = 45f32.to_radians();
        let x = cx + dx * angle.cos() + dy * angle.sin();
        let y = cy - dx * angle.sin() + dy * angle.cos();
        self.writer.rotated_text(x, y, &watermark.text, 45.0)
    }
}

#[derive(Serialize)]
struct SectionSummary<'a> {
    title: &'a str,
    aggregation: &'a AggregationResult,
}

/// Generate the aggregation numbers of every section as JSON.
pub fn generate_json_summary(sections: &[ReportSection]) -> Result<String> {
    let summaries: Vec<SectionSummary> = sections
        .iter()
        .map(|s| SectionSummary {
            title: &s.title,
            aggregation: &s.aggregation,
        })
        .collect();
    serde_json::to_string_pretty(&summaries).map_err(Into::into)
}

/// Write the JSON summary to a file.
pub fn write_json_summary(sections: &[ReportSection], path: &Path) -> Result<()> {
    let content = generate_json_summary(sections)?;

    let mut file = std::fs::File::create(path)
        .with_context(|| format!("Failed to create {}", path.display()))?;
    file.write_all(content.as_bytes())?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregate;
    use crate::charts::ChartGenerator;
    use crate::ingest::parse_timestamp;
    use crate::models::Record;
    use crate::report::pdf::{page_links, page_texts};
    use printpdf::lopdf;
    use std::collections::BTreeMap;

    fn record(project: &str, bucket: &str, size: u64, ts: &str) -> Record {
        Record {
            project_id: Some(project.to_string()),
            bucket_name: Some(bucket.to_string()),
            size_bytes: Some(size),
            content_type: "image/jpeg".to_string(),
            created_ts: parse_timestamp(ts),
        }
    }

    fn create_test_section(title: &str) -> ReportSection {
        ReportSection {
            title: title.to_string(),
            aggregation: aggregate(&vec![
                record("project-alpha", "alpha-hot", 5 * 1024 * 1024, "2022-03-01T10:00:00Z"),
                record("project-beta", "beta-archive", 2048, "2023-07-15T08:30:00Z"),
            ]),
            charts: BTreeMap::new(),
        }
    }

    #[test]
    fn test_content_top() {
        let mut header = HeaderConfig::default();
        header.layout = DecorationLayout::SingleLine;
        assert_eq!(content_top(&header), 23.0);

        header.layout = DecorationLayout::MultiLine;
        header.logo = None;
        header.phone = "  ".to_string();
        assert_eq!(content_top(&header), 21.0);
        header.phone = "+1 555 0100".to_string();
        assert_eq!(content_top(&header), 26.0);

        header.enabled = false;
        assert_eq!(content_top(&header), MARGIN_TOP);
    }

    #[test]
    fn test_fit_title_size_shrinks_long_words() {
        let face = FontFace::HELVETICA_BOLD;
        assert_eq!(fit_title_size(face, "Short title", 16.0, 190.0), 16.0);

        let long = format!("Analysis for: {}", "x".repeat(120));
        let size = fit_title_size(face, &long, 16.0, 190.0);
        assert!(size < 16.0);
        assert!(size >= MIN_TITLE_SIZE);

        let huge = "w".repeat(500);
        assert_eq!(fit_title_size(face, &huge, 16.0, 190.0), MIN_TITLE_SIZE);
    }

    #[test]
    fn test_column_widths_scale_to_fit() {
        let rows = vec![
            vec!["ab".to_string(), "c".to_string()],
            vec!["a".to_string(), "cccc".to_string()],
        ];
        let measure = |s: &str| s.len() as f32 * 10.0;

        assert_eq!(column_widths(&rows, measure, 200.0), vec![24.0, 44.0]);

        // Total 68 squeezed into 34: everything halves
        assert_eq!(column_widths(&rows, measure, 34.0), vec![12.0, 22.0]);
    }

    #[test]
    fn test_needs_page_break() {
        assert!(needs_page_break(100.0, 50.0, false));
        assert!(!needs_page_break(130.0, 50.0, false));
        assert!(needs_page_break(130.0, 150.0, false));
        assert!(!needs_page_break(10.0, 150.0, true));
    }

    #[test]
    fn test_summary_rows() {
        let section = create_test_section("s");
        let rows = summary_rows(&section.aggregation);
        assert_eq!(rows[1], vec!["Total Objects", "2"]);
        assert_eq!(rows[2][1], "5.00 MB");

        let empty = summary_rows(&AggregationResult::default());
        assert_eq!(empty[2][1], "0 B");
        assert_eq!(empty[3][1], "0 B");
    }

    #[test]
    fn test_generate_json_summary() {
        let sections = vec![create_test_section("Analysis for: part 1")];
        let json = generate_json_summary(&sections).unwrap();

        assert!(json.contains("\"Analysis for: part 1\""));
        assert!(json.contains("\"top_projects\""));
        assert!(json.contains("\"project-alpha\""));
    }

    /// Text of every page of a saved report, runs joined by spaces.
    fn page_strings(doc: &lopdf::Document) -> Vec<String> {
        doc.get_pages()
            .values()
            .map(|&id| page_texts(doc, id).join(" "))
            .collect()
    }

    /// 1-based number of the first body page (after the TOC) that has a run
    /// equal to `title`.
    fn section_page(doc: &lopdf::Document, title: &str) -> u32 {
        doc.get_pages()
            .into_iter()
            .filter(|(no, _)| *no > 2)
            .find(|(_, id)| page_texts(doc, *id).iter().any(|t| t == title))
            .map(|(no, _)| no)
            .unwrap_or_else(|| panic!("no page titled {}", title))
    }

    #[test]
    fn test_create_report_writes_pdf() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.watermark.enabled = true;

        let generator = ChartGenerator::new(&config.chart, dir.path()).unwrap();
        let mut first = create_test_section("Analysis for: part 1");
        first.charts = generator.generate_all(&first.aggregation, "part-1").unwrap();
        assert!(first.charts.contains_key(&ChartKind::Dashboard));
        let dashboard_text =
            Explanations::new(&first.aggregation, &first.title).for_chart(ChartKind::Dashboard);

        let empty = ReportSection {
            title: "Analysis for: empty file".to_string(),
            aggregation: AggregationResult::default(),
            charts: BTreeMap::new(),
        };
        let empty_texts = Explanations::new(&empty.aggregation, &empty.title).all();
        let sections = vec![first, empty];

        let report = PdfReportGenerator::new(&config, &sections, dir.path());
        assert_eq!(report.final_path(), dir.path().join(REPORT_FILE_NAME));
        let path = report.create_report().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        assert!(bytes.starts_with(b"%PDF"));
        let doc = lopdf::Document::load_mem(&bytes).unwrap();
        let pages = doc.get_pages();
        let text = page_strings(&doc);

        // Cover title keeps its two lines
        let cover = page_texts(&doc, pages[&1]);
        assert_eq!(&cover[..2], &["Storage Inventory", "Analysis Report"]);
        assert!(cover.iter().any(|t| t.starts_with("Version: ")));

        // TOC entries link to the first page of their sections
        let toc = page_texts(&doc, pages[&2]);
        assert!(toc.iter().any(|t| t == "Table of Contents"));
        let first_page = section_page(&doc, "Analysis for: part 1");
        let empty_page = section_page(&doc, "Analysis for: empty file");
        assert!(empty_page > first_page);
        let targets: Vec<_> = page_links(&doc, pages[&2])
            .into_iter()
            .map(|(_, dest)| dest)
            .collect();
        assert_eq!(targets, vec![pages[&first_page], pages[&empty_page]]);

        assert!(text.iter().any(|t| t.contains(dashboard_text.as_str())));

        // The empty section still explains every slot, without charts
        let empty_text = text[(empty_page - 1) as usize..].join(" ");
        for kind in ChartKind::ALL {
            assert!(empty_text.contains(kind.label()), "missing {}", kind);
            let sentence = &empty_texts[&kind];
            assert!(
                text[(empty_page - 1) as usize..]
                    .iter()
                    .any(|t| t.contains(sentence.as_str())),
                "missing explanation: {}",
                sentence
            );
        }
        assert!(empty_text.contains("No project data found for 'Analysis for: empty file'."));
        assert!(!empty_text.contains("Storage Analysis Dashboard"));
        assert!(text[..(empty_page - 1) as usize]
            .iter()
            .any(|t| t.contains("Storage Analysis Dashboard")));
    }
}
