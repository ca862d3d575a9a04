//! Configuration file handling.
//!
//! This module loads the typed report settings from
//! `storage-reporter.toml` and merges CLI overrides into them. The file is
//! validated once at load time; downstream components receive `&Config`.

use crate::error::ReportError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Default settings file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "storage-reporter.toml";

/// RGB color triple, 0-255 per channel.
pub type Color = [u8; 3];

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Inputs and report metadata.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Cover page styling.
    #[serde(default)]
    pub cover: CoverConfig,

    /// Page header decoration.
    #[serde(default)]
    pub header: HeaderConfig,

    /// Page footer decoration.
    #[serde(default)]
    pub footer: FooterConfig,

    /// Draft watermark.
    #[serde(default)]
    pub watermark: WatermarkConfig,

    /// Table of contents styling.
    #[serde(default)]
    pub toc: TocConfig,

    /// Section body styling.
    #[serde(default)]
    pub body: BodyConfig,

    /// Chart rendering settings.
    #[serde(default)]
    pub chart: ChartConfig,
}

/// Text alignment inside a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum Align {
    #[default]
    #[serde(rename = "L", alias = "l", alias = "left")]
    Left,
    #[serde(rename = "C", alias = "c", alias = "center")]
    Center,
    #[serde(rename = "R", alias = "r", alias = "right")]
    Right,
    #[serde(rename = "J", alias = "j", alias = "justify")]
    Justify,
}

/// Header and footer arrangement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum DecorationLayout {
    #[default]
    SingleLine,
    MultiLine,
}

/// Font family, style and size.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FontSpec {
    #[serde(default = "default_font_family")]
    pub family: String,

    /// Any combination of `B`, `I` and `U`.
    #[serde(default)]
    pub style: String,

    #[serde(default = "default_font_size")]
    pub size: f32,
}

impl FontSpec {
    pub fn new(family: &str, style: &str, size: f32) -> Self {
        Self {
            family: family.to_string(),
            style: style.to_string(),
            size,
        }
    }

    /// Regular body text.
    pub fn regular() -> Self {
        Self::new("Helvetica", "", default_font_size())
    }

    /// Titles default to bold.
    pub fn title() -> Self {
        Self::new("Helvetica", "B", default_font_size())
    }

    pub fn is_bold(&self) -> bool {
        self.style.contains('B')
    }

    pub fn is_italic(&self) -> bool {
        self.style.contains('I')
    }

    pub fn is_underline(&self) -> bool {
        self.style.contains('U')
    }

    pub fn with_size(&self, size: f32) -> Self {
        Self {
            size,
            ..self.clone()
        }
    }
}

impl Default for FontSpec {
    fn default() -> Self {
        Self::regular()
    }
}

fn default_font_family() -> String {
    "Helvetica".to_string()
}

fn default_font_size() -> f32 {
    12.0
}

/// Keep only the `B`, `I` and `U` flags, uppercased and deduplicated.
pub fn normalize_font_style(style: &str) -> String {
    let upper = style.to_uppercase();
    ['B', 'I', 'U']
        .into_iter()
        .filter(|flag| upper.contains(*flag))
        .collect()
}

/// Families the PDF writer can map to a built-in font.
const KNOWN_FAMILIES: [&str; 5] = ["helvetica", "arial", "times", "courier", "symbol"];

/// Input sources and report metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// CSV inventory files to analyze.
    #[serde(default)]
    pub sources: Vec<PathBuf>,

    /// Author printed on the cover.
    #[serde(default = "default_author")]
    pub author: String,

    /// Report version printed on the cover.
    #[serde(default = "default_version")]
    pub version: String,

    /// Directory receiving the PDF and the charts.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sources: Vec::new(),
            author: default_author(),
            version: default_version(),
            output_dir: default_output_dir(),
        }
    }
}

fn default_author() -> String {
    "Unknown Author".to_string()
}

fn default_version() -> String {
    "1.0".to_string()
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("storage_pdf_report")
}

/// Cover page settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoverConfig {
    /// Solid page background; white when unset.
    #[serde(default)]
    pub bg_color: Option<Color>,

    /// Image stretched across the page width.
    #[serde(default)]
    pub bg_image: Option<PathBuf>,

    #[serde(default = "FontSpec::title")]
    pub title_font: FontSpec,

    #[serde(default)]
    pub title_color: Color,

    #[serde(default = "center")]
    pub title_justification: Align,

    #[serde(default = "FontSpec::regular")]
    pub subtitle_font: FontSpec,

    #[serde(default)]
    pub subtitle_color: Color,

    #[serde(default = "center")]
    pub subtitle_justification: Align,
}

impl Default for CoverConfig {
    fn default() -> Self {
        Self {
            bg_color: None,
            bg_image: None,
            title_font: FontSpec::title(),
            title_color: [0, 0, 0],
            title_justification: Align::Center,
            subtitle_font: FontSpec::regular(),
            subtitle_color: [0, 0, 0],
            subtitle_justification: Align::Center,
        }
    }
}

fn center() -> Align {
    Align::Center
}

fn right() -> Align {
    Align::Right
}

fn default_true() -> bool {
    true
}

/// Page header settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeaderConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub logo: Option<PathBuf>,

    #[serde(default)]
    pub layout: DecorationLayout,

    #[serde(default)]
    pub text: String,

    #[serde(default)]
    pub text_align: Align,

    #[serde(default)]
    pub phone: String,

    #[serde(default)]
    pub phone_align: Align,
}

impl Default for HeaderConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logo: None,
            layout: DecorationLayout::SingleLine,
            text: String::new(),
            text_align: Align::Left,
            phone: String::new(),
            phone_align: Align::Left,
        }
    }
}

/// Page footer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FooterConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,

    #[serde(default)]
    pub logo: Option<PathBuf>,

    #[serde(default)]
    pub layout: DecorationLayout,

    #[serde(default)]
    pub text: String,

    #[serde(default = "right")]
    pub text_align: Align,

    #[serde(default = "center")]
    pub page_num_align: Align,
}

impl Default for FooterConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            logo: None,
            layout: DecorationLayout::SingleLine,
            text: String::new(),
            text_align: Align::Right,
            page_num_align: Align::Center,
        }
    }
}

/// Diagonal draft marker drawn over every body page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WatermarkConfig {
    #[serde(default)]
    pub enabled: bool,

    #[serde(default = "default_watermark_text")]
    pub text: String,

    #[serde(default = "default_watermark_color")]
    pub color: Color,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            text: default_watermark_text(),
            color: default_watermark_color(),
        }
    }
}

fn default_watermark_text() -> String {
    "DRAFT".to_string()
}

fn default_watermark_color() -> Color {
    [220, 220, 220]
}

/// Table of contents styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TocConfig {
    #[serde(default = "FontSpec::title")]
    pub title_font: FontSpec,

    #[serde(default)]
    pub title_color: Color,

    #[serde(default = "FontSpec::regular")]
    pub entry_font: FontSpec,

    #[serde(default)]
    pub entry_color: Color,
}

impl Default for TocConfig {
    fn default() -> Self {
        Self {
            title_font: FontSpec::title(),
            title_color: [0, 0, 0],
            entry_font: FontSpec::regular(),
            entry_color: [0, 0, 0],
        }
    }
}

/// Section body styling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyConfig {
    #[serde(default = "FontSpec::title")]
    pub section_title_font: FontSpec,
    #[serde(default)]
    pub section_title_color: Color,
    #[serde(default)]
    pub section_title_justification: Align,

    #[serde(default = "FontSpec::title")]
    pub chart_title_font: FontSpec,
    #[serde(default)]
    pub chart_title_color: Color,
    #[serde(default)]
    pub chart_title_justification: Align,

    #[serde(default = "FontSpec::title")]
    pub table_title_font: FontSpec,
    #[serde(default)]
    pub table_title_color: Color,
    #[serde(default)]
    pub table_title_justification: Align,

    #[serde(default = "FontSpec::regular")]
    pub font: FontSpec,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub justification: Align,

    /// Style applied to bucket names in the bucket table.
    #[serde(default = "default_bucket_style")]
    pub bucket_name_style: String,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            section_title_font: FontSpec::title(),
            section_title_color: [0, 0, 0],
            section_title_justification: Align::Left,
            chart_title_font: FontSpec::title(),
            chart_title_color: [0, 0, 0],
            chart_title_justification: Align::Left,
            table_title_font: FontSpec::title(),
            table_title_color: [0, 0, 0],
            table_title_justification: Align::Left,
            font: FontSpec::regular(),
            color: [0, 0, 0],
            justification: Align::Left,
            bucket_name_style: default_bucket_style(),
        }
    }
}

fn default_bucket_style() -> String {
    "B".to_string()
}

/// Chart rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChartConfig {
    /// Visual theme name.
    #[serde(default = "default_chart_style")]
    pub style: String,

    #[serde(default = "default_title_fontsize")]
    pub title_fontsize: u32,

    #[serde(default = "default_label_fontsize")]
    pub label_fontsize: u32,

    /// Rotation of category and date labels, in degrees.
    #[serde(default = "default_xaxis_rotation")]
    pub xaxis_rotation: i32,
}

impl Default for ChartConfig {
    fn default() -> Self {
        Self {
            style: default_chart_style(),
            title_fontsize: default_title_fontsize(),
            label_fontsize: default_label_fontsize(),
            xaxis_rotation: default_xaxis_rotation(),
        }
    }
}

fn default_chart_style() -> String {
    "seaborn-v0_8-darkgrid".to_string()
}

fn default_title_fontsize() -> u32 {
    14
}

fn default_label_fontsize() -> u32 {
    10
}

fn default_xaxis_rotation() -> i32 {
    45
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Err(ReportError::MissingConfig(path.to_path_buf()).into());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let mut config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        config.validate()?;
        Ok(config)
    }

    /// Normalize font styles and reject values the renderer cannot honour.
    pub fn validate(&mut self) -> Result<(), ReportError> {
        for font in self.fonts_mut() {
            font.style = normalize_font_style(&font.style);
            if !(font.size > 0.0) {
                return Err(ReportError::InvalidConfig(format!(
                    "font size must be positive, got {}",
                    font.size
                )));
            }
            let family = font.family.to_lowercase();
            if !KNOWN_FAMILIES.contains(&family.as_str()) {
                return Err(ReportError::InvalidConfig(format!(
                    "unsupported font family '{}' (expected one of {})",
                    font.family,
                    KNOWN_FAMILIES.join(", ")
                )));
            }
        }
        self.body.bucket_name_style = normalize_font_style(&self.body.bucket_name_style);

        if self.chart.title_fontsize == 0 || self.chart.label_fontsize == 0 {
            return Err(ReportError::InvalidConfig(
                "chart font sizes must be at least 1".to_string(),
            ));
        }
        if !(-90..=90).contains(&self.chart.xaxis_rotation) {
            return Err(ReportError::InvalidConfig(format!(
                "chart.xaxis_rotation must be within -90..=90, got {}",
                self.chart.xaxis_rotation
            )));
        }

        Ok(())
    }

    fn fonts_mut(&mut self) -> [&mut FontSpec; 8] {
        [
            &mut self.cover.title_font,
            &mut self.cover.subtitle_font,
            &mut self.toc.title_font,
            &mut self.toc.entry_font,
            &mut self.body.section_title_font,
            &mut self.body.chart_title_font,
            &mut self.body.table_title_font,
            &mut self.body.font,
        ]
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref inputs) = args.input {
            self.general.sources = inputs.clone();
        }
        if let Some(ref outdir) = args.outdir {
            self.general.output_dir = outdir.clone();
        }
        if let Some(ref author) = args.author {
            self.general.author = author.clone();
        }
        if let Some(ref version) = args.report_version {
            self.general.version = version.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.author, "Unknown Author");
        assert_eq!(config.general.version, "1.0");
        assert!(config.header.enabled);
        assert!(!config.watermark.enabled);
        assert_eq!(config.chart.xaxis_rotation, 45);
        assert_eq!(config.cover.title_font.style, "B");
        assert_eq!(config.body.font.style, "");
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
sources = ["a.csv", "b.csv"]
author = "Ops Team"

[header]
layout = "multi-line"
text_align = "C"

[body]
bucket_name_style = "bix"

[body.chart_title_font]
family = "Times"
style = "ub"
size = 16

[chart]
style = "classic"
xaxis_rotation = 0
"#;

        let mut config: Config = toml::from_str(toml_content).unwrap();
        config.validate().unwrap();
        assert_eq!(config.general.sources.len(), 2);
        assert_eq!(config.general.author, "Ops Team");
        assert_eq!(config.general.version, "1.0");
        assert_eq!(config.header.layout, DecorationLayout::MultiLine);
        assert_eq!(config.header.text_align, Align::Center);
        assert_eq!(config.body.bucket_name_style, "BI");
        assert_eq!(config.body.chart_title_font.style, "BU");
        assert_eq!(config.body.chart_title_font.size, 16.0);
        assert_eq!(config.chart.style, "classic");
        assert_eq!(config.chart.xaxis_rotation, 0);
        assert_eq!(config.footer.text_align, Align::Right);
    }

    #[test]
    fn test_validate_rejects_unknown_family() {
        let mut config = Config::default();
        config.body.font.family = "Comic Sans".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_rotation_out_of_range() {
        let mut config = Config::default();
        config.chart.xaxis_rotation = 120;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_missing_config_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = Config::load(&dir.path().join("absent.toml")).unwrap_err();
        assert!(err.to_string().contains("settings file not found"));
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(!toml_str.is_empty());
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[chart]"));

        let mut roundtrip: Config = toml::from_str(&toml_str).unwrap();
        assert!(roundtrip.validate().is_ok());
    }

    #[test]
    fn test_normalize_font_style() {
        assert_eq!(normalize_font_style("bi"), "BI");
        assert_eq!(normalize_font_style("xyz"), "");
        assert_eq!(normalize_font_style("UUB"), "BU");
    }
}
