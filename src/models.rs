//! Data models for the storage reporter.
//!
//! This module contains the core data structures shared by the
//! normalizer, the aggregation engine, the chart layer and the PDF
//! assembler.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// Number of entries kept in the ranked project/bucket views.
pub const TOP_N: usize = 10;

/// Number of pie slices kept before the tail is folded into "Others".
pub const PIE_MAX_SLICES: usize = 5;

/// Buckets above this size get a cleanup remark in the explanations.
pub const LARGE_BUCKET_BYTES: u64 = 10 * 1024 * 1024 * 1024;

/// A single normalized inventory row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Record {
    /// Owning project, `None` when the cell is blank or the column is absent.
    pub project_id: Option<String>,
    /// Bucket holding the object.
    pub bucket_name: Option<String>,
    /// Object size, `None` when the cell is not a non-negative integer.
    pub size_bytes: Option<u64>,
    /// MIME type, `"unknown"` when blank.
    pub content_type: String,
    /// Creation time in UTC, `None` when unparsable.
    pub created_ts: Option<NaiveDateTime>,
}

/// Size bucket used by the file size histogram.
///
/// Variants are declared in canonical display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum SizeCategory {
    #[serde(rename = "0 B")]
    Empty,
    #[serde(rename = "< 1 KB")]
    UnderKb,
    #[serde(rename = "1 KB - 1 MB")]
    KbToMb,
    #[serde(rename = "1 MB - 1 GB")]
    MbToGb,
    #[serde(rename = "1 GB - 1 TB")]
    GbToTb,
    #[serde(rename = "> 1 TB")]
    OverTb,
}

impl SizeCategory {
    /// All categories in canonical order.
    pub const ALL: [SizeCategory; 6] = [
        SizeCategory::Empty,
        SizeCategory::UnderKb,
        SizeCategory::KbToMb,
        SizeCategory::MbToGb,
        SizeCategory::GbToTb,
        SizeCategory::OverTb,
    ];

    /// Classify an object size. Lower bounds are inclusive of the next tier.
    pub fn classify(size: Option<u64>) -> Self {
        const KB: u64 = 1024;
        const MB: u64 = KB * 1024;
        const GB: u64 = MB * 1024;
        const TB: u64 = GB * 1024;

        match size {
            None | Some(0) => SizeCategory::Empty,
            Some(s) if s < KB => SizeCategory::UnderKb,
            Some(s) if s < MB => SizeCategory::KbToMb,
            Some(s) if s < GB => SizeCategory::MbToGb,
            Some(s) if s < TB => SizeCategory::GbToTb,
            Some(_) => SizeCategory::OverTb,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SizeCategory::Empty => "0 B",
            SizeCategory::UnderKb => "< 1 KB",
            SizeCategory::KbToMb => "1 KB - 1 MB",
            SizeCategory::MbToGb => "1 MB - 1 GB",
            SizeCategory::GbToTb => "1 GB - 1 TB",
            SizeCategory::OverTb => "> 1 TB",
        }
    }
}

impl fmt::Display for SizeCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Object count and byte total for a source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    /// Number of normalized records, including rows with null fields.
    pub object_count: u64,
    /// Sum of the non-null sizes; `None` when no row carried a size.
    pub total_bytes: Option<u64>,
}

impl Summary {
    /// Average object size, zero for an empty source.
    pub fn average_bytes(&self) -> f64 {
        match (self.object_count, self.total_bytes) {
            (0, _) | (_, None) => 0.0,
            (count, Some(total)) => total as f64 / count as f64,
        }
    }
}

/// A key with its summed size, used by the ranked views.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RankedEntry {
    pub key: String,
    pub total_bytes: u64,
}

impl RankedEntry {
    pub fn new(key: impl Into<String>, total_bytes: u64) -> Self {
        Self {
            key: key.into(),
            total_bytes,
        }
    }
}

/// Bytes created within one calendar period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrowthPoint {
    /// First day of the month or year.
    pub period_start: NaiveDate,
    pub total_bytes: u64,
}

/// Granularity of a growth series.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Period {
    Month,
    Year,
}

/// Shape of the project distribution, shared by the chart selector and the
/// explanation text so both reach the same conclusion.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DistributionShape {
    Empty,
    /// Exactly one project: rendered as a single bar.
    Single,
    /// Two to five projects: every slice is shown.
    Complete(usize),
    /// More than five projects: the tail is folded into "Others".
    Folded(usize),
}

impl DistributionShape {
    pub fn of(entries: &[RankedEntry]) -> Self {
        match entries.len() {
            0 => DistributionShape::Empty,
            1 => DistributionShape::Single,
            n if n > PIE_MAX_SLICES => DistributionShape::Folded(n),
            n => DistributionShape::Complete(n),
        }
    }
}

/// The full battery of views computed for one source (or the union of all).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregationResult {
    pub summary: Summary,
    /// Up to ten projects, largest first.
    pub top_projects: Vec<RankedEntry>,
    /// Up to ten buckets, largest first.
    pub top_buckets: Vec<RankedEntry>,
    /// Every project, largest first.
    pub distribution_by_project: Vec<RankedEntry>,
    /// Per-month totals in ascending order.
    pub monthly_growth: Vec<GrowthPoint>,
    /// Per-year totals in ascending order.
    pub yearly_growth: Vec<GrowthPoint>,
    /// Object counts for the categories that occurred.
    pub size_distribution: BTreeMap<SizeCategory, u64>,
}

impl AggregationResult {
    pub fn is_empty(&self) -> bool {
        self.summary.object_count == 0
    }

    pub fn growth(&self, period: Period) -> &[GrowthPoint] {
        match period {
            Period::Month => &self.monthly_growth,
            Period::Year => &self.yearly_growth,
        }
    }

    pub fn distribution_shape(&self) -> DistributionShape {
        DistributionShape::of(&self.distribution_by_project)
    }

    /// The size category holding the most objects. Ties go to the smaller
    /// category.
    pub fn dominant_size_category(&self) -> Option<(SizeCategory, u64)> {
        self.size_distribution
            .iter()
            .fold(None, |best: Option<(SizeCategory, u64)>, (&cat, &count)| match best {
                Some((_, best_count)) if best_count >= count => best,
                _ => Some((cat, count)),
            })
    }
}

/// The chart slots of a report section, in display order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum ChartKind {
    Dashboard,
    TopProjects,
    TopBuckets,
    ProjectDistribution,
    SizeDistribution,
    MonthlyGrowth,
    YearlyGrowth,
}

impl ChartKind {
    pub const ALL: [ChartKind; 7] = [
        ChartKind::Dashboard,
        ChartKind::TopProjects,
        ChartKind::TopBuckets,
        ChartKind::ProjectDistribution,
        ChartKind::SizeDistribution,
        ChartKind::MonthlyGrowth,
        ChartKind::YearlyGrowth,
    ];

    /// Heading used for the chart in the PDF.
    pub fn label(&self) -> &'static str {
        match self {
            ChartKind::Dashboard => "Chart: Storage Dashboard",
            ChartKind::TopProjects => "Chart: Top 10 Projects by Size",
            ChartKind::TopBuckets => "Chart: Top 10 Buckets by Size",
            ChartKind::ProjectDistribution => "Chart: Storage Distribution by Project",
            ChartKind::SizeDistribution => "Chart: File Size Distribution",
            ChartKind::MonthlyGrowth => "Chart: Cumulative Monthly Storage Growth",
            ChartKind::YearlyGrowth => "Chart: Cumulative Yearly Storage Growth",
        }
    }

    /// Suffix of the persisted chart file name.
    pub fn file_stem(&self) -> &'static str {
        match self {
            ChartKind::Dashboard => "dashboard",
            ChartKind::TopProjects => "top_projects",
            ChartKind::TopBuckets => "top_buckets",
            ChartKind::ProjectDistribution => "distribution_by_project_pie",
            ChartKind::SizeDistribution => "size_distribution",
            ChartKind::MonthlyGrowth => "monthly_growth",
            ChartKind::YearlyGrowth => "yearly_growth",
        }
    }
}

impl fmt::Display for ChartKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A rendered chart: the vector figure plus where its SVG copy was written.
#[derive(Debug, Clone)]
pub struct ChartArtifact {
    pub path: PathBuf,
    pub figure: crate::charts::Figure,
}

/// One report unit covering a single source or the union of all sources.
#[derive(Debug, Clone)]
pub struct ReportSection {
    /// Heading shown in the TOC and at the top of the section.
    pub title: String,
    pub aggregation: AggregationResult,
    /// Rendered charts; omitted slots are simply absent.
    pub charts: BTreeMap<ChartKind, ChartArtifact>,
}

/// Format a byte count with binary units and two decimals.
///
/// `None`, negative and non-finite inputs format as `"0 B"`.
pub fn format_bytes(bytes: Option<f64>) -> String {
    const UNITS: [&str; 6] = ["B", "KB", "MB", "GB", "TB", "PB"];

    let mut value = match bytes {
        Some(b) if b.is_finite() && b >= 0.0 => b,
        _ => return "0 B".to_string(),
    };
    if value == 0.0 {
        return "0 B".to_string();
    }

    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    format!("{:.2} {}", value, UNITS[unit])
}

/// Shorthand for integral sizes.
pub fn human_size(bytes: u64) -> String {
    format_bytes(Some(bytes as f64))
}

/// Format an integer with comma thousands separators.
pub fn with_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
