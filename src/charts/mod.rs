//! Chart selection and rendering.
//!
//! For every chart slot of a section this module decides whether there is
//! anything to draw and which shape fits the data, renders it into a
//! vector [`Figure`] and writes an SVG copy under `<outdir>/charts/`.

pub mod figure;
pub mod render;
pub mod theme;

pub use figure::{Anchor, DrawOp, Figure, Rgb, TextRun};
pub use render::ChartRenderer;

use crate::config::ChartConfig;
use crate::models::{
    AggregationResult, ChartArtifact, ChartKind, Period, RankedEntry, PIE_MAX_SLICES,
};
use anyhow::{Context, Result};
use chrono::{Datelike, Months, NaiveDate};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use theme::colors;
use tracing::{debug, info};

/// Pie slices for a ranked distribution: the five largest entries plus an
/// "Others" slice summing the rest when there are more than five.
pub fn pie_slices(entries: &[RankedEntry]) -> Vec<RankedEntry> {
    if entries.len() <= PIE_MAX_SLICES {
        return entries.to_vec();
    }
    let mut slices = entries[..PIE_MAX_SLICES].to_vec();
    let others = entries[PIE_MAX_SLICES..]
        .iter()
        .fold(0u64, |acc, e| acc.saturating_add(e.total_bytes));
    slices.push(RankedEntry::new("Others", others));
    slices
}

/// Months between x-axis ticks for a monthly series.
pub fn month_tick_interval(distinct_months: usize) -> u32 {
    match distinct_months {
        n if n > 24 => 6,
        n if n > 12 => 3,
        _ => 1,
    }
}

/// First days of the months in `from..=to` whose zero-based month number
/// is a multiple of `interval`.
pub fn month_ticks(from: NaiveDate, to: NaiveDate, interval: u32) -> Vec<NaiveDate> {
    let interval = interval.max(1);
    let mut ticks = Vec::new();
    let Some(mut month) = from.with_day(1) else {
        return ticks;
    };
    if month < from {
        month = match month.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => return ticks,
        };
    }
    while month <= to {
        if month.month0() % interval == 0 {
            ticks.push(month);
        }
        month = match month.checked_add_months(Months::new(1)) {
            Some(next) => next,
            None => break,
        };
    }
    ticks
}

/// January 1st of every year in `from..=to`.
pub fn year_ticks(from: NaiveDate, to: NaiveDate) -> Vec<NaiveDate> {
    (from.year()..=to.year())
        .filter_map(|y| NaiveDate::from_ymd_opt(y, 1, 1))
        .filter(|d| *d >= from && *d <= to)
        .collect()
}

/// Renders every chart slot of a section and persists the SVG copies.
pub struct ChartGenerator {
    renderer: ChartRenderer,
    charts_dir: PathBuf,
}

impl ChartGenerator {
    /// Create a generator writing into `<output_dir>/charts`.
    pub fn new(config: &ChartConfig, output_dir: &Path) -> Result<Self> {
        let charts_dir = output_dir.join("charts");
        std::fs::create_dir_all(&charts_dir).with_context(|| {
            format!("Failed to create charts directory: {}", charts_dir.display())
        })?;

        Ok(Self {
            renderer: ChartRenderer::new(config),
            charts_dir,
        })
    }

    /// Render a single slot, `None` when there is nothing to show.
    pub fn render(&self, kind: ChartKind, aggregation: &AggregationResult) -> Option<Figure> {
        let r = &self.renderer;
        match kind {
            ChartKind::Dashboard => Some(r.dashboard(aggregation)),
            ChartKind::TopProjects => r.ranked_bars(
                &aggregation.top_projects,
                "Top 10 Projects by Size",
                colors::SKY_BLUE,
            ),
            ChartKind::TopBuckets => r.ranked_bars(
                &aggregation.top_buckets,
                "Top 10 Buckets by Size",
                colors::SKY_BLUE,
            ),
            ChartKind::ProjectDistribution => r.distribution(
                &aggregation.distribution_by_project,
                "Storage Distribution by Project",
            ),
            ChartKind::SizeDistribution => r.size_histogram(
                &aggregation.size_distribution,
                "File Size Distribution",
                colors::PURPLE,
            ),
            ChartKind::MonthlyGrowth => r.growth(
                aggregation.growth(Period::Month),
                Period::Month,
                "Cumulative Monthly Storage Growth",
            ),
            ChartKind::YearlyGrowth => r.growth(
                aggregation.growth(Period::Year),
                Period::Year,
                "Cumulative Yearly Storage Growth",
            ),
        }
    }

    /// Render and persist every non-empty slot. A section without objects
    /// gets no charts at all.
    pub fn generate_all(
        &self,
        aggregation: &AggregationResult,
        prefix: &str,
    ) -> Result<BTreeMap<ChartKind, ChartArtifact>> {
        let mut charts = BTreeMap::new();
        if aggregation.is_empty() {
            info!("Skipping charts for '{}': it contains no objects", prefix);
            return Ok(charts);
        }

        for kind in ChartKind::ALL {
            let Some(figure) = self.render(kind, aggregation) else {
                debug!("{}: '{}' omitted, no data", prefix, kind);
                continue;
            };
            let path = self
                .charts_dir
                .join(format!("{}_{}.svg", prefix, kind.file_stem()));
            std::fs::write(&path, figure.to_svg())
                .with_context(|| format!("Failed to write chart: {}", path.display()))?;
            debug!("Wrote {}", path.display());
            charts.insert(kind, ChartArtifact { path, figure });
        }

        Ok(charts)
    }
}

/// All text runs of a figure, in drawing order.
#[cfg(test)]
pub(crate) fn figure_texts(figure: &Figure) -> Vec<String> {
    figure
        .ops
        .iter()
        .filter_map(|op| match op {
            DrawOp::Text(run) => Some(run.text.clone()),
            _ => None,
        })
        .collect()
}
