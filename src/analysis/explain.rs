//! Chart explanations.
//!
//! Text is derived only from the fields of an [`AggregationResult`] that
//! the chart renderer also reads, so every sentence agrees with its chart.

use crate::models::{
    human_size, with_thousands, AggregationResult, ChartKind, DistributionShape, GrowthPoint,
    RankedEntry, LARGE_BUCKET_BYTES,
};
use std::collections::BTreeMap;

/// Explanation generator bound to one section.
pub struct Explanations<'a> {
    aggregation: &'a AggregationResult,
    source_name: &'a str,
}

impl<'a> Explanations<'a> {
    pub fn new(aggregation: &'a AggregationResult, source_name: &'a str) -> Self {
        Self {
            aggregation,
            source_name,
        }
    }

    /// One explanation per chart slot.
    pub fn all(&self) -> BTreeMap<ChartKind, String> {
        ChartKind::ALL
            .iter()
            .map(|&kind| (kind, self.for_chart(kind)))
            .collect()
    }

    pub fn for_chart(&self, kind: ChartKind) -> String {
        match kind {
            ChartKind::Dashboard => self.dashboard(),
            ChartKind::TopProjects => self.top_projects(),
            ChartKind::TopBuckets => self.top_buckets(),
            ChartKind::ProjectDistribution => self.distribution_by_project(),
            ChartKind::SizeDistribution => self.size_distribution(),
            ChartKind::MonthlyGrowth => self.monthly_growth(),
            ChartKind::YearlyGrowth => self.yearly_growth(),
        }
    }

    fn dashboard(&self) -> String {
        let project_text = match self.aggregation.top_projects.first() {
            Some(top) => format!("The largest project is '{}'.", top.key),
            None => "No project data available.".to_string(),
        };
        let bucket_text = match self.aggregation.top_buckets.first() {
            Some(top) => format!("The single largest bucket is '{}'.", top.key),
            None => "No bucket data available.".to_string(),
        };

        format!(
            "This dashboard provides a high-level summary for '{}'. It combines critical \
             metrics into a single view. {} {}",
            self.source_name, project_text, bucket_text
        )
    }

    fn top_projects(&self) -> String {
        match self.leader_with_share(&self.aggregation.top_projects) {
            Some((top, share)) => format!(
                "This chart aggregates storage for each project, showing the top 10. For '{}', \
                 '{}' is the largest, accounting for {} ({:.1}% of the total). This view is \
                 critical for strategic planning and budget allocation.",
                self.source_name,
                top.key,
                human_size(top.total_bytes),
                share
            ),
            None => format!("No project data found for '{}'.", self.source_name),
        }
    }

    fn top_buckets(&self) -> String {
        match self.leader_with_share(&self.aggregation.top_buckets) {
            Some((top, share)) => {
                let remark = if top.total_bytes > LARGE_BUCKET_BYTES {
                    "making it a key target for potential cleanup or data tiering initiatives."
                } else {
                    "which is a manageable size and may not require immediate attention."
                };
                format!(
                    "This chart identifies the top 10 largest individual buckets. For '{}', \
                     '{}' consumes the most space at {} ({:.1}% of the total), {}",
                    self.source_name,
                    top.key,
                    human_size(top.total_bytes),
                    share,
                    remark
                )
            }
            None => format!("No bucket data found for '{}'.", self.source_name),
        }
    }

    fn distribution_by_project(&self) -> String {
        match self.aggregation.distribution_shape() {
            DistributionShape::Empty => format!(
                "No project data found in '{}' to create a distribution chart.",
                self.source_name
            ),
            DistributionShape::Single => "This chart shows the total storage for the single \
                 project found in this data source. Because only one item was detected, a bar \
                 chart is used instead of a pie chart for clarity. This view is critical for \
                 understanding the overall storage footprint of this project."
                .to_string(),
            DistributionShape::Complete(n) => pie_narrative(n, "all projects are displayed."),
            DistributionShape::Folded(n) => pie_narrative(
                n,
                "the smallest projects are grouped into an 'Others' category for clarity.",
            ),
        }
    }

    fn size_distribution(&self) -> String {
        match self.aggregation.dominant_size_category() {
            Some((category, count)) => format!(
                "This chart categorizes objects by size. The data in '{}' is primarily composed \
                 of files in the '{}' range, with {} objects. This helps understand the nature \
                 of the data.",
                self.source_name,
                category,
                with_thousands(count)
            ),
            None => format!(
                "No file size data found for '{}'.",
                self.source_name
            ),
        }
    }

    fn monthly_growth(&self) -> String {
        match period_range(&self.aggregation.monthly_growth, "%Y-%m") {
            Some((first, last)) => format!(
                "This chart displays the cumulative growth of storage on a month-by-month basis \
                 from {} to {}. The upward trend visualizes the rate at which new data is being \
                 added, which is useful for observing short-to-medium term trends and seasonal \
                 changes in storage consumption.",
                first, last
            ),
            None => format!(
                "No time-series data found for '{}'.",
                self.source_name
            ),
        }
    }

    fn yearly_growth(&self) -> String {
        match period_range(&self.aggregation.yearly_growth, "%Y") {
            Some((first, last)) => format!(
                "This chart displays the cumulative growth of storage on a year-by-year basis \
                 from {} to {}. This high-level view is key for understanding the long-term data \
                 growth trajectory and for forecasting future capacity and budget requirements \
                 over multiple years.",
                first, last
            ),
            None => format!(
                "No yearly time-series data found for '{}' to plot storage growth.",
                self.source_name
            ),
        }
    }

    /// The first ranked entry and its share of the section total, or `None`
    /// when there is nothing to rank or no bytes to divide by.
    fn leader_with_share<'e>(&self, entries: &'e [RankedEntry]) -> Option<(&'e RankedEntry, f64)> {
        let top = entries.first()?;
        let total = self.aggregation.summary.total_bytes.filter(|&t| t > 0)?;
        Some((top, share_percent(top.total_bytes, total)))
    }
}

/// `part / total * 100`, zero when the total is zero.
pub fn share_percent(part: u64, total: u64) -> f64 {
    if total == 0 {
        0.0
    } else {
        part as f64 / total as f64 * 100.0
    }
}

fn pie_narrative(projects: usize, grouping: &str) -> String {
    format!(
        "This pie chart illustrates the proportion of total storage consumed by each project. \
         In this dataset of {} unique projects, {} This view is critical for understanding \
         which teams or applications are the primary drivers of storage costs.",
        projects, grouping
    )
}

fn period_range(series: &[GrowthPoint], fmt: &str) -> Option<(String, String)> {
    let first = series.first()?;
    let last = series.last()?;
    Some((
        first.period_start.format(fmt).to_string(),
        last.period_start.format(fmt).to_string(),
    ))
}
