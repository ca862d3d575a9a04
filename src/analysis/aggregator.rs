//! Storage aggregation and statistics.
//!
//! This module folds normalized records into an [`AggregationResult`] in a
//! single pass: summary totals, ranked project and bucket views, the full
//! project distribution, size histogram and monthly/yearly growth.

use crate::models::{
    AggregationResult, GrowthPoint, RankedEntry, Record, SizeCategory, Summary, TOP_N,
};
use chrono::{Datelike, NaiveDate, NaiveDateTime};
use std::collections::{BTreeMap, HashMap};

/// Summed sizes per key, remembering first-seen order so that equal
/// totals keep a stable ranking.
#[derive(Debug, Default)]
struct KeyTotals {
    index: HashMap<String, usize>,
    totals: Vec<(String, u64)>,
}

impl KeyTotals {
    fn add(&mut self, key: &str, bytes: u64) {
        match self.index.get(key) {
            Some(&slot) => {
                self.totals[slot].1 = self.totals[slot].1.saturating_add(bytes);
            }
            None => {
                self.index.insert(key.to_string(), self.totals.len());
                self.totals.push((key.to_string(), bytes));
            }
        }
    }

    /// All keys, largest total first.
    fn ranked(self) -> Vec<RankedEntry> {
        let mut entries: Vec<RankedEntry> = self
            .totals
            .into_iter()
            .map(|(key, total)| RankedEntry::new(key, total))
            .collect();
        // Stable sort: ties stay in first-seen order
        entries.sort_by_key(|e| std::cmp::Reverse(e.total_bytes));
        entries
    }
}

/// Single-pass accumulator over a record stream.
///
/// Feeding the records of several sources into one aggregator yields the
/// same result as aggregating their concatenation.
#[derive(Debug, Default)]
pub struct Aggregator {
    object_count: u64,
    total_bytes: Option<u64>,
    projects: KeyTotals,
    buckets: KeyTotals,
    months: BTreeMap<NaiveDate, u64>,
    years: BTreeMap<NaiveDate, u64>,
    sizes: BTreeMap<SizeCategory, u64>,
}

impl Aggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one record into the running totals.
    pub fn push(&mut self, record: &Record) {
        self.object_count += 1;

        if let Some(size) = record.size_bytes {
            self.total_bytes = Some(self.total_bytes.unwrap_or(0).saturating_add(size));
        }
        let bytes = record.size_bytes.unwrap_or(0);

        if let Some(ref project) = record.project_id {
            self.projects.add(project, bytes);
        }
        if let Some(ref bucket) = record.bucket_name {
            self.buckets.add(bucket, bytes);
        }

        if let Some(ts) = record.created_ts {
            let month = month_start(&ts);
            let year = year_start(&ts);
            let month_total = self.months.entry(month).or_insert(0);
            *month_total = month_total.saturating_add(bytes);
            let year_total = self.years.entry(year).or_insert(0);
            *year_total = year_total.saturating_add(bytes);
        }

        *self
            .sizes
            .entry(SizeCategory::classify(record.size_bytes))
            .or_insert(0) += 1;
    }

    /// Finish the pass and build the result views.
    pub fn finish(self) -> AggregationResult {
        let distribution_by_project = self.projects.ranked();
        let top_projects = top_n(&distribution_by_project, TOP_N);
        let mut top_buckets = self.buckets.ranked();
        top_buckets.truncate(TOP_N);

        AggregationResult {
            summary: Summary {
                object_count: self.object_count,
                total_bytes: self.total_bytes,
            },
            top_projects,
            top_buckets,
            distribution_by_project,
            monthly_growth: into_series(self.months),
            yearly_growth: into_series(self.years),
            size_distribution: self.sizes,
        }
    }
}

impl Extend<Record> for Aggregator {
    fn extend<I: IntoIterator<Item = Record>>(&mut self, iter: I) {
        for record in iter {
            self.push(&record);
        }
    }
}

/// Aggregate an in-memory batch of records.
pub fn aggregate<'a>(records: impl IntoIterator<Item = &'a Record>) -> AggregationResult {
    let mut aggregator = Aggregator::new();
    for record in records {
        aggregator.push(record);
    }
    aggregator.finish()
}

/// Get the first `n` entries of an already ranked list.
pub fn top_n(entries: &[RankedEntry], n: usize) -> Vec<RankedEntry> {
    entries.iter().take(n).cloned().collect()
}

fn month_start(ts: &NaiveDateTime) -> NaiveDate {
    ts.date().with_day(1).unwrap_or_else(|| ts.date())
}

fn year_start(ts: &NaiveDateTime) -> NaiveDate {
    NaiveDate::from_ymd_opt(ts.year(), 1, 1).unwrap_or_else(|| ts.date())
}

fn into_series(periods: BTreeMap<NaiveDate, u64>) -> Vec<GrowthPoint> {
    periods
        .into_iter()
        .map(|(period_start, total_bytes)| GrowthPoint {
            period_start,
            total_bytes,
        })
        .collect()
}

/// Running sum over a period-summed series, as plotted by growth charts.
pub fn cumulative(series: &[GrowthPoint]) -> Vec<(NaiveDate, u64)> {
    series
        .iter()
        .scan(0u64, |acc, point| {
            *acc = acc.saturating_add(point.total_bytes);
            Some((point.period_start, *acc))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ingest::parse_timestamp;

    fn record(project: Option<&str>, bucket: Option<&str>, size: Option<u64>, ts: Option<&str>) -> Record {
        Record {
            project_id: project.map(String::from),
            bucket_name: bucket.map(String::from),
            size_bytes: size,
            content_type: "unknown".to_string(),
            created_ts: ts.and_then(parse_timestamp),
        }
    }

    #[test]
    fn test_empty_stream() {
        let result = aggregate(&Vec::<Record>::new());
        assert_eq!(result.summary.object_count, 0);
        assert_eq!(result.summary.total_bytes, None);
        assert!(result.top_projects.is_empty());
        assert!(result.top_buckets.is_empty());
        assert!(result.distribution_by_project.is_empty());
        assert!(result.monthly_growth.is_empty());
        assert!(result.yearly_growth.is_empty());
        assert!(result.size_distribution.is_empty());
        assert!(result.is_empty());
    }

    #[test]
    fn test_summary_counts_null_rows() {
        let records = vec![
            record(Some("a"), Some("b1"), Some(100), None),
            record(None, None, None, None),
            record(Some("a"), None, Some(50), None),
        ];
        let result = aggregate(&records);
        assert_eq!(result.summary.object_count, 3);
        assert_eq!(result.summary.total_bytes, Some(150));
    }

    #[test]
    fn test_rankings_exclude_null_keys_and_sort_descending() {
        let records = vec![
            record(Some("small"), Some("b-small"), Some(10), None),
            record(Some("big"), Some("b-big"), Some(500), None),
            record(Some("mid"), Some("b-mid"), Some(100), None),
            record(Some("small"), Some("b-small"), None, None),
            record(None, None, Some(10_000), None),
        ];
        let result = aggregate(&records);

        let keys: Vec<_> = result.top_projects.iter().map(|e| e.key.as_str()).collect();
        assert_eq!(keys, vec!["big", "mid", "small"]);
        assert_eq!(result.top_projects[2].total_bytes, 10);
        assert_eq!(result.top_buckets[0].key, "b-big");
        assert_eq!(result.distribution_by_project.len(), 3);
    }

    #[test]
    fn test_top_n_is_prefix_of_distribution() {
        let records: Vec<Record> = (0..25u64)
            .map(|i| record(Some(format!("p{:02}", i).as_str()), None, Some(i * 7 % 13), None))
            .collect();
        let result = aggregate(&records);

        assert_eq!(result.distribution_by_project.len(), 25);
        assert_eq!(result.top_projects.len(), TOP_N);
        for (top, full) in result.top_projects.iter().zip(&result.distribution_by_project) {
            assert_eq!(top.total_bytes, full.total_bytes);
        }
        for pair in result.distribution_by_project.windows(2) {
            assert!(pair[0].total_bytes >= pair[1].total_bytes);
        }
    }

    #[test]
    fn test_ties_keep_first_seen_order() {
        let records = vec![
            record(Some("first"), None, Some(5), None),
            record(Some("second"), None, Some(5), None),
        ];
        let result = aggregate(&records);
        assert_eq!(result.top_projects[0].key, "first");
        assert_eq!(result.top_projects[1].key, "second");
    }

    #[test]
    fn test_size_distribution_covers_every_record() {
        let records = vec![
            record(None, None, None, None),
            record(None, None, Some(0), None),
            record(None, None, Some(1023), None),
            record(None, None, Some(1024), None),
            record(None, None, Some(5 * 1024 * 1024), None),
            record(None, None, Some(2 * 1024u64.pow(4)), None),
        ];
        let result = aggregate(&records);

        let total: u64 = result.size_distribution.values().sum();
        assert_eq!(total, result.summary.object_count);
        assert_eq!(result.size_distribution[&SizeCategory::Empty], 2);
        assert_eq!(result.size_distribution[&SizeCategory::UnderKb], 1);
        assert_eq!(result.size_distribution[&SizeCategory::KbToMb], 1);
        assert_eq!(result.size_distribution[&SizeCategory::MbToGb], 1);
        assert_eq!(result.size_distribution[&SizeCategory::OverTb], 1);
        assert!(!result.size_distribution.contains_key(&SizeCategory::GbToTb));
    }

    #[test]
    fn test_growth_series_by_period() {
        let records = vec![
            record(Some("a"), None, Some(10), Some("2023-03-15T10:00:00Z")),
            record(Some("a"), None, Some(5), Some("2023-03-01T00:00:00Z")),
            record(Some("a"), None, None, Some("2022-12-31T23:59:59Z")),
            record(Some("a"), None, Some(1), Some("2023-01-20T00:00:00Z")),
            record(Some("a"), None, Some(999), None),
        ];
        let result = aggregate(&records);

        let months: Vec<_> = result
            .monthly_growth
            .iter()
            .map(|p| (p.period_start.to_string(), p.total_bytes))
            .collect();
        assert_eq!(
            months,
            vec![
                ("2022-12-01".to_string(), 0),
                ("2023-01-01".to_string(), 1),
                ("2023-03-01".to_string(), 15),
            ]
        );

        let years: Vec<_> = result
            .yearly_growth
            .iter()
            .map(|p| (p.period_start.year(), p.total_bytes))
            .collect();
        assert_eq!(years, vec![(2022, 0), (2023, 16)]);
    }

    #[test]
    fn test_cumulative_running_sum() {
        let records = vec![
            record(None, None, Some(10), Some("2023-01-05")),
            record(None, None, Some(20), Some("2023-02-05")),
            record(None, None, Some(5), Some("2023-04-05")),
        ];
        let result = aggregate(&records);
        let running: Vec<u64> = cumulative(&result.monthly_growth)
            .into_iter()
            .map(|(_, v)| v)
            .collect();
        assert_eq!(running, vec![10, 30, 35]);
    }

    #[test]
    fn test_union_equals_concatenation() {
        let a = vec![
            record(Some("x"), Some("b"), Some(10), Some("2023-01-05")),
            record(Some("y"), None, Some(3), None),
        ];
        let b = vec![record(Some("x"), Some("c"), Some(7), Some("2024-01-05"))];

        let mut streaming = Aggregator::new();
        streaming.extend(a.iter().cloned());
        streaming.extend(b.iter().cloned());

        let concatenated: Vec<Record> = a.iter().chain(&b).cloned().collect();
        assert_eq!(streaming.finish(), aggregate(&concatenated));
    }
}
