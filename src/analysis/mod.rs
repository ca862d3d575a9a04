//! Analysis modules.
//!
//! Aggregation over inventory sources and the explanation text derived
//! from the aggregation results.

pub mod aggregator;
pub mod explain;

pub use aggregator::*;
pub use explain::Explanations;

use crate::error::ReportError;
use crate::ingest;
use crate::models::AggregationResult;
use rayon::prelude::*;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Aggregation of one report unit: a single source or the union of all.
#[derive(Debug, Clone)]
pub struct SourceAnalysis {
    /// Human-readable name of the unit.
    pub name: String,
    /// Prefix used for chart file names.
    pub stem: String,
    /// True for the union of all sources.
    pub combined: bool,
    pub aggregation: AggregationResult,
}

impl SourceAnalysis {
    /// Section heading used in the report.
    pub fn title(&self) -> String {
        if self.combined {
            "Combined Analysis of All Files".to_string()
        } else {
            format!("Analysis for: {}", self.name)
        }
    }
}

/// Aggregate one or more sources as a single logical stream.
pub fn analyze_source(paths: &[PathBuf]) -> Result<AggregationResult, ReportError> {
    let mut aggregator = Aggregator::new();
    for path in paths {
        let rows = ingest::for_each_record(path, |record| aggregator.push(&record))?;
        debug!("{}: {} rows", path.display(), rows);
    }
    Ok(aggregator.finish())
}

/// Raw file stem, used to name chart files.
pub fn source_stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "source".to_string())
}

/// Chart file prefix of the union of all sources.
const COMBINED_STEM: &str = "combined";

/// Chart file prefixes for `sources`, in order. A stem already taken by an
/// earlier source, or by the combined unit, gets a `_2`, `_3`, ... suffix.
pub fn unique_stems(sources: &[PathBuf]) -> Vec<String> {
    let mut taken = HashSet::new();
    if sources.len() > 1 {
        taken.insert(COMBINED_STEM.to_string());
    }

    sources
        .iter()
        .map(|path| {
            let stem = source_stem(path);
            let mut candidate = stem.clone();
            let mut n = 2;
            while !taken.insert(candidate.clone()) {
                candidate = format!("{}_{}", stem, n);
                n += 1;
            }
            candidate
        })
        .collect()
}

/// Display name: the file stem with `-` and `_` turned into spaces.
pub fn display_name(path: &Path) -> String {
    source_stem(path).replace(['-', '_'], " ")
}

/// Analyze every source individually, then their union when there is more
/// than one.
///
/// Per-source passes run in parallel; the combined pass starts only once
/// all of them have succeeded and re-reads every source from scratch. The
/// first failing source aborts the whole run. `on_step` is called after
/// each completed unit.
pub fn analyze_all(
    sources: &[PathBuf],
    on_step: impl Fn(&str) + Sync,
) -> Result<Vec<SourceAnalysis>, ReportError> {
    let stems = unique_stems(sources);
    let mut analyses: Vec<SourceAnalysis> = sources
        .par_iter()
        .zip(stems)
        .map(|(path, stem)| -> Result<SourceAnalysis, ReportError> {
            let aggregation = analyze_source(std::slice::from_ref(path))?;
            info!(
                "Analyzed {}: {} objects",
                path.display(),
                aggregation.summary.object_count
            );
            on_step(&display_name(path));
            Ok(SourceAnalysis {
                name: display_name(path),
                stem,
                combined: false,
                aggregation,
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    if sources.len() > 1 {
        let aggregation = analyze_source(sources)?;
        info!(
            "Analyzed all {} sources combined: {} objects",
            sources.len(),
            aggregation.summary.object_count
        );
        on_step("combined");
        analyses.push(SourceAnalysis {
            name: "All Files Combined".to_string(),
            stem: COMBINED_STEM.to_string(),
            combined: true,
            aggregation,
        });
    }

    Ok(analyses)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, content: &str) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_display_name() {
        let path = Path::new("/tmp/test-data_part-1.csv");
        assert_eq!(source_stem(path), "test-data_part-1");
        assert_eq!(display_name(path), "test data part 1");
    }

    #[test]
    fn test_unique_stems_suffix_collisions() {
        let sources = vec![
            PathBuf::from("a/inv.csv"),
            PathBuf::from("b/inv.csv"),
            PathBuf::from("c/combined.csv"),
            PathBuf::from("inv_2.csv"),
        ];
        assert_eq!(
            unique_stems(&sources),
            vec!["inv", "inv_2", "combined_2", "inv_2_2"]
        );

        // A lone source never competes with the combined unit
        assert_eq!(unique_stems(&sources[2..3]), vec!["combined"]);
    }

    #[test]
    fn test_same_stem_sources_get_distinct_chart_prefixes() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("a")).unwrap();
        std::fs::create_dir_all(dir.path().join("b")).unwrap();
        let a = write_csv(&dir.path().join("a"), "inv.csv", "project_id,size_bytes\np1,10\n");
        let b = write_csv(&dir.path().join("b"), "inv.csv", "project_id,size_bytes\np2,20\n");

        let analyses = analyze_all(&[a, b], |_| {}).unwrap();
        assert_eq!(analyses[0].stem, "inv");
        assert_eq!(analyses[1].stem, "inv_2");
        assert_eq!(analyses[0].name, analyses[1].name);
        assert_eq!(analyses[1].aggregation.summary.total_bytes, Some(20));
    }

    #[test]
    fn test_combined_section_sums_object_counts() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(
            dir.path(),
            "a.csv",
            "project_id,bucket_name,size_bytes\np1,b1,10\np2,b2,20\n",
        );
        // Different column set: no bucket column, extra column
        let b = write_csv(
            dir.path(),
            "b.csv",
            "size_bytes,project_id,owner\n5,p1,x\nbad,p3,y\n7,,z\n",
        );

        let analyses = analyze_all(&[a, b], |_| {}).unwrap();
        assert_eq!(analyses.len(), 3);

        let combined = &analyses[2].aggregation;
        assert_eq!(analyses[2].stem, "combined");
        assert_eq!(analyses[2].title(), "Combined Analysis of All Files");
        assert_eq!(
            combined.summary.object_count,
            analyses[0].aggregation.summary.object_count
                + analyses[1].aggregation.summary.object_count
        );
        assert_eq!(combined.summary.object_count, 5);
        assert_eq!(combined.summary.total_bytes, Some(42));
        assert_eq!(combined.distribution_by_project[0].key, "p2");
        assert_eq!(combined.distribution_by_project[1].key, "p1");
        assert_eq!(combined.distribution_by_project[1].total_bytes, 15);
    }

    #[test]
    fn test_single_source_has_no_combined_section() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "only.csv", "project_id,size_bytes\np,1\n");
        let analyses = analyze_all(&[a], |_| {}).unwrap();
        assert_eq!(analyses.len(), 1);
        assert_eq!(analyses[0].name, "only");
        assert_eq!(analyses[0].title(), "Analysis for: only");
    }

    #[test]
    fn test_missing_source_fails_whole_run() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(dir.path(), "ok.csv", "project_id,size_bytes\np,1\n");
        let missing = dir.path().join("missing.csv");
        assert!(analyze_all(&[a, missing], |_| {}).is_err());
    }

    #[test]
    fn test_aggregation_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let a = write_csv(
            dir.path(),
            "a.csv",
            "project_id,bucket_name,size_bytes,creation_time_utc\n\
             p1,b1,10,2023-01-01T00:00:00Z\n\
             p2,b1,30,2023-02-01T00:00:00Z\n\
             p1,b2,,2023-02-11T00:00:00Z\n",
        );
        let first = analyze_source(std::slice::from_ref(&a)).unwrap();
        let second = analyze_source(std::slice::from_ref(&a)).unwrap();
        assert_eq!(first, second);
    }
}
