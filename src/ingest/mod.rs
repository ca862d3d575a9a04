//! Inventory ingestion and record normalization.
//!
//! This module reads delimited inventory files and coerces each row into a
//! typed [`Record`]. Coercion never fails: unparsable cells degrade to
//! `None` (or `"unknown"` for the content type) and the row is still
//! counted. Only source-level failures (missing or unreadable files) are
//! reported as errors.

use crate::error::ReportError;
use crate::models::Record;
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::debug;

/// Column names recognized in the header row.
pub const COL_PROJECT: &str = "project_id";
pub const COL_BUCKET: &str = "bucket_name";
pub const COL_SIZE: &str = "size_bytes";
pub const COL_CONTENT_TYPE: &str = "content_type";
pub const COL_CREATED: &str = "creation_time_utc";

/// Positions of the recognized columns in one file's header.
///
/// Files may carry different column sets; an absent column yields `None`
/// for every row of that file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnMap {
    pub project_id: Option<usize>,
    pub bucket_name: Option<usize>,
    pub size_bytes: Option<usize>,
    pub content_type: Option<usize>,
    pub created: Option<usize>,
}

impl ColumnMap {
    /// Locate the recognized columns in a header row. Matching trims
    /// whitespace and ignores case; extra columns are ignored.
    pub fn from_headers<'a>(headers: impl IntoIterator<Item = &'a str>) -> Self {
        let mut map = ColumnMap::default();

        for (idx, name) in headers.into_iter().enumerate() {
            let slot = match name.trim().to_lowercase().as_str() {
                COL_PROJECT => &mut map.project_id,
                COL_BUCKET => &mut map.bucket_name,
                COL_SIZE => &mut map.size_bytes,
                COL_CONTENT_TYPE => &mut map.content_type,
                COL_CREATED => &mut map.created,
                _ => continue,
            };
            // First occurrence wins for duplicated headers
            if slot.is_none() {
                *slot = Some(idx);
            }
        }

        map
    }
}

/// Build a record from raw cells. Missing cells count as blank.
pub fn normalize_row<'a>(columns: &ColumnMap, cell: impl Fn(usize) -> Option<&'a str>) -> Record {
    let get = |idx: Option<usize>| idx.and_then(&cell);

    Record {
        project_id: get(columns.project_id).and_then(non_blank),
        bucket_name: get(columns.bucket_name).and_then(non_blank),
        size_bytes: get(columns.size_bytes).and_then(parse_size),
        content_type: get(columns.content_type)
            .and_then(non_blank)
            .unwrap_or_else(|| "unknown".to_string()),
        created_ts: get(columns.created).and_then(parse_timestamp),
    }
}

fn non_blank(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        None
    } else {
        Some(trimmed.to_string())
    }
}

/// Parse a size cell as a non-negative integer.
pub fn parse_size(value: &str) -> Option<u64> {
    let trimmed = value.trim();
    let digits = trimmed.strip_prefix('+').unwrap_or(trimmed);
    digits.parse::<u64>().ok()
}

/// Parse a creation timestamp into naive UTC.
///
/// Accepts RFC 3339 (converted to UTC), ISO 8601 without zone, the
/// space-separated SQL form, and plain dates (midnight).
pub fn parse_timestamp(value: &str) -> Option<NaiveDateTime> {
    const NAIVE_FORMATS: [&str; 4] = [
        "%Y-%m-%dT%H:%M:%S%.f",
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y-%m-%dT%H:%M",
        "%Y-%m-%d %H:%M",
    ];

    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    let without_utc = trimmed
        .strip_suffix(" UTC")
        .or_else(|| trimmed.strip_suffix('Z'))
        .unwrap_or(trimmed);

    NAIVE_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(without_utc, fmt).ok())
        .or_else(|| {
            NaiveDate::parse_from_str(without_utc, "%Y-%m-%d")
                .ok()
                .and_then(|d| d.and_hms_opt(0, 0, 0))
        })
}

/// Stream every normalized record of one source into `sink`.
///
/// Returns the number of rows read. Row-level defects are absorbed; an
/// unreadable file is fatal.
pub fn for_each_record(path: &Path, mut sink: impl FnMut(Record)) -> Result<u64, ReportError> {
    let source_error = |e: &dyn std::fmt::Display| ReportError::SourceRead {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_path(path)
        .map_err(|e| source_error(&e))?;

    let headers = reader.byte_headers().map_err(|e| source_error(&e))?.clone();
    let header_names: Vec<String> = headers
        .iter()
        .map(|h| String::from_utf8_lossy(h).into_owned())
        .collect();
    let columns = ColumnMap::from_headers(header_names.iter().map(String::as_str));
    debug!("{}: columns {:?}", path.display(), columns);

    let mut rows = 0u64;
    let mut row = csv::ByteRecord::new();
    let mut cells: Vec<String> = Vec::new();

    loop {
        match reader.read_byte_record(&mut row) {
            Ok(true) => {}
            Ok(false) => break,
            Err(e) if matches!(e.kind(), csv::ErrorKind::Io(_)) => {
                return Err(source_error(&e));
            }
            Err(e) => {
                // Malformed quoting and the like: keep going, the row is lost
                debug!("{}: skipping unreadable row: {}", path.display(), e);
                continue;
            }
        }

        cells.clear();
        cells.extend(row.iter().map(|c| String::from_utf8_lossy(c).into_owned()));
        sink(normalize_row(&columns, |idx| cells.get(idx).map(String::as_str)));
        rows += 1;
    }

    Ok(rows)
}

/// Read every normalized record of one source into memory.
#[cfg(test)]
pub fn read_records(path: &Path) -> Result<Vec<Record>, ReportError> {
    let mut records = Vec::new();
    for_each_record(path, |record| records.push(record))?;
    Ok(records)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Datelike, Timelike};
    use std::io::Write;

    fn write_csv(dir: &tempfile::TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(content.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_column_map_ignores_extra_and_case() {
        let map = ColumnMap::from_headers([
            "object_name",
            "Project_ID",
            " size_bytes ",
            "creation_time_utc",
        ]);
        assert_eq!(map.project_id, Some(1));
        assert_eq!(map.size_bytes, Some(2));
        assert_eq!(map.created, Some(3));
        assert_eq!(map.bucket_name, None);
        assert_eq!(map.content_type, None);
    }

    #[test]
    fn test_parse_size() {
        assert_eq!(parse_size("1024"), Some(1024));
        assert_eq!(parse_size(" 42 "), Some(42));
        assert_eq!(parse_size("0"), Some(0));
        assert_eq!(parse_size(""), None);
        assert_eq!(parse_size("-1"), None);
        assert_eq!(parse_size("abc"), None);
        assert_eq!(parse_size("12.5"), None);
    }

    #[test]
    fn test_parse_timestamp_formats() {
        let ts = parse_timestamp("2023-04-05T06:07:08.123456Z").unwrap();
        assert_eq!((ts.year(), ts.month(), ts.day()), (2023, 4, 5));
        assert_eq!(ts.hour(), 6);

        let ts = parse_timestamp("2023-04-05T23:30:00-02:00").unwrap();
        assert_eq!((ts.month(), ts.day(), ts.hour()), (4, 6, 1));

        assert!(parse_timestamp("2023-04-05 06:07:08").is_some());
        assert!(parse_timestamp("2023-04-05T06:07:08").is_some());
        assert!(parse_timestamp("2023-04-05 06:07:08 UTC").is_some());
        let midnight = parse_timestamp("2023-04-05").unwrap();
        assert_eq!(midnight.hour(), 0);

        assert_eq!(parse_timestamp(""), None);
        assert_eq!(parse_timestamp("yesterday"), None);
        assert_eq!(parse_timestamp("2023-13-45"), None);
    }

    #[test]
    fn test_normalize_row_defaults() {
        let columns = ColumnMap::from_headers([
            COL_PROJECT,
            COL_BUCKET,
            COL_SIZE,
            COL_CONTENT_TYPE,
            COL_CREATED,
        ]);
        let cells = ["", "bucket-a", "oops", "   ", "not a date"];
        let record = normalize_row(&columns, |i| cells.get(i).copied());

        assert_eq!(record.project_id, None);
        assert_eq!(record.bucket_name.as_deref(), Some("bucket-a"));
        assert_eq!(record.size_bytes, None);
        assert_eq!(record.content_type, "unknown");
        assert_eq!(record.created_ts, None);
    }

    #[test]
    fn test_read_records_tolerates_short_rows_and_missing_columns() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "inv.csv",
            "project_id,size_bytes,extra\n\
             alpha,100,x\n\
             beta\n\
             ,abc,y,z\n",
        );

        let records = read_records(&path).unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].project_id.as_deref(), Some("alpha"));
        assert_eq!(records[0].size_bytes, Some(100));
        assert_eq!(records[0].bucket_name, None);
        assert_eq!(records[0].content_type, "unknown");
        assert_eq!(records[1].project_id.as_deref(), Some("beta"));
        assert_eq!(records[1].size_bytes, None);
        assert_eq!(records[2].project_id, None);
        assert_eq!(records[2].size_bytes, None);
    }

    #[test]
    fn test_header_only_file_has_no_records() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_csv(
            &dir,
            "empty.csv",
            "project_id,bucket_name,size_bytes,content_type,creation_time_utc\n",
        );
        assert!(read_records(&path).unwrap().is_empty());
    }

    #[test]
    fn test_missing_file_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_records(&dir.path().join("nope.csv")).unwrap_err();
        assert!(matches!(err, ReportError::SourceRead { .. }));
    }
}
