//! Synthetic inventory files for `--test` runs.
//!
//! Writes an empty file, a single-project file with a long name and a
//! configurable number of multi-project files with log-normal sizes.

use anyhow::{Context, Result};
use chrono::{Duration, Local, NaiveDate, NaiveDateTime};
use rand::seq::SliceRandom;
use rand::Rng;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

const HEADERS: [&str; 7] = [
    "project_id",
    "bucket_name",
    "object_name",
    "size_bytes",
    "content_type",
    "creation_time_utc",
    "updated_time_utc",
];

const DOMINANT_PROJECT: &str = "dominant-project-test";

/// Rows of the main bucket that are written without a size.
const BLANK_SIZE_ROWS: usize = 11;

fn iso(ts: NaiveDateTime) -> String {
    format!("{}Z", ts.format("%Y-%m-%dT%H:%M:%S%.6f"))
}

/// Sample a log-normal variable via Box-Muller.
fn log_normal(rng: &mut impl Rng, mu: f64, sigma: f64) -> f64 {
    let u1: f64 = 1.0 - rng.gen::<f64>();
    let u2: f64 = rng.gen();
    let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
    (mu + sigma * z).exp()
}

fn writer(path: &Path) -> Result<csv::Writer<std::fs::File>> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("Failed to create test file: {}", path.display()))?;
    writer.write_record(HEADERS)?;
    Ok(writer)
}

fn write_empty(path: &Path) -> Result<()> {
    writer(path)?.flush()?;
    Ok(())
}

fn write_dominant(path: &Path, rows: usize, rng: &mut impl Rng) -> Result<()> {
    let mut w = writer(path)?;
    let main_bucket = format!("{}-main-bucket", DOMINANT_PROJECT);
    let archive_bucket = format!("{}-archive-bucket", DOMINANT_PROJECT);

    for i in 0..rows {
        let now = iso(Local::now().naive_local());
        let size = if i >= BLANK_SIZE_ROWS {
            rng.gen_range(1_000_000_000u64..=10_000_000_000).to_string()
        } else {
            String::new()
        };
        w.write_record([
            DOMINANT_PROJECT,
            main_bucket.as_str(),
            "data.csv",
            size.as_str(),
            "text/csv",
            now.as_str(),
            now.as_str(),
        ])?;

        let archive_size = rng.gen_range(100_000_000u64..=1_000_000_000).to_string();
        w.write_record([
            DOMINANT_PROJECT,
            archive_bucket.as_str(),
            "archive.zip",
            archive_size.as_str(),
            "application/zip",
            now.as_str(),
            now.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

fn write_multi_project(path: &Path, index: usize, rows: usize, rng: &mut impl Rng) -> Result<()> {
    let mut w = writer(path)?;
    let projects = [
        format!("project-alpha-{}", index),
        format!("project-beta-{}", index),
    ];
    let epoch = NaiveDate::from_ymd_opt(2022, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .context("invalid base date")?;

    for j in 0..rows / 2 {
        let project = projects.choose(rng).map(String::as_str).unwrap_or_default();
        let bucket_project = projects.choose(rng).map(String::as_str).unwrap_or_default();
        let tier = ["hot", "archive"].choose(rng).copied().unwrap_or("hot");
        let content_type = ["image/jpeg", "video/mp4"]
            .choose(rng)
            .copied()
            .unwrap_or("image/jpeg");
        let size = (log_normal(rng, 12.0, 4.0) * 1024.0) as u64;
        let created = epoch + Duration::days(rng.gen_range(0..=730));

        let bucket = format!("{}-{}", bucket_project, tier);
        let object = format!("data/file_{}.parquet", j);
        let size = size.to_string();
        let (created, updated) = (iso(created), iso(created + Duration::days(1)));
        w.write_record([
            project,
            bucket.as_str(),
            object.as_str(),
            size.as_str(),
            content_type,
            created.as_str(),
            updated.as_str(),
        ])?;
    }
    w.flush()?;
    Ok(())
}

/// Write a plain 100x30 placeholder logo, unless one exists.
fn write_logo(path: &Path) -> Result<()> {
    use printpdf::image_crate::{Rgb, RgbImage};

    if path.exists() {
        return Ok(());
    }
    let mut logo = RgbImage::from_pixel(100, 30, Rgb([73, 109, 137]));
    for x in 10..90 {
        for y in 13..17 {
            logo.put_pixel(x, y, Rgb([255, 255, 255]));
        }
    }
    logo.save(path)
        .with_context(|| format!("Failed to write logo: {}", path.display()))?;
    info!("Placeholder logo written to {}", path.display());
    Ok(())
}

/// Generate the synthetic sources into `directory` and return their paths
/// in report order.
pub fn create_test_files(directory: &Path, files: usize, rows: usize) -> Result<Vec<PathBuf>> {
    create_test_files_with(directory, files, rows, &mut rand::thread_rng())
}

pub fn create_test_files_with(
    directory: &Path,
    files: usize,
    rows: usize,
    rng: &mut impl Rng,
) -> Result<Vec<PathBuf>> {
    println!(
        "📝 Generating {} test files with ~{} rows each in '{}'...",
        files + 2,
        rows,
        directory.display()
    );
    std::fs::create_dir_all(directory)
        .with_context(|| format!("Failed to create {}", directory.display()))?;

    let mut paths = Vec::with_capacity(files + 2);

    let empty = directory.join("empty-file.csv");
    write_empty(&empty)?;
    paths.push(empty);

    let dominant = directory.join(format!(
        "{}-with-a-very-long_and_unbroken-descriptive-filename-to-test-wrapping.csv",
        DOMINANT_PROJECT
    ));
    write_dominant(&dominant, rows, rng)?;
    paths.push(dominant);

    for i in 0..files {
        let path = directory.join(format!("test-data-part-{}.csv", i + 1));
        write_multi_project(&path, i, rows, rng)?;
        debug!("Wrote {}", path.display());
        paths.push(path);
    }

    if let Some(parent) = directory.parent() {
        let assets = parent.join("assets");
        let logo = std::fs::create_dir_all(&assets)
            .map_err(anyhow::Error::from)
            .and_then(|_| write_logo(&assets.join("test_logo.png")));
        if let Err(e) = logo {
            warn!("Could not create placeholder logo: {}", e);
        }
    }

    println!("✅ Test files generated.");
    Ok(paths)
}
