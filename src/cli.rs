//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use clap::Parser;
use std::path::PathBuf;

/// Storage Reporter - PDF reports for storage inventory exports
///
/// Reads one or more inventory CSV files (project_id, bucket_name,
/// size_bytes, content_type, creation_time_utc) and writes a PDF with
/// per-file and combined summaries, rankings, histograms and growth charts.
///
/// Examples:
///   storage-reporter
///   storage-reporter --input inventory-a.csv,inventory-b.csv --outdir out
///   storage-reporter --test --rows 5000 --files 2
///   storage-reporter --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Path to configuration file
    ///
    /// If not specified, looks for storage-reporter.toml in the current directory
    #[arg(short, long, value_name = "FILE", env = "STORAGE_REPORTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Inventory CSV files to analyze (comma-separated)
    ///
    /// Overrides [general].sources from the configuration file.
    #[arg(short, long, value_name = "FILES", value_delimiter = ',')]
    pub input: Option<Vec<PathBuf>>,

    /// Output directory for the PDF and the chart images
    #[arg(short, long, value_name = "DIR")]
    pub outdir: Option<PathBuf>,

    /// Generate synthetic inventory files and report on them
    #[arg(long)]
    pub test: bool,

    /// Approximate number of rows per synthetic file
    #[arg(long, default_value = "10000", value_name = "COUNT")]
    pub rows: usize,

    /// Number of multi-project synthetic files
    #[arg(long, default_value = "1", value_name = "COUNT")]
    pub files: usize,

    /// Worker threads for per-source aggregation (defaults to all cores)
    #[arg(long, value_name = "NUM")]
    pub threads: Option<usize>,

    /// Author printed on the cover page
    #[arg(long, value_name = "NAME")]
    pub author: Option<String>,

    /// Report version printed on the cover page
    #[arg(long, value_name = "VERSION")]
    pub report_version: Option<String>,

    /// Also write the aggregation results as JSON next to the PDF
    #[arg(long)]
    pub json: bool,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Generate a default storage-reporter.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.test {
            if self.rows == 0 {
                return Err("Rows must be at least 1".to_string());
            }
            if self.files == 0 {
                return Err("Files must be at least 1".to_string());
            }
        } else if let Some(ref inputs) = self.input {
            if inputs.is_empty() {
                return Err("--input requires at least one file".to_string());
            }
        }

        if let Some(threads) = self.threads {
            if threads == 0 {
                return Err("Threads must be at least 1".to_string());
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    pub fn log_level(&self) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}
