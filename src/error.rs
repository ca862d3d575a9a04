//! Fatal error kinds surfaced to the CLI.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("settings file not found: {0} (run with --init-config to create one)")]
    MissingConfig(PathBuf),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("no input files configured; set [general].sources or pass --input")]
    NoSources,

    #[error("one or more input files do not exist: {}", .0.iter().map(|p| p.display().to_string()).collect::<Vec<_>>().join(", "))]
    MissingSources(Vec<PathBuf>),

    #[error("failed to read source {path}: {reason}")]
    SourceRead { path: PathBuf, reason: String },

    #[error("failed to write PDF document: {0}")]
    Pdf(String),
}
