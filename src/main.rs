//! Storage Reporter - PDF reports for storage inventory exports
//!
//! A CLI tool that aggregates one or more inventory CSV files and
//! renders a multi-section PDF with tables, charts and explanations.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Runtime error (missing inputs, config, unreadable source, etc.)

mod analysis;
mod charts;
mod cli;
mod config;
mod error;
mod fonts;
mod ingest;
mod models;
mod report;
mod testdata;

use analysis::SourceAnalysis;
use anyhow::{Context, Result};
use charts::ChartGenerator;
use cli::Args;
use config::{Config, DEFAULT_CONFIG_FILE};
use error::ReportError;
use indicatif::{ProgressBar, ProgressStyle};
use models::{human_size, with_thousands, ReportSection};
use report::{write_json_summary, PdfReportGenerator};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info};
use tracing_subscriber::FmtSubscriber;

fn main() -> Result<()> {
    // Parse command-line arguments
    let args = Args::parse_args();

    // Validate arguments
    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    init_logging(&args);

    info!("Storage Reporter v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    if let Err(e) = run(args) {
        error!("Report generation failed: {:#}", e);
        eprintln!("\n❌ Error: {:#}", e);
        std::process::exit(1);
    }

    Ok(())
}

/// Handle --init-config: generate a default storage-reporter.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(DEFAULT_CONFIG_FILE);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            DEFAULT_CONFIG_FILE
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", DEFAULT_CONFIG_FILE))?;

    println!("✅ Created {} with default settings.", DEFAULT_CONFIG_FILE);
    println!("   Add your inventory files under [general].sources to get started.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args) {
    let level = args.log_level();

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Warning: failed to set tracing subscriber: {}", e);
    }
}

/// Run the complete reporting workflow.
fn run(args: Args) -> Result<()> {
    let start_time = Instant::now();

    let mut config = load_config(&args)?;
    config.merge_with_args(&args);
    let output_dir = config.general.output_dir.clone();

    if args.test {
        config.general.sources =
            testdata::create_test_files(&output_dir.join("test_data"), args.files, args.rows)?;
        config.general.author = "Test Author".to_string();
        config.general.version = "Test v0.1".to_string();
    }

    check_sources(&config.general.sources)?;

    if let Some(threads) = args.threads {
        rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .build_global()
            .context("Failed to configure worker threads")?;
        debug!("Using {} worker threads", threads);
    }

    println!("\n📊 Starting storage report generation...");
    println!("   Sources: {}", config.general.sources.len());
    println!("   Output: {}", output_dir.display());

    // Step 1: Aggregate every source, then their union
    let analyses = analyze(&config.general.sources, !args.quiet)?;

    // Step 2: Render charts for every section with data
    println!("\n📈 Rendering charts...");
    let chart_generator = ChartGenerator::new(&config.chart, &output_dir)?;
    let mut sections = Vec::with_capacity(analyses.len());
    for analysis in analyses {
        let title = analysis.title();
        let charts = chart_generator.generate_all(&analysis.aggregation, &analysis.stem)?;
        info!("{}: {} charts", title, charts.len());
        sections.push(ReportSection {
            title,
            aggregation: analysis.aggregation,
            charts,
        });
    }

    // Step 3: Assemble the PDF
    println!("\n📝 Assembling PDF report...");
    let report_path = PdfReportGenerator::new(&config, &sections, &output_dir).create_report()?;

    if args.json {
        let json_path = output_dir.join("aggregations.json");
        write_json_summary(&sections, &json_path)?;
        println!("   JSON summary saved to: {}", json_path.display());
    }

    print_summary(&sections, start_time.elapsed().as_secs_f64());
    println!(
        "\n✅ Report complete! PDF saved to: {}",
        report_path.display()
    );

    Ok(())
}

/// Load configuration from the explicit path or the working directory.
///
/// A missing file is fatal; `--init-config` writes the defaults.
fn load_config(args: &Args) -> Result<Config> {
    let path = args
        .config
        .clone()
        .unwrap_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE));
    info!("Loading config from: {}", path.display());
    Config::load(&path)
}

/// Every configured source must exist before any work starts.
fn check_sources(sources: &[PathBuf]) -> Result<(), ReportError> {
    if sources.is_empty() {
        return Err(ReportError::NoSources);
    }

    let missing: Vec<PathBuf> = sources.iter().filter(|p| !p.exists()).cloned().collect();
    if !missing.is_empty() {
        return Err(ReportError::MissingSources(missing));
    }

    Ok(())
}

/// Aggregate all sources, tracking progress per completed unit.
fn analyze(sources: &[PathBuf], show_progress: bool) -> Result<Vec<SourceAnalysis>> {
    let steps = if sources.len() > 1 {
        sources.len() + 1
    } else {
        sources.len()
    };

    let progress_bar = if show_progress {
        let pb = ProgressBar::new(steps as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        Some(pb)
    } else {
        None
    };

    let analyses = analysis::analyze_all(sources, |name| {
        if let Some(ref pb) = progress_bar {
            pb.set_message(name.to_string());
            pb.inc(1);
        }
    })?;

    if let Some(pb) = progress_bar {
        pb.finish_with_message("Analysis complete");
    }

    Ok(analyses)
}

fn print_summary(sections: &[ReportSection], duration: f64) {
    println!("\n📊 Report Summary:");
    println!("   Sections: {}", sections.len());
    for section in sections {
        let summary = &section.aggregation.summary;
        println!(
            "   - {}: {} objects, {}",
            section.title,
            with_thousands(summary.object_count),
            human_size(summary.total_bytes.unwrap_or(0))
        );
    }
    println!("   Duration: {:.1}s", duration);
}
