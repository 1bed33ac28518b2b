//! econlab CLI: ingest, transform, load and run commands.
//!
//! Commands:
//! - `ingest`: fetch configured indicators and write the raw CSV
//! - `transform`: clean the raw CSV and write long, wide and summary files
//! - `load`: persist the processed files to the configured warehouse
//! - `run`: all of the above plus the quality check, halting on first failure
//! - `quality`: score the SQLite warehouse
//!
//! Exit codes: 0 on success, 1 on a failed stage, 2 on a configuration error.

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use econlab_core::config::{ConfigError, PipelineConfig};
use econlab_core::data::{run_ingest, IngestReport, LogProgress, WorldBankProvider};
use econlab_core::transform::{run_transform, TransformReport};
use econlab_warehouse::{run_load, run_pipeline, run_quality, LoadReport, QualityReport};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "econlab",
    about = "econlab: World Bank indicator ETL into a local warehouse"
)]
struct Cli {
    /// Path to the pipeline TOML config.
    #[arg(long, global = true, default_value = "config/bangladesh.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Fetch indicators from the World Bank API and write the raw CSV.
    Ingest,
    /// Clean the raw CSV and write long, wide and summary outputs.
    Transform,
    /// Load the processed files into the configured warehouse.
    Load,
    /// Run ingest, transform, load and the quality check in order.
    Run,
    /// Score the SQLite warehouse (rows, NULLs, indicator coverage).
    Quality,
}

fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(&cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("{e:#}");
            ExitCode::from(exit_code(&e))
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();
}

/// 2 for configuration problems, 1 for everything else.
fn exit_code(err: &anyhow::Error) -> u8 {
    if err.chain().any(|cause| cause.downcast_ref::<ConfigError>().is_some()) {
        2
    } else {
        1
    }
}

fn load_config(path: &Path) -> Result<PipelineConfig> {
    let config = PipelineConfig::from_file(path)?;
    tracing::debug!(config = %path.display(), "configuration loaded");
    Ok(config)
}

fn run(cli: &Cli) -> Result<()> {
    let config = load_config(&cli.config)?;

    match cli.command {
        Commands::Ingest => {
            let provider = WorldBankProvider::new(&config.source)?;
            let report = run_ingest(&config, &provider, &LogProgress).context("ingest failed")?;
            print_ingest(&report);
        }
        Commands::Transform => {
            let report = run_transform(&config).context("transform failed")?;
            print_transform(&report);
        }
        Commands::Load => {
            let report = run_load(&config).context("load failed")?;
            print_load(&report);
        }
        Commands::Run => {
            let provider = WorldBankProvider::new(&config.source)?;
            let report = run_pipeline(&config, &provider, &LogProgress)?;
            print_ingest(&report.ingest);
            print_transform(&report.transform);
            print_load(&report.load);
            match &report.quality {
                Some(q) => print_quality(q),
                None => println!("Quality check skipped (object_store backend)"),
            }
        }
        Commands::Quality => match run_quality(&config).context("quality check failed")? {
            Some(q) => print_quality(&q),
            None => println!("Quality check applies to the sqlite backend only"),
        },
    }

    Ok(())
}

fn print_ingest(report: &IngestReport) {
    println!(
        "Ingest: {} rows from {}/{} indicators -> {}",
        report.rows,
        report.indicators,
        report.summary.total,
        report.path.display()
    );
    for (code, err) in &report.summary.errors {
        println!("  FAIL: {code}: {err}");
    }
}

fn print_transform(report: &TransformReport) {
    println!(
        "Transform: {} raw rows, {} missing, {} duplicates",
        report.input_rows, report.missing_rows, report.duplicate_rows
    );
    println!(
        "  long {} rows ({} derived), wide {} x {}, {} summaries",
        report.long_rows, report.derived_rows, report.wide_rows, report.wide_columns, report.summaries
    );
}

fn print_load(report: &LoadReport) {
    match report {
        LoadReport::Sqlite(r) => {
            println!(
                "Load: {} fact rows, {} indicators, {} summaries -> {}",
                r.fact_rows,
                r.dimension_rows,
                r.summary_rows,
                r.path.display()
            );
            if let Some(backup) = &r.backup {
                println!("  previous warehouse backed up to {}", backup.display());
            }
        }
        LoadReport::ObjectStore(r) => {
            println!(
                "Upload run {}: {} succeeded, {} failed",
                r.run_id,
                r.succeeded(),
                r.failed()
            );
            for upload in &r.uploads {
                match &upload.result {
                    Ok(obj) => println!("  OK: {} ({} bytes)", obj.key, obj.bytes),
                    Err(e) => println!("  FAIL: {}: {e}", upload.key),
                }
            }
            if let Some(manifest) = &r.manifest {
                println!("  manifest: {manifest}");
            }
        }
    }
}

fn print_quality(report: &QualityReport) {
    println!(
        "Quality score: {}/100 ({} rows, {} NULL values, {}/{} indicators)",
        report.score,
        report.total_rows,
        report.null_values,
        report.indicators_present,
        report.indicators_expected
    );
    for issue in &report.issues {
        println!("  - {issue}");
    }
}
