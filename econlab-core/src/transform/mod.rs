//! Transform stage: raw CSV → cleaned observations → derived metrics →
//! long, wide and summary outputs.

pub mod clean;
pub mod metrics;
pub mod reshape;
pub mod schema;
pub mod summary;

use std::path::PathBuf;

use polars::prelude::PolarsError;
use thiserror::Error;

pub use clean::{clean, read_raw, CleanReport};
pub use metrics::{derive_metrics, CountryLabel, TrendFit};
pub use reshape::{read_wide, to_long, to_wide, write_wide, WideColumn, WideRow, WideTable};
pub use schema::{RawSchema, SchemaError, REQUIRED_COLUMNS};
pub use summary::{summarize, IndicatorSummary};

use crate::config::PipelineConfig;
use crate::domain::{group_series, IndicatorCatalog, IndicatorObservation};
use crate::io::write_records_atomic;

#[derive(Debug, Error)]
pub enum TransformError {
    #[error("input file not found: {}", .0.display())]
    MissingInput(PathBuf),

    #[error("schema error: {0}")]
    Schema(#[from] SchemaError),

    #[error("validation error: {0}")]
    Validation(String),

    #[error("polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("failed to write {}: {source}", path.display())]
    Write {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },
}

/// Everything the transformer produces, before it is written.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformOutput {
    /// Base and derived observations, sorted by (indicator_code, year).
    pub long: Vec<IndicatorObservation>,
    pub wide: WideTable,
    pub summary: Vec<IndicatorSummary>,
    pub base_rows: usize,
    pub derived_rows: usize,
}

/// Derive every output from cleaned observations.
pub fn transform(config: &PipelineConfig, cleaned: &CleanReport) -> TransformOutput {
    let base = &cleaned.observations;
    let series = group_series(base);

    let country = base
        .first()
        .map(|o| CountryLabel {
            name: o.country_name.clone(),
            code: o.country_code.clone(),
        })
        .unwrap_or_else(|| CountryLabel {
            name: config.source.country_code.clone(),
            code: config.source.country_code.clone(),
        });

    let derived = derive_metrics(config, &series, &country);
    let derived_rows = derived.len();

    let mut long: Vec<IndicatorObservation> = base.iter().cloned().chain(derived).collect();
    long.sort_by(|a, b| {
        a.indicator_code
            .cmp(&b.indicator_code)
            .then(a.year.cmp(&b.year))
    });

    let catalog = IndicatorCatalog::new(&config.indicators);
    let wide = to_wide(&long, &catalog);
    let summary = summarize(&group_series(&long), config.transform.trend_min_points);

    TransformOutput {
        long,
        wide,
        summary,
        base_rows: base.len(),
        derived_rows,
    }
}

/// Counts and locations reported after a transform run.
#[derive(Debug, Clone, PartialEq)]
pub struct TransformReport {
    pub input_rows: usize,
    pub missing_rows: usize,
    pub duplicate_rows: usize,
    pub base_rows: usize,
    pub derived_rows: usize,
    pub long_rows: usize,
    pub wide_rows: usize,
    pub wide_columns: usize,
    pub summaries: usize,
    pub outputs: Vec<PathBuf>,
}

/// Read the raw file named by `config`, transform it, and write all outputs.
pub fn run_transform(config: &PipelineConfig) -> Result<TransformReport, TransformError> {
    let raw_path = &config.paths.raw_csv;
    tracing::info!(path = %raw_path.display(), "starting transform");

    let raw = read_raw(raw_path)?;
    let cleaned = clean(raw, config.transform.missing_threshold)?;
    tracing::info!(
        input_rows = cleaned.input_rows,
        missing_rows = cleaned.missing_rows,
        duplicate_rows = cleaned.duplicate_rows,
        "cleaned raw data"
    );

    let output = transform(config, &cleaned);

    let long_path = config.paths.long_csv();
    let wide_path = config.paths.wide_csv();
    let summary_path = config.paths.summary_csv();

    let written = |path: &PathBuf, result: Result<(), csv::Error>| {
        result.map_err(|source| TransformError::Write {
            path: path.clone(),
            source,
        })
    };
    written(
        &long_path,
        write_records_atomic(&long_path, &IndicatorObservation::CSV_HEADER, &output.long),
    )?;
    written(&wide_path, write_wide(&wide_path, &output.wide))?;
    written(
        &summary_path,
        write_records_atomic(&summary_path, &IndicatorSummary::CSV_HEADER, &output.summary),
    )?;

    let report = TransformReport {
        input_rows: cleaned.input_rows,
        missing_rows: cleaned.missing_rows,
        duplicate_rows: cleaned.duplicate_rows,
        base_rows: output.base_rows,
        derived_rows: output.derived_rows,
        long_rows: output.long.len(),
        wide_rows: output.wide.rows.len(),
        wide_columns: output.wide.columns.len() + 1,
        summaries: output.summary.len(),
        outputs: vec![long_path, wide_path, summary_path],
    };

    tracing::info!(
        long_rows = report.long_rows,
        derived_rows = report.derived_rows,
        wide_rows = report.wide_rows,
        wide_columns = report.wide_columns,
        summaries = report.summaries,
        "processed data written"
    );

    Ok(report)
}
