//! Ingest stage: fetch → validate → write the raw long-format CSV.

use std::path::PathBuf;

use super::fetch::{fetch_indicators, FetchSummary};
use super::provider::{DataError, FetchProgress, IndicatorProvider};
use super::validate::validate_observations;
use crate::config::PipelineConfig;
use crate::domain::IndicatorObservation;
use crate::io::write_records_atomic;

/// Outcome of a successful ingest. Partial batches are successful as long as
/// the raw file was written; failed indicators are listed in `summary`.
#[derive(Debug)]
pub struct IngestReport {
    pub path: PathBuf,
    pub rows: usize,
    pub indicators: usize,
    pub summary: FetchSummary,
}

/// Fetch every configured indicator and write the raw CSV.
pub fn run_ingest(
    config: &PipelineConfig,
    provider: &dyn IndicatorProvider,
    progress: &dyn FetchProgress,
) -> Result<IngestReport, DataError> {
    tracing::info!(
        provider = provider.name(),
        country = %config.source.country_code,
        start_year = config.source.start_year,
        end_year = config.source.end_year,
        indicators = config.indicators.len(),
        "starting ingest"
    );

    let summary = fetch_indicators(provider, &config.source, &config.indicators, progress);
    for (code, err) in &summary.errors {
        tracing::warn!(indicator = %code, error = %err, "indicator skipped");
    }
    if summary.succeeded() == 0 {
        return Err(DataError::NothingFetched {
            failed: summary.failed(),
        });
    }

    let skipped_nulls: usize = summary.results.iter().map(|r| r.skipped_nulls).sum();
    let mut rows: Vec<IndicatorObservation> = summary
        .results
        .iter()
        .flat_map(|r| r.observations.iter().cloned())
        .collect();

    validate_observations(
        &rows,
        skipped_nulls,
        config.source.start_year,
        config.source.end_year,
    )?;

    rows.sort_by(|a, b| {
        a.indicator_name
            .cmp(&b.indicator_name)
            .then(a.year.cmp(&b.year))
    });

    let path = config.paths.raw_csv.clone();
    write_records_atomic(&path, &IndicatorObservation::CSV_HEADER, &rows).map_err(|source| {
        DataError::Csv {
            path: path.display().to_string(),
            source,
        }
    })?;

    let indicators = summary.succeeded();
    tracing::info!(
        path = %path.display(),
        rows = rows.len(),
        indicators,
        failed = summary.failed(),
        "raw data written"
    );

    Ok(IngestReport {
        path,
        rows: rows.len(),
        indicators,
        summary,
    })
}
