//! Sequential orchestrator: ingest → transform → load → quality check.
//!
//! Each stage reads its inputs fresh from the filesystem. The first failing
//! stage halts the run; nothing is retried across stages.

use econlab_core::config::{PipelineConfig, WarehouseBackend};
use econlab_core::data::{run_ingest, DataError, FetchProgress, IndicatorProvider, IngestReport};
use econlab_core::transform::{run_transform, TransformError, TransformReport};
use thiserror::Error;

use crate::error::WarehouseError;
use crate::processed::ProcessedFiles;
use crate::quality::{assess, QualityReport};
use crate::sink::{build_warehouse, LoadReport};

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("ingest stage failed: {0}")]
    Ingest(#[source] DataError),

    #[error("transform stage failed: {0}")]
    Transform(#[source] TransformError),

    #[error("load stage failed: {0}")]
    Load(#[source] WarehouseError),

    #[error("quality stage failed: {0}")]
    Quality(#[source] WarehouseError),
}

impl PipelineError {
    pub fn stage(&self) -> &'static str {
        match self {
            PipelineError::Ingest(_) => "ingest",
            PipelineError::Transform(_) => "transform",
            PipelineError::Load(_) => "load",
            PipelineError::Quality(_) => "quality",
        }
    }
}

#[derive(Debug)]
pub struct PipelineReport {
    pub ingest: IngestReport,
    pub transform: TransformReport,
    pub load: LoadReport,
    /// `None` for the object-store backend.
    pub quality: Option<QualityReport>,
}

/// Load the processed files into the configured warehouse.
pub fn run_load(config: &PipelineConfig) -> Result<LoadReport, WarehouseError> {
    let warehouse = build_warehouse(config)?;
    tracing::info!(backend = warehouse.name(), "starting load");
    warehouse.persist(&ProcessedFiles::from_paths(&config.paths))
}

/// Quality check for the SQLite backend; `None` for the object store.
pub fn run_quality(config: &PipelineConfig) -> Result<Option<QualityReport>, WarehouseError> {
    match config.warehouse.backend {
        WarehouseBackend::Sqlite => {
            let codes: Vec<String> = config.indicators.iter().map(|d| d.code.clone()).collect();
            assess(&config.paths.warehouse, &codes).map(Some)
        }
        WarehouseBackend::ObjectStore => {
            tracing::info!("quality check skipped for object_store backend");
            Ok(None)
        }
    }
}

/// Run every stage in order, halting on the first failure.
pub fn run_pipeline(
    config: &PipelineConfig,
    provider: &dyn IndicatorProvider,
    progress: &dyn FetchProgress,
) -> Result<PipelineReport, PipelineError> {
    let ingest = run_ingest(config, provider, progress).map_err(PipelineError::Ingest)?;
    let transform = run_transform(config).map_err(PipelineError::Transform)?;
    let load = run_load(config).map_err(PipelineError::Load)?;
    let quality = run_quality(config).map_err(PipelineError::Quality)?;

    tracing::info!(
        raw_rows = ingest.rows,
        processed_rows = transform.long_rows,
        loaded = load.loaded(),
        score = quality.as_ref().map(|q| q.score),
        "pipeline complete"
    );

    Ok(PipelineReport {
        ingest,
        transform,
        load,
        quality,
    })
}
