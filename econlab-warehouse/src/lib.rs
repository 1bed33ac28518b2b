//! econlab warehouse: loaders, orchestration and quality checks.
//!
//! This crate builds on `econlab-core` to provide:
//! - SQLite warehouse with fact, dimension and summary tables plus views
//! - Object-store upload of the processed files under versioned keys
//! - Timestamped backups and all-or-nothing replacement
//! - The sequential pipeline orchestrator and post-load quality check

pub mod backup;
pub mod error;
pub mod object_store;
pub mod pipeline;
pub mod processed;
pub mod quality;
pub mod sink;
pub mod sqlite;
pub mod views;

pub use backup::{backup_existing, backup_path};
pub use error::WarehouseError;
pub use object_store::{
    FsObjectStore, Metadata, ObjectStore, ObjectStoreWarehouse, UploadOutcome, UploadReport,
    UploadedObject,
};
pub use pipeline::{run_load, run_pipeline, run_quality, PipelineError, PipelineReport};
pub use processed::{ProcessedData, ProcessedFiles};
pub use quality::{assess, QualityReport};
pub use sink::{build_warehouse, LoadReport, Warehouse};
pub use sqlite::{SqliteLoadReport, SqliteWarehouse};
