//! The "persist processed data" capability and backend selection.

use chrono::Utc;
use econlab_core::config::{PipelineConfig, WarehouseBackend};

use crate::error::WarehouseError;
use crate::object_store::{FsObjectStore, ObjectStore, ObjectStoreWarehouse, UploadReport};
use crate::processed::ProcessedFiles;
use crate::sqlite::{SqliteLoadReport, SqliteWarehouse};

/// What a load produced, per backend.
#[derive(Debug)]
pub enum LoadReport {
    Sqlite(SqliteLoadReport),
    ObjectStore(UploadReport),
}

impl LoadReport {
    /// Fact rows for SQLite, uploaded files for the object store.
    pub fn loaded(&self) -> usize {
        match self {
            LoadReport::Sqlite(r) => r.fact_rows,
            LoadReport::ObjectStore(r) => r.succeeded(),
        }
    }
}

pub trait Warehouse {
    fn name(&self) -> &str;

    fn persist(&self, files: &ProcessedFiles) -> Result<LoadReport, WarehouseError>;
}

impl Warehouse for SqliteWarehouse {
    fn name(&self) -> &str {
        "sqlite"
    }

    fn persist(&self, files: &ProcessedFiles) -> Result<LoadReport, WarehouseError> {
        self.load_at(files, Utc::now().naive_utc()).map(LoadReport::Sqlite)
    }
}

impl<S: ObjectStore> Warehouse for ObjectStoreWarehouse<S> {
    fn name(&self) -> &str {
        "object_store"
    }

    /// Partial uploads succeed; a run where every file failed is an error.
    fn persist(&self, files: &ProcessedFiles) -> Result<LoadReport, WarehouseError> {
        let run_id = Self::run_id(Utc::now());
        let report = self.upload_at(files, &run_id);
        if report.succeeded() == 0 {
            let first = report
                .uploads
                .into_iter()
                .find_map(|u| u.result.err())
                .unwrap_or_else(|| WarehouseError::Verification("no files to upload".into()));
            return Err(first);
        }
        if report.failed() > 0 {
            tracing::warn!(
                run_id = %report.run_id,
                succeeded = report.succeeded(),
                failed = report.failed(),
                "partial upload"
            );
        }
        Ok(LoadReport::ObjectStore(report))
    }
}

/// The warehouse selected by `[warehouse] backend`.
pub fn build_warehouse(config: &PipelineConfig) -> Result<Box<dyn Warehouse>, WarehouseError> {
    Ok(match config.warehouse.backend {
        WarehouseBackend::Sqlite => Box::new(SqliteWarehouse::new(config)),
        WarehouseBackend::ObjectStore => {
            Box::new(ObjectStoreWarehouse::<FsObjectStore>::from_config(config)?)
        }
    })
}
