use std::path::PathBuf;

use thiserror::Error;

/// Errors from loading, backing up or checking a warehouse.
#[derive(Debug, Error)]
pub enum WarehouseError {
    #[error("required input missing: {} (run `econlab transform` first)", .0.display())]
    MissingInput(PathBuf),

    #[error("failed to read {}: {source}", path.display())]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to back up {} to {}: {source}", from.display(), to.display())]
    Backup {
        from: PathBuf,
        to: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("object store error for '{key}': {message}")]
    ObjectStore { key: String, message: String },

    #[error("warehouse verification failed: {0}")]
    Verification(String),

    #[error("invalid warehouse configuration: {0}")]
    Config(String),
}

impl WarehouseError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        WarehouseError::Io {
            path: path.into(),
            source,
        }
    }
}
