//! The transformer's three output files, as the loaders see them.

use std::path::{Path, PathBuf};

use econlab_core::config::{PathsConfig, LONG_FILE, SUMMARY_FILE, WIDE_FILE};
use econlab_core::domain::IndicatorObservation;
use econlab_core::io::read_records;
use econlab_core::transform::IndicatorSummary;

use crate::error::WarehouseError;

/// Locations of the processed files.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessedFiles {
    pub long: PathBuf,
    pub wide: PathBuf,
    pub summary: PathBuf,
}

impl ProcessedFiles {
    pub fn from_paths(paths: &PathsConfig) -> Self {
        Self::in_dir(&paths.processed_dir)
    }

    pub fn in_dir(dir: &Path) -> Self {
        Self {
            long: dir.join(LONG_FILE),
            wide: dir.join(WIDE_FILE),
            summary: dir.join(SUMMARY_FILE),
        }
    }

    /// All three files, in upload order.
    pub fn all(&self) -> [&Path; 3] {
        [self.long.as_path(), self.wide.as_path(), self.summary.as_path()]
    }

    /// Fail on the first file that does not exist.
    pub fn require_all(&self) -> Result<(), WarehouseError> {
        match self.all().into_iter().find(|p| !p.exists()) {
            Some(missing) => Err(WarehouseError::MissingInput(missing.to_path_buf())),
            None => Ok(()),
        }
    }
}

/// Parsed long and summary rows.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessedData {
    pub long: Vec<IndicatorObservation>,
    pub summary: Vec<IndicatorSummary>,
}

impl ProcessedData {
    pub fn load(files: &ProcessedFiles) -> Result<Self, WarehouseError> {
        files.require_all()?;
        let read_err = |path: &Path| {
            let path = path.to_path_buf();
            move |source| WarehouseError::Csv { path, source }
        };
        let long = read_records(&files.long).map_err(read_err(&files.long))?;
        let summary = read_records(&files.summary).map_err(read_err(&files.summary))?;
        Ok(Self { long, summary })
    }
}
