//! Timestamped copies of the warehouse taken before it is replaced.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;

use crate::error::WarehouseError;

/// Timestamp layout used in backup file names.
pub const BACKUP_STAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// `{stem}_{YYYYMMDD_HHMMSS}.db` inside `backup_dir`.
pub fn backup_path(warehouse: &Path, backup_dir: &Path, stamp: NaiveDateTime) -> PathBuf {
    let stem = warehouse
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "warehouse".to_string());
    backup_dir.join(format!("{stem}_{}.db", stamp.format(BACKUP_STAMP_FORMAT)))
}

/// Copy an existing warehouse into `backup_dir`. Returns `None` when there is
/// nothing to back up.
pub fn backup_existing(
    warehouse: &Path,
    backup_dir: &Path,
    stamp: NaiveDateTime,
) -> Result<Option<PathBuf>, WarehouseError> {
    if !warehouse.exists() {
        return Ok(None);
    }
    fs::create_dir_all(backup_dir).map_err(|e| WarehouseError::io(backup_dir, e))?;

    let target = backup_path(warehouse, backup_dir, stamp);
    fs::copy(warehouse, &target).map_err(|source| WarehouseError::Backup {
        from: warehouse.to_path_buf(),
        to: target.clone(),
        source,
    })?;
    tracing::info!(backup = %target.display(), "existing warehouse backed up");
    Ok(Some(target))
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn stamp() -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2024, 3, 9)
            .unwrap()
            .and_hms_opt(14, 5, 7)
            .unwrap()
    }

    #[test]
    fn backup_name_uses_stem_and_stamp() {
        let path = backup_path(Path::new("/data/bangladesh_warehouse.db"), Path::new("/b"), stamp());
        assert_eq!(path, PathBuf::from("/b/bangladesh_warehouse_20240309_140507.db"));
    }

    #[test]
    fn nothing_to_back_up() {
        let dir = tempfile::tempdir().unwrap();
        let result = backup_existing(&dir.path().join("none.db"), dir.path(), stamp()).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn copies_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("w.db");
        fs::write(&db, b"sqlite").unwrap();

        let backup = backup_existing(&db, &dir.path().join("backups"), stamp())
            .unwrap()
            .unwrap();
        assert_eq!(fs::read(&backup).unwrap(), b"sqlite");
        assert!(db.exists());
    }
}
