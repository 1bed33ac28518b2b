//! CSV file helpers shared by the fetcher and the transformer.
//!
//! Writes are atomic: rows go to `{path}.tmp`, which is renamed into place
//! only after the writer has been flushed. Readers never see half a file.

use std::fs;
use std::path::{Path, PathBuf};

use serde::de::DeserializeOwned;
use serde::Serialize;

fn tmp_path(path: &Path) -> PathBuf {
    let mut name = path.as_os_str().to_os_string();
    name.push(".tmp");
    PathBuf::from(name)
}

fn finish(tmp: &Path, path: &Path) -> Result<(), csv::Error> {
    fs::rename(tmp, path).map_err(|e| {
        let _ = fs::remove_file(tmp);
        csv::Error::from(e)
    })
}

fn ensure_parent(path: &Path) -> Result<(), csv::Error> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

/// Serialize `rows` under `header`. The header is written even when `rows` is
/// empty; its names must follow `T`'s field order.
pub fn write_records_atomic<T: Serialize>(
    path: &Path,
    header: &[&str],
    rows: &[T],
) -> Result<(), csv::Error> {
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    let written = (|| -> Result<(), csv::Error> {
        let mut wtr = csv::WriterBuilder::new()
            .has_headers(false)
            .from_path(&tmp)?;
        wtr.write_record(header)?;
        for row in rows {
            wtr.serialize(row)?;
        }
        wtr.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    finish(&tmp, path)
}

/// Write a table with a dynamic header. Each row must match the header width.
pub fn write_table_atomic<I>(path: &Path, header: &[String], rows: I) -> Result<(), csv::Error>
where
    I: IntoIterator<Item = Vec<String>>,
{
    ensure_parent(path)?;
    let tmp = tmp_path(path);
    let written = (|| -> Result<(), csv::Error> {
        let mut wtr = csv::Writer::from_path(&tmp)?;
        wtr.write_record(header)?;
        for row in rows {
            wtr.write_record(&row)?;
        }
        wtr.flush()?;
        Ok(())
    })();
    if let Err(e) = written {
        let _ = fs::remove_file(&tmp);
        return Err(e);
    }
    finish(&tmp, path)
}

/// Deserialize every row of a headed CSV file.
pub fn read_records<T: DeserializeOwned>(path: &Path) -> Result<Vec<T>, csv::Error> {
    let mut rdr = csv::Reader::from_path(path)?;
    rdr.deserialize().collect()
}

/// Format an optional value as a CSV cell; `None` becomes an empty cell.
pub fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}
