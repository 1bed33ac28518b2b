//! Raw file cleaning: schema check, type coercion, missing-value threshold,
//! dedupe and sort.

use std::path::Path;

use polars::prelude::*;

use super::schema::RawSchema;
use super::TransformError;
use crate::domain::IndicatorObservation;

/// Cleaned observations plus what cleaning removed.
#[derive(Debug, Clone, PartialEq)]
pub struct CleanReport {
    pub observations: Vec<IndicatorObservation>,
    /// Rows in the raw file.
    pub input_rows: usize,
    /// Rows whose year or value was absent or not numeric.
    pub missing_rows: usize,
    /// Rows dropped as repeats of an earlier (indicator_code, year).
    pub duplicate_rows: usize,
}

/// Read the raw CSV with every column as text.
pub fn read_raw(path: &Path) -> Result<DataFrame, TransformError> {
    if !path.exists() {
        return Err(TransformError::MissingInput(path.to_path_buf()));
    }
    let df = LazyCsvReader::new(path)
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .finish()?
        .collect()?;
    Ok(df)
}

/// Clean a raw (all-text) frame.
///
/// `year` is coerced to integer and `value` to float; anything that does not
/// coerce counts as missing. If the missing fraction exceeds
/// `missing_threshold` the whole table is rejected.
pub fn clean(raw: DataFrame, missing_threshold: f64) -> Result<CleanReport, TransformError> {
    RawSchema::validate(&raw)?;

    let input_rows = raw.height();
    if input_rows == 0 {
        return Err(TransformError::Validation("raw file has no rows".into()));
    }

    let typed = raw
        .lazy()
        .with_columns([
            col("year").cast(DataType::Int32),
            col("value").cast(DataType::Float64),
        ])
        .collect()?;

    let missing_rows = typed
        .clone()
        .lazy()
        .filter(col("year").is_null().or(col("value").is_null()))
        .collect()?
        .height();

    let missing_fraction = missing_rows as f64 / input_rows as f64;
    if missing_fraction > missing_threshold {
        return Err(TransformError::Validation(format!(
            "{missing_rows} of {input_rows} rows ({:.1}%) have a missing or non-numeric year/value, above the {:.1}% threshold",
            missing_fraction * 100.0,
            missing_threshold * 100.0
        )));
    }

    let complete = input_rows - missing_rows;
    let cleaned = typed
        .lazy()
        .filter(col("year").is_not_null().and(col("value").is_not_null()))
        .unique_stable(
            Some(vec!["indicator_code".into(), "year".into()]),
            UniqueKeepStrategy::First,
        )
        .sort(
            ["indicator_code", "year"],
            SortMultipleOptions::default().with_maintain_order(true),
        )
        .collect()?;

    let observations = to_observations(&cleaned)?;
    if observations.is_empty() {
        return Err(TransformError::Validation(format!(
            "no rows left after cleaning ({input_rows} raw rows, all missing or non-numeric)"
        )));
    }
    let duplicate_rows = complete - observations.len();

    tracing::debug!(
        input_rows,
        missing_rows,
        duplicate_rows,
        kept = observations.len(),
        "raw table cleaned"
    );

    Ok(CleanReport {
        observations,
        input_rows,
        missing_rows,
        duplicate_rows,
    })
}

fn to_observations(df: &DataFrame) -> Result<Vec<IndicatorObservation>, TransformError> {
    let country_name = df.column("country_name")?.str()?;
    let country_code = df.column("country_code")?.str()?;
    let indicator_code = df.column("indicator_code")?.str()?;
    let indicator_name = df.column("indicator_name")?.str()?;
    let year = df.column("year")?.i32()?;
    let value = df.column("value")?.f64()?;

    let text = |v: Option<&str>| v.unwrap_or_default().trim().to_string();

    let mut out = Vec::with_capacity(df.height());
    for (((((cn, cc), code), name), y), v) in country_name
        .into_iter()
        .zip(country_code)
        .zip(indicator_code)
        .zip(indicator_name)
        .zip(year)
        .zip(value)
    {
        let (Some(year), Some(value)) = (y, v) else {
            continue;
        };
        out.push(IndicatorObservation {
            country_name: text(cn),
            country_code: text(cc),
            indicator_code: text(code),
            indicator_name: text(name),
            year,
            value,
        });
    }
    Ok(out)
}
