use polars::prelude::*;

use crate::domain::IndicatorObservation;

/// Columns every raw observation file must carry.
pub const REQUIRED_COLUMNS: [&str; 6] = IndicatorObservation::CSV_HEADER;

/// Expected shape of the raw long-format file.
pub struct RawSchema;

impl RawSchema {
    /// Check that every required column is present. Extra columns are ignored.
    pub fn validate(df: &DataFrame) -> Result<(), SchemaError> {
        let missing: Vec<String> = REQUIRED_COLUMNS
            .iter()
            .filter(|name| df.column(name).is_err())
            .map(|name| name.to_string())
            .collect();

        if missing.is_empty() {
            Ok(())
        } else {
            Err(SchemaError::MissingColumns(missing))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum SchemaError {
    #[error("missing required column(s): {}", .0.join(", "))]
    MissingColumns(Vec<String>),
}
