//! Post-load data quality check against the SQLite warehouse.

use std::collections::BTreeSet;
use std::path::Path;

use rusqlite::{Connection, OpenFlags};
use serde::Serialize;

use crate::error::WarehouseError;

/// Fewer fact rows than this costs points.
pub const MIN_EXPECTED_ROWS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QualityReport {
    pub total_rows: usize,
    pub null_values: usize,
    /// Configured base indicators with at least one fact row.
    pub indicators_present: usize,
    pub indicators_expected: usize,
    pub score: u32,
    pub issues: Vec<String>,
}

/// Score the warehouse at `path` against the configured base indicator codes.
///
/// Starts at 100: −20 for any NULL value, −20 if any configured indicator is
/// absent, −10 for fewer than 100 fact rows.
pub fn assess(path: &Path, base_codes: &[String]) -> Result<QualityReport, WarehouseError> {
    if !path.exists() {
        return Err(WarehouseError::MissingInput(path.to_path_buf()));
    }
    let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_ONLY)?;

    let total_rows: i64 =
        conn.query_row("SELECT COUNT(*) FROM economic_indicators", [], |r| r.get(0))?;
    let null_values: i64 = conn.query_row(
        "SELECT COUNT(*) FROM economic_indicators WHERE value IS NULL",
        [],
        |r| r.get(0),
    )?;
    let present: BTreeSet<String> = conn
        .prepare("SELECT DISTINCT indicator_code FROM economic_indicators")?
        .query_map([], |r| r.get::<_, String>(0))?
        .collect::<Result<_, _>>()?;

    let indicators_present = base_codes.iter().filter(|c| present.contains(*c)).count();
    let report = score(
        total_rows as usize,
        null_values as usize,
        indicators_present,
        base_codes.len(),
    );

    tracing::info!(
        total_rows = report.total_rows,
        null_values = report.null_values,
        indicators_present = report.indicators_present,
        score = report.score,
        "quality check complete"
    );
    Ok(report)
}

fn score(
    total_rows: usize,
    null_values: usize,
    indicators_present: usize,
    indicators_expected: usize,
) -> QualityReport {
    let mut score = 100u32;
    let mut issues = Vec::new();

    if null_values > 0 {
        score -= 20;
        issues.push(format!("{null_values} NULL values"));
    }
    if indicators_present < indicators_expected {
        score -= 20;
        issues.push(format!(
            "only {indicators_present} of {indicators_expected} indicators present"
        ));
    }
    if total_rows < MIN_EXPECTED_ROWS {
        score -= 10;
        issues.push(format!("only {total_rows} rows (expected at least {MIN_EXPECTED_ROWS})"));
    }

    QualityReport {
        total_rows,
        null_values,
        indicators_present,
        indicators_expected,
        score,
        issues,
    }
}
