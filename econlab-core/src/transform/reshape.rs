//! Long ↔ wide reshaping.
//!
//! The wide table has one row per year and one column per indicator, headed by
//! indicator name. Cells with no observation are empty.

use std::collections::{BTreeSet, HashMap};
use std::path::Path;

use super::metrics::CountryLabel;
use super::TransformError;
use crate::domain::{IndicatorCatalog, IndicatorObservation};
use crate::io::{cell, write_table_atomic};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WideColumn {
    pub code: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideRow {
    pub year: i32,
    /// One entry per column, in column order.
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct WideTable {
    pub columns: Vec<WideColumn>,
    pub rows: Vec<WideRow>,
}

impl WideTable {
    pub fn header(&self) -> Vec<String> {
        std::iter::once("year".to_string())
            .chain(self.columns.iter().map(|c| c.name.clone()))
            .collect()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    pub fn value(&self, year: i32, name: &str) -> Option<f64> {
        let col = self.column_index(name)?;
        self.rows
            .iter()
            .find(|r| r.year == year)
            .and_then(|r| r.values[col])
    }
}

/// Pivot observations into a wide table.
///
/// Columns follow catalog order, with codes unknown to the catalog last in
/// code order. If an (indicator, year) pair repeats, the first value wins.
pub fn to_wide(observations: &[IndicatorObservation], catalog: &IndicatorCatalog) -> WideTable {
    let mut names: HashMap<&str, &str> = HashMap::new();
    for obs in observations {
        names
            .entry(obs.indicator_code.as_str())
            .or_insert(obs.indicator_name.as_str());
    }

    let mut columns: Vec<WideColumn> = names
        .iter()
        .map(|(code, name)| WideColumn {
            code: code.to_string(),
            name: name.to_string(),
        })
        .collect();
    columns.sort_by(|a, b| {
        let pa = catalog.position(&a.code).unwrap_or(usize::MAX);
        let pb = catalog.position(&b.code).unwrap_or(usize::MAX);
        pa.cmp(&pb).then_with(|| a.code.cmp(&b.code))
    });

    let col_of: HashMap<&str, usize> = columns
        .iter()
        .enumerate()
        .map(|(i, c)| (c.code.as_str(), i))
        .collect();
    let years: BTreeSet<i32> = observations.iter().map(|o| o.year).collect();
    let row_of: HashMap<i32, usize> = years.iter().enumerate().map(|(i, y)| (*y, i)).collect();

    let mut rows: Vec<WideRow> = years
        .iter()
        .map(|&year| WideRow {
            year,
            values: vec![None; columns.len()],
        })
        .collect();

    for obs in observations {
        let slot = &mut rows[row_of[&obs.year]].values[col_of[obs.indicator_code.as_str()]];
        if slot.is_none() {
            *slot = Some(obs.value);
        }
    }

    WideTable { columns, rows }
}

/// Unpivot a wide table back to observations, sorted by (indicator_code, year).
pub fn to_long(table: &WideTable, country: &CountryLabel) -> Vec<IndicatorObservation> {
    let mut out: Vec<IndicatorObservation> = table
        .columns
        .iter()
        .enumerate()
        .flat_map(|(i, column)| {
            table.rows.iter().filter_map(move |row| {
                row.values[i].map(|value| IndicatorObservation {
                    country_name: country.name.clone(),
                    country_code: country.code.clone(),
                    indicator_code: column.code.clone(),
                    indicator_name: column.name.clone(),
                    year: row.year,
                    value,
                })
            })
        })
        .collect();
    out.sort_by(|a, b| {
        a.indicator_code
            .cmp(&b.indicator_code)
            .then(a.year.cmp(&b.year))
    });
    out
}

pub fn write_wide(path: &Path, table: &WideTable) -> Result<(), csv::Error> {
    let rows = table.rows.iter().map(|row| {
        std::iter::once(row.year.to_string())
            .chain(row.values.iter().map(|v| cell(*v)))
            .collect::<Vec<_>>()
    });
    write_table_atomic(path, &table.header(), rows)
}

/// Read a wide CSV; column names are mapped back to codes through `catalog`.
pub fn read_wide(path: &Path, catalog: &IndicatorCatalog) -> Result<WideTable, TransformError> {
    let mut rdr = csv::Reader::from_path(path)?;
    let headers = rdr.headers()?.clone();

    if headers.get(0) != Some("year") {
        return Err(TransformError::Validation(format!(
            "{}: first column must be 'year'",
            path.display()
        )));
    }
    let columns = headers
        .iter()
        .skip(1)
        .map(|name| {
            catalog
                .by_name(name)
                .map(|def| WideColumn {
                    code: def.code.clone(),
                    name: name.to_string(),
                })
                .ok_or_else(|| {
                    TransformError::Validation(format!(
                        "{}: unknown indicator column '{name}'",
                        path.display()
                    ))
                })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let bad = |what: &str, text: &str| {
        TransformError::Validation(format!("{}: invalid {what} '{text}'", path.display()))
    };

    let mut rows = Vec::new();
    for record in rdr.records() {
        let record = record?;
        let year_text = record.get(0).unwrap_or_default();
        let year: i32 = year_text.trim().parse().map_err(|_| bad("year", year_text))?;
        let values = (1..=columns.len())
            .map(|i| {
                let text = record.get(i).unwrap_or_default().trim();
                if text.is_empty() {
                    Ok(None)
                } else {
                    text.parse::<f64>().map(Some).map_err(|_| bad("value", text))
                }
            })
            .collect::<Result<Vec<_>, _>>()?;
        rows.push(WideRow { year, values });
    }

    Ok(WideTable { columns, rows })
}
