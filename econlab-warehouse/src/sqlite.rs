//! Local warehouse: a single SQLite file rebuilt from the processed files.
//!
//! Loads are all-or-nothing. The new database is built at `{path}.tmp` in one
//! transaction, verified, and renamed over the old file. Any failure removes
//! the temp file and leaves the previous warehouse untouched. Tables carry no
//! load timestamps, so identical input yields identical contents.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use econlab_core::config::PipelineConfig;
use econlab_core::domain::{
    derived_kind, DerivedKind, IndicatorCatalog, IndicatorDefinition, IndicatorObservation,
    DIVERSIFICATION_CODE, RESIDUAL_SHARE_CODE,
};
use econlab_core::transform::IndicatorSummary;
use rusqlite::{params, Connection, Transaction};

use crate::backup::backup_existing;
use crate::error::WarehouseError;
use crate::processed::{ProcessedData, ProcessedFiles};
use crate::views::{create_views, PivotColumn, SCHEMA};

/// Counts reported after a successful SQLite load.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SqliteLoadReport {
    pub path: PathBuf,
    pub fact_rows: usize,
    pub dimension_rows: usize,
    pub summary_rows: usize,
    pub backup: Option<PathBuf>,
}

pub struct SqliteWarehouse {
    path: PathBuf,
    backup_dir: PathBuf,
    catalog: IndicatorCatalog,
    sector_shares: Vec<String>,
}

impl SqliteWarehouse {
    pub fn new(config: &PipelineConfig) -> Self {
        Self {
            path: config.paths.warehouse.clone(),
            backup_dir: config.paths.backup_dir.clone(),
            catalog: IndicatorCatalog::new(&config.indicators),
            sector_shares: config.transform.sector_shares.clone(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self.path.as_os_str().to_os_string();
        name.push(".tmp");
        PathBuf::from(name)
    }

    /// Load the processed files; `stamp` names the backup of any previous file.
    pub fn load_at(
        &self,
        files: &ProcessedFiles,
        stamp: NaiveDateTime,
    ) -> Result<SqliteLoadReport, WarehouseError> {
        let data = ProcessedData::load(files)?;
        tracing::info!(
            warehouse = %self.path.display(),
            fact_rows = data.long.len(),
            summary_rows = data.summary.len(),
            "loading warehouse"
        );

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).map_err(|e| WarehouseError::io(parent, e))?;
        }

        let tmp = self.tmp_path();
        if tmp.exists() {
            fs::remove_file(&tmp).map_err(|e| WarehouseError::io(&tmp, e))?;
        }

        let built = self.build(&tmp, &data);
        let (dimension_rows, fact_rows) = match built {
            Ok(counts) => counts,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                tracing::error!(error = %e, "warehouse build failed, previous warehouse kept");
                return Err(e);
            }
        };

        let backup = match backup_existing(&self.path, &self.backup_dir, stamp) {
            Ok(b) => b,
            Err(e) => {
                let _ = fs::remove_file(&tmp);
                return Err(e);
            }
        };

        fs::rename(&tmp, &self.path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            WarehouseError::io(&self.path, e)
        })?;

        tracing::info!(
            warehouse = %self.path.display(),
            fact_rows,
            dimension_rows,
            "warehouse replaced"
        );

        Ok(SqliteLoadReport {
            path: self.path.clone(),
            fact_rows,
            dimension_rows,
            summary_rows: data.summary.len(),
            backup,
        })
    }

    /// Build a complete database at `tmp`; returns (dimension rows, fact rows).
    fn build(&self, tmp: &Path, data: &ProcessedData) -> Result<(usize, usize), WarehouseError> {
        let mut conn = Connection::open(tmp)?;
        let dimensions = self.dimensions(&data.long);
        let (structure, growth) = self.pivots(&dimensions);

        {
            let tx = conn.transaction()?;
            tx.execute_batch(SCHEMA)?;
            insert_facts(&tx, &data.long)?;
            insert_dimensions(&tx, &dimensions)?;
            insert_summaries(&tx, &data.summary)?;
            create_views(&tx, &structure, &growth)?;
            tx.commit()?;
        }

        let fact_rows: i64 =
            conn.query_row("SELECT COUNT(*) FROM economic_indicators", [], |r| r.get(0))?;
        if fact_rows as usize != data.long.len() {
            return Err(WarehouseError::Verification(format!(
                "economic_indicators has {fact_rows} rows, expected {}",
                data.long.len()
            )));
        }
        conn.close().map_err(|(_, e)| WarehouseError::Sqlite(e))?;

        Ok((dimensions.len(), fact_rows as usize))
    }

    /// Catalog definitions for every code present in the fact rows. Codes the
    /// catalog does not know keep the name found in the data.
    fn dimensions(&self, facts: &[IndicatorObservation]) -> Vec<IndicatorDefinition> {
        let mut present: BTreeMap<&str, &str> = BTreeMap::new();
        for obs in facts {
            present
                .entry(obs.indicator_code.as_str())
                .or_insert(obs.indicator_name.as_str());
        }

        let mut dims: Vec<IndicatorDefinition> = self
            .catalog
            .definitions()
            .iter()
            .filter(|d| present.contains_key(d.code.as_str()))
            .cloned()
            .collect();
        for (code, name) in present {
            if self.catalog.get(code).is_none() {
                let mut def = IndicatorDefinition::new(code, name);
                def.derived = derived_kind(code).is_some();
                dims.push(def);
            }
        }
        dims
    }

    /// Column lists for the structure and growth views.
    fn pivots(&self, dims: &[IndicatorDefinition]) -> (Vec<PivotColumn>, Vec<PivotColumn>) {
        let column = |d: &IndicatorDefinition| PivotColumn {
            indicator_code: d.code.clone(),
            alias: d.name.clone(),
        };

        let mut structure: Vec<PivotColumn> = self
            .sector_shares
            .iter()
            .filter_map(|code| dims.iter().find(|d| &d.code == code))
            .map(column)
            .collect();
        structure.extend(
            [RESIDUAL_SHARE_CODE, DIVERSIFICATION_CODE]
                .iter()
                .filter_map(|code| dims.iter().find(|d| d.code == *code))
                .map(column),
        );

        let growth = dims
            .iter()
            .filter(|d| derived_kind(&d.code) == Some(DerivedKind::Growth))
            .map(column)
            .collect();

        (structure, growth)
    }
}

fn insert_facts(tx: &Transaction, facts: &[IndicatorObservation]) -> Result<(), WarehouseError> {
    let mut stmt = tx.prepare(
        "INSERT INTO economic_indicators
            (country_name, country_code, indicator_code, indicator_name, year, value)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for obs in facts {
        stmt.execute(params![
            obs.country_name,
            obs.country_code,
            obs.indicator_code,
            obs.indicator_name,
            obs.year,
            obs.value,
        ])
        .map_err(|e| {
            WarehouseError::Verification(format!(
                "economic_indicators: cannot insert ({}, {}): {e}",
                obs.indicator_code, obs.year
            ))
        })?;
    }
    Ok(())
}

fn insert_dimensions(tx: &Transaction, dims: &[IndicatorDefinition]) -> Result<(), WarehouseError> {
    let mut stmt = tx.prepare(
        "INSERT INTO dim_indicators
            (indicator_code, indicator_name, category, unit, description, is_derived)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
    )?;
    for d in dims {
        stmt.execute(params![d.code, d.name, d.category, d.unit, d.description, d.derived])?;
    }
    Ok(())
}

fn insert_summaries(tx: &Transaction, rows: &[IndicatorSummary]) -> Result<(), WarehouseError> {
    let mut stmt = tx.prepare(
        "INSERT INTO indicator_summary
            (indicator_code, indicator_name, record_count, min_year, max_year,
             mean_value, std_value, min_value, max_value, trend_slope, trend_intercept)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
    )?;
    for s in rows {
        stmt.execute(params![
            s.indicator_code,
            s.indicator_name,
            s.count as i64,
            s.min_year,
            s.max_year,
            s.mean,
            s.std,
            s.min,
            s.max,
            s.trend_slope,
            s.trend_intercept,
        ])?;
    }
    Ok(())
}
