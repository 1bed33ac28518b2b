//! Pipeline configuration.
//!
//! A single `PipelineConfig` is loaded from TOML and passed explicitly to every
//! stage. Required fields (country, date range, indicators, paths, warehouse
//! backend) have no defaults; tuning knobs default to the values documented on
//! each field. Relative paths resolve against the directory of the config file.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::IndicatorDefinition;

pub const DEFAULT_BASE_URL: &str = "https://api.worldbank.org/v2";

/// File names written into `paths.processed_dir` by the transformer.
pub const LONG_FILE: &str = "economic_indicators_long.csv";
pub const WIDE_FILE: &str = "economic_indicators_wide.csv";
pub const SUMMARY_FILE: &str = "indicator_summary.csv";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),
}

/// Complete configuration for one pipeline run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub source: SourceConfig,
    pub indicators: Vec<IndicatorDefinition>,
    pub paths: PathsConfig,
    #[serde(default)]
    pub transform: TransformConfig,
    pub warehouse: WarehouseConfig,
}

/// Where and how observations are fetched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// ISO3 country code, e.g. `BGD`.
    pub country_code: String,
    pub start_year: i32,
    pub end_year: i32,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-request timeout. Default 30 s.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    /// Retries after the first attempt for transient failures. Default 3.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Fixed pause between attempts. Default 1000 ms.
    #[serde(default = "default_retry_delay_ms")]
    pub retry_delay_ms: u64,
    /// Courtesy pause between indicators. Default 500 ms.
    #[serde(default = "default_request_spacing_ms")]
    pub request_spacing_ms: u64,
    /// Page size requested from the provider. Default 100.
    #[serde(default = "default_per_page")]
    pub per_page: u32,
}

/// Input and output locations.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PathsConfig {
    pub raw_csv: PathBuf,
    pub processed_dir: PathBuf,
    pub warehouse: PathBuf,
    pub backup_dir: PathBuf,
}

impl PathsConfig {
    pub fn long_csv(&self) -> PathBuf {
        self.processed_dir.join(LONG_FILE)
    }

    pub fn wide_csv(&self) -> PathBuf {
        self.processed_dir.join(WIDE_FILE)
    }

    pub fn summary_csv(&self) -> PathBuf {
        self.processed_dir.join(SUMMARY_FILE)
    }

    fn resolve(&mut self, base: &Path) {
        for path in [
            &mut self.raw_csv,
            &mut self.processed_dir,
            &mut self.warehouse,
            &mut self.backup_dir,
        ] {
            resolve_in_place(path, base);
        }
    }
}

/// Transformer tuning.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransformConfig {
    /// Largest tolerated fraction of missing/non-numeric values. Default 0.10.
    #[serde(default = "default_missing_threshold")]
    pub missing_threshold: f64,
    /// Fewest points for a trend fit. Default 5.
    #[serde(default = "default_trend_min_points")]
    pub trend_min_points: usize,
    /// Allowed deviation of summed sector shares from 1. Default 1e-6.
    #[serde(default = "default_share_tolerance")]
    pub share_tolerance: f64,
    /// Codes of sector-share indicators (percent of GDP). The residual sector is
    /// estimated as 100 minus their sum. Empty disables the structure metrics.
    #[serde(default)]
    pub sector_shares: Vec<String>,
    /// Codes that get a growth series. `None` means every configured indicator.
    #[serde(default)]
    pub growth: Option<Vec<String>>,
    /// Codes that get a moving average. `None` means every configured indicator.
    #[serde(default)]
    pub moving_average: Option<Vec<String>>,
}

impl Default for TransformConfig {
    fn default() -> Self {
        Self {
            missing_threshold: default_missing_threshold(),
            trend_min_points: default_trend_min_points(),
            share_tolerance: default_share_tolerance(),
            sector_shares: Vec::new(),
            growth: None,
            moving_average: None,
        }
    }
}

/// Which warehouse implementation persists the processed files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarehouseBackend {
    Sqlite,
    ObjectStore,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WarehouseConfig {
    pub backend: WarehouseBackend,
    #[serde(default)]
    pub object_store: Option<ObjectStoreConfig>,
}

/// Remote variant settings. `root` is the directory holding buckets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ObjectStoreConfig {
    pub root: PathBuf,
    pub bucket: String,
    #[serde(default = "default_prefix")]
    pub prefix: String,
    /// Upload a COPY manifest next to the data files. Default false.
    #[serde(default)]
    pub write_manifest: bool,
}

impl PipelineConfig {
    /// Load, resolve relative paths, and validate a TOML config file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        Self::from_toml_str(&text, base)
    }

    /// Parse TOML text; relative paths are resolved against `base_dir`.
    pub fn from_toml_str(text: &str, base_dir: &Path) -> Result<Self, ConfigError> {
        let mut config: PipelineConfig = toml::from_str(text)?;
        config.paths.resolve(base_dir);
        if let Some(store) = config.warehouse.object_store.as_mut() {
            resolve_in_place(&mut store.root, base_dir);
        }
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let source = &self.source;
        if source.country_code.trim().is_empty() {
            return Err(invalid("source.country_code must not be empty"));
        }
        if source.start_year > source.end_year {
            return Err(invalid(format!(
                "source.start_year ({}) is after source.end_year ({})",
                source.start_year, source.end_year
            )));
        }
        if source.per_page == 0 {
            return Err(invalid("source.per_page must be at least 1"));
        }
        if self.indicators.is_empty() {
            return Err(invalid("at least one [[indicators]] entry is required"));
        }

        let mut codes = HashSet::new();
        let mut names = HashSet::new();
        for def in &self.indicators {
            if def.code.trim().is_empty() || def.name.trim().is_empty() {
                return Err(invalid("indicator code and name must not be empty"));
            }
            if !codes.insert(def.code.as_str()) {
                return Err(invalid(format!("duplicate indicator code '{}'", def.code)));
            }
            if !names.insert(def.name.as_str()) {
                return Err(invalid(format!("duplicate indicator name '{}'", def.name)));
            }
        }

        let t = &self.transform;
        if !(t.missing_threshold > 0.0 && t.missing_threshold <= 1.0) {
            return Err(invalid("transform.missing_threshold must be in (0, 1]"));
        }
        if t.trend_min_points < 2 {
            return Err(invalid("transform.trend_min_points must be at least 2"));
        }
        if !(t.share_tolerance > 0.0) {
            return Err(invalid("transform.share_tolerance must be positive"));
        }
        let lists = [
            ("transform.sector_shares", Some(&t.sector_shares)),
            ("transform.growth", t.growth.as_ref()),
            ("transform.moving_average", t.moving_average.as_ref()),
        ];
        for (field, list) in lists {
            for code in list.into_iter().flatten() {
                if !codes.contains(code.as_str()) {
                    return Err(invalid(format!(
                        "{field} refers to unknown indicator '{code}'"
                    )));
                }
            }
        }

        if self.warehouse.backend == WarehouseBackend::ObjectStore {
            let store = self.warehouse.object_store.as_ref().ok_or_else(|| {
                invalid("warehouse.backend = \"object_store\" requires [warehouse.object_store]")
            })?;
            if store.bucket.trim().is_empty() {
                return Err(invalid("warehouse.object_store.bucket must not be empty"));
            }
        }

        Ok(())
    }

    /// Codes that receive a growth series, in configuration order.
    pub fn growth_codes(&self) -> Vec<&str> {
        select_codes(&self.indicators, self.transform.growth.as_ref())
    }

    /// Codes that receive a moving average, in configuration order.
    pub fn moving_average_codes(&self) -> Vec<&str> {
        select_codes(&self.indicators, self.transform.moving_average.as_ref())
    }

    pub fn indicator(&self, code: &str) -> Option<&IndicatorDefinition> {
        self.indicators.iter().find(|d| d.code == code)
    }
}

fn select_codes<'a>(
    indicators: &'a [IndicatorDefinition],
    selection: Option<&Vec<String>>,
) -> Vec<&'a str> {
    indicators
        .iter()
        .filter(|d| selection.map_or(true, |sel| sel.iter().any(|c| *c == d.code)))
        .map(|d| d.code.as_str())
        .collect()
}

fn resolve_in_place(path: &mut PathBuf, base: &Path) {
    if path.is_relative() {
        *path = base.join(&*path);
    }
}

fn invalid(msg: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(msg.into())
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_max_retries() -> u32 {
    3
}
fn default_retry_delay_ms() -> u64 {
    1000
}
fn default_request_spacing_ms() -> u64 {
    500
}
fn default_per_page() -> u32 {
    100
}
fn default_missing_threshold() -> f64 {
    0.10
}
fn default_trend_min_points() -> usize {
    5
}
fn default_share_tolerance() -> f64 {
    1e-6
}
fn default_prefix() -> String {
    "processed-data".to_string()
}
