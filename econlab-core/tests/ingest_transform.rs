//! Integration tests for the ingest and transform stages.
//!
//! Tests:
//! 1. Ingest with a partially failing provider writes a sorted raw file
//! 2. Ingest with every indicator failing is fatal and writes nothing
//! 3. Transform produces long, wide and summary files that agree
//! 4. The 2001 GDP per capita growth scenario survives the full chain
//! 5. Transform without a raw file fails with MissingInput
//! 6. A raw file with no usable rows fails instead of writing empty outputs
//! 7. An unwritable raw path surfaces as a CSV error naming the file

use std::collections::HashMap;
use std::fs;
use std::path::Path;

use econlab_core::config::PipelineConfig;
use econlab_core::data::{run_ingest, DataError, IndicatorProvider, NoProgress, Page};
use econlab_core::domain::{IndicatorCatalog, IndicatorDefinition, IndicatorObservation};
use econlab_core::io::read_records;
use econlab_core::transform::{read_wide, run_transform, IndicatorSummary, TransformError};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const CONFIG: &str = r#"
[source]
country_code = "BGD"
start_year = 2000
end_year = 2009
max_retries = 1
retry_delay_ms = 0
request_spacing_ms = 0

[[indicators]]
code = "NY.GDP.PCAP.KD"
name = "gdp_per_capita"

[[indicators]]
code = "NV.AGR.TOTL.ZS"
name = "agriculture_pct_gdp"

[[indicators]]
code = "NV.IND.TOTL.ZS"
name = "industry_pct_gdp"

[[indicators]]
code = "SL.UEM.TOTL.ZS"
name = "unemployment_rate"

[paths]
raw_csv = "data/raw.csv"
processed_dir = "data/processed"
warehouse = "data/warehouse.db"
backup_dir = "data/backups"

[transform]
sector_shares = ["NV.AGR.TOTL.ZS", "NV.IND.TOTL.ZS"]

[warehouse]
backend = "sqlite"
"#;

fn config(dir: &Path) -> PipelineConfig {
    PipelineConfig::from_toml_str(CONFIG, dir).unwrap()
}

/// Serves one page per indicator from a fixed table; listed codes fail.
struct TableProvider {
    series: HashMap<String, Vec<(i32, f64)>>,
    failing: Vec<String>,
}

impl TableProvider {
    fn new(failing: &[&str]) -> Self {
        let mut series = HashMap::new();
        let gdp = [459.0, 487.0, 505.0, 523.0, 545.0, 570.0, 600.0, 633.0, 665.0, 693.0];
        series.insert(
            "NY.GDP.PCAP.KD".to_string(),
            (2000..2010).zip(gdp).collect::<Vec<_>>(),
        );
        series.insert(
            "NV.AGR.TOTL.ZS".to_string(),
            (2000..2010).map(|y| (y, 24.0 - f64::from(y - 2000) * 0.5)).collect(),
        );
        series.insert(
            "NV.IND.TOTL.ZS".to_string(),
            (2000..2010).map(|y| (y, 23.0 + f64::from(y - 2000) * 0.4)).collect(),
        );
        series.insert(
            "SL.UEM.TOTL.ZS".to_string(),
            (2000..2010).map(|y| (y, 4.0)).collect(),
        );
        Self {
            series,
            failing: failing.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl IndicatorProvider for TableProvider {
    fn name(&self) -> &str {
        "table"
    }

    fn fetch_page(&self, indicator: &IndicatorDefinition, _page: u32) -> Result<Page, DataError> {
        if self.failing.contains(&indicator.code) {
            return Err(DataError::HttpStatus {
                status: 503,
                indicator: indicator.code.clone(),
            });
        }
        let points = self.series.get(&indicator.code).cloned().unwrap_or_default();
        Ok(Page {
            page: 1,
            pages: 1,
            observations: points
                .into_iter()
                .rev()
                .map(|(year, value)| IndicatorObservation {
                    country_name: "Bangladesh".into(),
                    country_code: "BGD".into(),
                    indicator_code: indicator.code.clone(),
                    indicator_name: indicator.name.clone(),
                    year,
                    value,
                })
                .collect(),
            skipped_nulls: 0,
        })
    }
}

// ──────────────────────────────────────────────
// Ingest
// ──────────────────────────────────────────────

#[test]
fn partial_ingest_writes_sorted_raw_file() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let report = run_ingest(&cfg, &TableProvider::new(&["SL.UEM.TOTL.ZS"]), &NoProgress).unwrap();

    assert_eq!(report.indicators, 3);
    assert_eq!(report.summary.failed(), 1);
    assert_eq!(report.rows, 30);

    let raw: Vec<IndicatorObservation> = read_records(&cfg.paths.raw_csv).unwrap();
    assert_eq!(raw.len(), 30);
    let keys: Vec<(&str, i32)> = raw
        .iter()
        .map(|o| (o.indicator_name.as_str(), o.year))
        .collect();
    let mut sorted = keys.clone();
    sorted.sort();
    assert_eq!(keys, sorted, "raw file must be sorted by (indicator_name, year)");
}

#[test]
fn ingest_with_no_successes_is_fatal() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    let all: Vec<&str> = cfg.indicators.iter().map(|d| d.code.as_str()).collect();

    let err = run_ingest(&cfg, &TableProvider::new(&all), &NoProgress).unwrap_err();

    assert!(matches!(err, DataError::NothingFetched { failed: 4 }));
    assert!(!cfg.paths.raw_csv.exists());
}

// ──────────────────────────────────────────────
// Transform
// ──────────────────────────────────────────────

#[test]
fn transform_outputs_agree() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    run_ingest(&cfg, &TableProvider::new(&[]), &NoProgress).unwrap();

    let report = run_transform(&cfg).unwrap();

    let long: Vec<IndicatorObservation> = read_records(&cfg.paths.long_csv()).unwrap();
    assert_eq!(long.len(), report.long_rows);
    assert_eq!(report.base_rows, 40);
    // 4 growth series × 9 + 4 moving averages × 8 + residual × 10 + index × 10
    assert_eq!(report.derived_rows, 36 + 32 + 10 + 10);

    let catalog = IndicatorCatalog::new(&cfg.indicators);
    let wide = read_wide(&cfg.paths.wide_csv(), &catalog).unwrap();
    assert_eq!(wide.rows.len(), 10);
    assert_eq!(wide.columns.len() + 1, report.wide_columns);
    assert_eq!(wide.header()[1], "gdp_per_capita");

    let summary: Vec<IndicatorSummary> = read_records(&cfg.paths.summary_csv()).unwrap();
    let gdp = summary
        .iter()
        .find(|s| s.indicator_code == "NY.GDP.PCAP.KD")
        .unwrap();
    assert_eq!(gdp.count, 10);
    assert_eq!(gdp.min, 459.0);
    assert!(gdp.trend_slope.unwrap() > 0.0);

    let services = wide.value(2000, "services_pct_gdp_estimated").unwrap();
    assert!((services - 53.0).abs() < 1e-9);
}

#[test]
fn gdp_growth_2001_scenario() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());
    run_ingest(&cfg, &TableProvider::new(&[]), &NoProgress).unwrap();
    run_transform(&cfg).unwrap();

    let long: Vec<IndicatorObservation> = read_records(&cfg.paths.long_csv()).unwrap();
    let growth: Vec<&IndicatorObservation> = long
        .iter()
        .filter(|o| o.indicator_code == "NY.GDP.PCAP.KD.YOY")
        .collect();

    assert_eq!(growth[0].year, 2001);
    assert_eq!(growth[0].indicator_name, "gdp_per_capita_yoy_growth");
    assert!((growth[0].value - 0.061).abs() < 0.001);
}

#[test]
fn transform_without_raw_file_fails() {
    let dir = tempfile::tempdir().unwrap();
    let cfg = config(dir.path());

    let err = run_transform(&cfg).unwrap_err();
    assert!(
        matches!(&err, TransformError::MissingInput(p) if *p == cfg.paths.raw_csv),
        "got {err:?}"
    );
}

#[test]
fn all_missing_raw_file_fails_and_writes_nothing() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    cfg.transform.missing_threshold = 1.0;
    fs::create_dir_all(cfg.paths.raw_csv.parent().unwrap()).unwrap();
    fs::write(
        &cfg.paths.raw_csv,
        "country_name,country_code,indicator_code,indicator_name,year,value\n\
         Bangladesh,BGD,SP.POP.TOTL,population,2000,n/a\n\
         Bangladesh,BGD,SP.POP.TOTL,population,2001,\n",
    )
    .unwrap();

    let err = run_transform(&cfg).unwrap_err();

    assert!(matches!(err, TransformError::Validation(_)), "got {err:?}");
    assert!(!cfg.paths.long_csv().exists());
    assert!(!cfg.paths.summary_csv().exists());
}

#[test]
fn unwritable_raw_path_is_a_csv_error() {
    let dir = tempfile::tempdir().unwrap();
    let mut cfg = config(dir.path());
    // A regular file where the raw file's directory should be.
    let blocker = dir.path().join("blocker");
    fs::write(&blocker, b"").unwrap();
    cfg.paths.raw_csv = blocker.join("raw.csv");

    let err = run_ingest(&cfg, &TableProvider::new(&[]), &NoProgress).unwrap_err();

    match err {
        DataError::Csv { path, .. } => assert!(path.ends_with("raw.csv"), "{path}"),
        other => panic!("expected Csv, got {other:?}"),
    }
}
