//! Derived metrics over cleaned indicator series.
//!
//! Each metric is a pure function of ordered `(year, value)` points. The
//! functions here turn those points into long-format rows with catalog codes.

pub mod diversification;
pub mod growth;
pub mod moving_average;
pub mod trend;

use std::collections::{BTreeMap, BTreeSet};

pub use diversification::{herfindahl, residual_share};
pub use growth::yoy_growth;
pub use moving_average::moving_average;
pub use trend::{fit_trend, TrendFit};

use crate::config::PipelineConfig;
use crate::domain::{
    growth_code, growth_name, moving_average_code, moving_average_name, IndicatorObservation,
    IndicatorSeries, DIVERSIFICATION_CODE, DIVERSIFICATION_NAME, RESIDUAL_SHARE_CODE,
    RESIDUAL_SHARE_NAME,
};

/// Country columns copied onto every derived row.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CountryLabel {
    pub name: String,
    pub code: String,
}

impl CountryLabel {
    fn row(&self, code: &str, name: &str, year: i32, value: f64) -> IndicatorObservation {
        IndicatorObservation {
            country_name: self.name.clone(),
            country_code: self.code.clone(),
            indicator_code: code.to_string(),
            indicator_name: name.to_string(),
            year,
            value,
        }
    }
}

/// Growth, moving-average and sector-structure rows for the given base series.
pub fn derive_metrics(
    config: &PipelineConfig,
    series: &BTreeMap<String, IndicatorSeries>,
    country: &CountryLabel,
) -> Vec<IndicatorObservation> {
    let mut rows = Vec::new();

    for code in config.growth_codes() {
        if let Some(s) = series.get(code) {
            let (code, name) = (growth_code(&s.code), growth_name(&s.name));
            rows.extend(
                yoy_growth(&s.points)
                    .into_iter()
                    .map(|(year, v)| country.row(&code, &name, year, v)),
            );
        }
    }

    for code in config.moving_average_codes() {
        if let Some(s) = series.get(code) {
            let (code, name) = (moving_average_code(&s.code), moving_average_name(&s.name));
            rows.extend(
                moving_average(&s.points)
                    .into_iter()
                    .map(|(year, v)| country.row(&code, &name, year, v)),
            );
        }
    }

    rows.extend(structure_rows(config, series, country));
    rows
}

/// Residual share and diversification index, one pair per year in which every
/// configured sector share is present.
fn structure_rows(
    config: &PipelineConfig,
    series: &BTreeMap<String, IndicatorSeries>,
    country: &CountryLabel,
) -> Vec<IndicatorObservation> {
    let sectors: Vec<&IndicatorSeries> = config
        .transform
        .sector_shares
        .iter()
        .filter_map(|code| series.get(code))
        .collect();
    if sectors.is_empty() || sectors.len() != config.transform.sector_shares.len() {
        return Vec::new();
    }

    let years: BTreeSet<i32> = sectors
        .iter()
        .flat_map(|s| s.points.iter().map(|(y, _)| *y))
        .collect();

    let mut rows = Vec::new();
    for year in years {
        let Some(shares) = sectors
            .iter()
            .map(|s| s.value_at(year))
            .collect::<Option<Vec<f64>>>()
        else {
            continue;
        };
        let Some(residual) = residual_share(&shares) else {
            tracing::debug!(year, "sector shares exceed 100%, skipping structure metrics");
            continue;
        };
        rows.push(country.row(RESIDUAL_SHARE_CODE, RESIDUAL_SHARE_NAME, year, residual));

        let fractions: Vec<f64> = shares
            .iter()
            .chain(std::iter::once(&residual))
            .map(|s| s / 100.0)
            .collect();
        if let Some(hhi) = herfindahl(&fractions, config.transform.share_tolerance) {
            rows.push(country.row(DIVERSIFICATION_CODE, DIVERSIFICATION_NAME, year, hhi));
        }
    }
    rows
}
