//! Per-indicator summary statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::metrics::fit_trend;
use crate::domain::IndicatorSeries;

/// One row of the summary file. Field order is the CSV column order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorSummary {
    pub indicator_code: String,
    pub indicator_name: String,
    pub count: usize,
    pub min_year: i32,
    pub max_year: i32,
    pub mean: f64,
    /// Sample standard deviation; undefined for a single point.
    pub std: Option<f64>,
    pub min: f64,
    pub max: f64,
    pub trend_slope: Option<f64>,
    pub trend_intercept: Option<f64>,
}

impl IndicatorSummary {
    /// Column names of the summary file.
    pub const CSV_HEADER: [&'static str; 11] = [
        "indicator_code",
        "indicator_name",
        "count",
        "min_year",
        "max_year",
        "mean",
        "std",
        "min",
        "max",
        "trend_slope",
        "trend_intercept",
    ];
}

/// Summarize one series, or `None` if it has no points.
pub fn summarize_series(series: &IndicatorSeries, trend_min_points: usize) -> Option<IndicatorSummary> {
    let first_year = series.first_year()?;
    let last_year = series.last_year()?;
    let values: Vec<f64> = series.points.iter().map(|(_, v)| *v).collect();
    let n = values.len();

    let mean = values.iter().sum::<f64>() / n as f64;
    let std = (n > 1).then(|| {
        let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
        (ss / (n - 1) as f64).sqrt()
    });
    let min = values.iter().copied().fold(f64::INFINITY, f64::min);
    let max = values.iter().copied().fold(f64::NEG_INFINITY, f64::max);
    let trend = fit_trend(&series.points, trend_min_points);

    Some(IndicatorSummary {
        indicator_code: series.code.clone(),
        indicator_name: series.name.clone(),
        count: n,
        min_year: first_year,
        max_year: last_year,
        mean,
        std,
        min,
        max,
        trend_slope: trend.map(|t| t.slope),
        trend_intercept: trend.map(|t| t.intercept),
    })
}

/// Summaries for every series, ordered by indicator code.
pub fn summarize(
    series: &BTreeMap<String, IndicatorSeries>,
    trend_min_points: usize,
) -> Vec<IndicatorSummary> {
    series
        .values()
        .filter_map(|s| summarize_series(s, trend_min_points))
        .collect()
}
