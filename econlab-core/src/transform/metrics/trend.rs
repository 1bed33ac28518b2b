//! Ordinary least-squares linear trend.

use serde::{Deserialize, Serialize};

/// `value ≈ intercept + slope * (year - first_year)`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct TrendFit {
    pub slope: f64,
    pub intercept: f64,
}

/// Fit a trend over the whole series, or `None` with fewer than `min_points`
/// points or when every point falls in the same year.
pub fn fit_trend(points: &[(i32, f64)], min_points: usize) -> Option<TrendFit> {
    if points.len() < min_points.max(2) {
        return None;
    }
    let first_year = points.iter().map(|(y, _)| *y).min()?;
    let n = points.len() as f64;
    let xs = points.iter().map(|(y, _)| f64::from(y - first_year));

    let mean_x = xs.clone().sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, v)| v).sum::<f64>() / n;

    let (sxy, sxx) = xs
        .zip(points.iter().map(|(_, v)| *v))
        .fold((0.0, 0.0), |(sxy, sxx), (x, y)| {
            let dx = x - mean_x;
            (sxy + dx * (y - mean_y), sxx + dx * dx)
        });

    if sxx == 0.0 {
        return None;
    }
    let slope = sxy / sxx;
    Some(TrendFit {
        slope,
        intercept: mean_y - slope * mean_x,
    })
}
