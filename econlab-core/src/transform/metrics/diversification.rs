//! Sector structure: residual share and Herfindahl–Hirschman concentration.

/// `100 - Σ shares` for shares given in percent of GDP, or `None` when the
/// configured shares already exceed 100.
pub fn residual_share(shares_pct: &[f64]) -> Option<f64> {
    let residual = 100.0 - shares_pct.iter().sum::<f64>();
    (residual >= 0.0).then_some(residual)
}

/// Sum of squared shares, with shares as fractions of 1.
///
/// Undefined when any share lies outside [0, 1] or the shares do not sum to 1
/// within `tolerance`. Ranges from `1/n` (equal shares) to 1 (one sector).
pub fn herfindahl(fractions: &[f64], tolerance: f64) -> Option<f64> {
    if fractions.is_empty() || fractions.iter().any(|s| !(0.0..=1.0).contains(s)) {
        return None;
    }
    let total: f64 = fractions.iter().sum();
    if (total - 1.0).abs() > tolerance {
        return None;
    }
    Some(fractions.iter().map(|s| s * s).sum())
}
