//! Year-over-year growth, as a fraction.

/// Growth for every year whose previous calendar year is present with a
/// nonzero value. `points` must be sorted by year ascending.
pub fn yoy_growth(points: &[(i32, f64)]) -> Vec<(i32, f64)> {
    points
        .windows(2)
        .filter_map(|w| {
            let (prev_year, prev) = w[0];
            let (year, value) = w[1];
            (year == prev_year + 1 && prev != 0.0).then(|| (year, (value - prev) / prev))
        })
        .collect()
}
