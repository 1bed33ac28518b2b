/// Trailing window length, in years.
pub const WINDOW: usize = 3;

/// Trailing 3-year mean for every year whose two preceding calendar years are
/// present. `points` must be sorted by year ascending.
pub fn moving_average(points: &[(i32, f64)]) -> Vec<(i32, f64)> {
    points
        .windows(WINDOW)
        .filter_map(|w| {
            let consecutive = w.windows(2).all(|p| p[1].0 == p[0].0 + 1);
            consecutive.then(|| {
                let sum: f64 = w.iter().map(|(_, v)| v).sum();
                (w[WINDOW - 1].0, sum / WINDOW as f64)
            })
        })
        .collect()
}
