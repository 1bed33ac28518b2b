//! IndicatorObservation: the fundamental data unit of the pipeline.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// One value of one indicator for one country in one year (long format row).
///
/// Field order is the CSV column order of the raw and long-format files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorObservation {
    pub country_name: String,
    pub country_code: String,
    pub indicator_code: String,
    pub indicator_name: String,
    pub year: i32,
    pub value: f64,
}

impl IndicatorObservation {
    /// Column names of the raw and long-format files.
    pub const CSV_HEADER: [&'static str; 6] = [
        "country_name",
        "country_code",
        "indicator_code",
        "indicator_name",
        "year",
        "value",
    ];
}

/// A single indicator's values ordered by year ascending.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorSeries {
    pub code: String,
    pub name: String,
    pub points: Vec<(i32, f64)>,
}

impl IndicatorSeries {
    pub fn first_year(&self) -> Option<i32> {
        self.points.first().map(|(y, _)| *y)
    }

    pub fn last_year(&self) -> Option<i32> {
        self.points.last().map(|(y, _)| *y)
    }

    /// Value for a given year, if observed.
    pub fn value_at(&self, year: i32) -> Option<f64> {
        self.points
            .binary_search_by_key(&year, |(y, _)| *y)
            .ok()
            .map(|i| self.points[i].1)
    }
}

/// Group observations into per-indicator series keyed by indicator code.
///
/// Points are sorted by year. If the same (indicator, year) appears twice the
/// first occurrence wins, matching the cleaning rule.
pub fn group_series(observations: &[IndicatorObservation]) -> BTreeMap<String, IndicatorSeries> {
    let mut out: BTreeMap<String, IndicatorSeries> = BTreeMap::new();
    for obs in observations {
        let series = out
            .entry(obs.indicator_code.clone())
            .or_insert_with(|| IndicatorSeries {
                code: obs.indicator_code.clone(),
                name: obs.indicator_name.clone(),
                points: Vec::new(),
            });
        series.points.push((obs.year, obs.value));
    }
    for series in out.values_mut() {
        // Stable sort keeps first occurrence ahead of later duplicates.
        series.points.sort_by_key(|(y, _)| *y);
        series.points.dedup_by_key(|(y, _)| *y);
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn obs(code: &str, year: i32, value: f64) -> IndicatorObservation {
        IndicatorObservation {
            country_name: "Bangladesh".into(),
            country_code: "BGD".into(),
            indicator_code: code.into(),
            indicator_name: code.to_lowercase(),
            year,
            value,
        }
    }

    #[test]
    fn group_series_sorts_by_year() {
        let rows = vec![obs("A", 2002, 3.0), obs("A", 2000, 1.0), obs("B", 2001, 9.0), obs("A", 2001, 2.0)];
        let series = group_series(&rows);

        assert_eq!(series.len(), 2);
        assert_eq!(series["A"].points, vec![(2000, 1.0), (2001, 2.0), (2002, 3.0)]);
        assert_eq!(series["B"].first_year(), Some(2001));
        assert_eq!(series["A"].last_year(), Some(2002));
    }

    #[test]
    fn group_series_keeps_first_duplicate() {
        let rows = vec![obs("A", 2000, 1.0), obs("A", 2000, 5.0)];
        let series = group_series(&rows);
        assert_eq!(series["A"].points, vec![(2000, 1.0)]);
    }

    #[test]
    fn value_at_looks_up_year() {
        let series = IndicatorSeries {
            code: "A".into(),
            name: "a".into(),
            points: vec![(2000, 1.0), (2003, 4.0)],
        };
        assert_eq!(series.value_at(2003), Some(4.0));
        assert_eq!(series.value_at(2001), None);
    }
}
