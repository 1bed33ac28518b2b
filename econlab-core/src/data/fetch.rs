//! Batch fetcher: coordinates multi-indicator fetches with retry, pagination
//! and progress reporting.

use std::time::Duration;

use super::provider::{DataError, FetchProgress, FetchResult, IndicatorProvider};
use super::retry::RetryPolicy;
use crate::config::SourceConfig;
use crate::domain::IndicatorDefinition;

/// Upper bound on pages followed for one indicator.
const MAX_PAGES: u32 = 1000;

/// Fetch every indicator in order, isolating failures per indicator.
///
/// Returns the successful results plus the per-indicator errors. A courtesy
/// pause of `request_spacing_ms` separates consecutive indicators.
pub fn fetch_indicators(
    provider: &dyn IndicatorProvider,
    source: &SourceConfig,
    indicators: &[IndicatorDefinition],
    progress: &dyn FetchProgress,
) -> FetchSummary {
    let policy = RetryPolicy::new(source.max_retries, Duration::from_millis(source.retry_delay_ms));
    let spacing = Duration::from_millis(source.request_spacing_ms);
    let total = indicators.len();
    let mut results = Vec::new();
    let mut errors: Vec<(String, DataError)> = Vec::new();

    for (i, indicator) in indicators.iter().enumerate() {
        if i > 0 && !spacing.is_zero() {
            std::thread::sleep(spacing);
        }
        progress.on_start(&indicator.code, i, total);

        let outcome = fetch_single(provider, &policy, indicator);
        progress.on_complete(
            &indicator.code,
            i,
            total,
            outcome.as_ref().map(|r| r.observations.len()),
        );
        match outcome {
            Ok(result) => results.push(result),
            Err(e) => errors.push((indicator.code.clone(), e)),
        }
    }

    progress.on_batch_complete(results.len(), errors.len(), total);

    FetchSummary {
        total,
        results,
        errors,
    }
}

/// Fetch one indicator: first page, then any remaining pages.
fn fetch_single(
    provider: &dyn IndicatorProvider,
    policy: &RetryPolicy,
    indicator: &IndicatorDefinition,
) -> Result<FetchResult, DataError> {
    let first = policy.run(&indicator.code, || provider.fetch_page(indicator, 1))?;
    let pages = first.pages.clamp(1, MAX_PAGES);
    let mut observations = first.observations;
    let mut skipped_nulls = first.skipped_nulls;

    for page in 2..=pages {
        let next = policy.run(&indicator.code, || provider.fetch_page(indicator, page))?;
        observations.extend(next.observations);
        skipped_nulls += next.skipped_nulls;
    }

    tracing::debug!(
        indicator = %indicator.code,
        pages,
        rows = observations.len(),
        skipped_nulls,
        "indicator fetched"
    );

    Ok(FetchResult {
        indicator_code: indicator.code.clone(),
        observations,
        skipped_nulls,
        pages,
    })
}

/// Summary of a batch fetch.
#[derive(Debug)]
pub struct FetchSummary {
    pub total: usize,
    pub results: Vec<FetchResult>,
    pub errors: Vec<(String, DataError)>,
}

impl FetchSummary {
    pub fn succeeded(&self) -> usize {
        self.results.len()
    }

    pub fn failed(&self) -> usize {
        self.errors.len()
    }

    pub fn all_succeeded(&self) -> bool {
        self.errors.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::provider::{NoProgress, Page};
    use crate::domain::IndicatorObservation;
    use std::collections::HashMap;
    use std::sync::Mutex;

    /// Scripted provider: per (code, page) a queue of responses, consumed in order.
    struct ScriptedProvider {
        script: Mutex<HashMap<(String, u32), Vec<Result<Page, DataError>>>>,
        calls: Mutex<Vec<(String, u32)>>,
    }

    impl ScriptedProvider {
        fn new() -> Self {
            Self {
                script: Mutex::new(HashMap::new()),
                calls: Mutex::new(Vec::new()),
            }
        }

        fn push(&self, code: &str, page: u32, response: Result<Page, DataError>) {
            self.script
                .lock()
                .unwrap()
                .entry((code.to_string(), page))
                .or_default()
                .push(response);
        }

        fn calls_for(&self, code: &str) -> usize {
            self.calls.lock().unwrap().iter().filter(|(c, _)| c == code).count()
        }
    }

    impl IndicatorProvider for ScriptedProvider {
        fn name(&self) -> &str {
            "scripted"
        }

        fn fetch_page(&self, indicator: &IndicatorDefinition, page: u32) -> Result<Page, DataError> {
            self.calls.lock().unwrap().push((indicator.code.clone(), page));
            let mut script = self.script.lock().unwrap();
            let queue = script
                .get_mut(&(indicator.code.clone(), page))
                .expect("unscripted request");
            if queue.len() > 1 {
                queue.remove(0)
            } else {
                match &queue[0] {
                    Ok(p) => Ok(p.clone()),
                    Err(_) => queue.remove(0),
                }
            }
        }
    }

    fn page(code: &str, page_no: u32, pages: u32, years: &[i32]) -> Page {
        Page {
            page: page_no,
            pages,
            observations: years
                .iter()
                .map(|&year| IndicatorObservation {
                    country_name: "Bangladesh".into(),
                    country_code: "BGD".into(),
                    indicator_code: code.into(),
                    indicator_name: code.to_lowercase(),
                    year,
                    value: year as f64,
                })
                .collect(),
            skipped_nulls: 0,
        }
    }

    fn source(max_retries: u32) -> SourceConfig {
        SourceConfig {
            country_code: "BGD".into(),
            start_year: 2000,
            end_year: 2023,
            base_url: "http://localhost".into(),
            timeout_secs: 1,
            max_retries,
            retry_delay_ms: 0,
            request_spacing_ms: 0,
            per_page: 100,
        }
    }

    #[test]
    fn failing_indicator_does_not_abort_others() {
        let provider = ScriptedProvider::new();
        provider.push("A", 1, Ok(page("A", 1, 1, &[2000, 2001])));
        provider.push(
            "B",
            1,
            Err(DataError::HttpStatus { status: 404, indicator: "B".into() }),
        );
        provider.push("C", 1, Ok(page("C", 1, 1, &[2000])));

        let indicators = vec![
            IndicatorDefinition::new("A", "a"),
            IndicatorDefinition::new("B", "b"),
            IndicatorDefinition::new("C", "c"),
        ];
        let summary = fetch_indicators(&provider, &source(3), &indicators, &NoProgress);

        assert_eq!(summary.succeeded(), 2);
        assert_eq!(summary.failed(), 1);
        assert_eq!(summary.errors[0].0, "B");
        // Permanent failure: exactly one attempt.
        assert_eq!(provider.calls_for("B"), 1);
    }

    #[test]
    fn transient_failure_is_retried_max_retries_times() {
        let provider = ScriptedProvider::new();
        provider.push("A", 1, Err(DataError::Timeout("t1".into())));
        provider.push("A", 1, Err(DataError::Timeout("t2".into())));
        provider.push("A", 1, Err(DataError::Timeout("t3".into())));
        provider.push("A", 1, Err(DataError::Timeout("t4".into())));
        provider.push("A", 1, Ok(page("A", 1, 1, &[2000])));

        let indicators = vec![IndicatorDefinition::new("A", "a")];
        let summary = fetch_indicators(&provider, &source(3), &indicators, &NoProgress);

        assert_eq!(summary.failed(), 1);
        assert_eq!(provider.calls_for("A"), 4);
    }

    /// Records every completion as (code, rows or error text).
    #[derive(Default)]
    struct RecordingProgress {
        completed: Mutex<Vec<(String, Result<usize, String>)>>,
    }

    impl FetchProgress for RecordingProgress {
        fn on_start(&self, _code: &str, _index: usize, _total: usize) {}

        fn on_complete(
            &self,
            code: &str,
            _index: usize,
            _total: usize,
            result: Result<usize, &DataError>,
        ) {
            self.completed
                .lock()
                .unwrap()
                .push((code.to_string(), result.map_err(|e| e.to_string())));
        }

        fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
    }

    #[test]
    fn progress_sees_each_outcome_once() {
        let provider = ScriptedProvider::new();
        provider.push("A", 1, Ok(page("A", 1, 1, &[2000, 2001])));
        provider.push(
            "B",
            1,
            Err(DataError::HttpStatus { status: 400, indicator: "B".into() }),
        );

        let indicators = vec![IndicatorDefinition::new("A", "a"), IndicatorDefinition::new("B", "b")];
        let progress = RecordingProgress::default();
        let summary = fetch_indicators(&provider, &source(0), &indicators, &progress);

        let completed = progress.completed.lock().unwrap();
        assert_eq!(completed.len(), 2);
        assert_eq!(completed[0], ("A".to_string(), Ok(2)));
        assert_eq!(completed[1].0, "B");
        assert!(completed[1].1.as_ref().unwrap_err().contains("HTTP 400"));
        // The error handed to progress is the same one kept in the summary.
        assert_eq!(summary.errors[0].1.to_string(), *completed[1].1.as_ref().unwrap_err());
    }

    #[test]
    fn follows_remaining_pages() {
        let provider = ScriptedProvider::new();
        provider.push("A", 1, Ok(page("A", 1, 3, &[2000, 2001])));
        provider.push("A", 2, Ok(page("A", 2, 3, &[2002, 2003])));
        provider.push("A", 3, Ok(page("A", 3, 3, &[2004])));

        let indicators = vec![IndicatorDefinition::new("A", "a")];
        let summary = fetch_indicators(&provider, &source(0), &indicators, &NoProgress);

        assert!(summary.all_succeeded());
        let result = &summary.results[0];
        assert_eq!(result.pages, 3);
        assert_eq!(result.observations.len(), 5);
    }
}
