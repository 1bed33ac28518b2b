//! Indicator provider trait and structured error types.
//!
//! The IndicatorProvider trait abstracts over the observation source (the World
//! Bank API in production) so the batch fetcher can be exercised with mocks.
//! A provider performs exactly one request per call; retry and pagination are
//! handled above it in `fetch`.

use thiserror::Error;

use crate::domain::{IndicatorDefinition, IndicatorObservation};

/// Structured error types for fetch and ingest operations.
#[derive(Debug, Error)]
pub enum DataError {
    #[error("network unreachable: {0}")]
    NetworkUnreachable(String),

    #[error("request timed out: {0}")]
    Timeout(String),

    #[error("rate limited by provider (HTTP 429) for {indicator}")]
    RateLimited { indicator: String },

    #[error("HTTP {status} for {indicator}")]
    HttpStatus { status: u16, indicator: String },

    #[error("provider returned an error for {indicator}: {message}")]
    ProviderMessage { indicator: String, message: String },

    #[error("response format changed: {0}")]
    ResponseFormatChanged(String),

    #[error("no indicators could be fetched ({failed} failed)")]
    NothingFetched { failed: usize },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("failed to write {path}: {source}")]
    Csv {
        path: String,
        #[source]
        source: csv::Error,
    },

    #[error("data error: {0}")]
    Other(String),
}

impl DataError {
    /// Whether the failure may succeed on a repeated attempt.
    ///
    /// Connection failures, timeouts, HTTP 429 and HTTP 5xx are transient.
    /// Everything else (4xx, provider error payloads, malformed JSON) is not.
    pub fn is_transient(&self) -> bool {
        match self {
            DataError::NetworkUnreachable(_) | DataError::Timeout(_) => true,
            DataError::RateLimited { .. } => true,
            DataError::HttpStatus { status, .. } => (500..600).contains(status),
            _ => false,
        }
    }
}

/// One page of parsed provider output.
#[derive(Debug, Clone, PartialEq)]
pub struct Page {
    /// 1-based page number as reported by the provider.
    pub page: u32,
    /// Total page count as reported by the provider.
    pub pages: u32,
    pub observations: Vec<IndicatorObservation>,
    /// Entries returned with a null value and dropped during parsing.
    pub skipped_nulls: usize,
}

/// Every page of one indicator, merged.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchResult {
    pub indicator_code: String,
    pub observations: Vec<IndicatorObservation>,
    pub skipped_nulls: usize,
    pub pages: u32,
}

/// Trait for observation providers.
pub trait IndicatorProvider: Send + Sync {
    /// Human-readable name of this provider.
    fn name(&self) -> &str;

    /// Fetch a single page (1-based) of observations for one indicator.
    ///
    /// Implementations make one attempt and classify failures so the caller
    /// can decide whether to retry.
    fn fetch_page(&self, indicator: &IndicatorDefinition, page: u32) -> Result<Page, DataError>;
}

/// Progress callback for multi-indicator fetches.
pub trait FetchProgress: Send {
    /// Called when starting to fetch an indicator.
    fn on_start(&self, code: &str, index: usize, total: usize);

    /// Called when an indicator fetch completes.
    fn on_complete(
        &self,
        code: &str,
        index: usize,
        total: usize,
        result: Result<usize, &DataError>,
    );

    /// Called when the entire batch is done.
    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize);
}

/// Progress reporter that emits `tracing` events.
pub struct LogProgress;

impl FetchProgress for LogProgress {
    fn on_start(&self, code: &str, index: usize, total: usize) {
        tracing::info!(indicator = code, "[{}/{}] fetching", index + 1, total);
    }

    fn on_complete(
        &self,
        code: &str,
        _index: usize,
        _total: usize,
        result: Result<usize, &DataError>,
    ) {
        match result {
            Ok(rows) => tracing::info!(indicator = code, rows, "fetched"),
            Err(e) => tracing::warn!(indicator = code, error = %e, "fetch failed"),
        }
    }

    fn on_batch_complete(&self, succeeded: usize, failed: usize, total: usize) {
        tracing::info!(succeeded, failed, total, "fetch batch complete");
    }
}

/// Progress reporter that does nothing.
pub struct NoProgress;

impl FetchProgress for NoProgress {
    fn on_start(&self, _code: &str, _index: usize, _total: usize) {}

    fn on_complete(
        &self,
        _code: &str,
        _index: usize,
        _total: usize,
        _result: Result<usize, &DataError>,
    ) {
    }

    fn on_batch_complete(&self, _succeeded: usize, _failed: usize, _total: usize) {}
}
