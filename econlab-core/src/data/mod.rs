//! Indicator fetching and raw-file ingest

pub mod fetch;
pub mod ingest;
pub mod provider;
pub mod retry;
pub mod validate;
pub mod worldbank;

pub use fetch::{fetch_indicators, FetchSummary};
pub use ingest::{run_ingest, IngestReport};
pub use provider::{
    DataError, FetchProgress, FetchResult, IndicatorProvider, LogProgress, NoProgress, Page,
};
pub use retry::RetryPolicy;
pub use validate::validate_observations;
pub use worldbank::{parse_page, WorldBankProvider};
