//! econlab core: configuration, domain types, indicator fetching and the
//! transform stage.
//!
//! This crate owns everything up to the processed files:
//! - Pipeline configuration loaded from TOML
//! - Observation and indicator-catalog domain types
//! - World Bank fetcher with fixed retry and pagination
//! - Cleaning, derived metrics, long/wide reshaping and summary statistics

pub mod config;
pub mod data;
pub mod domain;
pub mod io;
pub mod transform;
