//! Domain types for econlab

pub mod catalog;
pub mod observation;

pub use catalog::{
    derived_kind, growth_code, growth_name, moving_average_code, moving_average_name,
    DerivedKind, IndicatorCatalog, IndicatorDefinition, DIVERSIFICATION_CODE,
    DIVERSIFICATION_NAME, RESIDUAL_SHARE_CODE, RESIDUAL_SHARE_NAME,
};
pub use observation::{group_series, IndicatorObservation, IndicatorSeries};
