//! Indicator definitions and the derived-indicator catalog.
//!
//! Base indicators come from configuration. Every derived metric the
//! transformer emits gets its own code and name here, so the long file, the
//! wide file and the warehouse dimension table all agree on naming.

use serde::{Deserialize, Serialize};

/// Suffix appended to a base code for its year-over-year growth series.
pub const GROWTH_SUFFIX: &str = ".YOY";
/// Suffix appended to a base code for its 3-year moving average series.
pub const MOVING_AVERAGE_SUFFIX: &str = ".MA3";

pub const RESIDUAL_SHARE_CODE: &str = "CALC.SERVICES.PCT.EST";
pub const RESIDUAL_SHARE_NAME: &str = "services_pct_gdp_estimated";
pub const DIVERSIFICATION_CODE: &str = "CALC.ECON.DIV.IDX";
pub const DIVERSIFICATION_NAME: &str = "economic_diversification_index";

/// Descriptive metadata for one indicator (dimension row).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorDefinition {
    /// Provider code, e.g. `NY.GDP.PCAP.KD`.
    pub code: String,
    /// Short snake_case name used as the wide-format column header.
    pub name: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub unit: String,
    #[serde(default)]
    pub description: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub derived: bool,
}

impl IndicatorDefinition {
    pub fn new(code: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            name: name.into(),
            category: String::new(),
            unit: String::new(),
            description: String::new(),
            derived: false,
        }
    }

    fn label(&self) -> &str {
        if self.description.is_empty() {
            &self.name
        } else {
            &self.description
        }
    }
}

/// Kind of a derived indicator, recovered from its code.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DerivedKind {
    Growth,
    MovingAverage,
    ResidualShare,
    Diversification,
}

pub fn growth_code(base_code: &str) -> String {
    format!("{base_code}{GROWTH_SUFFIX}")
}

pub fn growth_name(base_name: &str) -> String {
    format!("{base_name}_yoy_growth")
}

pub fn moving_average_code(base_code: &str) -> String {
    format!("{base_code}{MOVING_AVERAGE_SUFFIX}")
}

pub fn moving_average_name(base_name: &str) -> String {
    format!("{base_name}_ma3")
}

/// Classify a code as derived, or `None` for a base (provider) indicator.
pub fn derived_kind(code: &str) -> Option<DerivedKind> {
    if code == RESIDUAL_SHARE_CODE {
        Some(DerivedKind::ResidualShare)
    } else if code == DIVERSIFICATION_CODE {
        Some(DerivedKind::Diversification)
    } else if code.ends_with(GROWTH_SUFFIX) {
        Some(DerivedKind::Growth)
    } else if code.ends_with(MOVING_AVERAGE_SUFFIX) {
        Some(DerivedKind::MovingAverage)
    } else {
        None
    }
}

/// Base definitions plus every derived definition they imply.
///
/// Ordering is stable: base indicators in configuration order, then growth
/// series, then moving averages, then the sector-structure metrics. Wide-format
/// columns follow this order.
#[derive(Debug, Clone, PartialEq)]
pub struct IndicatorCatalog {
    definitions: Vec<IndicatorDefinition>,
}

impl IndicatorCatalog {
    pub fn new(base: &[IndicatorDefinition]) -> Self {
        let mut definitions: Vec<IndicatorDefinition> = base.to_vec();

        for def in base {
            definitions.push(IndicatorDefinition {
                code: growth_code(&def.code),
                name: growth_name(&def.name),
                category: "Derived".into(),
                unit: "Fraction".into(),
                description: format!("Year-over-year growth of {}", def.label()),
                derived: true,
            });
        }
        for def in base {
            definitions.push(IndicatorDefinition {
                code: moving_average_code(&def.code),
                name: moving_average_name(&def.name),
                category: "Derived".into(),
                unit: def.unit.clone(),
                description: format!("3-year moving average of {}", def.label()),
                derived: true,
            });
        }
        definitions.push(IndicatorDefinition {
            code: RESIDUAL_SHARE_CODE.into(),
            name: RESIDUAL_SHARE_NAME.into(),
            category: "Economic Structure".into(),
            unit: "Percent".into(),
            description: "Residual sector share of GDP (100 minus configured sector shares)".into(),
            derived: true,
        });
        definitions.push(IndicatorDefinition {
            code: DIVERSIFICATION_CODE.into(),
            name: DIVERSIFICATION_NAME.into(),
            category: "Economic Structure".into(),
            unit: "Index".into(),
            description: "Herfindahl-Hirschman concentration of sector shares (lower = more diversified)"
                .into(),
            derived: true,
        });

        Self { definitions }
    }

    pub fn definitions(&self) -> &[IndicatorDefinition] {
        &self.definitions
    }

    pub fn get(&self, code: &str) -> Option<&IndicatorDefinition> {
        self.definitions.iter().find(|d| d.code == code)
    }

    pub fn by_name(&self, name: &str) -> Option<&IndicatorDefinition> {
        self.definitions.iter().find(|d| d.name == name)
    }

    /// Position of a code in catalog order (used to order wide columns).
    pub fn position(&self, code: &str) -> Option<usize> {
        self.definitions.iter().position(|d| d.code == code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base() -> Vec<IndicatorDefinition> {
        vec![
            IndicatorDefinition::new("NY.GDP.PCAP.KD", "gdp_per_capita"),
            IndicatorDefinition::new("SP.POP.TOTL", "population"),
        ]
    }

    #[test]
    fn catalog_derives_growth_and_moving_average() {
        let catalog = IndicatorCatalog::new(&base());

        // 2 base + 2 growth + 2 ma + residual + diversification
        assert_eq!(catalog.definitions().len(), 8);
        let growth = catalog.get("NY.GDP.PCAP.KD.YOY").unwrap();
        assert_eq!(growth.name, "gdp_per_capita_yoy_growth");
        assert!(growth.derived);
        assert_eq!(catalog.by_name("population_ma3").unwrap().code, "SP.POP.TOTL.MA3");
    }

    #[test]
    fn base_codes_come_first() {
        let catalog = IndicatorCatalog::new(&base());
        assert_eq!(catalog.position("NY.GDP.PCAP.KD"), Some(0));
        assert_eq!(catalog.position("SP.POP.TOTL"), Some(1));
        assert!(catalog.position(DIVERSIFICATION_CODE).unwrap() > 1);
    }

    #[test]
    fn derived_kind_classifies_codes() {
        assert_eq!(derived_kind("NY.GDP.PCAP.KD"), None);
        assert_eq!(derived_kind("NY.GDP.PCAP.KD.YOY"), Some(DerivedKind::Growth));
        assert_eq!(derived_kind("SP.POP.TOTL.MA3"), Some(DerivedKind::MovingAverage));
        assert_eq!(derived_kind(RESIDUAL_SHARE_CODE), Some(DerivedKind::ResidualShare));
        assert_eq!(derived_kind(DIVERSIFICATION_CODE), Some(DerivedKind::Diversification));
    }
}
