//! World Bank v2 indicator API provider.
//!
//! Responses are a two-element JSON array: page metadata followed by the
//! entries (or `null` when the range holds no data). Invalid requests come back
//! with HTTP 200 and a single `{"message": [...]}` element instead.

use std::time::Duration;

use serde::{Deserialize, Deserializer};

use super::provider::{DataError, IndicatorProvider, Page};
use crate::config::SourceConfig;
use crate::domain::{IndicatorDefinition, IndicatorObservation};

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Header {
    Error { message: Vec<ApiMessage> },
    Meta(PageMeta),
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    id: String,
    #[serde(default)]
    key: String,
    #[serde(default)]
    value: String,
}

/// The API has served these as both numbers and strings over time.
#[derive(Debug, Deserialize)]
struct PageMeta {
    #[serde(deserialize_with = "number_or_string")]
    page: u32,
    #[serde(deserialize_with = "number_or_string")]
    pages: u32,
}

#[derive(Debug, Deserialize)]
struct ApiEntry {
    country: IdValue,
    #[serde(default)]
    countryiso3code: String,
    date: String,
    value: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct IdValue {
    #[serde(default)]
    value: String,
}

fn number_or_string<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Number(u32),
        Text(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Number(n) => Ok(n),
        Raw::Text(s) => s.trim().parse().map_err(serde::de::Error::custom),
    }
}

/// World Bank indicator provider.
pub struct WorldBankProvider {
    client: reqwest::blocking::Client,
    base_url: String,
    country_code: String,
    start_year: i32,
    end_year: i32,
    per_page: u32,
}

impl WorldBankProvider {
    pub fn new(source: &SourceConfig) -> Result<Self, DataError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(source.timeout_secs))
            .user_agent(concat!("econlab/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| DataError::Other(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: source.base_url.trim_end_matches('/').to_string(),
            country_code: source.country_code.clone(),
            start_year: source.start_year,
            end_year: source.end_year,
            per_page: source.per_page,
        })
    }

    fn indicator_url(&self, code: &str) -> String {
        format!(
            "{}/country/{}/indicator/{}",
            self.base_url, self.country_code, code
        )
    }

    fn classify(indicator: &str, e: reqwest::Error) -> DataError {
        if e.is_timeout() {
            DataError::Timeout(format!("{indicator}: {e}"))
        } else if e.is_connect() {
            DataError::NetworkUnreachable(format!("{indicator}: {e}"))
        } else {
            DataError::Other(format!("{indicator}: {e}"))
        }
    }
}

impl IndicatorProvider for WorldBankProvider {
    fn name(&self) -> &str {
        "world_bank"
    }

    fn fetch_page(&self, indicator: &IndicatorDefinition, page: u32) -> Result<Page, DataError> {
        let date = format!("{}:{}", self.start_year, self.end_year);
        let per_page = self.per_page.to_string();
        let page_param = page.to_string();

        let resp = self
            .client
            .get(self.indicator_url(&indicator.code))
            .query(&[
                ("format", "json"),
                ("date", date.as_str()),
                ("per_page", per_page.as_str()),
                ("page", page_param.as_str()),
            ])
            .send()
            .map_err(|e| Self::classify(&indicator.code, e))?;

        let status = resp.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(DataError::RateLimited {
                indicator: indicator.code.clone(),
            });
        }
        if !status.is_success() {
            return Err(DataError::HttpStatus {
                status: status.as_u16(),
                indicator: indicator.code.clone(),
            });
        }

        let body = resp.text().map_err(|e| Self::classify(&indicator.code, e))?;
        parse_page(indicator, &self.country_code, &body)
    }
}

/// Parse one response body into a page of observations.
///
/// Entries with a null value are skipped and counted. `country_code` fills in
/// for entries whose ISO3 code is blank.
pub fn parse_page(
    indicator: &IndicatorDefinition,
    country_code: &str,
    body: &str,
) -> Result<Page, DataError> {
    let malformed = |detail: String| {
        DataError::ResponseFormatChanged(format!("{}: {detail}", indicator.code))
    };

    let mut parts: Vec<serde_json::Value> =
        serde_json::from_str(body).map_err(|e| malformed(format!("invalid JSON: {e}")))?;
    if parts.is_empty() {
        return Err(malformed("empty response array".into()));
    }

    let header: Header = serde_json::from_value(parts[0].take())
        .map_err(|e| malformed(format!("unrecognised metadata: {e}")))?;
    let meta = match header {
        Header::Error { message } => {
            let message = message
                .iter()
                .map(|m| format!("{} {}: {}", m.id, m.key, m.value).trim().to_string())
                .collect::<Vec<_>>()
                .join("; ");
            return Err(DataError::ProviderMessage {
                indicator: indicator.code.clone(),
                message,
            });
        }
        Header::Meta(meta) => meta,
    };

    let entries: Option<Vec<ApiEntry>> = match parts.get_mut(1) {
        Some(value) => serde_json::from_value(value.take())
            .map_err(|e| malformed(format!("unrecognised entries: {e}")))?,
        None => None,
    };

    let mut observations = Vec::new();
    let mut skipped_nulls = 0;
    for entry in entries.unwrap_or_default() {
        let Some(value) = entry.value else {
            skipped_nulls += 1;
            continue;
        };
        let year: i32 = entry
            .date
            .trim()
            .parse()
            .map_err(|_| malformed(format!("non-numeric date '{}'", entry.date)))?;
        let country_code = if entry.countryiso3code.is_empty() {
            country_code.to_string()
        } else {
            entry.countryiso3code
        };
        observations.push(IndicatorObservation {
            country_name: entry.country.value,
            country_code,
            indicator_code: indicator.code.clone(),
            indicator_name: indicator.name.clone(),
            year,
            value,
        });
    }

    Ok(Page {
        page: meta.page,
        pages: meta.pages,
        observations,
        skipped_nulls,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gdp() -> IndicatorDefinition {
        IndicatorDefinition::new("NY.GDP.PCAP.KD", "gdp_per_capita")
    }

    #[test]
    fn parses_entries_and_skips_nulls() {
        let body = r#"[
            {"page":1,"pages":1,"per_page":100,"total":3,"sourceid":"2","lastupdated":"2024-06-28"},
            [
                {"indicator":{"id":"NY.GDP.PCAP.KD","value":"GDP per capita (constant 2015 US$)"},
                 "country":{"id":"BD","value":"Bangladesh"},"countryiso3code":"BGD",
                 "date":"2001","value":487.0,"unit":"","obs_status":"","decimal":0},
                {"indicator":{"id":"NY.GDP.PCAP.KD","value":"GDP per capita (constant 2015 US$)"},
                 "country":{"id":"BD","value":"Bangladesh"},"countryiso3code":"BGD",
                 "date":"2000","value":459.0,"unit":"","obs_status":"","decimal":0},
                {"indicator":{"id":"NY.GDP.PCAP.KD","value":"GDP per capita (constant 2015 US$)"},
                 "country":{"id":"BD","value":"Bangladesh"},"countryiso3code":"BGD",
                 "date":"2023","value":null,"unit":"","obs_status":"","decimal":0}
            ]
        ]"#;

        let page = parse_page(&gdp(), "BGD", body).unwrap();

        assert_eq!(page.pages, 1);
        assert_eq!(page.observations.len(), 2);
        assert_eq!(page.skipped_nulls, 1);
        let first = &page.observations[0];
        assert_eq!(first.country_name, "Bangladesh");
        assert_eq!(first.indicator_name, "gdp_per_capita");
        assert_eq!(first.year, 2001);
        assert_eq!(first.value, 487.0);
    }

    #[test]
    fn string_metadata_and_null_entries() {
        let body = r#"[{"page":"1","pages":"0","per_page":"100","total":0}, null]"#;
        let page = parse_page(&gdp(), "BGD", body).unwrap();
        assert_eq!(page.pages, 0);
        assert!(page.observations.is_empty());
    }

    #[test]
    fn provider_message_is_reported() {
        let body = r#"[{"message":[{"id":"120","key":"Invalid value","value":"The provided parameter value is not valid"}]}]"#;
        let err = parse_page(&gdp(), "BGD", body).unwrap_err();
        assert!(matches!(err, DataError::ProviderMessage { .. }));
        assert!(!err.is_transient());
        assert!(err.to_string().contains("Invalid value"));
    }

    #[test]
    fn malformed_json_is_permanent() {
        let err = parse_page(&gdp(), "BGD", "<html>gateway</html>").unwrap_err();
        assert!(matches!(err, DataError::ResponseFormatChanged(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn blank_iso3_falls_back_to_configured_country() {
        let body = r#"[{"page":1,"pages":1},
            [{"country":{"value":"Bangladesh"},"countryiso3code":"","date":"2010","value":1.5}]]"#;
        let page = parse_page(&gdp(), "BGD", body).unwrap();
        assert_eq!(page.observations[0].country_code, "BGD");
    }
}
