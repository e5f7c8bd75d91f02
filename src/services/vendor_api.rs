//! Structured-API strategy: vendor JSON status feeds.
//!
//! Two feed shapes are supported:
//!
//! ```text
//! CVS  responsePayloadData.data.<STATE>[] { "city": "...", "status": "Fully Booked" }
//! HEB  locations[]                        { "city": "...", "openTimeslots": 0 }
//! ```

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value;

use crate::error::QueryError;
use crate::models::{ProviderConfig, Strategy, StrategyKind, VendorConfig};
use crate::services::{QueryStrategy, RawResult};
use crate::utils::http::fetch_text;

/// CVS status meaning no appointments are left.
pub const CVS_FULLY_BOOKED: &str = "Fully Booked";

/// HEB `openTimeslots` value meaning no appointments are left.
pub const HEB_NO_SLOTS: &str = "0";

/// Result of looking a location up in a vendor feed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ApiLookup {
    /// Status value of every record matching the location
    Found(Vec<String>),
    /// Expected key path or location absent
    Missing(String),
}

fn status_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Open-slot count as text; any zero (`0`, `0.0`, `"0"`) or `null` means none.
fn slot_text(value: &Value) -> String {
    let none = match value {
        Value::Null => true,
        Value::Number(n) => n.as_f64() == Some(0.0),
        Value::String(s) => s.trim().parse::<f64>().ok() == Some(0.0),
        _ => false,
    };
    if none {
        HEB_NO_SLOTS.to_string()
    } else {
        status_text(value)
    }
}

/// Find the CVS status for a city within a state.
pub fn lookup_cvs(payload: &Value, state: &str, city: &str) -> ApiLookup {
    let Some(records) = payload
        .pointer("/responsePayloadData/data")
        .and_then(|data| data.get(state))
        .and_then(Value::as_array)
    else {
        return ApiLookup::Missing(format!("responsePayloadData.data.{state} not present"));
    };

    let statuses: Vec<String> = records
        .iter()
        .filter(|r| r.get("city").and_then(Value::as_str) == Some(city))
        .filter_map(|r| r.get("status"))
        .map(status_text)
        .collect();

    if statuses.is_empty() {
        ApiLookup::Missing(format!("no status for city {city} in {state}"))
    } else {
        ApiLookup::Found(statuses)
    }
}

/// Find the open-slot counts of every HEB store in a city.
pub fn lookup_heb(payload: &Value, city: &str) -> ApiLookup {
    let Some(records) = payload.get("locations").and_then(Value::as_array) else {
        return ApiLookup::Missing("locations not present".into());
    };

    let statuses: Vec<String> = records
        .iter()
        .filter(|r| r.get("city").and_then(Value::as_str) == Some(city))
        .filter_map(|r| r.get("openTimeslots"))
        .map(slot_text)
        .collect();

    if statuses.is_empty() {
        ApiLookup::Missing(format!("no store in city {city}"))
    } else {
        ApiLookup::Found(statuses)
    }
}

/// Queries vendor JSON feeds.
pub struct VendorApi {
    client: Client,
    endpoints: VendorConfig,
}

impl VendorApi {
    pub fn new(client: Client, endpoints: VendorConfig) -> Self {
        Self { client, endpoints }
    }

    async fn fetch_json(&self, url: &str) -> Result<Value, QueryError> {
        let body = fetch_text(&self.client, url).await?;
        serde_json::from_str(&body)
            .map_err(|e| QueryError::Classification(format!("{url} returned invalid JSON: {e}")))
    }
}

#[async_trait]
impl QueryStrategy for VendorApi {
    fn handles(&self, kind: StrategyKind) -> bool {
        matches!(kind, StrategyKind::Cvs | StrategyKind::Heb)
    }

    async fn execute(&mut self, provider: &ProviderConfig) -> Result<RawResult, QueryError> {
        let lookup = match &provider.strategy {
            Strategy::Cvs { state, city } => {
                let payload = self.fetch_json(&self.endpoints.cvs_url(state)).await?;
                lookup_cvs(&payload, state, city)
            }
            Strategy::Heb { city } => {
                let payload = self.fetch_json(&self.endpoints.heb_url).await?;
                lookup_heb(&payload, city)
            }
            _ => {
                return Err(QueryError::Classification(format!(
                    "{} is not a structured-API provider",
                    provider.name
                )));
            }
        };

        if let ApiLookup::Missing(reason) = &lookup {
            log::warn!("{}: {}", provider.name, reason);
        }
        Ok(RawResult::Api(lookup))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn cvs_payload() -> Value {
        json!({
            "responsePayloadData": {
                "currentTime": "2021-03-05T14:15:07.000",
                "data": {
                    "TX": [
                        {"city": "SAN ANTONIO", "state": "TX", "status": "Fully Booked"},
                        {"city": "AUSTIN", "state": "TX", "status": "Available"}
                    ]
                }
            }
        })
    }

    #[test]
    fn test_cvs_lookup_found() {
        let payload = cvs_payload();
        assert_eq!(
            lookup_cvs(&payload, "TX", "SAN ANTONIO"),
            ApiLookup::Found(vec![CVS_FULLY_BOOKED.to_string()])
        );
        assert_eq!(
            lookup_cvs(&payload, "TX", "AUSTIN"),
            ApiLookup::Found(vec!["Available".to_string()])
        );
    }

    #[test]
    fn test_cvs_lookup_missing() {
        let payload = cvs_payload();
        assert!(matches!(
            lookup_cvs(&payload, "TX", "san antonio"),
            ApiLookup::Missing(_)
        ));
        assert!(matches!(
            lookup_cvs(&payload, "CA", "SAN ANTONIO"),
            ApiLookup::Missing(_)
        ));
        assert!(matches!(
            lookup_cvs(&json!({"unexpected": true}), "TX", "AUSTIN"),
            ApiLookup::Missing(_)
        ));
    }

    #[test]
    fn test_heb_lookup_collects_every_store() {
        let payload = json!({
            "locations": [
                {"city": "SAN ANTONIO", "name": "H-E-B 1", "openTimeslots": 0},
                {"city": "SAN ANTONIO", "name": "H-E-B 2", "openTimeslots": 12},
                {"city": "AUSTIN", "name": "H-E-B 3", "openTimeslots": 0}
            ]
        });
        assert_eq!(
            lookup_heb(&payload, "SAN ANTONIO"),
            ApiLookup::Found(vec!["0".to_string(), "12".to_string()])
        );
        assert!(matches!(lookup_heb(&payload, "WACO"), ApiLookup::Missing(_)));
        assert!(matches!(lookup_heb(&json!([]), "WACO"), ApiLookup::Missing(_)));
    }

    #[test]
    fn test_heb_zero_in_any_form_means_no_slots() {
        let payload = json!({
            "locations": [
                {"city": "WACO", "openTimeslots": 0.0},
                {"city": "WACO", "openTimeslots": null},
                {"city": "WACO", "openTimeslots": "0"},
                {"city": "WACO", "openTimeslots": -0.0},
                {"city": "TYLER", "openTimeslots": 2.5}
            ]
        });
        assert_eq!(
            lookup_heb(&payload, "WACO"),
            ApiLookup::Found(vec![HEB_NO_SLOTS.to_string(); 4])
        );
        assert_eq!(
            lookup_heb(&payload, "TYLER"),
            ApiLookup::Found(vec!["2.5".to_string()])
        );
    }
}
