//! Point-in-time view of every provider, as persisted to `status.json`.

use chrono::{DateTime, Local};
use serde::Serialize;

use super::provider::{ProviderConfig, Strategy};
use super::status::{Availability, ProviderState};

/// One provider's configuration and state inside a snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderRecord {
    pub name: String,
    #[serde(flatten)]
    pub strategy: Strategy,
    pub status: Availability,
    pub update_time: String,
}

impl ProviderRecord {
    pub fn new(provider: &ProviderConfig, state: &ProviderState) -> Self {
        Self {
            name: provider.name.clone(),
            strategy: provider.strategy.clone(),
            status: state.status,
            update_time: state.update_time_display(),
        }
    }
}

/// Immutable snapshot handed to the store after a sweep.
#[derive(Debug, Clone)]
pub struct Snapshot {
    pub taken_at: DateTime<Local>,
    pub records: Vec<ProviderRecord>,
}

impl Snapshot {
    pub fn new(taken_at: DateTime<Local>, records: Vec<ProviderRecord>) -> Self {
        Self { taken_at, records }
    }

    /// Serialize as the pretty JSON array consumed by the status page.
    pub fn to_json(&self) -> serde_json::Result<Vec<u8>> {
        serde_json::to_vec_pretty(&self.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_layout() {
        let provider = ProviderConfig {
            name: "CVS San Antonio".into(),
            strategy: Strategy::Cvs {
                state: "TX".into(),
                city: "SAN ANTONIO".into(),
            },
        };
        let record = ProviderRecord::new(&provider, &ProviderState::default());
        let snapshot = Snapshot::new(Local::now(), vec![record]);

        let value: serde_json::Value = serde_json::from_slice(&snapshot.to_json().unwrap()).unwrap();
        let entry = &value[0];
        assert_eq!(entry["name"], "CVS San Antonio");
        assert_eq!(entry["kind"], "cvs");
        assert_eq!(entry["state"], "TX");
        assert_eq!(entry["city"], "SAN ANTONIO");
        assert_eq!(entry["status"], "probably not");
        assert_eq!(entry["update_time"], "");
    }
}
