//! Availability vocabulary and per-provider mutable state.

use std::fmt;

use chrono::{DateTime, Local, NaiveDateTime, TimeZone};
use serde::{Deserialize, Serialize};

/// Format of `update_time` in `status.json` (e.g. `05-Mar-2021 02:15:07 PM`).
pub const UPDATE_TIME_FORMAT: &str = "%d-%b-%Y %I:%M:%S %p";

/// Coarse availability signal shared by every query strategy.
///
/// Only equality is meaningful; there is no ordering between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Availability {
    #[default]
    #[serde(rename = "probably not")]
    ProbablyNot,
    #[serde(rename = "maybe")]
    Maybe,
    #[serde(rename = "probably")]
    Probably,
}

impl Availability {
    /// All states, for exhaustive checks.
    pub const ALL: [Availability; 3] = [Self::ProbablyNot, Self::Maybe, Self::Probably];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ProbablyNot => "probably not",
            Self::Maybe => "maybe",
            Self::Probably => "probably",
        }
    }

    /// Parse the wire form used in `status.json`.
    pub fn parse(s: &str) -> Option<Self> {
        Self::ALL
            .into_iter()
            .find(|a| a.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for Availability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Mutable status of one provider.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProviderState {
    pub status: Availability,
    /// Time of the last status transition, if any happened yet.
    pub last_update: Option<DateTime<Local>>,
}

impl ProviderState {
    pub fn new(status: Availability, last_update: Option<DateTime<Local>>) -> Self {
        Self {
            status,
            last_update,
        }
    }

    /// `update_time` as written to `status.json`; empty before the first change.
    pub fn update_time_display(&self) -> String {
        self.last_update
            .map(|t| t.format(UPDATE_TIME_FORMAT).to_string())
            .unwrap_or_default()
    }
}

/// Parse an `update_time` string back into a local timestamp.
pub fn parse_update_time(s: &str) -> Option<DateTime<Local>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    NaiveDateTime::parse_from_str(s, UPDATE_TIME_FORMAT)
        .ok()
        .and_then(|naive| Local.from_local_datetime(&naive).single())
}
