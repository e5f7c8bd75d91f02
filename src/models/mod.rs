// src/models/mod.rs

//! Domain models for the monitor.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod config;
mod credentials;
mod provider;
mod snapshot;
mod status;

// Re-export all public types
pub use config::{
    BrowserConfig, Config, HttpConfig, MAX_INTERVAL_SECS, NotifyConfig, OutputConfig,
    ScheduleConfig, VendorConfig,
};
pub use credentials::{Credentials, Recipients};
pub use provider::{ProviderConfig, ProviderEntry, Strategy, StrategyKind};
pub use snapshot::{ProviderRecord, Snapshot};
pub use status::{Availability, ProviderState, UPDATE_TIME_FORMAT, parse_update_time};

/// Suffix format for archived files (`status.json.2021-03-05_141507`).
pub const ARCHIVE_SUFFIX_FORMAT: &str = "%Y-%m-%d_%H%M%S";
