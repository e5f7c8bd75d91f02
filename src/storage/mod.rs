//! Storage abstractions for status persistence.
//!
//! The canonical snapshot is what the status page reads; archive copies and
//! evidence pages are kept for later inspection.
//!
//! ## Directory Structure
//!
//! ```text
//! status/
//! ├── status.json                              # Canonical snapshot
//! └── archive/
//!     ├── status.json.2021-03-05_141507        # Snapshot copies
//!     └── UT_Health_San_Antonio.html.2021-03-05_141502
//! ```

pub mod local;

use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::Deserialize;

use crate::error::Result;
use crate::models::{Availability, Snapshot};

pub use local::LocalStore;

/// Metadata about a snapshot flush.
#[derive(Debug, Clone)]
pub struct FlushMetadata {
    /// Canonical file that was replaced
    pub canonical: PathBuf,
    /// Archive copy, if one was written
    pub archive: Option<PathBuf>,
    /// Number of provider records written
    pub count: usize,
}

/// The part of a persisted record the status view needs.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct StoredStatus {
    pub name: String,
    pub status: Availability,
    #[serde(default)]
    pub update_time: String,
}

/// Trait for status storage backends.
#[async_trait]
pub trait StatusStore: Send + Sync {
    /// Replace the canonical snapshot and, when archiving, keep a copy.
    ///
    /// Only a canonical write failure is an error.
    async fn flush(&self, snapshot: &Snapshot) -> Result<FlushMetadata>;

    /// Archive the raw page that triggered a transition.
    ///
    /// Returns `None` when archiving is disabled.
    async fn save_evidence(
        &self,
        provider: &str,
        text: &str,
        at: DateTime<Local>,
    ) -> Result<Option<PathBuf>>;

    /// Read the canonical snapshot back, if one exists.
    async fn load_current(&self) -> Result<Option<Vec<StoredStatus>>>;
}
