//! Local filesystem storage implementation.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── {status_file}              # Canonical snapshot (atomic replace)
//! └── {archive_dir}/
//!     ├── {status_file}.{ts}     # Snapshot copies
//!     └── {provider}.html.{ts}   # Evidence pages
//! ```

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use chrono::{DateTime, Local};
use serde::de::DeserializeOwned;
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{ARCHIVE_SUFFIX_FORMAT, OutputConfig, Snapshot};
use crate::storage::{FlushMetadata, StatusStore, StoredStatus};
use crate::utils::file_safe_name;

/// Local filesystem storage backend.
#[derive(Debug, Clone)]
pub struct LocalStore {
    root_dir: PathBuf,
    status_file: String,
    archive_dir: Option<String>,
}

impl LocalStore {
    /// Create a store rooted at the given directory with default file names.
    pub fn new(root_dir: impl Into<PathBuf>) -> Self {
        let defaults = OutputConfig::default();
        Self {
            root_dir: root_dir.into(),
            status_file: defaults.status_file,
            archive_dir: Some(defaults.archive_dir),
        }
    }

    pub fn from_config(output: &OutputConfig) -> Self {
        Self {
            root_dir: PathBuf::from(&output.dir),
            status_file: output.status_file.clone(),
            archive_dir: output.archive.then(|| output.archive_dir.clone()),
        }
    }

    /// Turn archive copies and evidence off.
    pub fn without_archive(mut self) -> Self {
        self.archive_dir = None;
        self
    }

    pub fn canonical_path(&self) -> PathBuf {
        self.root_dir.join(&self.status_file)
    }

    fn archive_path(&self, file_name: &str, at: DateTime<Local>) -> Option<PathBuf> {
        self.archive_dir.as_ref().map(|dir| {
            self.root_dir.join(dir).join(format!(
                "{}.{}",
                file_name,
                at.format(ARCHIVE_SUFFIX_FORMAT)
            ))
        })
    }

    /// Ensure parent directory exists.
    async fn ensure_dir(path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        Ok(())
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(path: &Path, bytes: &[u8]) -> Result<()> {
        Self::ensure_dir(path).await?;

        let mut tmp = OsString::from(path.as_os_str());
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);

        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, path).await?;
        Ok(())
    }

    /// Read JSON data, returning None if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
        match tokio::fs::read(path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl StatusStore for LocalStore {
    async fn flush(&self, snapshot: &Snapshot) -> Result<FlushMetadata> {
        let bytes = snapshot.to_json()?;
        let canonical = self.canonical_path();

        Self::write_bytes(&canonical, &bytes)
            .await
            .map_err(|e| AppError::persist(canonical.display().to_string(), e))?;
        log::debug!(
            "Wrote {} records to {}",
            snapshot.records.len(),
            canonical.display()
        );

        let mut archive = None;
        if let Some(path) = self.archive_path(&self.status_file, snapshot.taken_at) {
            match Self::write_bytes(&path, &bytes).await {
                Ok(()) => archive = Some(path),
                Err(e) => log::warn!("Failed to archive snapshot to {}: {}", path.display(), e),
            }
        }

        Ok(FlushMetadata {
            canonical,
            archive,
            count: snapshot.records.len(),
        })
    }

    async fn save_evidence(
        &self,
        provider: &str,
        text: &str,
        at: DateTime<Local>,
    ) -> Result<Option<PathBuf>> {
        let file_name = format!("{}.html", file_safe_name(provider));
        let Some(path) = self.archive_path(&file_name, at) else {
            return Ok(None);
        };
        Self::write_bytes(&path, text.as_bytes()).await?;
        Ok(Some(path))
    }

    async fn load_current(&self) -> Result<Option<Vec<StoredStatus>>> {
        let path = self.canonical_path();
        let current = Self::read_json(&path).await?;
        if current.is_none() {
            log::warn!("No snapshot at {}", path.display());
        }
        Ok(current)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{
        Availability, ProviderConfig, ProviderRecord, ProviderState, Strategy,
    };
    use chrono::TimeZone;
    use tempfile::TempDir;

    fn at() -> DateTime<Local> {
        Local.with_ymd_and_hms(2021, 3, 5, 14, 15, 7).single().unwrap()
    }

    fn snapshot() -> Snapshot {
        let provider = ProviderConfig {
            name: "HEB San Antonio".into(),
            strategy: Strategy::Heb {
                city: "SAN ANTONIO".into(),
            },
        };
        let state = ProviderState::new(Availability::Maybe, Some(at()));
        Snapshot::new(at(), vec![ProviderRecord::new(&provider, &state)])
    }

    #[tokio::test]
    async fn test_flush_creates_dirs_and_archive() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path().join("status"));

        let meta = store.flush(&snapshot()).await.unwrap();
        assert_eq!(meta.count, 1);
        assert!(meta.canonical.exists());
        let archive = meta.archive.unwrap();
        assert!(archive.ends_with("archive/status.json.2021-03-05_141507"));
        assert_eq!(
            std::fs::read(&archive).unwrap(),
            std::fs::read(&meta.canonical).unwrap()
        );

        let loaded = store.load_current().await.unwrap().unwrap();
        assert_eq!(
            loaded,
            vec![StoredStatus {
                name: "HEB San Antonio".into(),
                status: Availability::Maybe,
                update_time: "05-Mar-2021 02:15:07 PM".into(),
            }]
        );
    }

    #[tokio::test]
    async fn test_archive_failure_is_not_fatal() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("status");
        std::fs::create_dir_all(&root).unwrap();
        // A plain file where the archive directory should be.
        std::fs::write(root.join("archive"), b"in the way").unwrap();

        let store = LocalStore::new(&root);
        let meta = store.flush(&snapshot()).await.unwrap();
        assert!(meta.canonical.exists());
        assert!(meta.archive.is_none());
    }

    #[tokio::test]
    async fn test_canonical_failure_is_persist_error() {
        let tmp = TempDir::new().unwrap();
        let root = tmp.path().join("status");
        std::fs::write(&root, b"not a directory").unwrap();

        let err = LocalStore::new(&root).flush(&snapshot()).await.unwrap_err();
        assert!(matches!(err, AppError::Persist { .. }));
    }

    #[tokio::test]
    async fn test_evidence_naming_and_disabled_archive() {
        let tmp = TempDir::new().unwrap();
        let store = LocalStore::new(tmp.path());

        let path = store
            .save_evidence("UT Health San Antonio", "<html/>", at())
            .await
            .unwrap()
            .unwrap();
        assert!(path.ends_with("archive/UT_Health_San_Antonio.html.2021-03-05_141507"));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "<html/>");

        let store = store.without_archive();
        assert!(store.save_evidence("x", "y", at()).await.unwrap().is_none());
        assert!(store.load_current().await.unwrap().is_none());
    }
}
