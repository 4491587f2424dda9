//! Snapshot persistence
//!
//! The whole state is written to one JSON file after every change. Writes go
//! to a sibling temp file first and are renamed into place, so a crash never
//! leaves a half-written cache. Writes are serialized by their own lock and
//! tagged with the state version; an older version never overwrites a newer
//! one.

use std::path::{Path, PathBuf};

use thiserror::Error;
use tokio::sync::Mutex;

use crate::model::Snapshot;

/// Default location of the cache file
pub const DEFAULT_CACHE_FILE: &str = "/tmp/rtp-config.json";

/// Error writing the snapshot file
#[derive(Debug, Error)]
pub enum PersistError {
    #[error("failed to write {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Durable snapshot file
#[derive(Debug)]
pub struct Persistence {
    path: PathBuf,
    /// Version of the last snapshot successfully written
    written: Mutex<Option<u64>>,
}

impl Persistence {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            written: Mutex::new(None),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Read the snapshot file
    ///
    /// A missing or unreadable file yields `None`; the caller starts from a
    /// fresh state.
    pub async fn load(&self) -> Option<Snapshot> {
        let data = match tokio::fs::read(&self.path).await {
            Ok(data) => data,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(path = %self.path.display(), "No config cache, creating initial config");
                return None;
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Failed to read config cache");
                return None;
            }
        };

        match serde_json::from_slice(&data) {
            Ok(snapshot) => {
                tracing::info!(path = %self.path.display(), "Loaded config cache");
                Some(snapshot)
            }
            Err(e) => {
                tracing::error!(path = %self.path.display(), error = %e, "Config cache is corrupt, ignoring it");
                None
            }
        }
    }

    /// Write an encoded snapshot of state `version`
    ///
    /// Returns `Ok(false)` when a newer version was already written.
    pub async fn write(&self, version: u64, body: &[u8]) -> Result<bool, PersistError> {
        let mut written = self.written.lock().await;
        if written.is_some_and(|last| last >= version) {
            return Ok(false);
        }

        let tmp = self.tmp_path();
        let io_err = |source| PersistError::Io {
            path: self.path.clone(),
            source,
        };
        tokio::fs::write(&tmp, body).await.map_err(io_err)?;
        tokio::fs::rename(&tmp, &self.path).await.map_err(io_err)?;

        *written = Some(version);
        tracing::debug!(path = %self.path.display(), version, "Wrote state");
        Ok(true)
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::assert_ok;

    use super::*;
    use crate::model::Radio;

    #[tokio::test]
    async fn test_missing_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::new(dir.path().join("state.json"));

        assert!(persistence.load().await.is_none());
    }

    #[tokio::test]
    async fn test_corrupt_file_loads_none() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("state.json");
        std::fs::write(&path, b"{ not json").unwrap();

        assert!(Persistence::new(&path).load().await.is_none());
    }

    #[tokio::test]
    async fn test_write_then_load() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::new(dir.path().join("state.json"));

        let mut snapshot = Snapshot::bootstrap();
        snapshot.add_radio(Radio::new("Test", "test")).unwrap();
        let body = serde_json::to_vec(&snapshot).unwrap();

        assert!(assert_ok!(persistence.write(1, &body).await));
        assert_eq!(persistence.load().await, Some(snapshot));
        assert!(!dir.path().join("state.json.tmp").exists());
    }

    #[tokio::test]
    async fn test_older_version_never_overwrites() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::new(dir.path().join("state.json"));

        let newer = Snapshot::bootstrap();
        let older = Snapshot::default();

        assert!(assert_ok!(
            persistence.write(5, &serde_json::to_vec(&newer).unwrap()).await
        ));
        assert!(!assert_ok!(
            persistence.write(4, &serde_json::to_vec(&older).unwrap()).await
        ));
        assert_eq!(persistence.load().await, Some(newer));
    }

    #[tokio::test]
    async fn test_write_failure_reported() {
        let dir = tempfile::tempdir().unwrap();
        let persistence = Persistence::new(dir.path().join("missing-dir").join("state.json"));

        let result = persistence.write(1, b"{}").await;
        assert!(matches!(result, Err(PersistError::Io { .. })));

        // A failed write does not block later versions
        std::fs::create_dir(dir.path().join("missing-dir")).unwrap();
        assert!(assert_ok!(persistence.write(2, b"{}").await));
    }
}
