//! JsonFileSnapshotStore - snapshot as one pretty-printed JSON file.
//!
//! # Write path
//! The state is written to `<path>.tmp` and then renamed over `<path>`, so a
//! crash during the write leaves the previous snapshot intact.

use async_trait::async_trait;
use std::ffi::OsString;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use crate::domain::SnapshotError;
use crate::ports::SnapshotStore;
use crate::queue::QueueState;

#[derive(Debug, Clone)]
pub struct JsonFileSnapshotStore {
    path: PathBuf,
}

impl JsonFileSnapshotStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = OsString::from(self.path.as_os_str());
        name.push(".tmp");
        PathBuf::from(name)
    }
}

#[async_trait]
impl SnapshotStore for JsonFileSnapshotStore {
    async fn load(&self) -> Result<Option<QueueState>, SnapshotError> {
        let bytes = match tokio::fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => return Err(err.into()),
        };
        let state = serde_json::from_slice(&bytes)?;
        Ok(Some(state))
    }

    async fn save(&self, state: &QueueState) -> Result<(), SnapshotError> {
        let data = serde_json::to_vec_pretty(state)?;
        let temp = self.temp_path();
        tokio::fs::write(&temp, data).await?;
        tokio::fs::rename(&temp, &self.path).await?;
        tracing::trace!(path = %self.path.display(), "snapshot saved");
        Ok(())
    }

    async fn remove(&self) -> Result<(), SnapshotError> {
        match tokio::fs::remove_file(&self.path).await {
            Ok(()) => {
                tracing::info!(path = %self.path.display(), "backup removed");
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::QueueName;
    use crate::ports::RandomIdGenerator;
    use chrono::Utc;

    fn sample_state() -> QueueState {
        let mut state = QueueState::new();
        let queue = QueueName::new("greetings");
        state.add(&queue, 5, b"hello".to_vec(), &RandomIdGenerator);
        state.add(&queue, 3, b"hey".to_vec(), &RandomIdGenerator);
        state.lease(&queue, Utc::now());
        state
    }

    #[tokio::test]
    async fn missing_file_loads_as_none() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("backup.json"));

        assert_eq!(store.load().await.unwrap(), None);
    }

    #[tokio::test]
    async fn save_then_load_restores_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("backup.json"));
        let state = sample_state();

        store.save(&state).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(state));
        assert!(!store.temp_path().exists());
    }

    #[tokio::test]
    async fn save_overwrites_previous_snapshot() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("backup.json"));

        store.save(&sample_state()).await.unwrap();
        store.save(&QueueState::new()).await.unwrap();

        assert_eq!(store.load().await.unwrap(), Some(QueueState::new()));
    }

    #[tokio::test]
    async fn corrupt_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("backup.json");
        std::fs::write(&path, b"{ not json").unwrap();

        let err = JsonFileSnapshotStore::new(&path).load().await.unwrap_err();
        assert!(matches!(err, SnapshotError::Json(_)));
    }

    #[tokio::test]
    async fn remove_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonFileSnapshotStore::new(dir.path().join("backup.json"));
        store.save(&sample_state()).await.unwrap();

        store.remove().await.unwrap();
        store.remove().await.unwrap();

        assert!(!store.path().exists());
    }
}
