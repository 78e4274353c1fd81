//! InMemorySnapshotStore - snapshot store for tests and embedding.
//!
//! Keeps the last saved state in memory and counts writes. `fail_saves`
//! makes every following `save` return an I/O error.

use async_trait::async_trait;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};

use crate::domain::SnapshotError;
use crate::ports::SnapshotStore;
use crate::queue::QueueState;

#[derive(Debug, Default)]
pub struct InMemorySnapshotStore {
    saved: Mutex<Option<QueueState>>,
    saves: AtomicUsize,
    failing: AtomicBool,
}

impl InMemorySnapshotStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start with an existing snapshot, as if it had been saved earlier.
    pub fn with_state(state: QueueState) -> Self {
        Self {
            saved: Mutex::new(Some(state)),
            ..Self::default()
        }
    }

    pub fn snapshot(&self) -> Option<QueueState> {
        self.saved
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }

    pub fn fail_saves(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }
}

#[async_trait]
impl SnapshotStore for InMemorySnapshotStore {
    async fn load(&self) -> Result<Option<QueueState>, SnapshotError> {
        Ok(self.snapshot())
    }

    async fn save(&self, state: &QueueState) -> Result<(), SnapshotError> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(SnapshotError::Io(std::io::Error::other("injected save failure")));
        }
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = Some(state.clone());
        self.saves.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn remove(&self) -> Result<(), SnapshotError> {
        *self.saved.lock().unwrap_or_else(PoisonError::into_inner) = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn save_and_load() {
        let store = InMemorySnapshotStore::new();
        assert_eq!(store.load().await.unwrap(), None);

        store.save(&QueueState::new()).await.unwrap();
        assert_eq!(store.load().await.unwrap(), Some(QueueState::new()));
        assert_eq!(store.save_count(), 1);
    }

    #[tokio::test]
    async fn injected_failure_keeps_previous_snapshot() {
        let store = InMemorySnapshotStore::with_state(QueueState::new());
        store.fail_saves(true);

        assert!(store.save(&QueueState::new()).await.is_err());
        assert_eq!(store.save_count(), 0);
        assert!(store.snapshot().is_some());
    }
}
