//! BrokerBuilder - wiring and startup restore.
//!
//! # Fail-fast
//! `build()` loads the snapshot and checks its invariants. A corrupt or
//! inconsistent backup stops startup; there is no partial recovery.

use std::sync::Arc;
use std::time::Duration;

use super::Broker;
use super::config::DEFAULT_TASK_TIMEOUT;
use crate::domain::SnapshotError;
use crate::ports::{Clock, IdGenerator, RandomIdGenerator, SnapshotStore, SystemClock};
use crate::queue::QueueState;

/// Builds a `Broker` around a snapshot store.
///
/// # Example
/// ```ignore
/// let broker = BrokerBuilder::new(Arc::new(JsonFileSnapshotStore::new("backup.json")))
///     .task_timeout(Duration::from_secs(30))
///     .build()
///     .await?;
/// ```
pub struct BrokerBuilder {
    snapshots: Arc<dyn SnapshotStore>,
    clock: Arc<dyn Clock>,
    ids: Arc<dyn IdGenerator>,
    task_timeout: Duration,
}

impl BrokerBuilder {
    pub fn new(snapshots: Arc<dyn SnapshotStore>) -> Self {
        Self {
            snapshots,
            clock: Arc::new(SystemClock),
            ids: Arc::new(RandomIdGenerator),
            task_timeout: DEFAULT_TASK_TIMEOUT,
        }
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn id_generator(mut self, ids: Arc<dyn IdGenerator>) -> Self {
        self.ids = ids;
        self
    }

    pub fn task_timeout(mut self, timeout: Duration) -> Self {
        self.task_timeout = timeout;
        self
    }

    /// Restore the last snapshot (or start empty) and build the broker.
    pub async fn build(self) -> Result<Broker, SnapshotError> {
        let state = match self.snapshots.load().await? {
            Some(state) => {
                state.validate()?;
                let counts = state.counts();
                tracing::info!(
                    queues = counts.queues,
                    tasks = counts.tasks,
                    leased = counts.leased,
                    "restored snapshot"
                );
                state
            }
            None => {
                tracing::info!("no snapshot found, starting empty");
                QueueState::new()
            }
        };

        Ok(Broker {
            state,
            snapshots: self.snapshots,
            clock: self.clock,
            ids: self.ids,
            task_timeout: self.task_timeout,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::impls::InMemorySnapshotStore;

    #[tokio::test]
    async fn build_without_snapshot_starts_empty() {
        let broker = BrokerBuilder::new(Arc::new(InMemorySnapshotStore::new()))
            .build()
            .await
            .unwrap();
        assert_eq!(broker.state(), &QueueState::new());
        assert_eq!(broker.task_timeout(), DEFAULT_TASK_TIMEOUT);
    }

    #[tokio::test]
    async fn build_rejects_inconsistent_snapshot() {
        let state: QueueState = serde_json::from_value(serde_json::json!({
            "queues": {},
            "leases": [ {"queue": "q", "task_id": "gone", "started_at": "2024-01-01T12:00:00Z"} ]
        }))
        .unwrap();

        let result = BrokerBuilder::new(Arc::new(InMemorySnapshotStore::with_state(state)))
            .build()
            .await;
        assert!(matches!(result, Err(SnapshotError::Inconsistent(_))));
    }
}
