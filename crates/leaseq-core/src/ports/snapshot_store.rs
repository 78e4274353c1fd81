//! SnapshotStore port - durable full-state backup.
//!
//! The whole `QueueState` is written after every request that changed it and
//! read back once at startup. There is no incremental format.

use async_trait::async_trait;

use crate::domain::SnapshotError;
use crate::queue::QueueState;

/// Stores the latest full snapshot of the broker state.
///
/// # Contract
/// - `save` replaces the previous snapshot as a whole.
/// - `load` returns `Ok(None)` when nothing was ever saved.
/// - `remove` is a no-op when there is nothing to remove.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn load(&self) -> Result<Option<QueueState>, SnapshotError>;

    async fn save(&self, state: &QueueState) -> Result<(), SnapshotError>;

    async fn remove(&self) -> Result<(), SnapshotError>;
}
