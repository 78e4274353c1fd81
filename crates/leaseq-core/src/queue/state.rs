//! Queue state: task store and lease tracker kept consistent.
//!
//! # Invariants
//! - Task ids are unique within a queue.
//! - A task is flagged `leased` iff exactly one lease names its
//!   `(queue, id)`.
//! - Leases are ordered by start time, oldest first.
//!
//! # Snapshot shape
//! Serialized as `{"queues": {<name>: [<task>, ...]}, "leases": [<lease>, ...]}`.
//! `validate` re-checks the invariants on a state read back from disk.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::time::Duration;

use super::{LeaseTracker, TaskStore};
use crate::domain::{LeasedTask, QueueName, SnapshotError, TaskId};
use crate::ports::IdGenerator;

/// The complete broker state, and the unit that gets snapshotted.
///
/// Invariant: a task has `leased = true` iff `leases` holds an entry for its
/// `(queue, id)`. Every mutation goes through the methods below, which touch
/// both halves together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueState {
    queues: TaskStore,
    leases: LeaseTracker,
}

/// Sizes of the state, for logging.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QueueCounts {
    pub queues: usize,
    pub tasks: usize,
    pub leased: usize,
}

impl QueueState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn store(&self) -> &TaskStore {
        &self.queues
    }

    pub fn leases(&self) -> &LeaseTracker {
        &self.leases
    }

    /// Reclaim expired leases. Returns how many tasks became available again.
    pub fn sweep_expired(&mut self, now: DateTime<Utc>, timeout: Duration) -> usize {
        let mut reclaimed = 0;
        for lease in self.leases.sweep(now, timeout) {
            if self.queues.release(&lease.queue, &lease.task_id) {
                tracing::debug!(
                    queue = %lease.queue,
                    task_id = %lease.task_id,
                    started_at = %lease.started_at,
                    "lease expired, task available again"
                );
                reclaimed += 1;
            } else {
                tracing::warn!(
                    queue = %lease.queue,
                    task_id = %lease.task_id,
                    "expired lease referenced a missing task"
                );
            }
        }
        reclaimed
    }

    /// Would `sweep_expired` reclaim anything?
    pub fn needs_sweep(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.leases.any_expired(now, timeout)
    }

    pub fn add(
        &mut self,
        queue: &QueueName,
        length: u64,
        payload: Vec<u8>,
        ids: &dyn IdGenerator,
    ) -> TaskId {
        self.queues.add(queue, length, payload, ids)
    }

    /// Hand out the first unleased task of `queue` and start its lease.
    pub fn lease(&mut self, queue: &QueueName, now: DateTime<Utc>) -> Option<LeasedTask> {
        let task = self.queues.lease(queue)?;
        self.leases.record(queue.clone(), task.id.clone(), now);
        Some(task)
    }

    /// Remove the task and any lease on it.
    pub fn acknowledge(&mut self, queue: &QueueName, id: &TaskId) -> bool {
        if !self.queues.acknowledge(queue, id) {
            return false;
        }
        self.leases.drop_lease(queue, id);
        true
    }

    pub fn contains(&self, queue: &QueueName, id: &TaskId) -> bool {
        self.queues.contains(queue, id)
    }

    pub fn has_available(&self, queue: &QueueName) -> bool {
        self.queues.has_available(queue)
    }

    pub fn counts(&self) -> QueueCounts {
        QueueCounts {
            queues: self.queues.queue_count(),
            tasks: self.queues.task_count(),
            leased: self.leases.len(),
        }
    }

    /// Check the invariants of a state read back from storage.
    pub fn validate(&self) -> Result<(), SnapshotError> {
        for (queue, tasks) in self.queues.queues() {
            let mut seen = HashSet::new();
            for task in tasks {
                if !seen.insert(&task.id) {
                    return Err(SnapshotError::Inconsistent(format!(
                        "duplicate task id {} in queue {queue}",
                        task.id
                    )));
                }
                if task.leased != self.leases.contains(queue, &task.id) {
                    return Err(SnapshotError::Inconsistent(format!(
                        "task {} in queue {queue} has leased={} but lease list disagrees",
                        task.id, task.leased
                    )));
                }
            }
        }

        let mut leased = HashSet::new();
        for lease in self.leases.iter() {
            if !leased.insert((&lease.queue, &lease.task_id)) {
                return Err(SnapshotError::Inconsistent(format!(
                    "task {} in queue {} has more than one lease",
                    lease.task_id, lease.queue
                )));
            }
            if !self.queues.contains(&lease.queue, &lease.task_id) {
                return Err(SnapshotError::Inconsistent(format!(
                    "lease on missing task {} in queue {}",
                    lease.task_id, lease.queue
                )));
            }
        }

        if !self.leases.is_monotonic() {
            return Err(SnapshotError::Inconsistent(
                "leases are not ordered by start time".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RandomIdGenerator;
    use chrono::TimeZone;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, 12, 0, 0).unwrap()
    }

    fn q() -> QueueName {
        QueueName::new("q")
    }

    #[test]
    fn lease_flag_follows_lease_tracker() {
        let mut state = QueueState::new();
        let id = state.add(&q(), 1, b"a".to_vec(), &RandomIdGenerator);

        state.lease(&q(), t0()).unwrap();
        assert!(state.leases().contains(&q(), &id));
        assert!(state.store().get(&q(), &id).unwrap().leased);
        state.validate().unwrap();

        assert!(state.acknowledge(&q(), &id));
        assert!(state.leases().is_empty());
        state.validate().unwrap();
    }

    #[test]
    fn sweep_reactivates_expired_tasks() {
        let mut state = QueueState::new();
        let id = state.add(&q(), 1, b"a".to_vec(), &RandomIdGenerator);
        state.lease(&q(), t0()).unwrap();

        assert_eq!(state.sweep_expired(t0() + chrono::Duration::seconds(4), Duration::from_secs(5)), 0);
        assert_eq!(state.lease(&q(), t0()), None);

        assert_eq!(state.sweep_expired(t0() + chrono::Duration::seconds(5), Duration::from_secs(5)), 1);
        assert_eq!(state.lease(&q(), t0()).map(|t| t.id), Some(id));
        state.validate().unwrap();
    }

    #[test]
    fn serializes_with_queues_and_leases_fields() {
        let mut state = QueueState::new();
        state.add(&q(), 5, b"hello".to_vec(), &RandomIdGenerator);
        state.lease(&q(), t0());

        let value = serde_json::to_value(&state).unwrap();
        assert!(value["queues"]["q"].is_array());
        assert_eq!(value["queues"]["q"][0]["length"], 5);
        assert_eq!(value["queues"]["q"][0]["leased"], true);
        assert_eq!(value["leases"][0]["queue"], "q");

        let back: QueueState = serde_json::from_value(value).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn validate_rejects_lease_without_flag() {
        let json = serde_json::json!({
            "queues": { "q": [ {"id": "abc", "length": 1, "payload": [97], "leased": false} ] },
            "leases": [ {"queue": "q", "task_id": "abc", "started_at": "2024-01-01T12:00:00Z"} ]
        });
        let state: QueueState = serde_json::from_value(json).unwrap();
        assert!(matches!(state.validate(), Err(SnapshotError::Inconsistent(_))));
    }

    #[test]
    fn validate_rejects_unordered_leases() {
        let json = serde_json::json!({
            "queues": { "q": [
                {"id": "a", "length": 1, "payload": [97], "leased": true},
                {"id": "b", "length": 1, "payload": [98], "leased": true}
            ] },
            "leases": [
                {"queue": "q", "task_id": "a", "started_at": "2024-01-01T12:00:10Z"},
                {"queue": "q", "task_id": "b", "started_at": "2024-01-01T12:00:00Z"}
            ]
        });
        let state: QueueState = serde_json::from_value(json).unwrap();
        assert!(state.validate().is_err());
    }

    #[test]
    fn counts_reflect_state() {
        let mut state = QueueState::new();
        state.add(&q(), 1, b"a".to_vec(), &RandomIdGenerator);
        state.add(&q(), 1, b"b".to_vec(), &RandomIdGenerator);
        state.lease(&q(), t0());

        assert_eq!(
            state.counts(),
            QueueCounts {
                queues: 1,
                tasks: 2,
                leased: 1
            }
        );
    }
}
