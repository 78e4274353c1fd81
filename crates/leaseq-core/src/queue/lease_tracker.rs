//! Lease tracker: outstanding leases, oldest first.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::time::Duration;

use crate::domain::{Lease, QueueName, TaskId};

/// Outstanding leases in creation order.
///
/// Invariant: `started_at` is non-decreasing from head to tail. `record`
/// enforces it, which is what lets `sweep` stop at the first young lease.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LeaseTracker {
    leases: VecDeque<Lease>,
}

impl LeaseTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a lease at the tail and return its effective start time.
    ///
    /// If the clock went backwards, the lease starts at the tail's timestamp
    /// instead of `now`.
    pub fn record(
        &mut self,
        queue: QueueName,
        task_id: TaskId,
        now: DateTime<Utc>,
    ) -> DateTime<Utc> {
        let started_at = match self.leases.back() {
            Some(newest) if now < newest.started_at => {
                tracing::warn!(
                    %queue,
                    %task_id,
                    now = %now,
                    newest = %newest.started_at,
                    "clock moved backwards, clamping lease start"
                );
                newest.started_at
            }
            _ => now,
        };
        self.leases.push_back(Lease::new(queue, task_id, started_at));
        started_at
    }

    /// Remove and return every lease whose age is at least `timeout`.
    pub fn sweep(&mut self, now: DateTime<Utc>, timeout: Duration) -> Vec<Lease> {
        let mut expired = Vec::new();
        while let Some(oldest) = self.leases.front() {
            if !is_expired(oldest, now, timeout) {
                break; // everything behind it is younger
            }
            if let Some(lease) = self.leases.pop_front() {
                expired.push(lease);
            }
        }
        expired
    }

    /// Would `sweep` reclaim anything?
    pub fn any_expired(&self, now: DateTime<Utc>, timeout: Duration) -> bool {
        self.leases
            .front()
            .is_some_and(|oldest| is_expired(oldest, now, timeout))
    }

    /// Remove the lease on `(queue, task_id)`, if any.
    pub fn drop_lease(&mut self, queue: &QueueName, task_id: &TaskId) -> bool {
        match self
            .leases
            .iter()
            .position(|lease| lease.refers_to(queue, task_id))
        {
            Some(index) => {
                self.leases.remove(index);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, queue: &QueueName, task_id: &TaskId) -> bool {
        self.leases
            .iter()
            .any(|lease| lease.refers_to(queue, task_id))
    }

    pub fn is_monotonic(&self) -> bool {
        self.leases
            .iter()
            .zip(self.leases.iter().skip(1))
            .all(|(older, newer)| older.started_at <= newer.started_at)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Lease> {
        self.leases.iter()
    }

    pub fn len(&self) -> usize {
        self.leases.len()
    }

    pub fn is_empty(&self) -> bool {
        self.leases.is_empty()
    }
}

fn is_expired(lease: &Lease, now: DateTime<Utc>, timeout: Duration) -> bool {
    let age = (now - lease.started_at).to_std().unwrap_or(Duration::ZERO);
    age >= timeout
}
