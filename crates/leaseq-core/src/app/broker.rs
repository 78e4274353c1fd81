//! Broker - the protocol engine.
//!
//! # Flow of one request
//! 1. Parse the bytes into a `Command` (malformed requests stop here).
//! 2. If no lease has expired and the command cannot change anything
//!    (`IN`, a `GET` with nothing available, an `ACK` of a missing task),
//!    answer straight from the current state.
//! 3. Otherwise work on a copy of the state: reclaim expired leases, apply
//!    the command.
//! 4. If anything changed, save the copy through the `SnapshotStore`.
//! 5. Commit the copy and encode the reply.
//!
//! # Persistence
//! A failed save drops the copy, so memory never runs ahead of the snapshot
//! and the client gets `ERR` instead of a success it cannot rely on.
//!
//! # Replies
//! | Outcome | Reply |
//! |---|---|
//! | task added | `<id>` |
//! | task leased | `<id> <length> <payload>` |
//! | nothing to lease | `NONE` |
//! | ACK / IN hit or miss | `YES` / `NO` |
//! | malformed request, failed save | `ERR <reason>` |

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::domain::{BrokerError, SnapshotError};
use crate::ports::{Clock, IdGenerator, SnapshotStore};
use crate::protocol::{Command, Reply};
use crate::queue::QueueState;

/// Owner of the queue state. Callers serialize access (`&mut self`), which
/// makes sweep, mutation and persistence of one request indivisible.
pub struct Broker {
    pub(super) state: QueueState,
    pub(super) snapshots: Arc<dyn SnapshotStore>,
    pub(super) clock: Arc<dyn Clock>,
    pub(super) ids: Arc<dyn IdGenerator>,
    pub(super) task_timeout: Duration,
}

impl Broker {
    pub fn state(&self) -> &QueueState {
        &self.state
    }

    pub fn task_timeout(&self) -> Duration {
        self.task_timeout
    }

    /// Handle one raw request and return the reply bytes.
    ///
    /// Never fails: errors become `ERR <reason>` replies.
    pub async fn handle_request(&mut self, request: &[u8]) -> Vec<u8> {
        let reply = match Command::parse(request) {
            Ok(command) => match self.execute(command).await {
                Ok(reply) => reply,
                Err(err) => {
                    tracing::error!(error = %err, "request failed");
                    Reply::Error(err.to_string())
                }
            },
            Err(err) => {
                tracing::warn!(
                    error = %err,
                    request = %String::from_utf8_lossy(request).trim(),
                    "rejected malformed request"
                );
                Reply::Error(BrokerError::from(err).to_string())
            }
        };
        reply.encode()
    }

    /// Execute one parsed command.
    pub async fn execute(&mut self, command: Command) -> Result<Reply, BrokerError> {
        let now = self.clock.now();
        if let Some(reply) = self.answer_unchanged(&command, now) {
            tracing::trace!(command = %command.kind(), "request done without changes");
            return Ok(reply);
        }

        let mut next = self.state.clone();

        let reclaimed = next.sweep_expired(now, self.task_timeout);
        let kind = command.kind();

        let (reply, changed) = match command {
            Command::Add {
                queue,
                length,
                payload,
            } => {
                let id = next.add(&queue, length, payload, self.ids.as_ref());
                tracing::debug!(%queue, task_id = %id, length, "task added");
                (Reply::Added(id), true)
            }
            Command::Get { queue } => match next.lease(&queue, now) {
                Some(task) => {
                    tracing::debug!(%queue, task_id = %task.id, "task leased");
                    (Reply::Task(task), true)
                }
                None => (Reply::NoTask, false),
            },
            Command::Ack { queue, id } => {
                let removed = next.acknowledge(&queue, &id);
                tracing::debug!(%queue, task_id = %id, removed, "task acknowledged");
                (Reply::from_bool(removed), removed)
            }
            Command::In { queue, id } => (Reply::from_bool(next.contains(&queue, &id)), false),
        };

        if changed || reclaimed > 0 {
            self.persist(&next).await?;
        }
        self.state = next;

        tracing::trace!(command = %kind, reclaimed, "request done");
        Ok(reply)
    }

    /// Reply without touching the state when nothing expired and the command
    /// cannot change anything.
    fn answer_unchanged(&self, command: &Command, now: DateTime<Utc>) -> Option<Reply> {
        if self.state.needs_sweep(now, self.task_timeout) {
            return None;
        }
        match command {
            Command::In { queue, id } => Some(Reply::from_bool(self.state.contains(queue, id))),
            Command::Get { queue } if !self.state.has_available(queue) => Some(Reply::NoTask),
            Command::Ack { queue, id } if !self.state.contains(queue, id) => Some(Reply::No),
            _ => None,
        }
    }

    async fn persist(&self, state: &QueueState) -> Result<(), SnapshotError> {
        self.snapshots.save(state).await
    }
}
