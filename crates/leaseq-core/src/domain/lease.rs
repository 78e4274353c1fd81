use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{QueueName, TaskId};

/// A time-bounded exclusive claim on one task.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lease {
    pub queue: QueueName,
    pub task_id: TaskId,
    pub started_at: DateTime<Utc>,
}

impl Lease {
    pub fn new(queue: QueueName, task_id: TaskId, started_at: DateTime<Utc>) -> Self {
        Self {
            queue,
            task_id,
            started_at,
        }
    }

    pub fn refers_to(&self, queue: &QueueName, task_id: &TaskId) -> bool {
        self.queue == *queue && self.task_id == *task_id
    }
}
