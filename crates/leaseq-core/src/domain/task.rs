use serde::{Deserialize, Serialize};

use super::TaskId;

/// A task as stored in its queue.
///
/// `length` is a caller-supplied tag. It is not checked against the payload
/// size and is handed back unchanged on GET.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub length: u64,
    pub payload: Vec<u8>,
    pub leased: bool,
}

impl Task {
    pub fn new(id: TaskId, length: u64, payload: Vec<u8>) -> Self {
        Self {
            id,
            length,
            payload,
            leased: false,
        }
    }
}

/// What a worker receives for a successful GET.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeasedTask {
    pub id: TaskId,
    pub length: u64,
    pub payload: Vec<u8>,
}

impl From<&Task> for LeasedTask {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.clone(),
            length: task.length,
            payload: task.payload.clone(),
        }
    }
}
