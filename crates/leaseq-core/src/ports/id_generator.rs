//! IdGenerator port - task id generation.
//!
//! Task ids are short random tokens made of lowercase ASCII letters and
//! digits. The store asks for `TASK_ID_LEN` characters first and widens to
//! `WIDE_TASK_ID_LEN` when the short id is already taken in the queue.

use rand::Rng;

use crate::domain::TaskId;

/// Length of a freshly generated task id.
pub const TASK_ID_LEN: usize = 10;

/// Length used after a collision inside the target queue.
pub const WIDE_TASK_ID_LEN: usize = 12;

const ALPHABET: &[u8] = b"abcdefghijklmnopqrstuvwxyz0123456789";

/// Generates task ids of the requested length.
///
/// # Thread Safety
/// - `Send + Sync` so the broker can be shared between connection tasks.
pub trait IdGenerator: Send + Sync {
    fn generate(&self, len: usize) -> TaskId;
}

/// Thread-local RNG backed generator.
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomIdGenerator;

impl IdGenerator for RandomIdGenerator {
    fn generate(&self, len: usize) -> TaskId {
        let mut rng = rand::thread_rng();
        let id: String = (0..len)
            .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
            .collect();
        TaskId::new(id)
    }
}

/// Hands out a fixed list of ids, then falls back to random ones.
#[cfg(test)]
pub(crate) struct ScriptedIdGenerator {
    script: std::sync::Mutex<std::collections::VecDeque<&'static str>>,
}

#[cfg(test)]
impl ScriptedIdGenerator {
    pub(crate) fn new(script: &[&'static str]) -> Self {
        Self {
            script: std::sync::Mutex::new(script.iter().copied().collect()),
        }
    }
}

#[cfg(test)]
impl IdGenerator for ScriptedIdGenerator {
    fn generate(&self, len: usize) -> TaskId {
        match self.script.lock().unwrap().pop_front() {
            Some(id) => TaskId::new(id),
            None => RandomIdGenerator.generate(len),
        }
    }
}
