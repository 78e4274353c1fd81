//! Task store: queue name -> FIFO sequence of tasks.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

use crate::domain::{LeasedTask, QueueName, Task, TaskId};
use crate::ports::{IdGenerator, TASK_ID_LEN, WIDE_TASK_ID_LEN};

/// Single source of truth for task existence and the `leased` flag.
///
/// Design:
/// - Queues are created on first `add` and never deleted (an empty queue
///   stays in the map).
/// - Order inside a queue is insertion order; nothing reorders it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskStore {
    queues: BTreeMap<QueueName, VecDeque<Task>>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a new unleased task and return its id.
    pub fn add(
        &mut self,
        queue: &QueueName,
        length: u64,
        payload: Vec<u8>,
        ids: &dyn IdGenerator,
    ) -> TaskId {
        let tasks = self.queues.entry(queue.clone()).or_default();

        let mut id = ids.generate(TASK_ID_LEN);
        while tasks.iter().any(|task| task.id == id) {
            id = ids.generate(WIDE_TASK_ID_LEN);
        }

        tasks.push_back(Task::new(id.clone(), length, payload));
        id
    }

    /// Mark the first unleased task of `queue` as leased and return it.
    pub fn lease(&mut self, queue: &QueueName) -> Option<LeasedTask> {
        let task = self
            .queues
            .get_mut(queue)?
            .iter_mut()
            .find(|task| !task.leased)?;
        task.leased = true;
        Some(LeasedTask::from(&*task))
    }

    /// Remove the task. Returns whether it existed.
    pub fn acknowledge(&mut self, queue: &QueueName, id: &TaskId) -> bool {
        let Some(tasks) = self.queues.get_mut(queue) else {
            return false;
        };
        match tasks.iter().position(|task| task.id == *id) {
            Some(index) => {
                tasks.remove(index);
                true
            }
            None => false,
        }
    }

    /// Clear the `leased` flag. Returns whether the task existed.
    pub fn release(&mut self, queue: &QueueName, id: &TaskId) -> bool {
        match self.get_mut(queue, id) {
            Some(task) => {
                task.leased = false;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, queue: &QueueName, id: &TaskId) -> bool {
        self.get(queue, id).is_some()
    }

    /// Would `lease` hand out a task?
    pub fn has_available(&self, queue: &QueueName) -> bool {
        self.tasks(queue).any(|task| !task.leased)
    }

    pub fn get(&self, queue: &QueueName, id: &TaskId) -> Option<&Task> {
        self.queues.get(queue)?.iter().find(|task| task.id == *id)
    }

    fn get_mut(&mut self, queue: &QueueName, id: &TaskId) -> Option<&mut Task> {
        self.queues
            .get_mut(queue)?
            .iter_mut()
            .find(|task| task.id == *id)
    }

    /// Tasks of one queue in FIFO order.
    pub fn tasks(&self, queue: &QueueName) -> impl Iterator<Item = &Task> {
        self.queues.get(queue).into_iter().flatten()
    }

    pub fn queues(&self) -> impl Iterator<Item = (&QueueName, &VecDeque<Task>)> {
        self.queues.iter()
    }

    pub fn queue_count(&self) -> usize {
        self.queues.len()
    }

    pub fn task_count(&self) -> usize {
        self.queues.values().map(VecDeque::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::RandomIdGenerator;
    use crate::ports::id_generator::ScriptedIdGenerator;

    fn q(name: &str) -> QueueName {
        QueueName::new(name)
    }

    #[test]
    fn add_appends_in_fifo_order() {
        let mut store = TaskStore::new();
        let a = store.add(&q("q"), 1, b"a".to_vec(), &RandomIdGenerator);
        let b = store.add(&q("q"), 1, b"b".to_vec(), &RandomIdGenerator);

        let order: Vec<_> = store.tasks(&q("q")).map(|t| t.id.clone()).collect();
        assert_eq!(order, vec![a, b]);
        assert!(store.tasks(&q("q")).all(|t| !t.leased));
    }

    #[test]
    fn colliding_id_is_widened() {
        let ids = ScriptedIdGenerator::new(&["aaaaaaaaaa", "aaaaaaaaaa", "bbbbbbbbbbbb"]);
        let mut store = TaskStore::new();

        let first = store.add(&q("q"), 1, b"a".to_vec(), &ids);
        let second = store.add(&q("q"), 1, b"b".to_vec(), &ids);

        assert_eq!(first, "aaaaaaaaaa");
        assert_eq!(second, "bbbbbbbbbbbb");
    }

    #[test]
    fn same_id_is_allowed_in_different_queues() {
        let ids = ScriptedIdGenerator::new(&["aaaaaaaaaa", "aaaaaaaaaa"]);
        let mut store = TaskStore::new();

        let first = store.add(&q("one"), 1, b"a".to_vec(), &ids);
        let second = store.add(&q("two"), 1, b"b".to_vec(), &ids);

        assert_eq!(first, second);
    }

    #[test]
    fn lease_skips_leased_tasks_without_reordering() {
        let mut store = TaskStore::new();
        let a = store.add(&q("q"), 1, b"a".to_vec(), &RandomIdGenerator);
        let b = store.add(&q("q"), 2, b"bb".to_vec(), &RandomIdGenerator);

        assert_eq!(store.lease(&q("q")).map(|t| t.id), Some(a.clone()));
        let second = store.lease(&q("q")).unwrap();
        assert_eq!(second.id, b);
        assert_eq!(second.length, 2);
        assert_eq!(second.payload, b"bb");
        assert_eq!(store.lease(&q("q")), None);

        let order: Vec<_> = store.tasks(&q("q")).map(|t| t.id.clone()).collect();
        assert_eq!(order, vec![a, b]);
    }

    #[test]
    fn lease_on_missing_queue_is_none() {
        let mut store = TaskStore::new();
        assert_eq!(store.lease(&q("nothing")), None);
    }

    #[test]
    fn acknowledge_removes_once() {
        let mut store = TaskStore::new();
        let id = store.add(&q("q"), 1, b"a".to_vec(), &RandomIdGenerator);

        assert!(store.contains(&q("q"), &id));
        assert!(store.acknowledge(&q("q"), &id));
        assert!(!store.contains(&q("q"), &id));
        assert!(!store.acknowledge(&q("q"), &id));
        assert!(!store.acknowledge(&q("other"), &id));
    }

    #[test]
    fn release_makes_task_leasable_again() {
        let mut store = TaskStore::new();
        let id = store.add(&q("q"), 1, b"a".to_vec(), &RandomIdGenerator);
        store.lease(&q("q"));
        assert!(store.get(&q("q"), &id).unwrap().leased);

        assert!(store.release(&q("q"), &id));
        assert!(!store.get(&q("q"), &id).unwrap().leased);
        assert_eq!(store.lease(&q("q")).map(|t| t.id), Some(id));
    }

    #[test]
    fn has_available_ignores_leased_tasks() {
        let mut store = TaskStore::new();
        assert!(!store.has_available(&q("q")));

        store.add(&q("q"), 1, b"a".to_vec(), &RandomIdGenerator);
        assert!(store.has_available(&q("q")));

        store.lease(&q("q"));
        assert!(!store.has_available(&q("q")));
    }

    #[test]
    fn counts() {
        let mut store = TaskStore::new();
        store.add(&q("a"), 1, b"x".to_vec(), &RandomIdGenerator);
        store.add(&q("b"), 1, b"y".to_vec(), &RandomIdGenerator);
        store.add(&q("b"), 1, b"z".to_vec(), &RandomIdGenerator);

        assert_eq!(store.queue_count(), 2);
        assert_eq!(store.task_count(), 3);
    }
}
