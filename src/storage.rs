use std::collections::BTreeMap;

use tracing::debug;

use crate::error::Result;
use crate::models::Task;

/// Keyed task container the recurrence engine and the facade share.
///
/// `save` and `update` validate the task before writing; lookups of an
/// unknown id come back as `None`/`false`, never as an error.
pub trait TaskStore {
    /// Stores a new task under a freshly assigned id and returns that id.
    /// The incoming `task.id` is ignored.
    fn save(&mut self, task: Task) -> Result<u64>;

    fn get(&self, id: u64) -> Option<Task>;

    /// All tasks in insertion order.
    fn get_all(&self) -> Vec<Task>;

    /// Replaces the record stored under `id`. `Ok(false)` if there is none.
    fn update(&mut self, id: u64, task: Task) -> Result<bool>;

    fn delete(&mut self, id: u64) -> bool;
}

/// Process-lifetime store. Ids start at 1 and are never reused, so the
/// id-ordered map iterates in insertion order.
#[derive(Debug)]
pub struct InMemoryStore {
    tasks: BTreeMap<u64, Task>,
    next_id: u64,
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self { tasks: BTreeMap::new(), next_id: 1 }
    }
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

impl TaskStore for InMemoryStore {
    fn save(&mut self, mut task: Task) -> Result<u64> {
        task.validate()?;
        let id = self.next_id;
        self.next_id += 1;
        task.id = id;
        self.tasks.insert(id, task);
        debug!(id, "task saved");
        Ok(id)
    }

    fn get(&self, id: u64) -> Option<Task> {
        self.tasks.get(&id).cloned()
    }

    fn get_all(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    fn update(&mut self, id: u64, mut task: Task) -> Result<bool> {
        task.validate()?;
        match self.tasks.get_mut(&id) {
            Some(slot) => {
                task.id = id;
                *slot = task;
                debug!(id, "task updated");
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&mut self, id: u64) -> bool {
        let removed = self.tasks.remove(&id).is_some();
        if removed {
            debug!(id, "task deleted");
        }
        removed
    }
}
