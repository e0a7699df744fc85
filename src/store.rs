// Task store: ordered task list persisted as one blob

use crate::storage::KeyValueStorage;
use crate::task::{Task, TaskError, TaskId};
use chrono::{DateTime, Utc};
use eyre::{Context, Result};
use tracing::{debug, info, warn};

/// Storage key holding the serialized task list
pub const TASKS_KEY: &str = "tasks";

/// Storage key holding the next id to hand out; only ever grows
pub const NEXT_ID_KEY: &str = "next_id";

/// Ordered task list kept in sync with its storage
///
/// Every mutation rewrites the whole list under [`TASKS_KEY`]. The in-memory
/// list only changes once that write has succeeded.
pub struct TaskStore<S: KeyValueStorage> {
    storage: S,
    tasks: Vec<Task>,
    next_id: TaskId,
}

impl<S: KeyValueStorage> TaskStore<S> {
    /// Load the list from storage
    ///
    /// A missing key is an empty list. An unparseable blob is logged and also
    /// treated as empty; it is only overwritten by the next mutation.
    pub fn load(storage: S) -> Result<Self> {
        let mut tasks: Vec<Task> = match storage.get_item(TASKS_KEY)? {
            None => Vec::new(),
            Some(blob) => match serde_json::from_str(&blob) {
                Ok(tasks) => tasks,
                Err(e) => {
                    warn!(error = ?e, "Stored task list is unreadable, starting empty");
                    Vec::new()
                }
            },
        };

        let stored_next = match storage.get_item(NEXT_ID_KEY)? {
            None => 1,
            Some(value) => value.trim().parse::<TaskId>().unwrap_or_else(|e| {
                warn!(error = ?e, value = %value, "Stored next id is unreadable, deriving it from the list");
                1
            }),
        };

        let mut next_id = stored_next.max(tasks.iter().map(|t| t.id).max().unwrap_or(0) + 1);
        let mut assigned = 0;
        for task in tasks.iter_mut().filter(|t| t.id == 0) {
            task.id = next_id;
            next_id += 1;
            assigned += 1;
        }
        if assigned > 0 {
            info!(count = assigned, "Assigned ids to tasks stored without one");
        }

        debug!(count = tasks.len(), next_id, "Loaded task list");
        Ok(Self {
            storage,
            tasks,
            next_id,
        })
    }

    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn get(&self, id: TaskId) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Append a new task created at `now`
    ///
    /// Blank text fails with [`TaskError::EmptyText`] inside the report.
    pub fn add(&mut self, text: &str, now: DateTime<Utc>) -> Result<TaskId> {
        let text = text.trim();
        if text.is_empty() {
            return Err(TaskError::EmptyText.into());
        }

        let id = self.next_id;
        let mut tasks = self.tasks.clone();
        tasks.push(Task::new(id, text, now));
        self.commit(tasks, id + 1)?;

        debug!(id, "Added task");
        Ok(id)
    }

    /// Flip the completion flag, returning the new value
    pub fn toggle_complete(&mut self, id: TaskId) -> Result<bool> {
        let index = self.position(id)?;
        let mut tasks = self.tasks.clone();
        tasks[index].completed = !tasks[index].completed;
        let completed = tasks[index].completed;
        self.commit(tasks, self.next_id)?;

        debug!(id, completed, "Toggled task");
        Ok(completed)
    }

    /// Replace a task's text
    ///
    /// Blank replacements are ignored and return `false`.
    pub fn edit(&mut self, id: TaskId, new_text: &str) -> Result<bool> {
        let new_text = new_text.trim();
        let index = self.position(id)?;
        if new_text.is_empty() {
            debug!(id, "Ignoring blank edit");
            return Ok(false);
        }

        let mut tasks = self.tasks.clone();
        tasks[index].text = new_text.to_string();
        self.commit(tasks, self.next_id)?;

        debug!(id, "Edited task");
        Ok(true)
    }

    /// Remove exactly the task with this id
    pub fn delete(&mut self, id: TaskId) -> Result<Task> {
        let index = self.position(id)?;
        let mut tasks = self.tasks.clone();
        let removed = tasks.remove(index);
        self.commit(tasks, self.next_id)?;

        debug!(id, "Deleted task");
        Ok(removed)
    }

    /// Drop every task, returning how many were removed
    pub fn clear_all(&mut self) -> Result<usize> {
        if self.tasks.is_empty() {
            return Err(TaskError::NothingToClear.into());
        }

        let count = self.tasks.len();
        self.commit(Vec::new(), self.next_id)?;

        info!(count, "Cleared all tasks");
        Ok(count)
    }

    fn position(&self, id: TaskId) -> Result<usize> {
        Ok(self
            .tasks
            .iter()
            .position(|t| t.id == id)
            .ok_or(TaskError::NotFound(id))?)
    }

    /// Write `tasks` and `next_id`, then adopt them in memory
    ///
    /// The id high-water mark is written before the list.
    fn commit(&mut self, tasks: Vec<Task>, next_id: TaskId) -> Result<()> {
        let blob = serde_json::to_string(&tasks).context("Failed to serialize task list")?;
        self.storage.set_item(NEXT_ID_KEY, &next_id.to_string())?;
        self.storage.set_item(TASKS_KEY, &blob)?;

        self.tasks = tasks;
        self.next_id = next_id;
        Ok(())
    }
}
