// Data model for tasks

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Stable task identifier, assigned by the store and never reused within a list
pub type TaskId = u64;

/// A single to-do entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Task {
    /// Zero means "not yet assigned" and only appears in blobs written before ids existed
    #[serde(default)]
    pub id: TaskId,
    pub text: String,
    #[serde(default)]
    pub completed: bool,
    pub created: DateTime<Utc>,
}

impl Task {
    pub fn new(id: TaskId, text: impl Into<String>, created: DateTime<Utc>) -> Self {
        Self {
            id,
            text: text.into(),
            completed: false,
            created,
        }
    }
}

/// Domain failures the application loop branches on
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TaskError {
    #[error("Please enter a task!")]
    EmptyText,

    #[error("No tasks to clear!")]
    NothingToClear,

    #[error("No task with id {0}")]
    NotFound(TaskId),
}
