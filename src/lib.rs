// Tasklist - terminal task list with local persistence and completion sounds

pub mod app;
pub mod config;
pub mod filter;
pub mod prompt;
pub mod render;
pub mod shell;
pub mod sound;
pub mod storage;
pub mod store;
pub mod task;
pub mod time;

// Re-export main types for convenience
pub use app::{App, Command, Effect};
pub use config::{Config, SoundConfig};
pub use filter::Filter;
pub use prompt::{Prompt, TerminalPrompt};
pub use render::View;
pub use sound::SoundProvider;
pub use storage::{KeyValueStorage, MemoryStorage, SqliteStorage};
pub use store::TaskStore;
pub use task::{Task, TaskError, TaskId};
pub use time::human_time;
