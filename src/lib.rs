//! daylist - Daily, Scheduled and Reminder Task Lists
//!
//! This library keeps three kinds of tasks in plain JSON files and manages
//! their lifecycle: daily tasks are unchecked once per calendar day,
//! completed scheduled tasks and reminders move to a history, and history
//! entries can be restored.
//!
//! # Module Organization
//!
//! - `task`: Task entity model and structural identity
//! - `codec`: JSON encoding of task collections
//! - `storage`: File-backed store for the five collections and reset date
//! - `lock`: Atomic writes and the data directory lock
//! - `clock`: Source of "today"
//! - `engine`: Lifecycle engine (reset, archive, restore, delete, add)
//! - `view`: Sorted display lists derived from engine state
//! - `events`: JSONL lifecycle events for external integrations
//! - `config`: Configuration loading from `.daylist.toml`
//! - `output`: Human and JSON output for the CLI
//! - `cli`: Command-line interface using clap
//! - `error`: Error types and result aliases

pub mod cli;
pub mod clock;
pub mod codec;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod lock;
pub mod output;
pub mod storage;
pub mod task;
pub mod view;

pub use engine::{Change, Engine, Observer, Toggle};
pub use error::{Error, Result};
pub use storage::{Collection, Store};
pub use task::{KindTag, Task, TaskKind};
