//! Command-line interface for daylist
//!
//! This module defines the CLI structure using clap derive macros.
//! Command implementations live in [`task`].

use std::path::PathBuf;

use clap::{Parser, Subcommand};

use crate::error::Result;

mod task;

/// daylist - daily, scheduled and reminder task lists
///
/// Tasks are kept as JSON files in a data directory. Daily tasks are
/// unchecked once per day; completed scheduled tasks and reminders move
/// to a history they can be restored from.
#[derive(Parser, Debug)]
#[command(name = "daylist")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Directory holding the task files (defaults to `data`)
    #[arg(long, global = true, env = "DAYLIST_DATA_DIR")]
    pub data_dir: Option<PathBuf>,

    /// Path to a config file (defaults to `.daylist.toml`)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Treat this date (YYYY-MM-DD) as today
    #[arg(long, global = true, env = "DAYLIST_TODAY", hide = true)]
    pub today: Option<String>,

    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Suppress non-essential output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Enable debug logging when RUST_LOG is unset
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Emit lifecycle events as JSON lines to a file, or `-` for stdout
    #[arg(long, global = true)]
    pub events: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Show the active daily, scheduled and reminder lists
    List,

    /// Add a task
    Add {
        /// Task title
        title: String,

        /// Kind: daily, scheduled, reminder
        #[arg(long, default_value = "daily")]
        kind: String,

        /// Date for scheduled tasks and reminders (YYYY-MM-DD)
        #[arg(long)]
        date: Option<String>,
    },

    /// Mark a task as done
    Check {
        /// Kind: daily, scheduled, reminder
        kind: String,

        /// Position in the list shown by `daylist list`
        position: usize,
    },

    /// Mark a task as not done
    Uncheck {
        /// Kind: daily, scheduled, reminder
        kind: String,

        /// Position in the list shown by `daylist list`
        position: usize,
    },

    /// Delete an active task without keeping history
    Delete {
        /// Kind: daily, scheduled, reminder
        kind: String,

        /// Position in the list shown by `daylist list`
        position: usize,
    },

    /// Show completed scheduled tasks and reminders
    History,

    /// Move a completed task back to its active list
    Restore {
        /// Kind: scheduled, reminder
        kind: String,

        /// Position in the list shown by `daylist history`
        position: usize,
    },
}

impl Commands {
    /// Command name used in output envelopes
    pub fn name(&self) -> &'static str {
        match self {
            Commands::List => "list",
            Commands::Add { .. } => "add",
            Commands::Check { .. } => "check",
            Commands::Uncheck { .. } => "uncheck",
            Commands::Delete { .. } => "delete",
            Commands::History => "history",
            Commands::Restore { .. } => "restore",
        }
    }
}

impl Cli {
    /// Execute the CLI command
    pub fn run(self) -> Result<()> {
        let global = task::GlobalOptions {
            data_dir: self.data_dir,
            config: self.config,
            today: self.today,
            events: self.events,
            json: self.json,
            quiet: self.quiet,
        };

        match self.command {
            Commands::List => task::run_list(global),
            Commands::Add { title, kind, date } => task::run_add(task::AddOptions {
                title,
                kind,
                date,
                global,
            }),
            Commands::Check { kind, position } => task::run_toggle(task::ToggleOptions {
                kind,
                position,
                completed: true,
                global,
            }),
            Commands::Uncheck { kind, position } => task::run_toggle(task::ToggleOptions {
                kind,
                position,
                completed: false,
                global,
            }),
            Commands::Delete { kind, position } => task::run_delete(task::PickOptions {
                kind,
                position,
                global,
            }),
            Commands::History => task::run_history(global),
            Commands::Restore { kind, position } => task::run_restore(task::PickOptions {
                kind,
                position,
                global,
            }),
        }
    }
}
