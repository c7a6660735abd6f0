//! Storage layer for daylist
//!
//! Every collection lives in its own JSON file and is rewritten in full on
//! each save. There is no cross-file transaction: callers that touch two
//! collections for one logical change must order the writes themselves.
//!
//! # Directory Structure
//!
//! ```text
//! data/
//!   daily.json              # Active daily tasks
//!   scheduled.json          # Active scheduled tasks
//!   reminder.json           # Active reminders
//!   scheduled_done.json     # Completed scheduled tasks
//!   reminder_done.json      # Completed reminders
//!   last_update.txt         # Date of the last daily reset (YYYY-MM-DD)
//!   .lock                   # Session lock (see `lock`)
//! ```

use std::fmt;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use tracing::debug;

use crate::codec;
use crate::error::{Error, Result};
use crate::lock::{self, FileLock};
use crate::task::{format_date, KindTag, Task, DATE_FORMAT};

/// Default name of the data directory
pub const DEFAULT_DATA_DIR: &str = "data";

const LAST_RESET_FILE: &str = "last_update.txt";
const LOCK_FILE: &str = ".lock";

/// One of the five persisted task collections.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    ActiveDaily,
    ActiveScheduled,
    ActiveReminder,
    DoneScheduled,
    DoneReminder,
}

impl Collection {
    pub const ALL: [Collection; 5] = [
        Collection::ActiveDaily,
        Collection::ActiveScheduled,
        Collection::ActiveReminder,
        Collection::DoneScheduled,
        Collection::DoneReminder,
    ];

    /// Active collection holding tasks of `kind`
    pub fn active(kind: KindTag) -> Self {
        match kind {
            KindTag::Daily => Collection::ActiveDaily,
            KindTag::Scheduled => Collection::ActiveScheduled,
            KindTag::Reminder => Collection::ActiveReminder,
        }
    }

    /// History collection for `kind`; daily tasks have none
    pub fn done(kind: KindTag) -> Option<Self> {
        match kind {
            KindTag::Daily => None,
            KindTag::Scheduled => Some(Collection::DoneScheduled),
            KindTag::Reminder => Some(Collection::DoneReminder),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Collection::ActiveDaily => "active-daily",
            Collection::ActiveScheduled => "active-scheduled",
            Collection::ActiveReminder => "active-reminder",
            Collection::DoneScheduled => "done-scheduled",
            Collection::DoneReminder => "done-reminder",
        }
    }

    pub fn file_name(self) -> &'static str {
        match self {
            Collection::ActiveDaily => "daily.json",
            Collection::ActiveScheduled => "scheduled.json",
            Collection::ActiveReminder => "reminder.json",
            Collection::DoneScheduled => "scheduled_done.json",
            Collection::DoneReminder => "reminder_done.json",
        }
    }

    /// Kind of every task stored in this collection
    pub fn kind(self) -> KindTag {
        match self {
            Collection::ActiveDaily => KindTag::Daily,
            Collection::ActiveScheduled | Collection::DoneScheduled => KindTag::Scheduled,
            Collection::ActiveReminder | Collection::DoneReminder => KindTag::Reminder,
        }
    }

    pub fn is_done(self) -> bool {
        matches!(self, Collection::DoneScheduled | Collection::DoneReminder)
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// File-backed store for the task collections
#[derive(Debug, Clone)]
pub struct Store {
    data_dir: PathBuf,
    /// Saves allowed before every further save fails; `None` is unlimited.
    #[cfg(test)]
    write_budget: std::cell::Cell<Option<usize>>,
}

impl Store {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            #[cfg(test)]
            write_budget: std::cell::Cell::new(None),
        }
    }

    /// Let `count` more saves through, then fail every save as if the
    /// process had died at that point.
    #[cfg(test)]
    pub(crate) fn fail_writes_after(&self, count: usize) {
        self.write_budget.set(Some(count));
    }

    #[cfg(test)]
    fn spend_write(&self) -> Result<()> {
        match self.write_budget.get() {
            Some(0) => Err(Error::Io(io::Error::new(
                io::ErrorKind::Other,
                "write budget exhausted",
            ))),
            Some(left) => {
                self.write_budget.set(Some(left - 1));
                Ok(())
            }
            None => Ok(()),
        }
    }

    // =========================================================================
    // Path accessors
    // =========================================================================

    pub fn data_dir(&self) -> &Path {
        &self.data_dir
    }

    pub fn collection_file(&self, collection: Collection) -> PathBuf {
        self.data_dir.join(collection.file_name())
    }

    pub fn last_reset_file(&self) -> PathBuf {
        self.data_dir.join(LAST_RESET_FILE)
    }

    pub fn lock_file(&self) -> PathBuf {
        self.data_dir.join(LOCK_FILE)
    }

    /// Take the exclusive session lock on the data directory
    pub fn lock(&self, timeout_ms: u64) -> Result<FileLock> {
        FileLock::acquire(self.lock_file(), timeout_ms)
    }

    // =========================================================================
    // Collections
    // =========================================================================

    /// Load a collection; a missing file is an empty collection.
    pub fn load(&self, collection: Collection) -> Result<Vec<Task>> {
        let path = self.collection_file(collection);
        let text = match read_optional(&path)? {
            Some(text) => text,
            None => {
                debug!(collection = %collection, "collection file absent, treating as empty");
                return Ok(Vec::new());
            }
        };

        let tasks = codec::decode(&text).map_err(|err| match err {
            Error::Json(source) => Error::CorruptStore {
                path: path.clone(),
                reason: source.to_string(),
            },
            other => other.in_file(&path),
        })?;

        for (index, task) in tasks.iter().enumerate() {
            if task.tag() != collection.kind() {
                return Err(Error::malformed(
                    index,
                    format!("{} task stored in {}", task.tag(), collection.file_name()),
                )
                .in_file(&path));
            }
            if collection.is_done() && !task.completed {
                return Err(Error::malformed(
                    index,
                    format!("uncompleted task stored in {}", collection.file_name()),
                )
                .in_file(&path));
            }
        }

        debug!(collection = %collection, count = tasks.len(), "loaded collection");
        Ok(tasks)
    }

    /// Replace a collection with `tasks`.
    pub fn save(&self, collection: Collection, tasks: &[Task]) -> Result<()> {
        #[cfg(test)]
        self.spend_write()?;

        let text = codec::encode(tasks)?;
        lock::write_atomic_str(self.collection_file(collection), &text)?;
        debug!(collection = %collection, count = tasks.len(), "saved collection");
        Ok(())
    }

    // =========================================================================
    // Last reset date
    // =========================================================================

    pub fn read_last_reset_date(&self) -> Result<Option<NaiveDate>> {
        let path = self.last_reset_file();
        let text = match read_optional(&path)? {
            Some(text) => text,
            None => return Ok(None),
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Ok(None);
        }

        NaiveDate::parse_from_str(trimmed, DATE_FORMAT)
            .map(Some)
            .map_err(|err| Error::CorruptStore {
                path,
                reason: format!("invalid reset date '{}': {}", trimmed, err),
            })
    }

    pub fn write_last_reset_date(&self, date: NaiveDate) -> Result<()> {
        lock::write_atomic_str(self.last_reset_file(), &format_date(date))?;
        debug!(date = %date, "recorded last reset date");
        Ok(())
    }
}

fn read_optional(path: &Path) -> Result<Option<String>> {
    match fs::read_to_string(path) {
        Ok(text) => Ok(Some(text)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(Error::Io(err)),
    }
}
