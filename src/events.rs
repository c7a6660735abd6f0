//! Event output for external integrations.
//!
//! Lifecycle changes are emitted as JSON lines to stdout or a file.

use std::cell::RefCell;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::rc::Rc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::codec::TaskRecord;
use crate::engine::{Change, Observer, Startup};
use crate::error::{Error, Result};

pub const EVENT_SCHEMA_VERSION: &str = "daylist.event.v1";

#[derive(Debug, Clone)]
pub enum EventDestination {
    Stdout,
    File(PathBuf),
}

impl EventDestination {
    pub fn parse(raw: Option<&str>) -> Option<Self> {
        raw.and_then(|value| {
            let trimmed = value.trim();
            if trimmed.is_empty() {
                return None;
            }
            if trimmed == "-" {
                return Some(EventDestination::Stdout);
            }
            Some(EventDestination::File(PathBuf::from(trimmed)))
        })
    }

    pub fn open(&self) -> Result<EventSink> {
        match self {
            EventDestination::Stdout => Ok(EventSink::stdout()),
            EventDestination::File(path) => EventSink::file(path),
        }
    }
}

/// Event kinds emitted by daylist.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    DailyReset,
    TaskAdded,
    TaskChecked,
    TaskUnchecked,
    TaskArchived,
    TaskRestored,
    TaskDeleted,
}

impl From<&Change> for EventKind {
    fn from(change: &Change) -> Self {
        match change {
            Change::Added(_) => EventKind::TaskAdded,
            Change::Checked(_) => EventKind::TaskChecked,
            Change::Unchecked(_) => EventKind::TaskUnchecked,
            Change::Archived(_) => EventKind::TaskArchived,
            Change::Restored(_) => EventKind::TaskRestored,
            Change::Deleted(_) => EventKind::TaskDeleted,
        }
    }
}

/// A structured event with optional payload.
#[derive(Debug, Clone, Serialize)]
pub struct Event {
    pub schema_version: &'static str,
    pub event: EventKind,
    pub timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl Event {
    pub fn new(event: EventKind) -> Self {
        Self {
            schema_version: EVENT_SCHEMA_VERSION,
            event,
            timestamp: Utc::now(),
            data: None,
        }
    }

    /// Attach a serializable payload to the event.
    pub fn with_data<T: Serialize>(mut self, data: T) -> Result<Self> {
        self.data = Some(serde_json::to_value(data)?);
        Ok(self)
    }

    pub fn from_change(change: &Change) -> Result<Self> {
        Self::new(EventKind::from(change)).with_data(TaskRecord::from(change.task()))
    }

    pub fn from_startup(startup: &Startup) -> Result<Self> {
        Self::new(EventKind::DailyReset).with_data(startup)
    }
}

/// Event sink that writes JSONL output to a destination.
pub struct EventSink {
    writer: Box<dyn Write>,
}

impl EventSink {
    /// Emit events to stdout.
    pub fn stdout() -> Self {
        Self {
            writer: Box::new(std::io::stdout()),
        }
    }

    /// Emit events to a file, creating it if necessary.
    pub fn file(path: &Path) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        Ok(Self {
            writer: Box::new(file),
        })
    }

    /// Emit events into any writer.
    pub fn writer(writer: impl Write + 'static) -> Self {
        Self {
            writer: Box::new(writer),
        }
    }

    /// Write a single event as JSONL.
    pub fn emit(&mut self, event: &Event) -> Result<()> {
        let serialized = serde_json::to_vec(event)?;
        self.writer.write_all(&serialized)?;
        self.writer.write_all(b"\n")?;
        self.writer.flush().map_err(Error::Io)?;
        Ok(())
    }
}

/// Failures collected by an [`EventObserver`].
pub type EventWarnings = Rc<RefCell<Vec<String>>>;

/// Engine observer that forwards every change to an [`EventSink`].
///
/// Write failures are recorded as warnings instead of failing the
/// operation that produced the change.
pub struct EventObserver {
    sink: EventSink,
    warnings: EventWarnings,
}

impl EventObserver {
    pub fn new(sink: EventSink) -> Self {
        Self {
            sink,
            warnings: Rc::new(RefCell::new(Vec::new())),
        }
    }

    /// Shared handle to the warnings this observer records.
    pub fn warnings(&self) -> EventWarnings {
        Rc::clone(&self.warnings)
    }

    pub fn emit(&mut self, event: Result<Event>) {
        if let Err(err) = event.and_then(|event| self.sink.emit(&event)) {
            self.warnings
                .borrow_mut()
                .push(format!("event output failed: {err}"));
        }
    }
}

impl Observer for EventObserver {
    fn on_change(&mut self, change: &Change) {
        self.emit(Event::from_change(change));
    }
}
