//! Task entity model.
//!
//! A task is one of three shapes: a `Daily` task that recurs every day, a
//! one-off `Scheduled` task, or a one-off `Reminder`. The dated kinds carry
//! a calendar date; all kinds share the completion flag and date.
//!
//! Tasks have no generated identifier. Two tasks are the same entity when
//! their [`TaskKey`] matches, so identical duplicates cannot be told apart.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// Date format used on disk and on the command line.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Variant tag of a task, without the associated date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KindTag {
    Daily,
    Scheduled,
    Reminder,
}

impl KindTag {
    pub const ALL: [KindTag; 3] = [KindTag::Daily, KindTag::Scheduled, KindTag::Reminder];

    pub fn as_str(self) -> &'static str {
        match self {
            KindTag::Daily => "daily",
            KindTag::Scheduled => "scheduled",
            KindTag::Reminder => "reminder",
        }
    }

    /// Whether tasks of this kind carry a calendar date.
    pub fn is_dated(self) -> bool {
        !matches!(self, KindTag::Daily)
    }
}

impl fmt::Display for KindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KindTag {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(KindTag::Daily),
            "scheduled" => Ok(KindTag::Scheduled),
            "reminder" => Ok(KindTag::Reminder),
            other => Err(Error::InvalidArgument(format!(
                "invalid kind '{}': must be daily, scheduled, or reminder",
                other
            ))),
        }
    }
}

/// The kind of a task together with its associated date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskKind {
    Daily,
    Scheduled(NaiveDate),
    Reminder(NaiveDate),
}

impl TaskKind {
    pub fn tag(&self) -> KindTag {
        match self {
            TaskKind::Daily => KindTag::Daily,
            TaskKind::Scheduled(_) => KindTag::Scheduled,
            TaskKind::Reminder(_) => KindTag::Reminder,
        }
    }

    pub fn date(&self) -> Option<NaiveDate> {
        match self {
            TaskKind::Daily => None,
            TaskKind::Scheduled(date) | TaskKind::Reminder(date) => Some(*date),
        }
    }

    /// Build a kind from its tag and an optional date.
    ///
    /// Returns `None` when a dated kind has no date. A date passed for
    /// `Daily` is discarded.
    pub fn from_parts(tag: KindTag, date: Option<NaiveDate>) -> Option<Self> {
        match (tag, date) {
            (KindTag::Daily, _) => Some(TaskKind::Daily),
            (KindTag::Scheduled, Some(date)) => Some(TaskKind::Scheduled(date)),
            (KindTag::Reminder, Some(date)) => Some(TaskKind::Reminder(date)),
            (_, None) => None,
        }
    }
}

/// Structural identity of a task.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TaskKey {
    pub title: String,
    pub kind: KindTag,
    pub date: Option<NaiveDate>,
    pub completed_on: Option<NaiveDate>,
}

/// A single task.
///
/// Equality and hashing go through [`Task::key`]; the `completed` flag is
/// not part of identity.
#[derive(Debug, Clone)]
pub struct Task {
    pub title: String,
    pub kind: TaskKind,
    pub completed: bool,
    pub completed_on: Option<NaiveDate>,
}

impl Task {
    pub fn new(title: impl Into<String>, kind: TaskKind) -> Self {
        Self {
            title: title.into(),
            kind,
            completed: false,
            completed_on: None,
        }
    }

    pub fn daily(title: impl Into<String>) -> Self {
        Self::new(title, TaskKind::Daily)
    }

    pub fn scheduled(title: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(title, TaskKind::Scheduled(date))
    }

    pub fn reminder(title: impl Into<String>, date: NaiveDate) -> Self {
        Self::new(title, TaskKind::Reminder(date))
    }

    pub fn tag(&self) -> KindTag {
        self.kind.tag()
    }

    /// Associated date; `None` for daily tasks.
    pub fn date(&self) -> Option<NaiveDate> {
        self.kind.date()
    }

    pub fn key(&self) -> TaskKey {
        TaskKey {
            title: self.title.clone(),
            kind: self.tag(),
            date: self.date(),
            completed_on: self.completed_on,
        }
    }

    pub fn matches(&self, other: &Task) -> bool {
        self.title == other.title
            && self.kind == other.kind
            && self.completed_on == other.completed_on
    }

    pub(crate) fn mark_completed(&mut self, today: NaiveDate) {
        self.completed = true;
        self.completed_on = Some(today);
    }

    pub(crate) fn clear_completion(&mut self) {
        self.completed = false;
        self.completed_on = None;
    }
}

impl PartialEq for Task {
    fn eq(&self, other: &Self) -> bool {
        self.matches(other)
    }
}

impl Eq for Task {}

impl Hash for Task {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.key().hash(state);
    }
}

/// Parse a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(raw.trim(), DATE_FORMAT)
        .map_err(|_| Error::InvalidInput(format!("invalid date '{}': expected YYYY-MM-DD", raw)))
}

/// Render a calendar date in `YYYY-MM-DD` form.
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).expect("date")
    }

    #[test]
    fn daily_has_no_date() {
        let task = Task::daily("Water plants");
        assert_eq!(task.tag(), KindTag::Daily);
        assert_eq!(task.date(), None);
        assert!(!task.completed);
    }

    #[test]
    fn dated_kinds_expose_date() {
        let day = date("2024-05-01");
        assert_eq!(Task::scheduled("Dentist", day).date(), Some(day));
        assert_eq!(Task::reminder("Call mom", day).date(), Some(day));
    }

    #[test]
    fn equality_ignores_completed_flag() {
        let mut left = Task::daily("Stretch");
        let right = Task::daily("Stretch");
        left.completed = true;
        assert_eq!(left, right);
    }

    #[test]
    fn equality_uses_completion_date() {
        let day = date("2024-05-01");
        let mut left = Task::scheduled("Dentist", day);
        let right = Task::scheduled("Dentist", day);
        left.mark_completed(day);
        assert_ne!(left, right);
        assert_ne!(left.key(), right.key());
    }

    #[test]
    fn same_date_different_kind_differs() {
        let day = date("2024-05-01");
        assert_ne!(Task::scheduled("X", day), Task::reminder("X", day));
    }

    #[test]
    fn from_parts_requires_date_for_dated_kinds() {
        assert_eq!(TaskKind::from_parts(KindTag::Scheduled, None), None);
        assert_eq!(
            TaskKind::from_parts(KindTag::Daily, Some(date("2024-01-01"))),
            Some(TaskKind::Daily)
        );
    }

    #[test]
    fn kind_tag_parses_case_insensitively() {
        assert_eq!("Reminder".parse::<KindTag>().unwrap(), KindTag::Reminder);
        assert!("weekly".parse::<KindTag>().is_err());
    }

    #[test]
    fn parse_date_rejects_garbage() {
        assert!(matches!(parse_date("2024-02-30"), Err(Error::InvalidInput(_))));
        assert!(matches!(parse_date("tomorrow"), Err(Error::InvalidInput(_))));
    }
}
