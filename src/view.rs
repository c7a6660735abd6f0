//! Display lists derived from engine state.
//!
//! Daily tasks keep insertion order. Dated tasks are ordered by their
//! associated date; the sort is stable, so equal dates keep insertion order.

use chrono::NaiveDate;

use crate::engine::{ActiveTasks, DoneTasks};
use crate::task::{KindTag, Task};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ActiveView {
    pub daily: Vec<Task>,
    pub scheduled: Vec<Task>,
    pub reminder: Vec<Task>,
}

impl ActiveView {
    pub fn of(&self, kind: KindTag) -> &[Task] {
        match kind {
            KindTag::Daily => &self.daily,
            KindTag::Scheduled => &self.scheduled,
            KindTag::Reminder => &self.reminder,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryEntry {
    pub task: Task,
    /// The task's date is the current date.
    pub is_today: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HistoryView {
    pub scheduled: Vec<HistoryEntry>,
    pub reminder: Vec<HistoryEntry>,
}

impl HistoryView {
    /// History list for `kind`; empty for daily.
    pub fn of(&self, kind: KindTag) -> &[HistoryEntry] {
        match kind {
            KindTag::Daily => &[],
            KindTag::Scheduled => &self.scheduled,
            KindTag::Reminder => &self.reminder,
        }
    }
}

pub fn active_view(active: &ActiveTasks) -> ActiveView {
    ActiveView {
        daily: active.daily.clone(),
        scheduled: sorted_by_date(&active.scheduled),
        reminder: sorted_by_date(&active.reminder),
    }
}

pub fn history_view(done: &DoneTasks, today: NaiveDate) -> HistoryView {
    let entries = |tasks: &[Task]| -> Vec<HistoryEntry> {
        sorted_by_date(tasks)
            .into_iter()
            .map(|task| HistoryEntry {
                is_today: is_today(&task, today),
                task,
            })
            .collect()
    };

    HistoryView {
        scheduled: entries(done.of(KindTag::Scheduled)),
        reminder: entries(done.of(KindTag::Reminder)),
    }
}

pub fn is_today(task: &Task, today: NaiveDate) -> bool {
    task.date() == Some(today)
}

fn sorted_by_date(tasks: &[Task]) -> Vec<Task> {
    let mut sorted = tasks.to_vec();
    sorted.sort_by_key(|task| task.date());
    sorted
}
