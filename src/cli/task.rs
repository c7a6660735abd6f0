//! daylist command implementations.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Serialize;

use crate::clock::{Clock, FixedClock, SystemClock};
use crate::codec::TaskRecord;
use crate::config::Config;
use crate::engine::{Engine, Toggle};
use crate::error::{Error, Result};
use crate::events::{Event, EventDestination, EventObserver, EventWarnings};
use crate::lock::FileLock;
use crate::output::{emit_success, HumanOutput, OutputOptions};
use crate::storage::Store;
use crate::task::{format_date, parse_date, KindTag, Task};
use crate::view::{active_view, history_view, HistoryEntry};

pub struct GlobalOptions {
    pub data_dir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub today: Option<String>,
    pub events: Option<String>,
    pub json: bool,
    pub quiet: bool,
}

pub struct AddOptions {
    pub title: String,
    pub kind: String,
    pub date: Option<String>,
    pub global: GlobalOptions,
}

pub struct ToggleOptions {
    pub kind: String,
    pub position: usize,
    pub completed: bool,
    pub global: GlobalOptions,
}

pub struct PickOptions {
    pub kind: String,
    pub position: usize,
    pub global: GlobalOptions,
}

/// A task as shown to the user, with its 1-based list position.
#[derive(Debug, Serialize)]
struct ListedTask {
    position: usize,
    #[serde(flatten)]
    record: TaskRecord,
    #[serde(skip_serializing_if = "Option::is_none")]
    today: Option<bool>,
}

#[derive(Debug, Serialize)]
struct ListOutput {
    today: NaiveDate,
    reset_performed: bool,
    daily: Vec<ListedTask>,
    scheduled: Vec<ListedTask>,
    reminder: Vec<ListedTask>,
}

#[derive(Debug, Serialize)]
struct HistoryOutput {
    today: NaiveDate,
    scheduled: Vec<ListedTask>,
    reminder: Vec<ListedTask>,
}

#[derive(Debug, Serialize)]
struct TaskOutput {
    outcome: &'static str,
    task: TaskRecord,
}

struct Session {
    engine: Engine,
    event_warnings: Option<EventWarnings>,
    events_to_stdout: bool,
    _lock: FileLock,
}

impl Session {
    fn output_options(&self, global: &GlobalOptions) -> OutputOptions {
        OutputOptions {
            json: global.json && !self.events_to_stdout,
            quiet: global.quiet || self.events_to_stdout,
        }
    }

    fn drain_warnings(&self, human: &mut HumanOutput) {
        if let Some(warnings) = &self.event_warnings {
            human.extend_warnings(warnings.borrow_mut().drain(..));
        }
    }
}

pub fn run_list(global: GlobalOptions) -> Result<()> {
    let session = open_session(&global)?;
    let view = active_view(session.engine.active());
    let startup = session.engine.startup();

    let output = ListOutput {
        today: startup.today,
        reset_performed: startup.reset_performed,
        daily: listed(&view.daily),
        scheduled: listed(&view.scheduled),
        reminder: listed(&view.reminder),
    };

    let mut human = HumanOutput::new(format!("Tasks for {}", format_date(startup.today)));
    if startup.dropped_stray > 0 {
        human.push_warning(format!(
            "dropped {} completed task(s) left in active lists",
            startup.dropped_stray
        ));
    }
    human.push_section("Daily", view.daily.iter().enumerate().map(task_line).collect());
    human.push_section(
        "Scheduled",
        view.scheduled.iter().enumerate().map(task_line).collect(),
    );
    human.push_section(
        "Reminders",
        view.reminder.iter().enumerate().map(task_line).collect(),
    );
    session.drain_warnings(&mut human);

    emit_success(session.output_options(&global), "list", &output, Some(&human))
}

pub fn run_add(options: AddOptions) -> Result<()> {
    let kind: KindTag = options.kind.parse()?;
    let mut session = open_session(&options.global)?;
    let task = session
        .engine
        .add(&options.title, kind, options.date.as_deref())?;

    let mut human = HumanOutput::new("Task added");
    human.push_summary("Title", task.title.clone());
    human.push_summary("Kind", kind.to_string());
    if let Some(date) = task.date() {
        human.push_summary("Date", format_date(date));
    }
    session.drain_warnings(&mut human);

    let output = TaskOutput {
        outcome: "added",
        task: TaskRecord::from(&task),
    };
    emit_success(
        session.output_options(&options.global),
        "add",
        &output,
        Some(&human),
    )
}

pub fn run_toggle(options: ToggleOptions) -> Result<()> {
    let kind: KindTag = options.kind.parse()?;
    let mut session = open_session(&options.global)?;
    let view = active_view(session.engine.active());
    let target = pick(view.of(kind), kind, options.position)?;

    let command = if options.completed { "check" } else { "uncheck" };
    let (outcome, task, header) = match session.engine.toggle_complete(&target, options.completed)? {
        Toggle::Archived(task) => ("archived", task, "Task completed and moved to history"),
        Toggle::Updated(task) if task.completed => ("updated", task, "Task checked"),
        Toggle::Updated(task) => ("updated", task, "Task unchecked"),
        Toggle::NotFound => ("not_found", target, "Task no longer active"),
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("Title", task.title.clone());
    human.push_summary("Kind", kind.to_string());
    if let Some(done) = task.completed_on {
        human.push_summary("Completed", format_date(done));
    }
    session.drain_warnings(&mut human);

    let output = TaskOutput {
        outcome,
        task: TaskRecord::from(&task),
    };
    emit_success(
        session.output_options(&options.global),
        command,
        &output,
        Some(&human),
    )
}

pub fn run_delete(options: PickOptions) -> Result<()> {
    let kind: KindTag = options.kind.parse()?;
    let mut session = open_session(&options.global)?;
    let view = active_view(session.engine.active());
    let target = pick(view.of(kind), kind, options.position)?;

    let deleted = session.engine.delete(&target)?;
    let (outcome, header) = if deleted {
        ("deleted", "Task deleted")
    } else {
        ("not_found", "Task no longer active")
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("Title", target.title.clone());
    human.push_summary("Kind", kind.to_string());
    session.drain_warnings(&mut human);

    let output = TaskOutput {
        outcome,
        task: TaskRecord::from(&target),
    };
    emit_success(
        session.output_options(&options.global),
        "delete",
        &output,
        Some(&human),
    )
}

pub fn run_history(global: GlobalOptions) -> Result<()> {
    let session = open_session(&global)?;
    let today = session.engine.today();
    let view = history_view(&session.engine.history()?, today);

    let output = HistoryOutput {
        today,
        scheduled: listed_history(&view.scheduled),
        reminder: listed_history(&view.reminder),
    };

    let mut human = HumanOutput::new("History");
    human.push_section(
        "Scheduled",
        view.scheduled.iter().enumerate().map(history_line).collect(),
    );
    human.push_section(
        "Reminders",
        view.reminder.iter().enumerate().map(history_line).collect(),
    );
    session.drain_warnings(&mut human);

    emit_success(session.output_options(&global), "history", &output, Some(&human))
}

pub fn run_restore(options: PickOptions) -> Result<()> {
    let kind: KindTag = options.kind.parse()?;
    if !kind.is_dated() {
        return Err(Error::InvalidArgument(
            "daily tasks have no history to restore from".to_string(),
        ));
    }

    let mut session = open_session(&options.global)?;
    let view = history_view(&session.engine.history()?, session.engine.today());
    let entries: Vec<Task> = view.of(kind).iter().map(|entry| entry.task.clone()).collect();
    let target = pick(&entries, kind, options.position)?;

    let restored = session.engine.restore(&target)?;
    let (outcome, header) = if restored {
        ("restored", "Task restored")
    } else {
        ("not_found", "Task no longer in history")
    };

    let mut human = HumanOutput::new(header);
    human.push_summary("Title", target.title.clone());
    human.push_summary("Kind", kind.to_string());
    session.drain_warnings(&mut human);

    let output = TaskOutput {
        outcome,
        task: TaskRecord::from(&target),
    };
    emit_success(
        session.output_options(&options.global),
        "restore",
        &output,
        Some(&human),
    )
}

fn open_session(global: &GlobalOptions) -> Result<Session> {
    let cwd = std::env::current_dir()?;
    let (config, config_base) = match &global.config {
        Some(path) => {
            let base = path.parent().map(Path::to_path_buf).unwrap_or_else(|| cwd.clone());
            (Config::load(path)?, base)
        }
        None => (Config::load_from_dir(&cwd), cwd),
    };
    let data_dir = match &global.data_dir {
        Some(dir) => dir.clone(),
        None => config.data_dir_in(&config_base),
    };

    let today = match global.today.as_deref() {
        Some(raw) => parse_date(raw)?,
        None => SystemClock.today(),
    };

    let store = Store::new(data_dir);
    let lock = store.lock(config.storage.lock_timeout_ms)?;
    let mut engine = Engine::initialize(store, FixedClock(today))?;

    let destination = EventDestination::parse(global.events.as_deref());
    let events_to_stdout = matches!(destination, Some(EventDestination::Stdout));
    let event_warnings = match destination {
        Some(destination) => {
            let mut observer = EventObserver::new(destination.open()?);
            let startup = engine.startup();
            if startup.reset_performed {
                observer.emit(Event::from_startup(&startup));
            }
            let warnings = observer.warnings();
            engine.subscribe(Box::new(observer));
            Some(warnings)
        }
        None => None,
    };

    Ok(Session {
        engine,
        event_warnings,
        events_to_stdout,
        _lock: lock,
    })
}

fn pick(tasks: &[Task], kind: KindTag, position: usize) -> Result<Task> {
    if position == 0 {
        return Err(Error::InvalidArgument(
            "positions start at 1".to_string(),
        ));
    }
    tasks
        .get(position - 1)
        .cloned()
        .ok_or_else(|| Error::TaskNotFound(format!("{} #{}", kind, position)))
}

fn listed(tasks: &[Task]) -> Vec<ListedTask> {
    tasks
        .iter()
        .enumerate()
        .map(|(index, task)| ListedTask {
            position: index + 1,
            record: TaskRecord::from(task),
            today: None,
        })
        .collect()
}

fn listed_history(entries: &[HistoryEntry]) -> Vec<ListedTask> {
    entries
        .iter()
        .enumerate()
        .map(|(index, entry)| ListedTask {
            position: index + 1,
            record: TaskRecord::from(&entry.task),
            today: Some(entry.is_today),
        })
        .collect()
}

fn task_line((index, task): (usize, &Task)) -> String {
    let mark = if task.completed { "x" } else { " " };
    match task.date() {
        Some(date) => format!("{}. [{}] {} ({})", index + 1, mark, task.title, format_date(date)),
        None => format!("{}. [{}] {}", index + 1, mark, task.title),
    }
}

fn history_line((index, entry): (usize, &HistoryEntry)) -> String {
    let highlight = if entry.is_today { "*" } else { " " };
    let date = entry.task.date().map(format_date).unwrap_or_default();
    let done = entry
        .task
        .completed_on
        .map(|day| format!(", done {}", format_date(day)))
        .unwrap_or_default();
    format!("{}. {} {} ({}{})", index + 1, highlight, entry.task.title, date, done)
}
