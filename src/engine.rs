//! Task lifecycle engine.
//!
//! The engine owns the in-memory working set of active tasks and drives
//! every state transition through the [`Store`]:
//!
//! ```text
//! Active(open) --check--> Active(done) --archive--> Archived   (scheduled, reminder)
//! Active(open) <-check/uncheck-> Active(done)                  (daily, reset nightly)
//! Archived --restore--> Active(open)
//! Active(any) --delete--> Deleted
//! ```
//!
//! Collections are saved one file at a time. A transition that touches an
//! active and a history collection first writes the task into the active
//! collection in its completed form. [`Engine::initialize`] moves every
//! completed scheduled or reminder task it finds in an active collection
//! into history (unless history already holds it), so a crash after any
//! single write of archive or restore leaves the task in exactly one place:
//!
//! ```text
//! archive:  active+completed copy -> history+task -> active-task
//! restore:  active+completed copy -> history-task -> active copy cleared
//! ```
//!
//! An interrupted archive completes on the next start; an interrupted
//! restore is rolled back and the task stays in history.

use std::fmt;

use chrono::NaiveDate;
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::clock::Clock;
use crate::error::{Error, Result};
use crate::storage::{Collection, Store};
use crate::task::{parse_date, KindTag, Task, TaskKind};

/// A change applied by one engine operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Change {
    Added(Task),
    Checked(Task),
    Unchecked(Task),
    Archived(Task),
    Restored(Task),
    Deleted(Task),
}

impl Change {
    pub fn task(&self) -> &Task {
        match self {
            Change::Added(task)
            | Change::Checked(task)
            | Change::Unchecked(task)
            | Change::Archived(task)
            | Change::Restored(task)
            | Change::Deleted(task) => task,
        }
    }
}

/// Receives every change the engine applies.
pub trait Observer {
    fn on_change(&mut self, change: &Change);
}

impl<F> Observer for F
where
    F: FnMut(&Change),
{
    fn on_change(&mut self, change: &Change) {
        self(change)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

/// Active tasks grouped by kind, each in insertion order.
#[derive(Debug, Clone, Default)]
pub struct ActiveTasks {
    pub daily: Vec<Task>,
    pub scheduled: Vec<Task>,
    pub reminder: Vec<Task>,
}

impl ActiveTasks {
    pub fn of(&self, kind: KindTag) -> &[Task] {
        match kind {
            KindTag::Daily => &self.daily,
            KindTag::Scheduled => &self.scheduled,
            KindTag::Reminder => &self.reminder,
        }
    }

    fn of_mut(&mut self, kind: KindTag) -> &mut Vec<Task> {
        match kind {
            KindTag::Daily => &mut self.daily,
            KindTag::Scheduled => &mut self.scheduled,
            KindTag::Reminder => &mut self.reminder,
        }
    }

    pub fn len(&self) -> usize {
        self.daily.len() + self.scheduled.len() + self.reminder.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn contains(&self, task: &Task) -> bool {
        self.of(task.tag()).iter().any(|entry| entry.matches(task))
    }
}

/// Snapshot of both history collections.
#[derive(Debug, Clone, Default)]
pub struct DoneTasks {
    pub scheduled: Vec<Task>,
    pub reminder: Vec<Task>,
}

impl DoneTasks {
    pub fn of(&self, kind: KindTag) -> &[Task] {
        match kind {
            KindTag::Daily => &[],
            KindTag::Scheduled => &self.scheduled,
            KindTag::Reminder => &self.reminder,
        }
    }
}

/// What [`Engine::initialize`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Startup {
    pub today: NaiveDate,
    pub reset_performed: bool,
    pub cleared: usize,
    pub dropped_stray: usize,
}

/// Outcome of [`Engine::toggle_complete`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Toggle {
    /// The task stayed active with its new flag.
    Updated(Task),
    /// The task moved to its history collection; carries the archived copy.
    Archived(Task),
    /// No active task matched.
    NotFound,
}

pub struct Engine {
    store: Store,
    clock: Box<dyn Clock>,
    active: ActiveTasks,
    startup: Startup,
    observers: Vec<(SubscriptionId, Box<dyn Observer>)>,
    next_subscription: u64,
}

impl fmt::Debug for Engine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Engine")
            .field("store", &self.store)
            .field("active", &self.active)
            .field("startup", &self.startup)
            .field("observers", &self.observers.len())
            .finish()
    }
}

impl Engine {
    /// Load the active collections and bring them up to date for today.
    ///
    /// Completed scheduled/reminder tasks found in an active collection are
    /// dropped (and written to history first if history lacks them). When
    /// the stored reset date is not today, every daily task is unchecked
    /// and today becomes the reset date.
    pub fn initialize(store: Store, clock: impl Clock + 'static) -> Result<Self> {
        let today = clock.today();
        let mut startup = Startup {
            today,
            reset_performed: false,
            cleared: 0,
            dropped_stray: 0,
        };

        let mut active = ActiveTasks::default();
        for kind in KindTag::ALL {
            let mut tasks = store.load(Collection::active(kind))?;
            if let Some(done_collection) = Collection::done(kind) {
                startup.dropped_stray += drop_stray_completed(&store, kind, done_collection, &mut tasks)?;
            }
            *active.of_mut(kind) = tasks;
        }

        let last_reset = store.read_last_reset_date()?;
        if last_reset != Some(today) {
            let mut cleared = 0;
            for task in active.daily.iter_mut() {
                if task.completed || task.completed_on.is_some() {
                    task.clear_completion();
                    cleared += 1;
                }
            }
            if cleared > 0 {
                store.save(Collection::ActiveDaily, &active.daily)?;
            }
            store.write_last_reset_date(today)?;
            info!(
                previous = ?last_reset,
                today = %today,
                cleared,
                "daily tasks reset"
            );
            startup.reset_performed = true;
            startup.cleared = cleared;
        }

        Ok(Self {
            store,
            clock: Box::new(clock),
            active,
            startup,
            observers: Vec::new(),
            next_subscription: 0,
        })
    }

    pub fn store(&self) -> &Store {
        &self.store
    }

    pub fn startup(&self) -> Startup {
        self.startup
    }

    pub fn today(&self) -> NaiveDate {
        self.clock.today()
    }

    /// Current active tasks.
    pub fn active(&self) -> &ActiveTasks {
        &self.active
    }

    /// Load both history collections.
    pub fn history(&self) -> Result<DoneTasks> {
        Ok(DoneTasks {
            scheduled: self.store.load(Collection::DoneScheduled)?,
            reminder: self.store.load(Collection::DoneReminder)?,
        })
    }

    // =========================================================================
    // Observers
    // =========================================================================

    pub fn subscribe(&mut self, observer: Box<dyn Observer>) -> SubscriptionId {
        let id = SubscriptionId(self.next_subscription);
        self.next_subscription += 1;
        self.observers.push((id, observer));
        id
    }

    /// Returns false when `id` was not subscribed.
    pub fn unsubscribe(&mut self, id: SubscriptionId) -> bool {
        let before = self.observers.len();
        self.observers.retain(|(entry, _)| *entry != id);
        self.observers.len() != before
    }

    fn notify(&mut self, change: Change) {
        for (_, observer) in self.observers.iter_mut() {
            observer.on_change(&change);
        }
    }

    // =========================================================================
    // Operations
    // =========================================================================

    /// Create a new active task.
    ///
    /// `date` is required for scheduled and reminder tasks and ignored for
    /// daily ones. Nothing is written when validation fails.
    pub fn add(&mut self, title: &str, kind: KindTag, date: Option<&str>) -> Result<Task> {
        let title = title.trim();
        if title.is_empty() {
            return Err(Error::InvalidInput("title cannot be blank".to_string()));
        }

        let date = match (kind.is_dated(), date) {
            (false, _) => None,
            (true, Some(raw)) => Some(parse_date(raw)?),
            (true, None) => {
                return Err(Error::InvalidInput(format!("{} task requires a date", kind)));
            }
        };
        let kind = TaskKind::from_parts(kind, date)
            .ok_or_else(|| Error::InvalidInput(format!("{} task requires a date", kind)))?;

        let task = Task::new(title, kind);
        let tag = task.tag();
        let mut tasks = self.active.of(tag).to_vec();
        tasks.push(task.clone());
        self.store.save(Collection::active(tag), &tasks)?;
        *self.active.of_mut(tag) = tasks;

        debug!(title = %task.title, kind = %tag, "task added");
        self.notify(Change::Added(task.clone()));
        Ok(task)
    }

    /// Set the completion flag of an active task.
    ///
    /// Checking a scheduled or reminder task archives it. Unchecking one is
    /// a flag flip on the working set only: such a task is never stored as
    /// completed in an active collection, so there is nothing to write.
    pub fn toggle_complete(&mut self, task: &Task, completed: bool) -> Result<Toggle> {
        let kind = task.tag();
        let index = match self.position(task) {
            Some(index) => index,
            None => {
                debug!(title = %task.title, kind = %kind, "toggle target not active");
                return Ok(Toggle::NotFound);
            }
        };

        match (completed, Collection::done(kind)) {
            (true, Some(done_collection)) => self.archive(kind, index, done_collection),
            (true, None) => {
                let today = self.today();
                self.update_daily(index, |task| task.mark_completed(today))
                    .map(|task| {
                        self.notify(Change::Checked(task.clone()));
                        Toggle::Updated(task)
                    })
            }
            (false, None) => self.update_daily(index, Task::clear_completion).map(|task| {
                self.notify(Change::Unchecked(task.clone()));
                Toggle::Updated(task)
            }),
            (false, Some(_)) => {
                let entry = &mut self.active.of_mut(kind)[index];
                entry.completed = false;
                let task = entry.clone();
                self.notify(Change::Unchecked(task.clone()));
                Ok(Toggle::Updated(task))
            }
        }
    }

    /// Move an archived task back to its active collection.
    ///
    /// Returns false when history holds no matching task.
    pub fn restore(&mut self, task: &Task) -> Result<bool> {
        let kind = task.tag();
        let done_collection = match Collection::done(kind) {
            Some(collection) => collection,
            None => return Ok(false),
        };

        let mut done = self.store.load(done_collection)?;
        let index = match done.iter().position(|entry| entry.matches(task)) {
            Some(index) => index,
            None => {
                debug!(title = %task.title, kind = %kind, "restore target not in history");
                return Ok(false);
            }
        };

        let archived = done.remove(index);
        let mut restored = archived.clone();
        restored.clear_completion();

        let mut tasks = self.active.of(kind).to_vec();
        tasks.push(archived);
        self.store.save(Collection::active(kind), &tasks)?;
        self.store.save(done_collection, &done)?;

        // History no longer holds the task; the working set must.
        if let Some(last) = tasks.last_mut() {
            *last = restored.clone();
        }
        *self.active.of_mut(kind) = tasks;
        self.store.save(Collection::active(kind), self.active.of(kind))?;

        info!(title = %restored.title, kind = %kind, "task restored");
        self.notify(Change::Restored(restored));
        Ok(true)
    }

    /// Remove an active task without recording history.
    ///
    /// Returns false when no active task matched.
    pub fn delete(&mut self, task: &Task) -> Result<bool> {
        let kind = task.tag();
        let index = match self.position(task) {
            Some(index) => index,
            None => return Ok(false),
        };

        let mut tasks = self.active.of(kind).to_vec();
        let removed = tasks.remove(index);
        self.store.save(Collection::active(kind), &tasks)?;
        *self.active.of_mut(kind) = tasks;

        debug!(title = %removed.title, kind = %kind, "task deleted");
        self.notify(Change::Deleted(removed));
        Ok(true)
    }

    // =========================================================================
    // Internals
    // =========================================================================

    fn position(&self, task: &Task) -> Option<usize> {
        self.active
            .of(task.tag())
            .iter()
            .position(|entry| entry.matches(task))
    }

    fn update_daily<F>(&mut self, index: usize, mutate: F) -> Result<Task>
    where
        F: FnOnce(&mut Task),
    {
        let mut tasks = self.active.daily.clone();
        mutate(&mut tasks[index]);
        let task = tasks[index].clone();
        self.store.save(Collection::ActiveDaily, &tasks)?;
        self.active.daily = tasks;
        Ok(task)
    }

    fn archive(&mut self, kind: KindTag, index: usize, done_collection: Collection) -> Result<Toggle> {
        let mut archived = self.active.of(kind)[index].clone();
        archived.mark_completed(self.today());

        let mut marked = self.active.of(kind).to_vec();
        marked[index] = archived.clone();
        self.store.save(Collection::active(kind), &marked)?;

        let mut done = self.store.load(done_collection)?;
        done.push(archived.clone());
        self.store.save(done_collection, &done)?;

        // The task is archived from here on, even if the active write fails.
        self.active.of_mut(kind).remove(index);
        self.store.save(Collection::active(kind), self.active.of(kind))?;

        info!(title = %archived.title, kind = %kind, "task archived");
        self.notify(Change::Archived(archived.clone()));
        Ok(Toggle::Archived(archived))
    }
}

/// Move completed tasks out of a dated active collection.
///
/// These are left behind by an interrupted archive or restore. Tasks
/// history does not already hold are appended to it before the active
/// collection is rewritten without them.
fn drop_stray_completed(
    store: &Store,
    kind: KindTag,
    done_collection: Collection,
    tasks: &mut Vec<Task>,
) -> Result<usize> {
    let (stray, kept): (Vec<Task>, Vec<Task>) = tasks.drain(..).partition(|task| task.completed);
    *tasks = kept;
    if stray.is_empty() {
        return Ok(0);
    }

    let mut done = store.load(done_collection)?;
    let mut recovered = 0;
    for task in &stray {
        if !done.iter().any(|entry| entry.matches(task)) {
            done.push(task.clone());
            recovered += 1;
        }
    }
    if recovered > 0 {
        store.save(done_collection, &done)?;
    }
    store.save(Collection::active(kind), tasks)?;

    warn!(
        kind = %kind,
        dropped = stray.len(),
        recovered,
        "dropped completed tasks left in active collection"
    );
    Ok(stray.len())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::FixedClock;
    use std::cell::RefCell;
    use std::rc::Rc;
    use tempfile::TempDir;

    fn date(raw: &str) -> NaiveDate {
        parse_date(raw).expect("date")
    }

    fn engine_on(dir: &TempDir, today: &str) -> Engine {
        Engine::initialize(Store::new(dir.path()), FixedClock(date(today))).expect("initialize")
    }

    #[test]
    fn first_initialize_records_reset_date() {
        let dir = TempDir::new().unwrap();
        let engine = engine_on(&dir, "2024-05-01");

        assert!(engine.startup().reset_performed);
        assert_eq!(
            engine.store().read_last_reset_date().unwrap(),
            Some(date("2024-05-01"))
        );
        assert!(engine.active().is_empty());
    }

    #[test]
    fn add_appends_in_insertion_order() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");

        engine.add("B", KindTag::Scheduled, Some("2024-06-01")).unwrap();
        engine.add("A", KindTag::Scheduled, Some("2024-05-10")).unwrap();

        let titles: Vec<&str> = engine
            .active()
            .scheduled
            .iter()
            .map(|task| task.title.as_str())
            .collect();
        assert_eq!(titles, vec!["B", "A"]);
    }

    #[test]
    fn add_trims_title_and_ignores_daily_date() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");

        let task = engine.add("  Stretch  ", KindTag::Daily, Some("2024-05-01")).unwrap();
        assert_eq!(task.title, "Stretch");
        assert_eq!(task.date(), None);
    }

    #[test]
    fn add_rejects_missing_or_bad_date() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");

        assert!(matches!(
            engine.add("Dentist", KindTag::Scheduled, None),
            Err(Error::InvalidInput(_))
        ));
        assert!(matches!(
            engine.add("Dentist", KindTag::Reminder, Some("05/01/2024")),
            Err(Error::InvalidInput(_))
        ));
        assert!(engine.active().is_empty());
        assert!(!engine.store().collection_file(Collection::ActiveScheduled).exists());
    }

    #[test]
    fn unchecking_dated_task_writes_nothing() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");
        let task = engine.add("Dentist", KindTag::Scheduled, Some("2024-05-01")).unwrap();
        let path = engine.store().collection_file(Collection::ActiveScheduled);
        let before = std::fs::read_to_string(&path).unwrap();

        let outcome = engine.toggle_complete(&task, false).unwrap();

        assert!(matches!(outcome, Toggle::Updated(ref t) if !t.completed));
        assert_eq!(std::fs::read_to_string(&path).unwrap(), before);
        assert!(!engine.store().collection_file(Collection::DoneScheduled).exists());
    }

    #[test]
    fn toggle_unknown_task_is_noop() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");

        let outcome = engine.toggle_complete(&Task::daily("Ghost"), true).unwrap();
        assert_eq!(outcome, Toggle::NotFound);
        assert!(!engine.store().collection_file(Collection::ActiveDaily).exists());
    }

    #[test]
    fn unchecking_daily_clears_completion_date() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");
        let task = engine.add("Stretch", KindTag::Daily, None).unwrap();

        let checked = match engine.toggle_complete(&task, true).unwrap() {
            Toggle::Updated(task) => task,
            other => panic!("unexpected outcome: {other:?}"),
        };
        assert_eq!(checked.completed_on, Some(date("2024-05-01")));

        engine.toggle_complete(&checked, false).unwrap();
        let stored = engine.store().load(Collection::ActiveDaily).unwrap();
        assert!(!stored[0].completed);
        assert_eq!(stored[0].completed_on, None);
    }

    #[test]
    fn observers_see_changes_until_unsubscribed() {
        let dir = TempDir::new().unwrap();
        let mut engine = engine_on(&dir, "2024-05-01");
        let seen = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&seen);
        let id = engine.subscribe(Box::new(move |change: &Change| {
            sink.borrow_mut().push(change.clone());
        }));

        let task = engine.add("Dentist", KindTag::Scheduled, Some("2024-05-01")).unwrap();
        engine.toggle_complete(&task, true).unwrap();
        assert!(engine.unsubscribe(id));
        assert!(!engine.unsubscribe(id));
        engine.add("Later", KindTag::Daily, None).unwrap();

        let seen = seen.borrow();
        assert_eq!(seen.len(), 2);
        assert!(matches!(seen[0], Change::Added(_)));
        assert!(matches!(seen[1], Change::Archived(ref t) if t.completed_on == Some(date("2024-05-01"))));
    }

    #[test]
    fn stray_missing_from_history_is_recovered() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        let mut stray = Task::reminder("Call mom", date("2024-05-01"));
        stray.mark_completed(date("2024-05-02"));
        store
            .save(Collection::ActiveReminder, &[stray.clone()])
            .unwrap();

        let engine = Engine::initialize(store.clone(), FixedClock(date("2024-05-02"))).unwrap();

        assert_eq!(engine.startup().dropped_stray, 1);
        assert!(engine.active().reminder.is_empty());
        assert!(store.load(Collection::ActiveReminder).unwrap().is_empty());
        assert_eq!(store.load(Collection::DoneReminder).unwrap(), vec![stray]);
    }

    fn placement(engine: &Engine) -> (usize, usize) {
        (
            engine.active().scheduled.len(),
            engine.history().unwrap().scheduled.len(),
        )
    }

    #[test]
    fn interrupted_archive_completes_on_next_start() {
        for writes in 0..3 {
            let dir = TempDir::new().unwrap();
            let mut engine = engine_on(&dir, "2024-05-01");
            let task = engine.add("Dentist", KindTag::Scheduled, Some("2024-05-01")).unwrap();

            engine.store().fail_writes_after(writes);
            assert!(engine.toggle_complete(&task, true).is_err(), "writes={writes}");
            drop(engine);

            let engine = engine_on(&dir, "2024-05-01");
            if writes == 0 {
                assert_eq!(placement(&engine), (1, 0), "writes={writes}");
                assert!(!engine.active().scheduled[0].completed);
            } else {
                assert_eq!(placement(&engine), (0, 1), "writes={writes}");
                let done = engine.history().unwrap().scheduled;
                assert_eq!(done[0].completed_on, Some(date("2024-05-01")));
                assert!(engine
                    .store()
                    .load(Collection::ActiveScheduled)
                    .unwrap()
                    .is_empty());
            }
        }
    }

    #[test]
    fn interrupted_restore_leaves_task_in_history() {
        for writes in 0..3 {
            let dir = TempDir::new().unwrap();
            let mut engine = engine_on(&dir, "2024-05-01");
            let task = engine.add("Dentist", KindTag::Scheduled, Some("2024-05-01")).unwrap();
            engine.toggle_complete(&task, true).unwrap();
            let archived = engine.history().unwrap().scheduled[0].clone();

            engine.store().fail_writes_after(writes);
            assert!(engine.restore(&archived).is_err(), "writes={writes}");
            drop(engine);

            let engine = engine_on(&dir, "2024-05-02");
            assert_eq!(placement(&engine), (0, 1), "writes={writes}");
            assert_eq!(engine.history().unwrap().scheduled, vec![archived]);
        }
    }

    #[test]
    fn corrupt_collection_fails_initialize() {
        let dir = TempDir::new().unwrap();
        let store = Store::new(dir.path());
        std::fs::write(store.collection_file(Collection::ActiveReminder), "[{").unwrap();

        let err = Engine::initialize(store, FixedClock(date("2024-05-01"))).unwrap_err();
        assert!(matches!(err, Error::CorruptStore { .. }));
    }
}
