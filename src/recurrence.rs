//! Recurrence engine: creating recurring series, spawning the next instance
//! when one is completed, and auditing series lineage.
//!
//! The engine borrows the one task store it works on, so every caller sees
//! the same records. Nothing here locks: each read-modify-write sequence
//! assumes a single caller.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::{Result, TaskError};
use crate::models::{now, Task};
use crate::schedule::{compute_next_due_date, parse_pattern, within_duplicate_window};
use crate::storage::TaskStore;

/// Partial change to a task's recurrence settings. `None` leaves a field as is.
#[derive(Debug, Clone, Default)]
pub struct RecurrenceUpdate {
    pub pattern: Option<String>,
    pub interval: Option<i64>,
    pub is_active: Option<bool>,
}

/// A completed task and the instance its completion spawned, if any.
#[derive(Debug, Clone)]
pub struct Completion {
    pub task: Task,
    pub next: Option<Task>,
}

/// Result of a read-only audit over stored tasks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IntegrityReport {
    pub total_recurring_tasks: usize,
    pub valid_recurring_tasks: usize,
    pub integrity_issues: Vec<String>,
    pub has_issues: bool,
}

pub struct RecurrenceEngine<'a, S: TaskStore> {
    store: &'a mut S,
}

impl<'a, S: TaskStore> RecurrenceEngine<'a, S> {
    pub fn new(store: &'a mut S) -> Self {
        Self { store }
    }

    /// Creates the template of a new series, first due one step from now.
    ///
    /// Written twice: the second write records `original_task_id` once the
    /// store has assigned the id. The two writes are not atomic.
    pub fn create_recurring_task(
        &mut self,
        title: &str,
        description: &str,
        pattern: &str,
        interval: i64,
    ) -> Result<Task> {
        let pattern = parse_pattern(pattern)?;
        let interval = positive_interval(interval)?;
        let mut task = Task::recurring(title, description, pattern, Some(interval));
        task.next_due_date = Some(compute_next_due_date(now(), pattern, i64::from(interval))?);

        let id = self.store.save(task.clone())?;
        task.id = id;
        task.original_task_id = Some(id);
        self.store.update(id, task.clone())?;

        info!(id, %pattern, interval, "recurring task created");
        Ok(task)
    }

    /// Spawns the instance following `task`, unless recurrence is off for it
    /// or an instance for that due date already exists.
    pub fn generate_next_instance(&mut self, task: &Task) -> Result<Option<Task>> {
        if !task.is_recurring || !task.is_active {
            return Ok(None);
        }
        let pattern = task.recurrence_pattern.ok_or(TaskError::MissingPattern)?;
        let start = task.next_due_date.unwrap_or_else(now);
        let next_due = compute_next_due_date(start, pattern, i64::from(task.interval()))?;
        let original_id = task.original_task_id.unwrap_or(task.id);

        if self.prevent_duplicate_generation(original_id, next_due) {
            debug!(parent = task.id, original = original_id, due = %next_due, "duplicate instance suppressed");
            return Ok(None);
        }

        let mut next = Task::recurring(
            task.title.clone(),
            task.description.clone(),
            pattern,
            Some(task.interval()),
        );
        next.priority = task.priority;
        next.tags = task.tags.clone();
        next.parent_id = Some(task.id);
        next.original_task_id = Some(original_id);
        next.next_due_date = Some(next_due);

        let id = self.store.save(next.clone())?;
        next.id = id;
        info!(id, parent = task.id, original = original_id, due = %next_due, "next recurring instance generated");
        Ok(Some(next))
    }

    /// True when some task of the series `original_task_id` is already due
    /// within a minute of `candidate_due`.
    pub fn prevent_duplicate_generation(&self, original_task_id: u64, candidate_due: NaiveDateTime) -> bool {
        self.store.get_all().iter().any(|t| {
            t.original_task_id == Some(original_task_id)
                && t.next_due_date.is_some_and(|due| within_duplicate_window(due, candidate_due))
        })
    }

    /// Marks `task` completed and spawns its successor.
    ///
    /// Returns `None` when nothing was spawned, including when `task` is not
    /// in the store.
    pub fn handle_task_completion(&mut self, task: &Task) -> Result<Option<Task>> {
        let mut done = task.clone();
        done.completed = true;
        done.touch();
        if !self.store.update(done.id, done.clone())? {
            return Ok(None);
        }
        self.generate_next_instance(&done)
    }

    /// Completes the stored task `id`. `None` when there is no such task.
    pub fn complete_task(&mut self, id: u64) -> Result<Option<Completion>> {
        let Some(task) = self.store.get(id) else {
            return Ok(None);
        };
        let next = self.handle_task_completion(&task)?;
        let task = self.store.get(id).unwrap_or(task);
        Ok(Some(Completion { task, next }))
    }

    /// Applies a partial recurrence change. `Ok(false)` when the task is
    /// missing or not recurring; invalid input is an error and nothing is
    /// written.
    pub fn update_recurrence_settings(&mut self, id: u64, update: &RecurrenceUpdate) -> Result<bool> {
        let Some(task) = self.recurring_task(id) else {
            return Ok(false);
        };
        let working = apply_update(task, update)?;
        let updated = self.store.update(id, working)?;
        if updated {
            info!(id, ?update, "recurrence settings updated");
        }
        Ok(updated)
    }

    /// Like [`update_recurrence_settings`](Self::update_recurrence_settings),
    /// but the whole record is re-validated after the change and the store
    /// is left untouched if it no longer holds.
    ///
    /// `InMemoryStore` validates on write anyway; the check here also covers
    /// stores that don't, and reports failures as `InvalidAfterUpdate`.
    pub fn handle_mid_cycle_changes(&mut self, id: u64, update: &RecurrenceUpdate) -> Result<bool> {
        let Some(task) = self.recurring_task(id) else {
            return Ok(false);
        };
        let working = apply_update(task, update)?;
        working
            .validate()
            .map_err(|e| TaskError::InvalidAfterUpdate(Box::new(e)))?;
        let updated = self.store.update(id, working)?;
        if updated {
            info!(id, ?update, "recurrence changed mid-cycle");
        }
        Ok(updated)
    }

    /// Stops generation from this instance on. Already generated instances
    /// keep their own flag.
    pub fn cancel_recurrence(&mut self, id: u64) -> Result<bool> {
        let Some(mut task) = self.recurring_task(id) else {
            return Ok(false);
        };
        task.is_active = false;
        task.touch();
        let updated = self.store.update(id, task)?;
        if updated {
            info!(id, "recurrence cancelled");
        }
        Ok(updated)
    }

    /// Turns an existing plain task into the template of a new series.
    ///
    /// The first occurrence is due at `first_due`, or one step from now.
    pub fn make_recurring(
        &mut self,
        id: u64,
        pattern: &str,
        interval: i64,
        first_due: Option<NaiveDateTime>,
    ) -> Result<Option<Task>> {
        let Some(mut task) = self.store.get(id) else {
            return Ok(None);
        };
        if task.is_recurring {
            return Err(TaskError::AlreadyRecurring(id));
        }
        let pattern = parse_pattern(pattern)?;
        let interval = positive_interval(interval)?;
        let first_due = match first_due {
            Some(due) => due,
            None => compute_next_due_date(now(), pattern, i64::from(interval))?,
        };

        task.is_recurring = true;
        task.recurrence_pattern = Some(pattern);
        task.recurrence_interval = Some(interval);
        task.is_active = true;
        task.next_due_date = Some(first_due);
        task.due_date = None;
        task.parent_id = None;
        task.original_task_id = Some(id);
        task.touch();
        self.store.update(id, task.clone())?;
        info!(id, %pattern, interval, "task converted to recurring");
        Ok(Some(task))
    }

    /// All recurring tasks, in store order.
    pub fn get_recurring_tasks(&self) -> Vec<Task> {
        self.store.get_all().into_iter().filter(|t| t.is_recurring).collect()
    }

    /// Active, incomplete recurring tasks already past due. Advisory only.
    pub fn handle_overdue_recurring_tasks(&self) -> Vec<Task> {
        self.overdue_as_of(now())
    }

    /// [`handle_overdue_recurring_tasks`](Self::handle_overdue_recurring_tasks)
    /// measured against `at` instead of the wall clock.
    pub fn overdue_as_of(&self, at: NaiveDateTime) -> Vec<Task> {
        self.store
            .get_all()
            .into_iter()
            .filter(|t| {
                t.is_recurring
                    && t.is_active
                    && !t.completed
                    && t.next_due_date.is_some_and(|due| due < at)
            })
            .collect()
    }

    pub fn perform_data_integrity_check(&self) -> IntegrityReport {
        audit(&self.store.get_all())
    }

    /// The chain from `id` back to its template, newest first. Stops at a
    /// missing parent or a cycle.
    pub fn lineage(&self, id: u64) -> Vec<Task> {
        let mut chain = Vec::new();
        let mut seen = HashSet::new();
        let mut cursor = Some(id);
        while let Some(current) = cursor {
            if !seen.insert(current) {
                break;
            }
            let Some(task) = self.store.get(current) else {
                break;
            };
            cursor = task.parent_id;
            chain.push(task);
        }
        chain
    }

    fn recurring_task(&self, id: u64) -> Option<Task> {
        self.store.get(id).filter(|t| t.is_recurring)
    }
}

fn positive_interval(interval: i64) -> Result<u32> {
    match u32::try_from(interval) {
        Ok(n) if n > 0 => Ok(n),
        _ => Err(TaskError::InvalidInterval(interval)),
    }
}

fn apply_update(mut task: Task, update: &RecurrenceUpdate) -> Result<Task> {
    if let Some(pattern) = &update.pattern {
        task.recurrence_pattern = Some(parse_pattern(pattern)?);
    }
    if let Some(interval) = update.interval {
        task.recurrence_interval = Some(positive_interval(interval)?);
    }
    if let Some(active) = update.is_active {
        task.is_active = active;
    }
    task.touch();
    Ok(task)
}

/// Audits a task list for broken recurrence data. Never fails: malformed
/// records are reported, not rejected or repaired.
pub fn audit(tasks: &[Task]) -> IntegrityReport {
    let by_id: HashMap<u64, &Task> = tasks.iter().map(|t| (t.id, t)).collect();
    let mut issues = Vec::new();
    let mut total = 0;
    let mut valid = 0;

    for task in tasks {
        let before = issues.len();
        if task.is_recurring {
            total += 1;
            if task.recurrence_pattern.is_none() {
                issues.push(format!("Task {}: Invalid recurrence pattern 'none'", task.id));
            }
            if let Some(0) = task.recurrence_interval {
                issues.push(format!("Task {}: Invalid recurrence interval '0'", task.id));
            }
        }
        if task.parent_id == Some(task.id) {
            issues.push(format!("Task {}: Circular reference - task is its own parent", task.id));
        }
        if let Some(original) = task.original_task_id.filter(|o| *o != task.id) {
            if by_id.get(&original).is_some_and(|o| !o.is_recurring) {
                issues.push(format!("Task {}: Original task {} is not recurring", task.id, original));
            }
        }
        if task.is_recurring && issues.len() == before {
            valid += 1;
        }
    }

    IntegrityReport {
        total_recurring_tasks: total,
        valid_recurring_tasks: valid,
        has_issues: !issues.is_empty(),
        integrity_issues: issues,
    }
}
