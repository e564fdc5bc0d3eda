//! Task facade used by both shells.
//!
//! Plain and recurring tasks live in the one store owned here; anything
//! touching recurrence goes through a [`RecurrenceEngine`] borrowed from it.

use std::cmp::Ordering;
use std::str::FromStr;

use chrono::{NaiveDate, NaiveDateTime};
use tracing::info;

use crate::error::{Result, TaskError};
use crate::models::{normalize_tag, Priority, Task};
use crate::recurrence::{Completion, IntegrityReport, RecurrenceEngine, RecurrenceUpdate};
use crate::storage::{InMemoryStore, TaskStore};

/// Fields for a new plain task.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: String,
    pub description: String,
    pub priority: Option<Priority>,
    pub tags: Vec<String>,
    pub due_date: Option<NaiveDateTime>,
}

impl NewTask {
    pub fn titled(title: impl Into<String>) -> Self {
        Self { title: title.into(), ..Self::default() }
    }
}

/// Basic field edits. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub completed: Option<bool>,
    /// Moves `next_due_date` on a recurring task, `due_date` on a plain one.
    pub due_date: Option<NaiveDateTime>,
}

/// Filters combined with AND. `None` disables a filter.
#[derive(Debug, Clone, Default)]
pub struct FilterCriteria {
    /// `Some(true)` keeps completed tasks, `Some(false)` pending ones.
    pub status: Option<bool>,
    pub priority: Option<Priority>,
    pub tag: Option<String>,
    /// Calendar day of the effective due date.
    pub due_on: Option<NaiveDate>,
}

impl FilterCriteria {
    pub fn matches(&self, task: &Task) -> bool {
        if self.status.is_some_and(|done| task.completed != done) {
            return false;
        }
        if self.priority.is_some_and(|p| task.priority != p) {
            return false;
        }
        if let Some(tag) = &self.tag {
            let tag = tag.trim().to_lowercase();
            if !task.tags.contains(&tag) {
                return false;
            }
        }
        if let Some(day) = self.due_on {
            if task.effective_due().map(|d| d.date()) != Some(day) {
                return false;
            }
        }
        true
    }

    pub fn is_empty(&self) -> bool {
        self.status.is_none() && self.priority.is_none() && self.tag.is_none() && self.due_on.is_none()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortKey {
    /// Case-insensitive title order.
    #[default]
    Title,
    /// High, then medium, then low.
    Priority,
    /// Earliest due first, undated last.
    DueDate,
    /// Newest first.
    Created,
}

impl SortKey {
    pub fn as_str(self) -> &'static str {
        match self {
            SortKey::Title => "title",
            SortKey::Priority => "priority",
            SortKey::DueDate => "date",
            SortKey::Created => "creation",
        }
    }

    pub fn cycle(self) -> SortKey {
        match self {
            SortKey::Title => SortKey::Priority,
            SortKey::Priority => SortKey::DueDate,
            SortKey::DueDate => SortKey::Created,
            SortKey::Created => SortKey::Title,
        }
    }
}

impl FromStr for SortKey {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "title" => Ok(SortKey::Title),
            "priority" => Ok(SortKey::Priority),
            "date" | "due" | "due_date" => Ok(SortKey::DueDate),
            "creation" | "created" => Ok(SortKey::Created),
            other => Err(format!("unknown sort key '{}'", other)),
        }
    }
}

/// Sorts tasks by `key`. Ties keep their input order.
pub fn sort_tasks(mut tasks: Vec<Task>, key: SortKey) -> Vec<Task> {
    match key {
        SortKey::Title => tasks.sort_by_key(|t| t.title.to_lowercase()),
        SortKey::Priority => tasks.sort_by_key(|t| t.priority.rank()),
        SortKey::DueDate => tasks.sort_by(|a, b| match (a.effective_due(), b.effective_due()) {
            (Some(x), Some(y)) => x.cmp(&y),
            (Some(_), None) => Ordering::Less,
            (None, Some(_)) => Ordering::Greater,
            (None, None) => Ordering::Equal,
        }),
        SortKey::Created => tasks.sort_by(|a, b| b.created_at.cmp(&a.created_at)),
    }
    tasks
}

/// Case-insensitive substring search over title and description.
pub fn search(tasks: &[Task], query: &str) -> Vec<Task> {
    search_any(tasks, &[query])
}

/// Tasks matching any of `queries`. Blank queries are ignored.
pub fn search_any(tasks: &[Task], queries: &[&str]) -> Vec<Task> {
    let needles: Vec<String> = queries
        .iter()
        .map(|q| q.trim().to_lowercase())
        .filter(|q| !q.is_empty())
        .collect();
    if needles.is_empty() {
        return Vec::new();
    }
    tasks
        .iter()
        .filter(|t| {
            let title = t.title.to_lowercase();
            let description = t.description.to_lowercase();
            needles.iter().any(|n| title.contains(n) || description.contains(n))
        })
        .cloned()
        .collect()
}

pub struct TaskService<S: TaskStore = InMemoryStore> {
    store: S,
}

impl TaskService<InMemoryStore> {
    pub fn new() -> Self {
        Self { store: InMemoryStore::new() }
    }
}

impl Default for TaskService<InMemoryStore> {
    fn default() -> Self {
        Self::new()
    }
}

impl<S: TaskStore> TaskService<S> {
    pub fn with_store(store: S) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Recurrence engine over this service's store.
    pub fn recurrence(&mut self) -> RecurrenceEngine<'_, S> {
        RecurrenceEngine::new(&mut self.store)
    }

    pub fn create_task(&mut self, new: NewTask) -> Result<Task> {
        let mut task = Task::new(new.title, new.description);
        task.priority = new.priority.unwrap_or_default();
        task.due_date = new.due_date;
        for tag in &new.tags {
            let tag = normalize_tag(tag)?;
            if !task.tags.contains(&tag) {
                task.tags.push(tag);
            }
        }
        let id = self.store.save(task.clone())?;
        task.id = id;
        info!(id, "task created");
        Ok(task)
    }

    pub fn create_recurring_task(
        &mut self,
        title: &str,
        description: &str,
        pattern: &str,
        interval: i64,
    ) -> Result<Task> {
        self.recurrence().create_recurring_task(title, description, pattern, interval)
    }

    pub fn get_task(&self, id: u64) -> Option<Task> {
        self.store.get(id)
    }

    /// Plain (non-recurring) tasks only.
    pub fn get_all_tasks(&self) -> Vec<Task> {
        self.store.get_all().into_iter().filter(|t| !t.is_recurring).collect()
    }

    /// Plain and recurring tasks together.
    pub fn get_all_tasks_with_recurring(&self) -> Vec<Task> {
        self.store.get_all()
    }

    pub fn get_recurring_tasks(&mut self) -> Vec<Task> {
        self.recurrence().get_recurring_tasks()
    }

    /// Edits title, description, due date or completion. Completing a
    /// recurring task spawns its successor like
    /// [`complete_task`](Self::complete_task), counting from the new due date.
    pub fn update_task(&mut self, id: u64, update: TaskUpdate) -> Result<Option<Task>> {
        let Some(mut task) = self.store.get(id) else {
            return Ok(None);
        };
        if let Some(title) = update.title {
            task.title = title;
        }
        if let Some(description) = update.description {
            task.description = description;
        }
        if let Some(due) = update.due_date {
            if task.is_recurring {
                task.next_due_date = Some(due);
            } else {
                task.due_date = Some(due);
            }
        }
        let complete_now = update.completed == Some(true) && !task.completed;
        if update.completed == Some(false) {
            task.completed = false;
        }
        task.touch();
        if !self.store.update(id, task.clone())? {
            return Ok(None);
        }
        if complete_now {
            return Ok(self.complete_task(id)?.map(|c| c.task));
        }
        Ok(Some(task))
    }

    /// Marks a task done, spawning the next instance of a recurring one.
    pub fn complete_task(&mut self, id: u64) -> Result<Option<Completion>> {
        self.recurrence().complete_task(id)
    }

    pub fn mark_incomplete(&mut self, id: u64) -> Result<Option<Task>> {
        self.update_task(id, TaskUpdate { completed: Some(false), ..TaskUpdate::default() })
    }

    /// Removes one task. Other instances of its series are kept.
    pub fn delete_task(&mut self, id: u64) -> bool {
        let deleted = self.store.delete(id);
        if deleted {
            info!(id, "task deleted");
        }
        deleted
    }

    pub fn set_priority(&mut self, id: u64, priority: Priority) -> Result<Option<Task>> {
        self.modify(id, |t| {
            t.set_priority(priority);
            Ok(())
        })
    }

    pub fn add_tag(&mut self, id: u64, tag: &str) -> Result<Option<Task>> {
        self.modify(id, |t| t.add_tag(tag))
    }

    pub fn remove_tag(&mut self, id: u64, tag: &str) -> Result<Option<Task>> {
        self.modify(id, |t| t.remove_tag(tag))
    }

    /// Searches every task, recurring ones included.
    pub fn search_tasks(&self, query: &str) -> Vec<Task> {
        search(&self.store.get_all(), query)
    }

    pub fn search_any(&self, queries: &[&str]) -> Vec<Task> {
        search_any(&self.store.get_all(), queries)
    }

    pub fn filter_tasks(&self, filters: &FilterCriteria) -> Vec<Task> {
        self.store.get_all().into_iter().filter(|t| filters.matches(t)).collect()
    }

    pub fn sort_tasks(&self, tasks: Vec<Task>, key: SortKey) -> Vec<Task> {
        sort_tasks(tasks, key)
    }

    pub fn get_completed_tasks(&self) -> Vec<Task> {
        self.filter_tasks(&FilterCriteria { status: Some(true), ..FilterCriteria::default() })
    }

    pub fn get_pending_tasks(&self) -> Vec<Task> {
        self.filter_tasks(&FilterCriteria { status: Some(false), ..FilterCriteria::default() })
    }

    pub fn get_tasks_by_priority(&self, priority: Priority) -> Vec<Task> {
        self.filter_tasks(&FilterCriteria { priority: Some(priority), ..FilterCriteria::default() })
    }

    pub fn get_tasks_by_tag(&self, tag: &str) -> Vec<Task> {
        self.filter_tasks(&FilterCriteria { tag: Some(tag.to_string()), ..FilterCriteria::default() })
    }

    pub fn update_recurrence_settings(&mut self, id: u64, update: &RecurrenceUpdate) -> Result<bool> {
        self.recurrence().update_recurrence_settings(id, update)
    }

    pub fn handle_mid_cycle_changes(&mut self, id: u64, update: &RecurrenceUpdate) -> Result<bool> {
        self.recurrence().handle_mid_cycle_changes(id, update)
    }

    pub fn cancel_recurrence(&mut self, id: u64) -> Result<bool> {
        self.recurrence().cancel_recurrence(id)
    }

    pub fn make_recurring(
        &mut self,
        id: u64,
        pattern: &str,
        interval: i64,
        first_due: Option<NaiveDateTime>,
    ) -> Result<Option<Task>> {
        self.recurrence().make_recurring(id, pattern, interval, first_due)
    }

    pub fn overdue_recurring_tasks(&mut self) -> Vec<Task> {
        self.recurrence().handle_overdue_recurring_tasks()
    }

    pub fn integrity_report(&mut self) -> IntegrityReport {
        self.recurrence().perform_data_integrity_check()
    }

    pub fn lineage(&mut self, id: u64) -> Vec<Task> {
        self.recurrence().lineage(id)
    }

    fn modify<F>(&mut self, id: u64, f: F) -> Result<Option<Task>>
    where
        F: FnOnce(&mut Task) -> Result<()>,
    {
        let Some(mut task) = self.store.get(id) else {
            return Ok(None);
        };
        f(&mut task)?;
        if self.store.update(id, task.clone())? {
            Ok(Some(task))
        } else {
            Ok(None)
        }
    }
}

/// Parses `YYYY-MM-DD` (midnight) or `YYYY-MM-DD HH:MM`.
pub fn parse_date(s: &str) -> Result<NaiveDateTime> {
    let s = s.trim();
    if let Ok(dt) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M") {
        return Ok(dt);
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .ok_or_else(|| TaskError::InvalidDate(s.to_string()))
}
