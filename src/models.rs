use std::fmt;
use std::str::FromStr;

use chrono::{Local, NaiveDateTime};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TaskError};

/// Current local wall-clock time. Scheduling is timezone-unaware.
pub fn now() -> NaiveDateTime {
    Local::now().naive_local()
}

/// Priority level of a task.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    High,
    #[default]
    Medium,
    Low,
}

impl Priority {
    /// Sort rank, most important first.
    pub fn rank(self) -> u8 {
        match self {
            Priority::High => 0,
            Priority::Medium => 1,
            Priority::Low => 2,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Priority::High => "high",
            Priority::Medium => "medium",
            Priority::Low => "low",
        }
    }

    /// The next level in the cycle high -> medium -> low -> high.
    pub fn cycle(self) -> Priority {
        match self {
            Priority::High => Priority::Medium,
            Priority::Medium => Priority::Low,
            Priority::Low => Priority::High,
        }
    }
}

impl FromStr for Priority {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "high" => Ok(Priority::High),
            "medium" => Ok(Priority::Medium),
            "low" => Ok(Priority::Low),
            _ => Err(TaskError::InvalidPriority(s.to_string())),
        }
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unit a recurring task repeats by.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum RecurrencePattern {
    Daily,
    Weekly,
    Monthly,
}

impl RecurrencePattern {
    pub fn as_str(self) -> &'static str {
        match self {
            RecurrencePattern::Daily => "daily",
            RecurrencePattern::Weekly => "weekly",
            RecurrencePattern::Monthly => "monthly",
        }
    }
}

impl FromStr for RecurrencePattern {
    type Err = TaskError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "daily" => Ok(RecurrencePattern::Daily),
            "weekly" => Ok(RecurrencePattern::Weekly),
            "monthly" => Ok(RecurrencePattern::Monthly),
            _ => Err(TaskError::InvalidPattern(s.to_string())),
        }
    }
}

impl fmt::Display for RecurrencePattern {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Represents a single task, plain or part of a recurring series.
///
/// Recurrence fields are only meaningful when `is_recurring` is set. A series
/// is rooted at a template whose `original_task_id` is its own id; every
/// generated instance points at that root and at the instance it was
/// generated from (`parent_id`).
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Task {
    /// Unique identifier, assigned by the store (0 before the first save).
    pub id: u64,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub completed: bool,
    pub created_at: NaiveDateTime,
    pub updated_at: NaiveDateTime,
    #[serde(default)]
    pub priority: Priority,
    /// Lower-case, unique tags.
    #[serde(default)]
    pub tags: Vec<String>,
    /// Due date of a plain task.
    #[serde(default)]
    pub due_date: Option<NaiveDateTime>,
    #[serde(default)]
    pub is_recurring: bool,
    #[serde(default)]
    pub recurrence_pattern: Option<RecurrencePattern>,
    #[serde(default)]
    pub recurrence_interval: Option<u32>,
    /// When this occurrence of a recurring task is due.
    #[serde(default)]
    pub next_due_date: Option<NaiveDateTime>,
    /// Recurrence only regenerates while this is set.
    #[serde(default = "default_active")]
    pub is_active: bool,
    /// Instance this one was generated from. Absent on the template.
    #[serde(default)]
    pub parent_id: Option<u64>,
    /// Root template of the series. Equals `id` on the template itself.
    #[serde(default)]
    pub original_task_id: Option<u64>,
}

fn default_active() -> bool {
    true
}

impl Task {
    /// A new plain task with a placeholder id.
    pub fn new(title: impl Into<String>, description: impl Into<String>) -> Self {
        let ts = now();
        Self {
            id: 0,
            title: title.into(),
            description: description.into(),
            completed: false,
            created_at: ts,
            updated_at: ts,
            priority: Priority::default(),
            tags: Vec::new(),
            due_date: None,
            is_recurring: false,
            recurrence_pattern: None,
            recurrence_interval: None,
            next_due_date: None,
            is_active: true,
            parent_id: None,
            original_task_id: None,
        }
    }

    /// A new active recurring task. The interval defaults to 1.
    pub fn recurring(
        title: impl Into<String>,
        description: impl Into<String>,
        pattern: RecurrencePattern,
        interval: Option<u32>,
    ) -> Self {
        let mut task = Task::new(title, description);
        task.is_recurring = true;
        task.recurrence_pattern = Some(pattern);
        task.recurrence_interval = Some(interval.unwrap_or(1));
        task
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due: NaiveDateTime) -> Self {
        self.due_date = Some(due);
        self
    }

    /// Checks the invariants a stored task must satisfy.
    pub fn validate(&self) -> Result<()> {
        if self.title.trim().is_empty() {
            return Err(TaskError::EmptyTitle);
        }
        if self.is_recurring {
            if self.recurrence_pattern.is_none() {
                return Err(TaskError::MissingPattern);
            }
            if let Some(0) = self.recurrence_interval {
                return Err(TaskError::InvalidInterval(0));
            }
        }
        Ok(())
    }

    /// Interval with the recurring default applied.
    pub fn interval(&self) -> u32 {
        self.recurrence_interval.unwrap_or(1)
    }

    /// `next_due_date` for recurring tasks, `due_date` otherwise.
    pub fn effective_due(&self) -> Option<NaiveDateTime> {
        self.next_due_date.or(self.due_date)
    }

    /// True for the template a recurring series started from.
    pub fn is_root(&self) -> bool {
        self.is_recurring && self.original_task_id == Some(self.id)
    }

    pub fn touch(&mut self) {
        self.updated_at = now();
    }

    pub fn add_tag(&mut self, tag: &str) -> Result<()> {
        let tag = normalize_tag(tag)?;
        if self.tags.contains(&tag) {
            return Err(TaskError::DuplicateTag(tag));
        }
        self.tags.push(tag);
        self.touch();
        Ok(())
    }

    pub fn remove_tag(&mut self, tag: &str) -> Result<()> {
        let tag = tag.trim().to_lowercase();
        match self.tags.iter().position(|t| *t == tag) {
            Some(i) => {
                self.tags.remove(i);
                self.touch();
                Ok(())
            }
            None => Err(TaskError::UnknownTag(tag)),
        }
    }

    pub fn set_priority(&mut self, priority: Priority) {
        self.priority = priority;
        self.touch();
    }
}

/// Trims and lower-cases a tag, rejecting empty ones.
pub fn normalize_tag(tag: &str) -> Result<String> {
    let tag = tag.trim().to_lowercase();
    if tag.is_empty() {
        return Err(TaskError::EmptyTag);
    }
    Ok(tag)
}

impl fmt::Display for Task {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let status = if self.completed { "✓" } else { "○" };
        write!(f, "{} [{}] {}", status, self.priority.as_str().to_uppercase(), self.title)?;
        if !self.tags.is_empty() {
            write!(f, " [{}]", self.tags.join(", "))?;
        }
        if self.is_recurring {
            let pattern = self.recurrence_pattern.map(|p| p.as_str()).unwrap_or("none");
            write!(f, " [RECURRING: {}", pattern)?;
            if self.interval() > 1 {
                write!(f, " x{}", self.interval())?;
            }
            write!(f, ", ACTIVE: {}]", self.is_active)?;
        }
        if let Some(due) = self.effective_due() {
            write!(f, " (due: {})", due.format("%Y-%m-%d"))?;
        }
        Ok(())
    }
}
