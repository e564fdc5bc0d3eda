//! # Taskloop
//!
//! A terminal task tracker with recurring tasks. Tasks carry a title,
//! description, priority and tags, and can be searched, filtered and sorted.
//! A recurring task regenerates its next instance when completed, on a daily,
//! weekly or monthly schedule.
//!
//! ## Recurrence
//!
//! A series starts from a template whose `original_task_id` is its own id.
//! Completing an active instance creates the next one with `parent_id` set to
//! the completed instance and `original_task_id` set to the template. No
//! instance is generated if another instance of the same series is already
//! due within a minute of the new due date. Cancelling recurrence on an
//! instance stops generation from that instance on.
//!
//! Monthly steps clamp to the last day of the target month: Jan 31 plus one
//! month is Feb 28 (Feb 29 in leap years).
//!
//! ## Usage
//!
//! ```bash
//! # Interactive session
//! taskloop
//!
//! # One-shot commands
//! taskloop add "Write report" --priority high --tags work --due 2025-12-01
//! taskloop add-recurring "Team standup" --pattern daily
//! taskloop list --status pending --sort priority
//! ```
//!
//! Tasks are kept in memory for the lifetime of the process; each one-shot
//! command starts from an empty store.
//!
//! ## Environment
//!
//! *   `TASKLOOP_LOG`: log filter, e.g. `taskloop=debug`.
//! *   `TASKLOOP_LOG_FILE`: where the interactive session writes its log.
//! *   `TASKLOOP_SORT`: default sort (`title`, `priority`, `date`, `creation`).
//! *   `TASKLOOP_SHOW_COMPLETED`: show completed tasks when the session opens.

pub mod commands;
pub mod config;
pub mod error;
pub mod models;
pub mod recurrence;
pub mod schedule;
pub mod service;
pub mod storage;
pub mod tui;

pub use error::{Result, TaskError};
pub use models::{Priority, RecurrencePattern, Task};
pub use recurrence::{IntegrityReport, RecurrenceEngine, RecurrenceUpdate};
pub use service::TaskService;
pub use storage::{InMemoryStore, TaskStore};
