use thiserror::Error;

/// Errors raised by task validation, the recurrence engine and the shells.
///
/// Looking up an id that does not exist is not an error: operations return
/// `None` or `false` for that case.
#[derive(Error, Debug)]
pub enum TaskError {
    #[error("Task title cannot be empty")]
    EmptyTitle,

    #[error("Invalid recurrence pattern '{0}': must be 'daily', 'weekly', or 'monthly'")]
    InvalidPattern(String),

    #[error("Invalid recurrence interval {0}: must be a positive integer")]
    InvalidInterval(i64),

    #[error("Recurring task has no recurrence pattern")]
    MissingPattern,

    #[error("Tag cannot be empty or whitespace only")]
    EmptyTag,

    #[error("Tag '{0}' already exists on this task")]
    DuplicateTag(String),

    #[error("Tag '{0}' does not exist on this task")]
    UnknownTag(String),

    #[error("Invalid priority '{0}': must be 'high', 'medium', or 'low'")]
    InvalidPriority(String),

    #[error("Invalid date '{0}': use YYYY-MM-DD or YYYY-MM-DD HH:MM")]
    InvalidDate(String),

    #[error("Invalid number '{0}'")]
    InvalidNumber(String),

    #[error("Task {0} is already recurring")]
    AlreadyRecurring(u64),

    #[error("Invalid task data after update: {0}")]
    InvalidAfterUpdate(Box<TaskError>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl TaskError {
    /// True for errors caused by bad caller input.
    pub fn is_validation(&self) -> bool {
        !matches!(self, TaskError::Io(_))
    }
}

pub type Result<T> = std::result::Result<T, TaskError>;
