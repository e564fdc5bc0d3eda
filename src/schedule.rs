use chrono::{Duration, Months, NaiveDateTime};

use crate::error::{Result, TaskError};
pub use crate::models::RecurrencePattern;

/// Two generated due dates closer than this belong to the same occurrence.
pub const DUPLICATE_WINDOW_SECS: i64 = 60;

/// Parses a raw pattern name ("daily", "weekly", "monthly").
pub fn parse_pattern(s: &str) -> Result<RecurrencePattern> {
    s.parse()
}

/// Computes the due date one recurrence step after `start`.
///
/// - `Daily`: `interval` days later.
/// - `Weekly`: `7 * interval` days later.
/// - `Monthly`: `interval` calendar months later. When the target month is
///   shorter than the start day, the date is clamped to the target month's
///   last day (Jan 31 + 1 month is Feb 28, or Feb 29 in a leap year).
///
/// The time of day is kept. Fails only for a non-positive interval or one so
/// large the date leaves chrono's range.
pub fn compute_next_due_date(
    start: NaiveDateTime,
    pattern: RecurrencePattern,
    interval: i64,
) -> Result<NaiveDateTime> {
    if interval <= 0 {
        return Err(TaskError::InvalidInterval(interval));
    }
    let next = match pattern {
        RecurrencePattern::Daily => add_days(start, interval),
        RecurrencePattern::Weekly => interval.checked_mul(7).and_then(|d| add_days(start, d)),
        RecurrencePattern::Monthly => u32::try_from(interval)
            .ok()
            .and_then(|m| start.checked_add_months(Months::new(m))),
    };
    next.ok_or(TaskError::InvalidInterval(interval))
}

fn add_days(start: NaiveDateTime, days: i64) -> Option<NaiveDateTime> {
    Duration::try_days(days).and_then(|d| start.checked_add_signed(d))
}

/// Whether two due dates fall inside the duplicate-suppression window.
pub fn within_duplicate_window(a: NaiveDateTime, b: NaiveDateTime) -> bool {
    (a - b).num_milliseconds().abs() < DUPLICATE_WINDOW_SECS * 1000
}
