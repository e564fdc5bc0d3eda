use chrono::Local;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, Color, ContentArrangement, Table};

use crate::error::Result;
use crate::models::{Priority, Task};
use crate::recurrence::{IntegrityReport, RecurrenceUpdate};
use crate::service::{parse_date, search, sort_tasks, FilterCriteria, NewTask, SortKey, TaskService, TaskUpdate};
use crate::storage::TaskStore;

/// Options of the `list` command.
#[derive(Debug, Clone, Default)]
pub struct ListOptions {
    /// "completed" or "pending".
    pub status: Option<String>,
    pub priority: Option<String>,
    pub tag: Option<String>,
    /// YYYY-MM-DD
    pub due: Option<String>,
    pub sort: Option<SortKey>,
    pub search: Option<String>,
}

/// Adds a plain task.
pub fn cmd_add<S: TaskStore>(
    svc: &mut TaskService<S>,
    title: String,
    description: Option<String>,
    priority: Option<String>,
    tags: Vec<String>,
    due: Option<String>,
) -> Result<()> {
    let priority = priority.map(|p| p.parse::<Priority>()).transpose()?;
    let due_date = due.map(|d| parse_date(&d)).transpose()?;
    let task = svc.create_task(NewTask {
        title,
        description: description.unwrap_or_default(),
        priority,
        tags,
        due_date,
    })?;
    println!("Task added with ID {}: {}", task.id, task.title);
    Ok(())
}

/// Adds the template of a new recurring series.
pub fn cmd_add_recurring<S: TaskStore>(
    svc: &mut TaskService<S>,
    title: String,
    description: Option<String>,
    pattern: String,
    interval: i64,
) -> Result<()> {
    let task = svc.create_recurring_task(&title, &description.unwrap_or_default(), &pattern, interval)?;
    println!("Recurring task added with ID {}: {}", task.id, task.title);
    println!(
        "Recurrence pattern: {}, interval: {}, next due: {}",
        pattern_name(&task),
        task.interval(),
        fmt_due(&task)
    );
    Ok(())
}

/// Lists tasks after search, filters and sorting, as a table.
pub fn cmd_list<S: TaskStore>(svc: &TaskService<S>, opts: ListOptions, default_sort: SortKey) -> Result<()> {
    let status = match opts.status.as_deref() {
        None => None,
        Some("completed") => Some(true),
        Some("pending") => Some(false),
        Some(other) => {
            eprintln!("Unknown status '{}'. Use 'completed' or 'pending'.", other);
            return Ok(());
        }
    };
    let filters = FilterCriteria {
        status,
        priority: opts.priority.map(|p| p.parse()).transpose()?,
        tag: opts.tag,
        due_on: opts.due.map(|d| parse_date(&d).map(|dt| dt.date())).transpose()?,
    };

    let mut tasks = svc.get_all_tasks_with_recurring();
    if let Some(q) = &opts.search {
        tasks = search(&tasks, q);
    }
    tasks.retain(|t| filters.matches(t));
    let tasks = sort_tasks(tasks, opts.sort.unwrap_or(default_sort));

    if tasks.is_empty() {
        println!("No tasks found.");
        return Ok(());
    }
    println!("{}", task_table(&tasks));
    Ok(())
}

/// Prints one task, as a summary line or JSON.
pub fn cmd_show<S: TaskStore>(svc: &TaskService<S>, id: u64, json: bool) -> Result<()> {
    let Some(task) = svc.get_task(id) else {
        println!("Task {} not found.", id);
        return Ok(());
    };
    if json {
        let s = serde_json::to_string_pretty(&task).map_err(std::io::Error::from)?;
        println!("{}", s);
    } else {
        println!("{}: {}", task.id, task);
        if !task.description.is_empty() {
            println!("  {}", task.description);
        }
    }
    Ok(())
}

pub fn cmd_update<S: TaskStore>(
    svc: &mut TaskService<S>,
    id: u64,
    title: Option<String>,
    description: Option<String>,
    completed: Option<bool>,
    due: Option<String>,
) -> Result<()> {
    let due_date = due.map(|d| parse_date(&d)).transpose()?;
    match svc.update_task(id, TaskUpdate { title, description, completed, due_date })? {
        Some(task) => println!("Task {} updated: {} (due: {})", id, task.title, fmt_due(&task)),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

pub fn cmd_priority<S: TaskStore>(svc: &mut TaskService<S>, id: u64, priority: String) -> Result<()> {
    let priority: Priority = priority.parse()?;
    match svc.set_priority(id, priority)? {
        Some(task) => println!("Priority set to {} for task {}: {}", task.priority, id, task.title),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

pub fn cmd_add_tag<S: TaskStore>(svc: &mut TaskService<S>, id: u64, tag: String) -> Result<()> {
    match svc.add_tag(id, &tag)? {
        Some(task) => println!("Tag '{}' added to task {}: {}", tag.trim().to_lowercase(), id, task.title),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

pub fn cmd_remove_tag<S: TaskStore>(svc: &mut TaskService<S>, id: u64, tag: String) -> Result<()> {
    match svc.remove_tag(id, &tag)? {
        Some(task) => println!("Tag '{}' removed from task {}: {}", tag.trim().to_lowercase(), id, task.title),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

/// Marks a task as complete by ID.
///
/// If the task is recurring and active, the next instance is scheduled.
pub fn cmd_complete<S: TaskStore>(svc: &mut TaskService<S>, id: u64) -> Result<()> {
    let Some(done) = svc.complete_task(id)? else {
        println!("Task {} not found.", id);
        return Ok(());
    };
    println!("Task {} marked as completed: {}", id, done.task.title);
    match done.next {
        Some(next) => println!(
            "Next instance (ID {}) scheduled for {}.",
            next.id,
            fmt_due(&next)
        ),
        None if done.task.is_recurring && done.task.is_active => {
            println!("Next instance already scheduled; nothing generated.")
        }
        None => {}
    }
    Ok(())
}

pub fn cmd_incomplete<S: TaskStore>(svc: &mut TaskService<S>, id: u64) -> Result<()> {
    match svc.mark_incomplete(id)? {
        Some(task) => println!("Task {} marked as pending: {}", id, task.title),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

pub fn cmd_delete<S: TaskStore>(svc: &mut TaskService<S>, id: u64) -> Result<()> {
    if svc.delete_task(id) {
        println!("Task {} deleted.", id);
    } else {
        println!("Task {} not found.", id);
    }
    Ok(())
}

/// Changes pattern, interval or active flag of a recurring task.
pub fn cmd_update_recurrence<S: TaskStore>(
    svc: &mut TaskService<S>,
    id: u64,
    pattern: Option<String>,
    interval: Option<i64>,
    active: Option<bool>,
) -> Result<()> {
    let update = RecurrenceUpdate { pattern, interval, is_active: active };
    if !svc.handle_mid_cycle_changes(id, &update)? {
        println!("Failed to update recurrence settings for task {} (not found or not recurring).", id);
        return Ok(());
    }
    println!("Recurrence settings updated for task {}", id);
    if let Some(task) = svc.get_task(id) {
        println!(
            "Pattern: {}, Interval: {}, Active: {}",
            pattern_name(&task),
            task.interval(),
            task.is_active
        );
    }
    Ok(())
}

pub fn cmd_cancel_recurrence<S: TaskStore>(svc: &mut TaskService<S>, id: u64) -> Result<()> {
    if svc.cancel_recurrence(id)? {
        println!("Recurrence canceled for task {}", id);
    } else {
        println!("Failed to cancel recurrence for task {} (not found or not recurring).", id);
    }
    Ok(())
}

pub fn cmd_show_recurrence<S: TaskStore>(svc: &mut TaskService<S>, id: u64) -> Result<()> {
    let Some(task) = svc.get_task(id) else {
        println!("Task {} not found.", id);
        return Ok(());
    };
    if !task.is_recurring {
        println!("Task {} is not a recurring task.", id);
        return Ok(());
    }
    println!("Recurrence settings for task {}:", id);
    println!("  Title: {}", task.title);
    println!("  Pattern: {}", pattern_name(&task));
    println!("  Interval: {}", task.interval());
    println!("  Active: {}", task.is_active);
    if let Some(due) = task.next_due_date {
        println!("  Next due date: {}", due.format("%Y-%m-%d %H:%M:%S"));
    }
    if let Some(parent) = task.parent_id {
        println!("  Parent task ID: {}", parent);
    }
    if let Some(original) = task.original_task_id.filter(|o| *o != task.id) {
        println!("  Original task ID: {}", original);
    }
    let chain = svc.lineage(id);
    if chain.len() > 1 {
        let ids: Vec<String> = chain.iter().map(|t| t.id.to_string()).collect();
        println!("  Lineage: {}", ids.join(" <- "));
    }
    Ok(())
}

pub fn cmd_make_recurring<S: TaskStore>(
    svc: &mut TaskService<S>,
    id: u64,
    pattern: String,
    interval: i64,
    due: Option<String>,
) -> Result<()> {
    let first_due = due.map(|d| parse_date(&d)).transpose()?;
    match svc.make_recurring(id, &pattern, interval, first_due)? {
        Some(task) => println!("Task {} is now recurring ({}), next due {}", id, pattern_name(&task), fmt_due(&task)),
        None => println!("Task {} not found.", id),
    }
    Ok(())
}

/// Lists every recurring task with its series fields.
pub fn cmd_recurring<S: TaskStore>(svc: &mut TaskService<S>) -> Result<()> {
    let tasks = svc.get_recurring_tasks();
    if tasks.is_empty() {
        println!("No recurring tasks found.");
        return Ok(());
    }
    println!("{}", recurring_table(&tasks));
    Ok(())
}

pub fn cmd_overdue<S: TaskStore>(svc: &mut TaskService<S>) -> Result<()> {
    let tasks = svc.overdue_recurring_tasks();
    if tasks.is_empty() {
        println!("No overdue recurring tasks.");
        return Ok(());
    }
    println!("{}", recurring_table(&tasks));
    Ok(())
}

/// Prints the integrity report.
pub fn cmd_check<S: TaskStore>(svc: &mut TaskService<S>) -> Result<()> {
    let report = svc.integrity_report();
    print_report(&report);
    Ok(())
}

fn print_report(report: &IntegrityReport) {
    println!("Recurring tasks: {}", report.total_recurring_tasks);
    println!("Valid recurring tasks: {}", report.valid_recurring_tasks);
    if report.has_issues {
        println!("Issues:");
        for issue in &report.integrity_issues {
            println!("  - {}", issue);
        }
    } else {
        println!("No integrity issues found.");
    }
}

fn pattern_name(task: &Task) -> &'static str {
    task.recurrence_pattern.map(|p| p.as_str()).unwrap_or("none")
}

fn fmt_due(task: &Task) -> String {
    task.effective_due()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn header(names: &[&str]) -> Vec<Cell> {
    names.iter().map(|n| Cell::new(n).add_attribute(Attribute::Bold)).collect()
}

/// Task table used by `list`.
pub fn task_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "Priority", "Tags", "Due", "Recurrence", "Status"]));

    let now = Local::now().naive_local();
    for t in tasks {
        let priority_color = match t.priority {
            Priority::High => Color::Red,
            Priority::Medium => Color::Yellow,
            Priority::Low => Color::Green,
        };
        let overdue = !t.completed && t.effective_due().is_some_and(|d| d < now);
        let recurrence = if t.is_recurring {
            let mut s = pattern_name(t).to_string();
            if t.interval() > 1 {
                s.push_str(&format!(" x{}", t.interval()));
            }
            if !t.is_active {
                s.push_str(" (off)");
            }
            s
        } else {
            String::new()
        };
        let status = if t.completed { "Done" } else { "Pending" };
        let status_color = if t.completed { Color::Green } else { Color::Yellow };

        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(t.priority).fg(priority_color),
            Cell::new(t.tags.join(", ")),
            Cell::new(fmt_due(t)).fg(if overdue { Color::Red } else { Color::Reset }),
            Cell::new(recurrence),
            Cell::new(status).fg(status_color),
        ]);
    }
    table
}

fn recurring_table(tasks: &[Task]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(header(&["ID", "Title", "Pattern", "Interval", "Next Due", "Active", "Parent", "Original", "Status"]));
    for t in tasks {
        table.add_row(vec![
            Cell::new(t.id),
            Cell::new(&t.title),
            Cell::new(pattern_name(t)),
            Cell::new(t.interval()),
            Cell::new(fmt_due(t)),
            Cell::new(t.is_active).fg(if t.is_active { Color::Green } else { Color::Grey }),
            Cell::new(t.parent_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(t.original_task_id.map(|p| p.to_string()).unwrap_or_else(|| "-".into())),
            Cell::new(if t.completed { "Done" } else { "Pending" }),
        ]);
    }
    table
}

