use ratatui::widgets::TableState;

use crate::config::Config;
use crate::error::{Result, TaskError};
use crate::models::{Priority, Task};
use crate::recurrence::IntegrityReport;
use crate::service::{parse_date, search, sort_tasks, NewTask, SortKey, TaskService, TaskUpdate};

#[derive(PartialEq)]
pub enum InputMode {
    Normal,
    Editing,
    Adding,
}

#[derive(PartialEq, Clone, Copy)]
pub enum ViewMode {
    Tasks,
    Recurring,
    Overdue,
}

#[derive(Clone, Copy)]
pub enum InputField {
    None,
    Title,
    Description,
    DueDate,
    AddTag,
    RemoveTag,
    Search,
    MakeRecurring,
}

#[derive(Default, PartialEq, Clone, Copy)]
pub enum AddKind {
    #[default]
    Plain,
    Recurring,
}

/// State for the multi-step add wizards.
#[derive(Default)]
pub struct AddState {
    pub kind: AddKind,
    pub title: String,
    pub description: String,
    pub priority: Option<String>,
    pub tags: Vec<String>,
    pub pattern: String,
    pub step: usize,
}

pub struct App {
    /// The session's only store. Everything the TUI shows comes from here.
    pub service: TaskService,
    pub tasks: Vec<Task>,
    pub state: TableState,
    pub view_mode: ViewMode,
    pub input_mode: InputMode,
    pub input_field: InputField,
    pub input_buffer: String,
    pub target_id: Option<u64>,
    pub add_state: AddState,
    pub show_completed: bool,
    /// `Some(false)` pending only, `Some(true)` completed only.
    pub status_filter: Option<bool>,
    pub sort: SortKey,
    pub search: Option<String>,
    /// Result of the last action, shown above the help line.
    pub message: Option<String>,
}

impl App {
    pub fn new(config: &Config) -> App {
        let mut app = App {
            service: TaskService::new(),
            tasks: Vec::new(),
            state: TableState::default(),
            view_mode: ViewMode::Tasks,
            input_mode: InputMode::Normal,
            input_field: InputField::None,
            input_buffer: String::new(),
            target_id: None,
            add_state: AddState::default(),
            show_completed: config.show_completed,
            status_filter: None,
            sort: config.default_sort,
            search: None,
            message: None,
        };
        app.reload();
        app
    }

    pub fn next(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(i) if i + 1 < self.tasks.len() => i + 1,
            _ => 0,
        };
        self.state.select(Some(i));
    }

    pub fn previous(&mut self) {
        if self.tasks.is_empty() {
            return;
        }
        let i = match self.state.selected() {
            Some(0) | None => self.tasks.len() - 1,
            Some(i) => i - 1,
        };
        self.state.select(Some(i));
    }

    fn selected_id(&self) -> Option<u64> {
        self.state.selected().and_then(|i| self.tasks.get(i)).map(|t| t.id)
    }

    fn report(&mut self, outcome: Result<String>) {
        self.message = Some(match outcome {
            Ok(msg) => msg,
            Err(e) => format!("Error: {}", e),
        });
    }

    /// Completes the selected task, spawning the next instance if recurring.
    pub fn complete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let outcome = self.service.complete_task(id).map(|done| match done {
            Some(c) => match c.next {
                Some(next) => format!("Task {} done; next instance {} created", id, next.id),
                None => format!("Task {} done", id),
            },
            None => format!("Task {} not found", id),
        });
        self.report(outcome);
        self.reload();
    }

    pub fn uncomplete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let outcome = self
            .service
            .mark_incomplete(id)
            .map(|t| match t {
                Some(_) => format!("Task {} marked pending", id),
                None => format!("Task {} not found", id),
            });
        self.report(outcome);
        self.reload();
    }

    pub fn delete_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let msg = if self.service.delete_task(id) {
            format!("Task {} deleted", id)
        } else {
            format!("Task {} not found", id)
        };
        self.message = Some(msg);
        self.reload();
    }

    pub fn cycle_priority_selected(&mut self) {
        let Some(task) = self.state.selected().and_then(|i| self.tasks.get(i)).cloned() else {
            return;
        };
        let outcome = self
            .service
            .set_priority(task.id, task.priority.cycle())
            .map(|t| match t {
                Some(t) => format!("Task {} priority: {}", t.id, t.priority),
                None => format!("Task {} not found", task.id),
            });
        self.report(outcome);
        self.reload();
    }

    pub fn cancel_recurrence_selected(&mut self) {
        let Some(id) = self.selected_id() else { return };
        let outcome = self.service.cancel_recurrence(id).map(|ok| {
            if ok {
                format!("Recurrence canceled for task {}", id)
            } else {
                format!("Task {} is not recurring", id)
            }
        });
        self.report(outcome);
        self.reload();
    }

    pub fn run_integrity_check(&mut self) {
        let report = self.service.integrity_report();
        self.message = Some(summarize(&report));
    }

    /// Reloads the visible task list for the current view, filters and sort.
    pub fn reload(&mut self) {
        let tasks = match self.view_mode {
            ViewMode::Tasks => {
                let mut tasks = self.service.get_all_tasks_with_recurring();
                if let Some(q) = &self.search {
                    tasks = search(&tasks, q);
                }
                tasks.retain(|t| match self.status_filter {
                    Some(done) => t.completed == done,
                    None => self.show_completed || !t.completed,
                });
                sort_tasks(tasks, self.sort)
            }
            ViewMode::Recurring => {
                let mut tasks = self.service.get_recurring_tasks();
                if !self.show_completed {
                    tasks.retain(|t| !t.completed);
                }
                tasks
            }
            ViewMode::Overdue => self.service.overdue_recurring_tasks(),
        };
        self.tasks = tasks;

        if self.tasks.is_empty() {
            self.state.select(None);
        } else if let Some(i) = self.state.selected() {
            if i >= self.tasks.len() {
                self.state.select(Some(self.tasks.len() - 1));
            }
        } else {
            self.state.select(Some(0));
        }
    }

    pub fn toggle_completed(&mut self) {
        self.show_completed = !self.show_completed;
        self.reload();
    }

    /// Cycles the status filter: all -> pending -> completed -> all.
    pub fn cycle_status_filter(&mut self) {
        self.status_filter = match self.status_filter {
            None => Some(false),
            Some(false) => Some(true),
            Some(true) => None,
        };
        self.reload();
    }

    pub fn cycle_sort(&mut self) {
        self.sort = self.sort.cycle();
        self.reload();
    }

    pub fn clear_search(&mut self) {
        self.search = None;
        self.reload();
    }

    /// Cycles Tasks -> Recurring -> Overdue.
    pub fn toggle_view(&mut self) {
        self.view_mode = match self.view_mode {
            ViewMode::Tasks => ViewMode::Recurring,
            ViewMode::Recurring => ViewMode::Overdue,
            ViewMode::Overdue => ViewMode::Tasks,
        };
        self.state.select(None);
        self.reload();
    }

    /// Starts an add wizard.
    pub fn start_add(&mut self, kind: AddKind) {
        self.input_mode = InputMode::Adding;
        self.add_state = AddState { kind, ..AddState::default() };
        self.input_buffer.clear();
    }

    /// Starts an input prompt. Task-specific prompts need a selection.
    pub fn start_edit(&mut self, field: InputField) {
        self.input_buffer.clear();
        if let InputField::Search = field {
            self.input_buffer = self.search.clone().unwrap_or_default();
        } else {
            let Some(task) = self.state.selected().and_then(|i| self.tasks.get(i)) else {
                return;
            };
            self.target_id = Some(task.id);
            match field {
                InputField::Title => self.input_buffer = task.title.clone(),
                InputField::Description => self.input_buffer = task.description.clone(),
                InputField::DueDate => {
                    self.input_buffer = task
                        .effective_due()
                        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
                        .unwrap_or_default()
                }
                _ => {}
            }
        }
        self.input_field = field;
        self.input_mode = InputMode::Editing;
    }

    pub fn cancel_input(&mut self) {
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.input_buffer.clear();
    }

    pub fn handle_input(&mut self) {
        match self.input_mode {
            InputMode::Adding => self.handle_adding_input(),
            InputMode::Editing => self.handle_editing_input(),
            InputMode::Normal => {}
        }
    }

    fn take_buffer(&mut self) -> String {
        std::mem::take(&mut self.input_buffer).trim().to_string()
    }

    fn handle_adding_input(&mut self) {
        let step = self.add_state.step;
        if step == 0 && self.input_buffer.trim().is_empty() {
            return;
        }
        let value = self.take_buffer();
        match (self.add_state.kind, step) {
            (_, 0) => self.add_state.title = value,
            (_, 1) => self.add_state.description = value,
            (AddKind::Plain, 2) => self.add_state.priority = Some(value).filter(|v| !v.is_empty()),
            (AddKind::Plain, 3) => {
                self.add_state.tags = value
                    .split([',', ' '])
                    .filter(|t| !t.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            (AddKind::Plain, 4) => {
                let outcome = self.finish_plain_add(&value);
                self.finish_wizard(outcome);
                return;
            }
            (AddKind::Recurring, 2) => self.add_state.pattern = value,
            (AddKind::Recurring, 3) => {
                let outcome = self.finish_recurring_add(&value);
                self.finish_wizard(outcome);
                return;
            }
            _ => {}
        }
        self.add_state.step += 1;
    }

    fn finish_plain_add(&mut self, due: &str) -> Result<String> {
        let priority = self.add_state.priority.as_deref().map(str::parse::<Priority>).transpose()?;
        let due_date = if due.is_empty() { None } else { Some(parse_date(due)?) };
        let task = self.service.create_task(NewTask {
            title: self.add_state.title.clone(),
            description: self.add_state.description.clone(),
            priority,
            tags: self.add_state.tags.clone(),
            due_date,
        })?;
        Ok(format!("Task {} added", task.id))
    }

    fn finish_recurring_add(&mut self, interval: &str) -> Result<String> {
        let interval = parse_interval(interval)?;
        let task = self.service.create_recurring_task(
            &self.add_state.title,
            &self.add_state.description,
            &self.add_state.pattern,
            interval,
        )?;
        Ok(format!("Recurring task {} added", task.id))
    }

    fn finish_wizard(&mut self, outcome: Result<String>) {
        self.report(outcome);
        self.input_mode = InputMode::Normal;
        self.reload();
    }

    fn handle_editing_input(&mut self) {
        let value = self.take_buffer();
        let target = self.target_id;
        let outcome: Option<Result<String>> = match (self.input_field, target) {
            (InputField::Search, _) => {
                self.search = Some(value).filter(|v| !v.is_empty());
                None
            }
            (InputField::Title, Some(id)) => Some(
                self.service
                    .update_task(id, TaskUpdate { title: Some(value), ..Default::default() })
                    .map(|_| format!("Task {} renamed", id)),
            ),
            (InputField::Description, Some(id)) => Some(
                self.service
                    .update_task(id, TaskUpdate { description: Some(value), ..Default::default() })
                    .map(|_| format!("Task {} updated", id)),
            ),
            (InputField::DueDate, Some(id)) => Some(self.set_due_date(id, &value)),
            (InputField::AddTag, Some(id)) => {
                Some(self.service.add_tag(id, &value).map(|_| format!("Tag added to task {}", id)))
            }
            (InputField::RemoveTag, Some(id)) => {
                Some(self.service.remove_tag(id, &value).map(|_| format!("Tag removed from task {}", id)))
            }
            (InputField::MakeRecurring, Some(id)) => Some(self.make_recurring(id, &value)),
            _ => None,
        };
        if let Some(outcome) = outcome {
            self.report(outcome);
        }
        self.input_mode = InputMode::Normal;
        self.input_field = InputField::None;
        self.reload();
    }

    fn set_due_date(&mut self, id: u64, value: &str) -> Result<String> {
        let due_date = Some(parse_date(value)?);
        let update = TaskUpdate { due_date, ..Default::default() };
        Ok(match self.service.update_task(id, update)? {
            Some(_) => format!("Task {} due {}", id, value),
            None => format!("Task {} not found", id),
        })
    }

    /// Input is "<pattern> [interval] [YYYY-MM-DD]".
    fn make_recurring(&mut self, id: u64, value: &str) -> Result<String> {
        let mut parts = value.split_whitespace();
        let pattern = parts.next().unwrap_or_default().to_string();
        let interval = parse_interval(parts.next().unwrap_or_default())?;
        let first_due = parts.next().map(parse_date).transpose()?;
        Ok(match self.service.make_recurring(id, &pattern, interval, first_due)? {
            Some(_) => format!("Task {} is now recurring", id),
            None => format!("Task {} not found", id),
        })
    }
}

/// Empty input means an interval of 1.
fn parse_interval(s: &str) -> Result<i64> {
    if s.trim().is_empty() {
        return Ok(1);
    }
    s.trim()
        .parse::<i64>()
        .map_err(|_| TaskError::InvalidNumber(s.trim().to_string()))
}

fn summarize(report: &IntegrityReport) -> String {
    if report.has_issues {
        format!(
            "{} issue(s) in {} recurring task(s): {}",
            report.integrity_issues.len(),
            report.total_recurring_tasks,
            report.integrity_issues.join("; ")
        )
    } else {
        format!(
            "Integrity OK: {}/{} recurring tasks valid",
            report.valid_recurring_tasks, report.total_recurring_tasks
        )
    }
}
