use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Cell, Clear, Paragraph, Row, Table},
    Frame,
};

use super::app::{AddKind, App, InputField, InputMode, ViewMode};
use crate::models::{Priority, Task};

pub fn ui(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Status
            Constraint::Length(3), // Help
        ])
        .split(f.area());

    let now = Local::now().naive_local();
    let header_style = Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD);
    let highlight = Style::default().add_modifier(Modifier::BOLD).bg(Color::DarkGray);

    match app.view_mode {
        ViewMode::Tasks => {
            let rows: Vec<Row> = app
                .tasks
                .iter()
                .map(|t| {
                    Row::new(vec![
                        Cell::from(t.id.to_string()),
                        Cell::from(t.title.clone()),
                        Cell::from(t.priority.to_string()),
                        Cell::from(t.tags.join(", ")),
                        Cell::from(due_str(t)),
                        Cell::from(recurrence_str(t)),
                        Cell::from(if t.completed { "Done" } else { "Pending" }),
                    ])
                    .style(row_style(t, now))
                })
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(16),
                Constraint::Length(16),
                Constraint::Length(14),
                Constraint::Length(8),
            ];

            let status = match app.status_filter {
                None if app.show_completed => "all",
                None => "open",
                Some(false) => "pending",
                Some(true) => "completed",
            };
            let mut title = format!("Taskloop - Tasks [{} | sort: {}]", status, app.sort.as_str());
            if let Some(q) = &app.search {
                title.push_str(&format!(" [search: {}]", q));
            }

            let table = Table::new(rows, widths)
                .header(
                    Row::new(vec!["ID", "Title", "Priority", "Tags", "Due", "Recurrence", "Status"])
                        .style(header_style)
                        .bottom_margin(1),
                )
                .block(Block::default().borders(Borders::ALL).title(title))
                .row_highlight_style(highlight)
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.state);
        }
        ViewMode::Recurring | ViewMode::Overdue => {
            let rows: Vec<Row> = app
                .tasks
                .iter()
                .map(|t| {
                    Row::new(vec![
                        Cell::from(t.id.to_string()),
                        Cell::from(t.title.clone()),
                        Cell::from(t.recurrence_pattern.map(|p| p.as_str()).unwrap_or("none")),
                        Cell::from(t.interval().to_string()),
                        Cell::from(due_str(t)),
                        Cell::from(if t.is_active { "yes" } else { "no" }),
                        Cell::from(t.parent_id.map(|p| p.to_string()).unwrap_or_default()),
                        Cell::from(t.original_task_id.map(|p| p.to_string()).unwrap_or_default()),
                        Cell::from(if t.completed { "Done" } else { "Pending" }),
                    ])
                    .style(row_style(t, now))
                })
                .collect();

            let widths = [
                Constraint::Length(4),
                Constraint::Min(20),
                Constraint::Length(8),
                Constraint::Length(8),
                Constraint::Length(16),
                Constraint::Length(6),
                Constraint::Length(6),
                Constraint::Length(8),
                Constraint::Length(8),
            ];

            let title = if app.view_mode == ViewMode::Overdue {
                "Taskloop - Overdue recurring"
            } else {
                "Taskloop - Recurring"
            };

            let table = Table::new(rows, widths)
                .header(
                    Row::new(vec!["ID", "Title", "Pattern", "Every", "Next Due", "Active", "Parent", "Original", "Status"])
                        .style(header_style)
                        .bottom_margin(1),
                )
                .block(Block::default().borders(Borders::ALL).title(title))
                .row_highlight_style(highlight)
                .highlight_symbol(">> ");

            f.render_stateful_widget(table, chunks[0], &mut app.state);
        }
    }

    let status = Paragraph::new(app.message.clone().unwrap_or_default())
        .style(Style::default().fg(Color::Yellow))
        .block(Block::default().borders(Borders::ALL).title("Status"));
    f.render_widget(status, chunks[1]);

    let help_text = match app.input_mode {
        InputMode::Normal => match app.view_mode {
            ViewMode::Tasks => "q: Quit | a: Add | R: Add Recurring | Space: Done | u: Undone | d: Del | n: Title | e: Desc | D: Due | p: Priority | t/T: +/- Tag | /: Search | f: Status | s: Sort | c: Completed | m: Make Recurring | i: Check | v: View",
            ViewMode::Recurring | ViewMode::Overdue => "q: Quit | Space: Done | D: Due | x: Cancel Recurrence | d: Del | c: Completed | i: Check | v: View",
        },
        InputMode::Editing => "Enter: Save | Esc: Cancel",
        InputMode::Adding => "Enter: Next Step | Esc: Cancel",
    };

    let help = Paragraph::new(help_text)
        .style(Style::default().fg(Color::Gray))
        .block(Block::default().borders(Borders::ALL));

    f.render_widget(help, chunks[2]);

    if app.input_mode != InputMode::Normal {
        let area = centered_rect(60, 3, f.area());
        f.render_widget(Clear, area);

        let title = match app.input_mode {
            InputMode::Adding => match (app.add_state.kind, app.add_state.step) {
                (_, 0) => "Add Task: Enter Title",
                (_, 1) => "Add Task: Enter Description (Optional)",
                (AddKind::Plain, 2) => "Add Task: Enter Priority high/medium/low (Optional)",
                (AddKind::Plain, 3) => "Add Task: Enter Tags (Optional)",
                (AddKind::Plain, 4) => "Add Task: Enter Due Date YYYY-MM-DD (Optional)",
                (AddKind::Recurring, 2) => "Add Recurring: Enter Pattern daily/weekly/monthly",
                (AddKind::Recurring, 3) => "Add Recurring: Enter Interval (default 1)",
                _ => "Add Task",
            },
            _ => match app.input_field {
                InputField::Title => "Edit Title",
                InputField::Description => "Edit Description",
                InputField::DueDate => "Due Date: YYYY-MM-DD [HH:MM]",
                InputField::AddTag => "Add Tag",
                InputField::RemoveTag => "Remove Tag",
                InputField::Search => "Search (empty clears)",
                InputField::MakeRecurring => "Make Recurring: <pattern> [interval] [YYYY-MM-DD]",
                InputField::None => "Edit",
            },
        };

        let input = Paragraph::new(app.input_buffer.as_str())
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title(title));

        f.render_widget(input, area);
    }
}

fn due_str(t: &Task) -> String {
    t.effective_due()
        .map(|d| d.format("%Y-%m-%d %H:%M").to_string())
        .unwrap_or_default()
}

fn recurrence_str(t: &Task) -> String {
    if !t.is_recurring {
        return String::new();
    }
    let mut s = t.recurrence_pattern.map(|p| p.as_str()).unwrap_or("none").to_string();
    if t.interval() > 1 {
        s.push_str(&format!(" x{}", t.interval()));
    }
    if !t.is_active {
        s.push_str(" (off)");
    }
    s
}

fn row_style(t: &Task, now: chrono::NaiveDateTime) -> Style {
    if t.completed {
        Style::default().fg(Color::DarkGray)
    } else if t.effective_due().is_some_and(|d| d < now) {
        Style::default().fg(Color::Red)
    } else {
        match t.priority {
            Priority::High => Style::default().fg(Color::Yellow),
            Priority::Medium => Style::default(),
            Priority::Low => Style::default().fg(Color::Green),
        }
    }
}

fn centered_rect(percent_x: u16, height: u16, r: Rect) -> Rect {
    let margin = r.height.saturating_sub(height) / 2;
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(margin),
            Constraint::Length(height),
            Constraint::Length(margin),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}
