pub mod app;
pub mod ui;

use std::{error::Error, io};

use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::{Backend, CrosstermBackend},
    Terminal,
};
use tracing::{error, info};

use crate::config::Config;
use app::{AddKind, App, InputField, InputMode};
use ui::ui;

/// Runs the interactive session. Tasks live only as long as the session.
pub fn run_tui(config: &Config) -> Result<(), Box<dyn Error>> {
    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let mut app = App::new(config);
    info!("tui session started");

    let res = run_app(&mut terminal, &mut app);

    // Restore terminal
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen, DisableMouseCapture)?;
    terminal.show_cursor()?;

    if let Err(err) = res {
        error!(%err, "tui session failed");
        eprintln!("{:?}", err)
    }

    Ok(())
}

fn run_app<B: Backend>(terminal: &mut Terminal<B>, app: &mut App) -> io::Result<()> {
    loop {
        terminal.draw(|f| ui(f, app))?;

        let Event::Key(key) = event::read()? else {
            continue;
        };
        if key.kind != KeyEventKind::Press {
            continue;
        }
        match app.input_mode {
            InputMode::Normal => match key.code {
                KeyCode::Char('q') => return Ok(()),
                KeyCode::Down | KeyCode::Char('j') => app.next(),
                KeyCode::Up | KeyCode::Char('k') => app.previous(),
                KeyCode::Char(' ') => app.complete_selected(),
                KeyCode::Char('u') => app.uncomplete_selected(),
                KeyCode::Char('d') | KeyCode::Delete => app.delete_selected(),
                KeyCode::Char('a') => app.start_add(AddKind::Plain),
                KeyCode::Char('R') => app.start_add(AddKind::Recurring),
                KeyCode::Char('n') => app.start_edit(InputField::Title),
                KeyCode::Char('e') => app.start_edit(InputField::Description),
                KeyCode::Char('D') => app.start_edit(InputField::DueDate),
                KeyCode::Char('p') => app.cycle_priority_selected(),
                KeyCode::Char('t') => app.start_edit(InputField::AddTag),
                KeyCode::Char('T') => app.start_edit(InputField::RemoveTag),
                KeyCode::Char('/') => app.start_edit(InputField::Search),
                KeyCode::Char('m') => app.start_edit(InputField::MakeRecurring),
                KeyCode::Char('x') => app.cancel_recurrence_selected(),
                KeyCode::Char('f') => app.cycle_status_filter(),
                KeyCode::Char('s') => app.cycle_sort(),
                KeyCode::Char('c') => app.toggle_completed(),
                KeyCode::Char('i') => app.run_integrity_check(),
                KeyCode::Char('v') => app.toggle_view(),
                KeyCode::Esc => app.clear_search(),
                _ => {}
            },
            InputMode::Editing | InputMode::Adding => match key.code {
                KeyCode::Enter => app.handle_input(),
                KeyCode::Esc => app.cancel_input(),
                KeyCode::Char(c) => app.input_buffer.push(c),
                KeyCode::Backspace => {
                    app.input_buffer.pop();
                }
                _ => {}
            },
        }
    }
}
