use std::io;
use std::process::ExitCode;

use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::{generate, Shell};

use taskloop::commands::*;
use taskloop::config::{init_logging, Config};
use taskloop::service::SortKey;
use taskloop::tui::run_tui;
use taskloop::{Result, TaskService};

#[derive(Parser)]
#[command(name = "taskloop", version)]
#[command(about = "Terminal task tracker with recurring tasks", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a new task
    Add {
        /// Task title (quoted if it has spaces)
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// high, medium or low
        #[arg(short, long)]
        priority: Option<String>,
        /// Tags (space-separated)
        #[arg(short, long, num_args = 0..)]
        tags: Vec<String>,
        /// Due date, YYYY-MM-DD or "YYYY-MM-DD HH:MM"
        #[arg(long)]
        due: Option<String>,
    },
    /// Add a new recurring task
    AddRecurring {
        title: String,
        #[arg(short, long)]
        description: Option<String>,
        /// daily, weekly or monthly
        #[arg(short, long)]
        pattern: String,
        /// Number of pattern units between occurrences
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        interval: i64,
    },
    /// List tasks
    List {
        /// completed or pending
        #[arg(long)]
        status: Option<String>,
        #[arg(long)]
        priority: Option<String>,
        #[arg(long)]
        tag: Option<String>,
        /// Only tasks due on this day (YYYY-MM-DD)
        #[arg(long)]
        due: Option<String>,
        /// title, priority, date or creation
        #[arg(long)]
        sort: Option<SortKey>,
        /// Keyword to search in title and description
        #[arg(long)]
        search: Option<String>,
    },
    /// Show one task
    Show {
        id: u64,
        /// Print as JSON
        #[arg(long)]
        json: bool,
    },
    /// Update a task
    Update {
        id: u64,
        #[arg(long)]
        title: Option<String>,
        #[arg(short, long)]
        description: Option<String>,
        /// Mark task as completed
        #[arg(long, conflicts_with = "not_completed")]
        completed: bool,
        /// Mark task as not completed
        #[arg(long)]
        not_completed: bool,
        /// New due date, YYYY-MM-DD or "YYYY-MM-DD HH:MM"
        #[arg(long)]
        due: Option<String>,
    },
    /// Set priority for a task
    Priority { id: u64, priority: String },
    /// Add a tag to a task
    AddTag { id: u64, tag: String },
    /// Remove a tag from a task
    RemoveTag { id: u64, tag: String },
    /// Mark a task as completed
    Complete { id: u64 },
    /// Mark a task as not completed
    Incomplete { id: u64 },
    /// Delete a task
    Delete { id: u64 },
    /// Update recurrence settings
    UpdateRecurrence {
        id: u64,
        #[arg(short, long)]
        pattern: Option<String>,
        #[arg(short, long, allow_negative_numbers = true)]
        interval: Option<i64>,
        /// true or false
        #[arg(short, long)]
        active: Option<bool>,
    },
    /// Cancel recurrence for a task
    CancelRecurrence { id: u64 },
    /// Show recurrence settings for a task
    ShowRecurrence { id: u64 },
    /// Turn an existing task into a recurring one
    MakeRecurring {
        id: u64,
        #[arg(short, long)]
        pattern: String,
        #[arg(short, long, default_value_t = 1, allow_negative_numbers = true)]
        interval: i64,
        /// First due date, YYYY-MM-DD
        #[arg(long)]
        due: Option<String>,
    },
    /// List recurring tasks
    Recurring,
    /// List overdue recurring tasks
    Overdue,
    /// Check recurring task data for integrity issues
    Check,
    /// Generate shell completions
    Completions {
        /// Shell to generate completions for (bash, zsh, fish, powershell, elvish)
        shell: String,
    },
    /// Open interactive TUI
    Ui,
}

fn run(command: Commands, config: &Config) -> Result<()> {
    let mut svc = TaskService::new();
    match command {
        Commands::Add { title, description, priority, tags, due } => {
            cmd_add(&mut svc, title, description, priority, tags, due)
        }
        Commands::AddRecurring { title, description, pattern, interval } => {
            cmd_add_recurring(&mut svc, title, description, pattern, interval)
        }
        Commands::List { status, priority, tag, due, sort, search } => cmd_list(
            &svc,
            ListOptions { status, priority, tag, due, sort, search },
            config.default_sort,
        ),
        Commands::Show { id, json } => cmd_show(&svc, id, json),
        Commands::Update { id, title, description, completed, not_completed, due } => {
            let completed = match (completed, not_completed) {
                (true, _) => Some(true),
                (_, true) => Some(false),
                _ => None,
            };
            cmd_update(&mut svc, id, title, description, completed, due)
        }
        Commands::Priority { id, priority } => cmd_priority(&mut svc, id, priority),
        Commands::AddTag { id, tag } => cmd_add_tag(&mut svc, id, tag),
        Commands::RemoveTag { id, tag } => cmd_remove_tag(&mut svc, id, tag),
        Commands::Complete { id } => cmd_complete(&mut svc, id),
        Commands::Incomplete { id } => cmd_incomplete(&mut svc, id),
        Commands::Delete { id } => cmd_delete(&mut svc, id),
        Commands::UpdateRecurrence { id, pattern, interval, active } => {
            cmd_update_recurrence(&mut svc, id, pattern, interval, active)
        }
        Commands::CancelRecurrence { id } => cmd_cancel_recurrence(&mut svc, id),
        Commands::ShowRecurrence { id } => cmd_show_recurrence(&mut svc, id),
        Commands::MakeRecurring { id, pattern, interval, due } => {
            cmd_make_recurring(&mut svc, id, pattern, interval, due)
        }
        Commands::Recurring => cmd_recurring(&mut svc),
        Commands::Overdue => cmd_overdue(&mut svc),
        Commands::Check => cmd_check(&mut svc),
        Commands::Completions { .. } | Commands::Ui => Ok(()),
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = Config::from_env();
    let interactive = matches!(cli.command, None | Some(Commands::Ui));

    if let Err(e) = init_logging(&config, interactive) {
        eprintln!("Failed to initialize logging: {}", e);
    }

    match cli.command {
        Some(Commands::Completions { shell }) => {
            let shell_enum = match shell.as_str() {
                "bash" => Shell::Bash,
                "zsh" => Shell::Zsh,
                "fish" => Shell::Fish,
                "powershell" => Shell::PowerShell,
                "elvish" => Shell::Elvish,
                _ => {
                    eprintln!("Unsupported shell: {}", shell);
                    return ExitCode::FAILURE;
                }
            };
            let mut cmd = Cli::command();
            generate(shell_enum, &mut cmd, "taskloop", &mut io::stdout());
            ExitCode::SUCCESS
        }
        Some(Commands::Ui) | None => {
            if let Err(e) = run_tui(&config) {
                eprintln!("Error running TUI: {}", e);
                return ExitCode::FAILURE;
            }
            ExitCode::SUCCESS
        }
        Some(command) => match run(command, &config) {
            Ok(()) => ExitCode::SUCCESS,
            Err(e) => {
                eprintln!("Error: {}", e);
                ExitCode::FAILURE
            }
        },
    }
}
