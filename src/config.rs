use std::fs::{self, OpenOptions};
use std::path::PathBuf;
use std::sync::Mutex;

use tracing::warn;
use tracing_subscriber::EnvFilter;

use crate::error::Result;
use crate::service::SortKey;

const DEFAULT_FILTER: &str = "warn";

/// Settings read from the environment.
///
/// - `TASKLOOP_LOG`: log filter (falls back to `RUST_LOG`, then `warn`).
/// - `TASKLOOP_LOG_FILE`: log file used while the TUI owns the terminal.
/// - `TASKLOOP_SORT`: default sort key (`title`, `priority`, `date`, `creation`).
/// - `TASKLOOP_SHOW_COMPLETED`: show completed tasks when the TUI opens.
#[derive(Debug, Clone)]
pub struct Config {
    pub log_filter: String,
    pub log_file: PathBuf,
    pub default_sort: SortKey,
    pub show_completed: bool,
    /// Problems found while reading the environment, logged once logging is up.
    pub warnings: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            log_filter: DEFAULT_FILTER.to_string(),
            log_file: default_log_file(),
            default_sort: SortKey::default(),
            show_completed: false,
            warnings: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_env() -> Self {
        let mut config = Config::default();

        if let Some(filter) = env_var("TASKLOOP_LOG").or_else(|| env_var("RUST_LOG")) {
            config.log_filter = filter;
        }
        if let Some(path) = env_var("TASKLOOP_LOG_FILE") {
            config.log_file = PathBuf::from(path);
        }
        if let Some(sort) = env_var("TASKLOOP_SORT") {
            match sort.parse() {
                Ok(key) => config.default_sort = key,
                Err(e) => config.warnings.push(format!("ignoring TASKLOOP_SORT: {}", e)),
            }
        }
        if let Some(flag) = env_var("TASKLOOP_SHOW_COMPLETED") {
            match parse_flag(&flag) {
                Some(v) => config.show_completed = v,
                None => config
                    .warnings
                    .push(format!("ignoring TASKLOOP_SHOW_COMPLETED='{}'", flag)),
            }
        }
        config
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.trim().is_empty())
}

fn parse_flag(s: &str) -> Option<bool> {
    match s.trim().to_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Some(true),
        "0" | "false" | "no" | "off" => Some(false),
        _ => None,
    }
}

/// `<data dir>/taskloop/taskloop.log`, or `./taskloop.log` without a data dir.
fn default_log_file() -> PathBuf {
    match dirs::data_local_dir() {
        Some(mut p) => {
            p.push("taskloop");
            p.push("taskloop.log");
            p
        }
        None => PathBuf::from("taskloop.log"),
    }
}

/// Installs the global subscriber. With `to_file` the log is appended to
/// `config.log_file` instead of stderr.
pub fn init_logging(config: &Config, to_file: bool) -> Result<()> {
    let filter = EnvFilter::try_new(&config.log_filter).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter).with_target(false);

    if to_file {
        if let Some(parent) = config.log_file.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let file = OpenOptions::new().create(true).append(true).open(&config.log_file)?;
        let _ = builder.with_ansi(false).with_writer(Mutex::new(file)).try_init();
    } else {
        let _ = builder.with_writer(std::io::stderr).try_init();
    }
    for w in &config.warnings {
        warn!("{}", w);
    }
    Ok(())
}
