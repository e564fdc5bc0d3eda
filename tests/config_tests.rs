use std::env;
use std::fs;
use std::path::PathBuf;
use std::sync::Mutex;

use taskloop::config::{init_logging, Config};
use taskloop::service::SortKey;

// Tests mutate process-wide environment variables, so run them one at a time.
static ENV_MUTEX: Mutex<()> = Mutex::new(());

const VARS: [&str; 5] = [
    "TASKLOOP_LOG",
    "RUST_LOG",
    "TASKLOOP_LOG_FILE",
    "TASKLOOP_SORT",
    "TASKLOOP_SHOW_COMPLETED",
];

fn with_env<F>(vars: &[(&str, &str)], f: F)
where
    F: FnOnce(),
{
    let _guard = ENV_MUTEX.lock().unwrap_or_else(|e| e.into_inner());
    for key in VARS {
        env::remove_var(key);
    }
    for (key, value) in vars {
        env::set_var(key, value);
    }

    f();

    for key in VARS {
        env::remove_var(key);
    }
}

#[test]
fn test_defaults() {
    with_env(&[], || {
        let config = Config::from_env();
        assert_eq!(config.log_filter, "warn");
        assert_eq!(config.default_sort, SortKey::Title);
        assert!(!config.show_completed);
        assert!(config.warnings.is_empty());
        assert!(config.log_file.ends_with("taskloop.log"));
    });
}

#[test]
fn test_reads_all_variables() {
    with_env(
        &[
            ("TASKLOOP_LOG", "taskloop=debug"),
            ("TASKLOOP_LOG_FILE", "/tmp/taskloop-test.log"),
            ("TASKLOOP_SORT", "priority"),
            ("TASKLOOP_SHOW_COMPLETED", "yes"),
        ],
        || {
            let config = Config::from_env();
            assert_eq!(config.log_filter, "taskloop=debug");
            assert_eq!(config.log_file, PathBuf::from("/tmp/taskloop-test.log"));
            assert_eq!(config.default_sort, SortKey::Priority);
            assert!(config.show_completed);
            assert!(config.warnings.is_empty());
        },
    );
}

#[test]
fn test_rust_log_fallback() {
    with_env(&[("RUST_LOG", "info")], || {
        assert_eq!(Config::from_env().log_filter, "info");
    });
    with_env(&[("RUST_LOG", "info"), ("TASKLOOP_LOG", "trace")], || {
        assert_eq!(Config::from_env().log_filter, "trace");
    });
}

#[test]
fn test_invalid_values_become_warnings() {
    with_env(&[("TASKLOOP_SORT", "size"), ("TASKLOOP_SHOW_COMPLETED", "maybe")], || {
        let config = Config::from_env();
        assert_eq!(config.default_sort, SortKey::Title);
        assert!(!config.show_completed);
        assert_eq!(config.warnings.len(), 2);
    });
}

#[test]
fn test_blank_values_ignored() {
    with_env(&[("TASKLOOP_SORT", "  "), ("TASKLOOP_LOG", "")], || {
        let config = Config::from_env();
        assert_eq!(config.default_sort, SortKey::Title);
        assert_eq!(config.log_filter, "warn");
        assert!(config.warnings.is_empty());
    });
}

#[test]
fn test_file_logging_creates_log() {
    let mut dir = env::temp_dir();
    dir.push(format!("taskloop_test_{}", std::process::id()));
    let mut log_file = dir.clone();
    log_file.push("logs");
    log_file.push("taskloop.log");

    let config = Config { log_file: log_file.clone(), ..Config::default() };
    init_logging(&config, true).unwrap();
    assert!(log_file.exists());

    fs::remove_dir_all(&dir).unwrap();
}
