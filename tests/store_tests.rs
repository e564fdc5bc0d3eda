use taskloop::error::TaskError;
use taskloop::models::{RecurrencePattern, Task};
use taskloop::storage::{InMemoryStore, TaskStore};

#[test]
fn test_save_assigns_increasing_ids() {
    let mut store = InMemoryStore::new();
    let a = store.save(Task::new("First", "")).unwrap();
    let b = store.save(Task::new("Second", "")).unwrap();
    assert_eq!(a, 1);
    assert_eq!(b, 2);
    assert_eq!(store.len(), 2);
    assert_eq!(store.get(a).unwrap().id, a);
}

#[test]
fn test_save_ignores_incoming_id() {
    let mut store = InMemoryStore::new();
    let mut task = Task::new("Task", "");
    task.id = 42;
    let id = store.save(task).unwrap();
    assert_eq!(id, 1);
    assert!(store.get(42).is_none());
}

#[test]
fn test_ids_not_reused_after_delete() {
    let mut store = InMemoryStore::new();
    let a = store.save(Task::new("A", "")).unwrap();
    assert!(store.delete(a));
    let b = store.save(Task::new("B", "")).unwrap();
    assert_ne!(a, b);
}

#[test]
fn test_save_rejects_invalid_task() {
    let mut store = InMemoryStore::new();
    assert!(matches!(store.save(Task::new("   ", "")), Err(TaskError::EmptyTitle)));

    let mut bad = Task::recurring("Bad", "", RecurrencePattern::Daily, None);
    bad.recurrence_interval = Some(0);
    assert!(matches!(store.save(bad), Err(TaskError::InvalidInterval(0))));

    let mut no_pattern = Task::recurring("Bad", "", RecurrencePattern::Daily, None);
    no_pattern.recurrence_pattern = None;
    assert!(matches!(store.save(no_pattern), Err(TaskError::MissingPattern)));

    assert!(store.is_empty());
}

#[test]
fn test_get_all_in_insertion_order() {
    let mut store = InMemoryStore::new();
    for title in ["one", "two", "three"] {
        store.save(Task::new(title, "")).unwrap();
    }
    let titles: Vec<String> = store.get_all().into_iter().map(|t| t.title).collect();
    assert_eq!(titles, vec!["one", "two", "three"]);
}

#[test]
fn test_update_existing_and_missing() {
    let mut store = InMemoryStore::new();
    let id = store.save(Task::new("Old", "")).unwrap();

    let mut task = store.get(id).unwrap();
    task.title = "New".into();
    assert!(store.update(id, task.clone()).unwrap());
    assert_eq!(store.get(id).unwrap().title, "New");

    assert!(!store.update(99, task).unwrap());
    assert!(store.get(99).is_none());
}

#[test]
fn test_update_rejects_invalid_and_keeps_record() {
    let mut store = InMemoryStore::new();
    let id = store.save(Task::new("Keep", "")).unwrap();

    let mut task = store.get(id).unwrap();
    task.title = String::new();
    assert!(store.update(id, task).is_err());
    assert_eq!(store.get(id).unwrap().title, "Keep");
}

#[test]
fn test_update_forces_key_id() {
    let mut store = InMemoryStore::new();
    let id = store.save(Task::new("Task", "")).unwrap();
    let mut task = store.get(id).unwrap();
    task.id = 7;
    store.update(id, task).unwrap();
    assert_eq!(store.get(id).unwrap().id, id);
}

#[test]
fn test_delete_missing_returns_false() {
    let mut store = InMemoryStore::new();
    assert!(!store.delete(1));
}
