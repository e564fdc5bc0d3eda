use chrono::{Duration, Months, NaiveDate, NaiveDateTime};
use std::collections::BTreeMap;

use taskloop::error::{Result, TaskError};
use taskloop::models::{now, Priority, RecurrencePattern, Task};
use taskloop::recurrence::{audit, RecurrenceEngine, RecurrenceUpdate};
use taskloop::service::{NewTask, TaskService};
use taskloop::storage::{InMemoryStore, TaskStore};

fn at(y: i32, m: u32, d: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(y, m, d).unwrap().and_hms_opt(9, 0, 0).unwrap()
}

/// A store that skips validation, for records the engine would never write.
#[derive(Default)]
struct LooseStore {
    tasks: BTreeMap<u64, Task>,
    next_id: u64,
}

impl TaskStore for LooseStore {
    fn save(&mut self, mut task: Task) -> Result<u64> {
        self.next_id += 1;
        task.id = self.next_id;
        self.tasks.insert(task.id, task);
        Ok(self.next_id)
    }

    fn get(&self, id: u64) -> Option<Task> {
        self.tasks.get(&id).cloned()
    }

    fn get_all(&self) -> Vec<Task> {
        self.tasks.values().cloned().collect()
    }

    fn update(&mut self, id: u64, mut task: Task) -> Result<bool> {
        match self.tasks.get_mut(&id) {
            Some(slot) => {
                task.id = id;
                *slot = task;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    fn delete(&mut self, id: u64) -> bool {
        self.tasks.remove(&id).is_some()
    }
}

#[test]
fn test_create_recurring_task_is_root() {
    let mut svc = TaskService::new();
    let before = now();
    let task = svc.create_recurring_task("X", "", "monthly", 1).unwrap();
    let after = now();

    assert_eq!(task.original_task_id, Some(task.id));
    assert!(task.is_root());
    assert!(task.is_active);
    assert!(task.parent_id.is_none());

    let due = task.next_due_date.unwrap();
    assert!(due >= before.checked_add_months(Months::new(1)).unwrap());
    assert!(due <= after.checked_add_months(Months::new(1)).unwrap());

    let stored = svc.get_task(task.id).unwrap();
    assert_eq!(stored.original_task_id, Some(task.id));
}

#[test]
fn test_create_recurring_task_rejects_bad_input() {
    let mut svc = TaskService::new();
    assert!(matches!(
        svc.create_recurring_task("X", "", "yearly", 1),
        Err(TaskError::InvalidPattern(_))
    ));
    assert!(matches!(
        svc.create_recurring_task("X", "", "daily", 0),
        Err(TaskError::InvalidInterval(0))
    ));
    assert!(matches!(
        svc.create_recurring_task("  ", "", "daily", 1),
        Err(TaskError::EmptyTitle)
    ));
    assert!(svc.get_all_tasks_with_recurring().is_empty());
}

#[test]
fn test_completion_spawns_one_successor() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Standup", "daily sync", "daily", 2).unwrap();

    let done = svc.complete_task(task.id).unwrap().unwrap();
    assert!(done.task.completed);

    let next = done.next.expect("successor");
    assert_eq!(next.parent_id, Some(task.id));
    assert_eq!(next.original_task_id, Some(task.id));
    assert_eq!(next.title, "Standup");
    assert_eq!(next.description, "daily sync");
    assert_eq!(next.recurrence_pattern, Some(RecurrencePattern::Daily));
    assert_eq!(next.recurrence_interval, Some(2));
    assert!(!next.completed);
    assert!(next.is_active);
    assert_eq!(next.next_due_date.unwrap(), task.next_due_date.unwrap() + Duration::days(2));

    assert_eq!(svc.get_recurring_tasks().len(), 2);
}

#[test]
fn test_successor_inherits_priority_and_tags() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Review", "", "weekly", 1).unwrap();
    svc.set_priority(task.id, Priority::High).unwrap();
    svc.add_tag(task.id, "Work").unwrap();

    let next = svc.complete_task(task.id).unwrap().unwrap().next.unwrap();
    assert_eq!(next.priority, Priority::High);
    assert_eq!(next.tags, vec!["work".to_string()]);
}

#[test]
fn test_duplicate_successor_suppressed() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Water plants", "", "daily", 1).unwrap();

    let first = svc.complete_task(task.id).unwrap().unwrap();
    assert!(first.next.is_some());

    // Completing the same instance again targets the same due date.
    let second = svc.complete_task(task.id).unwrap().unwrap();
    assert!(second.next.is_none());
    assert_eq!(svc.get_recurring_tasks().len(), 2);
}

#[test]
fn test_prevent_duplicate_generation_window() {
    let mut store = InMemoryStore::new();
    let mut engine = RecurrenceEngine::new(&mut store);
    let task = engine.create_recurring_task("Backup", "", "daily", 1).unwrap();
    let due = task.next_due_date.unwrap();

    assert!(engine.prevent_duplicate_generation(task.id, due));
    assert!(engine.prevent_duplicate_generation(task.id, due + Duration::seconds(30)));
    assert!(!engine.prevent_duplicate_generation(task.id, due + Duration::seconds(60)));
    assert!(!engine.prevent_duplicate_generation(task.id + 100, due));
}

#[test]
fn test_inactive_task_has_no_successor() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Gym", "", "daily", 1).unwrap();
    assert!(svc.cancel_recurrence(task.id).unwrap());

    let done = svc.complete_task(task.id).unwrap().unwrap();
    assert!(done.task.completed);
    assert!(!done.task.is_active);
    assert!(done.next.is_none());
    assert_eq!(svc.get_recurring_tasks().len(), 1);
}

#[test]
fn test_plain_task_completion_has_no_successor() {
    let mut svc = TaskService::new();
    let task = svc.create_task(NewTask::titled("Buy milk")).unwrap();
    let done = svc.complete_task(task.id).unwrap().unwrap();
    assert!(done.task.completed);
    assert!(done.next.is_none());
    assert!(svc.complete_task(999).unwrap().is_none());
}

#[test]
fn test_handle_completion_of_unstored_task() {
    let mut store = InMemoryStore::new();
    let mut engine = RecurrenceEngine::new(&mut store);
    let mut ghost = Task::recurring("Ghost", "", RecurrencePattern::Daily, None);
    ghost.id = 50;
    ghost.next_due_date = Some(at(2024, 1, 1));
    assert!(engine.handle_task_completion(&ghost).unwrap().is_none());
    assert!(store.is_empty());
}

#[test]
fn test_cancel_recurrence_on_plain_task_changes_nothing() {
    let mut svc = TaskService::new();
    let task = svc.create_task(NewTask::titled("Plain")).unwrap();
    let before = svc.get_all_tasks_with_recurring();

    assert!(!svc.cancel_recurrence(task.id).unwrap());
    assert!(!svc.cancel_recurrence(404).unwrap());
    assert_eq!(svc.get_all_tasks_with_recurring(), before);
}

#[test]
fn test_cancel_keeps_other_instances_active() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Journal", "", "daily", 1).unwrap();
    let next = svc.complete_task(task.id).unwrap().unwrap().next.unwrap();

    assert!(svc.cancel_recurrence(task.id).unwrap());
    assert!(!svc.get_task(task.id).unwrap().is_active);
    assert!(svc.get_task(next.id).unwrap().is_active);
}

#[test]
fn test_update_with_invalid_pattern_leaves_task_unchanged() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Report", "", "weekly", 1).unwrap();
    let before = svc.get_task(task.id).unwrap();

    let update = RecurrenceUpdate { pattern: Some("yearly".into()), ..RecurrenceUpdate::default() };
    assert!(matches!(
        svc.update_recurrence_settings(task.id, &update),
        Err(TaskError::InvalidPattern(_))
    ));
    assert_eq!(svc.get_task(task.id).unwrap(), before);

    let update = RecurrenceUpdate { interval: Some(-1), ..RecurrenceUpdate::default() };
    assert!(matches!(
        svc.update_recurrence_settings(task.id, &update),
        Err(TaskError::InvalidInterval(-1))
    ));
    assert_eq!(svc.get_task(task.id).unwrap(), before);
}

#[test]
fn test_update_recurrence_settings_partial() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Report", "", "weekly", 1).unwrap();

    let update = RecurrenceUpdate {
        pattern: Some("Monthly".into()),
        interval: Some(3),
        ..RecurrenceUpdate::default()
    };
    assert!(svc.update_recurrence_settings(task.id, &update).unwrap());

    let stored = svc.get_task(task.id).unwrap();
    assert_eq!(stored.recurrence_pattern, Some(RecurrencePattern::Monthly));
    assert_eq!(stored.recurrence_interval, Some(3));
    assert!(stored.is_active);
    // The current occurrence keeps its due date.
    assert_eq!(stored.next_due_date, task.next_due_date);

    let plain = svc.create_task(NewTask::titled("Plain")).unwrap();
    assert!(!svc.update_recurrence_settings(plain.id, &update).unwrap());
    assert!(!svc.update_recurrence_settings(404, &update).unwrap());
}

#[test]
fn test_updated_interval_applies_to_next_instance() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Stretch", "", "daily", 1).unwrap();
    let update = RecurrenceUpdate { interval: Some(5), ..RecurrenceUpdate::default() };
    assert!(svc.handle_mid_cycle_changes(task.id, &update).unwrap());

    let next = svc.complete_task(task.id).unwrap().unwrap().next.unwrap();
    assert_eq!(next.next_due_date.unwrap(), task.next_due_date.unwrap() + Duration::days(5));
    assert_eq!(next.recurrence_interval, Some(5));
}

#[test]
fn test_mid_cycle_change_revalidates_whole_record() {
    let mut store = LooseStore::default();
    let mut broken = Task::recurring("  ", "", RecurrencePattern::Daily, None);
    broken.next_due_date = Some(at(2024, 1, 1));
    let id = store.save(broken).unwrap();
    let before = store.get(id).unwrap();

    let update = RecurrenceUpdate { is_active: Some(false), ..RecurrenceUpdate::default() };
    let mut engine = RecurrenceEngine::new(&mut store);
    match engine.handle_mid_cycle_changes(id, &update) {
        Err(TaskError::InvalidAfterUpdate(inner)) => assert!(matches!(*inner, TaskError::EmptyTitle)),
        other => panic!("unexpected: {:?}", other),
    }
    assert_eq!(store.get(id).unwrap(), before);

    // The plain update path relies on the store and lets it through.
    let mut engine = RecurrenceEngine::new(&mut store);
    assert!(engine.update_recurrence_settings(id, &update).unwrap());
    assert!(!store.get(id).unwrap().is_active);
}

#[test]
fn test_integrity_check_self_parent() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Loop", "", "daily", 1).unwrap();
    let mut looped = svc.get_task(task.id).unwrap();
    looped.parent_id = Some(task.id);

    let report = audit(&[looped]);
    assert_eq!(report.integrity_issues.len(), 1);
    assert!(report.integrity_issues[0].contains(&format!("Task {}", task.id)));
    assert!(report.has_issues);
    assert_eq!(report.total_recurring_tasks, 1);
    assert_eq!(report.valid_recurring_tasks, 0);
}

#[test]
fn test_integrity_check_on_store() {
    let mut store = LooseStore::default();
    let mut no_pattern = Task::recurring("A", "", RecurrencePattern::Daily, None);
    no_pattern.recurrence_pattern = None;
    let a = store.save(no_pattern).unwrap();

    let mut zero = Task::recurring("B", "", RecurrencePattern::Weekly, None);
    zero.recurrence_interval = Some(0);
    let b = store.save(zero).unwrap();

    let plain = store.save(Task::new("Plain", "")).unwrap();
    let mut orphan = Task::recurring("C", "", RecurrencePattern::Daily, None);
    orphan.original_task_id = Some(plain);
    let c = store.save(orphan).unwrap();

    let good = store.save(Task::recurring("D", "", RecurrencePattern::Monthly, Some(2))).unwrap();
    let mut good_task = store.get(good).unwrap();
    good_task.original_task_id = Some(good);
    store.update(good, good_task).unwrap();

    let engine = RecurrenceEngine::new(&mut store);
    let report = engine.perform_data_integrity_check();
    assert_eq!(report.total_recurring_tasks, 4);
    assert_eq!(report.valid_recurring_tasks, 1);
    assert_eq!(
        report.integrity_issues,
        vec![
            format!("Task {}: Invalid recurrence pattern 'none'", a),
            format!("Task {}: Invalid recurrence interval '0'", b),
            format!("Task {}: Original task {} is not recurring", c, plain),
        ]
    );
}

#[test]
fn test_integrity_check_clean_store() {
    let mut svc = TaskService::new();
    let task = svc.create_recurring_task("Clean", "", "weekly", 1).unwrap();
    svc.complete_task(task.id).unwrap();
    svc.create_task(NewTask::titled("Plain")).unwrap();

    let report = svc.integrity_report();
    assert!(!report.has_issues);
    assert_eq!(report.total_recurring_tasks, 2);
    assert_eq!(report.valid_recurring_tasks, 2);
}

#[test]
fn test_round_trip_complete_and_list() {
    let mut svc = TaskService::new();
    let original = svc.create_recurring_task("Pay rent", "", "monthly", 1).unwrap();
    svc.complete_task(original.id).unwrap();

    let recurring = svc.get_recurring_tasks();
    assert_eq!(recurring.len(), 2);

    let first = recurring.iter().find(|t| t.id == original.id).unwrap();
    assert!(first.completed);

    let successor = recurring.iter().find(|t| t.id != original.id).unwrap();
    assert!(!successor.completed);
    assert_eq!(successor.original_task_id, Some(original.id));
    assert_eq!(successor.parent_id, Some(original.id));
}

#[test]
fn test_lineage_walks_back_to_template() {
    let mut svc = TaskService::new();
    let root = svc.create_recurring_task("Chain", "", "daily", 1).unwrap();
    let second = svc.complete_task(root.id).unwrap().unwrap().next.unwrap();
    let third = svc.complete_task(second.id).unwrap().unwrap().next.unwrap();

    assert_eq!(third.parent_id, Some(second.id));
    assert_eq!(third.original_task_id, Some(root.id));

    let ids: Vec<u64> = svc.lineage(third.id).iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![third.id, second.id, root.id]);
    assert!(svc.lineage(999).is_empty());
}

#[test]
fn test_lineage_stops_on_cycle() {
    let mut store = InMemoryStore::new();
    let id = store.save(Task::new("Self", "")).unwrap();
    let mut task = store.get(id).unwrap();
    task.parent_id = Some(id);
    store.update(id, task).unwrap();

    let engine = RecurrenceEngine::new(&mut store);
    assert_eq!(engine.lineage(id).len(), 1);
}

#[test]
fn test_overdue_recurring_tasks() {
    let mut svc = TaskService::new();
    let late = svc.create_recurring_task("Late", "", "daily", 1).unwrap();
    let cancelled = svc.create_recurring_task("Cancelled", "", "daily", 1).unwrap();
    svc.cancel_recurrence(cancelled.id).unwrap();
    let done = svc.create_recurring_task("Done", "", "daily", 1).unwrap();
    svc.complete_task(done.id).unwrap();
    svc.create_task(NewTask { due_date: Some(at(2000, 1, 1)), ..NewTask::titled("Plain") }).unwrap();

    let later = now() + Duration::days(2) + Duration::hours(1);
    let overdue: Vec<u64> = svc.recurrence().overdue_as_of(later).iter().map(|t| t.id).collect();
    // "Done" spawned a successor due in two days, which is overdue too.
    assert!(overdue.contains(&late.id));
    assert!(!overdue.contains(&cancelled.id));
    assert!(!overdue.contains(&done.id));
    assert_eq!(overdue.len(), 2);

    assert!(svc.overdue_recurring_tasks().is_empty());
}

#[test]
fn test_make_recurring() {
    let mut svc = TaskService::new();
    let task = svc
        .create_task(NewTask { due_date: Some(at(2024, 1, 1)), ..NewTask::titled("Clean desk") })
        .unwrap();

    let converted = svc.make_recurring(task.id, "weekly", 2, Some(at(2024, 1, 10))).unwrap().unwrap();
    assert!(converted.is_root());
    assert_eq!(converted.next_due_date, Some(at(2024, 1, 10)));
    assert!(converted.due_date.is_none());
    assert_eq!(svc.get_task(task.id).unwrap(), converted);

    let next = svc.complete_task(task.id).unwrap().unwrap().next.unwrap();
    assert_eq!(next.next_due_date, Some(at(2024, 1, 24)));

    assert!(matches!(
        svc.make_recurring(task.id, "daily", 1, None),
        Err(TaskError::AlreadyRecurring(_))
    ));
    assert!(svc.make_recurring(999, "daily", 1, None).unwrap().is_none());

    let other = svc.create_task(NewTask::titled("Other")).unwrap();
    assert!(svc.make_recurring(other.id, "yearly", 1, None).is_err());
    assert!(!svc.get_task(other.id).unwrap().is_recurring);
}
