mod support;

use std::sync::Arc;

use support::{FakeStore, task};
use taskdeck_core::error::{Action, TaskError};
use taskdeck_core::manager::{LoadOrdering, TaskStateManager};
use taskdeck_shared::{TaskCreate, TaskFilter, TaskPatch, TaskPriority};

fn manager_for(store: &Arc<FakeStore>) -> TaskStateManager {
    TaskStateManager::new(store.clone())
}

fn completed_filter(completed: bool) -> TaskFilter {
    TaskFilter {
        completed: Some(completed),
        ..TaskFilter::default()
    }
}

#[tokio::test]
async fn starts_empty_and_idle() {
    let store = FakeStore::new();
    let manager = manager_for(&store);

    let view = manager.snapshot();
    assert!(view.tasks.is_empty());
    assert!(!view.loading);
    assert!(view.error.is_none());
    assert!(store.list_calls().is_empty());
}

#[tokio::test]
async fn created_task_appears_with_defaults_after_reload() {
    let store = FakeStore::new();
    let manager = manager_for(&store);

    let created = manager
        .create(TaskCreate::new("Write report"))
        .await
        .expect("create succeeds");
    assert_eq!(manager.tasks().len(), 1);
    assert_eq!(manager.tasks()[0].id, created.id);

    manager.load(TaskFilter::default()).await;
    let tasks = manager.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Write report");
    assert_eq!(tasks[0].priority, TaskPriority::Medium);
    assert_eq!(tasks[0].category, "general");
    assert!(!tasks[0].completed);
}

#[tokio::test]
async fn create_prepends_to_current_view() {
    let store = FakeStore::seeded(vec![task("a", "older", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;

    let created = manager
        .create(TaskCreate::new("  newer  "))
        .await
        .expect("create succeeds");

    let ids: Vec<String> = manager.tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec![created.id.clone(), "a".to_string()]);
    assert_eq!(created.title, "newer");
}

#[tokio::test]
async fn blank_title_is_rejected_before_any_request() {
    let store = FakeStore::new();
    let manager = manager_for(&store);

    let err = manager
        .create(TaskCreate::new("   "))
        .await
        .expect_err("blank title");

    assert!(matches!(err, TaskError::BlankTitle));
    assert_eq!(store.mutation_calls(), 0);
    assert!(manager.error().is_none());
    assert!(manager.tasks().is_empty());
}

#[tokio::test]
async fn marking_complete_changes_only_the_completion_flag() {
    let mut seeded = task("a", "Pay rent", false);
    seeded.description = Some("before the 5th".to_string());
    seeded.priority = TaskPriority::High;
    seeded.category = "home".to_string();
    let store = FakeStore::seeded(vec![seeded.clone(), task("b", "Other", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;

    manager
        .update("a", TaskPatch::completed(true))
        .await
        .expect("update succeeds");

    let reread = manager.get("a").await.expect("get succeeds");
    assert!(reread.completed);
    assert_eq!(reread.title, seeded.title);
    assert_eq!(reread.description, seeded.description);
    assert_eq!(reread.priority, seeded.priority);
    assert_eq!(reread.category, seeded.category);
    assert_eq!(reread.due_date, seeded.due_date);
    assert_eq!(reread.created_at, seeded.created_at);

    let ids: Vec<String> = manager.tasks().iter().map(|t| t.id.clone()).collect();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
    assert!(manager.tasks()[0].completed);
}

#[tokio::test]
async fn repeated_delete_fails_not_found_and_keeps_collection() {
    let store = FakeStore::seeded(vec![task("a", "one", false), task("b", "two", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;

    manager.delete("a").await.expect("first delete succeeds");
    assert_eq!(manager.tasks().len(), 1);
    assert!(manager.error().is_none());

    let before = manager.tasks();
    let err = manager.delete("a").await.expect_err("second delete fails");
    assert!(err.is_not_found());
    assert_eq!(manager.tasks(), before);
    assert_eq!(manager.error().map(|s| s.action), Some(Action::Delete));
}

#[tokio::test]
async fn update_of_unknown_id_is_reported_by_the_store() {
    let store = FakeStore::seeded(vec![task("a", "one", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;

    let err = manager
        .update("zzz", TaskPatch::completed(true))
        .await
        .expect_err("unknown id");

    assert!(err.is_not_found());
    assert_eq!(store.mutation_calls(), 1);
    assert_eq!(manager.error().map(|s| s.label()), Some("failed to update task"));
    assert_eq!(manager.tasks().len(), 1);
}

#[tokio::test]
async fn identical_serial_loads_return_identical_collections() {
    let store = FakeStore::seeded(vec![
        task("a", "alpha", false),
        task("b", "beta", true),
        task("c", "gamma", false),
    ]);
    let manager = manager_for(&store);
    let filter = completed_filter(false);

    manager.load(filter.clone()).await;
    let first = manager.tasks();
    manager.load(filter).await;
    let second = manager.tasks();

    assert_eq!(first, second);
    assert_eq!(first.len(), 2);
}

#[tokio::test]
async fn buy_milk_scenario() {
    let store = FakeStore::new();
    let manager = manager_for(&store);

    let created = manager
        .create(TaskCreate {
            title: "Buy milk".to_string(),
            priority: Some(TaskPriority::High),
            category: Some("errand".to_string()),
            ..TaskCreate::default()
        })
        .await
        .expect("create succeeds");

    let tasks = manager.tasks();
    assert_eq!(tasks.len(), 1);
    assert_eq!(tasks[0].title, "Buy milk");
    assert!(!tasks[0].completed);
    assert_eq!(tasks[0].priority, TaskPriority::High);
    assert_eq!(tasks[0].category, "errand");

    manager
        .toggle_complete(&created.id)
        .await
        .expect("toggle succeeds");
    assert!(manager.tasks()[0].completed);

    manager.load(completed_filter(true)).await;
    assert_eq!(manager.tasks().len(), 1);
    assert_eq!(manager.tasks()[0].id, created.id);

    manager.load(completed_filter(false)).await;
    assert!(manager.tasks().is_empty());
}

#[tokio::test]
async fn toggle_of_task_outside_view_is_rejected_locally() {
    let store = FakeStore::seeded(vec![task("a", "one", false)]);
    let manager = manager_for(&store);

    let err = manager.toggle_complete("a").await.expect_err("not loaded");
    assert!(matches!(err, TaskError::UnknownTask(_)));
    assert_eq!(store.mutation_calls(), 0);
}

#[tokio::test]
async fn failed_load_keeps_last_good_collection() {
    let store = FakeStore::seeded(vec![task("a", "one", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;
    let good = manager.tasks();

    store.set_failing(true);
    manager.load(completed_filter(true)).await;

    let view = manager.snapshot();
    assert_eq!(view.tasks, good);
    assert!(!view.loading);
    let status = view.error.expect("error recorded");
    assert_eq!(status.label(), "failed to fetch tasks");
    assert!(status.detail.contains("503"));

    store.set_failing(false);
    manager.refresh().await;
    assert!(manager.error().is_none());
    assert!(manager.tasks().is_empty(), "refresh reuses completed=true");
}

#[tokio::test]
async fn failed_mutation_is_recorded_and_returned() {
    let store = FakeStore::seeded(vec![task("a", "one", false)]);
    let manager = manager_for(&store);
    manager.load(TaskFilter::default()).await;

    store.set_failing(true);
    let err = manager
        .create(TaskCreate::new("two"))
        .await
        .expect_err("store down");
    assert!(matches!(err, TaskError::Store(_)));
    assert_eq!(manager.tasks().len(), 1);
    assert_eq!(manager.error().map(|s| s.action), Some(Action::Create));

    store.set_failing(false);
    manager
        .update("a", TaskPatch::completed(true))
        .await
        .expect("update succeeds");
    assert!(manager.error().is_none(), "a successful mutation clears the status");
}

#[tokio::test]
async fn refresh_reissues_most_recent_criteria() {
    let store = FakeStore::new();
    let manager = manager_for(&store);

    manager.refresh().await;
    let filter = TaskFilter {
        search: Some("milk".to_string()),
        ..TaskFilter::default()
    };
    manager.load(filter.clone()).await;
    manager.refresh().await;

    assert_eq!(
        store.list_calls(),
        vec![TaskFilter::default(), filter.clone(), filter]
    );
}

#[tokio::test]
async fn subscribers_see_loading_then_result() {
    let store = FakeStore::seeded(vec![task("a", "one", false)]);
    let manager = Arc::new(manager_for(&store));
    let mut updates = manager.subscribe();

    let gate = store.gate_next_list();
    let loader = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.load(TaskFilter::default()).await })
    };

    updates.changed().await.expect("loading published");
    assert!(updates.borrow_and_update().loading);

    gate.send(()).expect("release list");
    loader.await.expect("load task");
    updates.changed().await.expect("result published");
    let view = updates.borrow_and_update().clone();
    assert!(!view.loading);
    assert_eq!(view.tasks.len(), 1);
}

async fn race_two_loads(ordering: LoadOrdering) -> Vec<String> {
    let store = FakeStore::seeded(vec![task("done", "finished", true), task("open", "todo", false)]);
    let manager = Arc::new(TaskStateManager::with_ordering(store.clone(), ordering));

    let release_first = store.gate_next_list();
    let first = {
        let manager = Arc::clone(&manager);
        tokio::spawn(async move { manager.load(completed_filter(true)).await })
    };
    while store.list_calls().is_empty() {
        tokio::task::yield_now().await;
    }

    manager.load(completed_filter(false)).await;
    release_first.send(()).expect("release first load");
    first.await.expect("first load task");

    assert!(!manager.is_loading());
    manager.tasks().iter().map(|t| t.id.clone()).collect()
}

#[tokio::test]
async fn overlapping_loads_apply_in_arrival_order() {
    let ids = race_two_loads(LoadOrdering::ArrivalOrder).await;
    assert_eq!(ids, vec!["done".to_string()], "the slower, earlier load lands last");
}

#[tokio::test]
async fn latest_issued_ordering_drops_stale_responses() {
    let ids = race_two_loads(LoadOrdering::LatestIssued).await;
    assert_eq!(ids, vec!["open".to_string()]);
}
