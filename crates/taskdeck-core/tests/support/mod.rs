#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use parking_lot::Mutex;
use taskdeck_core::error::StoreError;
use taskdeck_core::remote::RemoteStore;
use taskdeck_shared::{
    DEFAULT_CATEGORY, StatBucket, TaskCreate, TaskDto, TaskFilter, TaskPatch, TaskPriority,
    TaskStats,
};
use tokio::sync::oneshot;

/// In-memory stand-in for the remote store. Newest records come first, the
/// way the store sorts them.
#[derive(Default)]
pub struct FakeStore {
    records: Mutex<Vec<TaskDto>>,
    next_id: Mutex<u64>,
    list_calls: Mutex<Vec<TaskFilter>>,
    mutation_calls: Mutex<usize>,
    list_gates: Mutex<VecDeque<oneshot::Receiver<()>>>,
    failing: Mutex<bool>,
}

impl FakeStore {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn seeded(records: Vec<TaskDto>) -> Arc<Self> {
        let store = Self::default();
        *store.next_id.lock() = records.len() as u64;
        *store.records.lock() = records;
        Arc::new(store)
    }

    pub fn list_calls(&self) -> Vec<TaskFilter> {
        self.list_calls.lock().clone()
    }

    pub fn mutation_calls(&self) -> usize {
        *self.mutation_calls.lock()
    }

    pub fn records(&self) -> Vec<TaskDto> {
        self.records.lock().clone()
    }

    pub fn set_failing(&self, failing: bool) {
        *self.failing.lock() = failing;
    }

    /// The next `list` call waits until the returned sender fires.
    pub fn gate_next_list(&self) -> oneshot::Sender<()> {
        let (tx, rx) = oneshot::channel();
        self.list_gates.lock().push_back(rx);
        tx
    }

    fn check_failing(&self, path: &str) -> Result<(), StoreError> {
        if *self.failing.lock() {
            return Err(StoreError::Rejected {
                url: format!("http://fake{path}"),
                status: 503,
                body: "store unavailable".to_string(),
            });
        }
        Ok(())
    }

    fn not_found(id: &str) -> StoreError {
        StoreError::Rejected {
            url: format!("http://fake/tasks/{id}"),
            status: 404,
            body: "Todo not found".to_string(),
        }
    }
}

pub fn matches(task: &TaskDto, filter: &TaskFilter) -> bool {
    if let Some(completed) = filter.completed
        && task.completed != completed
    {
        return false;
    }
    if let Some(priority) = filter.priority
        && task.priority != priority
    {
        return false;
    }
    if let Some(category) = filter.category.as_deref()
        && task.category != category
    {
        return false;
    }
    if let Some(search) = filter.search.as_deref() {
        let needle = search.to_lowercase();
        let in_title = task.title.to_lowercase().contains(&needle);
        let in_description = task
            .description
            .as_deref()
            .is_some_and(|d| d.to_lowercase().contains(&needle));
        if !in_title && !in_description {
            return false;
        }
    }
    true
}

#[async_trait]
impl RemoteStore for FakeStore {
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskDto>, StoreError> {
        self.list_calls.lock().push(filter.clone());
        let gate = self.list_gates.lock().pop_front();
        if let Some(gate) = gate {
            let _ = gate.await;
        }
        self.check_failing("/tasks")?;

        Ok(self
            .records
            .lock()
            .iter()
            .filter(|task| matches(task, filter))
            .cloned()
            .collect())
    }

    async fn get(&self, id: &str) -> Result<TaskDto, StoreError> {
        self.check_failing("/tasks/id")?;
        self.records
            .lock()
            .iter()
            .find(|task| task.id == id)
            .cloned()
            .ok_or_else(|| Self::not_found(id))
    }

    async fn create(&self, draft: &TaskCreate) -> Result<TaskDto, StoreError> {
        *self.mutation_calls.lock() += 1;
        self.check_failing("/tasks")?;

        let id = {
            let mut next = self.next_id.lock();
            *next += 1;
            *next
        };
        let task = TaskDto {
            id: format!("t{id}"),
            title: draft.title.clone(),
            description: draft.description.clone(),
            completed: false,
            priority: draft.priority.unwrap_or_default(),
            category: draft
                .category
                .clone()
                .unwrap_or_else(|| DEFAULT_CATEGORY.to_string()),
            due_date: draft.due_date,
            created_at: stamp(id),
            updated_at: stamp(id),
        };
        self.records.lock().insert(0, task.clone());
        Ok(task)
    }

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<TaskDto, StoreError> {
        *self.mutation_calls.lock() += 1;
        self.check_failing("/tasks/id")?;

        let mut records = self.records.lock();
        let task = records
            .iter_mut()
            .find(|task| task.id == id)
            .ok_or_else(|| Self::not_found(id))?;

        if let Some(title) = patch.title.clone() {
            task.title = title;
        }
        if let Some(description) = patch.description.clone() {
            task.description = Some(description);
        }
        if let Some(completed) = patch.completed {
            task.completed = completed;
        }
        if let Some(priority) = patch.priority {
            task.priority = priority;
        }
        if let Some(category) = patch.category.clone() {
            task.category = category;
        }
        if patch.due_date.is_some() {
            task.due_date = patch.due_date;
        }
        task.updated_at += chrono::Duration::seconds(1);
        Ok(task.clone())
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        *self.mutation_calls.lock() += 1;
        self.check_failing("/tasks/id")?;

        let mut records = self.records.lock();
        let before = records.len();
        records.retain(|task| task.id != id);
        if records.len() == before {
            return Err(Self::not_found(id));
        }
        Ok(())
    }

    async fn stats(&self) -> Result<TaskStats, StoreError> {
        self.check_failing("/tasks/stats")?;

        let records = self.records.lock();
        let completed = records.iter().filter(|task| task.completed).count() as u64;
        let mut by_priority: Vec<StatBucket> = Vec::new();
        for priority in [TaskPriority::High, TaskPriority::Medium, TaskPriority::Low] {
            let count = records.iter().filter(|t| t.priority == priority).count() as u64;
            if count > 0 {
                by_priority.push(StatBucket {
                    key: priority.to_string(),
                    count,
                });
            }
        }
        Ok(TaskStats {
            total: records.len() as u64,
            completed,
            pending: records.len() as u64 - completed,
            by_priority,
            by_category: vec![],
        })
    }
}

pub fn stamp(offset: u64) -> chrono::DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 2, 16, 5, 0, 0)
        .single()
        .expect("valid timestamp")
        + chrono::Duration::minutes(offset as i64)
}

pub fn task(id: &str, title: &str, completed: bool) -> TaskDto {
    TaskDto {
        id: id.to_string(),
        title: title.to_string(),
        description: None,
        completed,
        priority: TaskPriority::Medium,
        category: DEFAULT_CATEGORY.to_string(),
        due_date: None,
        created_at: stamp(0),
        updated_at: stamp(0),
    }
}
