use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use taskdeck_shared::{TaskCreate, TaskDto, TaskFilter, TaskPatch};
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

use crate::error::{Action, ErrorStatus, StoreError, TaskError};
use crate::remote::RemoteStore;

/// How overlapping `load` calls settle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LoadOrdering {
    /// Every response is applied as it arrives, so a slow earlier request can
    /// overwrite a faster later one.
    #[default]
    ArrivalOrder,
    /// Each load carries a generation; only the most recently issued load may
    /// touch the view.
    LatestIssued,
}

/// Everything a view can observe about the task collection.
#[derive(Debug, Clone, PartialEq)]
pub struct ViewState {
    pub tasks: Arc<[TaskDto]>,
    pub loading: bool,
    pub error: Option<ErrorStatus>,
}

impl Default for ViewState {
    fn default() -> Self {
        Self {
            tasks: Arc::from(Vec::new()),
            loading: false,
            error: None,
        }
    }
}

/// Owns the in-memory task list for the current view and routes every
/// mutation through the remote store.
///
/// The collection is never edited in place: each change publishes a new
/// `Arc<[TaskDto]>` through a watch channel, so subscribers always see a
/// complete list.
pub struct TaskStateManager {
    store: Arc<dyn RemoteStore>,
    state: watch::Sender<ViewState>,
    criteria: Mutex<TaskFilter>,
    ordering: LoadOrdering,
    generation: AtomicU64,
}

impl TaskStateManager {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self::with_ordering(store, LoadOrdering::default())
    }

    pub fn with_ordering(store: Arc<dyn RemoteStore>, ordering: LoadOrdering) -> Self {
        let (state, _) = watch::channel(ViewState::default());
        Self {
            store,
            state,
            criteria: Mutex::new(TaskFilter::default()),
            ordering,
            generation: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> watch::Receiver<ViewState> {
        self.state.subscribe()
    }

    pub fn snapshot(&self) -> ViewState {
        self.state.borrow().clone()
    }

    pub fn tasks(&self) -> Arc<[TaskDto]> {
        Arc::clone(&self.state.borrow().tasks)
    }

    pub fn is_loading(&self) -> bool {
        self.state.borrow().loading
    }

    pub fn error(&self) -> Option<ErrorStatus> {
        self.state.borrow().error.clone()
    }

    pub fn criteria(&self) -> TaskFilter {
        self.criteria.lock().clone()
    }

    pub fn ordering(&self) -> LoadOrdering {
        self.ordering
    }

    /// Replaces the collection with the store's filtered result. Failures are
    /// recorded as the error status and never returned.
    #[instrument(skip(self), fields(ordering = ?self.ordering))]
    pub async fn load(&self, criteria: TaskFilter) {
        *self.criteria.lock() = criteria.clone();
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        self.state.send_modify(|state| {
            state.loading = true;
            state.error = None;
        });
        debug!(generation, "load issued");

        let result = self.store.list(&criteria).await;

        if self.ordering == LoadOrdering::LatestIssued {
            let latest = self.generation.load(Ordering::SeqCst);
            if generation != latest {
                debug!(generation, latest, "discarding superseded load response");
                return;
            }
        }

        match result {
            Ok(tasks) => {
                info!(generation, count = tasks.len(), "task list loaded");
                let tasks: Arc<[TaskDto]> = Arc::from(tasks);
                self.state.send_modify(|state| {
                    state.tasks = tasks;
                    state.loading = false;
                });
            }
            Err(err) => {
                error!(generation, error = %err, "task list load failed");
                let status = ErrorStatus::new(Action::Fetch, &err);
                self.state.send_modify(|state| {
                    state.error = Some(status);
                    state.loading = false;
                });
            }
        }
    }

    /// Re-issues the most recent criteria.
    pub async fn refresh(&self) {
        let criteria = self.criteria();
        self.load(criteria).await;
    }

    #[instrument(skip(self, draft), fields(title_len = draft.title.len()))]
    pub async fn create(&self, draft: TaskCreate) -> Result<TaskDto, TaskError> {
        if !draft.has_title() {
            warn!("refusing to submit task with blank title");
            return Err(TaskError::BlankTitle);
        }
        let mut draft = draft.with_defaults();
        draft.title = draft.title.trim().to_string();

        self.clear_error();
        match self.store.create(&draft).await {
            Ok(created) => {
                info!(id = %created.id, "task created");
                let record = created.clone();
                self.state.send_modify(|state| {
                    let mut next = Vec::with_capacity(state.tasks.len() + 1);
                    next.push(record);
                    next.extend(state.tasks.iter().filter(|t| t.id != created.id).cloned());
                    state.tasks = Arc::from(next);
                });
                Ok(created)
            }
            Err(err) => Err(self.fail(Action::Create, err)),
        }
    }

    /// Sends only the changed fields and swaps the returned record into place.
    #[instrument(skip(self, patch))]
    pub async fn update(&self, id: &str, patch: TaskPatch) -> Result<TaskDto, TaskError> {
        if patch.is_empty() {
            debug!("update carries no changed fields");
        }

        self.clear_error();
        match self.store.update(id, &patch).await {
            Ok(updated) => {
                info!(id, completed = updated.completed, "task updated");
                let record = updated.clone();
                self.state.send_modify(|state| {
                    let next: Vec<TaskDto> = state
                        .tasks
                        .iter()
                        .map(|task| {
                            if task.id == id {
                                record.clone()
                            } else {
                                task.clone()
                            }
                        })
                        .collect();
                    state.tasks = Arc::from(next);
                });
                Ok(updated)
            }
            Err(err) => Err(self.fail(Action::Update, err)),
        }
    }

    /// Flips the completion flag of a task in the current view.
    pub async fn toggle_complete(&self, id: &str) -> Result<TaskDto, TaskError> {
        let completed = self
            .state
            .borrow()
            .tasks
            .iter()
            .find(|task| task.id == id)
            .map(|task| task.completed)
            .ok_or_else(|| TaskError::UnknownTask(id.to_string()))?;

        self.update(id, TaskPatch::completed(!completed)).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: &str) -> Result<(), TaskError> {
        self.clear_error();
        match self.store.delete(id).await {
            Ok(()) => {
                info!(id, "task deleted");
                self.state.send_modify(|state| {
                    let next: Vec<TaskDto> = state
                        .tasks
                        .iter()
                        .filter(|task| task.id != id)
                        .cloned()
                        .collect();
                    state.tasks = Arc::from(next);
                });
                Ok(())
            }
            Err(err) => Err(self.fail(Action::Delete, err)),
        }
    }

    /// Reads one record straight from the store without touching the view.
    #[instrument(skip(self))]
    pub async fn get(&self, id: &str) -> Result<TaskDto, TaskError> {
        Ok(self.store.get(id).await?)
    }

    fn clear_error(&self) {
        self.state.send_if_modified(|state| state.error.take().is_some());
    }

    fn fail(&self, action: Action, err: StoreError) -> TaskError {
        error!(action = action.label(), error = %err, "task mutation failed");
        let status = ErrorStatus::new(action, &err);
        self.state.send_modify(|state| state.error = Some(status));
        TaskError::Store(err)
    }
}
