use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::anyhow;
use parking_lot::Mutex;
use taskdeck_shared::{TaskFilter, TaskPriority};
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::manager::TaskStateManager;

pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(300);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Completion {
    #[default]
    All,
    Pending,
    Completed,
}

impl FromStr for Completion {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "" | "all" => Ok(Self::All),
            "pending" | "open" | "false" => Ok(Self::Pending),
            "completed" | "done" | "true" => Ok(Self::Completed),
            other => Err(anyhow!(
                "unknown completion filter '{other}' (expected all, pending or completed)"
            )),
        }
    }
}

/// Raw filter controls as a view holds them. Empty strings, `None` and
/// `Completion::All` mean "no constraint".
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterInputs {
    pub search: String,
    pub priority: Option<TaskPriority>,
    pub category: String,
    pub completion: Completion,
}

impl FilterInputs {
    pub fn to_filter(&self) -> TaskFilter {
        let non_empty = |value: &str| {
            let trimmed = value.trim();
            (!trimmed.is_empty()).then(|| trimmed.to_string())
        };

        TaskFilter {
            completed: match self.completion {
                Completion::All => None,
                Completion::Pending => Some(false),
                Completion::Completed => Some(true),
            },
            priority: self.priority,
            category: non_empty(&self.category),
            search: non_empty(&self.search),
        }
    }

    pub fn is_active(&self) -> bool {
        !self.to_filter().is_empty()
    }
}

struct PendingLoad {
    generation: u64,
    handle: JoinHandle<()>,
}

#[derive(Default)]
struct Inner {
    inputs: FilterInputs,
    generation: u64,
    pending: Option<PendingLoad>,
}

/// Turns bursts of filter edits into at most one `load` per quiet period.
///
/// Setters must be called from inside a tokio runtime. Once a timer fires, its
/// load is detached and keeps running even if the inputs change again.
pub struct FilterCoalescer {
    manager: Arc<TaskStateManager>,
    delay: Duration,
    inner: Arc<Mutex<Inner>>,
}

impl FilterCoalescer {
    pub fn new(manager: Arc<TaskStateManager>, delay: Duration) -> Self {
        Self {
            manager,
            delay,
            inner: Arc::new(Mutex::new(Inner::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    pub fn inputs(&self) -> FilterInputs {
        self.inner.lock().inputs.clone()
    }

    pub fn has_pending(&self) -> bool {
        self.inner.lock().pending.is_some()
    }

    pub fn set_search(&self, search: impl Into<String>) {
        let search = search.into();
        self.change(move |inputs| inputs.search = search);
    }

    pub fn set_priority(&self, priority: Option<TaskPriority>) {
        self.change(move |inputs| inputs.priority = priority);
    }

    pub fn set_category(&self, category: impl Into<String>) {
        let category = category.into();
        self.change(move |inputs| inputs.category = category);
    }

    pub fn set_completion(&self, completion: Completion) {
        self.change(move |inputs| inputs.completion = completion);
    }

    /// Resets every control; the unfiltered reload goes through the same
    /// quiet period as any other edit.
    pub fn clear(&self) {
        self.change(|inputs| *inputs = FilterInputs::default());
    }

    /// Cancels a timer that has not fired yet. Loads already issued are left
    /// alone.
    pub fn shutdown(&self) {
        if let Some(pending) = self.inner.lock().pending.take() {
            debug!(generation = pending.generation, "cancelling pending filter load");
            pending.handle.abort();
        }
    }

    fn change<F>(&self, apply: F)
    where
        F: FnOnce(&mut FilterInputs),
    {
        let mut inner = self.inner.lock();
        let before = inner.inputs.clone();
        apply(&mut inner.inputs);
        if inner.inputs == before {
            trace!("filter inputs unchanged");
            return;
        }

        inner.generation += 1;
        let generation = inner.generation;
        if let Some(previous) = inner.pending.take() {
            trace!(superseded = previous.generation, generation, "restarting quiet period");
            previous.handle.abort();
        }

        let shared = Arc::clone(&self.inner);
        let manager = Arc::clone(&self.manager);
        let delay = self.delay;
        let handle = tokio::spawn(async move {
            tokio::time::sleep(delay).await;

            let criteria = {
                let mut inner = shared.lock();
                let current = inner
                    .pending
                    .as_ref()
                    .is_some_and(|pending| pending.generation == generation);
                if !current {
                    return;
                }
                inner.pending = None;
                inner.inputs.to_filter()
            };

            debug!(generation, ?criteria, "quiet period elapsed; loading");
            manager.load(criteria).await;
        });

        inner.pending = Some(PendingLoad { generation, handle });
    }
}

impl Drop for FilterCoalescer {
    fn drop(&mut self) {
        self.shutdown();
    }
}
