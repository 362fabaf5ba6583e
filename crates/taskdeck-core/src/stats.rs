use std::sync::Arc;

use taskdeck_shared::TaskStats;
use tracing::{info, instrument, warn};

use crate::error::StoreError;
use crate::remote::RemoteStore;

/// On-demand read of the store's aggregate counts. Nothing is cached here and
/// nothing touches the task collection.
#[derive(Clone)]
pub struct StatsAccessor {
    store: Arc<dyn RemoteStore>,
}

impl StatsAccessor {
    pub fn new(store: Arc<dyn RemoteStore>) -> Self {
        Self { store }
    }

    #[instrument(skip(self))]
    pub async fn fetch_stats(&self) -> Result<TaskStats, StoreError> {
        let stats = self.store.stats().await?;
        info!(
            total = stats.total,
            completed = stats.completed,
            pending = stats.pending,
            "stats fetched"
        );
        Ok(stats)
    }
}

/// Show/hide stats block. A failed fetch is logged and the last good snapshot
/// stays on screen.
pub struct StatsPanel {
    accessor: StatsAccessor,
    visible: bool,
    snapshot: Option<TaskStats>,
}

impl StatsPanel {
    pub fn new(accessor: StatsAccessor) -> Self {
        Self {
            accessor,
            visible: false,
            snapshot: None,
        }
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    pub fn snapshot(&self) -> Option<&TaskStats> {
        self.snapshot.as_ref()
    }

    /// Flips visibility, fetching a fresh snapshot when the panel opens.
    pub async fn toggle(&mut self) -> bool {
        if !self.visible {
            self.refresh().await;
        }
        self.visible = !self.visible;
        self.visible
    }

    /// Returns whether the snapshot was replaced.
    pub async fn refresh(&mut self) -> bool {
        match self.accessor.fetch_stats().await {
            Ok(stats) => {
                self.snapshot = Some(stats);
                true
            }
            Err(err) => {
                warn!(error = %err, "failed to fetch stats; keeping previous snapshot");
                false
            }
        }
    }
}
