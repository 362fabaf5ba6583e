use std::fmt;

use thiserror::Error;

/// Failure categories surfaced by a [`crate::remote::RemoteStore`].
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("invalid store url {url}: {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("request to {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("store rejected request to {url} with HTTP {status}: {body}")]
    Rejected {
        url: String,
        status: u16,
        body: String,
    },

    #[error("failed to encode request body for {url}: {source}")]
    Encode {
        url: String,
        #[source]
        source: serde_json::Error,
    },

    #[error("malformed payload from {url}: {source}")]
    Decode {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

impl StoreError {
    pub fn is_not_found(&self) -> bool {
        matches!(self, StoreError::Rejected { status: 404, .. })
    }

    pub fn status(&self) -> Option<u16> {
        match self {
            StoreError::Rejected { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error("task title must not be blank")]
    BlankTitle,

    #[error("task {0} is not in the current view")]
    UnknownTask(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

impl TaskError {
    pub fn is_not_found(&self) -> bool {
        match self {
            TaskError::Store(err) => err.is_not_found(),
            TaskError::UnknownTask(_) => true,
            TaskError::BlankTitle => false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Fetch,
    Create,
    Update,
    Delete,
}

impl Action {
    pub fn label(self) -> &'static str {
        match self {
            Action::Fetch => "failed to fetch tasks",
            Action::Create => "failed to create task",
            Action::Update => "failed to update task",
            Action::Delete => "failed to delete task",
        }
    }
}

/// The single status line a view shows after a failed operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorStatus {
    pub action: Action,
    pub detail: String,
}

impl ErrorStatus {
    pub fn new(action: Action, err: &dyn std::error::Error) -> Self {
        Self {
            action,
            detail: err.to_string(),
        }
    }

    pub fn label(&self) -> &'static str {
        self.action.label()
    }
}

impl fmt::Display for ErrorStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.action.label())
    }
}
