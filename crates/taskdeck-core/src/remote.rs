use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, Url};
use serde::Serialize;
use serde::de::DeserializeOwned;
use taskdeck_shared::{TaskCreate, TaskDto, TaskFilter, TaskPatch, TaskStats};
use tracing::{debug, instrument, warn};

use crate::config::Config;
use crate::error::StoreError;

/// The remote record store. Each method is one request; implementations keep
/// no local cache and never retry.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskDto>, StoreError>;

    async fn get(&self, id: &str) -> Result<TaskDto, StoreError>;

    async fn create(&self, draft: &TaskCreate) -> Result<TaskDto, StoreError>;

    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<TaskDto, StoreError>;

    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    async fn stats(&self) -> Result<TaskStats, StoreError>;
}

#[derive(Debug, Clone)]
pub struct HttpStore {
    client: reqwest::Client,
    base: Url,
    resource: Vec<String>,
}

impl HttpStore {
    pub fn new(base_url: &str, tasks_path: &str, timeout: Duration) -> Result<Self, StoreError> {
        let base = Url::parse(base_url.trim()).map_err(|err| StoreError::InvalidUrl {
            url: base_url.to_string(),
            reason: err.to_string(),
        })?;

        if base.cannot_be_a_base() || !matches!(base.scheme(), "http" | "https") {
            return Err(StoreError::InvalidUrl {
                url: base_url.to_string(),
                reason: "expected an http or https address".to_string(),
            });
        }

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|source| StoreError::Transport {
                url: base.to_string(),
                source,
            })?;

        let resource = tasks_path
            .split('/')
            .filter(|segment| !segment.is_empty())
            .map(str::to_string)
            .collect();

        debug!(base = %base, tasks_path, timeout_ms = timeout.as_millis() as u64, "configured http store");

        Ok(Self {
            client,
            base,
            resource,
        })
    }

    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let store = Self::new(&cfg.api_url(), &cfg.tasks_path(), cfg.timeout()?)?;
        Ok(store)
    }

    pub fn base_url(&self) -> &Url {
        &self.base
    }

    fn endpoint(&self, extra: &[&str]) -> Result<Url, StoreError> {
        let mut url = self.base.clone();
        {
            let mut segments = url.path_segments_mut().map_err(|()| StoreError::InvalidUrl {
                url: self.base.to_string(),
                reason: "address cannot carry a path".to_string(),
            })?;
            segments.pop_if_empty();
            segments.extend(self.resource.iter().map(String::as_str));
            segments.extend(extra.iter().copied());
        }
        Ok(url)
    }

    async fn execute(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<(Url, Vec<u8>), StoreError> {
        debug!(method = %method, url = %url, "sending store request");

        let mut request = self.client.request(method.clone(), url.clone());
        if let Some(body) = body {
            request = request
                .header(reqwest::header::CONTENT_TYPE, "application/json")
                .body(body);
        }
        request = request.header(reqwest::header::ACCEPT, "application/json");

        let response = request.send().await.map_err(|source| {
            warn!(method = %method, url = %url, error = %source, "store request failed");
            StoreError::Transport {
                url: url.to_string(),
                source,
            }
        })?;

        let status = response.status();
        let bytes = response
            .bytes()
            .await
            .map_err(|source| StoreError::Transport {
                url: url.to_string(),
                source,
            })?;

        if !status.is_success() {
            warn!(method = %method, url = %url, status = %status, "store returned non-success status");
            return Err(StoreError::Rejected {
                url: url.to_string(),
                status: status.as_u16(),
                body: String::from_utf8_lossy(&bytes).trim().to_string(),
            });
        }

        debug!(method = %method, url = %url, status = %status, bytes = bytes.len(), "store request succeeded");
        Ok((url, bytes.to_vec()))
    }

    async fn fetch<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Vec<u8>>,
    ) -> Result<T, StoreError> {
        let (url, bytes) = self.execute(method, url, body).await?;
        serde_json::from_slice(&bytes).map_err(|source| StoreError::Decode {
            url: url.to_string(),
            source,
        })
    }
}

fn encode<T: Serialize>(url: &Url, value: &T) -> Result<Vec<u8>, StoreError> {
    serde_json::to_vec(value).map_err(|source| StoreError::Encode {
        url: url.to_string(),
        source,
    })
}

#[async_trait]
impl RemoteStore for HttpStore {
    #[instrument(skip(self))]
    async fn list(&self, filter: &TaskFilter) -> Result<Vec<TaskDto>, StoreError> {
        let mut url = self.endpoint(&[])?;
        let pairs = filter.query_pairs();
        if !pairs.is_empty() {
            let mut query = url.query_pairs_mut();
            for (key, value) in &pairs {
                query.append_pair(key, value);
            }
        }
        self.fetch(Method::GET, url, None).await
    }

    #[instrument(skip(self))]
    async fn get(&self, id: &str) -> Result<TaskDto, StoreError> {
        let url = self.endpoint(&[id])?;
        self.fetch(Method::GET, url, None).await
    }

    #[instrument(skip(self, draft), fields(title_len = draft.title.len()))]
    async fn create(&self, draft: &TaskCreate) -> Result<TaskDto, StoreError> {
        let url = self.endpoint(&[])?;
        let body = encode(&url, draft)?;
        self.fetch(Method::POST, url, Some(body)).await
    }

    #[instrument(skip(self, patch))]
    async fn update(&self, id: &str, patch: &TaskPatch) -> Result<TaskDto, StoreError> {
        let url = self.endpoint(&[id])?;
        let body = encode(&url, patch)?;
        self.fetch(Method::PUT, url, Some(body)).await
    }

    #[instrument(skip(self))]
    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        let url = self.endpoint(&[id])?;
        self.execute(Method::DELETE, url, None).await?;
        Ok(())
    }

    #[instrument(skip(self))]
    async fn stats(&self) -> Result<TaskStats, StoreError> {
        let url = self.endpoint(&["stats"])?;
        self.fetch(Method::GET, url, None).await
    }
}
