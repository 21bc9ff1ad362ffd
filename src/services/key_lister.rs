//! Sources of bucket key listings consumed by the browser.
//!
//! The browser only needs two things from a backend: which buckets exist and
//! the complete flat key list of one bucket. `HttpKeyLister` talks to the
//! JSON API served by this crate; `StorageService` answers in-process.

use crate::services::storage_service::{StorageError, StorageService};
use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde_json::Value;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ListError {
    #[error("could not reach listing service: {0}")]
    Transport(String),
    #[error("listing service answered {status}: {message}")]
    Status { status: u16, message: String },
    #[error("listing response was not a list of names: {0}")]
    Malformed(String),
    #[error("storage error: {0}")]
    Storage(String),
}

pub type ListResult<T> = Result<T, ListError>;

#[async_trait]
pub trait KeyLister: Send + Sync {
    async fn list_buckets(&self) -> ListResult<Vec<String>>;

    /// Every key of `bucket`, flat and complete.
    async fn list_keys(&self, bucket: &str) -> ListResult<Vec<String>>;
}

/// Client for `GET /api/storage/buckets[/{bucket}/objects]`.
#[derive(Clone, Debug)]
pub struct HttpKeyLister {
    client: Client,
    base_url: Url,
}

impl HttpKeyLister {
    pub fn new(base_url: &str) -> ListResult<Self> {
        Self::with_client(base_url, Client::new())
    }

    pub fn with_client(base_url: &str, client: Client) -> ListResult<Self> {
        let base_url = Url::parse(base_url).map_err(|err| {
            ListError::Transport(format!("invalid api url `{}`: {}", base_url, err))
        })?;
        if base_url.cannot_be_a_base() {
            return Err(ListError::Transport(format!(
                "api url `{}` cannot carry a path",
                base_url
            )));
        }
        Ok(Self { client, base_url })
    }

    /// Append path segments to the base url, percent-encoding each one.
    fn endpoint(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn fetch_names(&self, url: Url) -> ListResult<Vec<String>> {
        debug!(%url, "fetching listing");
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|err| ListError::Transport(err.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(status_error(status, message));
        }

        let body: Value = response
            .json()
            .await
            .map_err(|err| ListError::Malformed(err.to_string()))?;
        parse_names(body)
    }
}

#[async_trait]
impl KeyLister for HttpKeyLister {
    async fn list_buckets(&self) -> ListResult<Vec<String>> {
        let url = self.endpoint(&["api", "storage", "buckets"]);
        self.fetch_names(url).await
    }

    async fn list_keys(&self, bucket: &str) -> ListResult<Vec<String>> {
        let url = self.endpoint(&["api", "storage", "buckets", bucket, "objects"]);
        self.fetch_names(url).await
    }
}

#[async_trait]
impl KeyLister for StorageService {
    async fn list_buckets(&self) -> ListResult<Vec<String>> {
        self.list_bucket_names().await.map_err(ListError::from)
    }

    async fn list_keys(&self, bucket: &str) -> ListResult<Vec<String>> {
        self.list_object_keys(bucket).await.map_err(ListError::from)
    }
}

impl From<StorageError> for ListError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::BucketNotFound(_) => ListError::Status {
                status: StatusCode::NOT_FOUND.as_u16(),
                message: err.to_string(),
            },
            other => ListError::Storage(other.to_string()),
        }
    }
}

fn status_error(status: StatusCode, body: String) -> ListError {
    // The API renders errors as {"error": "..."}; fall back to the raw body.
    let message = serde_json::from_str::<Value>(&body)
        .ok()
        .and_then(|v| v.get("error").and_then(Value::as_str).map(str::to_string))
        .unwrap_or(body);
    ListError::Status {
        status: status.as_u16(),
        message,
    }
}

/// Accept only a JSON array whose items are all strings.
fn parse_names(body: Value) -> ListResult<Vec<String>> {
    let Value::Array(items) = body else {
        return Err(ListError::Malformed(format!(
            "expected array, got {}",
            json_kind(&body)
        )));
    };
    items
        .into_iter()
        .map(|item| match item {
            Value::String(name) => Ok(name),
            other => Err(ListError::Malformed(format!(
                "expected string item, got {}",
                json_kind(&other)
            ))),
        })
        .collect()
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
