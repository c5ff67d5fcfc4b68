// Remote persistence contract used by the session cache

pub mod memory;

pub use memory::{BackendCall, MemoryBackend};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Failure surfaced by a remote collaborator.
///
/// Cloneable so the write queue can keep the most recent failure and still
/// hand a copy to every `flush` caller.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BackendError {
    #[error("HTTP error: {0}")]
    Http(String),
    #[error("API error {status}: {body}")]
    Api { status: u16, body: String },
    #[error("Failed to parse response: {0}")]
    Parse(String),
    #[error("Supabase is not configured: {0}")]
    NotConfigured(String),
    #[error("Not signed in")]
    Unauthorized,
    #[error("Backend error: {0}")]
    Other(String),
}

impl From<reqwest::Error> for BackendError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            BackendError::Parse(e.to_string())
        } else {
            BackendError::Http(e.to_string())
        }
    }
}

impl From<serde_json::Error> for BackendError {
    fn from(e: serde_json::Error) -> Self {
        BackendError::Parse(e.to_string())
    }
}

/// One persisted row of a user's storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredEntry {
    pub key: String,
    pub value: Value,
}

/// Remote key/value store, keyed by `(user_id, key)`.
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Every entry stored for `user_id`.
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<StoredEntry>, BackendError>;

    /// Overwrite (or create) the entry for `(user_id, key)`.
    async fn upsert(&self, user_id: &str, key: &str, value: &Value) -> Result<(), BackendError>;

    /// Remove the given keys for `user_id`. Empty `keys` is a no-op.
    async fn delete_keys(&self, user_id: &str, keys: &[String]) -> Result<(), BackendError>;
}
