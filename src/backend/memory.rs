// In-process backend: keeps rows in memory and records every call in order

use super::{BackendError, StorageBackend, StoredEntry};
use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::Notify;

#[derive(Debug, Clone, PartialEq)]
pub enum BackendCall {
    FetchAll { user_id: String },
    Upsert { user_id: String, key: String, value: Value },
    DeleteKeys { user_id: String, keys: Vec<String> },
}

#[derive(Default)]
struct Inner {
    rows: BTreeMap<(String, String), Value>,
    calls: Vec<BackendCall>,
    fail_writes: Option<String>,
    fail_fetch: Option<String>,
    fetch_gate: Option<Arc<Notify>>,
}

/// Memory-backed [`StorageBackend`], used offline and as the test fake.
#[derive(Default)]
pub struct MemoryBackend {
    inner: Mutex<Inner>,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a row without recording a call.
    pub fn insert(&self, user_id: &str, key: &str, value: Value) {
        self.inner
            .lock()
            .rows
            .insert((user_id.to_string(), key.to_string()), value);
    }

    pub fn get(&self, user_id: &str, key: &str) -> Option<Value> {
        self.inner
            .lock()
            .rows
            .get(&(user_id.to_string(), key.to_string()))
            .cloned()
    }

    /// Keys currently stored for `user_id`, sorted.
    pub fn keys(&self, user_id: &str) -> Vec<String> {
        self.inner
            .lock()
            .rows
            .keys()
            .filter(|(user, _)| user == user_id)
            .map(|(_, key)| key.clone())
            .collect()
    }

    pub fn calls(&self) -> Vec<BackendCall> {
        self.inner.lock().calls.clone()
    }

    /// Upserts recorded so far as `(user_id, key)` pairs, in call order.
    pub fn upserts(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .calls
            .iter()
            .filter_map(|call| match call {
                BackendCall::Upsert { user_id, key, .. } => Some((user_id.clone(), key.clone())),
                _ => None,
            })
            .collect()
    }

    pub fn clear_calls(&self) {
        self.inner.lock().calls.clear();
    }

    /// Make every following upsert/delete fail with `message` (`None` to recover).
    pub fn fail_writes(&self, message: Option<&str>) {
        self.inner.lock().fail_writes = message.map(str::to_string);
    }

    pub fn fail_fetch(&self, message: Option<&str>) {
        self.inner.lock().fail_fetch = message.map(str::to_string);
    }

    /// Park the next `fetch_all` until the returned gate is notified.
    pub fn hold_next_fetch(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.inner.lock().fetch_gate = Some(Arc::clone(&gate));
        gate
    }

    /// Highest number of writes observed running at the same time.
    pub fn max_concurrent_writes(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    async fn track_write<F>(&self, apply: F) -> Result<(), BackendError>
    where
        F: FnOnce(&mut Inner) -> Result<(), BackendError>,
    {
        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        // Give any concurrently scheduled write a chance to overlap.
        tokio::task::yield_now().await;
        let result = {
            let mut inner = self.inner.lock();
            apply(&mut *inner)
        };
        self.in_flight.fetch_sub(1, Ordering::SeqCst);
        result
    }
}

#[async_trait]
impl StorageBackend for MemoryBackend {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<StoredEntry>, BackendError> {
        let gate = {
            let mut inner = self.inner.lock();
            inner.calls.push(BackendCall::FetchAll {
                user_id: user_id.to_string(),
            });
            inner.fetch_gate.take()
        };
        if let Some(gate) = gate {
            gate.notified().await;
        }

        let inner = self.inner.lock();
        if let Some(message) = &inner.fail_fetch {
            return Err(BackendError::Other(message.clone()));
        }
        Ok(inner
            .rows
            .iter()
            .filter(|((user, _), _)| user == user_id)
            .map(|((_, key), value)| StoredEntry {
                key: key.clone(),
                value: value.clone(),
            })
            .collect())
    }

    async fn upsert(&self, user_id: &str, key: &str, value: &Value) -> Result<(), BackendError> {
        self.track_write(|inner| {
            inner.calls.push(BackendCall::Upsert {
                user_id: user_id.to_string(),
                key: key.to_string(),
                value: value.clone(),
            });
            if let Some(message) = &inner.fail_writes {
                return Err(BackendError::Other(message.clone()));
            }
            inner
                .rows
                .insert((user_id.to_string(), key.to_string()), value.clone());
            Ok(())
        })
        .await
    }

    async fn delete_keys(&self, user_id: &str, keys: &[String]) -> Result<(), BackendError> {
        if keys.is_empty() {
            return Ok(());
        }
        self.track_write(|inner| {
            inner.calls.push(BackendCall::DeleteKeys {
                user_id: user_id.to_string(),
                keys: keys.to_vec(),
            });
            if let Some(message) = &inner.fail_writes {
                return Err(BackendError::Other(message.clone()));
            }
            for key in keys {
                inner.rows.remove(&(user_id.to_string(), key.clone()));
            }
            Ok(())
        })
        .await
    }
}
