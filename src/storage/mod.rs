//! Session cache and sync queue.
//!
//! [`Storage`] is the application's view of a signed-in user's data: a
//! synchronous in-memory mapping populated by one full fetch at login, kept
//! durable by a serialized queue of remote writes. The shell builds one per
//! process, calls [`Storage::init_for_user`] on login and
//! [`Storage::clear_session`] on logout.
//!
//! Reads never touch the backend. Writes update the mapping immediately and
//! return without waiting for the remote upsert; use
//! [`Storage::flush_pending_writes`] before navigation to learn whether any
//! queued write failed.
//!
//! `clear_session` does not cancel writes that were already queued. They keep
//! running in the background under the user id they were issued for.

pub mod keys;
mod migrate;
mod queue;
mod usage;

pub use migrate::MigrationReport;
pub use queue::{WriteQueue, WriteTask};
pub use usage::StorageUsage;

use crate::backend::{BackendError, StorageBackend};
use crate::legacy::{LegacyStore, LegacyStoreError};
use parking_lot::Mutex;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;
use tokio::runtime::Handle;

#[derive(Error, Debug)]
pub enum StorageError {
    #[error("No active user session. Sign in again.")]
    NoActiveSession,
    #[error("Missing user id")]
    InvalidUser,
    #[error("Session changed while initializing")]
    Superseded,
    #[error(transparent)]
    Backend(#[from] BackendError),
    #[error("Legacy store error: {0}")]
    Legacy(#[from] LegacyStoreError),
    #[error("Failed to serialize value: {0}")]
    Serialize(#[from] serde_json::Error),
}

#[derive(Default)]
struct SessionState {
    user_id: Option<String>,
    ready: bool,
    entries: HashMap<String, Value>,
    queue: WriteQueue,
    /// Bumped on every reset so a slow init can tell it was superseded.
    generation: u64,
}

impl SessionState {
    fn reset(&mut self) {
        self.user_id = None;
        self.ready = false;
        self.entries.clear();
        self.queue = WriteQueue::new();
        self.generation += 1;
    }

    /// The active user, only once initialization has completed.
    fn ready_user(&self) -> Option<&str> {
        match (&self.user_id, self.ready) {
            (Some(user_id), true) => Some(user_id.as_str()),
            _ => None,
        }
    }
}

pub struct Storage {
    backend: Arc<dyn StorageBackend>,
    legacy: Arc<dyn LegacyStore>,
    state: Mutex<SessionState>,
}

impl Storage {
    pub fn new(backend: Arc<dyn StorageBackend>, legacy: Arc<dyn LegacyStore>) -> Self {
        Self {
            backend,
            legacy,
            state: Mutex::new(SessionState::default()),
        }
    }

    /// Load everything stored for `user_id`, migrate legacy data, mark ready.
    ///
    /// Any previous session is discarded first. Until this resolves, reads
    /// return their fallback and writes fail with `NoActiveSession`; on error
    /// the session is left empty. Writes issued later run on the runtime that
    /// drove this call, so they may come from threads outside of it.
    pub async fn init_for_user(&self, user_id: &str) -> Result<MigrationReport, StorageError> {
        if user_id.is_empty() {
            return Err(StorageError::InvalidUser);
        }

        let generation = {
            let mut state = self.state.lock();
            state.reset();
            state.user_id = Some(user_id.to_string());
            if let Ok(runtime) = Handle::try_current() {
                state.queue = WriteQueue::with_runtime(runtime);
            }
            state.generation
        };

        tracing::info!("Initializing storage for user {}", user_id);
        let loaded = self.load_user(user_id).await;

        let mut state = self.state.lock();
        if state.generation != generation {
            tracing::warn!("Session for {} was reset during initialization", user_id);
            return Err(StorageError::Superseded);
        }
        let (entries, report) = match loaded {
            Ok(loaded) => loaded,
            Err(e) => {
                tracing::error!("Storage init for {} failed: {}", user_id, e);
                state.user_id = None;
                return Err(e);
            }
        };
        state.entries = entries;
        state.ready = true;

        tracing::info!("Storage ready ({} entries)", state.entries.len());
        Ok(report)
    }

    async fn load_user(
        &self,
        user_id: &str,
    ) -> Result<(HashMap<String, Value>, MigrationReport), StorageError> {
        let rows = self.backend.fetch_all(user_id).await?;
        let mut entries: HashMap<String, Value> =
            rows.into_iter().map(|row| (row.key, row.value)).collect();
        tracing::debug!("Fetched {} entries", entries.len());

        let report =
            migrate::migrate_legacy(self.backend.as_ref(), self.legacy.as_ref(), user_id, &mut entries)
                .await?;
        Ok((entries, report))
    }

    /// Forget the active user and every cached entry.
    pub fn clear_session(&self) {
        self.state.lock().reset();
        tracing::info!("Storage session cleared");
    }

    pub fn is_ready(&self) -> bool {
        self.state.lock().ready
    }

    pub fn active_user(&self) -> Option<String> {
        self.state.lock().user_id.clone()
    }

    /// Wait for every write queued so far and surface the last failure.
    pub async fn flush_pending_writes(&self) -> Result<(), StorageError> {
        let queue = self.state.lock().queue.clone();
        queue.flush().await.map_err(StorageError::from)
    }

    pub fn last_sync_error(&self) -> Option<BackendError> {
        self.state.lock().queue.last_error()
    }

    /// Owned copy of the value at `key`, or `fallback` when absent or not ready.
    pub fn get_json(&self, key: &str, fallback: Value) -> Value {
        let state = self.state.lock();
        if !state.ready {
            return fallback;
        }
        state.entries.get(key).cloned().unwrap_or(fallback)
    }

    /// Typed read; `None` when absent, not ready, or of a different shape.
    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = {
            let state = self.state.lock();
            if !state.ready {
                return None;
            }
            state.entries.get(key)?.clone()
        };
        serde_json::from_value(value).ok()
    }

    /// Store a copy of `value` and queue its remote upsert.
    pub fn set_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<(), StorageError> {
        let mut state = self.state.lock();
        let user_id = state
            .ready_user()
            .ok_or(StorageError::NoActiveSession)?
            .to_string();
        let value = serde_json::to_value(value)?;

        state.entries.insert(key.to_string(), value.clone());

        let backend = Arc::clone(&self.backend);
        let key = key.to_string();
        state.queue.enqueue(Box::pin(async move {
            backend.upsert(&user_id, &key, &value).await
        }));
        Ok(())
    }

    // Decks

    pub fn decks(&self) -> Value {
        self.get_json(keys::DECKS, Value::Array(Vec::new()))
    }

    pub fn save_decks<T: Serialize + ?Sized>(&self, decks: &T) -> Result<(), StorageError> {
        self.set_json(keys::DECKS, decks)
    }

    // Cards

    pub fn cards(&self, deck_id: &str) -> Value {
        self.get_json(&keys::cards(deck_id), Value::Array(Vec::new()))
    }

    pub fn save_cards<T: Serialize + ?Sized>(&self, deck_id: &str, cards: &T) -> Result<(), StorageError> {
        self.set_json(&keys::cards(deck_id), cards)
    }

    // Questions (stored separately from card state)

    pub fn questions(&self, deck_id: &str) -> Value {
        self.get_json(&keys::questions(deck_id), Value::Array(Vec::new()))
    }

    pub fn save_questions<T: Serialize + ?Sized>(
        &self,
        deck_id: &str,
        questions: &T,
    ) -> Result<(), StorageError> {
        self.set_json(&keys::questions(deck_id), questions)
    }

    // Stats

    pub fn stats(&self, deck_id: &str) -> Value {
        self.get_json(&keys::stats(deck_id), Value::Object(Default::default()))
    }

    pub fn save_stats<T: Serialize + ?Sized>(&self, deck_id: &str, stats: &T) -> Result<(), StorageError> {
        self.set_json(&keys::stats(deck_id), stats)
    }

    // Per-deck settings

    pub fn deck_settings(&self, deck_id: &str) -> Value {
        self.get_json(&keys::deck_settings(deck_id), Value::Null)
    }

    pub fn save_deck_settings<T: Serialize + ?Sized>(
        &self,
        deck_id: &str,
        settings: &T,
    ) -> Result<(), StorageError> {
        self.set_json(&keys::deck_settings(deck_id), settings)
    }

    /// Global settings from before per-deck settings existed.
    pub fn settings(&self) -> Value {
        self.get_json(keys::SETTINGS, Value::Null)
    }

    pub fn save_settings<T: Serialize + ?Sized>(&self, settings: &T) -> Result<(), StorageError> {
        self.set_json(keys::SETTINGS, settings)
    }

    // App settings

    pub fn app_settings(&self) -> Value {
        self.get_json(keys::APP_SETTINGS, Value::Null)
    }

    pub fn save_app_settings<T: Serialize + ?Sized>(&self, app_settings: &T) -> Result<(), StorageError> {
        self.set_json(keys::APP_SETTINGS, app_settings)
    }

    pub fn font_scale(&self) -> Option<f64> {
        self.get_json(keys::FONT_SCALE, Value::Null).as_f64()
    }

    pub fn save_font_scale(&self, font_scale: f64) -> Result<(), StorageError> {
        self.set_json(keys::FONT_SCALE, &font_scale)
    }

    /// Drop every key owned by `deck_id` and queue one batch delete for them.
    pub fn clear_deck_data(&self, deck_id: &str) {
        let mut state = self.state.lock();
        let Some(user_id) = state.ready_user().map(str::to_string) else {
            return;
        };

        let deck_keys = keys::deck_scoped(deck_id).to_vec();
        for key in &deck_keys {
            state.entries.remove(key);
        }

        let backend = Arc::clone(&self.backend);
        state.queue.enqueue(Box::pin(async move {
            backend.delete_keys(&user_id, &deck_keys).await
        }));
    }

    pub fn storage_usage(&self) -> StorageUsage {
        StorageUsage::estimate(&self.state.lock().entries)
    }
}

#[cfg(test)]
mod tests {
    use super::keys::LEGACY_MIGRATION_MARKER;
    use super::*;
    use crate::backend::{BackendCall, MemoryBackend};
    use crate::legacy::MemoryLegacyStore;
    use serde_json::json;
    use std::time::Duration;

    fn storage_with(backend: &Arc<MemoryBackend>, legacy: &Arc<MemoryLegacyStore>) -> Storage {
        Storage::new(backend.clone(), legacy.clone())
    }

    async fn ready_storage() -> (Storage, Arc<MemoryBackend>) {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);
        storage.init_for_user("u1").await.unwrap();
        backend.clear_calls();
        (storage, backend)
    }

    /// Yield until `backend` has seen a `fetch_all` for `user_id`.
    async fn fetch_started(backend: &MemoryBackend, user_id: &str) {
        let fetch = BackendCall::FetchAll {
            user_id: user_id.to_string(),
        };
        tokio::time::timeout(Duration::from_secs(1), async {
            while !backend.calls().contains(&fetch) {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();
    }

    fn spawn_init(
        storage: &Arc<Storage>,
        user_id: &str,
    ) -> tokio::task::JoinHandle<Result<MigrationReport, StorageError>> {
        let storage = Arc::clone(storage);
        let user_id = user_id.to_string();
        tokio::spawn(async move { storage.init_for_user(&user_id).await })
    }

    #[tokio::test]
    async fn test_init_rejects_empty_user() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);

        let err = storage.init_for_user("").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidUser));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_reads_fall_back_and_writes_fail_before_init() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);

        assert!(!storage.is_ready());
        assert_eq!(storage.decks(), json!([]));
        assert_eq!(storage.font_scale(), None);
        assert!(matches!(
            storage.save_decks(&json!([1])),
            Err(StorageError::NoActiveSession)
        ));
    }

    #[tokio::test]
    async fn test_reads_fall_back_and_writes_fail_while_loading() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("u1", "decks", json!(["saved"]));
        let gate = backend.hold_next_fetch();
        let storage = Arc::new(storage_with(&backend, &Arc::new(MemoryLegacyStore::new())));

        let init = spawn_init(&storage, "u1");
        fetch_started(&backend, "u1").await;

        assert!(!storage.is_ready());
        assert_eq!(storage.decks(), json!([]));
        assert!(matches!(
            storage.save_decks(&json!(["too early"])),
            Err(StorageError::NoActiveSession)
        ));

        gate.notify_one();
        init.await.unwrap().unwrap();
        assert_eq!(storage.decks(), json!(["saved"]));
    }

    #[tokio::test]
    async fn test_clear_session_during_init_supersedes_it() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("u1", "decks", json!(["saved"]));
        let gate = backend.hold_next_fetch();
        let storage = Arc::new(storage_with(&backend, &Arc::new(MemoryLegacyStore::new())));

        let init = spawn_init(&storage, "u1");
        fetch_started(&backend, "u1").await;
        storage.clear_session();
        gate.notify_one();

        assert!(matches!(init.await.unwrap(), Err(StorageError::Superseded)));
        assert!(!storage.is_ready());
        assert_eq!(storage.active_user(), None);
        assert_eq!(storage.decks(), json!([]));
    }

    #[tokio::test]
    async fn test_newer_init_wins_over_a_slow_one() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("u1", "decks", json!(["u1 deck"]));
        backend.insert("u2", "decks", json!(["u2 deck"]));
        let gate = backend.hold_next_fetch();
        let storage = Arc::new(storage_with(&backend, &Arc::new(MemoryLegacyStore::new())));

        let slow = spawn_init(&storage, "u1");
        fetch_started(&backend, "u1").await;
        storage.init_for_user("u2").await.unwrap();
        gate.notify_one();

        assert!(matches!(slow.await.unwrap(), Err(StorageError::Superseded)));
        assert!(storage.is_ready());
        assert_eq!(storage.active_user().as_deref(), Some("u2"));
        assert_eq!(storage.decks(), json!(["u2 deck"]));
    }

    #[tokio::test]
    async fn test_write_queued_before_switch_lands_under_its_user() {
        let (storage, backend) = ready_storage().await;

        storage.save_decks(&json!(["from u1"])).unwrap();
        storage.clear_session();
        storage.init_for_user("u2").await.unwrap();
        storage.save_app_settings(&json!({"theme": "light"})).unwrap();
        storage.flush_pending_writes().await.unwrap();

        // The old session's worker drains on its own.
        tokio::time::timeout(Duration::from_secs(1), async {
            while backend.get("u1", "decks").is_none() {
                tokio::task::yield_now().await;
            }
        })
        .await
        .unwrap();

        assert_eq!(backend.get("u1", "decks"), Some(json!(["from u1"])));
        assert_eq!(backend.get("u2", "decks"), None);
        assert_eq!(backend.get("u2", "appSettings"), Some(json!({"theme": "light"})));
        assert_eq!(storage.decks(), json!([]));
    }

    #[test]
    fn test_writes_from_a_thread_without_runtime() {
        let rt = tokio::runtime::Runtime::new().unwrap();
        let backend = Arc::new(MemoryBackend::new());
        let storage = Arc::new(storage_with(&backend, &Arc::new(MemoryLegacyStore::new())));
        rt.block_on(storage.init_for_user("u1")).unwrap();

        let writer = Arc::clone(&storage);
        std::thread::spawn(move || {
            writer.save_decks(&json!([1]))?;
            writer.clear_deck_data("d1");
            Ok::<_, StorageError>(())
        })
        .join()
        .unwrap()
        .unwrap();

        rt.block_on(storage.flush_pending_writes()).unwrap();
        assert_eq!(backend.get("u1", "decks"), Some(json!([1])));
        assert!(storage.last_sync_error().is_none());
    }

    #[tokio::test]
    async fn test_set_then_get_is_visible_immediately() {
        let (storage, _backend) = ready_storage().await;

        let mut decks = json!([{"id": "d1", "name": "Anatomia"}]);
        storage.save_decks(&decks).unwrap();
        decks[0]["name"] = json!("changed");

        assert_eq!(storage.decks(), json!([{"id": "d1", "name": "Anatomia"}]));
    }

    #[tokio::test]
    async fn test_returned_values_are_detached() {
        let (storage, _backend) = ready_storage().await;
        storage.save_stats("d1", &json!({"seen": 1})).unwrap();

        let mut stats = storage.stats("d1");
        stats["seen"] = json!(99);

        assert_eq!(storage.stats("d1"), json!({"seen": 1}));
    }

    #[tokio::test]
    async fn test_domain_fallbacks() {
        let (storage, _backend) = ready_storage().await;

        assert_eq!(storage.cards("x"), json!([]));
        assert_eq!(storage.questions("x"), json!([]));
        assert_eq!(storage.stats("x"), json!({}));
        assert_eq!(storage.deck_settings("x"), Value::Null);
        assert_eq!(storage.settings(), Value::Null);
        assert_eq!(storage.app_settings(), Value::Null);
        assert_eq!(storage.get_json("missing", json!("fb")), json!("fb"));
        assert_eq!(storage.get::<Vec<u32>>("missing"), None);
    }

    #[tokio::test]
    async fn test_remote_upserts_follow_program_order() {
        let (storage, backend) = ready_storage().await;

        storage.save_decks(&json!([1])).unwrap();
        storage.save_cards("d1", &json!(["a"])).unwrap();
        storage.save_decks(&json!([1, 2])).unwrap();
        storage.save_font_scale(1.1).unwrap();
        storage.flush_pending_writes().await.unwrap();

        let keys: Vec<_> = backend.upserts().into_iter().map(|(_, k)| k).collect();
        assert_eq!(keys, vec!["decks", "cards_d1", "decks", "fontScale"]);
        assert_eq!(backend.get("u1", "decks"), Some(json!([1, 2])));
        assert_eq!(backend.max_concurrent_writes(), 1);
    }

    #[tokio::test]
    async fn test_flush_surfaces_failure_and_next_success_clears_it() {
        let (storage, backend) = ready_storage().await;

        backend.fail_writes(Some("network down"));
        storage.save_decks(&json!([])).unwrap();
        let err = storage.flush_pending_writes().await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(BackendError::Other(ref m)) if m == "network down"));
        assert!(storage.last_sync_error().is_some());

        // The cache still holds the value even though the write failed.
        assert_eq!(storage.decks(), json!([]));

        backend.fail_writes(None);
        storage.save_decks(&json!([1])).unwrap();
        storage.flush_pending_writes().await.unwrap();
        assert!(storage.last_sync_error().is_none());
    }

    #[tokio::test]
    async fn test_switching_users_discards_previous_entries() {
        let backend = Arc::new(MemoryBackend::new());
        backend.insert("u1", "appSettings", json!({"theme": "dark"}));
        backend.insert("u2", "decks", json!(["u2 deck"]));
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);

        storage.init_for_user("u1").await.unwrap();
        assert_eq!(storage.app_settings(), json!({"theme": "dark"}));

        storage.init_for_user("u2").await.unwrap();
        assert_eq!(storage.active_user().as_deref(), Some("u2"));
        assert_eq!(storage.app_settings(), Value::Null);
        assert_eq!(storage.decks(), json!(["u2 deck"]));
    }

    #[tokio::test]
    async fn test_clear_session_returns_to_pre_init_state() {
        let (storage, _backend) = ready_storage().await;
        storage.save_decks(&json!([1])).unwrap();

        storage.clear_session();

        assert!(!storage.is_ready());
        assert_eq!(storage.active_user(), None);
        assert_eq!(storage.decks(), json!([]));
        assert!(storage.last_sync_error().is_none());
        assert!(matches!(
            storage.save_decks(&json!([2])),
            Err(StorageError::NoActiveSession)
        ));
        assert_eq!(storage.storage_usage().used_bytes, 0);
    }

    #[tokio::test]
    async fn test_clear_deck_data_removes_deck_keys_with_one_delete() {
        let (storage, backend) = ready_storage().await;
        storage.save_decks(&json!([{"id": "d1"}])).unwrap();
        storage.save_cards("d1", &json!([1])).unwrap();
        storage.save_questions("d1", &json!([2])).unwrap();
        storage.save_stats("d1", &json!({"a": 1})).unwrap();
        storage.save_deck_settings("d1", &json!({"b": 2})).unwrap();
        storage.save_cards("d2", &json!([3])).unwrap();
        storage.flush_pending_writes().await.unwrap();
        backend.clear_calls();

        storage.clear_deck_data("d1");

        assert_eq!(storage.cards("d1"), json!([]));
        assert_eq!(storage.deck_settings("d1"), Value::Null);
        assert_eq!(storage.cards("d2"), json!([3]));
        assert_eq!(storage.decks(), json!([{"id": "d1"}]));

        storage.flush_pending_writes().await.unwrap();
        assert_eq!(
            backend.calls(),
            vec![BackendCall::DeleteKeys {
                user_id: "u1".to_string(),
                keys: vec![
                    "cards_d1".to_string(),
                    "questions_d1".to_string(),
                    "stats_d1".to_string(),
                    "deckSettings_d1".to_string(),
                ],
            }]
        );
        assert_eq!(backend.keys("u1"), vec![LEGACY_MIGRATION_MARKER, "cards_d2", "decks"]);
    }

    #[tokio::test]
    async fn test_clear_deck_data_without_session_is_noop() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);

        storage.clear_deck_data("d1");
        storage.flush_pending_writes().await.unwrap();
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_legacy_scenario_decks_and_font_scale() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::with_items([
            ("baza_decks", "[]"),
            ("baza_fontScale", "1.25"),
        ]));
        let storage = storage_with(&backend, &legacy);

        storage.init_for_user("u1").await.unwrap();

        assert_eq!(storage.decks(), json!([]));
        assert_eq!(storage.font_scale(), Some(1.25));
        assert_eq!(backend.keys("u1"), vec![LEGACY_MIGRATION_MARKER, "decks", "fontScale"]);
        assert!(legacy.is_empty());
    }

    #[tokio::test]
    async fn test_migration_runs_once_per_user() {
        let backend = Arc::new(MemoryBackend::new());
        let legacy = Arc::new(MemoryLegacyStore::with_items([
            ("baza_decks", r#"[{"id":"d1"}]"#),
            ("baza_broken", "{oops"),
            ("baza_cards_d1", "[1,2]"),
        ]));
        let storage = storage_with(&backend, &legacy);

        let first = storage.init_for_user("u1").await.unwrap();
        assert_eq!(first.migrated_keys, vec!["decks", "cards_d1"]);
        assert_eq!(first.skipped_keys, vec!["baza_broken"]);
        assert_eq!(first.removed_keys, 3);
        let upserts_after_first = backend.upserts().len();

        // A fresh legacy entry appearing later is not picked up again.
        legacy.set_item("baza_decks", "[]").unwrap();
        let second = storage.init_for_user("u1").await.unwrap();

        assert!(second.already_migrated);
        assert_eq!(second.removed_keys, 0);
        assert_eq!(backend.upserts().len(), upserts_after_first);
        assert_eq!(legacy.keys(), vec!["baza_decks"]);
        assert_eq!(storage.decks(), json!([{"id": "d1"}]));
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_session_unready() {
        let backend = Arc::new(MemoryBackend::new());
        backend.fail_fetch(Some("401"));
        let legacy = Arc::new(MemoryLegacyStore::new());
        let storage = storage_with(&backend, &legacy);

        let err = storage.init_for_user("u1").await.unwrap_err();
        assert!(matches!(err, StorageError::Backend(_)));
        assert!(!storage.is_ready());
        assert_eq!(storage.active_user(), None);
        assert!(storage.save_decks(&json!([])).is_err());
    }

    #[tokio::test]
    async fn test_usage_reports_cached_entries() {
        let (storage, _backend) = ready_storage().await;
        storage.save_decks(&json!([])).unwrap();

        let usage = storage.storage_usage();
        assert_eq!(usage.used_bytes, 14);
        assert_eq!(usage.used_kb, 0);
    }
}
