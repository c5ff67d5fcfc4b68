// Legacy local-only store (the pre-Supabase browser storage scheme)

mod sqlite;

pub use sqlite::SqliteLegacyStore;

use parking_lot::Mutex;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum LegacyStoreError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
    #[error("Lock error")]
    Lock,
}

/// String key/value store the application used before remote persistence.
///
/// Enumeration order is discovery order and must be stable between calls.
pub trait LegacyStore: Send + Sync {
    /// All `(key, raw value)` pairs whose key starts with `prefix`.
    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, LegacyStoreError>;

    fn get_item(&self, key: &str) -> Result<Option<String>, LegacyStoreError>;

    fn set_item(&self, key: &str, value: &str) -> Result<(), LegacyStoreError>;

    fn remove_item(&self, key: &str) -> Result<(), LegacyStoreError>;
}

/// Insertion-ordered in-memory store.
#[derive(Default)]
pub struct MemoryLegacyStore {
    items: Mutex<Vec<(String, String)>>,
}

impl MemoryLegacyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_items<'a>(items: impl IntoIterator<Item = (&'a str, &'a str)>) -> Self {
        let store = Self::new();
        {
            let mut guard = store.items.lock();
            for (key, value) in items {
                guard.push((key.to_string(), value.to_string()));
            }
        }
        store
    }

    pub fn keys(&self) -> Vec<String> {
        self.items.lock().iter().map(|(k, _)| k.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.items.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.lock().is_empty()
    }
}

impl LegacyStore for MemoryLegacyStore {
    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, LegacyStoreError> {
        Ok(self
            .items
            .lock()
            .iter()
            .filter(|(key, _)| key.starts_with(prefix))
            .cloned()
            .collect())
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, LegacyStoreError> {
        Ok(self
            .items
            .lock()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.clone()))
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LegacyStoreError> {
        let mut items = self.items.lock();
        match items.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.to_string(),
            None => items.push((key.to_string(), value.to_string())),
        }
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LegacyStoreError> {
        self.items.lock().retain(|(k, _)| k != key);
        Ok(())
    }
}
