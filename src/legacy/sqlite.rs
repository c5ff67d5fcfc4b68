// SQLite rendition of the legacy browser local store

use super::{LegacyStore, LegacyStoreError};
use rusqlite::{params, Connection};
use std::path::Path;
use std::sync::{Arc, Mutex};

pub struct SqliteLegacyStore {
    conn: Arc<Mutex<Connection>>,
}

impl SqliteLegacyStore {
    pub fn open(db_path: &Path) -> Result<Self, LegacyStoreError> {
        Self::from_connection(Connection::open(db_path)?)
    }

    pub fn open_in_memory() -> Result<Self, LegacyStoreError> {
        Self::from_connection(Connection::open_in_memory()?)
    }

    fn from_connection(conn: Connection) -> Result<Self, LegacyStoreError> {
        let store = Self {
            conn: Arc::new(Mutex::new(conn)),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<(), LegacyStoreError> {
        let conn = self.conn.lock().map_err(|_| LegacyStoreError::Lock)?;
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS local_storage (
                key TEXT PRIMARY KEY,
                value TEXT NOT NULL
            );
            "#,
        )?;
        Ok(())
    }
}

impl LegacyStore for SqliteLegacyStore {
    fn entries_with_prefix(&self, prefix: &str) -> Result<Vec<(String, String)>, LegacyStoreError> {
        let conn = self.conn.lock().map_err(|_| LegacyStoreError::Lock)?;
        // LIKE would treat the '_' in prefixes as a wildcard
        let mut stmt = conn.prepare(
            "SELECT key, value FROM local_storage WHERE substr(key, 1, ?2) = ?1 ORDER BY rowid",
        )?;
        let rows = stmt.query_map(params![prefix, prefix.chars().count() as i64], |row| {
            Ok((row.get(0)?, row.get(1)?))
        })?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn get_item(&self, key: &str) -> Result<Option<String>, LegacyStoreError> {
        let conn = self.conn.lock().map_err(|_| LegacyStoreError::Lock)?;
        let mut stmt = conn.prepare("SELECT value FROM local_storage WHERE key = ?1")?;
        let result = stmt.query_row(params![key], |row| row.get(0));

        match result {
            Ok(value) => Ok(Some(value)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn set_item(&self, key: &str, value: &str) -> Result<(), LegacyStoreError> {
        let conn = self.conn.lock().map_err(|_| LegacyStoreError::Lock)?;
        // Keep the original rowid so enumeration order survives overwrites
        conn.execute(
            "INSERT INTO local_storage (key, value) VALUES (?1, ?2)
             ON CONFLICT(key) DO UPDATE SET value = excluded.value",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<(), LegacyStoreError> {
        let conn = self.conn.lock().map_err(|_| LegacyStoreError::Lock)?;
        conn.execute("DELETE FROM local_storage WHERE key = ?1", params![key])?;
        Ok(())
    }
}
