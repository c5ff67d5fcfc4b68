// Persisted auth session - tries keychain first, falls back to file storage

use super::{AuthError, AuthSession};
use std::path::PathBuf;

const KEYRING_SERVICE: &str = "app.bazunia";
const KEYRING_ENTRY: &str = "auth:session";
const SESSION_FILE: &str = "session.json";

pub struct SessionStore {
    dir: PathBuf,
    use_keyring: bool,
}

impl SessionStore {
    /// `~/.bazunia` with keychain enabled.
    pub fn default_location() -> Self {
        let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
        Self {
            dir: PathBuf::from(home).join(".bazunia"),
            use_keyring: true,
        }
    }

    /// File-only store rooted at `dir`.
    pub fn in_dir(dir: PathBuf) -> Self {
        Self {
            dir,
            use_keyring: false,
        }
    }

    fn file_path(&self) -> PathBuf {
        self.dir.join(SESSION_FILE)
    }

    fn keyring_entry(&self) -> Option<keyring::Entry> {
        if !self.use_keyring {
            return None;
        }
        keyring::Entry::new(KEYRING_SERVICE, KEYRING_ENTRY).ok()
    }

    pub fn save(&self, session: &AuthSession) -> Result<(), AuthError> {
        let json = serde_json::to_string(session)
            .map_err(|e| AuthError::Storage(format!("Failed to serialize session: {}", e)))?;

        let keychain_ok = self
            .keyring_entry()
            .and_then(|entry| entry.set_password(&json).ok())
            .is_some();
        if keychain_ok {
            tracing::info!("Session stored in system keychain");
        }

        // Keychain can silently fail on unsigned builds, keep the file as backup
        let path = self.file_path();
        std::fs::create_dir_all(&self.dir)
            .map_err(|e| AuthError::Storage(format!("Failed to create session dir: {}", e)))?;
        std::fs::write(&path, json)
            .map_err(|e| AuthError::Storage(format!("Failed to write session: {}", e)))?;
        tracing::debug!("Session stored at: {:?}", path);
        Ok(())
    }

    pub fn load(&self) -> Result<Option<AuthSession>, AuthError> {
        if let Some(json) = self.keyring_entry().and_then(|entry| entry.get_password().ok()) {
            let session = serde_json::from_str(&json)
                .map_err(|e| AuthError::Storage(format!("Failed to parse session: {}", e)))?;
            return Ok(Some(session));
        }

        let path = self.file_path();
        if !path.exists() {
            return Ok(None);
        }
        let json = std::fs::read_to_string(&path)
            .map_err(|e| AuthError::Storage(format!("Failed to read session: {}", e)))?;
        let session = serde_json::from_str(&json)
            .map_err(|e| AuthError::Storage(format!("Failed to parse session: {}", e)))?;
        Ok(Some(session))
    }

    pub fn delete(&self) {
        if let Some(entry) = self.keyring_entry() {
            let _ = entry.delete_credential();
        }
        let _ = std::fs::remove_file(self.file_path());
    }
}
