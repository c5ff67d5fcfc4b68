// Approximate storage footprint for the settings screen

use super::keys::LEGACY_MIGRATION_MARKER;
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StorageUsage {
    pub used_bytes: usize,
    /// Rounded to the nearest kilobyte.
    pub used_kb: usize,
    /// Rounded to two decimals.
    pub used_mb: f64,
}

impl StorageUsage {
    /// Two bytes per UTF-16 code unit of every key and serialized value,
    /// skipping the migration marker.
    pub fn estimate<'a>(entries: impl IntoIterator<Item = (&'a String, &'a Value)>) -> Self {
        let used_bytes = entries
            .into_iter()
            .filter(|(key, _)| key.as_str() != LEGACY_MIGRATION_MARKER)
            .map(|(key, value)| (utf16_len(key) + utf16_len(&value.to_string())) * 2)
            .sum();
        Self::from_bytes(used_bytes)
    }

    fn from_bytes(used_bytes: usize) -> Self {
        let used_kb = (used_bytes as f64 / 1024.0).round() as usize;
        let used_mb = (used_bytes as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0;
        Self {
            used_bytes,
            used_kb,
            used_mb,
        }
    }
}

fn utf16_len(s: &str) -> usize {
    s.encode_utf16().count()
}
