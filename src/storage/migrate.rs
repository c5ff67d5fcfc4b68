// One-time migration from the legacy local store into remote storage

use super::keys::{FONT_SCALE, LEGACY_FONT_SCALE, LEGACY_MIGRATION_MARKER, LEGACY_PREFIX};
use super::StorageError;
use crate::backend::StorageBackend;
use crate::legacy::LegacyStore;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;

/// What a migration run did.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct MigrationReport {
    /// The marker was already set; nothing was read or written.
    pub already_migrated: bool,
    /// Keys (prefix stripped) written to remote storage, in discovery order.
    pub migrated_keys: Vec<String>,
    /// Legacy keys whose value was not valid JSON.
    pub skipped_keys: Vec<String>,
    pub font_scale: Option<f64>,
    /// Legacy keys removed from the local store after the marker landed.
    pub removed_keys: usize,
}

/// Lift legacy entries into `entries` and the backend.
///
/// Remote writes are awaited one by one so the marker is only written after
/// every entry landed; local cleanup happens strictly after the marker. Any
/// backend failure aborts the run with the legacy source left intact.
pub(crate) async fn migrate_legacy(
    backend: &dyn StorageBackend,
    legacy: &dyn LegacyStore,
    user_id: &str,
    entries: &mut HashMap<String, Value>,
) -> Result<MigrationReport, StorageError> {
    let mut report = MigrationReport::default();

    if entries.get(LEGACY_MIGRATION_MARKER).is_some_and(is_truthy) {
        report.already_migrated = true;
        return Ok(report);
    }

    let mut to_migrate = Vec::new();
    for (legacy_key, raw) in legacy.entries_with_prefix(LEGACY_PREFIX)? {
        if raw.is_empty() {
            continue;
        }
        match serde_json::from_str::<Value>(&raw) {
            Ok(value) => {
                let key = legacy_key[LEGACY_PREFIX.len()..].to_string();
                to_migrate.push((key, value));
            }
            Err(e) => {
                tracing::warn!("Skipping malformed legacy entry {}: {}", legacy_key, e);
                report.skipped_keys.push(legacy_key);
            }
        }
    }

    if to_migrate.is_empty() {
        write_marker(backend, user_id, entries).await?;
        return Ok(report);
    }

    tracing::info!("Migrating {} legacy entries for user {}", to_migrate.len(), user_id);

    for (key, value) in to_migrate {
        entries.insert(key.clone(), value.clone());
        backend.upsert(user_id, &key, &value).await?;
        report.migrated_keys.push(key);
    }

    if let Some(scale) = legacy.get_item(LEGACY_FONT_SCALE)?.as_deref().and_then(parse_font_scale) {
        let value = Value::from(scale);
        entries.insert(FONT_SCALE.to_string(), value.clone());
        backend.upsert(user_id, FONT_SCALE, &value).await?;
        report.font_scale = Some(scale);
    }

    write_marker(backend, user_id, entries).await?;

    // The font key carries the legacy prefix, so one sweep covers it.
    for (legacy_key, _) in legacy.entries_with_prefix(LEGACY_PREFIX)? {
        match legacy.remove_item(&legacy_key) {
            Ok(()) => report.removed_keys += 1,
            Err(e) => tracing::warn!("Failed to remove legacy entry {}: {}", legacy_key, e),
        }
    }

    tracing::info!(
        "Legacy migration done: {} migrated, {} skipped, {} removed",
        report.migrated_keys.len(),
        report.skipped_keys.len(),
        report.removed_keys
    );

    Ok(report)
}

async fn write_marker(
    backend: &dyn StorageBackend,
    user_id: &str,
    entries: &mut HashMap<String, Value>,
) -> Result<(), StorageError> {
    entries.insert(LEGACY_MIGRATION_MARKER.to_string(), Value::Bool(true));
    backend
        .upsert(user_id, LEGACY_MIGRATION_MARKER, &Value::Bool(true))
        .await?;
    Ok(())
}

/// Leading number of `raw`, ignoring anything after it (`"1.5px"` is 1.5).
fn parse_font_scale(raw: &str) -> Option<f64> {
    let scale: f64 = leading_number(raw.trim_start()).parse().ok()?;
    (scale.is_finite() && scale > 0.0).then_some(scale)
}

/// Longest prefix of `s` shaped like a decimal literal: sign, digits,
/// fraction, exponent. Empty when `s` does not start with one.
fn leading_number(s: &str) -> &str {
    let bytes = s.as_bytes();
    let digits_from = |from: usize| bytes[from..].iter().take_while(|b| b.is_ascii_digit()).count();

    let mut end = usize::from(matches!(bytes.first(), Some(b'+' | b'-')));
    let int_digits = digits_from(end);
    end += int_digits;

    let mut frac_digits = 0;
    if bytes.get(end) == Some(&b'.') {
        frac_digits = digits_from(end + 1);
        if int_digits + frac_digits > 0 {
            end += 1 + frac_digits;
        }
    }
    if int_digits + frac_digits == 0 {
        return "";
    }

    if matches!(bytes.get(end), Some(b'e' | b'E')) {
        let mut exp = end + 1;
        if matches!(bytes.get(exp), Some(b'+' | b'-')) {
            exp += 1;
        }
        let exp_digits = digits_from(exp);
        if exp_digits > 0 {
            end = exp + exp_digits;
        }
    }
    &s[..end]
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(_) | Value::Object(_) => true,
    }
}
