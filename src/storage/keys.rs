// Storage key naming

pub const DECKS: &str = "decks";
pub const SETTINGS: &str = "settings";
pub const APP_SETTINGS: &str = "appSettings";
pub const FONT_SCALE: &str = "fontScale";

/// Sentinel entry written once the legacy local store has been migrated.
pub const LEGACY_MIGRATION_MARKER: &str = "__legacyLocalMigratedV1";

pub const LEGACY_PREFIX: &str = "baza_";
pub const LEGACY_FONT_SCALE: &str = "baza_fontScale";

pub fn cards(deck_id: &str) -> String {
    format!("cards_{}", deck_id)
}

pub fn questions(deck_id: &str) -> String {
    format!("questions_{}", deck_id)
}

pub fn stats(deck_id: &str) -> String {
    format!("stats_{}", deck_id)
}

pub fn deck_settings(deck_id: &str) -> String {
    format!("deckSettings_{}", deck_id)
}

/// Every key owned by a single deck.
pub fn deck_scoped(deck_id: &str) -> [String; 4] {
    [
        cards(deck_id),
        questions(deck_id),
        stats(deck_id),
        deck_settings(deck_id),
    ]
}
