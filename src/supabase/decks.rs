// Global public deck catalog (`public_decks` table)

use super::{eq_filter, SupabaseClient};
use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

const TABLE: &str = "public_decks";
const COLUMNS: &str = "id,name,description,deck_group,categories,questions,question_count,version,source,is_archived,updated_by,created_at,updated_at";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PublicDeck {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub deck_group: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    /// Question payload, kept opaque.
    #[serde(default, skip_serializing_if = "Value::is_null")]
    pub questions: Value,
    #[serde(default)]
    pub question_count: Option<i64>,
    #[serde(default)]
    pub version: Option<i64>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub is_archived: bool,
    #[serde(default)]
    pub updated_by: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
}

impl SupabaseClient {
    /// Catalog ordered by name; archived decks only when asked for.
    pub async fn fetch_public_decks(&self, include_archived: bool) -> Result<Vec<PublicDeck>, BackendError> {
        let mut path = format!("{}?select={}&order=name.asc", TABLE, COLUMNS);
        if !include_archived {
            path.push_str("&is_archived=eq.false");
        }
        let resp = self
            .send(self.request(Method::GET, &self.rest_url(&path)))
            .await?;
        let decks: Option<Vec<PublicDeck>> = Self::read_json(resp).await?;
        Ok(decks.unwrap_or_default())
    }

    /// Insert or replace by `id`, returning the stored row.
    pub async fn upsert_public_deck(&self, deck: &PublicDeck) -> Result<PublicDeck, BackendError> {
        let path = format!("{}?on_conflict=id&select={}", TABLE, COLUMNS);
        let request = self
            .request(Method::POST, &self.rest_url(&path))
            .header("Prefer", "resolution=merge-duplicates,return=representation")
            .header("Accept", "application/vnd.pgrst.object+json")
            .json(deck);
        let resp = self.send(request).await?;
        tracing::info!("Upserted public deck {}", deck.id);
        Self::read_json(resp).await
    }

    pub async fn archive_public_deck(&self, deck_id: &str) -> Result<(), BackendError> {
        self.set_archived(deck_id, true).await
    }

    pub async fn restore_public_deck(&self, deck_id: &str) -> Result<(), BackendError> {
        self.set_archived(deck_id, false).await
    }

    pub async fn hide_public_deck(&self, deck_id: &str) -> Result<(), BackendError> {
        self.archive_public_deck(deck_id).await
    }

    pub async fn unhide_public_deck(&self, deck_id: &str) -> Result<(), BackendError> {
        self.restore_public_deck(deck_id).await
    }

    async fn set_archived(&self, deck_id: &str, archived: bool) -> Result<(), BackendError> {
        let path = format!("{}?id={}", TABLE, eq_filter(deck_id));
        let request = self
            .request(Method::PATCH, &self.rest_url(&path))
            .header("Prefer", "return=minimal")
            .json(&json!({ "is_archived": archived }));
        self.send(request).await?;
        Ok(())
    }
}
