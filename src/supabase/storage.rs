// `user_storage` table as the remote backend of the session cache

use super::{eq_filter, in_filter, SupabaseClient};
use crate::backend::{BackendError, StorageBackend, StoredEntry};
use async_trait::async_trait;
use reqwest::Method;
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;

const TABLE: &str = "user_storage";

#[derive(Serialize)]
struct UpsertRow<'a> {
    user_id: &'a str,
    key: &'a str,
    value: &'a Value,
}

pub struct SupabaseStorage {
    client: Arc<SupabaseClient>,
}

impl SupabaseStorage {
    pub fn new(client: Arc<SupabaseClient>) -> Self {
        Self { client }
    }
}

#[async_trait]
impl StorageBackend for SupabaseStorage {
    async fn fetch_all(&self, user_id: &str) -> Result<Vec<StoredEntry>, BackendError> {
        let url = self.client.rest_url(&format!(
            "{}?select=key,value&user_id={}",
            TABLE,
            eq_filter(user_id)
        ));
        let resp = self.client.send(self.client.request(Method::GET, &url)).await?;
        let rows: Option<Vec<StoredEntry>> = SupabaseClient::read_json(resp).await?;
        Ok(rows.unwrap_or_default())
    }

    async fn upsert(&self, user_id: &str, key: &str, value: &Value) -> Result<(), BackendError> {
        let url = self
            .client
            .rest_url(&format!("{}?on_conflict=user_id,key", TABLE));
        let request = self
            .client
            .request(Method::POST, &url)
            .header("Prefer", "resolution=merge-duplicates,return=minimal")
            .json(&UpsertRow { user_id, key, value });
        self.client.send(request).await?;
        tracing::debug!("Upserted {} for {}", key, user_id);
        Ok(())
    }

    async fn delete_keys(&self, user_id: &str, keys: &[String]) -> Result<(), BackendError> {
        if keys.is_empty() {
            return Ok(());
        }
        let url = self.client.rest_url(&format!(
            "{}?user_id={}&key={}",
            TABLE,
            eq_filter(user_id),
            urlencoding::encode(&in_filter(keys))
        ));
        self.client
            .send(self.client.request(Method::DELETE, &url))
            .await?;
        tracing::debug!("Deleted {} keys for {}", keys.len(), user_id);
        Ok(())
    }
}
