// Supabase REST client (PostgREST + RPC)

pub mod admin;
pub mod decks;
pub mod storage;

pub use admin::AdminUser;
pub use decks::PublicDeck;
pub use storage::SupabaseStorage;

use crate::backend::BackendError;
use crate::config::RuntimeConfig;
use once_cell::sync::Lazy;
use parking_lot::RwLock;
use reqwest::{Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

static HTTP: Lazy<reqwest::Client> = Lazy::new(reqwest::Client::new);

pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    anon_key: String,
    access_token: RwLock<Option<String>>,
}

impl SupabaseClient {
    pub fn new(config: &RuntimeConfig) -> Result<Self, BackendError> {
        if !config.is_valid() {
            return Err(BackendError::NotConfigured(
                "set BAZUNIA_SUPABASE_URL and BAZUNIA_SUPABASE_ANON_KEY".to_string(),
            ));
        }
        Ok(Self {
            http: HTTP.clone(),
            url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            access_token: RwLock::new(None),
        })
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn anon_key(&self) -> &str {
        &self.anon_key
    }

    /// User token sent instead of the anon key once signed in.
    pub fn set_access_token(&self, token: Option<String>) {
        *self.access_token.write() = token;
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }

    pub(crate) fn rest_url(&self, path: &str) -> String {
        format!("{}/rest/v1/{}", self.url, path)
    }

    pub(crate) fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.url, path)
    }

    pub(crate) fn request(&self, method: Method, url: &str) -> RequestBuilder {
        let bearer = self.access_token().unwrap_or_else(|| self.anon_key.clone());
        self.http
            .request(method, url)
            .header("apikey", &self.anon_key)
            .bearer_auth(bearer)
    }

    /// Send and turn non-2xx statuses into `BackendError::Api`.
    pub(crate) async fn send(&self, request: RequestBuilder) -> Result<Response, BackendError> {
        let resp = request.send().await?;
        let status = resp.status();
        tracing::debug!("Supabase response status: {}", status);

        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(BackendError::Api {
                status: status.as_u16(),
                body,
            });
        }
        Ok(resp)
    }

    pub(crate) async fn read_json<T: DeserializeOwned>(resp: Response) -> Result<T, BackendError> {
        let body = resp.text().await?;
        let body = if body.trim().is_empty() { "null" } else { body.as_str() };
        serde_json::from_str(body)
            .map_err(|e| BackendError::Parse(format!("{} - Body: {}", e, body)))
    }

    /// Call a Postgres function exposed through `/rest/v1/rpc`.
    pub async fn rpc<T: DeserializeOwned>(&self, function: &str, args: &Value) -> Result<T, BackendError> {
        let url = self.rest_url(&format!("rpc/{}", function));
        let resp = self.send(self.request(Method::POST, &url).json(args)).await?;
        Self::read_json(resp).await
    }
}

/// Quote values for a PostgREST `in.(...)` filter.
pub(crate) fn in_filter(values: &[String]) -> String {
    let quoted: Vec<String> = values
        .iter()
        .map(|v| format!("\"{}\"", v.replace('\\', "\\\\").replace('"', "\\\"")))
        .collect();
    format!("in.({})", quoted.join(","))
}

pub(crate) fn eq_filter(value: &str) -> String {
    format!("eq.{}", urlencoding::encode(value))
}
