// Role lookup and admin RPCs

use super::SupabaseClient;
use crate::backend::BackendError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const DEFAULT_ROLE: &str = "user";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdminUser {
    #[serde(alias = "user_id")]
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub last_sign_in_at: Option<DateTime<Utc>>,
}

impl SupabaseClient {
    /// Role of the signed-in user; anything but a string means `user`.
    pub async fn current_app_role(&self) -> Result<String, BackendError> {
        let role: Value = self.rpc("current_app_role", &json!({})).await?;
        Ok(match role {
            Value::String(role) => role,
            _ => DEFAULT_ROLE.to_string(),
        })
    }

    pub async fn admin_list_users(&self) -> Result<Vec<AdminUser>, BackendError> {
        let users: Option<Vec<AdminUser>> = self.rpc("admin_list_users", &json!({})).await?;
        Ok(users.unwrap_or_default())
    }

    pub async fn admin_set_user_role(&self, target_user_id: &str, next_role: &str) -> Result<(), BackendError> {
        tracing::info!("Setting role of {} to {}", target_user_id, next_role);
        let _: Value = self
            .rpc(
                "admin_set_user_role",
                &json!({
                    "target_user_id": target_user_id,
                    "next_role": next_role,
                }),
            )
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::super::test_server::{self, client_for};
    use super::*;

    #[tokio::test]
    async fn test_non_string_role_defaults_to_user() {
        let server = test_server::start(vec![(200, "null"), (200, "\"admin\"")]);
        let client = client_for(&server.url);

        assert_eq!(client.current_app_role().await.unwrap(), "user");
        assert_eq!(client.current_app_role().await.unwrap(), "admin");
    }

    #[tokio::test]
    async fn test_list_users_handles_null_and_rows() {
        let server = test_server::start(vec![
            (200, "null"),
            (200, r#"[{"user_id":"u1","email":"a@b.pl","role":"admin"}]"#),
        ]);
        let client = client_for(&server.url);

        assert!(client.admin_list_users().await.unwrap().is_empty());
        let users = client.admin_list_users().await.unwrap();
        assert_eq!(users[0].id, "u1");
        assert_eq!(users[0].role.as_deref(), Some("admin"));
    }

    #[tokio::test]
    async fn test_set_role_sends_named_args() {
        let server = test_server::start(vec![(204, "")]);
        let client = client_for(&server.url);

        client.admin_set_user_role("u2", "editor").await.unwrap();

        let requests = server.requests.lock();
        assert_eq!(requests[0].path, "/rest/v1/rpc/admin_set_user_role");
        assert_eq!(
            requests[0].body_json(),
            json!({"target_user_id": "u2", "next_role": "editor"})
        );
    }
}
