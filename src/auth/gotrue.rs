// Supabase Auth (GoTrue) - password and Google PKCE sign-in via reqwest

use super::{AuthError, AuthSession, AuthUser, SessionStore};
use crate::supabase::SupabaseClient;
use chrono::Utc;
use parking_lot::RwLock;
use reqwest::Method;
use serde_json::{json, Value};
use std::sync::Arc;
use tokio::sync::{broadcast, Mutex};

const EVENT_CAPACITY: usize = 16;

#[derive(Debug, Clone, PartialEq)]
pub enum AuthEvent {
    SignedIn(AuthSession),
    TokenRefreshed(AuthSession),
    SignedOut,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SignUpOutcome {
    SignedIn(AuthSession),
    /// Email confirmation is required before the first sign-in.
    ConfirmationRequired(AuthUser),
}

pub struct SupabaseAuth {
    client: Arc<SupabaseClient>,
    redirect_to: String,
    store: Option<SessionStore>,
    session: RwLock<Option<AuthSession>>,
    pending_verifier: Mutex<Option<String>>,
    events: broadcast::Sender<AuthEvent>,
}

impl SupabaseAuth {
    /// `redirect_to` is the app origin used by OAuth and password-reset links.
    pub fn new(client: Arc<SupabaseClient>, redirect_to: String, store: Option<SessionStore>) -> Self {
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        Self {
            client,
            redirect_to,
            store,
            session: RwLock::new(None),
            pending_verifier: Mutex::new(None),
            events,
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<AuthEvent> {
        self.events.subscribe()
    }

    pub fn user_id(&self) -> Option<String> {
        self.session.read().as_ref().map(|s| s.user.id.clone())
    }

    pub async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        tracing::info!("Signing in with password");
        let session = self
            .token_request("password", &json!({ "email": email, "password": password }))
            .await?;
        Ok(self.install_session(session, AuthEvent::SignedIn))
    }

    pub async fn sign_up_with_password(&self, email: &str, password: &str) -> Result<SignUpOutcome, AuthError> {
        let url = self.client.auth_url("signup");
        let request = self
            .client
            .request(Method::POST, &url)
            .json(&json!({ "email": email, "password": password }));
        let resp = self.client.send(request).await?;
        let body: Value = SupabaseClient::read_json(resp).await?;

        if body.get("access_token").is_some() {
            let session: AuthSession = serde_json::from_value(body).map_err(crate::backend::BackendError::from)?;
            let session = session.stamp_expiry(Utc::now());
            return Ok(SignUpOutcome::SignedIn(
                self.install_session(session, AuthEvent::SignedIn),
            ));
        }

        let user = body.get("user").cloned().unwrap_or(body);
        let user: AuthUser = serde_json::from_value(user).map_err(crate::backend::BackendError::from)?;
        tracing::info!("Sign-up for {} awaits email confirmation", user.id);
        Ok(SignUpOutcome::ConfirmationRequired(user))
    }

    /// Revoke the session remotely and forget it locally, even if revocation fails.
    pub async fn sign_out(&self) -> Result<(), AuthError> {
        let signed_in = self.session.read().is_some();
        let remote = if signed_in {
            let url = self.client.auth_url("logout");
            self.client
                .send(self.client.request(Method::POST, &url))
                .await
                .map(|_| ())
        } else {
            Ok(())
        };

        *self.session.write() = None;
        self.client.set_access_token(None);
        if let Some(store) = &self.store {
            store.delete();
        }
        let _ = self.events.send(AuthEvent::SignedOut);
        tracing::info!("Signed out");

        remote.map_err(AuthError::from)
    }

    pub async fn send_password_reset_email(&self, email: &str) -> Result<(), AuthError> {
        let url = self.client.auth_url(&format!(
            "recover?redirect_to={}",
            urlencoding::encode(&self.redirect_to)
        ));
        let request = self
            .client
            .request(Method::POST, &url)
            .json(&json!({ "email": email }));
        self.client.send(request).await?;
        Ok(())
    }

    /// The live session, restoring a persisted one and refreshing it when expired.
    pub async fn current_session(&self) -> Result<Option<AuthSession>, AuthError> {
        let in_memory = self.session.read().clone();
        let (session, restored) = match in_memory {
            Some(session) => (session, false),
            None => match self.store.as_ref().map(SessionStore::load).transpose()?.flatten() {
                Some(session) => (session, true),
                None => return Ok(None),
            },
        };

        if session.is_expired(Utc::now()) {
            tracing::info!("Session expired, refreshing");
            return self.refresh_with(&session.refresh_token).await.map(Some);
        }
        if restored {
            tracing::info!("Restored persisted session for {}", session.user.id);
            return Ok(Some(self.install_session(session, AuthEvent::SignedIn)));
        }
        Ok(Some(session))
    }

    pub async fn refresh_session(&self) -> Result<AuthSession, AuthError> {
        let refresh_token = self
            .session
            .read()
            .as_ref()
            .map(|s| s.refresh_token.clone())
            .ok_or(AuthError::NotSignedIn)?;
        self.refresh_with(&refresh_token).await
    }

    /// Authorize URL for Google sign-in; remembers the PKCE verifier.
    pub async fn google_authorize_url(&self) -> String {
        let (verifier, challenge) = generate_pkce();
        *self.pending_verifier.lock().await = Some(verifier);

        format!(
            "{}?provider=google&redirect_to={}&code_challenge={}&code_challenge_method=s256",
            self.client.auth_url("authorize"),
            urlencoding::encode(&self.redirect_to),
            urlencoding::encode(&challenge)
        )
    }

    /// Open the Google sign-in page in the system browser and return its URL.
    pub async fn start_google_sign_in(&self) -> String {
        let url = self.google_authorize_url().await;
        if let Err(e) = open::that(&url) {
            tracing::warn!("Failed to open browser: {}", e);
        }
        url
    }

    /// Exchange the `code` from the OAuth redirect for a session.
    pub async fn complete_google_sign_in(&self, code: &str) -> Result<AuthSession, AuthError> {
        let verifier = self
            .pending_verifier
            .lock()
            .await
            .take()
            .ok_or_else(|| AuthError::OAuth("No pending sign-in flow".to_string()))?;

        let session = self
            .token_request("pkce", &json!({ "auth_code": code, "code_verifier": verifier }))
            .await?;
        Ok(self.install_session(session, AuthEvent::SignedIn))
    }

    async fn refresh_with(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        let session = self
            .token_request("refresh_token", &json!({ "refresh_token": refresh_token }))
            .await?;
        Ok(self.install_session(session, AuthEvent::TokenRefreshed))
    }

    async fn token_request(&self, grant_type: &str, body: &Value) -> Result<AuthSession, AuthError> {
        let url = self
            .client
            .auth_url(&format!("token?grant_type={}", grant_type));
        let resp = self
            .client
            .send(self.client.request(Method::POST, &url).json(body))
            .await?;
        let session: AuthSession = SupabaseClient::read_json(resp).await?;
        Ok(session.stamp_expiry(Utc::now()))
    }

    fn install_session(&self, session: AuthSession, event: fn(AuthSession) -> AuthEvent) -> AuthSession {
        self.client.set_access_token(Some(session.access_token.clone()));
        if let Some(store) = &self.store {
            if let Err(e) = store.save(&session) {
                tracing::warn!("Failed to persist session: {}", e);
            }
        }
        *self.session.write() = Some(session.clone());
        let _ = self.events.send(event(session.clone()));
        tracing::info!("Signed in as {}", session.user.id);
        session
    }
}

/// PKCE verifier and its S256 challenge.
fn generate_pkce() -> (String, String) {
    use sha2::{Digest, Sha256};

    let verifier = format!(
        "{:016x}{:016x}{:016x}{:016x}",
        rand::random::<u64>(),
        rand::random::<u64>(),
        rand::random::<u64>(),
        rand::random::<u64>()
    );
    let challenge = base64_url_encode(&Sha256::digest(verifier.as_bytes()));
    (verifier, challenge)
}

fn base64_url_encode(input: &[u8]) -> String {
    use base64::Engine;
    base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(input)
}
