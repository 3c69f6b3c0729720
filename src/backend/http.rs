//! HTTP implementation of the backend collaborator.
//!
//! Talks to the backend's REST surface: password-grant token exchange,
//! signup with a confirmation redirect, logout, and row queries with
//! equality filters against the entitlement tables.

use std::time::Duration;

use anyhow::Context;
use chrono::Utc;
use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tokio::sync::broadcast;

use super::{AuthBackend, AuthError, AuthSession, SessionEvent};
use crate::config::BackendConfig;
use crate::session::{Plan, Profile, Role};

/// Capacity of the pushed-event channel. Session changes are rare.
const EVENT_CHANNEL_CAPACITY: usize = 16;

pub struct HttpBackend {
    base_url: String,
    anon_key: String,
    confirm_redirect_url: Option<String>,
    client: reqwest::Client,
    events: broadcast::Sender<SessionEvent>,
}

#[derive(Debug, Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: i64,
    user: TokenUser,
}

#[derive(Debug, Deserialize)]
struct TokenUser {
    id: String,
    #[serde(default)]
    email: String,
}

#[derive(Debug, Deserialize)]
struct RoleRow {
    role: Role,
}

impl HttpBackend {
    pub fn new(config: &BackendConfig) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .context("Failed to build backend HTTP client")?;
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            anon_key: config.anon_key.clone(),
            confirm_redirect_url: config.confirm_redirect_url.clone(),
            client,
            events,
        })
    }

    fn rest_url(&self, table: &str, filters: &[(&str, String)]) -> String {
        let mut url = format!("{}/rest/v1/{}?select=*", self.base_url, table);
        for (column, value) in filters {
            url.push_str(&format!("&{}=eq.{}", column, value));
        }
        url
    }

    /// Row query with equality filters. Used for the entitlement tables
    /// and for dashboard data (`countries`, `towers`, `ev_stations`).
    pub async fn select<T: DeserializeOwned>(
        &self,
        table: &str,
        filters: &[(&str, String)],
    ) -> Result<Vec<T>, AuthError> {
        let response = self
            .client
            .get(self.rest_url(table, filters))
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        Ok(response.json().await?)
    }

    /// Single-row fetch by key column. `Ok(None)` when no row matches.
    pub async fn fetch_by_key<T: DeserializeOwned>(
        &self,
        table: &str,
        key_column: &str,
        key: &str,
    ) -> Result<Option<T>, AuthError> {
        let rows = self.select(table, &[(key_column, key.to_string())]).await?;
        Ok(rows.into_iter().next())
    }

    /// Invoke a deployed edge function by name. Used to reach the
    /// ingestion proxy in deployed contexts.
    pub async fn invoke_function(
        &self,
        name: &str,
        body: &serde_json::Value,
    ) -> Result<serde_json::Value, AuthError> {
        let url = format!("{}/functions/v1/{}", self.base_url, name);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(&self.anon_key)
            .json(body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        Ok(response.json().await?)
    }
}

#[async_trait::async_trait]
impl AuthBackend for HttpBackend {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        let url = format!("{}/auth/v1/token?grant_type=password", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::BAD_REQUEST || status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::InvalidCredentials);
        }
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        let token: TokenResponse = response.json().await?;
        Ok(AuthSession {
            access_token: token.access_token,
            user_id: token.user.id,
            email: token.user.email,
            expires_at: Utc::now() + chrono::Duration::seconds(token.expires_in),
        })
    }

    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError> {
        let mut url = format!("{}/auth/v1/signup", self.base_url);
        if let Some(redirect) = &self.confirm_redirect_url {
            url.push_str(&format!("?redirect_to={}", redirect));
        }

        let mut body = serde_json::json!({ "email": email, "password": password });
        if let Some(name) = display_name {
            body["data"] = serde_json::json!({ "display_name": name });
        }

        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }
        Ok(())
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let url = format!("{}/auth/v1/logout", self.base_url);
        let response = self
            .client
            .post(&url)
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED {
            return Err(AuthError::TokenExpired);
        }
        if !status.is_success() {
            return Err(AuthError::Backend {
                status: status.as_u16(),
                message: error_message(response).await,
            });
        }

        // Other consumers of this backend observe the teardown through
        // the pushed event stream.
        let _ = self.events.send(SessionEvent::SignedOut);
        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AuthError> {
        self.fetch_by_key("profiles", "id", user_id).await
    }

    async fn fetch_plan(&self, user_id: &str) -> Result<Option<Plan>, AuthError> {
        self.fetch_by_key("user_plans", "user_id", user_id).await
    }

    async fn fetch_role(&self, user_id: &str) -> Result<Option<Role>, AuthError> {
        let row: Option<RoleRow> = self.fetch_by_key("user_roles", "user_id", user_id).await?;
        Ok(row.map(|r| r.role))
    }

    fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }
}

/// Pull a human-readable message out of a backend error body, which may
/// be JSON (`error_description`, `msg`, `message`) or plain text.
async fn error_message(response: reqwest::Response) -> String {
    let text = response.text().await.unwrap_or_default();
    match serde_json::from_str::<serde_json::Value>(&text) {
        Ok(value) => value
            .get("error_description")
            .or_else(|| value.get("msg"))
            .or_else(|| value.get("message"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .unwrap_or(text),
        Err(_) => text,
    }
}
