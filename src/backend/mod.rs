//! External identity/data backend collaborators.
//!
//! The dashboard's identity provider and row store are one external
//! service. This module defines the client trait the session gate
//! programs against, plus the production HTTP implementation.

mod http;

pub use http::HttpBackend;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::sync::broadcast;

use crate::session::{Plan, Profile, Role};

/// Errors surfaced by the identity backend.
#[derive(Error, Debug, Clone)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,

    #[error("session token is expired or invalid")]
    TokenExpired,

    #[error("network failure reaching the identity backend: {0}")]
    Network(String),

    #[error("identity backend error ({status}): {message}")]
    Backend { status: u16, message: String },
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        AuthError::Network(err.to_string())
    }
}

/// An established session as issued by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthSession {
    pub access_token: String,
    pub user_id: String,
    pub email: String,
    pub expires_at: DateTime<Utc>,
}

/// Session-change notifications the backend pushes asynchronously.
#[derive(Debug, Clone)]
pub enum SessionEvent {
    /// A session was established or restored outside an explicit sign-in
    /// call on this gate (another tab, a restored token).
    SignedIn(AuthSession),
    /// The backend rotated the token for the current identity.
    TokenRefreshed(AuthSession),
    /// The session was invalidated: expiry or remote sign-out.
    SignedOut,
}

/// Client surface of the identity/entitlements backend.
///
/// Fetch methods return `Ok(None)` when the identity simply has no row;
/// that is not an error.
#[async_trait]
pub trait AuthBackend: Send + Sync {
    async fn sign_in(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    /// Request provisioning of a new identity. Does not establish a
    /// session; the backend's confirmation policy decides when the
    /// identity becomes usable.
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        display_name: Option<&str>,
    ) -> Result<(), AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<Profile>, AuthError>;

    async fn fetch_plan(&self, user_id: &str) -> Result<Option<Plan>, AuthError>;

    async fn fetch_role(&self, user_id: &str) -> Result<Option<Role>, AuthError>;

    /// Subscribe to pushed session changes. Every subscriber sees every
    /// event emitted after the call.
    fn subscribe(&self) -> broadcast::Receiver<SessionEvent>;
}
