//! Auth Module
//!
//! Identity provider seam and the session holder built on it.

mod context;
mod gotrue;

pub use context::AuthContext;
pub use gotrue::GoTrueClient;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// == Auth Error ==
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AuthError {
    /// Email/password pair was rejected
    #[error("Invalid credentials: {0}")]
    InvalidCredentials(String),

    /// An operation needed a signed-in user and there was none
    #[error("No active session")]
    NoSession,

    /// The identity provider answered with an error status
    #[error("Identity provider rejected request ({status}): {message}")]
    Rejected { status: u16, message: String },

    /// The identity provider could not be reached or answered garbage
    #[error("Identity provider unavailable: {0}")]
    Transport(String),
}

// == Session Types ==
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: String,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
}

/// A signed-in session as issued by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default = "bearer")]
    pub token_type: String,
    /// Lifetime in seconds from issue
    pub expires_in: u64,
    /// Expiry as a Unix timestamp in seconds
    #[serde(default)]
    pub expires_at: Option<i64>,
    pub user: AuthUser,
}

fn bearer() -> String {
    "bearer".to_string()
}

impl Session {
    /// True once `expires_at` is reached. Sessions without an expiry never expire.
    pub fn is_expired_at(&self, unix_secs: i64) -> bool {
        self.expires_at.map_or(false, |at| unix_secs >= at)
    }
}

// == Identity Provider Trait ==
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    async fn sign_in_with_password(&self, email: &str, password: &str)
        -> Result<Session, AuthError>;

    /// Resolves the user behind `access_token`, failing if the token is no longer valid.
    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;
}
