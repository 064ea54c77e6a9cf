//! Auth Context
//!
//! Holds the current session for one application instance.

use std::sync::Arc;

use chrono::Utc;
use tokio::sync::RwLock;
use tracing::{info, warn};

use crate::auth::{AuthError, AuthUser, IdentityProvider, Session};

#[derive(Clone)]
pub struct AuthContext {
    provider: Arc<dyn IdentityProvider>,
    session: Arc<RwLock<Option<Session>>>,
}

impl AuthContext {
    pub fn new(provider: Arc<dyn IdentityProvider>) -> Self {
        Self {
            provider,
            session: Arc::new(RwLock::new(None)),
        }
    }

    /// Signs in and replaces any current session.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let session = self.provider.sign_in_with_password(email, password).await?;
        info!(user = %session.user.id, "session started");
        *self.session.write().await = Some(session.clone());
        Ok(session)
    }

    /// Ends the current session. Logging out without a session is a no-op.
    ///
    /// The local session is dropped even if the provider call fails.
    pub async fn logout(&self) -> Result<(), AuthError> {
        let Some(session) = self.session.write().await.take() else {
            return Ok(());
        };
        let result = self.provider.sign_out(&session.access_token).await;
        if let Err(err) = &result {
            warn!(error = %err, "sign out failed at provider");
        }
        result
    }

    /// The current session, unless it has expired.
    pub async fn session(&self) -> Option<Session> {
        let now = Utc::now().timestamp();
        let mut guard = self.session.write().await;
        if guard.as_ref().is_some_and(|s| s.is_expired_at(now)) {
            *guard = None;
        }
        guard.clone()
    }

    pub async fn access_token(&self) -> Result<String, AuthError> {
        self.session()
            .await
            .map(|s| s.access_token)
            .ok_or(AuthError::NoSession)
    }

    /// Asks the provider who the current token belongs to.
    pub async fn current_user(&self) -> Result<AuthUser, AuthError> {
        let token = self.access_token().await?;
        self.provider.get_user(&token).await
    }
}
