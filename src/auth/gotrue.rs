//! Hosted identity REST client (`<project>/auth/v1`).

use async_trait::async_trait;
use reqwest::{Client, Response};
use serde::Deserialize;
use serde_json::json;
use tracing::debug;

use crate::auth::{AuthError, AuthUser, IdentityProvider, Session};

#[derive(Debug, Clone)]
pub struct GoTrueClient {
    http: Client,
    endpoint: String,
    anon_key: String,
}

/// The error shapes the identity service uses across versions.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error_description: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
}

impl ErrorBody {
    fn into_message(self) -> Option<String> {
        self.error_description
            .or(self.msg)
            .or(self.message)
            .or(self.error)
    }
}

fn error_message(body: &str) -> String {
    serde_json::from_str::<ErrorBody>(body)
        .ok()
        .and_then(ErrorBody::into_message)
        .unwrap_or_else(|| body.trim().to_string())
}

impl GoTrueClient {
    pub fn new(project_url: &str, anon_key: &str) -> Self {
        Self::with_http(Client::new(), project_url, anon_key)
    }

    pub fn with_http(http: Client, project_url: &str, anon_key: &str) -> Self {
        Self {
            http,
            endpoint: format!("{}/auth/v1", project_url.trim_end_matches('/')),
            anon_key: anon_key.to_string(),
        }
    }

    async fn check(response: Response) -> Result<Response, AuthError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(AuthError::Rejected {
            status: status.as_u16(),
            message: error_message(&body),
        })
    }
}

fn transport(err: reqwest::Error) -> AuthError {
    AuthError::Transport(err.to_string())
}

#[async_trait]
impl IdentityProvider for GoTrueClient {
    async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> Result<Session, AuthError> {
        let response = self
            .http
            .post(format!("{}/token?grant_type=password", self.endpoint))
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await
            .map_err(transport)?;

        let response = match Self::check(response).await {
            Err(AuthError::Rejected { status: 400, message }) => {
                return Err(AuthError::InvalidCredentials(message))
            }
            other => other?,
        };
        debug!(email, "signed in");
        response.json::<Session>().await.map_err(transport)
    }

    async fn get_user(&self, access_token: &str) -> Result<AuthUser, AuthError> {
        let response = self
            .http
            .get(format!("{}/user", self.endpoint))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response)
            .await?
            .json::<AuthUser>()
            .await
            .map_err(transport)
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(format!("{}/logout", self.endpoint))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await
            .map_err(transport)?;

        Self::check(response).await.map(|_| ())
    }
}
