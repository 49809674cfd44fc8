use std::fmt;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

/// Cookie the MarkD API reads the session credential from.
pub const SESSION_COOKIE: &str = "markd_auth";

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("invalid base url: {0}")]
    Url(#[from] url::ParseError),
    #[error("login rejected with {status}: {body}")]
    Rejected { status: StatusCode, body: String },
    #[error("login refused: {detail}")]
    Refused { detail: String },
    #[error("login succeeded but no markd_auth cookie was issued")]
    MissingSession,
}

#[derive(Clone)]
pub enum Credential {
    Login { username: String, password: String },
    Token(String),
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Credential::Login { username, .. } => f
                .debug_struct("Login")
                .field("username", username)
                .finish_non_exhaustive(),
            Credential::Token(_) => f.write_str("Token(..)"),
        }
    }
}

/// Session credential attached to every API request.
#[derive(Clone)]
pub struct Session {
    token: String,
    username: Option<String>,
}

impl fmt::Debug for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Session")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

impl Session {
    pub fn from_token(token: impl Into<String>) -> Self {
        Self {
            token: token.into(),
            username: None,
        }
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    pub fn cookie_header(&self) -> String {
        format!("{SESSION_COOKIE}={}", self.token)
    }

    pub(crate) async fn establish(
        http: &Client,
        base_url: &Url,
        credential: &Credential,
    ) -> Result<Self, AuthError> {
        match credential {
            Credential::Token(token) => Ok(Self::from_token(token.clone())),
            Credential::Login { username, password } => {
                Self::login(http, base_url, username, password).await
            }
        }
    }

    async fn login(
        http: &Client,
        base_url: &Url,
        username: &str,
        password: &str,
    ) -> Result<Self, AuthError> {
        let url = base_url.join("api/auth/login")?;
        let response = http
            .post(url)
            .json(&LoginRequest { username, password })
            .send()
            .await?;
        if response.status() != StatusCode::OK {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(AuthError::Rejected { status, body });
        }

        let token = response
            .cookies()
            .find(|cookie| cookie.name() == SESSION_COOKIE)
            .map(|cookie| cookie.value().to_string());
        let result: LoginResponse = response.json().await?;
        if !result.success {
            return Err(AuthError::Refused {
                detail: result.detail.unwrap_or_else(|| "Unknown error".to_string()),
            });
        }
        let token = token.ok_or(AuthError::MissingSession)?;
        let username = result
            .user
            .and_then(|user| user.username)
            .unwrap_or_else(|| username.to_string());
        Ok(Self {
            token,
            username: Some(username),
        })
    }
}

#[derive(Debug, Serialize)]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
}

#[derive(Debug, Deserialize)]
struct LoginResponse {
    #[serde(default)]
    success: bool,
    #[serde(default)]
    detail: Option<String>,
    #[serde(default)]
    user: Option<LoginUser>,
}

#[derive(Debug, Deserialize)]
struct LoginUser {
    #[serde(default)]
    username: Option<String>,
}
