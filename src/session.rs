//! Session inputs supplied by the identity collaborator.
//!
//! This crate never issues or refreshes sessions. It only consumes the
//! user id and bearer token, and can look up the profile behind a token.

use crate::config::ServiceConfig;
use crate::http::{body_preview, read_body};
use serde::Deserialize;

/// Who is submitting, and the credential to record history with.
#[derive(Clone, PartialEq, Eq)]
pub struct Session {
    pub user_id: String,
    pub token: String,
}

impl Session {
    pub fn new(user_id: impl Into<String>, token: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
            token: token.into(),
        }
    }
}

// Keep bearer tokens out of logs.
impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("user_id", &self.user_id)
            .field("token", &format_args!("<{} chars>", self.token.len()))
            .finish()
    }
}

/// The `GET /me` profile.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct Profile {
    pub user_id: String,
    /// Comma-separated allergy list as entered at sign-up.
    #[serde(default)]
    pub food_allergy: Option<String>,
}

impl Profile {
    /// Allergens from the profile, trimmed, blanks dropped.
    pub fn allergens(&self) -> Vec<String> {
        self.food_allergy
            .as_deref()
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|a| !a.is_empty())
            .map(str::to_string)
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SessionError {
    #[error("profile request failed: {0}")]
    Network(String),

    #[error("profile endpoint returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("profile response was malformed: {0}")]
    Malformed(String),
}

/// Look up the profile behind a bearer token.
pub async fn fetch_me(
    client: &reqwest::Client,
    config: &ServiceConfig,
    token: &str,
) -> Result<Profile, SessionError> {
    let url = config.me_url();
    let response = client
        .get(&url)
        .bearer_auth(token)
        .send()
        .await
        .map_err(|e| {
            log::error!("[SESSION] GET {} failed: {}", url, e);
            SessionError::Network(e.to_string())
        })?;

    let (status, body) = read_body(response)
        .await
        .map_err(|e| SessionError::Network(e.to_string()))?;
    if !status.is_success() {
        log::warn!("[SESSION] /me returned {}", status);
        return Err(SessionError::Status {
            status: status.as_u16(),
            body: body_preview(&body),
        });
    }

    serde_json::from_str(&body).map_err(|e| SessionError::Malformed(e.to_string()))
}
