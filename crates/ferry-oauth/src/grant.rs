//! The OAuth `refresh_token` grant.

use std::time::Duration;

use serde::Deserialize;

use crate::error::{OAuthError, Result};

/// Per-request timeout for token endpoint calls.
pub const DEFAULT_REFRESH_TIMEOUT: Duration = Duration::from_secs(10);

/// Everything needed to post one refresh request.
#[derive(Debug, Clone)]
pub struct RefreshGrant {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: Option<String>,
    pub refresh_token: String,
}

/// Token endpoint reply. Only `access_token` is required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TokenResponse {
    #[serde(default)]
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<i64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

impl TokenResponse {
    /// A rotated refresh token, if the endpoint sent a non-empty one.
    pub fn rotated_refresh_token(&self) -> Option<&str> {
        non_empty(self.refresh_token.as_deref())
    }

    pub fn id_token(&self) -> Option<&str> {
        non_empty(self.id_token.as_deref())
    }

    pub fn token_type(&self) -> Option<&str> {
        non_empty(self.token_type.as_deref())
    }
}

fn non_empty(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

/// Blocking client for token endpoints.
///
/// The underlying `reqwest` client is built per call: refreshes happen at
/// most once per credential per config load, and a blocking client must not
/// be constructed on an async runtime thread.
#[derive(Debug, Clone)]
pub struct RefreshClient {
    timeout: Duration,
}

impl Default for RefreshClient {
    fn default() -> Self {
        Self::new(DEFAULT_REFRESH_TIMEOUT)
    }
}

impl RefreshClient {
    pub fn new(timeout: Duration) -> Self {
        Self { timeout }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Exchange a refresh token for a new access token.
    ///
    /// A non-2xx status or a reply without `access_token` is an error.
    pub fn refresh(&self, grant: &RefreshGrant) -> Result<TokenResponse> {
        let client = reqwest::blocking::Client::builder()
            .timeout(self.timeout)
            .build()?;

        let mut form = vec![
            ("client_id", grant.client_id.as_str()),
            ("refresh_token", grant.refresh_token.as_str()),
            ("grant_type", "refresh_token"),
        ];
        if let Some(secret) = grant.client_secret.as_deref().filter(|s| !s.is_empty()) {
            form.push(("client_secret", secret));
        }

        tracing::debug!(token_url = %grant.token_url, "Requesting token refresh");
        let response = client
            .post(&grant.token_url)
            .form(&form)
            .send()
            .map_err(|e| OAuthError::Network(format!("Token refresh request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(OAuthError::Backend {
                status: status.as_u16(),
                body,
            });
        }

        let tokens: TokenResponse = response
            .json()
            .map_err(|e| OAuthError::InvalidResponse(format!("Failed to parse refresh response: {}", e)))?;
        if tokens.access_token.trim().is_empty() {
            return Err(OAuthError::InvalidResponse(
                "response has no access_token".to_string(),
            ));
        }

        Ok(tokens)
    }
}
