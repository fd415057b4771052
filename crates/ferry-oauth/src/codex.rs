//! Codex CLI auth file (`~/.codex/auth.json`).
//!
//! The access token is a JWT. Its expiry and OAuth client id are read from
//! unverified claims (see [`crate::jwt`]); there are no sibling fields for
//! them in the file.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OAuthError, Result};
use crate::grant::{RefreshGrant, TokenResponse};
use crate::jwt::decode_unverified;
use crate::lifecycle::{RefreshableCredential, TokenLifecycle, TokenOutcome};
use crate::persist::write_private_json;

/// Default token endpoint for Codex refreshes.
pub const CODEX_TOKEN_URL: &str = "https://auth.openai.com/oauth/token";

/// On-disk shape of the Codex auth file. Unknown keys are kept on rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodexAuthFile {
    #[serde(default)]
    pub tokens: CodexTokens,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_refresh: Option<String>,
    /// Token endpoint override, mostly useful for testing.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_url: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CodexTokens {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id_token: Option<String>,
    #[serde(default)]
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl CodexAuthFile {
    pub fn account_id(&self) -> Option<&str> {
        trimmed(self.tokens.account_id.as_deref())
    }
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl RefreshableCredential for CodexAuthFile {
    fn access_token(&self) -> Option<&str> {
        trimmed(Some(&self.tokens.access_token))
    }

    fn refresh_token(&self) -> Option<&str> {
        trimmed(self.tokens.refresh_token.as_deref())
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        decode_unverified(&self.tokens.access_token)?.expires_at()
    }

    fn refresh_grant(&self, refresh_token: &str) -> Result<RefreshGrant> {
        let client_id = decode_unverified(&self.tokens.access_token)
            .and_then(|claims| claims.client_id)
            .ok_or(OAuthError::MissingClientId)?;
        let token_url = trimmed(self.token_url.as_deref())
            .unwrap_or(CODEX_TOKEN_URL)
            .to_string();

        Ok(RefreshGrant {
            token_url,
            client_id,
            client_secret: None,
            refresh_token: refresh_token.to_string(),
        })
    }

    fn apply_refresh(&mut self, response: &TokenResponse, now: DateTime<Utc>) {
        self.tokens.access_token = response.access_token.trim().to_string();
        if let Some(refresh) = response.rotated_refresh_token() {
            self.tokens.refresh_token = Some(refresh.to_string());
        }
        if let Some(id_token) = response.id_token() {
            self.tokens.id_token = Some(id_token.to_string());
        }
        self.last_refresh = Some(now.to_rfc3339_opts(SecondsFormat::Nanos, true));
    }
}

/// Access token read from a Codex auth file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodexToken {
    pub access_token: String,
    pub account_id: Option<String>,
    pub outcome: TokenOutcome,
}

/// Read the Codex auth file at `path`, refreshing and rewriting it if the
/// access token is close to expiry.
///
/// Missing or malformed files and files without an access token yield
/// `None`. Refresh failures keep the stored token.
pub fn load_codex_token(
    path: &Path,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> Option<CodexToken> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Codex auth file not readable");
            return None;
        }
    };
    let mut file: CodexAuthFile = match serde_json::from_slice(&data) {
        Ok(file) => file,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "Codex auth file is not valid JSON");
            return None;
        }
    };
    // A refresh token alone is not enough for Codex: the client id lives in
    // the access token's claims.
    file.access_token()?;

    let resolved = lifecycle.resolve(&mut file, now)?;
    if resolved.outcome == TokenOutcome::Refreshed {
        match write_private_json(path, &file, true) {
            Ok(()) => tracing::info!(path = %path.display(), "Codex tokens saved"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save refreshed Codex tokens"),
        }
    }

    Some(CodexToken {
        access_token: resolved.access_token,
        account_id: file.account_id().map(str::to_string),
        outcome: resolved.outcome,
    })
}
