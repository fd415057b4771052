//! Token lifecycle: decide whether a stored credential needs refreshing,
//! refresh it, and degrade to the stored token when that fails.
//!
//! The lifecycle runs once per config load. There is no background timer.

use chrono::{DateTime, TimeDelta, Utc};

use crate::error::{OAuthError, Result};
use crate::expiry::{TokenState, default_skew};
use crate::grant::{RefreshClient, RefreshGrant, TokenResponse};

// ============================================================================
// RefreshableCredential Trait
// ============================================================================

/// A stored credential the lifecycle can inspect and update in place.
///
/// Implemented by each on-disk shape (Codex auth file, Google OAuth file).
pub trait RefreshableCredential {
    /// Current access token, if non-empty.
    fn access_token(&self) -> Option<&str>;

    /// Refresh token, if non-empty.
    fn refresh_token(&self) -> Option<&str>;

    /// Absolute expiry, from whichever representation the shape carries.
    fn expires_at(&self) -> Option<DateTime<Utc>>;

    /// Build the refresh request for this credential.
    fn refresh_grant(&self, refresh_token: &str) -> Result<RefreshGrant>;

    /// Merge a successful refresh response into the credential.
    fn apply_refresh(&mut self, response: &TokenResponse, now: DateTime<Utc>);
}

// ============================================================================
// Resolution result
// ============================================================================

/// How the returned access token was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenOutcome {
    /// Stored token was fresh (or carried no expiry) and was used as is.
    Current,
    /// Token was refreshed; the credential was updated in memory.
    Refreshed,
    /// Refresh was needed but failed or was impossible. The stored token is
    /// returned anyway so the provider stays visible and fails loudly later.
    Stale,
}

/// An access token chosen by the lifecycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedToken {
    pub access_token: String,
    pub outcome: TokenOutcome,
}

// ============================================================================
// TokenLifecycle
// ============================================================================

/// Runs the expiry check and refresh exchange for one credential at a time.
#[derive(Debug, Clone)]
pub struct TokenLifecycle {
    client: RefreshClient,
    skew: TimeDelta,
}

impl Default for TokenLifecycle {
    fn default() -> Self {
        Self::new(RefreshClient::default())
    }
}

impl TokenLifecycle {
    pub fn new(client: RefreshClient) -> Self {
        Self {
            client,
            skew: default_skew(),
        }
    }

    /// Override the refresh skew window.
    pub fn with_skew(mut self, skew: TimeDelta) -> Self {
        self.skew = skew;
        self
    }

    pub fn client(&self) -> &RefreshClient {
        &self.client
    }

    /// Pick the access token to use, refreshing first when needed.
    ///
    /// Returns `None` only when there is no access token and no way to get
    /// one. A credential with an empty access token and a refresh token is
    /// always refreshed.
    pub fn resolve<C: RefreshableCredential>(
        &self,
        credential: &mut C,
        now: DateTime<Utc>,
    ) -> Option<ResolvedToken> {
        let state = TokenState::classify(credential.expires_at(), now, self.skew);
        let stored = credential.access_token().map(str::to_string);

        if state.needs_refresh() || stored.is_none() {
            match self.try_refresh(credential, now) {
                Ok(access_token) => {
                    tracing::info!(state = ?state, "Token refreshed successfully");
                    return Some(ResolvedToken {
                        access_token,
                        outcome: TokenOutcome::Refreshed,
                    });
                }
                Err(e) => {
                    tracing::warn!(
                        error = %e,
                        expired = state.is_expired(),
                        "Token refresh failed, keeping stored token"
                    );
                }
            }
        }

        let access_token = stored?;
        let outcome = if state.needs_refresh() {
            TokenOutcome::Stale
        } else {
            TokenOutcome::Current
        };
        Some(ResolvedToken {
            access_token,
            outcome,
        })
    }

    fn try_refresh<C: RefreshableCredential>(
        &self,
        credential: &mut C,
        now: DateTime<Utc>,
    ) -> Result<String> {
        let refresh_token = credential
            .refresh_token()
            .ok_or(OAuthError::MissingRefreshToken)?
            .to_string();
        let grant = credential.refresh_grant(&refresh_token)?;
        let response = self.client.refresh(&grant)?;
        credential.apply_refresh(&response, now);
        credential
            .access_token()
            .map(str::to_string)
            .ok_or_else(|| OAuthError::InvalidResponse("access token lost on merge".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// In-memory credential that counts grant construction.
    #[derive(Default)]
    struct FakeCredential {
        access: Option<String>,
        refresh: Option<String>,
        expires_at: Option<DateTime<Utc>>,
        token_url: String,
        grants: Cell<u32>,
    }

    impl RefreshableCredential for FakeCredential {
        fn access_token(&self) -> Option<&str> {
            self.access.as_deref()
        }

        fn refresh_token(&self) -> Option<&str> {
            self.refresh.as_deref()
        }

        fn expires_at(&self) -> Option<DateTime<Utc>> {
            self.expires_at
        }

        fn refresh_grant(&self, refresh_token: &str) -> Result<RefreshGrant> {
            self.grants.set(self.grants.get() + 1);
            Ok(RefreshGrant {
                token_url: self.token_url.clone(),
                client_id: "client".to_string(),
                client_secret: None,
                refresh_token: refresh_token.to_string(),
            })
        }

        fn apply_refresh(&mut self, response: &TokenResponse, _now: DateTime<Utc>) {
            self.access = Some(response.access_token.clone());
        }
    }

    fn unreachable_lifecycle() -> TokenLifecycle {
        TokenLifecycle::new(RefreshClient::new(std::time::Duration::from_secs(2)))
    }

    #[test]
    fn test_fresh_token_is_used_without_refresh() {
        let now = Utc::now();
        let mut cred = FakeCredential {
            access: Some("fresh".into()),
            refresh: Some("r".into()),
            expires_at: Some(now + TimeDelta::hours(1)),
            token_url: "http://127.0.0.1:1/token".into(),
            ..Default::default()
        };

        let resolved = unreachable_lifecycle().resolve(&mut cred, now).unwrap();
        assert_eq!(resolved.access_token, "fresh");
        assert_eq!(resolved.outcome, TokenOutcome::Current);
        assert_eq!(cred.grants.get(), 0);
    }

    #[test]
    fn test_unknown_expiry_is_not_refreshed() {
        let mut cred = FakeCredential {
            access: Some("opaque".into()),
            refresh: Some("r".into()),
            ..Default::default()
        };

        let resolved = unreachable_lifecycle().resolve(&mut cred, Utc::now()).unwrap();
        assert_eq!(resolved.outcome, TokenOutcome::Current);
        assert_eq!(cred.grants.get(), 0);
    }

    #[test]
    fn test_expired_without_refresh_token_is_stale() {
        let now = Utc::now();
        let mut cred = FakeCredential {
            access: Some("old".into()),
            expires_at: Some(now - TimeDelta::hours(1)),
            ..Default::default()
        };

        let resolved = unreachable_lifecycle().resolve(&mut cred, now).unwrap();
        assert_eq!(resolved.access_token, "old");
        assert_eq!(resolved.outcome, TokenOutcome::Stale);
        assert_eq!(cred.grants.get(), 0);
    }

    #[test]
    fn test_failed_refresh_returns_stored_token() {
        let now = Utc::now();
        let mut cred = FakeCredential {
            access: Some("old".into()),
            refresh: Some("r".into()),
            expires_at: Some(now + TimeDelta::seconds(30)),
            token_url: "http://127.0.0.1:1/token".into(),
            ..Default::default()
        };

        let resolved = unreachable_lifecycle().resolve(&mut cred, now).unwrap();
        assert_eq!(resolved.access_token, "old");
        assert_eq!(resolved.outcome, TokenOutcome::Stale);
        assert_eq!(cred.grants.get(), 1);
    }

    #[test]
    fn test_no_tokens_at_all() {
        let mut cred = FakeCredential::default();
        assert!(unreachable_lifecycle().resolve(&mut cred, Utc::now()).is_none());
    }
}
