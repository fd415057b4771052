//! OAuth token lifecycle for credentials written by local LLM CLIs.
//!
//! Reads credential files left behind by the Codex, Antigravity and Gemini
//! CLIs, refreshes them with the `refresh_token` grant when they are about
//! to expire, and rewrites them in place. A failed refresh never hides a
//! credential: the stored token is returned so the caller can surface an
//! authentication error at request time.
//!
//! # Components
//!
//! - [`jwt`]: unverified claim extraction (`exp`, `client_id`)
//! - [`expiry`]: expiry classification with a 5 minute skew
//! - [`grant`]: blocking `refresh_token` exchange
//! - [`persist`]: atomic, owner-only JSON rewrite
//! - [`lifecycle`]: the refresh-or-degrade state machine
//! - [`codex`], [`google`]: the on-disk credential shapes

pub mod codex;
pub mod error;
pub mod expiry;
pub mod google;
pub mod grant;
pub mod jwt;
pub mod lifecycle;
pub mod persist;

pub use codex::{CODEX_TOKEN_URL, CodexAuthFile, CodexToken, load_codex_token};
pub use error::{OAuthError, Result};
pub use expiry::{REFRESH_SKEW_SECS, TokenState};
pub use google::{ClientCredentials, GOOGLE_TOKEN_URL, GoogleOAuthFile, GoogleToken, load_google_token};
pub use grant::{DEFAULT_REFRESH_TIMEOUT, RefreshClient, RefreshGrant, TokenResponse};
pub use jwt::{UnverifiedClaims, decode_unverified};
pub use lifecycle::{RefreshableCredential, ResolvedToken, TokenLifecycle, TokenOutcome};
pub use persist::write_private_json;
