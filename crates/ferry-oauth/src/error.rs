//! Error types for the token lifecycle.

/// Result type alias for this crate.
pub type Result<T> = std::result::Result<T, OAuthError>;

/// Errors that can occur while refreshing or persisting OAuth credentials.
///
/// None of these escape config resolution: callers log them and fall back
/// to the last known access token.
#[derive(Debug, thiserror::Error)]
pub enum OAuthError {
    /// Network/HTTP error, including timeouts.
    #[error("Network error: {0}")]
    Network(String),

    /// Token endpoint answered with a non-success status.
    #[error("Token endpoint returned {status}: {body}")]
    Backend { status: u16, body: String },

    /// Token endpoint answered 2xx but the body was unusable.
    #[error("Invalid token response: {0}")]
    InvalidResponse(String),

    /// No client id in the credential file and no configured default.
    #[error("No OAuth client id available for refresh")]
    MissingClientId,

    /// Refresh was needed but the credential has no refresh token.
    #[error("No refresh token available")]
    MissingRefreshToken,

    /// Failed to write the credential file back to disk.
    #[error("Failed to write '{path}': {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<reqwest::Error> for OAuthError {
    fn from(e: reqwest::Error) -> Self {
        OAuthError::Network(e.to_string())
    }
}

impl From<serde_json::Error> for OAuthError {
    fn from(e: serde_json::Error) -> Self {
        OAuthError::Serialization(e.to_string())
    }
}
