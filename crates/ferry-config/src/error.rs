//! Configuration error types.

/// Result type alias for config operations.
pub type Result<T> = std::result::Result<T, ConfigError>;

/// Errors that abort config resolution.
///
/// Credential discovery never produces one of these: unreadable credential
/// files count as absent and failed refreshes fall back to the stored token.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read a config file.
    #[error("failed to read config file '{path}': {source}")]
    ReadFile {
        path: String,
        source: std::io::Error,
    },

    /// Config file is not valid YAML for the runtime schema.
    #[error("failed to parse config file '{path}': {source}")]
    ParseFile {
        path: String,
        source: serde_yaml::Error,
    },

    /// An environment variable is set but does not parse as its type.
    #[error("invalid value for {var} ({value:?}): {reason}")]
    InvalidEnv {
        var: String,
        value: String,
        reason: String,
    },

    /// File watcher could not be started.
    #[error("failed to watch config: {0}")]
    Watch(String),
}
