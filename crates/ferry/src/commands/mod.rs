//! CLI command handlers.

pub mod credentials;
pub mod path;
pub mod show;
pub mod watch;

use std::path::PathBuf;

use anyhow::Result;
use ferry_config::{LoadOptions, Metadata, Overrides, RuntimeConfig};

/// Shared context for all commands.
#[derive(Debug, Clone)]
pub struct Context {
    /// Output as JSON for scripting.
    pub json_output: bool,
    /// Verbose output enabled.
    pub verbose: bool,
    /// `--config`, beating `FERRY_CONFIG_PATH`.
    pub config_path: Option<PathBuf>,
    pub provider: Option<String>,
    pub model: Option<String>,
}

impl Context {
    /// Load options for the process environment plus the CLI flags.
    pub fn load_options(&self) -> LoadOptions {
        let overrides = Overrides {
            llm_provider: self.provider.clone(),
            llm_model: self.model.clone(),
            ..Overrides::default()
        };
        let options = LoadOptions::new().with_overrides(overrides);
        match &self.config_path {
            Some(path) => options.with_config_path(path),
            None => options,
        }
    }

    /// Run `load` off the async runtime; it may block on token refreshes.
    pub async fn load(&self) -> Result<(RuntimeConfig, Metadata)> {
        let options = self.load_options();
        let loaded = tokio::task::spawn_blocking(move || ferry_config::load(&options)).await??;
        Ok(loaded)
    }
}

/// Show enough of a secret to recognise it.
pub fn redact(secret: &str) -> String {
    let count = secret.chars().count();
    if count == 0 {
        return String::new();
    }
    if count <= 8 {
        return "*".repeat(count);
    }
    let head: String = secret.chars().take(4).collect();
    format!("{head}…({count} chars)")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_redact() {
        assert_eq!(redact(""), "");
        assert_eq!(redact("short"), "*****");
        assert_eq!(redact("sk-abcdefghijkl"), "sk-a…(15 chars)");
    }

    #[test]
    fn test_flags_become_overrides() {
        let ctx = Context {
            json_output: false,
            verbose: false,
            config_path: Some(PathBuf::from("/tmp/ferry-test/config.yaml")),
            provider: Some("anthropic".to_string()),
            model: None,
        };
        let options = ctx.load_options();
        assert_eq!(options.overrides().llm_provider.as_deref(), Some("anthropic"));
        assert!(options.overrides().llm_model.is_none());
        assert_eq!(
            options.config_path(),
            Some(PathBuf::from("/tmp/ferry-test/config.yaml"))
        );
    }
}
