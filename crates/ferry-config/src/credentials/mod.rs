//! Discovery of credentials left behind by local LLM CLIs.
//!
//! Each provider family probes a fixed, ordered list of environment
//! variables and files. Unreadable or malformed candidates count as absent;
//! discovery never fails. OAuth-backed files are refreshed through
//! [`ferry_oauth`] and rewritten in place when the token is near expiry.

mod antigravity;
mod claude;
mod codex;

use std::path::Path;

use chrono::{DateTime, Utc};
use ferry_oauth::{TokenLifecycle, TokenOutcome};
use serde::Serialize;

use crate::env::Env;
use crate::loader::LoadOptions;
use crate::source::ValueSource;

pub use codex::parse_toml_string;

/// A credential discovered from a CLI tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CliCredential {
    pub provider: String,
    #[serde(skip_serializing)]
    pub api_key: String,
    pub account_id: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
    pub source: ValueSource,
    /// The token is past (or inside the skew window of) its expiry and
    /// could not be refreshed.
    pub stale: bool,
}

impl CliCredential {
    fn new(provider: &str, api_key: impl Into<String>, source: ValueSource) -> Self {
        Self {
            provider: provider.to_string(),
            api_key: api_key.into(),
            account_id: None,
            base_url: None,
            model: None,
            source,
            stale: false,
        }
    }

    fn with_outcome(mut self, outcome: TokenOutcome) -> Self {
        self.stale = outcome == TokenOutcome::Stale;
        self
    }
}

/// One discovery pass. `None` means nothing usable was found.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct CliCredentials {
    pub codex: Option<CliCredential>,
    pub claude: Option<CliCredential>,
    pub antigravity: Option<CliCredential>,
}

impl CliCredentials {
    /// All discovered credentials, in `codex`, `antigravity`, `claude` order.
    pub fn iter(&self) -> impl Iterator<Item = &CliCredential> {
        [&self.codex, &self.antigravity, &self.claude]
            .into_iter()
            .flatten()
    }

    pub fn is_empty(&self) -> bool {
        self.iter().next().is_none()
    }
}

/// Probe every CLI credential store the options point at.
///
/// Blocking: may perform one token refresh per OAuth file.
pub fn load_cli_credentials(options: &LoadOptions) -> CliCredentials {
    discover(
        options.env(),
        options.home_dir(),
        &options.token_lifecycle(),
        Utc::now(),
    )
}

pub(crate) fn discover(
    env: &Env,
    home: Option<&Path>,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> CliCredentials {
    let creds = CliCredentials {
        codex: home.and_then(|h| codex::load(h, lifecycle, now)),
        claude: claude::load(env, home),
        antigravity: antigravity::load(env, home, lifecycle, now),
    };
    tracing::debug!(
        codex = creds.codex.is_some(),
        claude = creds.claude.is_some(),
        antigravity = creds.antigravity.is_some(),
        "CLI credential discovery finished"
    );
    creds
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_empty_home_finds_nothing() {
        let home = TempDir::new().unwrap();
        let creds = discover(
            &Env::empty(),
            Some(home.path()),
            &TokenLifecycle::default(),
            Utc::now(),
        );
        assert!(creds.is_empty());
        assert_eq!(creds, CliCredentials::default());
    }

    #[test]
    fn test_codex_round_trip() {
        let home = TempDir::new().unwrap();
        let codex = home.path().join(".codex");
        fs::create_dir_all(&codex).unwrap();
        fs::write(
            codex.join("auth.json"),
            r#"{"tokens": {"access_token": "tok-123", "account_id": "acct"}}"#,
        )
        .unwrap();
        fs::write(codex.join("config.toml"), "model = \"gpt-5-codex\"\n").unwrap();

        let creds = discover(
            &Env::empty(),
            Some(home.path()),
            &TokenLifecycle::default(),
            Utc::now(),
        );
        let codex = creds.codex.unwrap();
        assert_eq!(codex.api_key, "tok-123");
        assert_eq!(codex.account_id.as_deref(), Some("acct"));
        assert_eq!(codex.model.as_deref(), Some("gpt-5-codex"));
        assert_eq!(codex.provider, "codex");
        assert_eq!(codex.source, ValueSource::CodexCli);
        assert!(!codex.stale);
    }

    #[test]
    fn test_iteration_order_and_redaction() {
        let creds = CliCredentials {
            codex: None,
            claude: Some(CliCredential::new("anthropic", "c", ValueSource::ClaudeCli)),
            antigravity: Some(CliCredential::new("antigravity", "a", ValueSource::AntigravityCli)),
        };
        let providers: Vec<&str> = creds.iter().map(|c| c.provider.as_str()).collect();
        assert_eq!(providers, vec!["antigravity", "anthropic"]);

        let json = serde_json::to_string(&creds).unwrap();
        assert!(!json.contains("\"api_key\""));
    }
}
