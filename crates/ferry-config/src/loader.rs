//! The `load` entry point.
//!
//! Resolution order (later overrides earlier):
//! 1. Compiled-in defaults
//! 2. Config file
//! 3. Environment variables
//! 4. Caller overrides
//!
//! The merged config is then normalized, CLI credentials are probed when
//! the provider needs them, `auto`/`cli` providers are resolved, known
//! providers are backfilled, and finally `mock` is chosen if no key exists.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chrono::Utc;
use ferry_oauth::{DEFAULT_REFRESH_TIMEOUT, RefreshClient, TokenLifecycle};

use crate::credentials::{CliCredentials, load_cli_credentials};
use crate::env::Env;
use crate::error::Result;
use crate::layers;
use crate::layers::file::resolve_config_path;
use crate::normalize::normalize;
use crate::provider::{
    apply_mock_fallback, backfill_credentials, resolve_auto_provider,
    should_load_cli_credentials,
};
use crate::source::Metadata;
use crate::types::{DEFAULT_ACP_HOST, DEFAULT_ACP_PORT, Overrides, RuntimeConfig};

/// Working directory used for the ACP executor inside the sandbox image.
const SANDBOX_WORKDIR: &str = "/workspace";

/// Inputs to [`load`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    env: Env,
    home_dir: Option<PathBuf>,
    config_path: Option<PathBuf>,
    overrides: Overrides,
    refresh_timeout: Duration,
    cli_credentials: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            env: Env::process(),
            home_dir: dirs::home_dir(),
            config_path: None,
            overrides: Overrides::default(),
            refresh_timeout: DEFAULT_REFRESH_TIMEOUT,
            cli_credentials: true,
        }
    }
}

impl LoadOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_env(mut self, env: Env) -> Self {
        self.env = env;
        self
    }

    /// Home directory for the default config path and CLI credential files.
    pub fn with_home_dir(mut self, home: impl Into<PathBuf>) -> Self {
        self.home_dir = Some(home.into());
        self
    }

    /// Use this config file instead of resolving one from the environment.
    pub fn with_config_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_path = Some(path.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Overrides) -> Self {
        self.overrides = overrides;
        self
    }

    /// Timeout for each OAuth refresh request.
    pub fn with_refresh_timeout(mut self, timeout: Duration) -> Self {
        self.refresh_timeout = timeout;
        self
    }

    /// Enable or disable probing CLI credential stores.
    pub fn with_cli_credentials(mut self, enabled: bool) -> Self {
        self.cli_credentials = enabled;
        self
    }

    pub fn env(&self) -> &Env {
        &self.env
    }

    pub fn home_dir(&self) -> Option<&Path> {
        self.home_dir.as_deref()
    }

    pub fn overrides(&self) -> &Overrides {
        &self.overrides
    }

    /// The config file `load` reads, if any path can be determined.
    pub fn config_path(&self) -> Option<PathBuf> {
        self.config_path
            .clone()
            .or_else(|| resolve_config_path(&self.env, self.home_dir()))
    }

    pub fn token_lifecycle(&self) -> TokenLifecycle {
        TokenLifecycle::new(RefreshClient::new(self.refresh_timeout))
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Defaults that depend on the environment
// ─────────────────────────────────────────────────────────────────────────────

fn default_acp_addr(env: &Env) -> String {
    let host = env.raw("ACP_HOST").unwrap_or_else(|| DEFAULT_ACP_HOST.to_string());
    let port = env
        .raw("ACP_PORT")
        .and_then(|p| p.parse::<u16>().ok())
        .filter(|p| *p > 0)
        .unwrap_or(DEFAULT_ACP_PORT);
    format!("http://{host}:{port}")
}

fn default_acp_cwd() -> String {
    let sandbox = Path::new(SANDBOX_WORKDIR);
    if sandbox.is_dir() {
        return SANDBOX_WORKDIR.to_string();
    }
    std::env::current_dir()
        .ok()
        .map(|d| d.display().to_string())
        .filter(|d| !d.trim().is_empty())
        .unwrap_or_else(|| SANDBOX_WORKDIR.to_string())
}

fn seed_defaults(env: &Env) -> RuntimeConfig {
    RuntimeConfig {
        acp_executor_addr: default_acp_addr(env),
        acp_executor_cwd: default_acp_cwd(),
        ..RuntimeConfig::default()
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Load
// ─────────────────────────────────────────────────────────────────────────────

/// Resolve the runtime configuration.
///
/// Only a malformed config file or an unparsable environment variable is an
/// error; credential problems surface as a stale key or the `mock`
/// provider. Blocking: may read several files and perform OAuth refreshes,
/// so async callers should run it under `spawn_blocking`.
pub fn load(options: &LoadOptions) -> Result<(RuntimeConfig, Metadata)> {
    let env = options.env();
    let mut meta = Metadata::new(Utc::now());
    let mut config = seed_defaults(env);

    if let Some(path) = options.config_path() {
        layers::file::apply(&mut config, &mut meta, &path, env)?;
    }
    layers::environment::apply(&mut config, &mut meta, env)?;
    layers::overrides::apply(&mut config, &mut meta, options.overrides());

    normalize(&mut config);

    let cli = if options.cli_credentials && should_load_cli_credentials(&config) {
        load_cli_credentials(options)
    } else {
        CliCredentials::default()
    };
    resolve_auto_provider(&mut config, &mut meta, env, &cli);
    backfill_credentials(&mut config, &mut meta, env, &cli);
    apply_mock_fallback(&mut config, &mut meta);

    tracing::debug!(
        provider = %config.llm_provider,
        model = %config.llm_model,
        api_key_source = %meta.source(crate::source::Field::ApiKey),
        "Runtime config resolved"
    );
    Ok((config, meta))
}
