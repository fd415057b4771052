//! Runtime configuration for the ferry agent runtime.
//!
//! Resolves one [`RuntimeConfig`] from four layers, each overriding the one
//! before it:
//! - built-in defaults
//! - a YAML config file (`~/.ferry/config.yaml` or `$FERRY_CONFIG_PATH`)
//! - environment variables
//! - programmatic [`Overrides`]
//!
//! Every field records which layer set it in [`Metadata`]. After layering,
//! the loader picks a provider (`auto` probes API keys and local CLI
//! credentials), backfills missing credentials and falls back to the `mock`
//! provider when nothing usable was found.
//!
//! [`RuntimeConfigCache`] and [`ConfigWatcher`] keep a hot-reloaded copy
//! for long-running processes.

pub mod credentials;
pub mod env;
pub mod error;
mod layers;
pub mod loader;
pub mod normalize;
pub mod provider;
pub mod source;
pub mod types;
pub mod watcher;

pub use credentials::{CliCredential, CliCredentials, load_cli_credentials, parse_toml_string};
pub use env::{ENV_ALIASES, Env, EnvLookup, ProcessEnv};
pub use error::{ConfigError, Result};
pub use layers::file::{CONFIG_PATH_ENV, resolve_config_path};
pub use loader::{LoadOptions, load};
pub use normalize::{normalize, normalize_stop_sequences};
pub use provider::{
    ANTHROPIC_DEFAULT_BASE_URL, ANTIGRAVITY_DEFAULT_BASE_URL, CODEX_CLI_BASE_URL,
    should_load_cli_credentials,
};
pub use source::{Field, Metadata, UnknownField, ValueSource};
pub use types::*;
pub use watcher::{
    ConfigSnapshot, ConfigWatcher, DEFAULT_DEBOUNCE, PreReloadHook, ReloadEvent,
    RuntimeConfigCache, WatcherHandle,
};
