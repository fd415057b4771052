use std::path::{Path, PathBuf};

use serde_json::Value;

use super::CliCredential;
use crate::env::Env;
use crate::source::ValueSource;

/// Checked in order; the first one set wins without touching the disk.
pub(crate) const CLAUDE_TOKEN_ENVS: [&str; 2] = ["CLAUDE_CODE_OAUTH_TOKEN", "ANTHROPIC_AUTH_TOKEN"];

const TOKEN_KEYS: [&str; 3] = ["access_token", "token", "api_key"];

fn candidate_paths(home: &Path) -> [PathBuf; 4] {
    let claude = home.join(".claude");
    let config = home.join(".config").join("claude");
    [
        claude.join(".credentials.json"),
        claude.join("credentials.json"),
        config.join(".credentials.json"),
        config.join("credentials.json"),
    ]
}

/// First non-blank string under one of `keys` in a JSON object.
pub(super) fn first_string(object: &serde_json::Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| {
        let value = object.get(*key)?.as_str()?.trim();
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn token_from_file(path: &Path) -> Option<String> {
    let data = std::fs::read(path).ok()?;
    let value: Value = serde_json::from_slice(&data).ok()?;
    first_string(value.as_object()?, &TOKEN_KEYS)
}

pub(super) fn load(env: &Env, home: Option<&Path>) -> Option<CliCredential> {
    if let Some(token) = CLAUDE_TOKEN_ENVS.iter().find_map(|var| env.raw(var)) {
        tracing::debug!("Found Claude token in environment");
        return Some(CliCredential::new("anthropic", token, ValueSource::ClaudeCli));
    }

    candidate_paths(home?).iter().find_map(|path| {
        let token = token_from_file(path)?;
        tracing::debug!(path = %path.display(), "Found Claude CLI credential");
        Some(CliCredential::new("anthropic", token, ValueSource::ClaudeCli))
    })
}
