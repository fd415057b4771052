//! Antigravity / Gemini credentials.
//!
//! Google OAuth files written by the Antigravity and Gemini CLIs are tried
//! first, then auth files managed by multi-provider CLIs at XDG locations.

use std::collections::HashSet;
use std::path::{Component, Path, PathBuf};

use chrono::{DateTime, Utc};
use ferry_oauth::{ClientCredentials, TokenLifecycle, load_google_token};
use serde_json::{Map, Value};

use super::CliCredential;
use super::claude::first_string;
use crate::env::Env;
use crate::provider::ANTIGRAVITY_DEFAULT_BASE_URL;
use crate::source::ValueSource;

/// Explicit auth file path, checked before the XDG locations.
pub(crate) const CLI_AUTH_PATH_ENV: &str = "FERRY_CLI_AUTH_PATH";

struct OAuthSource {
    dir: &'static str,
    client_id_env: &'static str,
    client_secret_env: &'static str,
    source: ValueSource,
}

const OAUTH_SOURCES: [OAuthSource; 2] = [
    OAuthSource {
        dir: ".antigravity",
        client_id_env: "ANTIGRAVITY_OAUTH_CLIENT_ID",
        client_secret_env: "ANTIGRAVITY_OAUTH_CLIENT_SECRET",
        source: ValueSource::AntigravityCli,
    },
    OAuthSource {
        dir: ".gemini",
        client_id_env: "GEMINI_OAUTH_CLIENT_ID",
        client_secret_env: "GEMINI_OAUTH_CLIENT_SECRET",
        source: ValueSource::AntigravityIde,
    },
];

const PROVIDER_NAMES: [&str; 2] = ["antigravity", "google"];
const CONTAINER_KEYS: [&str; 3] = ["providers", "accounts", "auths"];
const TOKEN_KEYS: [&str; 4] = ["api_key", "access_token", "access", "token"];
const BASE_URL_KEYS: [&str; 4] = ["base_url", "baseUrl", "endpoint", "api_base_url"];

pub(super) fn load(
    env: &Env,
    home: Option<&Path>,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> Option<CliCredential> {
    if let Some(cred) = home.and_then(|h| load_oauth(env, h, lifecycle, now)) {
        return Some(cred);
    }
    cli_auth_paths(env, home).iter().find_map(|path| {
        let cred = load_cli_auth(path)?;
        tracing::debug!(path = %path.display(), "Found Antigravity credential in CLI auth file");
        Some(cred)
    })
}

fn load_oauth(
    env: &Env,
    home: &Path,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> Option<CliCredential> {
    OAUTH_SOURCES.iter().find_map(|src| {
        let path = home.join(src.dir).join("oauth_creds.json");
        let client = ClientCredentials {
            client_id: env.raw(src.client_id_env),
            client_secret: env.raw(src.client_secret_env),
        };
        let token = load_google_token(&path, &client, lifecycle, now)?;
        tracing::debug!(path = %path.display(), outcome = ?token.outcome, "Found Google OAuth credential");

        let mut cred = CliCredential::new("antigravity", token.access_token, src.source)
            .with_outcome(token.outcome);
        cred.base_url = Some(ANTIGRAVITY_DEFAULT_BASE_URL.to_string());
        Some(cred)
    })
}

// ─────────────────────────────────────────────────────────────────────────────
// CLI-managed auth files
// ─────────────────────────────────────────────────────────────────────────────

/// Lexically clean a path: drop `.` components and fold `..` where possible.
fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other),
        }
    }
    out
}

/// Candidate auth files in priority order, cleaned and deduplicated.
pub(crate) fn cli_auth_paths(env: &Env, home: Option<&Path>) -> Vec<PathBuf> {
    let mut paths = Vec::new();
    if let Some(explicit) = env.raw(CLI_AUTH_PATH_ENV) {
        paths.push(PathBuf::from(explicit));
    }

    let data_home = env
        .raw("XDG_DATA_HOME")
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".local").join("share")));
    let config_home = env
        .raw("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .or_else(|| home.map(|h| h.join(".config")));
    paths.extend(data_home.map(|d| d.join("opencode").join("auth.json")));
    paths.extend(config_home.map(|d| d.join("opencode").join("auth.json")));
    if let Some(home) = home {
        paths.push(
            home.join("Library")
                .join("Application Support")
                .join("opencode")
                .join("auth.json"),
        );
    }

    let mut seen = HashSet::new();
    paths
        .iter()
        .map(PathBuf::as_path)
        .map(clean)
        .filter(|p| seen.insert(p.clone()))
        .collect()
}

fn load_cli_auth(path: &Path) -> Option<CliCredential> {
    let data = std::fs::read(path).ok()?;
    let (token, base_url, model) = parse_cli_auth(&data)?;
    let mut cred = CliCredential::new("antigravity", token, ValueSource::AntigravityCli);
    cred.base_url = base_url;
    cred.model = model;
    Some(cred)
}

type TokenFields = (String, Option<String>, Option<String>);

fn token_fields(object: &Map<String, Value>) -> Option<TokenFields> {
    let token = first_string(object, &TOKEN_KEYS)?;
    Some((
        token,
        first_string(object, &BASE_URL_KEYS),
        first_string(object, &["model"]),
    ))
}

/// Pull a token out of an auth file of unknown shape.
///
/// Looks for a `providers`/`accounts`/`auths` block keyed by `antigravity`
/// or `google`, then for a top-level `provider` naming one of those.
fn parse_cli_auth(data: &[u8]) -> Option<TokenFields> {
    let value: Value = serde_json::from_slice(data).ok()?;
    let root = value.as_object()?;

    for provider in PROVIDER_NAMES {
        let block = CONTAINER_KEYS
            .iter()
            .find_map(|key| root.get(*key)?.as_object()?.get(provider)?.as_object());
        if let Some(fields) = block.and_then(token_fields) {
            return Some(fields);
        }
    }

    let provider = root.get("provider")?.as_str()?.trim().to_ascii_lowercase();
    if PROVIDER_NAMES.contains(&provider.as_str()) {
        token_fields(root)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write_json(path: &Path, value: &Value) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, serde_json::to_vec(value).unwrap()).unwrap();
    }

    #[test]
    fn test_parse_nested_provider_block() {
        let data = json!({
            "providers": {
                "openai": {"api_key": "nope"},
                "google": {"access": "g-tok", "baseUrl": "https://g.example", "model": "gemini-3"}
            }
        });
        let (token, base, model) = parse_cli_auth(data.to_string().as_bytes()).unwrap();
        assert_eq!(token, "g-tok");
        assert_eq!(base.as_deref(), Some("https://g.example"));
        assert_eq!(model.as_deref(), Some("gemini-3"));
    }

    #[test]
    fn test_antigravity_block_beats_google() {
        let data = json!({
            "auths": {"google": {"token": "g"}},
            "accounts": {"antigravity": {"api_key": "a"}}
        });
        let (token, _, _) = parse_cli_auth(data.to_string().as_bytes()).unwrap();
        assert_eq!(token, "a");
    }

    #[test]
    fn test_parse_top_level_provider() {
        let data = json!({"provider": " Google ", "access_token": "tok", "endpoint": "https://e"});
        let (token, base, model) = parse_cli_auth(data.to_string().as_bytes()).unwrap();
        assert_eq!(token, "tok");
        assert_eq!(base.as_deref(), Some("https://e"));
        assert_eq!(model, None);

        let other = json!({"provider": "openai", "access_token": "tok"});
        assert!(parse_cli_auth(other.to_string().as_bytes()).is_none());
        assert!(parse_cli_auth(b"[1, 2]").is_none());
        assert!(parse_cli_auth(b"{").is_none());
    }

    #[test]
    fn test_cli_auth_paths_order_and_dedup() {
        let env = Env::from_pairs([
            ("FERRY_CLI_AUTH_PATH", "/data/./opencode/auth.json"),
            ("XDG_DATA_HOME", "/data"),
            ("XDG_CONFIG_HOME", "/cfg/sub/.."),
        ]);
        let paths = cli_auth_paths(&env, Some(Path::new("/home/me")));
        assert_eq!(
            paths,
            vec![
                PathBuf::from("/data/opencode/auth.json"),
                PathBuf::from("/cfg/opencode/auth.json"),
                PathBuf::from("/home/me/Library/Application Support/opencode/auth.json"),
            ]
        );

        let paths = cli_auth_paths(&Env::empty(), Some(Path::new("/home/me")));
        assert_eq!(paths[0], PathBuf::from("/home/me/.local/share/opencode/auth.json"));
        assert_eq!(paths[1], PathBuf::from("/home/me/.config/opencode/auth.json"));

        assert!(cli_auth_paths(&Env::empty(), None).is_empty());
    }

    #[test]
    fn test_cli_auth_fallback() {
        let home = TempDir::new().unwrap();
        let data = home.path().join("xdg-data");
        write_json(
            &data.join("opencode").join("auth.json"),
            &json!({"providers": {"antigravity": {"api_key": "cli-key", "model": "m"}}}),
        );
        let env = Env::from_pairs([("XDG_DATA_HOME", data.to_str().unwrap())]);

        let cred = load(&env, Some(home.path()), &TokenLifecycle::default(), Utc::now()).unwrap();
        assert_eq!(cred.api_key, "cli-key");
        assert_eq!(cred.model.as_deref(), Some("m"));
        assert_eq!(cred.source, ValueSource::AntigravityCli);
        assert_eq!(cred.base_url, None);
    }

    #[test]
    fn test_gemini_file_is_ide_source() {
        let home = TempDir::new().unwrap();
        let expiry = (Utc::now() + chrono::TimeDelta::hours(1)).timestamp_millis();
        write_json(
            &home.path().join(".gemini").join("oauth_creds.json"),
            &json!({"access_token": "ide-tok", "refresh_token": "r", "expiry_date": expiry}),
        );

        let cred = load(
            &Env::empty(),
            Some(home.path()),
            &TokenLifecycle::default(),
            Utc::now(),
        )
        .unwrap();
        assert_eq!(cred.api_key, "ide-tok");
        assert_eq!(cred.source, ValueSource::AntigravityIde);
        assert_eq!(cred.base_url.as_deref(), Some(ANTIGRAVITY_DEFAULT_BASE_URL));
        assert!(!cred.stale);
    }

    fn expired_file(home: &Path, token_uri: &str) -> PathBuf {
        let path = home.join(".antigravity").join("oauth_creds.json");
        let expiry = (Utc::now() - chrono::TimeDelta::hours(1)).timestamp_millis();
        write_json(
            &path,
            &json!({
                "access_token": "old-tok",
                "refresh_token": "refresh-1",
                "expiry_date": expiry,
                "token_uri": token_uri,
                "client_id": "cid",
                "client_secret": "secret",
            }),
        );
        path
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_success_rewrites_file() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("grant_type=refresh_token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-tok",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let home = TempDir::new().unwrap();
        let path = expired_file(home.path(), &format!("{}/token", server.uri()));
        let home_path = home.path().to_path_buf();

        let cred = tokio::task::spawn_blocking(move || {
            load(&Env::empty(), Some(&home_path), &TokenLifecycle::default(), Utc::now())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(cred.api_key, "new-tok");
        assert_eq!(cred.provider, "antigravity");
        assert!(!cred.stale);

        let saved: Value = serde_json::from_slice(&fs::read(&path).unwrap()).unwrap();
        assert_eq!(saved["access_token"], "new-tok");
        assert_eq!(saved["refresh_token"], "refresh-1");
        assert!(saved["expiry_date"].as_i64().unwrap() > Utc::now().timestamp_millis());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_failure_returns_stale_token() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .mount(&server)
            .await;

        let home = TempDir::new().unwrap();
        let path = expired_file(home.path(), &format!("{}/token", server.uri()));
        let before = fs::read(&path).unwrap();
        let home_path = home.path().to_path_buf();

        let cred = tokio::task::spawn_blocking(move || {
            load(&Env::empty(), Some(&home_path), &TokenLifecycle::default(), Utc::now())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(cred.api_key, "old-tok");
        assert_eq!(cred.provider, "antigravity");
        assert_eq!(cred.source, ValueSource::AntigravityCli);
        assert!(cred.stale);
        assert_eq!(fs::read(&path).unwrap(), before);
    }
}
