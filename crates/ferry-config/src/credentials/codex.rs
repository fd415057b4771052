use std::path::Path;

use chrono::{DateTime, Utc};
use ferry_oauth::{TokenLifecycle, load_codex_token};

use super::CliCredential;
use crate::provider::CODEX_CLI_BASE_URL;
use crate::source::ValueSource;

/// Find the first `key = "value"` assignment in a TOML-like file.
///
/// Not a TOML parser: table headers and comment lines are skipped, a
/// trailing `# comment` is dropped, and surrounding quotes are stripped.
/// Blank values are ignored and the scan continues.
pub fn parse_toml_string(contents: &str, key: &str) -> Option<String> {
    contents.lines().find_map(|line| {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('[') {
            return None;
        }
        let (name, value) = line.split_once('=')?;
        if name.trim() != key {
            return None;
        }
        let value = match value.find('#') {
            Some(idx) => &value[..idx],
            None => value,
        };
        let value = value.trim().trim_matches(|c| c == '"' || c == '\'');
        (!value.is_empty()).then(|| value.to_string())
    })
}

fn load_model(home: &Path) -> Option<String> {
    let path = home.join(".codex").join("config.toml");
    let contents = std::fs::read_to_string(&path).ok()?;
    parse_toml_string(&contents, "model")
}

pub(super) fn load(
    home: &Path,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> Option<CliCredential> {
    let path = home.join(".codex").join("auth.json");
    let token = load_codex_token(&path, lifecycle, now)?;
    tracing::debug!(path = %path.display(), outcome = ?token.outcome, "Found Codex CLI credential");

    let mut cred = CliCredential::new("codex", token.access_token, ValueSource::CodexCli)
        .with_outcome(token.outcome);
    cred.account_id = token.account_id;
    cred.base_url = Some(CODEX_CLI_BASE_URL.to_string());
    cred.model = load_model(home);
    Some(cred)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_parse_toml_string() {
        let contents = r#"
# model = "commented"
[profiles.fast]
model_provider = "openai"
model = "gpt-5-codex"   # trailing
model = "second"
"#;
        assert_eq!(parse_toml_string(contents, "model").as_deref(), Some("gpt-5-codex"));
        assert_eq!(parse_toml_string(contents, "model_provider").as_deref(), Some("openai"));
        assert_eq!(parse_toml_string(contents, "missing"), None);
        assert_eq!(parse_toml_string("model = ''\nmodel = 'x'", "model").as_deref(), Some("x"));
    }

    #[test]
    fn test_requires_access_token() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".codex");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("auth.json"), r#"{"tokens": {"refresh_token": "r"}}"#).unwrap();
        assert!(load(home.path(), &TokenLifecycle::default(), Utc::now()).is_none());
    }

    #[test]
    fn test_model_file_is_optional() {
        let home = TempDir::new().unwrap();
        let dir = home.path().join(".codex");
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join("auth.json"), r#"{"tokens": {"access_token": "tok"}}"#).unwrap();

        let cred = load(home.path(), &TokenLifecycle::default(), Utc::now()).unwrap();
        assert_eq!(cred.api_key, "tok");
        assert_eq!(cred.model, None);
        assert_eq!(cred.base_url.as_deref(), Some(CODEX_CLI_BASE_URL));
    }
}
