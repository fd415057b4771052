//! Google-style OAuth credential files, as written by the Antigravity and
//! Gemini CLIs (`oauth_creds.json`).
//!
//! A file holds one credential object or a list of them; the first entry
//! with an access or refresh token is used. Expiry can be stored as an
//! RFC3339 string (`expire`), epoch milliseconds (`expiry_date`), or a
//! `timestamp` (ms) plus `expires_in` (s) pair, checked in that order.

use std::path::Path;

use chrono::{DateTime, SecondsFormat, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::{OAuthError, Result};
use crate::grant::{RefreshGrant, TokenResponse};
use crate::lifecycle::{RefreshableCredential, TokenLifecycle, TokenOutcome};
use crate::persist::write_private_json;

/// Default token endpoint for Google OAuth refreshes.
pub const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";

/// One credential entry. Unknown keys are kept on rewrite.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct GoogleCredential {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub access_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    /// Absolute expiry, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<i64>,
    /// Lifetime in seconds, relative to `timestamp`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires_in: Option<i64>,
    /// Issue time, epoch milliseconds.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<i64>,
    /// Absolute expiry, RFC3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expire: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_uri: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub client_secret: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

fn trimmed(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|s| !s.is_empty())
}

impl GoogleCredential {
    fn has_token(&self) -> bool {
        trimmed(self.access_token.as_deref()).is_some()
            || trimmed(self.refresh_token.as_deref()).is_some()
    }

    /// Expiry from the first representation present.
    pub fn expiry(&self) -> Option<DateTime<Utc>> {
        if let Some(expire) = trimmed(self.expire.as_deref()) {
            if let Ok(parsed) = DateTime::parse_from_rfc3339(expire) {
                return Some(parsed.with_timezone(&Utc));
            }
        }
        if let Some(ms) = self.expiry_date.filter(|ms| *ms > 0) {
            return DateTime::from_timestamp_millis(ms);
        }
        match (self.timestamp, self.expires_in) {
            (Some(issued), Some(secs)) if issued > 0 && secs > 0 => {
                DateTime::from_timestamp_millis(issued).map(|at| at + TimeDelta::seconds(secs))
            }
            _ => None,
        }
    }
}

/// Client id/secret to fall back on when the file does not carry them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClientCredentials {
    pub client_id: Option<String>,
    pub client_secret: Option<String>,
}

/// A credential paired with the fallback client for its path.
struct WithClient<'a> {
    credential: &'a mut GoogleCredential,
    fallback: &'a ClientCredentials,
}

impl RefreshableCredential for WithClient<'_> {
    fn access_token(&self) -> Option<&str> {
        trimmed(self.credential.access_token.as_deref())
    }

    fn refresh_token(&self) -> Option<&str> {
        trimmed(self.credential.refresh_token.as_deref())
    }

    fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.credential.expiry()
    }

    fn refresh_grant(&self, refresh_token: &str) -> Result<RefreshGrant> {
        let client_id = trimmed(self.credential.client_id.as_deref())
            .or(trimmed(self.fallback.client_id.as_deref()))
            .ok_or(OAuthError::MissingClientId)?;
        let client_secret = trimmed(self.credential.client_secret.as_deref())
            .or(trimmed(self.fallback.client_secret.as_deref()));
        let token_url = trimmed(self.credential.token_uri.as_deref()).unwrap_or(GOOGLE_TOKEN_URL);

        Ok(RefreshGrant {
            token_url: token_url.to_string(),
            client_id: client_id.to_string(),
            client_secret: client_secret.map(str::to_string),
            refresh_token: refresh_token.to_string(),
        })
    }

    fn apply_refresh(&mut self, response: &TokenResponse, now: DateTime<Utc>) {
        let cred = &mut *self.credential;
        cred.access_token = Some(response.access_token.trim().to_string());
        if let Some(refresh) = response.rotated_refresh_token() {
            cred.refresh_token = Some(refresh.to_string());
        }
        if let Some(secs) = response.expires_in.filter(|secs| *secs > 0) {
            let expires_at = now + TimeDelta::seconds(secs);
            cred.expires_in = Some(secs);
            cred.timestamp = Some(now.timestamp_millis());
            cred.expiry_date = Some(expires_at.timestamp_millis());
            cred.expire = Some(expires_at.to_rfc3339_opts(SecondsFormat::Secs, true));
        }
        if let Some(token_type) = response.token_type() {
            cred.token_type = Some(token_type.to_string());
        }
    }
}

/// A parsed credential file, remembering where the chosen entry sits so
/// that a rewrite keeps the object-or-list shape.
#[derive(Debug, Clone)]
pub struct GoogleOAuthFile {
    document: Value,
    index: Option<usize>,
    pub credential: GoogleCredential,
}

impl GoogleOAuthFile {
    /// Parse a single object or a list; `None` if no entry has a token.
    pub fn parse(data: &[u8]) -> Option<Self> {
        let document: Value = serde_json::from_slice(data).ok()?;
        let (index, credential) = match &document {
            Value::Object(_) => {
                let credential: GoogleCredential = serde_json::from_value(document.clone()).ok()?;
                (None, credential)
            }
            Value::Array(items) => items.iter().enumerate().find_map(|(i, item)| {
                serde_json::from_value::<GoogleCredential>(item.clone())
                    .ok()
                    .filter(GoogleCredential::has_token)
                    .map(|credential| (Some(i), credential))
            })?,
            _ => return None,
        };
        if !credential.has_token() {
            return None;
        }
        Some(Self {
            document,
            index,
            credential,
        })
    }

    /// The full document with the chosen entry replaced by `credential`.
    pub fn to_document(&self) -> Result<Value> {
        let entry = serde_json::to_value(&self.credential)?;
        let mut document = self.document.clone();
        match (self.index, &mut document) {
            (Some(i), Value::Array(items)) if i < items.len() => items[i] = entry,
            _ => document = entry,
        }
        Ok(document)
    }
}

/// Access token read from a Google-style OAuth file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoogleToken {
    pub access_token: String,
    pub outcome: TokenOutcome,
}

/// Read the OAuth file at `path`, refreshing and rewriting it when the
/// token is expired or about to expire.
///
/// `fallback` supplies the OAuth client when the file has none; without
/// either, refresh fails and the stored token is returned.
pub fn load_google_token(
    path: &Path,
    fallback: &ClientCredentials,
    lifecycle: &TokenLifecycle,
    now: DateTime<Utc>,
) -> Option<GoogleToken> {
    let data = match std::fs::read(path) {
        Ok(data) => data,
        Err(e) => {
            tracing::debug!(path = %path.display(), error = %e, "OAuth credential file not readable");
            return None;
        }
    };
    let Some(mut file) = GoogleOAuthFile::parse(&data) else {
        tracing::debug!(path = %path.display(), "OAuth credential file has no usable entry");
        return None;
    };

    let resolved = {
        let mut entry = WithClient {
            credential: &mut file.credential,
            fallback,
        };
        lifecycle.resolve(&mut entry, now)?
    };

    if resolved.outcome == TokenOutcome::Refreshed {
        let saved = file
            .to_document()
            .and_then(|doc| write_private_json(path, &doc, false));
        match saved {
            Ok(()) => tracing::info!(path = %path.display(), "OAuth tokens saved"),
            Err(e) => tracing::warn!(path = %path.display(), error = %e, "Failed to save refreshed OAuth tokens"),
        }
    }

    Some(GoogleToken {
        access_token: resolved.access_token,
        outcome: resolved.outcome,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tempfile::TempDir;
    use wiremock::matchers::{body_string_contains, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn write(dir: &Path, doc: &Value) -> std::path::PathBuf {
        let path = dir.join("oauth_creds.json");
        std::fs::write(&path, serde_json::to_vec(doc).unwrap()).unwrap();
        path
    }

    fn client(id: &str, secret: &str) -> ClientCredentials {
        ClientCredentials {
            client_id: Some(id.to_string()),
            client_secret: Some(secret.to_string()),
        }
    }

    #[test]
    fn test_expiry_precedence() {
        let now = Utc::now();
        let mut cred = GoogleCredential {
            expire: Some("2030-01-01T00:00:00Z".into()),
            expiry_date: Some(1_000),
            ..Default::default()
        };
        assert_eq!(cred.expiry().unwrap().to_rfc3339(), "2030-01-01T00:00:00+00:00");

        cred.expire = Some("garbage".into());
        assert_eq!(cred.expiry().unwrap().timestamp_millis(), 1_000);

        cred.expiry_date = None;
        cred.timestamp = Some(now.timestamp_millis());
        cred.expires_in = Some(60);
        assert_eq!(
            cred.expiry().unwrap().timestamp_millis(),
            now.timestamp_millis() + 60_000
        );

        cred.expires_in = None;
        assert!(cred.expiry().is_none());
    }

    #[test]
    fn test_parse_object_and_list() {
        assert!(GoogleOAuthFile::parse(br#"{"access_token": "a"}"#).is_some());
        assert!(GoogleOAuthFile::parse(br#"{"refresh_token": "r"}"#).is_some());
        assert!(GoogleOAuthFile::parse(br#"{"scope": "x"}"#).is_none());
        assert!(GoogleOAuthFile::parse(b"42").is_none());
        assert!(GoogleOAuthFile::parse(b"not json").is_none());

        let file = GoogleOAuthFile::parse(
            br#"[{"scope": "empty"}, {"access_token": "second"}, {"access_token": "third"}]"#,
        )
        .unwrap();
        assert_eq!(file.credential.access_token.as_deref(), Some("second"));
        assert_eq!(file.index, Some(1));
    }

    #[test]
    fn test_fresh_token_no_http() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write(
            dir.path(),
            &json!({
                "access_token": "fresh",
                "refresh_token": "r",
                "expiry_date": (now + TimeDelta::hours(1)).timestamp_millis(),
                "token_uri": "http://127.0.0.1:1/token"
            }),
        );

        let token = load_google_token(&path, &client("id", "s"), &TokenLifecycle::default(), now).unwrap();
        assert_eq!(token.access_token, "fresh");
        assert_eq!(token.outcome, TokenOutcome::Current);
    }

    #[test]
    fn test_expired_without_client_returns_stale() {
        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write(
            dir.path(),
            &json!({
                "access_token": "old",
                "refresh_token": "r",
                "expiry_date": (now - TimeDelta::hours(1)).timestamp_millis()
            }),
        );

        let token = load_google_token(
            &path,
            &ClientCredentials::default(),
            &TokenLifecycle::default(),
            now,
        )
        .unwrap();
        assert_eq!(token.access_token, "old");
        assert_eq!(token.outcome, TokenOutcome::Stale);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_success_rewrites_list_entry() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("client_id=env-id"))
            .and(body_string_contains("client_secret=env-secret"))
            .and(body_string_contains("refresh_token=r-old"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "new-access",
                "expires_in": 3600,
                "token_type": "Bearer"
            })))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write(
            dir.path(),
            &json!([
                {"label": "unused"},
                {
                    "access_token": "old-access",
                    "refresh_token": "r-old",
                    "expiry_date": (now - TimeDelta::minutes(10)).timestamp_millis(),
                    "token_uri": server.uri(),
                    "custom": "kept"
                }
            ]),
        );

        let read_path = path.clone();
        let token = tokio::task::spawn_blocking(move || {
            load_google_token(
                &read_path,
                &client("env-id", "env-secret"),
                &TokenLifecycle::default(),
                now,
            )
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(token.access_token, "new-access");
        assert_eq!(token.outcome, TokenOutcome::Refreshed);

        let saved: Value = serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        let items = saved.as_array().unwrap();
        assert_eq!(items.len(), 2);
        assert_eq!(items[0], json!({"label": "unused"}));
        let entry = &items[1];
        assert_eq!(entry["access_token"], "new-access");
        assert_eq!(entry["refresh_token"], "r-old");
        assert_eq!(entry["token_type"], "Bearer");
        assert_eq!(entry["custom"], "kept");
        assert_eq!(entry["expires_in"], 3600);
        assert!(entry["expiry_date"].as_i64().unwrap() > Utc::now().timestamp_millis());
        assert!(entry["expire"].as_str().is_some());
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_file_client_wins_over_fallback() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_string_contains("client_id=file-id"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"access_token": "n"})))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write(
            dir.path(),
            &json!({
                "access_token": "o",
                "refresh_token": "r",
                "client_id": "file-id",
                "expire": (now - TimeDelta::minutes(1)).to_rfc3339(),
                "token_uri": server.uri()
            }),
        );

        let token = tokio::task::spawn_blocking(move || {
            load_google_token(&path, &client("env-id", "s"), &TokenLifecycle::default(), now)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(token.access_token, "n");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_refresh_failure_returns_original() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_string("invalid_grant"))
            .expect(1)
            .mount(&server)
            .await;

        let dir = TempDir::new().unwrap();
        let now = Utc::now();
        let path = write(
            dir.path(),
            &json!({
                "access_token": "expired-access",
                "refresh_token": "r",
                "expiry_date": (now - TimeDelta::hours(2)).timestamp_millis(),
                "token_uri": server.uri()
            }),
        );
        let before = std::fs::read(&path).unwrap();

        let read_path = path.clone();
        let token = tokio::task::spawn_blocking(move || {
            load_google_token(&read_path, &client("id", "s"), &TokenLifecycle::default(), now)
        })
        .await
        .unwrap()
        .unwrap();
        assert_eq!(token.access_token, "expired-access");
        assert_eq!(token.outcome, TokenOutcome::Stale);
        assert_eq!(std::fs::read(&path).unwrap(), before);
    }
}
