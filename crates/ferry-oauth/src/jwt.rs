//! Unverified JWT claim extraction.
//!
//! Access tokens written by a local CLI are opened only to read their `exp`
//! and `client_id` claims. The signature is never checked. The token came
//! from a file owned by the current user, written by the CLI that performed
//! the login, so the trust boundary is the local filesystem and not the
//! token itself. This is not a security check. Verifying here would need a
//! key distribution story this crate does not have, and dropping the decode
//! would break expiry detection.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::{DateTime, Utc};
use serde_json::Value;

/// The handful of claims the refresh logic cares about.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnverifiedClaims {
    /// `exp`, seconds since the epoch.
    pub exp: Option<i64>,
    /// `client_id`, trimmed.
    pub client_id: Option<String>,
}

impl UnverifiedClaims {
    /// Expiry as a timestamp, if the token carries a positive `exp`.
    pub fn expires_at(&self) -> Option<DateTime<Utc>> {
        self.exp
            .filter(|exp| *exp > 0)
            .and_then(|exp| DateTime::from_timestamp(exp, 0))
    }

    pub fn client_id(&self) -> Option<&str> {
        self.client_id.as_deref()
    }
}

/// Decode the payload segment of a three-part JWT without verifying it.
///
/// Returns `None` for anything that is not `header.payload.signature` with a
/// base64url JSON object in the middle.
pub fn decode_unverified(token: &str) -> Option<UnverifiedClaims> {
    let mut parts = token.trim().split('.');
    let (_header, payload, _signature) = (parts.next()?, parts.next()?, parts.next()?);
    if parts.next().is_some() {
        return None;
    }

    let bytes = URL_SAFE_NO_PAD.decode(payload.trim_end_matches('=')).ok()?;
    let Value::Object(claims) = serde_json::from_slice::<Value>(&bytes).ok()? else {
        return None;
    };

    // Some issuers emit `exp` as a float.
    let exp = claims.get("exp").and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_f64().map(|f| f as i64))
    });
    let client_id = claims
        .get("client_id")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string);

    Some(UnverifiedClaims { exp, client_id })
}

#[cfg(test)]
pub(crate) fn encode_test_jwt(claims: &Value) -> String {
    let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"none","typ":"JWT"}"#);
    let payload = URL_SAFE_NO_PAD.encode(claims.to_string());
    format!("{header}.{payload}.sig")
}
