//! Environment access: lookup abstraction, legacy aliases, `${VAR}`
//! interpolation, and the small parsers shared by the file and env layers.

use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Source of environment variables.
///
/// `load` never reads `std::env` directly; it goes through one of these so
/// tests can supply an in-memory environment.
pub trait EnvLookup: Send + Sync {
    fn lookup(&self, key: &str) -> Option<String>;
}

/// The real process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvLookup for ProcessEnv {
    fn lookup(&self, key: &str) -> Option<String> {
        std::env::var(key).ok()
    }
}

impl EnvLookup for HashMap<String, String> {
    fn lookup(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

/// Legacy variable names, keyed by the canonical name they stand in for.
/// The canonical name always wins when both are set.
pub const ENV_ALIASES: &[(&str, &[&str])] = &[
    ("FERRY_CONFIG_PATH", &["FERRY_CONFIG"]),
    ("FERRY_ENV", &["FERRY_ENVIRONMENT"]),
    ("LLM_BASE_URL", &["LLM_API_BASE"]),
    ("OPENAI_BASE_URL", &["OPENAI_API_BASE"]),
    ("ANTHROPIC_BASE_URL", &["ANTHROPIC_API_URL"]),
    ("ANTIGRAVITY_API_KEY", &["GEMINI_API_KEY"]),
];

/// Alias-aware, trimming view over an [`EnvLookup`].
#[derive(Clone)]
pub struct Env {
    inner: Arc<dyn EnvLookup>,
}

impl fmt::Debug for Env {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Env").finish_non_exhaustive()
    }
}

impl Default for Env {
    fn default() -> Self {
        Self::process()
    }
}

impl Env {
    pub fn new(lookup: impl EnvLookup + 'static) -> Self {
        Self {
            inner: Arc::new(lookup),
        }
    }

    /// The process environment.
    pub fn process() -> Self {
        Self::new(ProcessEnv)
    }

    /// An environment with no variables set.
    pub fn empty() -> Self {
        Self::new(HashMap::new())
    }

    /// An in-memory environment, mostly for tests.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        let map: HashMap<String, String> = pairs
            .into_iter()
            .map(|(k, v)| (k.into(), v.into()))
            .collect();
        Self::new(map)
    }

    /// Look up exactly `key`, ignoring aliases. Blank values count as unset.
    pub fn raw(&self, key: &str) -> Option<String> {
        self.inner
            .lookup(key)
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
    }

    /// Look up `key`, falling back to its legacy aliases.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(value) = self.raw(key) {
            return Some(value);
        }
        let (_, aliases) = ENV_ALIASES.iter().find(|(canonical, _)| *canonical == key)?;
        aliases.iter().find_map(|alias| {
            let value = self.raw(alias)?;
            tracing::debug!(alias = %alias, canonical = %key, "Using legacy environment variable");
            Some(value)
        })
    }

    /// Replace every `${VAR}` in `value` with the variable's value.
    ///
    /// Unset variables expand to the empty string. A `$` that does not open
    /// a `${...}` group, and an unterminated `${`, are kept as written.
    pub fn expand(&self, value: &str) -> String {
        let mut out = String::with_capacity(value.len());
        let mut rest = value;
        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                out.push_str(&rest[start..]);
                return out;
            };
            let name = after[..end].trim();
            if let Some(v) = self.get(name) {
                out.push_str(&v);
            }
            rest = &after[end + 1..];
        }
        out.push_str(rest);
        out
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Value parsers
// ─────────────────────────────────────────────────────────────────────────────

/// Parse a permissive boolean (`1/true/t/yes/y/on`, `0/false/f/no/n/off`).
pub fn parse_bool(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "t" | "yes" | "y" | "on" => Some(true),
        "0" | "false" | "f" | "no" | "n" | "off" => Some(false),
        _ => None,
    }
}

/// Split a delimited list on commas, semicolons and whitespace.
pub fn split_list(value: &str) -> Vec<String> {
    value
        .split(|c: char| c == ',' || c == ';' || c.is_whitespace())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

/// Parse whole seconds, or a duration such as `90s`, `30m`, `1h 30m`.
///
/// Sub-second remainders are truncated.
pub fn parse_duration_secs(value: &str) -> Option<i64> {
    let value = value.trim();
    if let Ok(secs) = value.parse::<i64>() {
        return Some(secs);
    }
    let duration = humantime::parse_duration(value).ok()?;
    i64::try_from(duration.as_secs()).ok()
}
