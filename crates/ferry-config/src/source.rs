//! Provenance: which layer supplied each resolved field.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// The layer a resolved value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueSource {
    #[default]
    Default,
    File,
    Environment,
    Override,
    CodexCli,
    ClaudeCli,
    AntigravityCli,
    AntigravityIde,
}

impl ValueSource {
    pub fn as_str(self) -> &'static str {
        match self {
            ValueSource::Default => "default",
            ValueSource::File => "file",
            ValueSource::Environment => "environment",
            ValueSource::Override => "override",
            ValueSource::CodexCli => "codex_cli",
            ValueSource::ClaudeCli => "claude_cli",
            ValueSource::AntigravityCli => "antigravity_cli",
            ValueSource::AntigravityIde => "antigravity_ide",
        }
    }
}

impl fmt::Display for ValueSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Declares [`Field`] together with its stable names.
macro_rules! fields {
    ($($variant:ident => $name:literal,)+) => {
        /// Every field whose provenance is tracked.
        ///
        /// Names are the snake_case keys used in the config file; nested
        /// keys are dotted. `external_agents` and `proactive` are tracked as
        /// whole sections.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Field {
            $($variant,)+
        }

        impl Field {
            pub const ALL: &'static [Field] = &[$(Field::$variant,)+];

            pub fn as_str(self) -> &'static str {
                match self {
                    $(Field::$variant => $name,)+
                }
            }
        }
    };
}

fields! {
    LlmProvider => "llm_provider",
    LlmModel => "llm_model",
    LlmSmallProvider => "llm_small_provider",
    LlmSmallModel => "llm_small_model",
    LlmVisionModel => "llm_vision_model",
    ApiKey => "api_key",
    BaseUrl => "base_url",
    SandboxBaseUrl => "sandbox_base_url",
    AcpExecutorAddr => "acp_executor_addr",
    AcpExecutorCwd => "acp_executor_cwd",
    AcpExecutorMode => "acp_executor_mode",
    AcpExecutorAutoApprove => "acp_executor_auto_approve",
    AcpExecutorMaxCliCalls => "acp_executor_max_cli_calls",
    AcpExecutorMaxDurationSeconds => "acp_executor_max_duration_seconds",
    AcpExecutorRequireManifest => "acp_executor_require_manifest",
    TavilyApiKey => "tavily_api_key",
    Profile => "profile",
    Environment => "environment",
    Verbose => "verbose",
    DisableTui => "disable_tui",
    FollowTranscript => "follow_transcript",
    FollowStream => "follow_stream",
    MaxIterations => "max_iterations",
    MaxTokens => "max_tokens",
    ToolMaxConcurrent => "tool_max_concurrent",
    LlmCacheSize => "llm_cache_size",
    LlmCacheTtlSeconds => "llm_cache_ttl_seconds",
    UserRateLimitRps => "user_rate_limit_rps",
    UserRateLimitBurst => "user_rate_limit_burst",
    Temperature => "temperature",
    TopP => "top_p",
    StopSequences => "stop_sequences",
    SessionDir => "session_dir",
    CostDir => "cost_dir",
    SessionStaleAfterSeconds => "session_stale_after_seconds",
    AgentPreset => "agent_preset",
    ToolPreset => "tool_preset",
    Toolset => "toolset",
    BrowserConnector => "browser.connector",
    BrowserCdpUrl => "browser.cdp_url",
    BrowserChromePath => "browser.chrome_path",
    BrowserHeadless => "browser.headless",
    BrowserUserDataDir => "browser.user_data_dir",
    BrowserTimeoutSeconds => "browser.timeout_seconds",
    HttpDefaultMaxResponseBytes => "http_limits.default_max_response_bytes",
    HttpWebFetchMaxResponseBytes => "http_limits.web_fetch_max_response_bytes",
    HttpWebSearchMaxResponseBytes => "http_limits.web_search_max_response_bytes",
    HttpMusicSearchMaxResponseBytes => "http_limits.music_search_max_response_bytes",
    HttpModelListMaxResponseBytes => "http_limits.model_list_max_response_bytes",
    HttpSandboxMaxResponseBytes => "http_limits.sandbox_max_response_bytes",
    ExternalAgents => "external_agents",
    Proactive => "proactive",
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown field name passed to [`Field::from_str`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown config field '{0}'")]
pub struct UnknownField(pub String);

impl FromStr for Field {
    type Err = UnknownField;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let name = s.trim();
        Field::ALL
            .iter()
            .copied()
            .find(|field| field.as_str() == name)
            .ok_or_else(|| UnknownField(name.to_string()))
    }
}

/// Provenance for one resolution, created fresh by every `load`.
#[derive(Debug, Clone, PartialEq)]
pub struct Metadata {
    sources: BTreeMap<Field, ValueSource>,
    loaded_at: DateTime<Utc>,
}

impl Default for Metadata {
    fn default() -> Self {
        Self::new(Utc::now())
    }
}

impl Metadata {
    pub(crate) fn new(loaded_at: DateTime<Utc>) -> Self {
        Self {
            sources: BTreeMap::new(),
            loaded_at,
        }
    }

    pub(crate) fn record(&mut self, field: Field, source: ValueSource) {
        self.sources.insert(field, source);
    }

    /// Where `field` came from. Fields never written report `Default`.
    pub fn source(&self, field: Field) -> ValueSource {
        self.sources.get(&field).copied().unwrap_or_default()
    }

    /// Like [`Metadata::source`], keyed by the field's name.
    ///
    /// `None` only when `name` is not a known field.
    pub fn source_named(&self, name: &str) -> Option<ValueSource> {
        name.parse::<Field>().ok().map(|field| self.source(field))
    }

    /// Explicitly recorded entries, in field order.
    pub fn sources(&self) -> impl Iterator<Item = (Field, ValueSource)> + '_ {
        self.sources.iter().map(|(field, source)| (*field, *source))
    }

    pub fn loaded_at(&self) -> DateTime<Utc> {
        self.loaded_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_field_names_round_trip() {
        for field in Field::ALL {
            assert_eq!(field.as_str().parse::<Field>().unwrap(), *field);
        }
        assert!("no_such_field".parse::<Field>().is_err());
    }

    #[test]
    fn test_field_names_are_unique() {
        let mut names: Vec<&str> = Field::ALL.iter().map(|f| f.as_str()).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), Field::ALL.len());
    }

    #[test]
    fn test_unwritten_field_is_default() {
        let mut meta = Metadata::default();
        assert_eq!(meta.source(Field::ApiKey), ValueSource::Default);

        meta.record(Field::ApiKey, ValueSource::Environment);
        assert_eq!(meta.source(Field::ApiKey), ValueSource::Environment);
        assert_eq!(meta.source_named("api_key"), Some(ValueSource::Environment));
        assert_eq!(meta.source_named("llm_model"), Some(ValueSource::Default));
        assert_eq!(meta.source_named("bogus"), None);
        assert_eq!(meta.sources().count(), 1);
    }

    #[test]
    fn test_value_source_display() {
        assert_eq!(ValueSource::CodexCli.to_string(), "codex_cli");
        assert_eq!(ValueSource::AntigravityIde.to_string(), "antigravity_ide");
        assert_eq!(
            serde_json::to_string(&ValueSource::Environment).unwrap(),
            "\"environment\""
        );
    }
}
