//! YAML config file layer.
//!
//! The document is either wrapped in a top-level `runtime:` section or has
//! the same keys at the top level. Unknown keys are ignored so the file can
//! be shared with other tools. Every string value, list element and nested
//! `env` value has `${VAR}` references expanded before it is applied.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use serde::de::Error as _;
use serde::{Deserialize, Deserializer};

use super::Writer;
use crate::env::{Env, parse_duration_secs};
use crate::error::{ConfigError, Result};
use crate::source::{Field, Metadata, ValueSource};
use crate::types::{ExternalAgentsConfig, ProactiveConfig, RuntimeConfig};

/// Environment variable naming the config file.
pub const CONFIG_PATH_ENV: &str = "FERRY_CONFIG_PATH";

/// Config directory under the user's home.
const CONFIG_DIR: &str = ".ferry";

/// Config file name inside [`CONFIG_DIR`].
const CONFIG_FILE: &str = "config.yaml";

/// Resolve the config file path: `FERRY_CONFIG_PATH` (or its legacy alias),
/// else `<home>/.ferry/config.yaml`. A leading `~/` in the variable is
/// expanded against `home`.
pub fn resolve_config_path(env: &Env, home: Option<&Path>) -> Option<PathBuf> {
    if let Some(value) = env.get(CONFIG_PATH_ENV) {
        return Some(match (value.strip_prefix("~/"), home) {
            (Some(rest), Some(home)) => home.join(rest),
            _ => PathBuf::from(value),
        });
    }
    home.map(|h| h.join(CONFIG_DIR).join(CONFIG_FILE))
}

// ─────────────────────────────────────────────────────────────────────────────
// File schema
// ─────────────────────────────────────────────────────────────────────────────

/// The runtime section of the config file. Absent keys are `None`.
#[derive(Debug, Default, Deserialize)]
#[serde(default)]
pub(crate) struct RuntimeFile {
    llm_provider: Option<String>,
    llm_model: Option<String>,
    llm_small_provider: Option<String>,
    llm_small_model: Option<String>,
    llm_vision_model: Option<String>,
    api_key: Option<String>,
    base_url: Option<String>,
    sandbox_base_url: Option<String>,
    acp_executor_addr: Option<String>,
    acp_executor_cwd: Option<String>,
    acp_executor_mode: Option<String>,
    acp_executor_auto_approve: Option<bool>,
    acp_executor_max_cli_calls: Option<u32>,
    acp_executor_max_duration_seconds: Option<u32>,
    acp_executor_require_manifest: Option<bool>,
    tavily_api_key: Option<String>,
    profile: Option<String>,
    environment: Option<String>,
    verbose: Option<bool>,
    disable_tui: Option<bool>,
    follow_transcript: Option<bool>,
    follow_stream: Option<bool>,
    max_iterations: Option<u32>,
    max_tokens: Option<u32>,
    tool_max_concurrent: Option<i64>,
    llm_cache_size: Option<i64>,
    #[serde(alias = "llm_cache_ttl_seconds", deserialize_with = "opt_duration_secs")]
    llm_cache_ttl: Option<i64>,
    user_rate_limit_rps: Option<f64>,
    user_rate_limit_burst: Option<u32>,
    temperature: Option<f64>,
    top_p: Option<f64>,
    stop_sequences: Option<Vec<String>>,
    session_dir: Option<String>,
    cost_dir: Option<String>,
    #[serde(alias = "session_stale_after_seconds", deserialize_with = "opt_duration_secs")]
    session_stale_after: Option<i64>,
    agent_preset: Option<String>,
    tool_preset: Option<String>,
    toolset: Option<String>,
    browser: Option<BrowserFile>,
    http_limits: Option<HttpLimitsFile>,
    external_agents: Option<ExternalAgentsConfig>,
    proactive: Option<ProactiveConfig>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct BrowserFile {
    connector: Option<String>,
    cdp_url: Option<String>,
    chrome_path: Option<String>,
    headless: Option<bool>,
    user_data_dir: Option<String>,
    timeout_seconds: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct HttpLimitsFile {
    default_max_response_bytes: Option<i64>,
    web_fetch_max_response_bytes: Option<i64>,
    web_search_max_response_bytes: Option<i64>,
    music_search_max_response_bytes: Option<i64>,
    model_list_max_response_bytes: Option<i64>,
    sandbox_max_response_bytes: Option<i64>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum DurationRepr {
    Secs(i64),
    Text(String),
}

impl DurationRepr {
    fn into_secs<E: serde::de::Error>(self) -> std::result::Result<i64, E> {
        match self {
            DurationRepr::Secs(secs) => Ok(secs),
            DurationRepr::Text(text) => parse_duration_secs(&text)
                .ok_or_else(|| E::custom(format!("invalid duration {text:?}"))),
        }
    }
}

/// Integer seconds or a duration string (`30m`, `48h`, `1h30m`).
pub(crate) fn duration_secs<'de, D>(deserializer: D) -> std::result::Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    DurationRepr::deserialize(deserializer)?.into_secs()
}

fn opt_duration_secs<'de, D>(deserializer: D) -> std::result::Result<Option<i64>, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<DurationRepr>::deserialize(deserializer)? {
        Some(repr) => repr.into_secs().map(Some),
        None => Ok(None),
    }
}

impl RuntimeFile {
    /// Parse a YAML document. `None` when the document is empty.
    pub(crate) fn parse(contents: &str) -> std::result::Result<Option<Self>, serde_yaml::Error> {
        if contents.trim().is_empty() {
            return Ok(None);
        }
        let mut doc: serde_yaml::Value = serde_yaml::from_str(contents)?;
        if let Some(runtime) = doc.get("runtime").filter(|r| r.is_mapping()).cloned() {
            doc = runtime;
        }
        if doc.is_null() {
            return Ok(None);
        }
        if !doc.is_mapping() {
            return Err(serde_yaml::Error::custom(
                "expected a mapping of runtime settings",
            ));
        }
        serde_yaml::from_value(doc).map(Some)
    }

    /// Expand `${VAR}` references in every string-typed value.
    fn interpolate(mut self, env: &Env) -> Self {
        let expand = |value: &mut Option<String>| {
            if let Some(v) = value.as_mut() {
                *v = env.expand(v);
            }
        };
        for value in [
            &mut self.llm_provider,
            &mut self.llm_model,
            &mut self.llm_small_provider,
            &mut self.llm_small_model,
            &mut self.llm_vision_model,
            &mut self.api_key,
            &mut self.base_url,
            &mut self.sandbox_base_url,
            &mut self.acp_executor_addr,
            &mut self.acp_executor_cwd,
            &mut self.acp_executor_mode,
            &mut self.tavily_api_key,
            &mut self.profile,
            &mut self.environment,
            &mut self.session_dir,
            &mut self.cost_dir,
            &mut self.agent_preset,
            &mut self.tool_preset,
            &mut self.toolset,
        ] {
            expand(value);
        }
        if let Some(stops) = self.stop_sequences.as_mut() {
            for stop in stops.iter_mut() {
                *stop = env.expand(stop);
            }
        }
        if let Some(browser) = self.browser.as_mut() {
            for value in [
                &mut browser.connector,
                &mut browser.cdp_url,
                &mut browser.chrome_path,
                &mut browser.user_data_dir,
            ] {
                expand(value);
            }
        }
        if let Some(agents) = self.external_agents.as_mut() {
            interpolate_agents(agents, env);
        }
        if let Some(proactive) = self.proactive.as_mut() {
            let index = &mut proactive.memory.index;
            index.db_path = env.expand(&index.db_path);
            index.embedder_model = env.expand(&index.embedder_model);
        }
        self
    }
}

fn interpolate_agents(agents: &mut ExternalAgentsConfig, env: &Env) {
    let claude = &mut agents.claude_code;
    for value in [
        &mut claude.binary,
        &mut claude.default_model,
        &mut claude.default_mode,
    ] {
        *value = env.expand(value);
    }
    for tool in claude.autonomous_allowed_tools.iter_mut() {
        *tool = env.expand(tool);
    }
    for value in claude.env.values_mut() {
        *value = env.expand(value);
    }

    let codex = &mut agents.codex;
    for value in [
        &mut codex.binary,
        &mut codex.default_model,
        &mut codex.approval_policy,
        &mut codex.sandbox,
    ] {
        *value = env.expand(value);
    }
    for value in codex.env.values_mut() {
        *value = env.expand(value);
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Apply
// ─────────────────────────────────────────────────────────────────────────────

/// Read the file at `path` and layer its values onto `config`.
///
/// A missing or blank file is skipped. Any other read failure, and any
/// YAML error, aborts.
pub(crate) fn apply(
    config: &mut RuntimeConfig,
    meta: &mut Metadata,
    path: &Path,
    env: &Env,
) -> Result<()> {
    let contents = match std::fs::read_to_string(path) {
        Ok(contents) => contents,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No config file, skipping");
            return Ok(());
        }
        Err(e) => {
            return Err(ConfigError::ReadFile {
                path: path.display().to_string(),
                source: e,
            });
        }
    };

    let parsed = RuntimeFile::parse(&contents).map_err(|e| ConfigError::ParseFile {
        path: path.display().to_string(),
        source: e,
    })?;
    let Some(parsed) = parsed else {
        tracing::debug!(path = %path.display(), "Config file is empty, skipping");
        return Ok(());
    };

    tracing::debug!(path = %path.display(), "Applying config file");
    apply_parsed(config, meta, parsed.interpolate(env));
    Ok(())
}

/// Blank strings and empty lists count as absent.
fn text(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

fn apply_parsed(config: &mut RuntimeConfig, meta: &mut Metadata, file: RuntimeFile) {
    let mut w = Writer::new(config, meta, ValueSource::File);

    w.set(Field::LlmProvider, text(file.llm_provider), |c| &mut c.llm_provider);
    w.set(Field::LlmModel, text(file.llm_model), |c| &mut c.llm_model);
    w.set(Field::LlmSmallProvider, text(file.llm_small_provider), |c| {
        &mut c.llm_small_provider
    });
    w.set(Field::LlmSmallModel, text(file.llm_small_model), |c| &mut c.llm_small_model);
    w.set(Field::LlmVisionModel, text(file.llm_vision_model), |c| {
        &mut c.llm_vision_model
    });
    w.set(Field::ApiKey, text(file.api_key), |c| &mut c.api_key);
    w.set(Field::BaseUrl, text(file.base_url), |c| &mut c.base_url);
    w.set(Field::SandboxBaseUrl, text(file.sandbox_base_url), |c| {
        &mut c.sandbox_base_url
    });

    w.set(Field::AcpExecutorAddr, text(file.acp_executor_addr), |c| {
        &mut c.acp_executor_addr
    });
    w.set(Field::AcpExecutorCwd, text(file.acp_executor_cwd), |c| &mut c.acp_executor_cwd);
    w.set(Field::AcpExecutorMode, text(file.acp_executor_mode), |c| {
        &mut c.acp_executor_mode
    });
    w.set(Field::AcpExecutorAutoApprove, file.acp_executor_auto_approve, |c| {
        &mut c.acp_executor_auto_approve
    });
    w.set(Field::AcpExecutorMaxCliCalls, file.acp_executor_max_cli_calls, |c| {
        &mut c.acp_executor_max_cli_calls
    });
    w.set(
        Field::AcpExecutorMaxDurationSeconds,
        file.acp_executor_max_duration_seconds,
        |c| &mut c.acp_executor_max_duration_seconds,
    );
    w.set(
        Field::AcpExecutorRequireManifest,
        file.acp_executor_require_manifest,
        |c| &mut c.acp_executor_require_manifest,
    );

    w.set(Field::TavilyApiKey, text(file.tavily_api_key), |c| &mut c.tavily_api_key);
    w.set(Field::Profile, text(file.profile), |c| &mut c.profile);
    w.set(Field::Environment, text(file.environment), |c| &mut c.environment);
    w.set(Field::Verbose, file.verbose, |c| &mut c.verbose);
    w.set(Field::DisableTui, file.disable_tui, |c| &mut c.disable_tui);
    w.set(Field::FollowTranscript, file.follow_transcript, |c| &mut c.follow_transcript);
    w.set(Field::FollowStream, file.follow_stream, |c| &mut c.follow_stream);

    w.set(Field::MaxIterations, file.max_iterations, |c| &mut c.max_iterations);
    w.set(Field::MaxTokens, file.max_tokens, |c| &mut c.max_tokens);
    w.set(Field::ToolMaxConcurrent, file.tool_max_concurrent, |c| {
        &mut c.tool_max_concurrent
    });
    w.set(Field::LlmCacheSize, file.llm_cache_size, |c| &mut c.llm_cache_size);
    w.set(Field::LlmCacheTtlSeconds, file.llm_cache_ttl, |c| &mut c.llm_cache_ttl_seconds);
    w.set(Field::UserRateLimitRps, file.user_rate_limit_rps, |c| {
        &mut c.user_rate_limit_rps
    });
    w.set(Field::UserRateLimitBurst, file.user_rate_limit_burst, |c| {
        &mut c.user_rate_limit_burst
    });
    w.set_temperature(file.temperature);
    w.set(Field::TopP, file.top_p, |c| &mut c.top_p);
    w.set(
        Field::StopSequences,
        file.stop_sequences.filter(|s| !s.is_empty()),
        |c| &mut c.stop_sequences,
    );

    w.set(Field::SessionDir, text(file.session_dir), |c| &mut c.session_dir);
    w.set(Field::CostDir, text(file.cost_dir), |c| &mut c.cost_dir);
    w.set(Field::SessionStaleAfterSeconds, file.session_stale_after, |c| {
        &mut c.session_stale_after_seconds
    });
    w.set(Field::AgentPreset, text(file.agent_preset), |c| &mut c.agent_preset);
    w.set(Field::ToolPreset, text(file.tool_preset), |c| &mut c.tool_preset);
    w.set(Field::Toolset, text(file.toolset), |c| &mut c.toolset);

    if let Some(browser) = file.browser {
        w.set(Field::BrowserConnector, text(browser.connector), |c| {
            &mut c.browser.connector
        });
        w.set(Field::BrowserCdpUrl, text(browser.cdp_url), |c| &mut c.browser.cdp_url);
        w.set(Field::BrowserChromePath, text(browser.chrome_path), |c| {
            &mut c.browser.chrome_path
        });
        w.set(Field::BrowserHeadless, browser.headless, |c| &mut c.browser.headless);
        w.set(Field::BrowserUserDataDir, text(browser.user_data_dir), |c| {
            &mut c.browser.user_data_dir
        });
        w.set(Field::BrowserTimeoutSeconds, browser.timeout_seconds, |c| {
            &mut c.browser.timeout_seconds
        });
    }

    if let Some(limits) = file.http_limits {
        w.set(Field::HttpDefaultMaxResponseBytes, limits.default_max_response_bytes, |c| {
            &mut c.http_limits.default_max_response_bytes
        });
        w.set(
            Field::HttpWebFetchMaxResponseBytes,
            limits.web_fetch_max_response_bytes,
            |c| &mut c.http_limits.web_fetch_max_response_bytes,
        );
        w.set(
            Field::HttpWebSearchMaxResponseBytes,
            limits.web_search_max_response_bytes,
            |c| &mut c.http_limits.web_search_max_response_bytes,
        );
        w.set(
            Field::HttpMusicSearchMaxResponseBytes,
            limits.music_search_max_response_bytes,
            |c| &mut c.http_limits.music_search_max_response_bytes,
        );
        w.set(
            Field::HttpModelListMaxResponseBytes,
            limits.model_list_max_response_bytes,
            |c| &mut c.http_limits.model_list_max_response_bytes,
        );
        w.set(
            Field::HttpSandboxMaxResponseBytes,
            limits.sandbox_max_response_bytes,
            |c| &mut c.http_limits.sandbox_max_response_bytes,
        );
    }

    w.set(Field::ExternalAgents, file.external_agents, |c| &mut c.external_agents);
    w.set(Field::Proactive, file.proactive, |c| &mut c.proactive);
}
