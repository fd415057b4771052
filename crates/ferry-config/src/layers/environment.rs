//! Environment variable layer.
//!
//! A set, non-blank variable overwrites whatever the file supplied. A
//! variable that is set but does not parse as its field's type aborts the
//! load with [`ConfigError::InvalidEnv`] naming the variable.

use std::fmt::Display;
use std::str::FromStr;

use super::Writer;
use crate::env::{Env, parse_bool, parse_duration_secs, split_list};
use crate::error::{ConfigError, Result};
use crate::source::{Field, Metadata, ValueSource};
use crate::types::RuntimeConfig;

fn invalid(var: &str, value: &str, reason: impl Into<String>) -> ConfigError {
    ConfigError::InvalidEnv {
        var: var.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

fn boolean(env: &Env, var: &str) -> Result<Option<bool>> {
    env.get(var)
        .map(|v| parse_bool(&v).ok_or_else(|| invalid(var, &v, "expected a boolean")))
        .transpose()
}

fn number<T>(env: &Env, var: &str) -> Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
{
    env.get(var)
        .map(|v| v.parse::<T>().map_err(|e| invalid(var, &v, e.to_string())))
        .transpose()
}

fn duration(env: &Env, var: &str) -> Result<Option<i64>> {
    env.get(var)
        .map(|v| {
            parse_duration_secs(&v)
                .ok_or_else(|| invalid(var, &v, "expected seconds or a duration like 30m"))
        })
        .transpose()
}

/// Layer environment values onto `config`.
///
/// Parsing happens before any write, so a bad variable leaves `config`
/// untouched.
pub(crate) fn apply(config: &mut RuntimeConfig, meta: &mut Metadata, env: &Env) -> Result<()> {
    let auto_approve = boolean(env, "ACP_EXECUTOR_AUTO_APPROVE")?;
    let require_manifest = boolean(env, "ACP_EXECUTOR_REQUIRE_MANIFEST")?;
    let verbose = boolean(env, "FERRY_VERBOSE")?;
    let disable_tui = boolean(env, "FERRY_NO_TUI")?;
    let follow_transcript = boolean(env, "FERRY_TUI_FOLLOW_TRANSCRIPT")?;
    let follow_stream = boolean(env, "FERRY_TUI_FOLLOW_STREAM")?;
    let headless = boolean(env, "FERRY_BROWSER_HEADLESS")?;

    let max_cli_calls = number(env, "ACP_EXECUTOR_MAX_CLI_CALLS")?;
    let max_duration = number(env, "ACP_EXECUTOR_MAX_DURATION_SECONDS")?;
    let max_iterations = number(env, "LLM_MAX_ITERATIONS")?;
    let max_tokens = number(env, "LLM_MAX_TOKENS")?;
    let burst = number(env, "USER_LLM_BURST")?;
    let tool_max_concurrent = number(env, "TOOL_MAX_CONCURRENT")?;
    let cache_size = number(env, "LLM_CACHE_SIZE")?;
    let cache_ttl = number(env, "LLM_CACHE_TTL_SECONDS")?;
    let stale_after = duration(env, "FERRY_SESSION_STALE_AFTER")?;
    let browser_timeout = number(env, "FERRY_BROWSER_TIMEOUT_SECONDS")?;

    let rps = number(env, "USER_LLM_RPS")?;
    let temperature = number(env, "LLM_TEMPERATURE")?;
    let top_p = number(env, "LLM_TOP_P")?;

    let stop = env
        .get("LLM_STOP")
        .map(|v| split_list(&v))
        .filter(|stops| !stops.is_empty());

    let mut w = Writer::new(config, meta, ValueSource::Environment);

    w.set(Field::LlmProvider, env.get("LLM_PROVIDER"), |c| &mut c.llm_provider);
    w.set(Field::LlmModel, env.get("LLM_MODEL"), |c| &mut c.llm_model);
    w.set(Field::LlmSmallProvider, env.get("LLM_SMALL_PROVIDER"), |c| {
        &mut c.llm_small_provider
    });
    w.set(Field::LlmSmallModel, env.get("LLM_SMALL_MODEL"), |c| &mut c.llm_small_model);
    w.set(Field::LlmVisionModel, env.get("LLM_VISION_MODEL"), |c| {
        &mut c.llm_vision_model
    });
    w.set(Field::BaseUrl, env.get("LLM_BASE_URL"), |c| &mut c.base_url);
    w.set(Field::SandboxBaseUrl, env.get("SANDBOX_BASE_URL"), |c| {
        &mut c.sandbox_base_url
    });

    w.set(Field::AcpExecutorAddr, env.get("ACP_EXECUTOR_ADDR"), |c| {
        &mut c.acp_executor_addr
    });
    w.set(Field::AcpExecutorCwd, env.get("ACP_EXECUTOR_CWD"), |c| &mut c.acp_executor_cwd);
    w.set(Field::AcpExecutorMode, env.get("ACP_EXECUTOR_MODE"), |c| {
        &mut c.acp_executor_mode
    });
    w.set(Field::AcpExecutorAutoApprove, auto_approve, |c| {
        &mut c.acp_executor_auto_approve
    });
    w.set(Field::AcpExecutorMaxCliCalls, max_cli_calls, |c| {
        &mut c.acp_executor_max_cli_calls
    });
    w.set(Field::AcpExecutorMaxDurationSeconds, max_duration, |c| {
        &mut c.acp_executor_max_duration_seconds
    });
    w.set(Field::AcpExecutorRequireManifest, require_manifest, |c| {
        &mut c.acp_executor_require_manifest
    });

    w.set(Field::TavilyApiKey, env.get("TAVILY_API_KEY"), |c| &mut c.tavily_api_key);
    w.set(Field::Profile, env.get("FERRY_PROFILE"), |c| &mut c.profile);
    w.set(Field::Environment, env.get("FERRY_ENV"), |c| &mut c.environment);
    w.set(Field::Verbose, verbose, |c| &mut c.verbose);
    w.set(Field::DisableTui, disable_tui, |c| &mut c.disable_tui);
    w.set(Field::FollowTranscript, follow_transcript, |c| &mut c.follow_transcript);
    w.set(Field::FollowStream, follow_stream, |c| &mut c.follow_stream);

    w.set(Field::MaxIterations, max_iterations, |c| &mut c.max_iterations);
    w.set(Field::MaxTokens, max_tokens, |c| &mut c.max_tokens);
    w.set(Field::ToolMaxConcurrent, tool_max_concurrent, |c| &mut c.tool_max_concurrent);
    w.set(Field::LlmCacheSize, cache_size, |c| &mut c.llm_cache_size);
    w.set(Field::LlmCacheTtlSeconds, cache_ttl, |c| &mut c.llm_cache_ttl_seconds);
    w.set(Field::UserRateLimitRps, rps, |c| &mut c.user_rate_limit_rps);
    w.set(Field::UserRateLimitBurst, burst, |c| &mut c.user_rate_limit_burst);
    w.set_temperature(temperature);
    w.set(Field::TopP, top_p, |c| &mut c.top_p);
    w.set(Field::StopSequences, stop, |c| &mut c.stop_sequences);

    w.set(Field::SessionDir, env.get("FERRY_SESSION_DIR"), |c| &mut c.session_dir);
    w.set(Field::CostDir, env.get("FERRY_COST_DIR"), |c| &mut c.cost_dir);
    w.set(Field::SessionStaleAfterSeconds, stale_after, |c| {
        &mut c.session_stale_after_seconds
    });
    w.set(Field::AgentPreset, env.get("AGENT_PRESET"), |c| &mut c.agent_preset);
    w.set(Field::ToolPreset, env.get("TOOL_PRESET"), |c| &mut c.tool_preset);
    w.set(Field::Toolset, env.get("FERRY_TOOLSET"), |c| &mut c.toolset);

    w.set(Field::BrowserConnector, env.get("FERRY_BROWSER_CONNECTOR"), |c| {
        &mut c.browser.connector
    });
    w.set(Field::BrowserCdpUrl, env.get("FERRY_BROWSER_CDP_URL"), |c| {
        &mut c.browser.cdp_url
    });
    w.set(Field::BrowserChromePath, env.get("FERRY_BROWSER_CHROME_PATH"), |c| {
        &mut c.browser.chrome_path
    });
    w.set(Field::BrowserHeadless, headless, |c| &mut c.browser.headless);
    w.set(Field::BrowserUserDataDir, env.get("FERRY_BROWSER_USER_DATA_DIR"), |c| {
        &mut c.browser.user_data_dir
    });
    w.set(Field::BrowserTimeoutSeconds, browser_timeout, |c| {
        &mut c.browser.timeout_seconds
    });

    Ok(())
}
