//! Caller override layer, applied last and unconditionally.

use super::Writer;
use crate::source::{Field, Metadata, ValueSource};
use crate::types::{Overrides, RuntimeConfig};

pub(crate) fn apply(config: &mut RuntimeConfig, meta: &mut Metadata, overrides: &Overrides) {
    let o = overrides.clone();
    let mut w = Writer::new(config, meta, ValueSource::Override);

    w.set(Field::LlmProvider, o.llm_provider, |c| &mut c.llm_provider);
    w.set(Field::LlmModel, o.llm_model, |c| &mut c.llm_model);
    w.set(Field::LlmSmallProvider, o.llm_small_provider, |c| &mut c.llm_small_provider);
    w.set(Field::LlmSmallModel, o.llm_small_model, |c| &mut c.llm_small_model);
    w.set(Field::LlmVisionModel, o.llm_vision_model, |c| &mut c.llm_vision_model);
    w.set(Field::ApiKey, o.api_key, |c| &mut c.api_key);
    w.set(Field::BaseUrl, o.base_url, |c| &mut c.base_url);
    w.set(Field::SandboxBaseUrl, o.sandbox_base_url, |c| &mut c.sandbox_base_url);

    w.set(Field::AcpExecutorAddr, o.acp_executor_addr, |c| &mut c.acp_executor_addr);
    w.set(Field::AcpExecutorCwd, o.acp_executor_cwd, |c| &mut c.acp_executor_cwd);
    w.set(Field::AcpExecutorMode, o.acp_executor_mode, |c| &mut c.acp_executor_mode);
    w.set(Field::AcpExecutorAutoApprove, o.acp_executor_auto_approve, |c| {
        &mut c.acp_executor_auto_approve
    });
    w.set(Field::AcpExecutorMaxCliCalls, o.acp_executor_max_cli_calls, |c| {
        &mut c.acp_executor_max_cli_calls
    });
    w.set(
        Field::AcpExecutorMaxDurationSeconds,
        o.acp_executor_max_duration_seconds,
        |c| &mut c.acp_executor_max_duration_seconds,
    );
    w.set(Field::AcpExecutorRequireManifest, o.acp_executor_require_manifest, |c| {
        &mut c.acp_executor_require_manifest
    });

    w.set(Field::TavilyApiKey, o.tavily_api_key, |c| &mut c.tavily_api_key);
    w.set(Field::Profile, o.profile, |c| &mut c.profile);
    w.set(Field::Environment, o.environment, |c| &mut c.environment);
    w.set(Field::Verbose, o.verbose, |c| &mut c.verbose);
    w.set(Field::DisableTui, o.disable_tui, |c| &mut c.disable_tui);
    w.set(Field::FollowTranscript, o.follow_transcript, |c| &mut c.follow_transcript);
    w.set(Field::FollowStream, o.follow_stream, |c| &mut c.follow_stream);

    w.set(Field::MaxIterations, o.max_iterations, |c| &mut c.max_iterations);
    w.set(Field::MaxTokens, o.max_tokens, |c| &mut c.max_tokens);
    w.set(Field::ToolMaxConcurrent, o.tool_max_concurrent, |c| &mut c.tool_max_concurrent);
    w.set(Field::LlmCacheSize, o.llm_cache_size, |c| &mut c.llm_cache_size);
    w.set(Field::LlmCacheTtlSeconds, o.llm_cache_ttl_seconds, |c| {
        &mut c.llm_cache_ttl_seconds
    });
    w.set(Field::UserRateLimitRps, o.user_rate_limit_rps, |c| &mut c.user_rate_limit_rps);
    w.set(Field::UserRateLimitBurst, o.user_rate_limit_burst, |c| {
        &mut c.user_rate_limit_burst
    });
    w.set_temperature(o.temperature);
    w.set(Field::TopP, o.top_p, |c| &mut c.top_p);
    w.set(Field::StopSequences, o.stop_sequences, |c| &mut c.stop_sequences);

    w.set(Field::SessionDir, o.session_dir, |c| &mut c.session_dir);
    w.set(Field::CostDir, o.cost_dir, |c| &mut c.cost_dir);
    w.set(Field::SessionStaleAfterSeconds, o.session_stale_after_seconds, |c| {
        &mut c.session_stale_after_seconds
    });
    w.set(Field::AgentPreset, o.agent_preset, |c| &mut c.agent_preset);
    w.set(Field::ToolPreset, o.tool_preset, |c| &mut c.tool_preset);
    w.set(Field::Toolset, o.toolset, |c| &mut c.toolset);

    let b = o.browser;
    w.set(Field::BrowserConnector, b.connector, |c| &mut c.browser.connector);
    w.set(Field::BrowserCdpUrl, b.cdp_url, |c| &mut c.browser.cdp_url);
    w.set(Field::BrowserChromePath, b.chrome_path, |c| &mut c.browser.chrome_path);
    w.set(Field::BrowserHeadless, b.headless, |c| &mut c.browser.headless);
    w.set(Field::BrowserUserDataDir, b.user_data_dir, |c| &mut c.browser.user_data_dir);
    w.set(Field::BrowserTimeoutSeconds, b.timeout_seconds, |c| {
        &mut c.browser.timeout_seconds
    });

    let h = o.http_limits;
    w.set(Field::HttpDefaultMaxResponseBytes, h.default_max_response_bytes, |c| {
        &mut c.http_limits.default_max_response_bytes
    });
    w.set(Field::HttpWebFetchMaxResponseBytes, h.web_fetch_max_response_bytes, |c| {
        &mut c.http_limits.web_fetch_max_response_bytes
    });
    w.set(Field::HttpWebSearchMaxResponseBytes, h.web_search_max_response_bytes, |c| {
        &mut c.http_limits.web_search_max_response_bytes
    });
    w.set(
        Field::HttpMusicSearchMaxResponseBytes,
        h.music_search_max_response_bytes,
        |c| &mut c.http_limits.music_search_max_response_bytes,
    );
    w.set(Field::HttpModelListMaxResponseBytes, h.model_list_max_response_bytes, |c| {
        &mut c.http_limits.model_list_max_response_bytes
    });
    w.set(Field::HttpSandboxMaxResponseBytes, h.sandbox_max_response_bytes, |c| {
        &mut c.http_limits.sandbox_max_response_bytes
    });
}
