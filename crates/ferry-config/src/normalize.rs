//! Post-merge cleanup. Out-of-range values are corrected, never rejected.

use crate::types::{
    DEFAULT_TOOL_MAX_CONCURRENT, ExternalAgentsConfig, HttpLimits, RuntimeConfig,
};

fn trim_in_place(value: &mut String) {
    let trimmed = value.trim();
    if trimmed.len() != value.len() {
        *value = trimmed.to_string();
    }
}

/// Trim, drop blanks and dedupe, keeping first-seen order.
pub fn normalize_stop_sequences(stops: &[String]) -> Vec<String> {
    let mut out: Vec<String> = Vec::with_capacity(stops.len());
    for stop in stops {
        let stop = stop.trim();
        if stop.is_empty() || out.iter().any(|seen| seen == stop) {
            continue;
        }
        out.push(stop.to_string());
    }
    out
}

/// Normalize a merged config in place. Running it twice changes nothing.
pub fn normalize(config: &mut RuntimeConfig) {
    for value in [
        &mut config.llm_provider,
        &mut config.llm_model,
        &mut config.llm_small_provider,
        &mut config.llm_small_model,
        &mut config.llm_vision_model,
        &mut config.api_key,
        &mut config.base_url,
        &mut config.sandbox_base_url,
        &mut config.acp_executor_addr,
        &mut config.acp_executor_cwd,
        &mut config.acp_executor_mode,
        &mut config.tavily_api_key,
        &mut config.profile,
        &mut config.environment,
        &mut config.session_dir,
        &mut config.cost_dir,
        &mut config.agent_preset,
        &mut config.tool_preset,
        &mut config.toolset,
        &mut config.browser.connector,
        &mut config.browser.cdp_url,
        &mut config.browser.chrome_path,
        &mut config.browser.user_data_dir,
    ] {
        trim_in_place(value);
    }

    config.stop_sequences = normalize_stop_sequences(&config.stop_sequences);

    if config.tool_max_concurrent <= 0 {
        config.tool_max_concurrent = DEFAULT_TOOL_MAX_CONCURRENT;
    }
    for value in [
        &mut config.llm_cache_size,
        &mut config.llm_cache_ttl_seconds,
        &mut config.session_stale_after_seconds,
        &mut config.browser.timeout_seconds,
    ] {
        *value = (*value).max(0);
    }

    normalize_http_limits(&mut config.http_limits);
    normalize_external_agents(&mut config.external_agents);
}

fn normalize_http_limits(limits: &mut HttpLimits) {
    let defaults = HttpLimits::default();
    let pairs = [
        (
            &mut limits.default_max_response_bytes,
            defaults.default_max_response_bytes,
        ),
        (
            &mut limits.web_fetch_max_response_bytes,
            defaults.web_fetch_max_response_bytes,
        ),
        (
            &mut limits.web_search_max_response_bytes,
            defaults.web_search_max_response_bytes,
        ),
        (
            &mut limits.music_search_max_response_bytes,
            defaults.music_search_max_response_bytes,
        ),
        (
            &mut limits.model_list_max_response_bytes,
            defaults.model_list_max_response_bytes,
        ),
        (
            &mut limits.sandbox_max_response_bytes,
            defaults.sandbox_max_response_bytes,
        ),
    ];
    for (value, default) in pairs {
        if *value <= 0 {
            *value = default;
        }
    }
}

fn normalize_external_agents(agents: &mut ExternalAgentsConfig) {
    let claude = &mut agents.claude_code;
    trim_in_place(&mut claude.binary);
    trim_in_place(&mut claude.default_model);
    trim_in_place(&mut claude.default_mode);
    claude.autonomous_allowed_tools = normalize_stop_sequences(&claude.autonomous_allowed_tools);
    claude.timeout = claude.timeout.max(0);

    let codex = &mut agents.codex;
    trim_in_place(&mut codex.binary);
    trim_in_place(&mut codex.default_model);
    trim_in_place(&mut codex.approval_policy);
    trim_in_place(&mut codex.sandbox);
    codex.timeout = codex.timeout.max(0);
}
