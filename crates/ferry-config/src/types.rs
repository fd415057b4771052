//! Runtime configuration types and their compiled-in defaults.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

pub const DEFAULT_LLM_PROVIDER: &str = "openai";
pub const DEFAULT_LLM_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_LLM_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MAX_TOKENS: u32 = 8192;
pub const DEFAULT_TOOL_MAX_CONCURRENT: i64 = 8;
pub const DEFAULT_LLM_CACHE_SIZE: i64 = 64;
pub const DEFAULT_LLM_CACHE_TTL_SECONDS: i64 = 30 * 60;
pub const DEFAULT_ACP_HOST: &str = "127.0.0.1";
pub const DEFAULT_ACP_PORT: u16 = 9000;
pub const DEFAULT_HTTP_MAX_RESPONSE: i64 = 1 << 20;
pub const DEFAULT_SESSION_STALE_AFTER_SECONDS: i64 = 48 * 60 * 60;

/// Provider name that resolves to whichever credential is found first.
pub const PROVIDER_AUTO: &str = "auto";
/// Like [`PROVIDER_AUTO`], but prefers CLI-managed credentials.
pub const PROVIDER_CLI: &str = "cli";
/// Offline provider used when no API key can be found.
pub const PROVIDER_MOCK: &str = "mock";

/// The fully resolved runtime configuration.
///
/// Mutable only inside `load`; callers get an owned value and treat it as
/// read-only.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RuntimeConfig {
    pub llm_provider: String,
    pub llm_model: String,
    pub llm_small_provider: String,
    pub llm_small_model: String,
    pub llm_vision_model: String,
    pub api_key: String,
    pub base_url: String,
    pub sandbox_base_url: String,

    pub acp_executor_addr: String,
    pub acp_executor_cwd: String,
    pub acp_executor_mode: String,
    pub acp_executor_auto_approve: bool,
    pub acp_executor_max_cli_calls: u32,
    pub acp_executor_max_duration_seconds: u32,
    pub acp_executor_require_manifest: bool,

    pub tavily_api_key: String,
    pub profile: String,
    pub environment: String,
    pub verbose: bool,
    pub disable_tui: bool,
    pub follow_transcript: bool,
    pub follow_stream: bool,

    pub max_iterations: u32,
    pub max_tokens: u32,
    pub tool_max_concurrent: i64,
    pub llm_cache_size: i64,
    pub llm_cache_ttl_seconds: i64,
    pub user_rate_limit_rps: f64,
    pub user_rate_limit_burst: u32,
    pub temperature: f64,
    /// Whether any layer set `temperature` explicitly.
    pub temperature_provided: bool,
    pub top_p: f64,
    pub stop_sequences: Vec<String>,

    pub session_dir: String,
    pub cost_dir: String,
    pub session_stale_after_seconds: i64,
    pub agent_preset: String,
    pub tool_preset: String,
    pub toolset: String,

    pub browser: BrowserConfig,
    pub http_limits: HttpLimits,
    pub external_agents: ExternalAgentsConfig,
    pub proactive: ProactiveConfig,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            llm_provider: DEFAULT_LLM_PROVIDER.to_string(),
            llm_model: DEFAULT_LLM_MODEL.to_string(),
            llm_small_provider: DEFAULT_LLM_PROVIDER.to_string(),
            llm_small_model: DEFAULT_LLM_MODEL.to_string(),
            llm_vision_model: String::new(),
            api_key: String::new(),
            base_url: DEFAULT_LLM_BASE_URL.to_string(),
            sandbox_base_url: "http://localhost:18086".to_string(),
            acp_executor_addr: format!("http://{}:{}", DEFAULT_ACP_HOST, DEFAULT_ACP_PORT),
            acp_executor_cwd: String::new(),
            acp_executor_mode: "sandbox".to_string(),
            acp_executor_auto_approve: true,
            acp_executor_max_cli_calls: 12,
            acp_executor_max_duration_seconds: 900,
            acp_executor_require_manifest: true,
            tavily_api_key: String::new(),
            profile: "standard".to_string(),
            environment: "development".to_string(),
            verbose: false,
            disable_tui: false,
            follow_transcript: true,
            follow_stream: true,
            max_iterations: 150,
            max_tokens: DEFAULT_MAX_TOKENS,
            tool_max_concurrent: DEFAULT_TOOL_MAX_CONCURRENT,
            llm_cache_size: DEFAULT_LLM_CACHE_SIZE,
            llm_cache_ttl_seconds: DEFAULT_LLM_CACHE_TTL_SECONDS,
            user_rate_limit_rps: 1.0,
            user_rate_limit_burst: 3,
            temperature: 0.7,
            temperature_provided: false,
            top_p: 1.0,
            stop_sequences: Vec::new(),
            session_dir: "~/.ferry/sessions".to_string(),
            cost_dir: "~/.ferry/costs".to_string(),
            session_stale_after_seconds: DEFAULT_SESSION_STALE_AFTER_SECONDS,
            agent_preset: String::new(),
            tool_preset: String::new(),
            toolset: "default".to_string(),
            browser: BrowserConfig::default(),
            http_limits: HttpLimits::default(),
            external_agents: ExternalAgentsConfig::default(),
            proactive: ProactiveConfig::default(),
        }
    }
}

/// Local browser tooling.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BrowserConfig {
    pub connector: String,
    pub cdp_url: String,
    pub chrome_path: String,
    pub headless: bool,
    pub user_data_dir: String,
    pub timeout_seconds: i64,
}

impl Default for BrowserConfig {
    fn default() -> Self {
        Self {
            connector: "cdp".to_string(),
            cdp_url: String::new(),
            chrome_path: String::new(),
            headless: false,
            user_data_dir: String::new(),
            timeout_seconds: 60,
        }
    }
}

/// Maximum response sizes for outbound HTTP calls, in bytes.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HttpLimits {
    pub default_max_response_bytes: i64,
    pub web_fetch_max_response_bytes: i64,
    pub web_search_max_response_bytes: i64,
    pub music_search_max_response_bytes: i64,
    pub model_list_max_response_bytes: i64,
    pub sandbox_max_response_bytes: i64,
}

impl Default for HttpLimits {
    fn default() -> Self {
        Self {
            default_max_response_bytes: DEFAULT_HTTP_MAX_RESPONSE,
            web_fetch_max_response_bytes: 2 * DEFAULT_HTTP_MAX_RESPONSE,
            web_search_max_response_bytes: DEFAULT_HTTP_MAX_RESPONSE,
            music_search_max_response_bytes: DEFAULT_HTTP_MAX_RESPONSE,
            model_list_max_response_bytes: 512 * 1024,
            sandbox_max_response_bytes: 8 * 1024 * 1024,
        }
    }
}

/// External agent executors, configured from the file only.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ExternalAgentsConfig {
    pub claude_code: ClaudeCodeConfig,
    pub codex: CodexAgentConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ClaudeCodeConfig {
    pub enabled: bool,
    pub binary: String,
    pub default_model: String,
    pub default_mode: String,
    pub autonomous_allowed_tools: Vec<String>,
    pub max_budget_usd: f64,
    pub max_turns: u32,
    /// Seconds, or a duration string such as `30m` in the file.
    #[serde(deserialize_with = "crate::layers::file::duration_secs")]
    pub timeout: i64,
    pub env: BTreeMap<String, String>,
}

impl Default for ClaudeCodeConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            binary: "claude".to_string(),
            default_model: String::new(),
            default_mode: "autonomous".to_string(),
            autonomous_allowed_tools: vec!["*".to_string()],
            max_budget_usd: 0.0,
            max_turns: 50,
            timeout: 30 * 60,
            env: BTreeMap::new(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CodexAgentConfig {
    pub enabled: bool,
    pub binary: String,
    pub default_model: String,
    pub approval_policy: String,
    pub sandbox: String,
    /// Seconds, or a duration string such as `30m` in the file.
    #[serde(deserialize_with = "crate::layers::file::duration_secs")]
    pub timeout: i64,
    pub env: BTreeMap<String, String>,
}

impl Default for CodexAgentConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            binary: "codex".to_string(),
            default_model: "gpt-5.2-codex".to_string(),
            approval_policy: "never".to_string(),
            sandbox: "danger-full-access".to_string(),
            timeout: 30 * 60,
            env: BTreeMap::new(),
        }
    }
}

/// Proactive agent behaviour, configured from the file only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProactiveConfig {
    pub enabled: bool,
    pub memory: MemoryConfig,
    pub skills: SkillsConfig,
    pub scheduler: SchedulerConfig,
}

impl Default for ProactiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            memory: MemoryConfig::default(),
            skills: SkillsConfig::default(),
            scheduler: SchedulerConfig::default(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryConfig {
    pub enabled: bool,
    pub index: MemoryIndexConfig,
}

impl Default for MemoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            index: MemoryIndexConfig::default(),
        }
    }
}

/// Local vector index over Markdown memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MemoryIndexConfig {
    pub enabled: bool,
    pub db_path: String,
    pub chunk_tokens: u32,
    pub chunk_overlap: u32,
    pub min_score: f64,
    pub embedder_model: String,
}

impl Default for MemoryIndexConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            db_path: "~/.ferry/memory/index.sqlite".to_string(),
            chunk_tokens: 400,
            chunk_overlap: 80,
            min_score: 0.35,
            embedder_model: "nomic-embed-text".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsConfig {
    pub auto_activation: SkillsAutoActivation,
    pub cache_ttl_seconds: i64,
}

impl Default for SkillsConfig {
    fn default() -> Self {
        Self {
            auto_activation: SkillsAutoActivation::default(),
            cache_ttl_seconds: 300,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SkillsAutoActivation {
    pub enabled: bool,
    pub max_activated: u32,
    pub token_budget: u32,
    pub confidence_threshold: f64,
}

impl Default for SkillsAutoActivation {
    fn default() -> Self {
        Self {
            enabled: true,
            max_activated: 3,
            token_budget: 4000,
            confidence_threshold: 0.6,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    pub enabled: bool,
    pub max_concurrent: u32,
    pub cooldown_seconds: i64,
    pub trigger_timeout_seconds: i64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            max_concurrent: 1,
            cooldown_seconds: 0,
            trigger_timeout_seconds: 900,
        }
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Overrides
// ─────────────────────────────────────────────────────────────────────────────

/// Caller-supplied values that beat every other layer. `None` leaves the
/// field alone.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub llm_provider: Option<String>,
    pub llm_model: Option<String>,
    pub llm_small_provider: Option<String>,
    pub llm_small_model: Option<String>,
    pub llm_vision_model: Option<String>,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub sandbox_base_url: Option<String>,
    pub acp_executor_addr: Option<String>,
    pub acp_executor_cwd: Option<String>,
    pub acp_executor_mode: Option<String>,
    pub acp_executor_auto_approve: Option<bool>,
    pub acp_executor_max_cli_calls: Option<u32>,
    pub acp_executor_max_duration_seconds: Option<u32>,
    pub acp_executor_require_manifest: Option<bool>,
    pub tavily_api_key: Option<String>,
    pub profile: Option<String>,
    pub environment: Option<String>,
    pub verbose: Option<bool>,
    pub disable_tui: Option<bool>,
    pub follow_transcript: Option<bool>,
    pub follow_stream: Option<bool>,
    pub max_iterations: Option<u32>,
    pub max_tokens: Option<u32>,
    pub tool_max_concurrent: Option<i64>,
    pub llm_cache_size: Option<i64>,
    pub llm_cache_ttl_seconds: Option<i64>,
    pub user_rate_limit_rps: Option<f64>,
    pub user_rate_limit_burst: Option<u32>,
    pub temperature: Option<f64>,
    pub top_p: Option<f64>,
    pub stop_sequences: Option<Vec<String>>,
    pub session_dir: Option<String>,
    pub cost_dir: Option<String>,
    pub session_stale_after_seconds: Option<i64>,
    pub agent_preset: Option<String>,
    pub tool_preset: Option<String>,
    pub toolset: Option<String>,
    pub browser: BrowserOverrides,
    pub http_limits: HttpLimitsOverrides,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct BrowserOverrides {
    pub connector: Option<String>,
    pub cdp_url: Option<String>,
    pub chrome_path: Option<String>,
    pub headless: Option<bool>,
    pub user_data_dir: Option<String>,
    pub timeout_seconds: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HttpLimitsOverrides {
    pub default_max_response_bytes: Option<i64>,
    pub web_fetch_max_response_bytes: Option<i64>,
    pub web_search_max_response_bytes: Option<i64>,
    pub music_search_max_response_bytes: Option<i64>,
    pub model_list_max_response_bytes: Option<i64>,
    pub sandbox_max_response_bytes: Option<i64>,
}
