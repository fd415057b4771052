//! Provider selection after the explicit layers have been merged.
//!
//! `auto` and `cli` are resolved to a concrete provider from environment
//! API keys and discovered CLI credentials. Known providers then have their
//! key, model and base URL backfilled, but only into fields no explicit
//! layer has set. Without any key the provider falls back to `mock`.

use crate::credentials::{CliCredential, CliCredentials};
use crate::env::Env;
use crate::source::{Field, Metadata, ValueSource};
use crate::types::{PROVIDER_AUTO, PROVIDER_CLI, PROVIDER_MOCK, RuntimeConfig};

pub const ANTHROPIC_DEFAULT_BASE_URL: &str = "https://api.anthropic.com/v1";
pub const CODEX_CLI_BASE_URL: &str = "https://chatgpt.com/backend-api/codex";
pub const ANTIGRAVITY_DEFAULT_BASE_URL: &str = "https://cloudcode-pa.googleapis.com";

/// Providers that never need an API key.
const KEYLESS_PROVIDERS: [&str; 2] = [PROVIDER_MOCK, "ollama"];

fn provider_name(config: &RuntimeConfig) -> String {
    config.llm_provider.trim().to_ascii_lowercase()
}

/// Whether `load` should probe CLI credential stores for this config.
pub fn should_load_cli_credentials(config: &RuntimeConfig) -> bool {
    let provider = provider_name(config);
    if provider == PROVIDER_AUTO || provider == PROVIDER_CLI {
        return true;
    }
    if !config.api_key.trim().is_empty() {
        return false;
    }
    matches!(
        provider.as_str(),
        "codex" | "openai-responses" | "responses" | "anthropic" | "claude" | "antigravity"
    )
}

// ─────────────────────────────────────────────────────────────────────────────
// Auto-provider resolution
// ─────────────────────────────────────────────────────────────────────────────

/// A provider backed by an environment API key.
struct EnvCandidate {
    provider: &'static str,
    api_key_env: &'static str,
    base_url_env: &'static str,
    default_base_url: Option<&'static str>,
    source: ValueSource,
}

/// Tried in order; the first one with a key wins.
const ENV_CANDIDATES: [EnvCandidate; 6] = [
    EnvCandidate {
        provider: "anthropic",
        api_key_env: "CLAUDE_CODE_OAUTH_TOKEN",
        base_url_env: "ANTHROPIC_BASE_URL",
        default_base_url: Some(ANTHROPIC_DEFAULT_BASE_URL),
        source: ValueSource::ClaudeCli,
    },
    EnvCandidate {
        provider: "anthropic",
        api_key_env: "ANTHROPIC_AUTH_TOKEN",
        base_url_env: "ANTHROPIC_BASE_URL",
        default_base_url: Some(ANTHROPIC_DEFAULT_BASE_URL),
        source: ValueSource::ClaudeCli,
    },
    EnvCandidate {
        provider: "anthropic",
        api_key_env: "ANTHROPIC_API_KEY",
        base_url_env: "ANTHROPIC_BASE_URL",
        default_base_url: Some(ANTHROPIC_DEFAULT_BASE_URL),
        source: ValueSource::Environment,
    },
    EnvCandidate {
        provider: "codex",
        api_key_env: "CODEX_API_KEY",
        base_url_env: "CODEX_BASE_URL",
        default_base_url: Some(CODEX_CLI_BASE_URL),
        source: ValueSource::Environment,
    },
    EnvCandidate {
        provider: "antigravity",
        api_key_env: "ANTIGRAVITY_API_KEY",
        base_url_env: "ANTIGRAVITY_BASE_URL",
        default_base_url: None,
        source: ValueSource::Environment,
    },
    EnvCandidate {
        provider: "openai",
        api_key_env: "OPENAI_API_KEY",
        base_url_env: "OPENAI_BASE_URL",
        default_base_url: None,
        source: ValueSource::Environment,
    },
];

fn small_provider_unset(config: &RuntimeConfig) -> bool {
    let small = config.llm_small_provider.trim();
    small.is_empty()
        || small.eq_ignore_ascii_case(PROVIDER_AUTO)
        || small.eq_ignore_ascii_case(PROVIDER_CLI)
}

/// Commit `provider` and its key, keeping any key already set.
fn commit_provider(
    config: &mut RuntimeConfig,
    meta: &mut Metadata,
    provider: &str,
    api_key: &str,
    source: ValueSource,
) {
    config.llm_provider = provider.to_string();
    meta.record(Field::LlmProvider, source);
    if config.api_key.is_empty() {
        config.api_key = api_key.to_string();
        meta.record(Field::ApiKey, source);
    }
    if small_provider_unset(config) {
        config.llm_small_provider = provider.to_string();
        meta.record(Field::LlmSmallProvider, source);
    }
}

fn apply_env_candidates(config: &mut RuntimeConfig, meta: &mut Metadata, env: &Env) -> bool {
    for cand in &ENV_CANDIDATES {
        let Some(key) = env.get(cand.api_key_env) else {
            continue;
        };
        tracing::debug!(provider = %cand.provider, var = %cand.api_key_env, "Auto provider matched environment key");
        commit_provider(config, meta, cand.provider, &key, cand.source);

        // A base URL from the file, env layer or overrides always stands.
        if meta.source(Field::BaseUrl) != ValueSource::Default {
            return true;
        }
        if let Some(base) = env.get(cand.base_url_env) {
            config.base_url = base;
            meta.record(Field::BaseUrl, ValueSource::Environment);
        } else if let Some(default) = cand.default_base_url {
            config.base_url = default.to_string();
            meta.record(Field::BaseUrl, cand.source);
        }
        return true;
    }
    false
}

fn apply_cli_candidates(
    config: &mut RuntimeConfig,
    meta: &mut Metadata,
    cli: &CliCredentials,
) -> bool {
    let Some(cand) = cli.iter().find(|c| !c.api_key.trim().is_empty()) else {
        return false;
    };
    tracing::debug!(provider = %cand.provider, source = %cand.source, "Auto provider matched CLI credential");
    commit_provider(config, meta, &cand.provider, &cand.api_key, cand.source);

    if let Some(base) = &cand.base_url
        && meta.source(Field::BaseUrl) == ValueSource::Default
    {
        config.base_url = base.clone();
        meta.record(Field::BaseUrl, cand.source);
    }
    if let Some(model) = &cand.model
        && meta.source(Field::LlmModel) == ValueSource::Default
    {
        config.llm_model = model.clone();
        meta.record(Field::LlmModel, cand.source);
    }
    true
}

/// Resolve `auto` (environment first, then CLI credentials) and `cli`
/// (CLI credentials first, then environment). Other providers are left
/// alone.
pub(crate) fn resolve_auto_provider(
    config: &mut RuntimeConfig,
    meta: &mut Metadata,
    env: &Env,
    cli: &CliCredentials,
) {
    let provider = provider_name(config);
    let matched = if provider == PROVIDER_AUTO {
        apply_env_candidates(config, meta, env) || apply_cli_candidates(config, meta, cli)
    } else if provider == PROVIDER_CLI {
        apply_cli_candidates(config, meta, cli) || apply_env_candidates(config, meta, env)
    } else {
        return;
    };
    if matched {
        tracing::info!(provider = %config.llm_provider, "Resolved automatic provider");
    } else {
        tracing::debug!(requested = %provider, "No credential found for automatic provider");
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Backfill
// ─────────────────────────────────────────────────────────────────────────────

/// First of: a discovered CLI credential, then each env var in order.
fn key_from(
    cli: Option<&CliCredential>,
    env: &Env,
    vars: &[&str],
) -> Option<(String, ValueSource)> {
    if let Some(cred) = cli.filter(|c| !c.api_key.trim().is_empty()) {
        return Some((cred.api_key.trim().to_string(), cred.source));
    }
    vars.iter()
        .find_map(|var| env.get(var))
        .map(|key| (key, ValueSource::Environment))
}

/// Fill key, model and base URL for a known provider from CLI credentials
/// and provider-specific environment variables. Only fields that no layer
/// has set are touched.
pub(crate) fn backfill_credentials(
    config: &mut RuntimeConfig,
    meta: &mut Metadata,
    env: &Env,
    cli: &CliCredentials,
) {
    let provider = provider_name(config);
    if provider.is_empty() {
        return;
    }

    if config.api_key.is_empty() {
        let found = match provider.as_str() {
            "anthropic" | "claude" => key_from(cli.claude.as_ref(), env, &["ANTHROPIC_API_KEY"]),
            "openai-responses" | "responses" | "codex" => {
                key_from(cli.codex.as_ref(), env, &["CODEX_API_KEY", "OPENAI_API_KEY"])
            }
            "antigravity" => key_from(cli.antigravity.as_ref(), env, &["ANTIGRAVITY_API_KEY"]),
            "openai" | "openrouter" | "deepseek" => key_from(None, env, &["OPENAI_API_KEY"]),
            _ => None,
        };
        if let Some((key, source)) = found {
            tracing::debug!(provider = %provider, source = %source, "Backfilled API key");
            config.api_key = key;
            meta.record(Field::ApiKey, source);
        }
    }

    if meta.source(Field::LlmModel) == ValueSource::Default {
        let cred = match provider.as_str() {
            "codex" => cli.codex.as_ref(),
            "antigravity" => cli.antigravity.as_ref(),
            _ => None,
        };
        if let Some((model, source)) = cred.and_then(|c| Some((c.model.clone()?, c.source))) {
            config.llm_model = model;
            meta.record(Field::LlmModel, source);
        }
    }

    if meta.source(Field::BaseUrl) == ValueSource::Default {
        let cli_base = |cred: Option<&CliCredential>| {
            cred.and_then(|c| Some((c.base_url.clone()?, c.source)))
        };
        let env_base = |var: &str| env.get(var).map(|b| (b, ValueSource::Environment));
        let found = match provider.as_str() {
            "anthropic" | "claude" => env_base("ANTHROPIC_BASE_URL").or_else(|| {
                Some((ANTHROPIC_DEFAULT_BASE_URL.to_string(), ValueSource::Default))
            }),
            "openai-responses" | "responses" | "codex" => cli_base(cli.codex.as_ref())
                .or_else(|| env_base("CODEX_BASE_URL"))
                .or_else(|| {
                    (provider == "codex")
                        .then(|| (CODEX_CLI_BASE_URL.to_string(), ValueSource::Default))
                }),
            "antigravity" => {
                cli_base(cli.antigravity.as_ref()).or_else(|| env_base("ANTIGRAVITY_BASE_URL"))
            }
            "openai" | "openrouter" | "deepseek" => env_base("OPENAI_BASE_URL"),
            _ => None,
        };
        if let Some((base, source)) = found {
            config.base_url = base;
            meta.record(Field::BaseUrl, source);
        }
    }
}

/// Force the `mock` provider when no key was found for a provider that
/// needs one.
pub(crate) fn apply_mock_fallback(config: &mut RuntimeConfig, meta: &mut Metadata) {
    let provider = provider_name(config);
    if !config.api_key.is_empty() || KEYLESS_PROVIDERS.contains(&provider.as_str()) {
        return;
    }
    tracing::warn!(requested = %config.llm_provider, "No API key found, falling back to mock provider");

    config.llm_provider = PROVIDER_MOCK.to_string();
    meta.record(Field::LlmProvider, ValueSource::Default);
    if meta.source(Field::LlmSmallProvider) == ValueSource::Default {
        config.llm_small_provider = PROVIDER_MOCK.to_string();
    }
    if meta.source(Field::LlmSmallModel) == ValueSource::Default {
        config.llm_small_model = PROVIDER_MOCK.to_string();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auto_config() -> (RuntimeConfig, Metadata) {
        let config = RuntimeConfig {
            llm_provider: "auto".to_string(),
            ..Default::default()
        };
        let mut meta = Metadata::default();
        meta.record(Field::LlmProvider, ValueSource::Environment);
        (config, meta)
    }

    fn cli_cred(provider: &str, key: &str, source: ValueSource) -> CliCredential {
        CliCredential {
            provider: provider.to_string(),
            api_key: key.to_string(),
            account_id: None,
            base_url: None,
            model: None,
            source,
            stale: false,
        }
    }

    #[test]
    fn test_should_load_cli_credentials() {
        let mut config = RuntimeConfig::default();
        assert!(!should_load_cli_credentials(&config));

        config.llm_provider = " CLI ".to_string();
        assert!(should_load_cli_credentials(&config));

        config.llm_provider = "codex".to_string();
        assert!(should_load_cli_credentials(&config));
        config.api_key = "sk".to_string();
        assert!(!should_load_cli_credentials(&config));

        config.llm_provider = "auto".to_string();
        assert!(should_load_cli_credentials(&config));
    }

    #[test]
    fn test_auto_prefers_env_in_candidate_order() {
        let (mut config, mut meta) = auto_config();
        let env = Env::from_pairs([("OPENAI_API_KEY", "sk-openai"), ("ANTHROPIC_API_KEY", "sk-ant")]);
        let cli = CliCredentials {
            codex: Some(cli_cred("codex", "cli-tok", ValueSource::CodexCli)),
            ..Default::default()
        };
        resolve_auto_provider(&mut config, &mut meta, &env, &cli);

        assert_eq!(config.llm_provider, "anthropic");
        assert_eq!(config.api_key, "sk-ant");
        assert_eq!(config.base_url, ANTHROPIC_DEFAULT_BASE_URL);
        assert_eq!(config.llm_small_provider, "openai");
        assert_eq!(meta.source(Field::ApiKey), ValueSource::Environment);
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::Environment);
    }

    #[test]
    fn test_claude_token_candidate_records_claude_source() {
        let (mut config, mut meta) = auto_config();
        config.llm_small_provider = "auto".to_string();
        let env = Env::from_pairs([
            ("ANTHROPIC_AUTH_TOKEN", "tok"),
            ("ANTHROPIC_API_URL", "https://proxy.example/v1"),
        ]);
        resolve_auto_provider(&mut config, &mut meta, &env, &CliCredentials::default());

        assert_eq!(config.llm_provider, "anthropic");
        assert_eq!(config.llm_small_provider, "anthropic");
        assert_eq!(meta.source(Field::ApiKey), ValueSource::ClaudeCli);
        assert_eq!(config.base_url, "https://proxy.example/v1");
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::Environment);
    }

    #[test]
    fn test_auto_falls_back_to_cli_in_order() {
        let (mut config, mut meta) = auto_config();
        let mut antigravity = cli_cred("antigravity", "ag", ValueSource::AntigravityIde);
        antigravity.base_url = Some(ANTIGRAVITY_DEFAULT_BASE_URL.to_string());
        antigravity.model = Some("gemini-3-pro".to_string());
        let cli = CliCredentials {
            codex: None,
            claude: Some(cli_cred("anthropic", "cl", ValueSource::ClaudeCli)),
            antigravity: Some(antigravity),
        };
        resolve_auto_provider(&mut config, &mut meta, &Env::empty(), &cli);

        assert_eq!(config.llm_provider, "antigravity");
        assert_eq!(config.api_key, "ag");
        assert_eq!(config.base_url, ANTIGRAVITY_DEFAULT_BASE_URL);
        assert_eq!(config.llm_model, "gemini-3-pro");
        assert_eq!(meta.source(Field::LlmModel), ValueSource::AntigravityIde);
        assert_eq!(meta.source(Field::ApiKey), ValueSource::AntigravityIde);
    }

    #[test]
    fn test_cli_mode_prefers_cli_credentials() {
        let (mut config, mut meta) = auto_config();
        config.llm_provider = "cli".to_string();
        let env = Env::from_pairs([("OPENAI_API_KEY", "sk-openai")]);
        let cli = CliCredentials {
            claude: Some(cli_cred("anthropic", "cl", ValueSource::ClaudeCli)),
            ..Default::default()
        };
        resolve_auto_provider(&mut config, &mut meta, &env, &cli);
        assert_eq!(config.llm_provider, "anthropic");
        assert_eq!(config.api_key, "cl");

        let (mut config, mut meta) = auto_config();
        config.llm_provider = "cli".to_string();
        resolve_auto_provider(&mut config, &mut meta, &env, &CliCredentials::default());
        assert_eq!(config.llm_provider, "openai");
        assert_eq!(config.api_key, "sk-openai");
    }

    #[test]
    fn test_candidate_keeps_explicit_key_and_base_url() {
        let (mut config, mut meta) = auto_config();
        config.api_key = "sk-file".to_string();
        config.base_url = "https://file.example".to_string();
        meta.record(Field::ApiKey, ValueSource::File);
        meta.record(Field::BaseUrl, ValueSource::File);
        let env = Env::from_pairs([("CODEX_API_KEY", "sk-codex")]);
        resolve_auto_provider(&mut config, &mut meta, &env, &CliCredentials::default());

        assert_eq!(config.llm_provider, "codex");
        assert_eq!(config.api_key, "sk-file");
        assert_eq!(config.base_url, "https://file.example");
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::File);
    }

    #[test]
    fn test_candidate_base_url_env_never_beats_override() {
        let (mut config, mut meta) = auto_config();
        config.base_url = "https://override.example".to_string();
        meta.record(Field::BaseUrl, ValueSource::Override);
        let env = Env::from_pairs([
            ("ANTHROPIC_API_KEY", "sk-ant"),
            ("ANTHROPIC_BASE_URL", "https://env.example"),
        ]);
        resolve_auto_provider(&mut config, &mut meta, &env, &CliCredentials::default());

        assert_eq!(config.llm_provider, "anthropic");
        assert_eq!(config.base_url, "https://override.example");
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::Override);
    }

    #[test]
    fn test_backfill_known_provider() {
        let mut config = RuntimeConfig {
            llm_provider: "anthropic".to_string(),
            ..Default::default()
        };
        let mut meta = Metadata::default();
        let env = Env::from_pairs([("ANTHROPIC_API_KEY", "sk-ant")]);
        backfill_credentials(&mut config, &mut meta, &env, &CliCredentials::default());

        assert_eq!(config.api_key, "sk-ant");
        assert_eq!(meta.source(Field::ApiKey), ValueSource::Environment);
        assert_eq!(config.base_url, ANTHROPIC_DEFAULT_BASE_URL);
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::Default);
    }

    #[test]
    fn test_backfill_prefers_cli_and_never_clobbers() {
        let mut config = RuntimeConfig {
            llm_provider: "codex".to_string(),
            llm_model: "pinned".to_string(),
            ..Default::default()
        };
        let mut meta = Metadata::default();
        meta.record(Field::LlmModel, ValueSource::Override);
        let mut codex = cli_cred("codex", "cli-tok", ValueSource::CodexCli);
        codex.model = Some("gpt-5-codex".to_string());
        codex.base_url = Some(CODEX_CLI_BASE_URL.to_string());
        let cli = CliCredentials {
            codex: Some(codex),
            ..Default::default()
        };
        let env = Env::from_pairs([("CODEX_API_KEY", "sk-env")]);
        backfill_credentials(&mut config, &mut meta, &env, &cli);

        assert_eq!(config.api_key, "cli-tok");
        assert_eq!(meta.source(Field::ApiKey), ValueSource::CodexCli);
        assert_eq!(config.llm_model, "pinned");
        assert_eq!(config.base_url, CODEX_CLI_BASE_URL);
        assert_eq!(meta.source(Field::BaseUrl), ValueSource::CodexCli);
    }

    #[test]
    fn test_backfill_responses_has_no_default_base() {
        let mut config = RuntimeConfig {
            llm_provider: "responses".to_string(),
            ..Default::default()
        };
        let mut meta = Metadata::default();
        backfill_credentials(&mut config, &mut meta, &Env::empty(), &CliCredentials::default());
        assert_eq!(config.base_url, "https://api.openai.com/v1");
        assert!(config.api_key.is_empty());
    }

    #[test]
    fn test_mock_fallback() {
        let mut config = RuntimeConfig::default();
        let mut meta = Metadata::default();
        meta.record(Field::LlmSmallModel, ValueSource::File);
        config.llm_small_model = "small".to_string();
        apply_mock_fallback(&mut config, &mut meta);

        assert_eq!(config.llm_provider, "mock");
        assert_eq!(config.llm_small_provider, "mock");
        assert_eq!(config.llm_small_model, "small");
        assert_eq!(meta.source(Field::LlmProvider), ValueSource::Default);
    }

    #[test]
    fn test_keyless_providers_are_kept() {
        for provider in ["ollama", "mock", " Ollama "] {
            let mut config = RuntimeConfig {
                llm_provider: provider.to_string(),
                ..Default::default()
            };
            let mut meta = Metadata::default();
            apply_mock_fallback(&mut config, &mut meta);
            assert_eq!(config.llm_provider, provider);
        }

        let mut config = RuntimeConfig {
            api_key: "sk".to_string(),
            ..Default::default()
        };
        let mut meta = Metadata::default();
        apply_mock_fallback(&mut config, &mut meta);
        assert_eq!(config.llm_provider, "openai");
    }
}
