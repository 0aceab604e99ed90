// Provider factory
//
// Creates backend adapters from configuration. Environment reads are
// centralized here: the rest of the system is a pure function of explicit
// config plus one captured `EnvOverrides` snapshot.

use tracing::debug;

use super::anthropic::AnthropicClient;
use super::error::ProviderError;
use super::ollama::OllamaClient;
use super::openai::OpenAiClient;
use super::openrouter::OpenRouterClient;
use super::types::ProviderKind;
use super::ProviderClient;
use crate::config::{AppConfig, ConfigUpdate, ProviderConfig};

pub const ENV_PROVIDER: &str = "CMDSAGE_PROVIDER";
pub const ENV_MODEL: &str = "CMDSAGE_MODEL";
pub const ENV_HOST: &str = "CMDSAGE_HOST";
pub const ENV_OLLAMA_HOST: &str = "OLLAMA_HOST";
pub const ENV_OPENAI_KEY: &str = "OPENAI_API_KEY";
pub const ENV_ANTHROPIC_KEY: &str = "ANTHROPIC_API_KEY";
pub const ENV_OPENROUTER_KEY: &str = "OPENROUTER_API_KEY";

fn env_nonempty(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Snapshot of every recognized environment override and credential.
///
/// Captured once at startup; adapters never read the process environment
/// themselves.
#[derive(Debug, Clone, Default)]
pub struct EnvOverrides {
    /// Backend selection (provider name).
    pub provider: Option<String>,
    /// Model override, applied to whichever backend is created.
    pub model: Option<String>,
    /// Local backend host override.
    pub host: Option<String>,
    pub openai_api_key: Option<String>,
    pub anthropic_api_key: Option<String>,
    pub openrouter_api_key: Option<String>,
}

impl EnvOverrides {
    pub fn capture() -> Self {
        Self {
            provider: env_nonempty(ENV_PROVIDER),
            model: env_nonempty(ENV_MODEL),
            host: env_nonempty(ENV_HOST).or_else(|| env_nonempty(ENV_OLLAMA_HOST)),
            openai_api_key: env_nonempty(ENV_OPENAI_KEY),
            anthropic_api_key: env_nonempty(ENV_ANTHROPIC_KEY),
            openrouter_api_key: env_nonempty(ENV_OPENROUTER_KEY),
        }
    }

    fn credential(&self, kind: ProviderKind) -> Result<String, ProviderError> {
        let (value, var) = match kind {
            ProviderKind::OpenAi => (&self.openai_api_key, ENV_OPENAI_KEY),
            ProviderKind::Anthropic => (&self.anthropic_api_key, ENV_ANTHROPIC_KEY),
            ProviderKind::OpenRouter => (&self.openrouter_api_key, ENV_OPENROUTER_KEY),
            ProviderKind::Local => {
                return Err(ProviderError::Configuration(
                    "local provider does not take a credential".to_string(),
                ))
            }
        };
        value.clone().ok_or_else(|| {
            ProviderError::Configuration(format!(
                "missing API key: set the {var} environment variable"
            ))
        })
    }
}

/// Create an adapter from a provider entry, overlaying recognized
/// environment overrides (explicit config < environment).
///
/// A missing credential fails here with `ProviderError::Configuration`,
/// before any adapter state or network client exists.
pub fn create_with_env(
    config: &ProviderConfig,
    env: &EnvOverrides,
) -> Result<Box<dyn ProviderClient>, ProviderError> {
    let mut config = config.clone();
    let overlay = ConfigUpdate {
        model: env.model.clone(),
        host_url: env.host.clone(),
        ..Default::default()
    };
    config.apply_update(&overlay);

    debug!(kind = %config.kind(), model = config.model(), "creating provider");

    match config.kind() {
        ProviderKind::Local => Ok(Box::new(OllamaClient::new(config)?)),
        ProviderKind::OpenAi => {
            let key = env.credential(ProviderKind::OpenAi)?;
            Ok(Box::new(OpenAiClient::new(config, key)?))
        }
        ProviderKind::Anthropic => {
            let key = env.credential(ProviderKind::Anthropic)?;
            Ok(Box::new(AnthropicClient::new(config, key)?))
        }
        ProviderKind::OpenRouter => {
            let key = env.credential(ProviderKind::OpenRouter)?;
            Ok(Box::new(OpenRouterClient::new(config, key)?))
        }
    }
}

/// Create an adapter from a provider entry using the process environment.
pub fn create(config: &ProviderConfig) -> Result<Box<dyn ProviderClient>, ProviderError> {
    create_with_env(config, &EnvOverrides::capture())
}

/// Resolve `current_provider` through the providers table and create the
/// named adapter. An absent name is an explicit `ProviderNotConfigured`
/// failure, never a silent default.
pub fn create_from_app_config(
    app: &AppConfig,
    env: &EnvOverrides,
) -> Result<Box<dyn ProviderClient>, ProviderError> {
    let entry = app
        .providers
        .get(&app.current_provider)
        .ok_or_else(|| ProviderError::ProviderNotConfigured(app.current_provider.clone()))?;
    create_with_env(entry, env)
}
