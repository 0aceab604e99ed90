// OpenRouter provider implementation
//
// OpenRouter speaks the OpenAI wire protocol, so this adapter owns no
// request building: it instantiates the OpenAI transport against the fixed
// OpenRouter base URL with the two identification headers the service
// recognizes, and delegates every operation to it.

use async_trait::async_trait;

use super::error::ProviderError;
use super::openai::OpenAiClient;
use super::types::{ChatMessage, ChatOptions, HealthCheckResult, ProviderKind};
use super::ProviderClient;
use crate::config::{ConfigUpdate, ProviderConfig};

const BASE_URL: &str = "https://openrouter.ai/api/v1";

/// OpenRouter chat client.
#[derive(Debug)]
pub struct OpenRouterClient {
    inner: OpenAiClient,
}

impl OpenRouterClient {
    pub fn new(config: ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let extra_headers = match &config {
            ProviderConfig::OpenRouter {
                site_url, app_name, ..
            } => {
                let mut headers = Vec::new();
                if let Some(site) = site_url {
                    headers.push(("HTTP-Referer".to_string(), site.clone()));
                }
                if let Some(app) = app_name {
                    headers.push(("X-Title".to_string(), app.clone()));
                }
                headers
            }
            other => {
                return Err(ProviderError::Configuration(format!(
                    "expected an openrouter provider config, got kind {:?}",
                    other.kind()
                )))
            }
        };

        let inner =
            OpenAiClient::with_transport(config, api_key, BASE_URL.to_string(), extra_headers)?;
        Ok(Self { inner })
    }

    /// Point the transport at a different host (gateway or test double).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.inner = self.inner.with_base_url(base_url);
        self
    }
}

#[async_trait]
impl ProviderClient for OpenRouterClient {
    async fn chat(
        &self,
        history: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<String, ProviderError> {
        self.inner.chat(history, options).await
    }

    async fn health_check(&self) -> HealthCheckResult {
        self.inner.health_check().await
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        self.inner.list_models().await
    }

    fn get_config(&self) -> ProviderConfig {
        self.inner.get_config()
    }

    fn update_config(&mut self, update: &ConfigUpdate) {
        self.inner.update_config(update);
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::OpenRouter
    }

    fn model_name(&self) -> &str {
        self.inner.model_name()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openrouter_config() -> ProviderConfig {
        ProviderConfig::OpenRouter {
            model: "openai/gpt-4o-mini".to_string(),
            timeout_ms: 60_000,
            site_url: Some("https://example.com".to_string()),
            app_name: Some("cmdsage".to_string()),
        }
    }

    #[test]
    fn test_client_creation() {
        let client = OpenRouterClient::new(openrouter_config(), "test-key".to_string()).unwrap();
        assert_eq!(client.provider_kind(), ProviderKind::OpenRouter);
        assert_eq!(client.model_name(), "openai/gpt-4o-mini");
    }

    #[test]
    fn test_config_round_trips_through_inner() {
        let client = OpenRouterClient::new(openrouter_config(), "test-key".to_string()).unwrap();
        assert_eq!(client.get_config(), openrouter_config());
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = OpenRouterClient::new(openrouter_config(), String::new()).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_rejects_other_kind() {
        let config = ProviderConfig::default_for(ProviderKind::Local);
        let err = OpenRouterClient::new(config, "test-key".to_string()).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
