// OpenAI API provider implementation
//
// This adapter also carries the generic OpenAI-protocol transport: the
// OpenRouter provider is the same wire format against a different base URL
// with extra identification headers, so it wraps this client instead of
// duplicating the request building.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProviderError;
use super::types::{ChatMessage, ChatOptions, HealthCheckResult, ProviderKind};
use super::ProviderClient;
use crate::config::{ConfigUpdate, ProviderConfig};

const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Chat client speaking the OpenAI protocol.
///
/// `POST {base}/chat/completions` with bearer auth, buffered or SSE
/// streaming, `GET {base}/models` for listing. The base URL and extra
/// header set are parameters so one transport serves both OpenAI and
/// OpenRouter.
#[derive(Debug)]
pub struct OpenAiClient {
    config: ProviderConfig,
    api_key: String,
    base_url: String,
    extra_headers: Vec<(String, String)>,
    client: Client,
}

impl OpenAiClient {
    /// OpenAI-flavored client: default or config-supplied base URL, plus
    /// the organization header when an organization id is configured.
    pub fn new(config: ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let (base_url, extra_headers) = match &config {
            ProviderConfig::OpenAi {
                base_url,
                organization_id,
                ..
            } => {
                let base = base_url
                    .clone()
                    .unwrap_or_else(|| DEFAULT_BASE_URL.to_string());
                let headers = organization_id
                    .iter()
                    .map(|org| ("OpenAI-Organization".to_string(), org.clone()))
                    .collect();
                (base, headers)
            }
            other => {
                return Err(ProviderError::Configuration(format!(
                    "expected an openai provider config, got kind {:?}",
                    other.kind()
                )))
            }
        };

        Self::with_transport(config, api_key, base_url, extra_headers)
    }

    /// Generic OpenAI-protocol transport against an arbitrary base URL and
    /// header set. Used directly by the OpenRouter specialization.
    pub fn with_transport(
        config: ProviderConfig,
        api_key: String,
        base_url: String,
        extra_headers: Vec<(String, String)>,
    ) -> Result<Self, ProviderError> {
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Self::build_client(config.timeout_ms())?;
        Ok(Self {
            config,
            api_key,
            base_url: base_url.trim_end_matches('/').to_string(),
            extra_headers,
            client,
        })
    }

    /// Point the transport at a different host (gateway or test double).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    fn build_client(timeout_ms: u64) -> Result<Client, ProviderError> {
        Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .build()
            .map_err(|e| ProviderError::Configuration(format!("failed to build HTTP client: {e}")))
    }

    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .client
            .request(method, url)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json");
        for (name, value) in &self.extra_headers {
            builder = builder.header(name.as_str(), value.as_str());
        }
        builder
    }

    fn build_chat_request(
        &self,
        history: &[ChatMessage],
        json_only: bool,
        stream: bool,
    ) -> ChatCompletionRequest {
        ChatCompletionRequest {
            model: self.config.model().to_string(),
            messages: history
                .iter()
                .map(|m| WireMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            response_format: json_only.then(|| ResponseFormat {
                format_type: "json_object".to_string(),
            }),
            stream,
        }
    }

    async fn chat_buffered(&self, request: &ChatCompletionRequest) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %request.model, "sending chat completion request");

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let reply: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| ProviderError::Api("response contained no choices".to_string()))
    }

    async fn chat_streaming(
        &self,
        request: &ChatCompletionRequest,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        debug!(url = %url, model = %request.model, "sending streaming chat completion request");

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let mut stream = response.bytes_stream();
        let mut buffer: Vec<u8> = Vec::new();
        let mut full_text = String::new();

        'outer: while let Some(chunk) = stream.next().await {
            let bytes =
                chunk.map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;
            buffer.extend_from_slice(&bytes);

            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);

                // SSE format: "data: {...}\n"
                let Some(json_str) = line.strip_prefix("data: ") else {
                    continue;
                };
                let json_str = json_str.trim();
                if json_str == "[DONE]" {
                    break 'outer;
                }

                if let Ok(frame) = serde_json::from_str::<StreamFrame>(json_str) {
                    if let Some(choice) = frame.choices.into_iter().next() {
                        if let Some(content) = choice.delta.content {
                            if !content.is_empty() {
                                full_text.push_str(&content);
                                on_chunk(&content);
                            }
                        }
                    }
                }
            }
        }

        Ok(full_text)
    }
}

#[async_trait]
impl ProviderClient for OpenAiClient {
    async fn chat(
        &self,
        history: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<String, ProviderError> {
        let mut options = options;
        let streaming = options.on_chunk.is_some();
        let request = self.build_chat_request(history, options.json_only, streaming);

        match options.on_chunk.take() {
            Some(cb) => self.chat_streaming(&request, cb).await,
            None => self.chat_buffered(&request).await,
        }
    }

    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let url = format!("{}/models", self.base_url);

        let result = async {
            let response = self
                .request(reqwest::Method::GET, &url)
                .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
                .send()
                .await
                .map_err(|e| {
                    ProviderError::from_reqwest(e, HEALTH_CHECK_TIMEOUT_SECS * 1000)
                })?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(ProviderError::from_status(status.as_u16(), &body));
            }

            let models: ModelsResponse = response.json().await.map_err(|e| {
                ProviderError::from_reqwest(e, HEALTH_CHECK_TIMEOUT_SECS * 1000)
            })?;
            Ok(models.data.into_iter().map(|m| m.id).collect::<Vec<_>>())
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(models) => HealthCheckResult::ok(Some(models), elapsed_ms),
            Err(e) => HealthCheckResult::failed(e.to_string(), elapsed_ms),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/models", self.base_url);
        let response = self
            .request(reqwest::Method::GET, &url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let models: ModelsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;
        Ok(models.data.into_iter().map(|m| m.id).collect())
    }

    fn get_config(&self) -> ProviderConfig {
        self.config.clone()
    }

    fn update_config(&mut self, update: &ConfigUpdate) {
        self.config.apply_update(update);
        if let Some(base) = &update.base_url {
            // Only the OpenAI variant exposes a configurable base; the
            // OpenRouter base is fixed at construction
            if self.config.kind() == ProviderKind::OpenAi {
                self.base_url = base.trim_end_matches('/').to_string();
            }
        }
        if update.timeout_ms.is_some() {
            if let Ok(client) = Self::build_client(self.config.timeout_ms()) {
                self.client = client;
            }
        }
    }

    fn provider_kind(&self) -> ProviderKind {
        self.config.kind()
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

// OpenAI API types

#[derive(Debug, Clone, Serialize)]
struct ChatCompletionRequest {
    model: String,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
    #[serde(skip_serializing_if = "is_false")]
    stream: bool,
}

fn is_false(b: &bool) -> bool {
    !*b
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct WireMessage {
    role: String,
    content: String,
}

#[derive(Debug, Clone, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    format_type: String,
}

#[derive(Debug, Clone, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Clone, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Clone, Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

// Streaming types

#[derive(Debug, Clone, Deserialize)]
struct StreamFrame {
    choices: Vec<StreamChoice>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamChoice {
    delta: Delta,
}

#[derive(Debug, Clone, Deserialize)]
struct Delta {
    content: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelsResponse {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Clone, Deserialize)]
struct ModelEntry {
    id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn openai_config() -> ProviderConfig {
        ProviderConfig::default_for(ProviderKind::OpenAi)
    }

    #[test]
    fn test_client_creation() {
        let client = OpenAiClient::new(openai_config(), "test-key".to_string()).unwrap();
        assert_eq!(client.provider_kind(), ProviderKind::OpenAi);
        assert_eq!(client.base_url, DEFAULT_BASE_URL);
    }

    #[test]
    fn test_empty_key_rejected() {
        let err = OpenAiClient::new(openai_config(), "  ".to_string()).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_organization_header_from_config() {
        let config = ProviderConfig::OpenAi {
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 60_000,
            base_url: None,
            organization_id: Some("org-123".to_string()),
        };
        let client = OpenAiClient::new(config, "test-key".to_string()).unwrap();
        assert_eq!(
            client.extra_headers,
            vec![("OpenAI-Organization".to_string(), "org-123".to_string())]
        );
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let config = ProviderConfig::OpenAi {
            model: "gpt-4o-mini".to_string(),
            timeout_ms: 60_000,
            base_url: Some("https://proxy.example.com/v1/".to_string()),
            organization_id: None,
        };
        let client = OpenAiClient::new(config, "test-key".to_string()).unwrap();
        assert_eq!(client.base_url, "https://proxy.example.com/v1");
    }

    #[test]
    fn test_request_serialization_skips_defaults() {
        let client = OpenAiClient::new(openai_config(), "test-key".to_string()).unwrap();
        let request = client.build_chat_request(&[ChatMessage::user("hi")], false, false);
        let json = serde_json::to_string(&request).unwrap();
        assert!(!json.contains("stream"));
        assert!(!json.contains("response_format"));

        let request = client.build_chat_request(&[ChatMessage::user("hi")], true, true);
        let json = serde_json::to_string(&request).unwrap();
        assert!(json.contains(r#""stream":true"#));
        assert!(json.contains(r#""type":"json_object""#));
    }
}
