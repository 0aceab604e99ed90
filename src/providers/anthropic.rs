// Anthropic API provider implementation
//
// The messages API uses a different role convention than the other cloud
// backends: system instructions travel in a top-level `system` field, not
// in the messages array. This adapter extracts them from the ordered
// history and sends only user/assistant turns as the conversation body.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::error::ProviderError;
use super::types::{ChatMessage, ChatOptions, HealthCheckResult, ProviderKind, Role};
use super::ProviderClient;
use crate::config::{ConfigUpdate, ProviderConfig};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const ANTHROPIC_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_TOKENS: u32 = 1024;
const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Models known to accept the messages API.
///
/// Anthropic has no models endpoint, so `list_models` returns this fixed
/// set instead of a network call.
const KNOWN_MODELS: &[&str] = &[
    "claude-sonnet-4-20250514",
    "claude-3-7-sonnet-20250219",
    "claude-3-5-sonnet-20241022",
    "claude-3-5-haiku-20241022",
];

/// Anthropic messages API client.
#[derive(Debug)]
pub struct AnthropicClient {
    config: ProviderConfig,
    api_key: String,
    base_url: String,
    client: Client,
}

impl AnthropicClient {
    pub fn new(config: ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        if config.kind() != ProviderKind::Anthropic {
            return Err(ProviderError::Configuration(format!(
                "expected an anthropic provider config, got kind {:?}",
                config.kind()
            )));
        }
        if api_key.trim().is_empty() {
            return Err(ProviderError::Configuration(
                "API key must not be empty".to_string(),
            ));
        }

        let client = Self::build_client(config.timeout_ms())?;
        Ok(Self {
            config,
            api_key,
            base_url: DEFAULT_BASE_URL.to_string(),
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

    fn request_builder(&self, url: &str) -> reqwest::RequestBuilder {
        self.client
            .post(url)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .header("content-type", "application/json")
    }

    /// Split the ordered history into the protocol's shape: system
    /// messages concatenated into one instruction, user/assistant turns
    /// as the conversation body.
    fn build_request(&self, history: &[ChatMessage], stream: bool) -> MessagesRequest {
        let system: Vec<&str> = history
            .iter()
            .filter(|m| m.role == Role::System)
            .map(|m| m.content.as_str())
            .collect();

        let messages = history
            .iter()
            .filter(|m| m.role != Role::System)
            .map(|m| WireMessage {
                role: m.role.as_str().to_string(),
                content: m.content.clone(),
            })
            .collect();

        MessagesRequest {
            model: self.config.model().to_string(),
            max_tokens: DEFAULT_MAX_TOKENS,
            system: (!system.is_empty()).then(|| system.join("\n\n")),
            messages,
            stream,
        }
    }

    async fn chat_buffered(&self, request: &MessagesRequest) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, model = %request.model, "sending messages request");

        let response = self
            .request_builder(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let reply: MessagesResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let text: String = reply
            .content
            .iter()
            .filter_map(|block| block.text.as_deref())
            .collect();
        if text.is_empty() && reply.content.is_empty() {
            return Err(ProviderError::Api(
                "response contained no content blocks".to_string(),
            ));
        }
        Ok(text)
    }

    async fn chat_streaming(
        &self,
        request: &MessagesRequest,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, ProviderError> {
        let url = format!("{}/v1/messages", self.base_url);
        debug!(url = %url, model = %request.model, "sending streaming messages request");

        let response = self
            .request_builder(&url)
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

                let Some(json_str) = line.strip_prefix("data: ") else {
                    continue;
                };
                let json_str = json_str.trim();

                if let Ok(event) = serde_json::from_str::<StreamEvent>(json_str) {
                    match event.event_type.as_str() {
                        "content_block_delta" => {
                            if let Some(text) = event.text() {
                                full_text.push_str(text);
                                on_chunk(text);
                            }
                        }
                        "message_stop" => break 'outer,
                        _ => {}
                    }
                }
            }
        }

        Ok(full_text)
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
    async fn chat(
        &self,
        history: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<String, ProviderError> {
        let mut options = options;
        let streaming = options.on_chunk.is_some();
        let request = self.build_request(history, streaming);

        match options.on_chunk.take() {
            Some(cb) => self.chat_streaming(&request, cb).await,
            None => self.chat_buffered(&request).await,
        }
    }

    /// No models endpoint exists, so the cheapest reachability proof is a
    /// 1-token completion.
    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let url = format!("{}/v1/messages", self.base_url);

        let probe = MessagesRequest {
            model: self.config.model().to_string(),
            max_tokens: 1,
            system: None,
            messages: vec![WireMessage {
                role: "user".to_string(),
                content: "ping".to_string(),
            }],
            stream: false,
        };

        let result = async {
            let response = self
                .request_builder(&url)
                .timeout(Duration::from_secs(HEALTH_CHECK_TIMEOUT_SECS))
                .json(&probe)
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
            Ok(())
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(()) => HealthCheckResult::ok(
                Some(KNOWN_MODELS.iter().map(|m| m.to_string()).collect()),
                elapsed_ms,
            ),
            Err(e) => HealthCheckResult::failed(e.to_string(), elapsed_ms),
        }
    }

    /// Documented data, not a network call.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        Ok(KNOWN_MODELS.iter().map(|m| m.to_string()).collect())
    }

    fn get_config(&self) -> ProviderConfig {
        self.config.clone()
    }

    fn update_config(&mut self, update: &ConfigUpdate) {
        self.config.apply_update(update);
        if update.timeout_ms.is_some() {
            if let Ok(client) = Self::build_client(self.config.timeout_ms()) {
                self.client = client;
            }
        }
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Anthropic
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

// Anthropic API types

#[derive(Debug, Clone, Serialize)]
struct MessagesRequest {
    model: String,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    messages: Vec<WireMessage>,
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

#[derive(Debug, Clone, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Clone, Deserialize)]
struct ContentBlock {
    #[serde(default)]
    text: Option<String>,
}

/// Server-sent event from the messages API stream.
#[derive(Debug, Clone, Deserialize)]
struct StreamEvent {
    #[serde(rename = "type")]
    event_type: String,
    #[serde(default)]
    delta: Option<StreamDelta>,
}

#[derive(Debug, Clone, Deserialize)]
struct StreamDelta {
    #[serde(rename = "type")]
    delta_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl StreamEvent {
    /// Text carried by this event, when it is a text delta.
    fn text(&self) -> Option<&str> {
        let delta = self.delta.as_ref()?;
        if delta.delta_type == "text_delta" {
            delta.text.as_deref()
        } else {
            None
        }
    }
}
