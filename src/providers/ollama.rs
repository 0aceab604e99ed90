// Ollama (local daemon) provider implementation
//
// Dual transport: a persistent pooled HTTP client is preferred, but if its
// construction fails every operation degrades to a one-shot client with the
// same timeout semantics. Streaming chat decodes newline-delimited JSON.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::stream::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::ProviderError;
use super::types::{ChatMessage, ChatOptions, HealthCheckResult, ProviderKind};
use super::ProviderClient;
use crate::config::{ConfigUpdate, ProviderConfig};

const HEALTH_CHECK_TIMEOUT_SECS: u64 = 5;

/// Ollama chat client.
///
/// Talks to a local Ollama daemon over `POST {host}/api/chat` (buffered and
/// NDJSON-streamed) and `GET {host}/api/tags` for model listing.
#[derive(Debug)]
pub struct OllamaClient {
    config: ProviderConfig,
    /// Preferred transport. `None` means the builder failed and every call
    /// uses a fresh one-shot client instead.
    client: Option<Client>,
}

impl OllamaClient {
    pub fn new(config: ProviderConfig) -> Result<Self, ProviderError> {
        if config.kind() != ProviderKind::Local {
            return Err(ProviderError::Configuration(format!(
                "expected a local provider config, got kind {:?}",
                config.kind()
            )));
        }

        let client = Self::build_client(config.timeout_ms());
        Ok(Self { config, client })
    }

    fn build_client(timeout_ms: u64) -> Option<Client> {
        match Client::builder()
            .timeout(Duration::from_millis(timeout_ms))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
        {
            Ok(client) => Some(client),
            Err(e) => {
                warn!("failed to build pooled HTTP client, falling back to one-shot requests: {e}");
                None
            }
        }
    }

    fn host_url(&self) -> &str {
        // The constructor guarantees a Local config
        self.config.host_url().unwrap_or_default()
    }

    /// Persistent client when available, otherwise a fresh one-shot client
    /// carrying the same timeout.
    fn transport(&self) -> Result<Client, ProviderError> {
        if let Some(client) = &self.client {
            return Ok(client.clone());
        }
        Client::builder()
            .timeout(Duration::from_millis(self.config.timeout_ms()))
            .build()
            .map_err(|e| {
                ProviderError::Configuration(format!("failed to build HTTP client: {e}"))
            })
    }

    async fn chat_buffered(&self, request: &OllamaChatRequest<'_>) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.host_url());
        debug!(url = %url, model = request.model, "sending chat request");

        let response = self
            .transport()?
            .post(&url)
            .json(request)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let reply: OllamaChatResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        Ok(reply.message.map(|m| m.content).unwrap_or_default())
    }

    async fn chat_streaming(
        &self,
        request: &OllamaChatRequest<'_>,
        on_chunk: &mut (dyn FnMut(&str) + Send),
    ) -> Result<String, ProviderError> {
        let url = format!("{}/api/chat", self.host_url());
        debug!(url = %url, model = request.model, "sending streaming chat request");

        let response = self
            .transport()?
            .post(&url)
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

        while let Some(chunk) = stream.next().await {
            let bytes =
                chunk.map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;
            buffer.extend_from_slice(&bytes);

            // One JSON object per line
            while let Some(newline_pos) = buffer.iter().position(|&b| b == b'\n') {
                let line_bytes: Vec<u8> = buffer.drain(..=newline_pos).collect();
                let line = String::from_utf8_lossy(&line_bytes);
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                // Partial network frames produce malformed lines; skip them
                let frame: OllamaChatResponse = match serde_json::from_str(line) {
                    Ok(frame) => frame,
                    Err(e) => {
                        warn!("skipping malformed stream line: {e}");
                        continue;
                    }
                };

                if let Some(message) = frame.message {
                    if !message.content.is_empty() {
                        full_text.push_str(&message.content);
                        on_chunk(&message.content);
                    }
                }
                if frame.done {
                    return Ok(full_text);
                }
            }
        }

        Ok(full_text)
    }
}

#[async_trait]
impl ProviderClient for OllamaClient {
    async fn chat(
        &self,
        history: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<String, ProviderError> {
        let mut options = options;
        let streaming = options.on_chunk.is_some();

        let request = OllamaChatRequest {
            model: self.config.model(),
            messages: history
                .iter()
                .map(|m| OllamaMessage {
                    role: m.role.as_str().to_string(),
                    content: m.content.clone(),
                })
                .collect(),
            stream: streaming,
            format: options.json_only.then_some("json"),
        };

        match options.on_chunk.take() {
            Some(cb) => self.chat_streaming(&request, cb).await,
            None => self.chat_buffered(&request).await,
        }
    }

    async fn health_check(&self) -> HealthCheckResult {
        let started = Instant::now();
        let url = format!("{}/api/tags", self.host_url());

        // Per-request cap so diagnostics never block on a long chat timeout
        let result = async {
            let response = self
                .transport()?
                .get(&url)
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

            let tags: OllamaTagsResponse = response.json().await.map_err(|e| {
                ProviderError::from_reqwest(e, HEALTH_CHECK_TIMEOUT_SECS * 1000)
            })?;
            Ok(tags.models.into_iter().map(|m| m.name).collect::<Vec<_>>())
        }
        .await;

        let elapsed_ms = started.elapsed().as_millis() as u64;
        match result {
            Ok(models) => HealthCheckResult::ok(Some(models), elapsed_ms),
            Err(e) => HealthCheckResult::failed(e.to_string(), elapsed_ms),
        }
    }

    async fn list_models(&self) -> Result<Vec<String>, ProviderError> {
        let url = format!("{}/api/tags", self.host_url());
        let response = self
            .transport()?
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::from_status(status.as_u16(), &body));
        }

        let tags: OllamaTagsResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::from_reqwest(e, self.config.timeout_ms()))?;
        Ok(tags.models.into_iter().map(|m| m.name).collect())
    }

    fn get_config(&self) -> ProviderConfig {
        self.config.clone()
    }

    fn update_config(&mut self, update: &ConfigUpdate) {
        self.config.apply_update(update);
        // Host or timeout changes invalidate the pooled client
        if update.host_url.is_some() || update.timeout_ms.is_some() {
            self.client = Self::build_client(self.config.timeout_ms());
        }
    }

    fn provider_kind(&self) -> ProviderKind {
        ProviderKind::Local
    }

    fn model_name(&self) -> &str {
        self.config.model()
    }
}

// Ollama API types

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: Vec<OllamaMessage>,
    stream: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    format: Option<&'a str>,
}

#[derive(Debug, Serialize, Deserialize)]
struct OllamaMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    #[serde(default)]
    message: Option<OllamaMessage>,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct OllamaTagsResponse {
    #[serde(default)]
    models: Vec<OllamaModel>,
}

#[derive(Debug, Deserialize)]
struct OllamaModel {
    name: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn local_config() -> ProviderConfig {
        ProviderConfig::default_for(ProviderKind::Local)
    }

    #[test]
    fn test_client_creation() {
        let client = OllamaClient::new(local_config()).unwrap();
        assert_eq!(client.provider_kind(), ProviderKind::Local);
        assert!(client.client.is_some());
    }

    #[test]
    fn test_rejects_cloud_config() {
        let config = ProviderConfig::default_for(ProviderKind::OpenAi);
        let err = OllamaClient::new(config).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_update_config_rebuilds_client_on_host_change() {
        let mut client = OllamaClient::new(local_config()).unwrap();
        client.update_config(&ConfigUpdate::host("http://10.0.0.5:11434"));
        assert_eq!(client.host_url(), "http://10.0.0.5:11434");
        assert!(client.client.is_some());
    }

    #[test]
    fn test_update_config_keeps_kind() {
        let mut client = OllamaClient::new(local_config()).unwrap();
        client.update_config(&ConfigUpdate::model("codellama"));
        assert_eq!(client.provider_kind(), ProviderKind::Local);
        assert_eq!(client.model_name(), "codellama");
    }
}
