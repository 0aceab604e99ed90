// Multi-provider LLM support
//
// This module provides an abstraction layer over the supported chat
// backends (Ollama, OpenAI, Anthropic, OpenRouter), allowing the session
// layer to swap providers at runtime behind a unified interface.

use async_trait::async_trait;

pub mod anthropic;
pub mod error;
pub mod factory;
pub mod ollama;
pub mod openai;
pub mod openrouter;
pub mod types;

// Re-export commonly used types
pub use error::ProviderError;
pub use factory::{create, create_from_app_config, EnvOverrides};
pub use types::{ChatMessage, ChatOptions, HealthCheckResult, ProviderKind, Role};

use crate::config::{ConfigUpdate, ProviderConfig};

/// Trait implemented by every backend adapter.
///
/// All of the wire-level differences (chat-streaming RPC against a local
/// daemon, request/response or SSE streaming over HTTPS with bearer-style
/// credentials) are normalized to: send the ordered message sequence, get
/// text back, optionally get incremental text through `ChatOptions`.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Send the full ordered conversation and return the response text.
    ///
    /// When `options.on_chunk` is set the adapter delivers each incremental
    /// fragment through it as the fragment arrives, and still returns the
    /// full concatenated text. A request exceeding the configured timeout
    /// is cancelled and fails with `ProviderError::Timeout`.
    async fn chat(
        &self,
        history: &[ChatMessage],
        options: ChatOptions<'_>,
    ) -> Result<String, ProviderError>;

    /// Cheapest round-trip that proves the backend is reachable.
    ///
    /// Never fails: every error folds into `healthy: false` with the
    /// failure text. Capped at 5 seconds regardless of the configured chat
    /// timeout, so diagnostics stay responsive.
    async fn health_check(&self) -> HealthCheckResult;

    /// Model names the backend offers, in the backend's order.
    ///
    /// Backends without a models endpoint return a fixed known-good set
    /// instead of failing.
    async fn list_models(&self) -> Result<Vec<String>, ProviderError>;

    /// Snapshot of the adapter's live configuration.
    fn get_config(&self) -> ProviderConfig;

    /// Merge a partial update into the live configuration.
    ///
    /// Updates that change transport identity (the local host URL, the
    /// timeout) rebuild the adapter's internal HTTP client.
    fn update_config(&mut self, update: &ConfigUpdate);

    /// Backend kind, for command dispatch.
    fn provider_kind(&self) -> ProviderKind;

    /// Active model name, for prompt rendering.
    fn model_name(&self) -> &str;
}
