// Provider-agnostic request/response types
//
// These types abstract over the wire formats of the individual backends
// (Ollama, OpenAI, Anthropic, OpenRouter) so the session layer works with a
// single message shape regardless of which adapter is live.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::error::ProviderError;

/// Message role in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One entry in the ordered conversation history.
///
/// The sequence is chronological with system message(s) first. History is
/// owned by the active session and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }
}

/// The closed family of supported backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Local,
    OpenAi,
    Anthropic,
    OpenRouter,
}

impl ProviderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderKind::Local => "local",
            ProviderKind::OpenAi => "openai",
            ProviderKind::Anthropic => "anthropic",
            ProviderKind::OpenRouter => "openrouter",
        }
    }

    /// All kinds, in the order setup walks through them.
    pub fn all() -> [ProviderKind; 4] {
        [
            ProviderKind::Local,
            ProviderKind::OpenAi,
            ProviderKind::Anthropic,
            ProviderKind::OpenRouter,
        ]
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = ProviderError;

    /// Parse a backend name. This is the boundary where an unrecognized
    /// name becomes `UnknownProviderKind`; past this point the kind is a
    /// closed enum and cannot be invalid.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "local" | "ollama" => Ok(ProviderKind::Local),
            "openai" => Ok(ProviderKind::OpenAi),
            "anthropic" | "claude" => Ok(ProviderKind::Anthropic),
            "openrouter" => Ok(ProviderKind::OpenRouter),
            other => Err(ProviderError::UnknownProviderKind(other.to_string())),
        }
    }
}

/// Per-call options for `ProviderClient::chat`.
///
/// Streaming is selected by the presence of `on_chunk`, not by a flag: when
/// the callback is set the adapter delivers each incremental text fragment
/// through it and still returns the full concatenated text at the end.
#[derive(Default)]
pub struct ChatOptions<'a> {
    pub on_chunk: Option<&'a mut (dyn FnMut(&str) + Send)>,
    /// Ask the backend for a JSON-only response where the wire protocol has
    /// such a mode (OpenAI `response_format`, Ollama `format`). Backends
    /// without one ignore it.
    pub json_only: bool,
}

impl<'a> ChatOptions<'a> {
    /// Buffered: no incremental delivery.
    pub fn buffered() -> Self {
        Self {
            on_chunk: None,
            json_only: false,
        }
    }

    /// Streaming: `cb` receives each fragment as it arrives.
    pub fn streaming(cb: &'a mut (dyn FnMut(&str) + Send)) -> Self {
        Self {
            on_chunk: Some(cb),
            json_only: false,
        }
    }

    pub fn json_only(mut self) -> Self {
        self.json_only = true;
        self
    }
}

impl fmt::Debug for ChatOptions<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChatOptions")
            .field("on_chunk", &self.on_chunk.is_some())
            .field("json_only", &self.json_only)
            .finish()
    }
}

/// Outcome of a reachability probe. Ephemeral, produced per diagnostic call.
#[derive(Debug, Clone, Default)]
pub struct HealthCheckResult {
    pub healthy: bool,
    pub models: Option<Vec<String>>,
    pub error: Option<String>,
    pub response_time_ms: Option<u64>,
}

impl HealthCheckResult {
    pub fn ok(models: Option<Vec<String>>, response_time_ms: u64) -> Self {
        Self {
            healthy: true,
            models,
            error: None,
            response_time_ms: Some(response_time_ms),
        }
    }

    pub fn failed(error: impl Into<String>, response_time_ms: u64) -> Self {
        Self {
            healthy: false,
            models: None,
            error: Some(error.into()),
            response_time_ms: Some(response_time_ms),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serializes_lowercase() {
        let msg = ChatMessage::user("hello");
        let json = serde_json::to_string(&msg).unwrap();
        assert!(json.contains(r#""role":"user""#));
    }

    #[test]
    fn test_kind_parse_aliases() {
        assert_eq!("ollama".parse::<ProviderKind>().unwrap(), ProviderKind::Local);
        assert_eq!("claude".parse::<ProviderKind>().unwrap(), ProviderKind::Anthropic);
        assert_eq!("OpenAI".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!(
            "openrouter".parse::<ProviderKind>().unwrap(),
            ProviderKind::OpenRouter
        );
    }

    #[test]
    fn test_kind_parse_unknown() {
        let err = "gemini".parse::<ProviderKind>().unwrap_err();
        assert!(matches!(err, ProviderError::UnknownProviderKind(name) if name == "gemini"));
    }

    #[test]
    fn test_kind_round_trips_through_display() {
        for kind in ProviderKind::all() {
            let parsed: ProviderKind = kind.to_string().parse().unwrap();
            assert_eq!(parsed, kind);
        }
    }

    #[test]
    fn test_health_check_constructors() {
        let ok = HealthCheckResult::ok(Some(vec!["m".to_string()]), 12);
        assert!(ok.healthy);
        assert_eq!(ok.response_time_ms, Some(12));

        let failed = HealthCheckResult::failed("unreachable", 5000);
        assert!(!failed.healthy);
        assert_eq!(failed.error.as_deref(), Some("unreachable"));
    }
}
