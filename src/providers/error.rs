// Error taxonomy shared by all provider adapters

use thiserror::Error;

/// Errors produced by provider construction and provider calls.
///
/// The variants are deliberately coarse: callers dispatch on the class of
/// failure (bad config vs. unreachable host vs. exceeded budget) to render
/// different guidance, not on provider-specific details.
#[derive(Debug, Error)]
pub enum ProviderError {
    /// Missing or invalid credential / config field. Fatal at construction
    /// time, never deferred to the first call.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// A backend name that is not part of the known provider family.
    #[error("unknown provider kind: {0:?}")]
    UnknownProviderKind(String),

    /// A provider name referenced by the config but absent from the
    /// providers table.
    #[error("provider not configured: {0:?} (run `cmdsage setup` to add it)")]
    ProviderNotConfigured(String),

    /// Network or HTTP failure. `status` carries the upstream HTTP status
    /// when one was received; connection-level failures leave it empty.
    #[error("transport error: {message}")]
    Transport {
        status: Option<u16>,
        message: String,
    },

    /// A well-formed upstream error payload (quota exhausted, invalid
    /// model, empty choices) on an otherwise successful exchange.
    #[error("api error: {0}")]
    Api(String),

    /// The request exceeded the configured budget and was cancelled.
    #[error("request timed out after {ms}ms")]
    Timeout { ms: u64 },
}

impl ProviderError {
    /// Classify a reqwest error against the timeout budget it ran under.
    pub fn from_reqwest(err: reqwest::Error, timeout_ms: u64) -> Self {
        if err.is_timeout() {
            ProviderError::Timeout { ms: timeout_ms }
        } else {
            ProviderError::Transport {
                status: err.status().map(|s| s.as_u16()),
                message: err.to_string(),
            }
        }
    }

    /// Build a transport error from a non-2xx upstream response.
    pub fn from_status(status: u16, body: &str) -> Self {
        let message = if body.trim().is_empty() {
            format!("HTTP {}", status)
        } else {
            format!("HTTP {}: {}", status, body.trim())
        };
        ProviderError::Transport {
            status: Some(status),
            message,
        }
    }

    /// True for errors worth suggesting a longer timeout for.
    pub fn is_timeout(&self) -> bool {
        matches!(self, ProviderError::Timeout { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_status_includes_body() {
        let err = ProviderError::from_status(429, "rate limited");
        match err {
            ProviderError::Transport { status, message } => {
                assert_eq!(status, Some(429));
                assert!(message.contains("429"));
                assert!(message.contains("rate limited"));
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_from_status_empty_body() {
        let err = ProviderError::from_status(503, "  ");
        match err {
            ProviderError::Transport { message, .. } => {
                assert_eq!(message, "HTTP 503");
            }
            other => panic!("expected Transport, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout_display() {
        let err = ProviderError::Timeout { ms: 60_000 };
        assert!(err.to_string().contains("60000ms"));
        assert!(err.is_timeout());
    }
}
