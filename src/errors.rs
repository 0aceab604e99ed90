// User-friendly error messages
//
// Provides helpers to convert provider errors into actionable messages
// that guide users toward solutions.

use crate::providers::{ProviderError, ProviderKind};

/// Render a provider error with a suggestion the user can act on.
pub fn render_error(err: &ProviderError, kind: ProviderKind) -> String {
    let mut out = format!("\x1b[1;31mError:\x1b[0m {err}");
    if let Some(hint) = guidance(err, kind) {
        out.push_str(&format!("\n\x1b[1;33mTry:\x1b[0m {hint}"));
    }
    out
}

/// Actionable hint for an error class, when one exists.
pub fn guidance(err: &ProviderError, kind: ProviderKind) -> Option<String> {
    match err {
        ProviderError::Timeout { ms } => Some(format!(
            "the request exceeded {ms}ms; raise timeout_ms in the provider config or switch to a smaller model with /model"
        )),
        ProviderError::Transport { status, message } => match status {
            Some(401) | Some(403) => Some(format!(
                "the credential was rejected; check that {} holds a valid key",
                credential_var(kind)
            )),
            Some(404) => Some(
                "the model or endpoint was not found; check the model name with /models".to_string(),
            ),
            Some(429) => Some("the provider is rate limiting; wait and retry".to_string()),
            None if kind == ProviderKind::Local && message.contains("connect") => Some(
                "the local daemon is unreachable; start it with `ollama serve` or point /host at the right URL"
                    .to_string(),
            ),
            _ => None,
        },
        ProviderError::Configuration(_) => match kind {
            ProviderKind::Local => None,
            _ => Some(format!(
                "export {} or run `cmdsage setup`",
                credential_var(kind)
            )),
        },
        ProviderError::ProviderNotConfigured(name) => Some(format!(
            "add a {name:?} entry with `cmdsage setup`, or pick one of the configured providers with /provider"
        )),
        ProviderError::UnknownProviderKind(_) => {
            Some("known provider kinds are local, openai, anthropic, openrouter".to_string())
        }
        ProviderError::Api(_) => None,
    }
}

fn credential_var(kind: ProviderKind) -> &'static str {
    match kind {
        ProviderKind::OpenAi => "OPENAI_API_KEY",
        ProviderKind::Anthropic => "ANTHROPIC_API_KEY",
        ProviderKind::OpenRouter => "OPENROUTER_API_KEY",
        ProviderKind::Local => "OLLAMA_HOST",
    }
}
