// Answer presentation
//
// The session transports the model's reply as an opaque string; only this
// leaf tries to interpret it. A reply matching the structured answer
// schema is pretty-printed with the risk level colorized, anything else
// falls back to raw text.

use serde::Deserialize;

#[derive(Debug, Deserialize)]
struct Answer {
    command: String,
    #[serde(default)]
    explanation: String,
    #[serde(default)]
    risk: Option<String>,
}

/// Render a model reply for the terminal.
pub fn render_answer(raw: &str) -> String {
    let candidate = strip_code_fence(raw.trim());

    let Ok(answer) = serde_json::from_str::<Answer>(candidate) else {
        return raw.trim().to_string();
    };

    let mut out = format!("\x1b[1;36m$ {}\x1b[0m", answer.command);
    if !answer.explanation.is_empty() {
        out.push_str(&format!("\n  {}", answer.explanation));
    }
    if let Some(risk) = &answer.risk {
        out.push_str(&format!("\n  risk: {}", colorize_risk(risk)));
    }
    out
}

/// Models often wrap JSON in a markdown code fence despite instructions.
fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.trim_start_matches(['\r', '\n'])
        .trim_end_matches('`')
        .trim()
}

fn colorize_risk(risk: &str) -> String {
    let color = match risk.to_lowercase().as_str() {
        "low" | "safe" => "\x1b[32m",
        "medium" | "moderate" => "\x1b[33m",
        "high" | "dangerous" => "\x1b[1;31m",
        _ => "\x1b[0m",
    };
    format!("{color}{risk}\x1b[0m")
}
