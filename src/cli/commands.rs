// Slash command handling

/// A parsed slash command from the session input loop.
///
/// Commands are dispatched by the session and never enter conversation
/// history.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Help,
    Quit,
    Clear,
    History,
    /// Bare form lists configured providers; with a name, switches.
    Provider(Option<String>),
    /// Bare form shows the active model; with a name, changes it.
    Model(Option<String>),
    /// Bare form shows the local host; with a URL, changes it.
    Host(Option<String>),
    Models,
    Health,
    Unknown(String),
}

impl Command {
    /// Parse a slash-prefixed line. Returns `None` for ordinary input.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if !trimmed.starts_with('/') {
            return None;
        }

        // Simple commands without arguments
        match trimmed {
            "/help" => return Some(Command::Help),
            "/quit" | "/exit" => return Some(Command::Quit),
            "/clear" | "/reset" => return Some(Command::Clear),
            "/history" => return Some(Command::History),
            "/models" => return Some(Command::Models),
            "/health" => return Some(Command::Health),
            "/provider" => return Some(Command::Provider(None)),
            "/model" => return Some(Command::Model(None)),
            "/host" => return Some(Command::Host(None)),
            _ => {}
        }

        if let Some(rest) = trimmed.strip_prefix("/provider ") {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(Command::Provider(Some(name.to_string())));
            }
            return Some(Command::Provider(None));
        }

        if let Some(rest) = trimmed.strip_prefix("/model ") {
            let name = rest.trim();
            if !name.is_empty() {
                return Some(Command::Model(Some(name.to_string())));
            }
            return Some(Command::Model(None));
        }

        if let Some(rest) = trimmed.strip_prefix("/host ") {
            let url = rest.trim();
            if !url.is_empty() {
                return Some(Command::Host(Some(url.to_string())));
            }
            return Some(Command::Host(None));
        }

        Some(Command::Unknown(trimmed.to_string()))
    }
}

pub fn format_help() -> String {
    "Available commands:\n\
     \x20 /help              Show this help message\n\
     \x20 /exit, /quit       Exit the session\n\
     \x20 /clear             Clear conversation history\n\
     \x20 /history           Show conversation history\n\
     \x20 /provider [name]   List providers, or switch to the named one\n\
     \x20 /model [name]      Show or change the active model\n\
     \x20 /host <url>        Change the local daemon host\n\
     \x20 /models            List models the provider offers\n\
     \x20 /health            Check whether the provider is reachable"
        .to_string()
}
