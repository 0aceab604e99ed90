// Interactive session
//
// Holds one live provider client, the app configuration, and the bounded
// conversation history. Exactly one chat exchange is in flight at a time:
// the read loop is suspended while a response is awaited, so history needs
// no locking.

use anyhow::Result;
use tracing::warn;

use super::commands::{format_help, Command};
use super::conversation::ConversationHistory;
use super::input::InputHandler;
use super::render::render_answer;
use crate::config::{AppConfig, ConfigStore, ConfigUpdate};
use crate::errors::render_error;
use crate::prompt::SYSTEM_PROMPT;
use crate::providers::{
    factory, ChatMessage, ChatOptions, EnvOverrides, ProviderClient, ProviderError, ProviderKind,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionState {
    Idle,
    AwaitingResponse,
}

/// The interactive read-eval-print loop.
pub struct Session {
    client: Box<dyn ProviderClient>,
    app_config: AppConfig,
    store: ConfigStore,
    env: EnvOverrides,
    history: ConversationHistory,
    state: SessionState,
}

impl Session {
    pub fn new(
        client: Box<dyn ProviderClient>,
        app_config: AppConfig,
        store: ConfigStore,
        env: EnvOverrides,
    ) -> Self {
        Self {
            client,
            app_config,
            store,
            env,
            history: ConversationHistory::new(SYSTEM_PROMPT),
            state: SessionState::Idle,
        }
    }

    /// Run the interactive loop until the user exits.
    pub async fn run(&mut self) -> Result<()> {
        println!(
            "cmdsage - ask for a command in plain language. /help for commands, /exit to quit."
        );

        let mut input = InputHandler::new()?;
        loop {
            let prompt = format!(
                "\x1b[1;32m{}\x1b[0m:{} > ",
                self.client.provider_kind(),
                self.client.model_name()
            );
            let line = match input.read_line(&prompt)? {
                Some(line) => line,
                None => break, // Ctrl+C / Ctrl+D
            };

            if self.handle_line(&line).await? {
                break;
            }
        }

        if let Err(e) = input.save_history() {
            warn!("could not save input history: {e:#}");
        }
        println!("Goodbye!");
        Ok(())
    }

    /// Process one line of input. Returns true when the session should end.
    pub async fn handle_line(&mut self, line: &str) -> Result<bool> {
        if line.trim().is_empty() {
            return Ok(false);
        }

        if let Some(command) = Command::parse(line) {
            return self.handle_command(command).await;
        }

        self.process_question(line.trim()).await;
        Ok(false)
    }

    /// One question/answer turn.
    ///
    /// The user message stays in history even when the call fails, so a
    /// failed turn still occupies a trim slot.
    async fn process_question(&mut self, question: &str) {
        debug_assert_eq!(self.state, SessionState::Idle, "one exchange in flight at a time");
        self.history.push_user(question);

        self.state = SessionState::AwaitingResponse;
        // Streamed fragments feed a progress indicator; the answer itself
        // is rendered only once it is complete
        let mut on_progress = |_: &str| {
            eprint!(".");
        };
        let options = ChatOptions::streaming(&mut on_progress).json_only();
        let result = self.client.chat(self.history.messages(), options).await;
        self.state = SessionState::Idle;
        eprintln!();

        match result {
            Ok(reply) => {
                println!("{}", render_answer(&reply));
                self.history.push_assistant(reply);
            }
            Err(e) => {
                eprintln!("{}", render_error(&e, self.client.provider_kind()));
            }
        }
    }

    async fn handle_command(&mut self, command: Command) -> Result<bool> {
        match command {
            Command::Quit => return Ok(true),
            Command::Help => println!("{}", format_help()),
            Command::Clear => {
                self.history.clear();
                println!("Conversation cleared.");
            }
            Command::History => self.show_history(),
            Command::Provider(None) => self.list_providers(),
            Command::Provider(Some(name)) => self.switch_provider(&name),
            Command::Model(None) => {
                println!("Active model: {}", self.client.model_name());
            }
            Command::Model(Some(name)) => self.change_model(&name),
            Command::Host(None) => match self.client.get_config().host_url() {
                Some(host) => println!("Local host: {host}"),
                None => println!(
                    "/host applies to the local provider; the active provider is {}.",
                    self.client.provider_kind()
                ),
            },
            Command::Host(Some(url)) => self.change_host(&url),
            Command::Models => match self.client.list_models().await {
                Ok(models) if models.is_empty() => println!("The provider reports no models."),
                Ok(models) => {
                    for model in models {
                        println!("  {model}");
                    }
                }
                Err(e) => eprintln!("{}", render_error(&e, self.client.provider_kind())),
            },
            Command::Health => {
                let result = self.client.health_check().await;
                let elapsed = result
                    .response_time_ms
                    .map(|ms| format!(" ({ms}ms)"))
                    .unwrap_or_default();
                if result.healthy {
                    let models = result
                        .models
                        .map(|m| format!(", {} models available", m.len()))
                        .unwrap_or_default();
                    println!("\x1b[32mhealthy\x1b[0m{elapsed}{models}");
                } else {
                    println!(
                        "\x1b[1;31munhealthy\x1b[0m{elapsed}: {}",
                        result.error.unwrap_or_else(|| "unknown failure".to_string())
                    );
                }
            }
            Command::Unknown(text) => {
                eprintln!("Unknown command: {text}");
                eprintln!("Type /help for available commands.");
            }
        }
        Ok(false)
    }

    fn show_history(&self) {
        let messages = self.history.messages();
        println!("Conversation history ({} messages):", messages.len());
        for (i, msg) in messages.iter().enumerate() {
            let preview: String = msg.content.chars().take(60).collect();
            let ellipsis = if msg.content.chars().count() > 60 { "…" } else { "" };
            println!("  [{}] {}: {preview}{ellipsis}", i + 1, msg.role);
        }
    }

    fn list_providers(&self) {
        println!("Configured providers:");
        for name in self.app_config.provider_names() {
            let marker = if name == self.app_config.current_provider {
                "*"
            } else {
                " "
            };
            let kind = self
                .app_config
                .providers
                .get(name)
                .map(|entry| entry.kind().to_string())
                .unwrap_or_default();
            println!("  {marker} {name} ({kind})");
        }
    }

    /// Switch the live client to the named config entry.
    ///
    /// Four effects belong together: construct the new client, swap the
    /// live reference, update `current_provider`, persist. Construction
    /// failure aborts with nothing changed; a failed persist after the
    /// in-memory swap is surfaced as a divergence warning.
    fn switch_provider(&mut self, name: &str) {
        let Some(entry) = self.app_config.providers.get(name) else {
            let err = ProviderError::ProviderNotConfigured(name.to_string());
            eprintln!("{}", render_error(&err, self.client.provider_kind()));
            return;
        };

        let kind = entry.kind();
        match factory::create_with_env(entry, &self.env) {
            Ok(client) => {
                self.client = client;
                self.app_config.current_provider = name.to_string();
                self.persist();
                println!(
                    "Switched to {name} ({kind}), model {}. History is preserved.",
                    self.client.model_name()
                );
            }
            Err(e) => eprintln!("{}", render_error(&e, kind)),
        }
    }

    /// Mutate the active adapter and the matching config entry together.
    fn apply_update(&mut self, update: ConfigUpdate) {
        self.client.update_config(&update);
        let current = self.app_config.current_provider.clone();
        if let Some(entry) = self.app_config.providers.get_mut(&current) {
            entry.apply_update(&update);
        }
        self.persist();
    }

    fn change_model(&mut self, name: &str) {
        self.apply_update(ConfigUpdate::model(name));
        println!("Model set to {name}.");
    }

    fn change_host(&mut self, url: &str) {
        if self.client.provider_kind() != ProviderKind::Local {
            println!(
                "/host applies to the local provider; the active provider is {}.",
                self.client.provider_kind()
            );
            return;
        }
        self.apply_update(ConfigUpdate::host(url));
        println!("Local host set to {url}.");
    }

    /// Persist the in-memory config; on failure the live session and the
    /// on-disk file diverge until the next successful save.
    fn persist(&self) {
        if let Err(e) = self.store.save(&self.app_config) {
            warn!("failed to persist config: {e:#}");
            eprintln!(
                "\x1b[1;33mWarning:\x1b[0m could not save {}; the running session now differs from the saved config.",
                self.store.path().display()
            );
        }
    }

    #[cfg(test)]
    fn history_messages(&self) -> &[ChatMessage] {
        self.history.messages()
    }
}

/// Answer a single question outside the interactive loop.
pub async fn ask_once(
    client: &dyn ProviderClient,
    question: &str,
) -> Result<String, ProviderError> {
    let history = [
        ChatMessage::system(SYSTEM_PROMPT),
        ChatMessage::user(question),
    ];
    client.chat(&history, ChatOptions::buffered().json_only()).await
}
