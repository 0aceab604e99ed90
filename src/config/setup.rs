// Interactive setup flow
//
// A sequential scripted dialogue: one ordered pass over the supported
// backends, each step prompting, validating, and storing. The flow reads
// and writes through generic seams so tests can feed a scripted sequence
// of answers and assert the resulting config.
//
// API keys are never written into the config document. For a
// credential-bearing backend the flow offers to append an `export` line to
// the user's shell profile, and on acceptance also sets the variable in
// the current process so this run can proceed without a restart.

use std::collections::HashMap;
use std::fs::OpenOptions;
use std::io::{BufRead, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use super::settings::{AppConfig, ProviderConfig};
use crate::providers::factory::{ENV_ANTHROPIC_KEY, ENV_OPENAI_KEY, ENV_OPENROUTER_KEY};
use crate::providers::types::ProviderKind;

/// Prompt-driven configuration dialogue.
pub struct SetupFlow<R, W> {
    input: R,
    output: W,
    /// Shell profile to receive `export` lines. Resolved from $SHELL when
    /// not set explicitly (tests inject a temp path).
    profile_path: Option<PathBuf>,
}

impl<R: BufRead, W: Write> SetupFlow<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            profile_path: None,
        }
    }

    pub fn with_profile_path(mut self, path: PathBuf) -> Self {
        self.profile_path = Some(path);
        self
    }

    /// Walk the backends in order, pre-filling defaults from `existing`.
    /// Declined backends are left absent, never half-written.
    pub fn run(&mut self, existing: &AppConfig) -> Result<AppConfig> {
        writeln!(self.output, "cmdsage setup")?;
        writeln!(
            self.output,
            "Answer the prompts to configure one or more providers.\n"
        )?;

        let mut providers: HashMap<String, ProviderConfig> = HashMap::new();

        for kind in ProviderKind::all() {
            let name = kind.as_str();
            let previous = existing.providers.get(name);
            let wanted = self.confirm(
                &format!("Configure the {name} provider?"),
                previous.is_some(),
            )?;
            if !wanted {
                continue;
            }

            let entry = self.configure_backend(kind, previous)?;
            providers.insert(name.to_string(), entry);
        }

        if providers.is_empty() {
            writeln!(
                self.output,
                "\nNo providers configured; keeping the built-in local default."
            )?;
            return Ok(AppConfig::default());
        }

        let mut names: Vec<&str> = providers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        let default_current = if providers.contains_key(&existing.current_provider) {
            existing.current_provider.clone()
        } else {
            names[0].to_string()
        };

        let current = loop {
            let answer = self.prompt(
                &format!("Default provider ({})", names.join(", ")),
                &default_current,
            )?;
            if providers.contains_key(&answer) {
                break answer;
            }
            writeln!(self.output, "  {answer:?} is not one of the configured providers.")?;
        };

        Ok(AppConfig {
            current_provider: current,
            providers,
        })
    }

    fn configure_backend(
        &mut self,
        kind: ProviderKind,
        previous: Option<&ProviderConfig>,
    ) -> Result<ProviderConfig> {
        let defaults = ProviderConfig::default_for(kind);
        let base = previous.unwrap_or(&defaults);

        let model = self.prompt("  Model", base.model())?;
        let timeout_ms = self.prompt_number("  Timeout (ms)", base.timeout_ms())?;

        let entry = match kind {
            ProviderKind::Local => {
                let host_url =
                    self.prompt("  Host URL", base.host_url().unwrap_or_default())?;
                ProviderConfig::Local {
                    host_url,
                    model,
                    timeout_ms,
                }
            }
            ProviderKind::OpenAi => {
                self.ensure_credential(ENV_OPENAI_KEY)?;
                let base_url = self.prompt_optional("  Base URL (blank for default)")?;
                let organization_id =
                    self.prompt_optional("  Organization ID (blank for none)")?;
                ProviderConfig::OpenAi {
                    model,
                    timeout_ms,
                    base_url,
                    organization_id,
                }
            }
            ProviderKind::Anthropic => {
                self.ensure_credential(ENV_ANTHROPIC_KEY)?;
                ProviderConfig::Anthropic { model, timeout_ms }
            }
            ProviderKind::OpenRouter => {
                self.ensure_credential(ENV_OPENROUTER_KEY)?;
                let site_url = self.prompt_optional("  Site URL (blank for none)")?;
                let app_name = self.prompt_optional("  App name (blank for none)")?;
                ProviderConfig::OpenRouter {
                    model,
                    timeout_ms,
                    site_url,
                    app_name,
                }
            }
        };

        Ok(entry)
    }

    /// Credential step: never stored in the config document. The key goes
    /// into the shell profile (if accepted) and the current process.
    fn ensure_credential(&mut self, var: &str) -> Result<()> {
        if std::env::var(var).map(|v| !v.trim().is_empty()).unwrap_or(false) {
            writeln!(self.output, "  {var} is already set in the environment.")?;
            return Ok(());
        }

        let key = self.prompt_optional(&format!("  API key ({var}, blank to skip)"))?;
        let Some(key) = key else {
            writeln!(
                self.output,
                "  No key entered; set {var} before using this provider."
            )?;
            return Ok(());
        };

        let export_line = format!("export {var}=\"{key}\"");
        if self.confirm("  Append the export line to your shell profile?", true)? {
            match self.append_to_profile(&export_line) {
                Ok(path) => writeln!(self.output, "  Added to {}.", path.display())?,
                Err(e) => {
                    warn!("could not write shell profile: {e:#}");
                    writeln!(
                        self.output,
                        "  Could not update your shell profile; add this line yourself:\n    {export_line}"
                    )?;
                }
            }
        } else {
            writeln!(
                self.output,
                "  Add this line to your shell profile to persist the key:\n    {export_line}"
            )?;
        }

        // Make the key visible to this run as well
        std::env::set_var(var, &key);
        Ok(())
    }

    fn append_to_profile(&self, line: &str) -> Result<PathBuf> {
        let path = match &self.profile_path {
            Some(path) => path.clone(),
            None => detect_shell_profile()?,
        };
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .with_context(|| format!("failed to open {}", path.display()))?;
        writeln!(file, "{line}")?;
        Ok(path)
    }

    fn prompt(&mut self, question: &str, default: &str) -> Result<String> {
        write!(self.output, "{question} [{default}]: ")?;
        self.output.flush()?;
        let answer = self.read_line()?;
        Ok(if answer.is_empty() {
            default.to_string()
        } else {
            answer
        })
    }

    fn prompt_optional(&mut self, question: &str) -> Result<Option<String>> {
        write!(self.output, "{question}: ")?;
        self.output.flush()?;
        let answer = self.read_line()?;
        Ok((!answer.is_empty()).then_some(answer))
    }

    fn prompt_number(&mut self, question: &str, default: u64) -> Result<u64> {
        loop {
            let answer = self.prompt(question, &default.to_string())?;
            match answer.parse() {
                Ok(value) => return Ok(value),
                Err(_) => writeln!(self.output, "  Enter a whole number of milliseconds.")?,
            }
        }
    }

    fn confirm(&mut self, question: &str, default_yes: bool) -> Result<bool> {
        let hint = if default_yes { "Y/n" } else { "y/N" };
        write!(self.output, "{question} [{hint}]: ")?;
        self.output.flush()?;
        let answer = self.read_line()?.to_lowercase();
        Ok(match answer.as_str() {
            "" => default_yes,
            "y" | "yes" => true,
            _ => false,
        })
    }

    /// EOF reads as an empty answer, which takes the default.
    fn read_line(&mut self) -> Result<String> {
        let mut line = String::new();
        self.input.read_line(&mut line)?;
        Ok(line.trim().to_string())
    }
}

fn detect_shell_profile() -> Result<PathBuf> {
    let home = dirs::home_dir().context("could not determine home directory")?;
    let shell = std::env::var("SHELL").unwrap_or_default();
    let profile = if shell.contains("zsh") {
        ".zshrc"
    } else if shell.contains("bash") {
        ".bashrc"
    } else {
        ".profile"
    };
    Ok(home.join(profile))
}
