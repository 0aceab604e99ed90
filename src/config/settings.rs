// Configuration schema
//
// The persisted document is a JSON file with a current provider name and a
// table of named provider entries. Older releases wrote a flat
// single-backend document; that shape is kept here as `LegacyConfig` so the
// store can detect and migrate it.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use crate::providers::types::ProviderKind;

pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;
pub const DEFAULT_LOCAL_HOST: &str = "http://localhost:11434";
pub const DEFAULT_LOCAL_MODEL: &str = "llama3.2";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
pub const DEFAULT_ANTHROPIC_MODEL: &str = "claude-sonnet-4-20250514";
pub const DEFAULT_OPENROUTER_MODEL: &str = "openai/gpt-4o-mini";

fn default_timeout_ms() -> u64 {
    DEFAULT_TIMEOUT_MS
}

fn default_local_host() -> String {
    DEFAULT_LOCAL_HOST.to_string()
}

fn default_local_model() -> String {
    DEFAULT_LOCAL_MODEL.to_string()
}

fn default_openai_model() -> String {
    DEFAULT_OPENAI_MODEL.to_string()
}

fn default_anthropic_model() -> String {
    DEFAULT_ANTHROPIC_MODEL.to_string()
}

fn default_openrouter_model() -> String {
    DEFAULT_OPENROUTER_MODEL.to_string()
}

/// Per-provider configuration, tagged by backend kind.
///
/// `kind` is fixed once an adapter is constructed from the entry; `model`,
/// `timeout_ms` and the kind-specific transport fields stay mutable through
/// `ProviderClient::update_config`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum ProviderConfig {
    Local {
        #[serde(default = "default_local_host")]
        host_url: String,
        #[serde(default = "default_local_model")]
        model: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    OpenAi {
        #[serde(default = "default_openai_model")]
        model: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        base_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        organization_id: Option<String>,
    },
    Anthropic {
        #[serde(default = "default_anthropic_model")]
        model: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
    },
    OpenRouter {
        #[serde(default = "default_openrouter_model")]
        model: String,
        #[serde(default = "default_timeout_ms")]
        timeout_ms: u64,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        site_url: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        app_name: Option<String>,
    },
}

impl ProviderConfig {
    /// Built-in defaults for a backend kind.
    pub fn default_for(kind: ProviderKind) -> Self {
        match kind {
            ProviderKind::Local => ProviderConfig::Local {
                host_url: default_local_host(),
                model: default_local_model(),
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            ProviderKind::OpenAi => ProviderConfig::OpenAi {
                model: default_openai_model(),
                timeout_ms: DEFAULT_TIMEOUT_MS,
                base_url: None,
                organization_id: None,
            },
            ProviderKind::Anthropic => ProviderConfig::Anthropic {
                model: default_anthropic_model(),
                timeout_ms: DEFAULT_TIMEOUT_MS,
            },
            ProviderKind::OpenRouter => ProviderConfig::OpenRouter {
                model: default_openrouter_model(),
                timeout_ms: DEFAULT_TIMEOUT_MS,
                site_url: None,
                app_name: None,
            },
        }
    }

    pub fn kind(&self) -> ProviderKind {
        match self {
            ProviderConfig::Local { .. } => ProviderKind::Local,
            ProviderConfig::OpenAi { .. } => ProviderKind::OpenAi,
            ProviderConfig::Anthropic { .. } => ProviderKind::Anthropic,
            ProviderConfig::OpenRouter { .. } => ProviderKind::OpenRouter,
        }
    }

    pub fn model(&self) -> &str {
        match self {
            ProviderConfig::Local { model, .. }
            | ProviderConfig::OpenAi { model, .. }
            | ProviderConfig::Anthropic { model, .. }
            | ProviderConfig::OpenRouter { model, .. } => model,
        }
    }

    pub fn timeout_ms(&self) -> u64 {
        match self {
            ProviderConfig::Local { timeout_ms, .. }
            | ProviderConfig::OpenAi { timeout_ms, .. }
            | ProviderConfig::Anthropic { timeout_ms, .. }
            | ProviderConfig::OpenRouter { timeout_ms, .. } => *timeout_ms,
        }
    }

    /// Host URL for the local backend, if this entry is one.
    pub fn host_url(&self) -> Option<&str> {
        match self {
            ProviderConfig::Local { host_url, .. } => Some(host_url),
            _ => None,
        }
    }

    /// Merge a partial update into this entry. Fields that do not apply to
    /// the entry's kind are ignored; the kind itself never changes.
    pub fn apply_update(&mut self, update: &ConfigUpdate) {
        if let Some(new_model) = &update.model {
            match self {
                ProviderConfig::Local { model, .. }
                | ProviderConfig::OpenAi { model, .. }
                | ProviderConfig::Anthropic { model, .. }
                | ProviderConfig::OpenRouter { model, .. } => *model = new_model.clone(),
            }
        }
        if let Some(new_timeout) = update.timeout_ms {
            match self {
                ProviderConfig::Local { timeout_ms, .. }
                | ProviderConfig::OpenAi { timeout_ms, .. }
                | ProviderConfig::Anthropic { timeout_ms, .. }
                | ProviderConfig::OpenRouter { timeout_ms, .. } => *timeout_ms = new_timeout,
            }
        }
        if let Some(new_host) = &update.host_url {
            if let ProviderConfig::Local { host_url, .. } = self {
                *host_url = new_host.clone();
            }
        }
        if let Some(new_base) = &update.base_url {
            if let ProviderConfig::OpenAi { base_url, .. } = self {
                *base_url = Some(new_base.clone());
            }
        }
    }
}

/// Partial provider-config update, merged by `apply_update` and by the
/// adapters' `update_config`. Absent fields leave the current value alone.
#[derive(Debug, Clone, Default)]
pub struct ConfigUpdate {
    pub model: Option<String>,
    pub host_url: Option<String>,
    pub base_url: Option<String>,
    pub timeout_ms: Option<u64>,
}

impl ConfigUpdate {
    pub fn model(name: impl Into<String>) -> Self {
        Self {
            model: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn host(url: impl Into<String>) -> Self {
        Self {
            host_url: Some(url.into()),
            ..Default::default()
        }
    }
}

/// The persisted multi-backend configuration document.
///
/// `current_provider` must name a key of `providers`; resolution fails
/// explicitly when it does not, rather than falling back silently.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    pub current_provider: String,
    #[serde(default)]
    pub providers: HashMap<String, ProviderConfig>,
}

impl Default for AppConfig {
    /// Single local backend with built-in defaults. This is what `load`
    /// hands back when no config file exists.
    fn default() -> Self {
        let mut providers = HashMap::new();
        providers.insert(
            "local".to_string(),
            ProviderConfig::default_for(ProviderKind::Local),
        );
        Self {
            current_provider: "local".to_string(),
            providers,
        }
    }
}

impl AppConfig {
    /// The entry named by `current_provider`, if present.
    pub fn current(&self) -> Option<&ProviderConfig> {
        self.providers.get(&self.current_provider)
    }

    /// Provider names in sorted order, for listings.
    pub fn provider_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.providers.keys().map(|k| k.as_str()).collect();
        names.sort_unstable();
        names
    }
}

/// The flat single-backend document written by old releases.
///
/// Both snake_case and the original camelCase spellings are accepted. Read
/// once at load time, migrated, then never seen again.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LegacyConfig {
    #[serde(default, alias = "hostUrl")]
    pub host_url: Option<String>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default, alias = "timeoutMs")]
    pub timeout_ms: Option<u64>,
}

impl LegacyConfig {
    /// Shape check: no current-provider key, at least one legacy field.
    pub fn matches(value: &serde_json::Value) -> bool {
        let Some(obj) = value.as_object() else {
            return false;
        };
        if obj.contains_key("current_provider") || obj.contains_key("currentProviderName") {
            return false;
        }
        ["host_url", "hostUrl", "model", "timeout_ms", "timeoutMs"]
            .iter()
            .any(|key| obj.contains_key(*key))
    }

    /// Lift the legacy fields into a single-provider document, filling
    /// built-in defaults for anything the old file did not carry.
    pub fn into_app_config(self) -> AppConfig {
        let mut providers = HashMap::new();
        providers.insert(
            "local".to_string(),
            ProviderConfig::Local {
                host_url: self.host_url.unwrap_or_else(default_local_host),
                model: self.model.unwrap_or_else(default_local_model),
                timeout_ms: self.timeout_ms.unwrap_or(DEFAULT_TIMEOUT_MS),
            },
        );
        AppConfig {
            current_provider: "local".to_string(),
            providers,
        }
    }
}
