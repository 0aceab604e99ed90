// Configuration module
// Public interface for the persisted config document and the setup flow

mod settings;
mod setup;
mod store;

pub use settings::{
    AppConfig, ConfigUpdate, LegacyConfig, ProviderConfig, DEFAULT_ANTHROPIC_MODEL,
    DEFAULT_LOCAL_HOST, DEFAULT_LOCAL_MODEL, DEFAULT_OPENAI_MODEL, DEFAULT_OPENROUTER_MODEL,
    DEFAULT_TIMEOUT_MS,
};
pub use setup::SetupFlow;
pub use store::ConfigStore;
