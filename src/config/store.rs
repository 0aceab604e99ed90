// Configuration persistence
//
// Single owner of the on-disk config document at ~/.cmdsage/config.json.
// Detects the flat single-backend document written by old releases and
// migrates it in place the first time it is seen.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::warn;

use super::settings::{AppConfig, LegacyConfig};

const CONFIG_DIR: &str = ".cmdsage";
const CONFIG_FILE: &str = "config.json";

/// Loads and saves the persisted `AppConfig` document.
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store bound to the per-user config path.
    pub fn new() -> Result<Self> {
        let home = dirs::home_dir().context("could not determine home directory")?;
        Ok(Self {
            path: home.join(CONFIG_DIR).join(CONFIG_FILE),
        })
    }

    /// Store bound to an explicit path.
    pub fn at_path(path: PathBuf) -> Self {
        Self { path }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }

    /// Load the config document.
    ///
    /// An absent file yields the built-in default without writing anything.
    /// A legacy document is migrated, persisted in the new shape, and
    /// announced once; a later load of the migrated file is a plain
    /// passthrough. A corrupt file degrades to the default with a warning
    /// rather than aborting.
    pub fn load(&self) -> AppConfig {
        if !self.path.exists() {
            return AppConfig::default();
        }

        let contents = match fs::read_to_string(&self.path) {
            Ok(contents) => contents,
            Err(e) => {
                warn!("failed to read {}: {e}; using defaults", self.path.display());
                return AppConfig::default();
            }
        };

        let value: serde_json::Value = match serde_json::from_str(&contents) {
            Ok(value) => value,
            Err(e) => {
                warn!(
                    "config file {} is not valid JSON ({e}); using defaults",
                    self.path.display()
                );
                return AppConfig::default();
            }
        };

        if LegacyConfig::matches(&value) {
            return self.migrate_legacy(value);
        }

        match serde_json::from_value::<AppConfig>(value) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "config file {} has an unrecognized shape ({e}); using defaults",
                    self.path.display()
                );
                AppConfig::default()
            }
        }
    }

    /// One-time, one-directional migration of the old flat document.
    fn migrate_legacy(&self, value: serde_json::Value) -> AppConfig {
        let legacy: LegacyConfig = match serde_json::from_value(value) {
            Ok(legacy) => legacy,
            Err(e) => {
                warn!("legacy config did not parse ({e}); using defaults");
                return AppConfig::default();
            }
        };

        let migrated = legacy.into_app_config();
        match self.save(&migrated) {
            Ok(()) => eprintln!(
                "Migrated legacy configuration at {} to the multi-provider format.",
                self.path.display()
            ),
            Err(e) => warn!("could not persist migrated config: {e:#}"),
        }
        migrated
    }

    /// Persist the document as pretty JSON, creating the parent directory
    /// on demand. Round-tripping through `load` is lossless.
    pub fn save(&self, config: &AppConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("failed to create {}", parent.display()))?;
        }

        let json =
            serde_json::to_string_pretty(config).context("failed to serialize config")?;
        fs::write(&self.path, json)
            .with_context(|| format!("failed to write {}", self.path.display()))?;
        Ok(())
    }
}
