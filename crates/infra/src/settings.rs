//! Layered settings for the ledger services.
//!
//! Sources, later ones winning:
//! 1. Built-in defaults
//! 2. Optional file `config/wareledger` (any format `config` understands);
//!    `WARELEDGER_CONFIG` points elsewhere
//! 3. Environment variables with the `WARELEDGER` prefix, `__` between
//!    section and key (e.g. `WARELEDGER_EXPIRY__CRITICAL_DAYS=5`)

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use thiserror::Error;

use wareledger_fulfillment::SplitConfig;
use wareledger_inventory::ExpiryConfig;

pub const CONFIG_PATH_ENV: &str = "WARELEDGER_CONFIG";
const DEFAULT_CONFIG_PATH: &str = "config/wareledger";
const ENV_PREFIX: &str = "WARELEDGER";

#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to load settings: {0}")]
    Load(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub expiry: ExpiryConfig,
    pub split: SplitConfig,
}

impl Settings {
    /// Load from the default file location and the process environment.
    pub fn load() -> Result<Self, SettingsError> {
        let path = std::env::var(CONFIG_PATH_ENV).unwrap_or_else(|_| DEFAULT_CONFIG_PATH.into());
        Self::load_from(&path)
    }

    /// Load with `path` as the (optional) settings file.
    pub fn load_from(path: &str) -> Result<Self, SettingsError> {
        let config = Config::builder()
            .add_source(File::with_name(path).required(false))
            .add_source(
                Environment::with_prefix(ENV_PREFIX)
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        let settings: Settings = config.try_deserialize()?;
        Ok(settings.normalized())
    }

    /// Zero thresholds fall back to their defaults.
    pub fn normalized(self) -> Self {
        Self {
            expiry: self.expiry.normalized(),
            split: self.split.normalized(),
        }
    }
}
