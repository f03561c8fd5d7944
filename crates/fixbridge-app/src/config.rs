//! Application configuration.

use std::path::Path;

use fixbridge_api::{ApiConfig, NotifyConfig};
use fixbridge_dispatch::DispatchConfig;
use fixbridge_reports::FlushConfig;
use fixbridge_transport::LoopbackConfig;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::{AppError, AppResult};

/// Top-level configuration, one TOML section per component.
///
/// Every field has a default, so an empty file (or no file at all) yields a
/// runnable single-process deployment over the loopback venue.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub api: ApiConfig,
    #[serde(default)]
    pub dispatch: DispatchConfig,
    #[serde(default)]
    pub flush: FlushConfig,
    #[serde(default)]
    pub notify: NotifyConfig,
    #[serde(default)]
    pub loopback: LoopbackConfig,
}

impl AppConfig {
    /// Loads from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> AppResult<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .map_err(|e| AppError::Config(format!("cannot read {}: {e}", path.display())))?;
        toml::from_str(&content)
            .map_err(|e| AppError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Resolves the config path (CLI argument, then `FIXBRIDGE_CONFIG`,
    /// then `config/default.toml`) and loads it, falling back to defaults
    /// when no file exists at the default path.
    pub fn load(cli_path: Option<String>) -> AppResult<Self> {
        let explicit = cli_path.or_else(|| std::env::var("FIXBRIDGE_CONFIG").ok());

        match explicit {
            Some(path) => Self::from_file(path),
            None => {
                let default_path = "config/default.toml";
                if Path::new(default_path).exists() {
                    Self::from_file(default_path)
                } else {
                    info!("No config file found, using built-in defaults");
                    Ok(Self::default())
                }
            }
        }
    }
}
