use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::availability::DEFAULT_OCCUPANT_LIMIT;

#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    pub display: DisplaySettings,
    pub ingest: IngestSettings,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DisplaySettings {
    /// How many occupant usernames a digest shows before truncating.
    pub occupant_limit: usize,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct IngestSettings {
    pub poll_interval_secs: u64,
}

impl Settings {
    /// Loads configuration in layers: hardcoded defaults, then
    /// `<CONFIG_PATH>/default` and `<CONFIG_PATH>/local` files when
    /// present, then `APP_`-prefixed environment variables.
    pub fn new() -> Result<Self, ConfigError> {
        let config_path = std::env::var("CONFIG_PATH")
            .unwrap_or_else(|_| "config".to_string());

        info!("Loading configuration from path: {}", config_path);

        let config = Config::builder()
            .set_default("display.occupant_limit", DEFAULT_OCCUPANT_LIMIT as u64)?
            .set_default("ingest.poll_interval_secs", 5)?
            .add_source(File::with_name(&format!("{}/default", config_path)).required(false))
            .add_source(File::with_name(&format!("{}/local", config_path)).required(false))
            .add_source(config::Environment::with_prefix("APP"))
            .build()?;

        config.try_deserialize()
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.ingest.poll_interval_secs)
    }
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            display: DisplaySettings {
                occupant_limit: DEFAULT_OCCUPANT_LIMIT,
            },
            ingest: IngestSettings {
                poll_interval_secs: 5,
            },
        }
    }
}
