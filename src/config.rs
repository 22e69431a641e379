use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

use crate::stats::DEFAULT_CACHE_TTL;

pub const CONFIG_FILE: &str = "roster";
pub const ENV_PREFIX: &str = "ROSTER";

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] ::config::ConfigError),

    #[error("Configuration validation error: {0}")]
    ValidationError(String),
}

#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// How long a statistics snapshot is served before being recomputed.
    pub cache_ttl_secs: u64,
    /// Start from the demonstration roster when no CSV is supplied.
    pub seed_sample_data: bool,
    /// Default tracing filter when `RUST_LOG` is unset.
    pub log_filter: String,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            cache_ttl_secs: DEFAULT_CACHE_TTL.as_secs(),
            seed_sample_data: true,
            log_filter: "warn".to_string(),
        }
    }
}

impl Settings {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// Loads settings from defaults, then an optional `roster.toml`, then `ROSTER_*`
/// environment variables.
pub fn load_settings() -> Result<Settings, ConfigError> {
    let defaults = Settings::default();
    let builder = ::config::Config::builder()
        .set_default("cache_ttl_secs", defaults.cache_ttl_secs)?
        .set_default("seed_sample_data", defaults.seed_sample_data)?
        .set_default("log_filter", defaults.log_filter)?
        .add_source(::config::File::with_name(CONFIG_FILE).required(false))
        .add_source(::config::Environment::with_prefix(ENV_PREFIX).try_parsing(true))
        .build()?;

    let settings = builder.try_deserialize::<Settings>()?;
    if settings.log_filter.trim().is_empty() {
        return Err(ConfigError::ValidationError(
            "log_filter must not be empty".to_string(),
        ));
    }

    Ok(settings)
}
