//! Application settings, read from `settings.toml`.

use std::time::Duration;

use config::{Config, ConfigError, File};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct App {
    /// Log level for the env filter (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Database {
    Memory,
    Sqlite(String),
}

#[derive(Debug, Deserialize)]
pub struct Server {
    pub bind: Option<String>,
    pub port: u16,
    pub database: Database,
}

#[derive(Debug, Default, Deserialize)]
pub struct Rates {
    pub primary_base: Option<String>,
    pub secondary_base: Option<String>,
    pub ttl_secs: Option<u64>,
    pub timeout_secs: Option<u64>,
}

impl Rates {
    pub fn to_config(&self) -> rates::RateSourceConfig {
        let mut config = rates::RateSourceConfig::default();
        if let Some(base) = &self.primary_base {
            config.primary_base = base.clone();
        }
        if let Some(base) = &self.secondary_base {
            config.secondary_base = base.clone();
        }
        if let Some(ttl) = self.ttl_secs {
            config.ttl = Duration::from_secs(ttl);
        }
        if let Some(timeout) = self.timeout_secs {
            config.request_timeout = Duration::from_secs(timeout);
        }
        config
    }
}

#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: App,
    pub server: Server,
    pub rates: Option<Rates>,
}

impl Settings {
    pub fn new() -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("settings"))
            .build()?;

        settings.try_deserialize()
    }
}
