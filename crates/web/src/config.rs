use std::time::Duration;

use anyhow::{Context, Result};
use meet::EngineConfig;

#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    /// Absent means the process keeps its data in memory.
    pub database_url: Option<String>,
    pub api_keys: String,
    pub engine: EngineConfig,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let defaults = EngineConfig::default();

        let engine = EngineConfig {
            chest_number_seed: optional_var("CHEST_NUMBER_SEED")?
                .unwrap_or(defaults.chest_number_seed),
            allocator_max_attempts: optional_var("ALLOCATOR_MAX_ATTEMPTS")?
                .unwrap_or(defaults.allocator_max_attempts),
            store_timeout: optional_var("STORE_TIMEOUT_MS")?
                .map(Duration::from_millis)
                .unwrap_or(defaults.store_timeout),
            ..defaults
        };

        Ok(Self {
            host: std::env::var("HOST").context("Cannot load HOST env variable")?,
            port: std::env::var("PORT")
                .context("Cannot load PORT env variable")?
                .parse()
                .context("PORT must be a number")?,
            database_url: std::env::var("DATABASE_URL")
                .ok()
                .filter(|url| !url.trim().is_empty()),
            api_keys: std::env::var("API_KEYS").unwrap_or_default(),
            engine,
        })
    }
}

fn optional_var<T>(name: &str) -> Result<Option<T>>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match std::env::var(name) {
        Ok(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .with_context(|| format!("{} must be a number", name)),
        Err(_) => Ok(None),
    }
}
