//! figment-backed configuration loader and validation.

use std::path::Path;

use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Prefix for environment overrides, e.g. `EMBATCH_BATCH__CONCURRENCY=4`.
const ENV_PREFIX: &str = "EMBATCH_";

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    /// `provider.base_url` is blank.
    #[error("Provider base_url cannot be empty")]
    EmptyBaseUrl,

    /// `provider.model` is blank.
    #[error("Embedding model cannot be empty")]
    EmptyModel,

    /// `batch.concurrency` is zero.
    #[error("Invalid concurrency: {0}. Must be at least 1")]
    InvalidConcurrency(usize),

    /// `batch.poll_interval_ms` is zero.
    #[error("Invalid poll_interval_ms: {0}. Must be positive")]
    InvalidPollInterval(u64),

    /// `batch.timeout_minutes` is zero.
    #[error("Invalid timeout_minutes: {0}. Must be positive")]
    InvalidTimeout(u64),

    /// `batch.max_requests_per_job` is zero.
    #[error("Invalid max_requests_per_job: {0}. Must be at least 1")]
    InvalidMaxRequests(usize),

    /// `retry.max_attempts` is zero.
    #[error("Invalid max_attempts: {0}. Cannot be 0")]
    InvalidMaxAttempts(u32),

    /// `retry.min_delay_ms` exceeds `retry.max_delay_ms`.
    #[error("Invalid retry delays: min_delay_ms ({0}) must not exceed max_delay_ms ({1})")]
    InvalidBackoff(u64, u64),

    /// `retry.jitter` is outside `[0, 1]`.
    #[error("Invalid jitter: {0}. Must be between 0.0 and 1.0")]
    InvalidJitter(f64),

    /// `logging.level` is not a known level.
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .embatch/config.yaml (project config)
    /// 3. .embatch/local.yaml (project local overrides, optional)
    /// 4. Environment variables (EMBATCH_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(".embatch/config.yaml"))
            .merge(Yaml::file(".embatch/local.yaml"))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file, still honoring environment overrides
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path))
            .merge(Env::prefixed(ENV_PREFIX).split("__"))
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.provider.base_url.trim().is_empty() {
            return Err(ConfigError::EmptyBaseUrl);
        }
        if config.provider.model.trim().is_empty() {
            return Err(ConfigError::EmptyModel);
        }

        let batch = &config.batch;
        if batch.concurrency == 0 {
            return Err(ConfigError::InvalidConcurrency(batch.concurrency));
        }
        if batch.poll_interval_ms == 0 {
            return Err(ConfigError::InvalidPollInterval(batch.poll_interval_ms));
        }
        if batch.timeout_minutes == 0 {
            return Err(ConfigError::InvalidTimeout(batch.timeout_minutes));
        }
        if batch.max_requests_per_job == 0 {
            return Err(ConfigError::InvalidMaxRequests(batch.max_requests_per_job));
        }

        let retry = &config.retry;
        if retry.max_attempts == 0 {
            return Err(ConfigError::InvalidMaxAttempts(retry.max_attempts));
        }
        if retry.min_delay_ms > retry.max_delay_ms {
            return Err(ConfigError::InvalidBackoff(
                retry.min_delay_ms,
                retry.max_delay_ms,
            ));
        }
        if !(0.0..=1.0).contains(&retry.jitter) {
            return Err(ConfigError::InvalidJitter(retry.jitter));
        }

        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }
}
