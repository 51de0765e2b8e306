use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),

    #[error("Invalid log format: {0}. Must be one of: json, pretty")]
    InvalidLogFormat(String),

    #[error("Invalid log rotation: {0}. Must be one of: daily, hourly, never")]
    InvalidRotation(String),

    #[error("Invalid quality threshold: {0}. Must be in (0, 1]")]
    InvalidThreshold(f64),

    #[error("Invalid quality max_iters: {0}. Must be at least 1")]
    InvalidMaxIters(u32),

    #[error("Invalid maintenance interval_ms: {0}. Must be positive")]
    InvalidInterval(u64),

    #[error("Invalid judge timeout_secs: {0}. Must be positive")]
    InvalidJudgeTimeout(u64),

    #[error("Configuration validation failed: {0}")]
    ValidationFailed(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .devloop/config.yaml (project config)
    /// 3. .devloop/local.yaml (project local overrides, optional)
    /// 4. Environment variables (DEVLOOP_* prefix, `__` separates sections)
    pub fn load() -> Result<Config> {
        Self::load_from_dir(".devloop")
    }

    /// Same as [`ConfigLoader::load`] with an explicit config directory.
    pub fn load_from_dir(dir: impl AsRef<Path>) -> Result<Config> {
        let dir = dir.as_ref();
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(dir.join("config.yaml")))
            .merge(Yaml::file(dir.join("local.yaml")))
            .merge(Env::prefixed("DEVLOOP_").split("__"))
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path.as_ref()))
            .extract()
            .context(format!(
                "Failed to load config from {}",
                path.as_ref().display()
            ))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        let valid_log_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_log_levels.contains(&config.logging.level.as_str()) {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        let valid_log_formats = ["json", "pretty"];
        if !valid_log_formats.contains(&config.logging.format.as_str()) {
            return Err(ConfigError::InvalidLogFormat(config.logging.format.clone()));
        }

        let valid_rotations = ["daily", "hourly", "never"];
        if !valid_rotations.contains(&config.logging.rotation.as_str()) {
            return Err(ConfigError::InvalidRotation(config.logging.rotation.clone()));
        }

        if let Some(threshold) = config.quality.threshold {
            if threshold.is_nan() || threshold <= 0.0 || threshold > 1.0 {
                return Err(ConfigError::InvalidThreshold(threshold));
            }
        }

        if config.quality.max_iters == Some(0) {
            return Err(ConfigError::InvalidMaxIters(0));
        }

        if config.maintenance.interval_ms == 0 {
            return Err(ConfigError::InvalidInterval(0));
        }

        if config.judge.timeout_secs == 0 {
            return Err(ConfigError::InvalidJudgeTimeout(0));
        }

        if config.worker.name.trim().is_empty() || config.maintenance.name.trim().is_empty() {
            return Err(ConfigError::ValidationFailed(
                "loop names cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}
