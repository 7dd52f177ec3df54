//! Application configuration
//!
//! Read from `<data-dir>/config.json` unless another path is given. Every
//! section falls back to its defaults, so a partial file (or none) is fine.

use crate::retry::RetryConfig;
use crate::treasury::TopUpSettings;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

/// File name looked up inside the data directory
pub const CONFIG_FILE: &str = "config.json";

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("Parse error: {0}")]
    ParseError(#[from] serde_json::Error),
    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// Top-level configuration
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Overrides the data directory given on the command line
    pub data_dir: Option<PathBuf>,
    pub api: ApiConfig,
    pub topup: TopUpConfig,
    pub retry: RetryConfig,
}

/// REST server settings
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
        }
    }
}

impl ApiConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Default top-up amount and threshold, in base units
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TopUpConfig {
    pub amount: u128,
    pub threshold: u128,
}

impl Default for TopUpConfig {
    fn default() -> Self {
        Self {
            amount: 1_000,
            threshold: 500,
        }
    }
}

impl TopUpConfig {
    /// Batch settings, with per-call overrides falling back to the config
    pub fn settings(&self, amount: Option<u128>, threshold: Option<u128>) -> TopUpSettings {
        TopUpSettings {
            amount: amount.unwrap_or(self.amount),
            threshold: threshold.unwrap_or(self.threshold),
        }
    }
}

impl AppConfig {
    /// Load from an explicit file, or `config.json` under `data_dir`.
    /// A missing default file yields the defaults; a missing explicit file
    /// is an error.
    pub fn load(explicit: Option<&Path>, data_dir: &Path) -> Result<Self, ConfigError> {
        let config = match explicit {
            Some(path) => Self::from_file(path)?,
            None => {
                let path = data_dir.join(CONFIG_FILE);
                if path.exists() {
                    Self::from_file(&path)?
                } else {
                    Self::default()
                }
            }
        };
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let json = fs::read_to_string(path)?;
        let config = serde_json::from_str(&json)?;
        log::debug!("Loaded config from {:?}", path);
        Ok(config)
    }

    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        fs::write(path, serde_json::to_string_pretty(self)?)?;
        Ok(())
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".into(),
            ));
        }

        if self.retry.base_delay_ms > self.retry.max_delay_ms {
            return Err(ConfigError::Invalid(
                "retry.base_delay_ms must not exceed retry.max_delay_ms".into(),
            ));
        }

        if self.api.port == 0 {
            return Err(ConfigError::Invalid("api.port must be non-zero".into()));
        }

        Ok(())
    }

    /// Data directory, preferring the file's value over `fallback`
    pub fn resolve_data_dir(&self, fallback: &Path) -> PathBuf {
        self.data_dir
            .clone()
            .unwrap_or_else(|| fallback.to_path_buf())
    }
}
