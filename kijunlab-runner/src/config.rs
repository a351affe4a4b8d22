//! Application configuration loaded from TOML.
//!
//! ```toml
//! [trading]
//! ticker = "KC=F"
//! kijun_period = 125
//!
//! [logging]
//! level = "debug"
//!
//! [output]
//! dir = "results"
//! ```
//!
//! Every table is optional and every key falls back to its default. Unknown
//! keys are rejected.

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use kijunlab_core::config::{ConfigError, TradingConfig};

/// Unique identifier for a run configuration (content-addressable hash).
pub type RunId = String;

/// Errors from reading or validating a configuration file.
#[derive(Debug, Error)]
pub enum AppConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse TOML {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error(transparent)]
    Invalid(#[from] ConfigError),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct AppConfig {
    pub trading: TradingConfig,
    pub logging: LoggingConfig,
    pub output: OutputConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct LoggingConfig {
    /// `tracing` filter directive, e.g. "info" or "kijunlab_core=debug".
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "info".into() }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct OutputConfig {
    /// Directory that receives exported CSV and JSON files.
    pub dir: PathBuf,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("results"),
        }
    }
}

impl AppConfig {
    /// Read, parse, and validate a configuration file.
    pub fn load(path: &Path) -> Result<Self, AppConfigError> {
        let contents = fs::read_to_string(path).map_err(|source| AppConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: AppConfig = toml::from_str(&contents).map_err(|source| AppConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.trading.validate()?;
        Ok(config)
    }

    /// Parse and validate a configuration from a TOML string.
    pub fn from_toml(contents: &str) -> Result<Self, AppConfigError> {
        let config: AppConfig = toml::from_str(contents).map_err(|source| AppConfigError::Parse {
            path: PathBuf::from("<inline>"),
            source,
        })?;
        config.trading.validate()?;
        Ok(config)
    }
}

/// Deterministic hash of a trading configuration.
///
/// Two runs with identical trading parameters share a fingerprint, whatever
/// their logging or output settings.
pub fn run_fingerprint(trading: &TradingConfig) -> Result<RunId, serde_json::Error> {
    let json = serde_json::to_string(trading)?;
    Ok(blake3::hash(json.as_bytes()).to_hex().to_string())
}
