//! Configuration management for fitslake
//!
//! This module provides a layered configuration system that loads settings from:
//! 1. Default values (embedded in structs)
//! 2. TOML configuration file
//! 3. Environment variables
//! 4. The platform's `FITSSTORE_BUCKET` variable (highest priority)
//!
//! # Usage
//!
//! ```no_run
//! use fitslake::config::Config;
//!
//! let config = Config::load().expect("Failed to load configuration");
//! println!("Writing CSV outputs to: {}", config.destination_bucket().unwrap());
//! ```
//!
//! # Environment Variables
//!
//! Configuration can be overridden using environment variables with the pattern:
//! `FITSLAKE__<section>__<key>`
//!
//! Examples:
//! - `FITSLAKE__STORAGE__REGION=us-east-1`
//! - `FITSLAKE__EXTRACTOR__MAX_OBJECT_BYTES=1GB`
//! - `FITSLAKE__TELEMETRY__LOG_FORMAT=pretty`
//!
//! # Configuration File
//!
//! By default, the configuration is loaded from `config/fitslake.toml`.
//! This can be overridden using the `FITSLAKE_CONFIG` environment variable.

mod models;
mod sources;
mod validation;

// Re-export public types
pub use crate::humanize::ByteSize;
pub use models::{
    Config, ExtractorConfig, LogFormat, ScratchKind, StorageConfig, StorageProvider,
    TelemetryConfig,
};
pub use sources::DESTINATION_ENV_VAR;
pub use validation::ValidationError;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    LoadError(#[from] config::ConfigError),

    #[error("Configuration validation failed: {0}")]
    ValidationError(#[from] ValidationError),
}

impl Config {
    /// Load configuration from all sources (file + environment)
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file is malformed
    /// - No destination bucket is configured
    /// - Validation fails (zero object limit, bad scratch dir, bad log filter)
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_with(None)
    }

    /// Like [`Config::load`], reading the TOML file from `path` when given
    pub fn load_with(path: Option<std::path::PathBuf>) -> Result<Self, ConfigError> {
        let config = sources::load(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific path, without `.env` or platform variables
    ///
    /// Useful for testing with custom configuration files.
    pub fn load_from_path(path: std::path::PathBuf) -> Result<Self, ConfigError> {
        let config = sources::load_from_sources(path)?;
        validation::validate(&config)?;
        Ok(config)
    }

    /// Bucket receiving CSV outputs
    pub fn destination_bucket(&self) -> Result<&str, ValidationError> {
        self.storage
            .destination_bucket
            .as_deref()
            .map(str::trim)
            .filter(|b| !b.is_empty())
            .ok_or(ValidationError::MissingDestinationBucket)
    }
}
