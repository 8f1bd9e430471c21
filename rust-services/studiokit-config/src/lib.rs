//! Configuration management for Studiokit services

use config::{Config, Environment};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Prefix of every environment variable read by [`TranscoderConfig::from_env`]
pub const ENV_PREFIX: &str = "STUDIOKIT";

/// Default wall-clock limit for a single encoder run
pub const DEFAULT_ENCODE_TIMEOUT_SECS: u64 = 600;

/// Configuration errors
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to load configuration: {0}")]
    Load(#[from] config::ConfigError),

    #[error("Invalid configuration value for {key}: {reason}")]
    Invalid { key: &'static str, reason: String },
}

/// Transcode pipeline configuration
#[derive(Debug, Clone, Deserialize)]
pub struct TranscoderConfig {
    /// Directory holding persisted uploads and their `.web.*` renditions
    pub uploads_dir: PathBuf,
    /// Scratch directory for export conversions
    pub temp_dir: PathBuf,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    pub encode_timeout_secs: u64,
    /// Ceiling on encoder processes running at once
    pub max_concurrent_encodes: usize,
    pub log_level: Option<String>,
}

impl TranscoderConfig {
    /// Load configuration from environment variables
    ///
    /// Reads `.env` if present, then `STUDIOKIT_*` variables, e.g.
    /// `STUDIOKIT_UPLOADS_DIR` or `STUDIOKIT_ENCODE_TIMEOUT_SECS`.
    pub fn from_env() -> Result<Self, ConfigError> {
        // Load .env file if it exists
        let _ = dotenvy::dotenv();

        Self::from_environment(Environment::with_prefix(ENV_PREFIX))
    }

    /// Load configuration from an explicit environment source
    pub fn from_environment(environment: Environment) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .set_default("uploads_dir", "uploads")?
            .set_default("temp_dir", "temp")?
            .set_default("ffmpeg_path", "ffmpeg")?
            .set_default("ffprobe_path", "ffprobe")?
            .set_default("encode_timeout_secs", DEFAULT_ENCODE_TIMEOUT_SECS as i64)?
            .set_default("max_concurrent_encodes", default_concurrency() as i64)?
            .set_default("log_level", "info")?
            .add_source(environment)
            .build()?;

        let config: Self = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.encode_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "encode_timeout_secs",
                reason: "must be greater than zero".to_string(),
            });
        }
        if self.max_concurrent_encodes == 0 {
            return Err(ConfigError::Invalid {
                key: "max_concurrent_encodes",
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn encode_timeout(&self) -> Duration {
        Duration::from_secs(self.encode_timeout_secs)
    }

    /// Get log level, defaulting to "info"
    pub fn log_level(&self) -> &str {
        self.log_level.as_deref().unwrap_or("info")
    }
}

fn default_concurrency() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(2)
}
