//! Application configuration.
//!
//! Loaded from a TOML file; every section falls back to defaults so a
//! missing or partial file still yields a working setup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Configuration validation and loading errors.
#[derive(Debug, Clone, thiserror::Error)]
pub enum ConfigError {
    /// A cache pool capacity was configured as zero.
    #[error("cache capacities must be at least 1")]
    InvalidCacheCapacity,
    /// The default outlier sigma is zero or negative.
    #[error("outlier sigma must be positive")]
    InvalidSigma,
    /// The scan extension list is empty, so no file would ever match.
    #[error("no raw file extensions configured")]
    NoExtensions,
    /// The configuration file could not be read.
    #[error("failed to read config file: {0}")]
    FileReadError(String),
    /// The configuration file is not valid TOML.
    #[error("failed to parse config file: {0}")]
    ParseError(String),
}

/// Cache pool sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Decoded frames held in memory.
    pub frame_capacity: usize,
    /// Thumbnails held in memory.
    pub thumbnail_capacity: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            frame_capacity: 10,
            thumbnail_capacity: 20,
        }
    }
}

/// Ingestion scan settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Raw file extensions to ingest, lowercase without dots.
    pub extensions: Vec<String>,
    /// Default sigma for outlier detection.
    pub sigma: f64,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            extensions: ["dng", "erf", "nef", "cr2", "arw", "raf"]
                .map(String::from)
                .to_vec(),
            sigma: 6.0,
        }
    }
}

/// Full configuration file format.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FileConfig {
    /// SQLite catalog location.
    pub database: PathBuf,
    /// Cache pool sizing.
    #[serde(default)]
    pub cache: CacheConfig,
    /// Ingestion scan settings.
    #[serde(default)]
    pub scan: ScanConfig,
}

impl Default for FileConfig {
    fn default() -> Self {
        Self {
            database: PathBuf::from("raw-noise.db"),
            cache: CacheConfig::default(),
            scan: ScanConfig::default(),
        }
    }
}

impl FileConfig {
    /// Loads and validates configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::FileReadError(e.to_string()))?;
        let config: FileConfig =
            toml::from_str(&content).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Validates the configuration parameters.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cache.frame_capacity == 0 || self.cache.thumbnail_capacity == 0 {
            return Err(ConfigError::InvalidCacheCapacity);
        }
        if self.scan.sigma <= 0.0 {
            return Err(ConfigError::InvalidSigma);
        }
        if self.scan.extensions.is_empty() {
            return Err(ConfigError::NoExtensions);
        }
        Ok(())
    }
}
