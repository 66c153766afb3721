//! Error types for configuration loading
use std::path::PathBuf;

use thiserror::Error;

use ledflow_core::FixtureMapError;

/// Configuration loading errors; all fatal to startup
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The file could not be read
    #[error("failed to read config file [{path}]: {source}")]
    Read {
        /// Offending path
        path: PathBuf,
        /// Underlying IO failure
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid TOML or misses required fields
    #[error("failed to parse config file [{path}]: {source}")]
    Parse {
        /// Offending path
        path: PathBuf,
        /// Underlying TOML failure
        #[source]
        source: toml::de::Error,
    },

    /// The declared config version is not supported
    #[error("unsupported config version [{0}]")]
    UnsupportedVersion(String),

    /// A fixture constraint was violated
    #[error("invalid fixture configuration: {0}")]
    Fixture(#[from] FixtureMapError),
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
