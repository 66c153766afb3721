//! LedFlow IO - Configuration Loading
//!
//! Reads and validates the TOML bridge configuration and converts it into
//! the immutable [`ledflow_core::FixtureMap`] the pipeline routes through.
//! The rest of the system trusts this crate's output: every fixture
//! constraint is enforced at load time.

#![warn(missing_docs)]

pub mod config;
pub mod error;

pub use config::{
    load_config, BridgeConfig, InputConfig, OutputConfig, StripConfig, CONFIG_VERSION,
    DEFAULT_PORT, DEFAULT_REFRESH_RATE_HZ,
};
pub use error::{ConfigError, Result};
