//! TOML bridge configuration
//!
//! ```toml
//! version = "1.0"
//!
//! [input]
//! ipv4 = "192.168.1.50"
//!
//! [outputs.out1]
//! gpio = 18
//! pixel_type = "rgb8"
//!
//! [[outputs.out1.strips]]
//! label = "front window"
//! pixel_count = 120
//! universe = 1
//! start_channel = 1
//! ```
//!
//! Loading validates everything the pipeline later relies on: version,
//! gpio/label uniqueness, universe and channel ranges, and the
//! single-universe span invariant per strip.

use std::collections::BTreeMap;
use std::net::Ipv4Addr;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use ledflow_core::{
    FixtureMap, FixtureMapError, GpioPin, LogConfig, OutputId, OutputLine, PixelKind, Strip,
};

use crate::error::{ConfigError, Result};

/// Only supported config schema version
pub const CONFIG_VERSION: &str = "1.0";

/// Standard ACN SDT port
pub const DEFAULT_PORT: u16 = 5568;

/// Default WS281x refresh rate in Hz
pub const DEFAULT_REFRESH_RATE_HZ: u32 = 40;

/// Full bridge configuration file
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct BridgeConfig {
    /// Config schema version, must equal [`CONFIG_VERSION`]
    pub version: String,
    /// Lighting data input options
    pub input: InputConfig,
    /// Physical outputs, keyed `out1`..`out4`
    pub outputs: BTreeMap<OutputId, OutputConfig>,
    /// Logging options
    #[serde(default)]
    pub log: LogConfig,
}

/// Lighting data input options
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct InputConfig {
    /// Local IPv4 address to bind the unicast listener to
    pub ipv4: Ipv4Addr,
    /// UDP port; the protocol standard port unless overridden
    #[serde(default = "default_port")]
    pub port: u16,
    /// Rate at which the worker refreshes the outputs
    #[serde(default = "default_refresh_rate")]
    pub refresh_rate_hz: u32,
}

/// One GPIO output and its strip chain
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OutputConfig {
    /// BCM pin number (1-27)
    pub gpio: u8,
    /// Pixel encoding shared by all strips on the line
    pub pixel_type: PixelKind,
    /// Strips in wiring order
    pub strips: Vec<StripConfig>,
}

/// One patched LED strip
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StripConfig {
    /// Globally unique strip label
    pub label: String,
    /// Number of chained pixels
    pub pixel_count: u16,
    /// Source sACN universe
    pub universe: u16,
    /// First DMX channel (1-512)
    pub start_channel: u16,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_refresh_rate() -> u32 {
    DEFAULT_REFRESH_RATE_HZ
}

impl BridgeConfig {
    /// Build the immutable fixture map the pipeline routes through
    pub fn fixture_map(&self) -> std::result::Result<FixtureMap, FixtureMapError> {
        let mut lines = Vec::with_capacity(self.outputs.len());
        for (&id, output) in &self.outputs {
            let gpio = GpioPin::new(output.gpio)?;
            let strips = output
                .strips
                .iter()
                .map(|strip| Strip {
                    label: strip.label.clone(),
                    pixel_count: strip.pixel_count,
                    universe: strip.universe,
                    start_channel: strip.start_channel,
                    kind: output.pixel_type,
                })
                .collect();
            lines.push(OutputLine {
                id,
                gpio,
                kind: output.pixel_type,
                strips,
            });
        }
        FixtureMap::new(lines)
    }
}

/// Load and fully validate a bridge configuration file.
///
/// Returns the parsed config only if a fixture map can be built from it, so
/// every constraint violation surfaces at startup rather than mid-run.
pub fn load_config(path: &Path) -> Result<BridgeConfig> {
    let raw = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    let config: BridgeConfig = toml::from_str(&raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;

    if config.version != CONFIG_VERSION {
        return Err(ConfigError::UnsupportedVersion(config.version));
    }
    let map = config.fixture_map()?;
    info!(
        "valid configuration: {} outputs, {} pixels, {} universes",
        map.outputs().len(),
        map.total_pixels(),
        map.universes().count()
    );

    Ok(config)
}
