//! LedFlow Core - Domain Model and Shared State
//!
//! This crate contains the domain model for LedFlow, including:
//! - Pixel encodings and DMX addressing constants
//! - Fixture map (outputs, strips, routing invariants)
//! - Universe frame store (the network/output merge point)
//! - Frame assembly
//! - Bridge statistics for the monitoring collaborator

#![warn(missing_docs)]

pub mod assembler;
pub mod fixture;
pub mod handoff;
pub mod logging;
pub mod pixel;
pub mod stats;
pub mod universe;

pub use assembler::{assemble, assemble_to_vec};
pub use fixture::{FixtureMap, FixtureMapError, GpioPin, OutputId, OutputLine, Strip, MAX_OUTPUTS};
pub use handoff::FrameTrigger;
pub use logging::LogConfig;
pub use pixel::{PixelKind, DMX_UNIVERSE_SIZE, UNIVERSE_MAX};
pub use stats::{BridgeStats, DropCounts, DropReason, OutputHealth, StatsSnapshot};
pub use universe::{SourceCid, UniverseFrame, UniverseInfo, UniverseStore};
