//! LedFlow - sACN (E1.31) to WS281x pixel bridge
//!
//! Library surface of the binary: run orchestration and logging setup,
//! exposed so integration tests can drive a full run in-process.

#![warn(missing_docs)]

pub mod logging_setup;
pub mod supervisor;

pub use supervisor::{RunState, Supervisor, SHUTDOWN_TIMEOUT};
