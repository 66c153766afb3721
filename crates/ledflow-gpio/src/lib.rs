//! LedFlow GPIO - Output Driver Boundary and Worker
//!
//! Everything on the hardware side of the frame-handoff channel:
//!
//! - [`transmit`] - the narrow capability boundary to WS281x signal
//!   generation
//! - [`driver`] - per-line inter-frame spacing and degraded tracking
//! - [`worker`] - the fixed-period tick loop and per-line transmit threads

#![warn(missing_docs)]

pub mod driver;
pub mod error;
pub mod transmit;
pub mod worker;

pub use driver::OutputDriver;
pub use error::{GpioError, Result, TransmitError};
pub use transmit::{PixelTransmitter, SinkTransmitter};
pub use worker::{OutputWorker, WorkerConfig};
