//! Hardware-output capability boundary
//!
//! The electrical WS281x signal generation lives behind [`PixelTransmitter`].
//! The worker only requires that calls are sequential per output and report
//! fault vs success; bit timing, voltage levels and the device interface are
//! the implementation's business.

use tracing::trace;

use ledflow_core::OutputId;

use crate::error::TransmitError;

/// Serializes one assembled pixel buffer onto a physical line.
///
/// `pixels` is packed channel bytes in strip wiring order. Implementations
/// must block until the frame (and its reset latch) is fully clocked out;
/// the caller guarantees calls for one output never overlap.
pub trait PixelTransmitter: Send {
    /// Push one frame to the line
    fn transmit(&mut self, output: OutputId, pixels: &[u8]) -> Result<(), TransmitError>;
}

impl<T: PixelTransmitter + ?Sized> PixelTransmitter for Box<T> {
    fn transmit(&mut self, output: OutputId, pixels: &[u8]) -> Result<(), TransmitError> {
        (**self).transmit(output, pixels)
    }
}

/// Discards frames; for hosts without LED hardware attached
#[derive(Debug, Clone, Copy, Default)]
pub struct SinkTransmitter;

impl PixelTransmitter for SinkTransmitter {
    fn transmit(&mut self, output: OutputId, pixels: &[u8]) -> Result<(), TransmitError> {
        trace!("sink [{output}]: discarded {} bytes", pixels.len());
        Ok(())
    }
}
