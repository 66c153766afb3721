//! Error types for the output side
use thiserror::Error;

use ledflow_core::OutputId;

/// Fault reported by the hardware-output capability
#[derive(Debug, Error)]
pub enum TransmitError {
    /// The line driver failed to clock the frame out
    #[error("transmission fault: {0}")]
    Fault(String),

    /// Underlying device IO failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Worker-level errors; these are fatal to the run
#[derive(Debug, Error)]
pub enum GpioError {
    /// An output line has no transmitter wired to it
    #[error("no transmitter configured for output [{0}]")]
    MissingTransmitter(OutputId),

    /// OS refused to start a worker thread
    #[error("failed to spawn worker thread: {0}")]
    Spawn(#[source] std::io::Error),
}

/// Result type for worker operations
pub type Result<T> = std::result::Result<T, GpioError>;
