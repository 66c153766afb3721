//! Error types for the receive path
use thiserror::Error;

use crate::packet::PacketError;

/// sACN receive errors
#[derive(Debug, Error)]
pub enum SacnError {
    /// Socket bind or receive failure
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Undecodable datagram
    #[error("packet error: {0}")]
    Packet(#[from] PacketError),
}

/// Result type for receive operations
pub type Result<T> = std::result::Result<T, SacnError>;
