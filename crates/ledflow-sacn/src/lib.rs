//! LedFlow sACN - E1.31 receive path
//!
//! Wire codec, sequence/arbitration policy and the unicast receive loop
//! feeding the universe frame store:
//!
//! - [`packet`] - E1.31 data-frame parsing and encoding
//! - [`arbitration`] - per-universe winning-source resolution
//! - [`receiver`] - the blocking UDP receive loop

#![warn(missing_docs)]

pub mod arbitration;
pub mod error;
pub mod packet;
pub mod receiver;

pub use arbitration::{Admission, SourceArbiter, SOURCE_TIMEOUT};
pub use error::{Result, SacnError};
pub use packet::{
    encode_data_frame, parse_data_frame, sequence_newer, DataFrame, PacketError, ACN_SDT_PORT,
};
pub use receiver::{ReceiverConfig, SacnReceiver};
