//! Per-output transmission driver
//!
//! Owns one line's transmitter. Enforces the minimum inter-frame interval
//! (the reset-latch gap between consecutive frames on the same line) and
//! folds fault/success into the shared health counters. Every call is a
//! fresh attempt; a faulted line recovers on its next successful frame.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tracing::{trace, warn};

use ledflow_core::{BridgeStats, OutputId};

use crate::transmit::PixelTransmitter;

/// Drives one output line, strictly sequentially
pub struct OutputDriver<T: PixelTransmitter> {
    id: OutputId,
    transmitter: T,
    min_interval: Duration,
    last_send: Option<Instant>,
    stats: Arc<BridgeStats>,
}

impl<T: PixelTransmitter> OutputDriver<T> {
    /// Wrap a transmitter for `id`, spacing frames by `min_interval`
    pub fn new(
        id: OutputId,
        transmitter: T,
        min_interval: Duration,
        stats: Arc<BridgeStats>,
    ) -> Self {
        Self {
            id,
            transmitter,
            min_interval,
            last_send: None,
            stats,
        }
    }

    /// Send one frame, sleeping out the remainder of the inter-frame gap
    /// first. Returns whether the transmission succeeded.
    pub fn send(&mut self, pixels: &[u8]) -> bool {
        if let Some(last) = self.last_send {
            let elapsed = last.elapsed();
            if elapsed < self.min_interval {
                std::thread::sleep(self.min_interval - elapsed);
            }
        }
        self.last_send = Some(Instant::now());

        match self.transmitter.transmit(self.id, pixels) {
            Ok(()) => {
                self.stats.record_transmit_ok(self.id);
                trace!("output [{}]: sent {} bytes", self.id, pixels.len());
                true
            }
            Err(err) => {
                warn!("output [{}] transmission fault: {err}", self.id);
                self.stats.record_transmit_fault(self.id, &err.to_string());
                false
            }
        }
    }

    /// Push an all-zero frame so the strip goes dark. Shutdown path;
    /// faults are ignored.
    pub fn blackout(&mut self, frame_len: usize) {
        let dark = vec![0u8; frame_len];
        let _ = self.transmitter.transmit(self.id, &dark);
    }
}
