//! Per-universe source arbitration
//!
//! Resolves duplicate, stale and competing-source packets into a single
//! winner per universe: a strictly higher priority preempts immediately,
//! the winning source refreshes itself under the sequence rule, and a rival
//! at equal or lower priority takes over only once the winner has been
//! silent for the source-timeout window.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::time::{Duration, Instant};

use ledflow_core::{DropReason, SourceCid};

use crate::packet::{sequence_newer, DataFrame};

/// E1.31 network data loss timeout: a source silent for this long has
/// relinquished its universes.
pub const SOURCE_TIMEOUT: Duration = Duration::from_millis(2500);

/// Outcome of admitting one packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Packet becomes the universe's current frame
    Accepted,
    /// Packet becomes current and the winning source changed
    AcceptedNewSource,
    /// Packet discarded
    Rejected(DropReason),
}

#[derive(Debug, Clone)]
struct WinningSource {
    cid: SourceCid,
    priority: u8,
    sequence: u8,
    last_seen: Instant,
}

impl WinningSource {
    fn from_frame(frame: &DataFrame, now: Instant) -> Self {
        Self {
            cid: frame.cid,
            priority: frame.priority,
            sequence: frame.sequence,
            last_seen: now,
        }
    }

    fn refresh(&mut self, frame: &DataFrame, now: Instant) {
        self.priority = frame.priority;
        self.sequence = frame.sequence;
        self.last_seen = now;
    }
}

/// Sequencing and winning-source state for every universe seen so far
#[derive(Debug, Default)]
pub struct SourceArbiter {
    universes: HashMap<u16, WinningSource>,
}

impl SourceArbiter {
    /// Empty arbiter; every universe starts without a winner
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide whether `frame` replaces the universe's current data.
    ///
    /// `now` is passed in so tests can drive the timeout window.
    pub fn admit(&mut self, frame: &DataFrame, now: Instant) -> Admission {
        match self.universes.entry(frame.universe) {
            Entry::Vacant(slot) => {
                slot.insert(WinningSource::from_frame(frame, now));
                Admission::AcceptedNewSource
            }
            Entry::Occupied(mut slot) => {
                let winner = slot.get_mut();
                let timed_out = now.duration_since(winner.last_seen) >= SOURCE_TIMEOUT;

                if winner.cid == frame.cid {
                    // The live source advances by sequence; after a silence
                    // gap its counter may restart anywhere.
                    if timed_out || sequence_newer(frame.sequence, winner.sequence) {
                        winner.refresh(frame, now);
                        Admission::Accepted
                    } else {
                        Admission::Rejected(DropReason::StaleSequence)
                    }
                } else if frame.priority > winner.priority || timed_out {
                    *winner = WinningSource::from_frame(frame, now);
                    Admission::AcceptedNewSource
                } else {
                    Admission::Rejected(DropReason::Arbitration)
                }
            }
        }
    }

    /// Drop the winner of `universe` if `cid` holds it (stream terminated).
    ///
    /// Returns whether a winner was released. The next packet from any
    /// source takes over immediately.
    pub fn release(&mut self, universe: u16, cid: &SourceCid) -> bool {
        match self.universes.get(&universe) {
            Some(winner) if winner.cid == *cid => {
                self.universes.remove(&universe);
                true
            }
            _ => false,
        }
    }
}
