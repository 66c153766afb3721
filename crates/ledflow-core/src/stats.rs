//! Bridge statistics
//!
//! Passive accept/drop accounting and per-output health, read by the
//! monitoring collaborator. Writers on the packet and transmit paths never
//! block on readers.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::RwLock;
use serde::Serialize;

use crate::fixture::OutputId;

/// Why the receiver discarded a datagram
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DropReason {
    /// Length/identifier/start-code validation failed
    Malformed,
    /// Universe not referenced by any strip
    UnknownUniverse,
    /// Sequence number outside the accept window
    StaleSequence,
    /// Lost source arbitration (lower priority while a winner is live)
    Arbitration,
    /// Preview-data option bit set; never rendered
    Preview,
    /// Stream-terminated option bit set; releases the winning source
    StreamTerminated,
}

/// Transmission health of one output line
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct OutputHealth {
    /// Last transmission faulted; cleared by the next success
    pub degraded: bool,
    /// Frames successfully handed to the hardware capability
    pub frames_sent: u64,
    /// Total transmission faults
    pub faults: u64,
    /// Text of the most recent fault
    pub last_fault: Option<String>,
}

/// Counters for every drop reason
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct DropCounts {
    /// See [`DropReason::Malformed`]
    pub malformed: u64,
    /// See [`DropReason::UnknownUniverse`]
    pub unknown_universe: u64,
    /// See [`DropReason::StaleSequence`]
    pub stale_sequence: u64,
    /// See [`DropReason::Arbitration`]
    pub arbitration: u64,
    /// See [`DropReason::Preview`]
    pub preview: u64,
    /// See [`DropReason::StreamTerminated`]
    pub stream_terminated: u64,
}

impl DropCounts {
    /// Total packets dropped for any reason
    pub fn total(&self) -> u64 {
        self.malformed
            + self.unknown_universe
            + self.stale_sequence
            + self.arbitration
            + self.preview
            + self.stream_terminated
    }
}

/// Point-in-time view of all counters
#[derive(Debug, Clone, Serialize)]
pub struct StatsSnapshot {
    /// Packets accepted into the universe store
    pub packets_accepted: u64,
    /// Packets dropped, by reason
    pub packets_dropped: DropCounts,
    /// Worker triggers dropped to channel backpressure
    pub triggers_dropped: u64,
    /// Assembled frames skipped because a line was still transmitting
    pub frames_skipped: u64,
    /// Per-output transmission health
    pub outputs: BTreeMap<OutputId, OutputHealth>,
}

/// Shared counters for the whole bridge
#[derive(Debug, Default)]
pub struct BridgeStats {
    accepted: AtomicU64,
    malformed: AtomicU64,
    unknown_universe: AtomicU64,
    stale_sequence: AtomicU64,
    arbitration: AtomicU64,
    preview: AtomicU64,
    stream_terminated: AtomicU64,
    triggers_dropped: AtomicU64,
    frames_skipped: AtomicU64,
    outputs: RwLock<BTreeMap<OutputId, OutputHealth>>,
}

impl BridgeStats {
    /// Create stats with a health entry per configured output
    pub fn new<I>(outputs: I) -> Self
    where
        I: IntoIterator<Item = OutputId>,
    {
        let stats = Self::default();
        {
            let mut health = stats.outputs.write();
            for id in outputs {
                health.insert(id, OutputHealth::default());
            }
        }
        stats
    }

    /// Count one accepted packet
    pub fn record_accepted(&self) {
        self.accepted.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one dropped packet
    pub fn record_dropped(&self, reason: DropReason) {
        let counter = match reason {
            DropReason::Malformed => &self.malformed,
            DropReason::UnknownUniverse => &self.unknown_universe,
            DropReason::StaleSequence => &self.stale_sequence,
            DropReason::Arbitration => &self.arbitration,
            DropReason::Preview => &self.preview,
            DropReason::StreamTerminated => &self.stream_terminated,
        };
        counter.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one trigger lost to channel backpressure
    pub fn record_trigger_dropped(&self) {
        self.triggers_dropped.fetch_add(1, Ordering::Relaxed);
    }

    /// Count one frame skipped because its line was busy
    pub fn record_frame_skipped(&self) {
        self.frames_skipped.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a successful transmission; clears the degraded flag
    pub fn record_transmit_ok(&self, id: OutputId) {
        let mut outputs = self.outputs.write();
        let health = outputs.entry(id).or_default();
        health.degraded = false;
        health.frames_sent += 1;
    }

    /// Record a transmission fault; sets the degraded flag
    pub fn record_transmit_fault(&self, id: OutputId, fault: &str) {
        let mut outputs = self.outputs.write();
        let health = outputs.entry(id).or_default();
        health.degraded = true;
        health.faults += 1;
        health.last_fault = Some(fault.to_string());
    }

    /// Whether an output's last transmission faulted
    pub fn is_degraded(&self, id: OutputId) -> bool {
        self.outputs
            .read()
            .get(&id)
            .map(|health| health.degraded)
            .unwrap_or(false)
    }

    /// Point-in-time copy of every counter
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            packets_accepted: self.accepted.load(Ordering::Relaxed),
            packets_dropped: DropCounts {
                malformed: self.malformed.load(Ordering::Relaxed),
                unknown_universe: self.unknown_universe.load(Ordering::Relaxed),
                stale_sequence: self.stale_sequence.load(Ordering::Relaxed),
                arbitration: self.arbitration.load(Ordering::Relaxed),
                preview: self.preview.load(Ordering::Relaxed),
                stream_terminated: self.stream_terminated.load(Ordering::Relaxed),
            },
            triggers_dropped: self.triggers_dropped.load(Ordering::Relaxed),
            frames_skipped: self.frames_skipped.load(Ordering::Relaxed),
            outputs: self.outputs.read().clone(),
        }
    }
}
