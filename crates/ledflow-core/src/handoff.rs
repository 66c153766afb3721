//! Frame-handoff channel message
//!
//! The network side wakes the output worker over a bounded channel. The
//! message carries no data: frame content always comes from the latest
//! universe snapshots, so a dropped trigger loses only timeliness, never
//! content.

/// Marker pushed by the receiver after accepting a packet, paced to the
/// worker tick rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FrameTrigger;
