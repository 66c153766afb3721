//! Universe frame store
//!
//! The merge point between network time and output time: one slot per
//! universe referenced by the fixture map. The receiver replaces whole
//! frames; assembly and monitoring read the latest snapshot. Replacement is
//! atomic at payload granularity, so readers never observe a torn frame and
//! never block the writer.

use std::collections::HashMap;
use std::sync::Arc;

use arc_swap::ArcSwapOption;
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::pixel::DMX_UNIVERSE_SIZE;

/// sACN source component identifier (CID)
pub type SourceCid = [u8; 16];

/// Latest accepted channel data for one universe
#[derive(Debug, Clone)]
pub struct UniverseFrame {
    /// Universe number
    pub universe: u16,
    /// Raw channel payload, channel 1 at index 0
    pub payload: [u8; DMX_UNIVERSE_SIZE],
    /// Last accepted sequence number
    pub sequence: u8,
    /// Declared priority of the winning source
    pub priority: u8,
    /// Source name as carried in the framing layer
    pub source_name: String,
    /// Component id of the winning source
    pub source_cid: SourceCid,
    /// Arrival timestamp of the accepted packet
    pub received_at: DateTime<Utc>,
}

/// Read-only universe view for the monitoring collaborator
#[derive(Debug, Clone, Serialize)]
pub struct UniverseInfo {
    /// Universe number
    pub universe: u16,
    /// Declared priority of the winning source
    pub priority: u8,
    /// Last accepted sequence number
    pub sequence: u8,
    /// Source name as carried in the framing layer
    pub source_name: String,
    /// Arrival timestamp of the accepted packet
    pub received_at: DateTime<Utc>,
    /// Raw channel payload
    pub payload: Vec<u8>,
}

impl From<&UniverseFrame> for UniverseInfo {
    fn from(frame: &UniverseFrame) -> Self {
        Self {
            universe: frame.universe,
            priority: frame.priority,
            sequence: frame.sequence,
            source_name: frame.source_name.clone(),
            received_at: frame.received_at,
            payload: frame.payload.to_vec(),
        }
    }
}

/// Latest-wins store of universe frames
///
/// The key set is fixed at construction; universes are refreshed, never
/// added or deleted afterwards. A universe that has never received a packet
/// reads as `None` and renders dark.
#[derive(Debug, Default)]
pub struct UniverseStore {
    slots: HashMap<u16, ArcSwapOption<UniverseFrame>>,
}

impl UniverseStore {
    /// Create a store with one empty slot per universe
    pub fn for_universes<I>(universes: I) -> Self
    where
        I: IntoIterator<Item = u16>,
    {
        Self {
            slots: universes
                .into_iter()
                .map(|u| (u, ArcSwapOption::empty()))
                .collect(),
        }
    }

    /// Replace the stored frame for its universe.
    ///
    /// Returns `false` when the universe is not part of the store (nothing
    /// references it, so there is no work to do).
    pub fn publish(&self, frame: UniverseFrame) -> bool {
        match self.slots.get(&frame.universe) {
            Some(slot) => {
                slot.store(Some(Arc::new(frame)));
                true
            }
            None => false,
        }
    }

    /// Latest frame for `universe`, `None` until the first packet arrives
    pub fn frame(&self, universe: u16) -> Option<Arc<UniverseFrame>> {
        self.slots.get(&universe)?.load_full()
    }

    /// Universes tracked by this store
    pub fn universes(&self) -> impl Iterator<Item = u16> + '_ {
        self.slots.keys().copied()
    }

    /// Monitoring snapshot of every universe that has received data
    pub fn snapshots(&self) -> Vec<UniverseInfo> {
        let mut infos: Vec<UniverseInfo> = self
            .slots
            .values()
            .filter_map(|slot| slot.load_full())
            .map(|frame| UniverseInfo::from(frame.as_ref()))
            .collect();
        infos.sort_by_key(|info| info.universe);
        infos
    }
}
