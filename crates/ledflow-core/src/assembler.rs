//! Frame assembly
//!
//! Builds one contiguous pixel buffer per output from the latest universe
//! snapshots. A pure projection of store state: no history, no
//! interpolation. A universe that has never received a packet contributes
//! zeros, so unfed strips render dark rather than erroring.

use crate::fixture::OutputLine;
use crate::universe::UniverseStore;

/// Fill `buffer` with the current frame for `line`.
///
/// Strips are walked in declaration (wiring) order; each contributes
/// `pixel_count * channel_span` bytes copied verbatim from its universe
/// payload starting at `start_channel - 1`. RGB8 channel triplets map
/// directly onto pixel triplets.
pub fn assemble(line: &OutputLine, store: &UniverseStore, buffer: &mut Vec<u8>) {
    buffer.clear();
    buffer.reserve(line.buffer_len());

    for strip in &line.strips {
        let len = strip.byte_len();
        match store.frame(strip.universe) {
            Some(frame) => {
                let start = usize::from(strip.start_channel) - 1;
                buffer.extend_from_slice(&frame.payload[start..start + len]);
            }
            None => {
                let filled = buffer.len() + len;
                buffer.resize(filled, 0);
            }
        }
    }

    debug_assert_eq!(buffer.len(), line.buffer_len());
}

/// Assemble into a freshly allocated buffer
pub fn assemble_to_vec(line: &OutputLine, store: &UniverseStore) -> Vec<u8> {
    let mut buffer = Vec::with_capacity(line.buffer_len());
    assemble(line, store, &mut buffer);
    buffer
}
