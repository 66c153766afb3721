//! E1.31 data-frame codec
//!
//! Layout per ANSI E1.31: a root layer (ACN preamble and identifier, vector,
//! CID), a framing layer (source name, priority, sequence, options,
//! universe) and a DMP layer (set-property, start code, channel data).
//! Fixed offsets: priority at byte 108, sequence at 111, universe at 113,
//! start code at 125, channel data from 126.

use thiserror::Error;

use ledflow_core::{SourceCid, DMX_UNIVERSE_SIZE, UNIVERSE_MAX};

/// Standard ACN SDT multicast/unicast port
pub const ACN_SDT_PORT: u16 = 5568;

/// Highest declarable source priority
pub const PRIORITY_MAX: u8 = 200;

/// Priority assumed by sources that do not declare one
pub const PRIORITY_DEFAULT: u8 = 100;

const PREAMBLE_SIZE: u16 = 0x0010;
const ACN_PACKET_IDENTIFIER: [u8; 12] = [
    0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00,
];
const VECTOR_ROOT_E131_DATA: u32 = 0x0000_0004;
const VECTOR_E131_DATA_PACKET: u32 = 0x0000_0002;
const VECTOR_DMP_SET_PROPERTY: u8 = 0x02;
const DMP_ADDRESS_DATA_TYPE: u8 = 0xa1;

const OPTION_STREAM_TERMINATED: u8 = 0x40;
const OPTION_PREVIEW_DATA: u8 = 0x80;

/// Offset of the DMX start code; channel data follows
const START_CODE_OFFSET: usize = 125;
/// Smallest decodable data frame: all layers plus the start code
const MIN_FRAME_LEN: usize = START_CODE_OFFSET + 1;

/// Decoded E1.31 data frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DataFrame {
    /// Source component identifier
    pub cid: SourceCid,
    /// Source name from the framing layer
    pub source_name: String,
    /// Declared priority (0-200)
    pub priority: u8,
    /// Rolling sequence number
    pub sequence: u8,
    /// Preview-data option bit
    pub preview: bool,
    /// Stream-terminated option bit
    pub stream_terminated: bool,
    /// Universe number (1-63999)
    pub universe: u16,
    /// Channel payload, zero-extended to a full universe
    pub channels: [u8; DMX_UNIVERSE_SIZE],
    /// Channels actually carried by the packet
    pub channel_count: u16,
}

/// Reasons a datagram failed to decode as a data frame
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PacketError {
    /// Datagram shorter than the fixed layers
    #[error("datagram too short ({0} bytes)")]
    TooShort(usize),
    /// Root-layer preamble mismatch
    #[error("bad root layer preamble")]
    BadPreamble,
    /// ACN packet identifier mismatch
    #[error("missing ACN packet identifier")]
    BadAcnIdentifier,
    /// Root vector is not E1.31 data
    #[error("unexpected root vector {0:#010x}")]
    BadRootVector(u32),
    /// Framing vector is not a data packet
    #[error("unexpected framing vector {0:#010x}")]
    BadFramingVector(u32),
    /// DMP vector is not set-property
    #[error("unexpected DMP vector {0:#04x}")]
    BadDmpVector(u8),
    /// DMP address/data type mismatch
    #[error("unsupported DMP address type {0:#04x}")]
    BadAddressType(u8),
    /// Property value count outside 1..=513
    #[error("invalid property value count {0}")]
    BadPropertyCount(u16),
    /// Universe outside 1-63999
    #[error("invalid universe {0}")]
    InvalidUniverse(u16),
    /// Priority above 200
    #[error("invalid priority {0}")]
    InvalidPriority(u8),
    /// Start code other than null (not dimmer data)
    #[error("non-zero start code {0:#04x}")]
    NonZeroStartCode(u8),
}

fn read_u16(raw: &[u8], offset: usize) -> u16 {
    u16::from_be_bytes([raw[offset], raw[offset + 1]])
}

fn read_u32(raw: &[u8], offset: usize) -> u32 {
    u32::from_be_bytes([
        raw[offset],
        raw[offset + 1],
        raw[offset + 2],
        raw[offset + 3],
    ])
}

/// Decode one datagram as an E1.31 data frame.
///
/// Packets carrying fewer than 512 channels decode with the payload
/// zero-extended; anything that is not null-start-code dimmer data for a
/// valid universe is an error.
pub fn parse_data_frame(raw: &[u8]) -> Result<DataFrame, PacketError> {
    if raw.len() < MIN_FRAME_LEN {
        return Err(PacketError::TooShort(raw.len()));
    }

    // Root layer
    if read_u16(raw, 0) != PREAMBLE_SIZE || read_u16(raw, 2) != 0 {
        return Err(PacketError::BadPreamble);
    }
    if raw[4..16] != ACN_PACKET_IDENTIFIER {
        return Err(PacketError::BadAcnIdentifier);
    }
    let root_vector = read_u32(raw, 18);
    if root_vector != VECTOR_ROOT_E131_DATA {
        return Err(PacketError::BadRootVector(root_vector));
    }
    let mut cid: SourceCid = [0; 16];
    cid.copy_from_slice(&raw[22..38]);

    // Framing layer
    let framing_vector = read_u32(raw, 40);
    if framing_vector != VECTOR_E131_DATA_PACKET {
        return Err(PacketError::BadFramingVector(framing_vector));
    }
    let name_bytes = &raw[44..108];
    let name_len = name_bytes
        .iter()
        .position(|&b| b == 0)
        .unwrap_or(name_bytes.len());
    let source_name = String::from_utf8_lossy(&name_bytes[..name_len]).into_owned();
    let priority = raw[108];
    if priority > PRIORITY_MAX {
        return Err(PacketError::InvalidPriority(priority));
    }
    let sequence = raw[111];
    let options = raw[112];
    let universe = read_u16(raw, 113);
    if universe == 0 || universe > UNIVERSE_MAX {
        return Err(PacketError::InvalidUniverse(universe));
    }

    // DMP layer
    if raw[117] != VECTOR_DMP_SET_PROPERTY {
        return Err(PacketError::BadDmpVector(raw[117]));
    }
    if raw[118] != DMP_ADDRESS_DATA_TYPE {
        return Err(PacketError::BadAddressType(raw[118]));
    }
    let property_count = read_u16(raw, 123);
    if property_count == 0 || property_count as usize > DMX_UNIVERSE_SIZE + 1 {
        return Err(PacketError::BadPropertyCount(property_count));
    }
    if raw.len() < START_CODE_OFFSET + property_count as usize {
        return Err(PacketError::TooShort(raw.len()));
    }
    let start_code = raw[START_CODE_OFFSET];
    if start_code != 0x00 {
        return Err(PacketError::NonZeroStartCode(start_code));
    }

    let channel_count = property_count - 1;
    let mut channels = [0u8; DMX_UNIVERSE_SIZE];
    let data = &raw[MIN_FRAME_LEN..MIN_FRAME_LEN + channel_count as usize];
    channels[..data.len()].copy_from_slice(data);

    Ok(DataFrame {
        cid,
        source_name,
        priority,
        sequence,
        preview: options & OPTION_PREVIEW_DATA != 0,
        stream_terminated: options & OPTION_STREAM_TERMINATED != 0,
        universe,
        channels,
        channel_count,
    })
}

/// Encode a data frame into its wire representation.
///
/// The inverse of [`parse_data_frame`]; used to generate loopback and test
/// traffic. Only `channel_count` channels are written.
pub fn encode_data_frame(frame: &DataFrame) -> Vec<u8> {
    let channel_count = (frame.channel_count as usize).min(DMX_UNIVERSE_SIZE);
    let total = MIN_FRAME_LEN + channel_count;
    let mut packet = vec![0u8; total];

    // Root layer
    packet[0..2].copy_from_slice(&PREAMBLE_SIZE.to_be_bytes());
    packet[2..4].copy_from_slice(&0x0000u16.to_be_bytes());
    packet[4..16].copy_from_slice(&ACN_PACKET_IDENTIFIER);
    let root_length = (total - 16) as u16;
    packet[16..18].copy_from_slice(&(0x7000 | root_length).to_be_bytes());
    packet[18..22].copy_from_slice(&VECTOR_ROOT_E131_DATA.to_be_bytes());
    packet[22..38].copy_from_slice(&frame.cid);

    // Framing layer
    let framing_length = (total - 38) as u16;
    packet[38..40].copy_from_slice(&(0x7000 | framing_length).to_be_bytes());
    packet[40..44].copy_from_slice(&VECTOR_E131_DATA_PACKET.to_be_bytes());
    let name = frame.source_name.as_bytes();
    let name_len = name.len().min(63);
    packet[44..44 + name_len].copy_from_slice(&name[..name_len]);
    packet[108] = frame.priority;
    packet[109..111].copy_from_slice(&0x0000u16.to_be_bytes());
    packet[111] = frame.sequence;
    let mut options = 0;
    if frame.preview {
        options |= OPTION_PREVIEW_DATA;
    }
    if frame.stream_terminated {
        options |= OPTION_STREAM_TERMINATED;
    }
    packet[112] = options;
    packet[113..115].copy_from_slice(&frame.universe.to_be_bytes());

    // DMP layer
    let dmp_length = (total - 115) as u16;
    packet[115..117].copy_from_slice(&(0x7000 | dmp_length).to_be_bytes());
    packet[117] = VECTOR_DMP_SET_PROPERTY;
    packet[118] = DMP_ADDRESS_DATA_TYPE;
    packet[119..121].copy_from_slice(&0x0000u16.to_be_bytes());
    packet[121..123].copy_from_slice(&0x0001u16.to_be_bytes());
    packet[123..125].copy_from_slice(&((channel_count as u16 + 1).to_be_bytes()));
    packet[START_CODE_OFFSET] = 0x00;
    packet[MIN_FRAME_LEN..].copy_from_slice(&frame.channels[..channel_count]);

    packet
}

/// Wrap-aware sequence comparison.
///
/// A packet is newer when it sits 1..=127 steps ahead of the last accepted
/// sequence; 128..=255 steps ahead reads as stale or out of order.
pub fn sequence_newer(new: u8, last: u8) -> bool {
    matches!(new.wrapping_sub(last), 1..=127)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn test_frame(universe: u16) -> DataFrame {
        let mut channels = [0u8; DMX_UNIVERSE_SIZE];
        channels[0] = 255;
        channels[99] = 42;
        channels[511] = 7;
        DataFrame {
            cid: *b"ledflow-test-cid",
            source_name: "LedFlow".to_string(),
            priority: 150,
            sequence: 17,
            preview: false,
            stream_terminated: false,
            universe,
            channels,
            channel_count: 512,
        }
    }

    #[test]
    fn full_frame_round_trips() {
        let frame = test_frame(22);
        let packet = encode_data_frame(&frame);
        assert_eq!(packet.len(), 638);
        assert_eq!(parse_data_frame(&packet).unwrap(), frame);
    }

    #[test]
    fn wire_offsets_match_the_protocol() {
        let packet = encode_data_frame(&test_frame(1));
        assert_eq!(
            &packet[4..16],
            &[0x41, 0x53, 0x43, 0x2d, 0x45, 0x31, 0x2e, 0x31, 0x37, 0x00, 0x00, 0x00]
        );
        assert_eq!(packet[108], 150); // priority
        assert_eq!(packet[111], 17); // sequence
        assert_eq!(&packet[113..115], &[0, 1]); // universe
        assert_eq!(packet[125], 0x00); // start code
    }

    #[test]
    fn short_payload_is_zero_extended() {
        let mut frame = test_frame(3);
        frame.channel_count = 6;
        let packet = encode_data_frame(&frame);
        assert_eq!(packet.len(), 132);

        let parsed = parse_data_frame(&packet).unwrap();
        assert_eq!(parsed.channel_count, 6);
        assert_eq!(parsed.channels[0], 255);
        // channel 100 was never carried, so it reads dark
        assert_eq!(parsed.channels[99], 0);
    }

    #[test]
    fn options_bits_round_trip() {
        let mut frame = test_frame(9);
        frame.preview = true;
        frame.stream_terminated = true;
        let parsed = parse_data_frame(&encode_data_frame(&frame)).unwrap();
        assert!(parsed.preview);
        assert!(parsed.stream_terminated);
    }

    #[test]
    fn rejects_truncated_datagram() {
        let packet = encode_data_frame(&test_frame(1));
        assert_eq!(
            parse_data_frame(&packet[..100]),
            Err(PacketError::TooShort(100))
        );
    }

    #[test]
    fn rejects_foreign_identifier() {
        let mut packet = encode_data_frame(&test_frame(1));
        packet[4] = b'X';
        assert_eq!(parse_data_frame(&packet), Err(PacketError::BadAcnIdentifier));
    }

    #[test]
    fn rejects_non_data_vectors() {
        let mut packet = encode_data_frame(&test_frame(1));
        packet[21] = 0x08; // extended root vector
        assert_eq!(
            parse_data_frame(&packet),
            Err(PacketError::BadRootVector(0x0000_0008))
        );
    }

    #[test]
    fn rejects_non_zero_start_code() {
        let mut packet = encode_data_frame(&test_frame(1));
        packet[125] = 0xcc; // e.g. RDM traffic
        assert_eq!(
            parse_data_frame(&packet),
            Err(PacketError::NonZeroStartCode(0xcc))
        );
    }

    #[test]
    fn rejects_out_of_range_universe() {
        let mut frame = test_frame(1);
        frame.universe = 0;
        let mut packet = encode_data_frame(&frame);
        packet[113..115].copy_from_slice(&0u16.to_be_bytes());
        assert_eq!(parse_data_frame(&packet), Err(PacketError::InvalidUniverse(0)));

        packet[113..115].copy_from_slice(&64000u16.to_be_bytes());
        assert_eq!(
            parse_data_frame(&packet),
            Err(PacketError::InvalidUniverse(64000))
        );
    }

    #[test]
    fn rejects_priority_above_200() {
        let mut packet = encode_data_frame(&test_frame(1));
        packet[108] = 201;
        assert_eq!(parse_data_frame(&packet), Err(PacketError::InvalidPriority(201)));
    }

    #[test]
    fn sequence_window_accepts_forward_half() {
        // forward steps accepted
        assert!(sequence_newer(1, 0));
        assert!(sequence_newer(127, 0));
        // zero and backward-half steps rejected
        assert!(!sequence_newer(0, 0));
        assert!(!sequence_newer(128, 0));
        assert!(!sequence_newer(255, 0));
    }

    #[test]
    fn sequence_window_tolerates_wraparound() {
        // last accepted 250, sequence 3 is 9 steps ahead through the wrap
        assert!(sequence_newer(3, 250));
        assert!(!sequence_newer(250, 3));
        assert!(sequence_newer(0, 255));
        assert!(!sequence_newer(123, 251)); // 128 ahead: stale
    }

    proptest! {
        #[test]
        fn sequence_order_is_antisymmetric(a: u8, b: u8) {
            // except for equality and the ambiguous half-way distance,
            // exactly one direction reads as newer
            if a != b && a.wrapping_sub(b) != 128 {
                prop_assert_ne!(sequence_newer(a, b), sequence_newer(b, a));
            }
        }

        #[test]
        fn successor_is_always_newer(s: u8) {
            prop_assert!(sequence_newer(s.wrapping_add(1), s));
            prop_assert!(!sequence_newer(s, s.wrapping_add(1)));
        }
    }
}
