//! Media handling
//!
//! This module provides:
//! - Annex-B start-code scanning and NAL header parsing
//! - RFC 6184 FU-A fragmentation and fragment serialization
//! - FU-A reassembly back into Annex-B units

pub mod depacketizer;
pub mod fragment;
pub mod h264;

pub use depacketizer::Depacketizer;
pub use fragment::{
    fragment_nal_unit, fragment_stream, FuHeader, FuIndicator, FuPacket,
    DEFAULT_MAX_FRAGMENT_PAYLOAD, FU_A_TYPE, FU_HEADER_SIZE,
};
pub use h264::{find_next_start_code, nal_units, NalHeader, NalUnits, NaluType, NAL_HEADER_SIZE};
