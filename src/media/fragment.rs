//! RFC 6184 FU-A fragmentation
//!
//! A NAL unit that does not fit in one RTP payload is split into FU-A
//! fragments. Each fragment replaces the NAL header with a two-byte prefix:
//!
//! ```text
//!  FU indicator      FU header
//! +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   | |S|E|R|  Type   |
//! +-+-+-+-+-+-+-+-+ +-+-+-+-+-+-+-+-+
//!        = 28          = NAL type
//! ```
//!
//! The indicator carries NRI from the source header with F cleared. The
//! header carries the start/end markers and the source NAL unit type.
//!
//! A unit whose payload fits in one fragment is emitted as a single fragment
//! with both S and E set. Payloads are `Bytes` slices of the source buffer,
//! so fragmentation never copies media data.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FormatError;

use super::h264::{nal_units, NalHeader, NAL_HEADER_SIZE};

/// NAL unit type value identifying an FU-A fragment
pub const FU_A_TYPE: u8 = 28;

/// Size of the FU indicator plus FU header
pub const FU_HEADER_SIZE: usize = 2;

/// Default fragment payload budget, chosen to keep RTP/UDP/IP packets under
/// a typical Ethernet MTU.
pub const DEFAULT_MAX_FRAGMENT_PAYLOAD: usize = 1100;

/// FU indicator byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuIndicator {
    /// Forbidden zero bit
    pub forbidden: bool,
    /// nal_ref_idc of the fragmented unit (2 bits)
    pub nri: u8,
    /// Payload type (5 bits), 28 for FU-A
    pub fu_type: u8,
}

impl FuIndicator {
    /// Indicator for an FU-A fragment of a unit with the given NRI
    pub fn fu_a(nri: u8) -> Self {
        Self {
            forbidden: false,
            nri: nri & 0x03,
            fu_type: FU_A_TYPE,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        Self {
            forbidden: b & 0x80 != 0,
            nri: (b >> 5) & 0x03,
            fu_type: b & 0x1F,
        }
    }

    pub fn to_byte(&self) -> u8 {
        (u8::from(self.forbidden) << 7) | ((self.nri & 0x03) << 5) | (self.fu_type & 0x1F)
    }
}

/// FU header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FuHeader {
    /// First fragment of the unit
    pub start: bool,
    /// Last fragment of the unit
    pub end: bool,
    /// Reserved, always written as zero
    pub reserved: bool,
    /// Type of the fragmented NAL unit (5 bits)
    pub nal_type: u8,
}

impl FuHeader {
    pub fn new(start: bool, end: bool, nal_type: u8) -> Self {
        Self {
            start,
            end,
            reserved: false,
            nal_type: nal_type & 0x1F,
        }
    }

    pub fn from_byte(b: u8) -> Self {
        Self {
            start: b & 0x80 != 0,
            end: b & 0x40 != 0,
            reserved: b & 0x20 != 0,
            nal_type: b & 0x1F,
        }
    }

    pub fn to_byte(&self) -> u8 {
        (u8::from(self.start) << 7)
            | (u8::from(self.end) << 6)
            | (u8::from(self.reserved) << 5)
            | (self.nal_type & 0x1F)
    }
}

/// One FU-A fragment
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuPacket {
    pub indicator: FuIndicator,
    pub header: FuHeader,
    pub payload: Bytes,
}

impl FuPacket {
    /// Size of the serialized fragment
    pub fn serialized_len(&self) -> usize {
        FU_HEADER_SIZE + self.payload.len()
    }

    /// Append the wire form of this fragment to `buf`
    pub fn write_to(&self, buf: &mut BytesMut) {
        buf.reserve(self.serialized_len());
        buf.put_u8(self.indicator.to_byte());
        buf.put_u8(self.header.to_byte());
        buf.put_slice(&self.payload);
    }

    /// Serialize to `indicator | header | payload`
    pub fn serialize(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.serialized_len());
        self.write_to(&mut buf);
        buf.freeze()
    }

    /// Parse a serialized FU-A fragment.
    ///
    /// The payload is a zero-copy slice of `data`.
    pub fn parse(data: Bytes) -> Result<Self, FormatError> {
        if data.len() < FU_HEADER_SIZE {
            return Err(FormatError::FragmentTooShort(data.len()));
        }

        let indicator = FuIndicator::from_byte(data[0]);
        if indicator.fu_type != FU_A_TYPE {
            return Err(FormatError::NotFuA(indicator.fu_type));
        }

        Ok(Self {
            indicator,
            header: FuHeader::from_byte(data[1]),
            payload: data.slice(FU_HEADER_SIZE..),
        })
    }
}

/// Split one NAL unit (header byte included) into FU-A fragments.
///
/// Produces `max(1, ceil(payload_len / max_payload))` fragments whose
/// payloads concatenate to the unit minus its header byte.
pub fn fragment_nal_unit(nal: Bytes, max_payload: usize) -> Result<Vec<FuPacket>, FormatError> {
    if max_payload == 0 {
        return Err(FormatError::ZeroFragmentSize);
    }
    if nal.len() < NAL_HEADER_SIZE {
        return Err(FormatError::NalUnitTooShort(nal.len()));
    }

    let header = NalHeader::from_byte(nal[0]);
    let indicator = FuIndicator::fu_a(header.nal_ref_idc);
    let payload_len = nal.len() - NAL_HEADER_SIZE;
    let count = payload_len.div_ceil(max_payload).max(1);

    let packets = (0..count)
        .map(|i| {
            let from = NAL_HEADER_SIZE + i * max_payload;
            let to = from + (nal.len() - from).min(max_payload);

            FuPacket {
                indicator,
                header: FuHeader::new(i == 0, i + 1 == count, header.nal_unit_type),
                payload: nal.slice(from..to),
            }
        })
        .collect();

    Ok(packets)
}

/// Fragment every NAL unit in an Annex-B buffer, in stream order.
///
/// A buffer without a start code produces no fragments. A malformed unit
/// fails the whole buffer so a partial frame is never emitted.
pub fn fragment_stream(data: &Bytes, max_payload: usize) -> Result<Vec<FuPacket>, FormatError> {
    let mut packets = Vec::new();

    for unit in nal_units(data) {
        let fragments = fragment_nal_unit(data.slice_ref(unit), max_payload)?;
        packets.extend(fragments);
    }

    Ok(packets)
}
