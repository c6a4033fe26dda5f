//! H.264 Annex-B parsing
//!
//! Annex-B streams delimit NAL units with start codes:
//!
//! ```text
//! 00 00 01 <NAL unit> 00 00 00 01 <NAL unit> ...
//! ```
//!
//! Every NAL unit begins with a one-byte header:
//!
//! ```text
//! +---------------+
//! |0|1|2|3|4|5|6|7|
//! +-+-+-+-+-+-+-+-+
//! |F|NRI|  Type   |
//! +---------------+
//! ```
//!
//! The scanner here is allocation-free and works on borrowed slices; the
//! fragmenter turns the slices back into `Bytes` views of the source buffer.

/// Size of the H.264 NAL unit header in bytes
pub const NAL_HEADER_SIZE: usize = 1;

const START_CODE: [u8; 3] = [0x00, 0x00, 0x01];

const FORBIDDEN_BIT_MASK: u8 = 0b1000_0000;
const NRI_MASK: u8 = 0b0110_0000;
const TYPE_MASK: u8 = 0b0001_1111;

/// NAL unit type
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NaluType {
    /// Non-IDR slice
    Slice = 1,
    /// Slice data partition A
    SlicePartA = 2,
    /// Slice data partition B
    SlicePartB = 3,
    /// Slice data partition C
    SlicePartC = 4,
    /// IDR slice (keyframe)
    Idr = 5,
    /// Supplemental enhancement information
    Sei = 6,
    /// Sequence parameter set
    Sps = 7,
    /// Picture parameter set
    Pps = 8,
    /// Access unit delimiter
    Aud = 9,
    /// End of sequence
    EndSeq = 10,
    /// End of stream
    EndStream = 11,
    /// Filler data
    Filler = 12,
    /// Fragmentation unit A (RFC 6184)
    FuA = 28,
}

impl NaluType {
    pub fn from_byte(b: u8) -> Option<Self> {
        match b & TYPE_MASK {
            1 => Some(NaluType::Slice),
            2 => Some(NaluType::SlicePartA),
            3 => Some(NaluType::SlicePartB),
            4 => Some(NaluType::SlicePartC),
            5 => Some(NaluType::Idr),
            6 => Some(NaluType::Sei),
            7 => Some(NaluType::Sps),
            8 => Some(NaluType::Pps),
            9 => Some(NaluType::Aud),
            10 => Some(NaluType::EndSeq),
            11 => Some(NaluType::EndStream),
            12 => Some(NaluType::Filler),
            28 => Some(NaluType::FuA),
            _ => None,
        }
    }

    pub fn is_keyframe(&self) -> bool {
        matches!(self, NaluType::Idr)
    }

    pub fn is_parameter_set(&self) -> bool {
        matches!(self, NaluType::Sps | NaluType::Pps)
    }
}

/// Decoded NAL unit header byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NalHeader {
    /// forbidden_zero_bit, must be clear in a valid stream
    pub forbidden_zero_bit: bool,
    /// nal_ref_idc (2 bits)
    pub nal_ref_idc: u8,
    /// nal_unit_type (5 bits)
    pub nal_unit_type: u8,
}

impl NalHeader {
    /// Decode a header byte
    pub fn from_byte(b: u8) -> Self {
        Self {
            forbidden_zero_bit: b & FORBIDDEN_BIT_MASK != 0,
            nal_ref_idc: (b & NRI_MASK) >> 5,
            nal_unit_type: b & TYPE_MASK,
        }
    }

    /// Decode the header of a NAL unit, `None` for an empty slice
    pub fn parse(nal: &[u8]) -> Option<Self> {
        nal.first().copied().map(Self::from_byte)
    }

    /// Encode back into a header byte
    pub fn to_byte(&self) -> u8 {
        (u8::from(self.forbidden_zero_bit) << 7)
            | ((self.nal_ref_idc & 0x03) << 5)
            | (self.nal_unit_type & TYPE_MASK)
    }

    /// Known NAL unit type, if any
    pub fn nalu_type(&self) -> Option<NaluType> {
        NaluType::from_byte(self.nal_unit_type)
    }
}

/// Find the position of the next start code in `data`.
///
/// Searches for `00 00 01`. When the byte before the match is also zero the
/// returned position includes it, so a 4-byte start code `00 00 00 01` is
/// reported from its first byte.
pub fn find_next_start_code(data: &[u8]) -> Option<usize> {
    let pos = data.windows(START_CODE.len()).position(|w| w == START_CODE)?;

    if pos > 0 && data[pos - 1] == 0 {
        Some(pos - 1)
    } else {
        Some(pos)
    }
}

/// Iterator over the NAL units of an Annex-B buffer.
///
/// Yields each unit including its header byte and excluding start codes.
/// A buffer without a start code yields nothing. Two adjacent start codes
/// yield an empty unit, which the fragmenter rejects as malformed.
#[derive(Debug, Clone)]
pub struct NalUnits<'a> {
    data: &'a [u8],
    next_start: Option<usize>,
}

impl<'a> NalUnits<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self {
            data,
            next_start: find_next_start_code(data),
        }
    }
}

impl<'a> Iterator for NalUnits<'a> {
    type Item = &'a [u8];

    fn next(&mut self) -> Option<Self::Item> {
        let mut pos = self.next_start.take()?;

        // Skip the zero run and the 0x01 marker
        while self.data.get(pos) == Some(&0) {
            pos += 1;
        }
        pos += 1;

        if pos >= self.data.len() {
            return None;
        }

        let end = match find_next_start_code(&self.data[pos..]) {
            Some(offset) => {
                self.next_start = Some(pos + offset);
                pos + offset
            }
            None => self.data.len(),
        };

        Some(&self.data[pos..end])
    }
}

/// Split an Annex-B buffer into NAL units
pub fn nal_units(data: &[u8]) -> NalUnits<'_> {
    NalUnits::new(data)
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: [u8; 32] = [
        0x00, 0x00, 0x01, 0x09, 0x10, // AUD
        0x00, 0x00, 0x01, 0x67, 0x42, 0x00, 0x20, 0xe9, 0x00, 0x80, 0x0c, 0x32, // SPS
        0x00, 0x00, 0x01, 0x68, 0xce, 0x3c, 0x80, // PPS
        0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x80, 0x1a, // IDR
    ];

    #[test]
    fn test_find_three_byte_start_code() {
        assert_eq!(find_next_start_code(&[0x00, 0x00, 0x01, 0x67]), Some(0));
        assert_eq!(find_next_start_code(&[0x42, 0x00, 0x00, 0x01, 0x67]), Some(1));
    }

    #[test]
    fn test_find_four_byte_start_code() {
        assert_eq!(find_next_start_code(&[0x00, 0x00, 0x00, 0x01, 0x65]), Some(0));
        assert_eq!(
            find_next_start_code(&[0x80, 0x1a, 0x00, 0x00, 0x00, 0x01, 0x65]),
            Some(2)
        );
    }

    #[test]
    fn test_find_no_start_code() {
        assert_eq!(find_next_start_code(&[]), None);
        assert_eq!(find_next_start_code(&[0x00, 0x00]), None);
        assert_eq!(find_next_start_code(&[0x00, 0x00, 0x02, 0x01]), None);
    }

    #[test]
    fn test_nal_units_sample() {
        let units: Vec<&[u8]> = nal_units(&SAMPLE).collect();

        assert_eq!(units.len(), 4);
        assert_eq!(units[0], &[0x09, 0x10]);
        assert_eq!(
            units[1],
            &[0x67, 0x42, 0x00, 0x20, 0xe9, 0x00, 0x80, 0x0c, 0x32]
        );
        assert_eq!(units[2], &[0x68, 0xce, 0x3c, 0x80]);
        assert_eq!(units[3], &[0x65, 0x88, 0x80, 0x1a]);
    }

    #[test]
    fn test_nal_units_without_start_code() {
        assert_eq!(nal_units(&[0x65, 0x88, 0x80]).count(), 0);
        assert_eq!(nal_units(&[]).count(), 0);
    }

    #[test]
    fn test_nal_units_leading_garbage() {
        let data = [0xff, 0xfe, 0x00, 0x00, 0x01, 0x41, 0x9a];
        let units: Vec<&[u8]> = nal_units(&data).collect();
        assert_eq!(units, vec![&[0x41, 0x9a][..]]);
    }

    #[test]
    fn test_nal_units_trailing_start_code() {
        let data = [0x00, 0x00, 0x01, 0x41, 0x9a, 0x00, 0x00, 0x01];
        let units: Vec<&[u8]> = nal_units(&data).collect();
        assert_eq!(units, vec![&[0x41, 0x9a][..]]);
    }

    #[test]
    fn test_nal_units_adjacent_start_codes() {
        let data = [0x00, 0x00, 0x01, 0x00, 0x00, 0x00, 0x01, 0x41];
        let units: Vec<&[u8]> = nal_units(&data).collect();
        assert_eq!(units.len(), 2);
        assert!(units[0].is_empty());
        assert_eq!(units[1], &[0x41]);
    }

    #[test]
    fn test_nal_header() {
        let header = NalHeader::from_byte(0x67);
        assert!(!header.forbidden_zero_bit);
        assert_eq!(header.nal_ref_idc, 3);
        assert_eq!(header.nal_unit_type, 7);
        assert_eq!(header.nalu_type(), Some(NaluType::Sps));
        assert_eq!(header.to_byte(), 0x67);

        let header = NalHeader::from_byte(0x85);
        assert!(header.forbidden_zero_bit);
        assert_eq!(header.nal_ref_idc, 0);
        assert_eq!(header.nalu_type(), Some(NaluType::Idr));
        assert_eq!(header.to_byte(), 0x85);

        assert_eq!(NalHeader::parse(&[]), None);
    }

    #[test]
    fn test_nalu_type_classification() {
        assert!(NaluType::Idr.is_keyframe());
        assert!(!NaluType::Slice.is_keyframe());
        assert!(NaluType::Sps.is_parameter_set());
        assert!(NaluType::Pps.is_parameter_set());
        assert!(!NaluType::Sei.is_parameter_set());
        assert_eq!(NaluType::from_byte(0x7c), Some(NaluType::FuA));
        assert_eq!(NaluType::from_byte(0x1f), None);
    }
}
