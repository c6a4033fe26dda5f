//! FU-A reassembly
//!
//! Rebuilds Annex-B NAL units from a sequence of FU-A fragments. The NAL
//! header is recovered from the indicator's NRI and the FU header's type.

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::FormatError;

use super::fragment::FuPacket;
use super::h264::NalHeader;

const START_CODE: [u8; 4] = [0x00, 0x00, 0x00, 0x01];

/// Reassembles fragmented NAL units
#[derive(Debug, Default)]
pub struct Depacketizer {
    buffer: BytesMut,
    nal_type: Option<u8>,
}

impl Depacketizer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Push the next fragment.
    ///
    /// Returns the completed unit, start code included, once the end
    /// fragment arrives.
    pub fn push(&mut self, fragment: &FuPacket) -> Result<Option<Bytes>, FormatError> {
        if fragment.header.start {
            if self.nal_type.is_some() {
                tracing::warn!(
                    discarded = self.buffer.len(),
                    "FU-A start fragment before previous unit ended"
                );
            }
            self.buffer.clear();

            let header = NalHeader {
                forbidden_zero_bit: fragment.indicator.forbidden,
                nal_ref_idc: fragment.indicator.nri,
                nal_unit_type: fragment.header.nal_type,
            };
            self.buffer.put_slice(&START_CODE);
            self.buffer.put_u8(header.to_byte());
            self.nal_type = Some(fragment.header.nal_type);
        } else {
            match self.nal_type {
                None => return Err(FormatError::UnexpectedContinuation),
                Some(expected) if expected != fragment.header.nal_type => {
                    self.clear();
                    return Err(FormatError::TypeMismatch {
                        expected,
                        actual: fragment.header.nal_type,
                    });
                }
                Some(_) => {}
            }
        }

        self.buffer.put_slice(&fragment.payload);

        if fragment.header.end {
            self.nal_type = None;
            return Ok(Some(self.buffer.split().freeze()));
        }

        Ok(None)
    }

    /// Whether a unit is partially assembled
    pub fn in_progress(&self) -> bool {
        self.nal_type.is_some()
    }

    /// Drop any partially assembled unit
    pub fn clear(&mut self) {
        self.buffer.clear();
        self.nal_type = None;
    }
}
