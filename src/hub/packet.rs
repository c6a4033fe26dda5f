//! Packets routed through the hub
//!
//! A `RawPacket` is one length-delimited unit received from the producer.
//! It usually holds one encoded frame as Annex-B NAL units, but the hub
//! never looks inside it.

use bytes::Bytes;

use crate::media::h264::{nal_units, NalUnits};

/// An immutable packet from the producer
///
/// Cheap to clone: every subscriber queue holds a reference-counted view of
/// the same allocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawPacket {
    data: Bytes,
}

impl RawPacket {
    /// Wrap received bytes
    pub fn new(data: impl Into<Bytes>) -> Self {
        Self { data: data.into() }
    }

    /// Packet contents
    pub fn data(&self) -> &Bytes {
        &self.data
    }

    /// Consume the packet, returning its contents
    pub fn into_bytes(self) -> Bytes {
        self.data
    }

    /// Length in bytes
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether the packet is empty
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Annex-B NAL units contained in the packet
    pub fn nal_units(&self) -> NalUnits<'_> {
        nal_units(&self.data)
    }
}

impl From<Bytes> for RawPacket {
    fn from(data: Bytes) -> Self {
        Self::new(data)
    }
}

impl From<Vec<u8>> for RawPacket {
    fn from(data: Vec<u8>) -> Self {
        Self::new(data)
    }
}

impl From<&'static [u8]> for RawPacket {
    fn from(data: &'static [u8]) -> Self {
        Self::new(Bytes::from_static(data))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clone_shares_allocation() {
        let packet = RawPacket::new(vec![0x00, 0x00, 0x01, 0x65, 0x88]);
        let copy = packet.clone();

        assert_eq!(packet.data().as_ptr(), copy.data().as_ptr());
        assert_eq!(copy.len(), 5);
    }

    #[test]
    fn test_nal_units() {
        let packet = RawPacket::new(Bytes::from_static(&[
            0x00, 0x00, 0x01, 0x09, 0x10, 0x00, 0x00, 0x01, 0x41,
        ]));
        assert_eq!(packet.nal_units().count(), 2);
        assert!(!packet.is_empty());
    }
}
