//! Wire protocol
//!
//! Producer and subscriber connections carry the same framing: a 4-byte
//! little-endian length followed by that many bytes of packet data.

pub mod codec;

pub use codec::{read_packet, write_packet, LENGTH_PREFIX_SIZE, MAX_PACKET_SIZE};
