//! Error types
//!
//! Errors are scoped the same way they are handled:
//! - [`ProtocolError`] tears down a single transport connection
//! - [`FormatError`] aborts one fragmentation or reassembly call
//! - [`Error::Connection`] removes one subscriber
//! - [`Error::Listener`] is fatal to the server

use std::io;
use std::net::SocketAddr;

use thiserror::Error;

pub use crate::hub::HubError;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, Error)]
pub enum Error {
    /// I/O error
    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    /// Transport framing error
    #[error("Protocol error: {0}")]
    Protocol(#[from] ProtocolError),

    /// Malformed NAL unit or FU-A fragment
    #[error("Format error: {0}")]
    Format(#[from] FormatError),

    /// Broadcast hub is unavailable
    #[error("Hub error: {0}")]
    Hub(#[from] HubError),

    /// Write to a subscriber failed
    #[error("Connection error on subscriber {subscriber_id}: {source}")]
    Connection {
        subscriber_id: u64,
        #[source]
        source: io::Error,
    },

    /// Downstream payload consumer went away
    #[error("Payload sink closed")]
    SinkClosed,

    /// Bind or accept failed on a configured listener
    #[error("Listener error on {addr}: {source}")]
    Listener {
        addr: SocketAddr,
        #[source]
        source: io::Error,
    },
}

/// Length-prefixed transport errors
#[derive(Debug, Error)]
pub enum ProtocolError {
    /// Length prefix exceeds the maximum packet size
    #[error("Invalid packet size {0:#x}")]
    PacketTooLarge(u32),

    /// Connection ended in the middle of a packet
    #[error("Truncated packet: expected {expected} bytes, received {received}")]
    Truncated { expected: usize, received: usize },
}

/// NAL unit and FU-A format errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormatError {
    /// NAL unit shorter than its header
    #[error("NAL unit too short: {0} bytes")]
    NalUnitTooShort(usize),

    /// Serialized fragment shorter than the FU indicator and header
    #[error("FU-A fragment too short: {0} bytes")]
    FragmentTooShort(usize),

    /// FU indicator does not carry the FU-A type
    #[error("Not an FU-A fragment: indicator type {0}")]
    NotFuA(u8),

    /// Fragment budget of zero bytes
    #[error("Fragment payload size must be non-zero")]
    ZeroFragmentSize,

    /// Continuation fragment without a preceding start fragment
    #[error("FU-A continuation without start fragment")]
    UnexpectedContinuation,

    /// Continuation fragment whose NAL type differs from the unit in progress
    #[error("FU-A type mismatch: expected {expected}, got {actual}")]
    TypeMismatch { expected: u8, actual: u8 },
}

impl Error {
    /// Whether this error only affects a single connection
    pub fn is_connection_scoped(&self) -> bool {
        matches!(
            self,
            Error::Io(_) | Error::Protocol(_) | Error::Connection { .. }
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_protocol_error_display() {
        let err = ProtocolError::PacketTooLarge(0x1000000);
        assert_eq!(err.to_string(), "Invalid packet size 0x1000000");
    }

    #[test]
    fn test_connection_scope() {
        let err: Error = ProtocolError::Truncated {
            expected: 10,
            received: 3,
        }
        .into();
        assert!(err.is_connection_scoped());

        let err = Error::Listener {
            addr: "127.0.0.1:1337".parse().unwrap(),
            source: io::Error::new(io::ErrorKind::AddrInUse, "in use"),
        };
        assert!(!err.is_connection_scoped());

        let err: Error = HubError::Closed.into();
        assert!(!err.is_connection_scoped());
    }
}
