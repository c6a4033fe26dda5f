//! RTP output tap
//!
//! Turns hub packets into serialized FU-A payloads for an external RTP
//! session. Sequence numbers, timestamps and RTCP belong to that session;
//! this module only decides payload boundaries and the marker bit.

pub mod sink;
pub mod tap;

pub use sink::{ChannelSink, PayloadSink, RtpPayload};
pub use tap::{FragmentTap, TapConfig, DYNAMIC_PAYLOAD_TYPE};
