//! Connection sessions
//!
//! - [`IngestSession`] reads packets from the producer and submits them to
//!   the hub
//! - [`SubscriberSession`] drains one subscriber queue onto its connection

pub mod ingest;
pub mod subscriber;

pub use ingest::IngestSession;
pub use subscriber::SubscriberSession;
