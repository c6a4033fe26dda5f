//! nalcast: H.264 Annex-B relay
//!
//! A producer streams length-prefixed packets of Annex-B H.264 to the
//! ingestion port. Every packet is fanned out unchanged to each subscriber
//! connected to the broadcast port, in arrival order.
//!
//! The media layer also splits NAL units into RFC 6184 FU-A fragments for
//! RTP transport, and reassembles them.
//!
//! # Example
//!
//! ```no_run
//! use nalcast::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> nalcast::Result<()> {
//!     let server = RelayServer::bind(ServerConfig::default()).await?;
//!     server.run().await
//! }
//! ```
//!
//! # Fragmenting a buffer
//!
//! ```
//! use bytes::Bytes;
//! use nalcast::media::fragment_stream;
//!
//! let buf = Bytes::from_static(&[0x00, 0x00, 0x00, 0x01, 0x65, 0x88, 0x84]);
//! let fragments = fragment_stream(&buf, 1100).unwrap();
//!
//! assert_eq!(fragments.len(), 1);
//! assert!(fragments[0].header.start && fragments[0].header.end);
//! assert_eq!(fragments[0].serialize().as_ref(), &[0x7C, 0xC5, 0x88, 0x84]);
//! ```

pub mod error;
pub mod hub;
pub mod media;
pub mod protocol;
pub mod rtp;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use hub::{BroadcastHub, HubConfig, HubHandle, OverflowPolicy, RawPacket, Subscription};
pub use server::{RelayServer, ServerConfig};
