//! Broadcast hub for single-producer fan-out
//!
//! The hub duplicates each producer packet onto the outbound queue of every
//! registered subscriber. One coordination task owns the registry; producers
//! and sessions talk to it through a cloneable [`HubHandle`].
//!
//! # Architecture
//!
//! ```text
//!   [Ingest session]        [Broadcast listener]      [Subscriber session]
//!    submit(packet)           register()                unregister(id)
//!         │                       │                           │
//!         └───────────────┬───────┴───────────────────────────┘
//!                         ▼
//!               mpsc<HubCommand> (FIFO)
//!                         │
//!                         ▼
//!              ┌──────────────────────┐
//!              │ BroadcastHub task    │
//!              │ subscribers: BTreeMap│
//!              │   id → mpsc::Sender  │
//!              └──────────┬───────────┘
//!            ┌────────────┼────────────┐
//!            ▼            ▼            ▼
//!        queue(30)    queue(30)    queue(30)
//!            │            │            │
//!       [Session]    [Session]    [Session] ──► TCP
//! ```
//!
//! # Zero-Copy Design
//!
//! `RawPacket` wraps `bytes::Bytes`, so each queue holds a reference-counted
//! view of the same allocation.

pub mod config;
mod entry;
pub mod error;
pub mod handle;
pub mod packet;
mod shutdown;
pub mod store;

pub use config::{
    HubConfig, OverflowPolicy, DEFAULT_COMMAND_CAPACITY, DEFAULT_QUEUE_CAPACITY,
    DEFAULT_SHUTDOWN_GRACE,
};
pub use error::HubError;
pub use handle::{HubHandle, Subscription};
pub use packet::RawPacket;
pub use store::BroadcastHub;
pub use tokio::sync::mpsc::error::TryRecvError;
