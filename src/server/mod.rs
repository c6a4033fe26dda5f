//! Relay server
//!
//! Binds the ingestion and broadcast listeners and wires them to a
//! broadcast hub.

pub mod config;
pub mod listener;

pub use config::{ServerConfig, DEFAULT_BROADCAST_PORT, DEFAULT_INGEST_PORT};
pub use listener::RelayServer;
