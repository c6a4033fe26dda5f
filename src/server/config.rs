//! Server configuration

use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::hub::{HubConfig, OverflowPolicy};
use crate::session::ingest::DEFAULT_READ_BUFFER_SIZE;
use crate::session::subscriber::DEFAULT_WRITE_BUFFER_SIZE;

/// Default producer port
pub const DEFAULT_INGEST_PORT: u16 = 1337;

/// Default subscriber port
pub const DEFAULT_BROADCAST_PORT: u16 = 1338;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the producer connects to
    pub ingest_addr: SocketAddr,

    /// Address subscribers connect to
    pub broadcast_addr: SocketAddr,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Producer read buffer size
    pub read_buffer_size: usize,

    /// Subscriber write buffer size
    pub write_buffer_size: usize,

    /// Broadcast hub settings
    pub hub: HubConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            ingest_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_INGEST_PORT)),
            broadcast_addr: SocketAddr::from((Ipv4Addr::UNSPECIFIED, DEFAULT_BROADCAST_PORT)),
            tcp_nodelay: true, // Important for low latency
            read_buffer_size: DEFAULT_READ_BUFFER_SIZE,
            write_buffer_size: DEFAULT_WRITE_BUFFER_SIZE,
            hub: HubConfig::default(),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom listener addresses
    pub fn with_addrs(ingest_addr: SocketAddr, broadcast_addr: SocketAddr) -> Self {
        Self {
            ingest_addr,
            broadcast_addr,
            ..Default::default()
        }
    }

    /// Set the producer address
    pub fn ingest_addr(mut self, addr: SocketAddr) -> Self {
        self.ingest_addr = addr;
        self
    }

    /// Set the subscriber address
    pub fn broadcast_addr(mut self, addr: SocketAddr) -> Self {
        self.broadcast_addr = addr;
        self
    }

    /// Enable or disable TCP_NODELAY
    pub fn tcp_nodelay(mut self, enabled: bool) -> Self {
        self.tcp_nodelay = enabled;
        self
    }

    /// Set the per-subscriber queue capacity
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.hub = self.hub.queue_capacity(capacity);
        self
    }

    /// Set the overflow policy for full subscriber queues
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.hub = self.hub.overflow_policy(policy);
        self
    }

    /// Set how long shutdown waits on subscribers that stopped reading
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.hub = self.hub.shutdown_grace(grace);
        self
    }

    /// Set the hub configuration
    pub fn hub(mut self, hub: HubConfig) -> Self {
        self.hub = hub;
        self
    }
}
