//! Hub configuration

use std::fmt;
use std::str::FromStr;
use std::time::Duration;

/// Default capacity of each subscriber's outbound queue, in packets
pub const DEFAULT_QUEUE_CAPACITY: usize = 30;

/// Default capacity of the hub's command queue
pub const DEFAULT_COMMAND_CAPACITY: usize = 30;

/// Default time the hub keeps delivering after shutdown is requested
pub const DEFAULT_SHUTDOWN_GRACE: Duration = Duration::from_secs(1);

/// What the hub does when a subscriber's queue is full
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum OverflowPolicy {
    /// Wait for space. A stalled subscriber stalls every subscriber and the
    /// producer.
    #[default]
    Block,
    /// Skip the packet for that subscriber only
    DropNewest,
    /// Remove the subscriber; its session drains what is queued and exits
    Disconnect,
}

impl OverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            OverflowPolicy::Block => "block",
            OverflowPolicy::DropNewest => "drop-newest",
            OverflowPolicy::Disconnect => "disconnect",
        }
    }
}

impl fmt::Display for OverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for OverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "block" => Ok(OverflowPolicy::Block),
            "drop-newest" => Ok(OverflowPolicy::DropNewest),
            "disconnect" => Ok(OverflowPolicy::Disconnect),
            other => Err(format!(
                "unknown overflow policy '{}' (expected block, drop-newest or disconnect)",
                other
            )),
        }
    }
}

/// Broadcast hub configuration
#[derive(Debug, Clone)]
pub struct HubConfig {
    /// Capacity of each subscriber queue (packets)
    pub queue_capacity: usize,

    /// Capacity of the command queue shared by producer and sessions
    pub command_capacity: usize,

    /// Behaviour on a full subscriber queue
    pub overflow_policy: OverflowPolicy,

    /// How long a shutdown waits for blocked deliveries before abandoning
    /// the remaining queued packets
    pub shutdown_grace: Duration,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            command_capacity: DEFAULT_COMMAND_CAPACITY,
            overflow_policy: OverflowPolicy::Block,
            shutdown_grace: DEFAULT_SHUTDOWN_GRACE,
        }
    }
}

impl HubConfig {
    /// Set the subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the command queue capacity (minimum 1)
    pub fn command_capacity(mut self, capacity: usize) -> Self {
        self.command_capacity = capacity.max(1);
        self
    }

    /// Set the overflow policy
    pub fn overflow_policy(mut self, policy: OverflowPolicy) -> Self {
        self.overflow_policy = policy;
        self
    }

    /// Set the shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }
}
