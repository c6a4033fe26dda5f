//! Client side of the broadcast hub

use tokio::sync::mpsc::error::TryRecvError;
use tokio::sync::{mpsc, oneshot};

use crate::stats::HubStats;

use super::error::HubError;
use super::packet::RawPacket;
use super::shutdown::ShutdownTrigger;

/// Commands processed, in order, by the hub's coordination task
#[derive(Debug)]
pub(super) enum HubCommand {
    Packet(RawPacket),
    Register {
        reply: oneshot::Sender<Subscription>,
    },
    Unregister {
        id: u64,
    },
    Stats {
        reply: oneshot::Sender<HubStats>,
    },
    Shutdown,
}

/// Cloneable handle to a running [`BroadcastHub`](super::BroadcastHub)
///
/// All operations go through one FIFO command queue, so a `register` issued
/// after a `submit` returns never sees that packet, and an `unregister`
/// issued before a `submit` never receives it.
#[derive(Debug, Clone)]
pub struct HubHandle {
    commands: mpsc::Sender<HubCommand>,
    shutdown: ShutdownTrigger,
}

impl HubHandle {
    pub(super) fn new(commands: mpsc::Sender<HubCommand>, shutdown: ShutdownTrigger) -> Self {
        Self { commands, shutdown }
    }

    /// Broadcast a packet to every currently registered subscriber
    pub async fn submit(&self, packet: RawPacket) -> Result<(), HubError> {
        self.send(HubCommand::Packet(packet)).await
    }

    /// Register a new subscriber and return its outbound queue
    pub async fn register(&self) -> Result<Subscription, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Register { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Remove a subscriber. Removing an unknown id is a no-op.
    pub async fn unregister(&self, id: u64) -> Result<(), HubError> {
        self.send(HubCommand::Unregister { id }).await
    }

    /// Snapshot of hub statistics
    pub async fn stats(&self) -> Result<HubStats, HubError> {
        let (reply, rx) = oneshot::channel();
        self.send(HubCommand::Stats { reply }).await?;
        rx.await.map_err(|_| HubError::Closed)
    }

    /// Stop the hub.
    ///
    /// Commands submitted earlier are still applied. If delivery is blocked
    /// on a full subscriber queue for longer than the configured grace
    /// period, the hub abandons the remaining packets and stops anyway.
    /// Subscriber queues close once their already-queued packets are drained.
    pub async fn shutdown(&self) {
        self.shutdown.request();
        if self.send(HubCommand::Shutdown).await.is_err() {
            tracing::debug!("Hub already stopped");
        }
    }

    /// Whether the coordination task has stopped
    pub fn is_closed(&self) -> bool {
        self.commands.is_closed()
    }

    async fn send(&self, command: HubCommand) -> Result<(), HubError> {
        self.commands
            .send(command)
            .await
            .map_err(|_| HubError::Closed)
    }
}

/// A registered subscriber's end of its outbound queue
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    queue: mpsc::Receiver<RawPacket>,
}

impl Subscription {
    pub(super) fn new(id: u64, queue: mpsc::Receiver<RawPacket>) -> Self {
        Self { id, queue }
    }

    /// Subscriber id, unique for the lifetime of the hub
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Next packet; `None` once the hub has removed this subscriber and the
    /// queue is drained
    pub async fn recv(&mut self) -> Option<RawPacket> {
        self.queue.recv().await
    }

    /// Next packet if one is already queued.
    ///
    /// `TryRecvError::Disconnected` means the hub has removed this
    /// subscriber and the queue is drained.
    pub fn try_recv(&mut self) -> Result<RawPacket, TryRecvError> {
        self.queue.try_recv()
    }

    /// Close the queue. The hub stops delivering and drops this subscriber
    /// on its next packet, even if it is blocked on this queue.
    pub fn close(&mut self) {
        self.queue.close();
    }
}
