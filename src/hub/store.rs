//! Broadcast hub implementation
//!
//! The hub is a single task that owns the subscriber registry. Producer
//! packets, registrations and removals all arrive on one command queue and
//! are applied one at a time, so the registry needs no lock.

use std::collections::BTreeMap;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::stats::HubStats;

use super::config::HubConfig;
use super::entry::{Delivery, SubscriberEntry};
use super::handle::{HubCommand, HubHandle, Subscription};
use super::packet::RawPacket;
use super::shutdown::{self, ShutdownDeadline};

/// Single-writer fan-out coordinator
pub struct BroadcastHub {
    /// Registered subscribers, iterated in registration order
    subscribers: BTreeMap<u64, SubscriberEntry>,

    /// Command queue shared by every `HubHandle`
    commands: mpsc::Receiver<HubCommand>,

    /// Next subscriber id
    next_id: u64,

    /// Expires once a requested shutdown has waited out its grace period
    deadline: ShutdownDeadline,

    stats: HubStats,

    config: HubConfig,
}

impl BroadcastHub {
    /// Create a hub with default configuration
    pub fn new() -> (Self, HubHandle) {
        Self::with_config(HubConfig::default())
    }

    /// Create a hub and the handle used to drive it
    pub fn with_config(config: HubConfig) -> (Self, HubHandle) {
        let (tx, rx) = mpsc::channel(config.command_capacity.max(1));
        let (trigger, deadline) = shutdown::channel(config.shutdown_grace);

        let hub = Self {
            subscribers: BTreeMap::new(),
            commands: rx,
            next_id: 0,
            deadline,
            stats: HubStats::default(),
            config,
        };

        (hub, HubHandle::new(tx, trigger))
    }

    /// Spawn the coordination task
    pub fn spawn(config: HubConfig) -> (HubHandle, JoinHandle<()>) {
        let (hub, handle) = Self::with_config(config);
        (handle, tokio::spawn(hub.run()))
    }

    /// Get the hub configuration
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Run until shut down or until every handle is dropped.
    ///
    /// After a shutdown request, queued commands keep being applied until the
    /// `Shutdown` command is reached or the grace period runs out, whichever
    /// comes first.
    pub async fn run(mut self) {
        tracing::debug!(
            queue_capacity = self.config.queue_capacity,
            overflow_policy = %self.config.overflow_policy,
            "Broadcast hub started"
        );

        loop {
            let command = tokio::select! {
                biased;
                _ = self.deadline.expired() => {
                    tracing::warn!("Shutdown grace period expired, abandoning queued commands");
                    break;
                }
                command = self.commands.recv() => match command {
                    Some(command) => command,
                    None => break,
                },
            };

            match command {
                HubCommand::Packet(packet) => {
                    if !self.broadcast(packet).await {
                        tracing::warn!("Shutdown grace period expired during delivery");
                        break;
                    }
                }
                HubCommand::Register { reply } => {
                    let subscription = self.register();
                    let id = subscription.id();
                    if reply.send(subscription).is_err() {
                        // Requester went away before taking its queue
                        self.remove(id, "abandoned");
                    }
                }
                HubCommand::Unregister { id } => self.remove(id, "unregistered"),
                HubCommand::Stats { reply } => {
                    let _ = reply.send(self.snapshot());
                }
                HubCommand::Shutdown => break,
            }
        }

        tracing::info!(
            subscribers = self.subscribers.len(),
            packets = self.stats.packets_received,
            "Broadcast hub stopped"
        );
    }

    fn register(&mut self) -> Subscription {
        let id = self.next_id;
        self.next_id += 1;

        let (tx, rx) = mpsc::channel(self.config.queue_capacity.max(1));
        self.subscribers.insert(id, SubscriberEntry::new(tx));
        self.stats.total_subscribers += 1;

        tracing::info!(
            subscriber_id = id,
            subscribers = self.subscribers.len(),
            "Subscriber registered"
        );

        Subscription::new(id, rx)
    }

    fn remove(&mut self, id: u64, reason: &'static str) {
        if let Some(entry) = self.subscribers.remove(&id) {
            tracing::info!(
                subscriber_id = id,
                reason,
                packets = entry.packets_queued,
                dropped = entry.packets_dropped,
                connected_secs = entry.registered_at.elapsed().as_secs(),
                subscribers = self.subscribers.len(),
                "Subscriber removed"
            );
        }
    }

    /// Returns `false` if delivery was abandoned because of shutdown
    async fn broadcast(&mut self, packet: RawPacket) -> bool {
        self.stats.packets_received += 1;
        self.stats.bytes_received += packet.len() as u64;

        let policy = self.config.overflow_policy;
        let mut closed = Vec::new();
        let mut overflowed = Vec::new();

        for (&id, entry) in self.subscribers.iter_mut() {
            match entry.deliver(packet.clone(), policy, &mut self.deadline).await {
                Delivery::Queued => {}
                Delivery::Abandoned => return false,
                Delivery::Dropped => {
                    self.stats.packets_dropped += 1;
                    tracing::trace!(subscriber_id = id, "Queue full, packet dropped");
                }
                Delivery::Overflowed => overflowed.push(id),
                Delivery::Closed => closed.push(id),
            }
        }

        for id in closed {
            self.remove(id, "closed");
        }
        for id in overflowed {
            self.stats.subscribers_disconnected += 1;
            tracing::warn!(subscriber_id = id, "Subscriber queue overflowed");
            self.remove(id, "overflow");
        }

        true
    }

    fn snapshot(&self) -> HubStats {
        HubStats {
            active_subscribers: self.subscribers.len() as u64,
            ..self.stats.clone()
        }
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use bytes::Bytes;

    use super::*;
    use crate::hub::{HubError, OverflowPolicy, TryRecvError};

    fn packet(n: u8) -> RawPacket {
        RawPacket::new(Bytes::from(vec![0x00, 0x00, 0x01, 0x41, n]))
    }

    #[tokio::test]
    async fn test_register_assigns_unique_ids() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let a = hub.register().await.unwrap();
        let b = hub.register().await.unwrap();
        hub.unregister(a.id()).await.unwrap();
        let c = hub.register().await.unwrap();

        assert_ne!(a.id(), b.id());
        assert_ne!(a.id(), c.id());
        assert_ne!(b.id(), c.id());

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.active_subscribers, 2);
        assert_eq!(stats.total_subscribers, 3);
    }

    #[tokio::test]
    async fn test_late_subscriber_misses_earlier_packets() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut early = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        let mut late = hub.register().await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        assert_eq!(early.recv().await, Some(packet(1)));
        assert_eq!(early.recv().await, Some(packet(2)));
        assert_eq!(late.recv().await, Some(packet(2)));

        // Flush the command queue before checking for extras
        hub.stats().await.unwrap();
        assert_eq!(late.try_recv(), Err(TryRecvError::Empty));
    }

    #[tokio::test]
    async fn test_unregistered_subscriber_stops_receiving() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.unregister(sub.id()).await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        assert_eq!(sub.recv().await, Some(packet(1)));
        assert_eq!(sub.recv().await, None);
    }

    #[tokio::test]
    async fn test_unregister_is_idempotent() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let sub = hub.register().await.unwrap();
        hub.unregister(sub.id()).await.unwrap();
        hub.unregister(sub.id()).await.unwrap();
        hub.unregister(9999).await.unwrap();

        assert_eq!(hub.stats().await.unwrap().active_subscribers, 0);
    }

    #[tokio::test]
    async fn test_fan_out_preserves_order() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut subs = Vec::new();
        for _ in 0..5 {
            subs.push(hub.register().await.unwrap());
        }

        let readers: Vec<_> = subs
            .into_iter()
            .map(|mut sub| {
                tokio::spawn(async move {
                    let mut seen = Vec::new();
                    while let Some(p) = sub.recv().await {
                        seen.push(p.data()[4]);
                    }
                    seen
                })
            })
            .collect();

        for n in 0..100u8 {
            hub.submit(packet(n)).await.unwrap();
        }
        hub.shutdown().await;

        let expected: Vec<u8> = (0..100).collect();
        for reader in readers {
            assert_eq!(reader.await.unwrap(), expected);
        }
    }

    #[tokio::test]
    async fn test_packets_are_shared_not_copied() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut a = hub.register().await.unwrap();
        let mut b = hub.register().await.unwrap();
        let source = packet(7);
        hub.submit(source.clone()).await.unwrap();

        let pa = a.recv().await.unwrap();
        let pb = b.recv().await.unwrap();
        assert_eq!(pa.data().as_ptr(), source.data().as_ptr());
        assert_eq!(pb.data().as_ptr(), source.data().as_ptr());
    }

    #[tokio::test]
    async fn test_block_policy_waits_for_slow_subscriber() {
        let config = HubConfig::default().queue_capacity(1);
        let (hub, _task) = BroadcastHub::spawn(config);

        let mut slow = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        // The hub is blocked delivering packet 2, so stats cannot be served
        let stats = tokio::time::timeout(Duration::from_millis(50), hub.stats()).await;
        assert!(stats.is_err());

        assert_eq!(slow.recv().await, Some(packet(1)));
        assert_eq!(slow.recv().await, Some(packet(2)));
        assert_eq!(hub.stats().await.unwrap().packets_received, 2);
    }

    #[tokio::test]
    async fn test_closed_queue_unblocks_hub() {
        let config = HubConfig::default().queue_capacity(1);
        let (hub, _task) = BroadcastHub::spawn(config);

        let mut stuck = hub.register().await.unwrap();
        let mut healthy = hub.register().await.unwrap();

        hub.submit(packet(1)).await.unwrap();
        assert_eq!(healthy.recv().await, Some(packet(1)));
        hub.submit(packet(2)).await.unwrap();

        // Hub is now waiting on `stuck`; closing it must release the hub
        stuck.close();

        assert_eq!(healthy.recv().await, Some(packet(2)));
        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.active_subscribers, 1);
    }

    #[tokio::test]
    async fn test_drop_newest_policy() {
        let config = HubConfig::default()
            .queue_capacity(1)
            .overflow_policy(OverflowPolicy::DropNewest);
        let (hub, _task) = BroadcastHub::spawn(config);

        let mut slow = hub.register().await.unwrap();
        let mut fast = hub.register().await.unwrap();

        hub.submit(packet(1)).await.unwrap();
        assert_eq!(fast.recv().await, Some(packet(1)));
        hub.submit(packet(2)).await.unwrap();
        assert_eq!(fast.recv().await, Some(packet(2)));

        assert_eq!(slow.recv().await, Some(packet(1)));
        let stats = hub.stats().await.unwrap();
        assert_eq!(slow.try_recv(), Err(TryRecvError::Empty));
        assert_eq!(stats.packets_dropped, 1);
        assert_eq!(stats.active_subscribers, 2);
    }

    #[tokio::test]
    async fn test_disconnect_policy() {
        let config = HubConfig::default()
            .queue_capacity(1)
            .overflow_policy(OverflowPolicy::Disconnect);
        let (hub, _task) = BroadcastHub::spawn(config);

        let mut slow = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.active_subscribers, 0);
        assert_eq!(stats.subscribers_disconnected, 1);

        // Already-queued packet is still delivered, then the queue ends
        assert_eq!(slow.recv().await, Some(packet(1)));
        assert_eq!(slow.recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_closes_queues() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.shutdown().await;
        task.await.unwrap();

        assert_eq!(sub.recv().await, Some(packet(1)));
        assert_eq!(sub.recv().await, None);
        assert!(hub.is_closed());
        assert_eq!(hub.submit(packet(2)).await, Err(HubError::Closed));
        assert!(matches!(hub.register().await, Err(HubError::Closed)));
    }

    #[tokio::test]
    async fn test_shutdown_abandons_stalled_subscriber() {
        let config = HubConfig::default()
            .queue_capacity(1)
            .shutdown_grace(Duration::from_millis(50));
        let (hub, task) = BroadcastHub::spawn(config);

        // Never reads, so delivery of packet 2 blocks
        let mut stalled = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        hub.shutdown().await;
        tokio::time::timeout(Duration::from_secs(2), task)
            .await
            .expect("hub did not stop after the grace period")
            .unwrap();

        assert_eq!(stalled.recv().await, Some(packet(1)));
        assert_eq!(stalled.recv().await, None);
    }

    #[tokio::test]
    async fn test_shutdown_with_default_grace_stops_stalled_hub() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default().queue_capacity(1));

        let _stalled = hub.register().await.unwrap();
        hub.submit(packet(1)).await.unwrap();
        hub.submit(packet(2)).await.unwrap();

        hub.shutdown().await;
        assert!(tokio::time::timeout(Duration::from_secs(2), task).await.is_ok());
    }

    #[tokio::test]
    async fn test_shutdown_drains_within_grace() {
        let config = HubConfig::default()
            .queue_capacity(1)
            .shutdown_grace(Duration::from_secs(5));
        let (hub, task) = BroadcastHub::spawn(config);

        let mut slow = hub.register().await.unwrap();
        for n in 0..5 {
            hub.submit(packet(n)).await.unwrap();
        }
        hub.shutdown().await;

        // A reader that catches up inside the grace period still gets everything
        for n in 0..5 {
            tokio::time::sleep(Duration::from_millis(5)).await;
            assert_eq!(slow.recv().await, Some(packet(n)));
        }
        assert_eq!(slow.recv().await, None);
        task.await.unwrap();
    }

    #[tokio::test]
    async fn test_try_recv_reports_removal() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let mut sub = hub.register().await.unwrap();
        assert_eq!(sub.try_recv(), Err(TryRecvError::Empty));

        hub.submit(packet(1)).await.unwrap();
        hub.unregister(sub.id()).await.unwrap();
        hub.stats().await.unwrap();

        assert_eq!(sub.try_recv(), Ok(packet(1)));
        assert_eq!(sub.try_recv(), Err(TryRecvError::Disconnected));
    }

    #[tokio::test]
    async fn test_stats_counts_bytes() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        hub.submit(packet(1)).await.unwrap();
        hub.submit(RawPacket::new(Bytes::from_static(b"abc"))).await.unwrap();

        let stats = hub.stats().await.unwrap();
        assert_eq!(stats.packets_received, 2);
        assert_eq!(stats.bytes_received, 8);
    }
}
