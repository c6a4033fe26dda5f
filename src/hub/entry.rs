//! Per-subscriber registry entry

use std::time::Instant;

use tokio::sync::mpsc::{self, error::TrySendError};

use super::config::OverflowPolicy;
use super::packet::RawPacket;
use super::shutdown::ShutdownDeadline;

/// Outcome of handing one packet to a subscriber queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum Delivery {
    /// Packet queued
    Queued,
    /// Queue full, packet skipped for this subscriber
    Dropped,
    /// Queue full, subscriber must be removed
    Overflowed,
    /// Session has closed its end of the queue
    Closed,
    /// Shutdown grace period ran out while waiting for queue space
    Abandoned,
}

/// Registry entry owned by the hub's coordination task
#[derive(Debug)]
pub(super) struct SubscriberEntry {
    /// Sending half of the subscriber's outbound queue
    tx: mpsc::Sender<RawPacket>,

    /// When the subscriber was registered
    pub registered_at: Instant,

    /// Packets queued for this subscriber
    pub packets_queued: u64,

    /// Packets skipped under `OverflowPolicy::DropNewest`
    pub packets_dropped: u64,
}

impl SubscriberEntry {
    pub fn new(tx: mpsc::Sender<RawPacket>) -> Self {
        Self {
            tx,
            registered_at: Instant::now(),
            packets_queued: 0,
            packets_dropped: 0,
        }
    }

    /// Enqueue a packet according to `policy`.
    ///
    /// Under `Block` this waits for queue space. A session that closes its
    /// queue while the hub waits wakes the hub with `Closed`, and an expired
    /// shutdown deadline with `Abandoned`.
    pub async fn deliver(
        &mut self,
        packet: RawPacket,
        policy: OverflowPolicy,
        deadline: &mut ShutdownDeadline,
    ) -> Delivery {
        let delivery = match policy {
            OverflowPolicy::Block => tokio::select! {
                biased;
                sent = self.tx.send(packet) => match sent {
                    Ok(()) => Delivery::Queued,
                    Err(_) => Delivery::Closed,
                },
                _ = deadline.expired() => Delivery::Abandoned,
            },
            OverflowPolicy::DropNewest | OverflowPolicy::Disconnect => {
                match self.tx.try_send(packet) {
                    Ok(()) => Delivery::Queued,
                    Err(TrySendError::Closed(_)) => Delivery::Closed,
                    Err(TrySendError::Full(_)) if policy == OverflowPolicy::DropNewest => {
                        Delivery::Dropped
                    }
                    Err(TrySendError::Full(_)) => Delivery::Overflowed,
                }
            }
        };

        match delivery {
            Delivery::Queued => self.packets_queued += 1,
            Delivery::Dropped => self.packets_dropped += 1,
            _ => {}
        }

        delivery
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::hub::shutdown;

    fn packet(b: u8) -> RawPacket {
        RawPacket::new(vec![b])
    }

    fn no_deadline() -> ShutdownDeadline {
        shutdown::channel(Duration::from_secs(60)).1
    }

    #[tokio::test]
    async fn test_deliver_block() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut entry = SubscriberEntry::new(tx);
        let mut deadline = no_deadline();

        assert_eq!(
            entry.deliver(packet(1), OverflowPolicy::Block, &mut deadline).await,
            Delivery::Queued
        );
        assert_eq!(rx.recv().await, Some(packet(1)));
        assert_eq!(entry.packets_queued, 1);
    }

    #[tokio::test]
    async fn test_deliver_drop_newest() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut entry = SubscriberEntry::new(tx);
        let mut deadline = no_deadline();

        assert_eq!(
            entry.deliver(packet(1), OverflowPolicy::DropNewest, &mut deadline).await,
            Delivery::Queued
        );
        assert_eq!(
            entry.deliver(packet(2), OverflowPolicy::DropNewest, &mut deadline).await,
            Delivery::Dropped
        );
        assert_eq!(entry.packets_dropped, 1);
        assert_eq!(rx.recv().await, Some(packet(1)));
    }

    #[tokio::test]
    async fn test_deliver_disconnect() {
        let (tx, _rx) = mpsc::channel(1);
        let mut entry = SubscriberEntry::new(tx);
        let mut deadline = no_deadline();

        entry.deliver(packet(1), OverflowPolicy::Disconnect, &mut deadline).await;
        assert_eq!(
            entry.deliver(packet(2), OverflowPolicy::Disconnect, &mut deadline).await,
            Delivery::Overflowed
        );
    }

    #[tokio::test]
    async fn test_deliver_closed_while_blocked() {
        let (tx, mut rx) = mpsc::channel(1);
        let mut entry = SubscriberEntry::new(tx);
        let mut deadline = no_deadline();
        entry.deliver(packet(1), OverflowPolicy::Block, &mut deadline).await;

        let closer = tokio::spawn(async move {
            tokio::task::yield_now().await;
            rx.close();
        });

        assert_eq!(
            entry.deliver(packet(2), OverflowPolicy::Block, &mut deadline).await,
            Delivery::Closed
        );
        closer.await.unwrap();
    }

    #[tokio::test]
    async fn test_deliver_abandoned_after_grace() {
        let (tx, _rx) = mpsc::channel(1);
        let mut entry = SubscriberEntry::new(tx);
        let (trigger, mut deadline) = shutdown::channel(Duration::from_millis(20));

        entry.deliver(packet(1), OverflowPolicy::Block, &mut deadline).await;
        trigger.request();

        assert_eq!(
            entry.deliver(packet(2), OverflowPolicy::Block, &mut deadline).await,
            Delivery::Abandoned
        );
        assert_eq!(entry.packets_queued, 1);
    }
}
