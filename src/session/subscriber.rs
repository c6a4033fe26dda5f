//! Subscriber session
//!
//! Drains one subscriber queue onto its connection. Packets already queued
//! when a write completes are written in the same batch, then the
//! connection is flushed once.
//!
//! On a write failure the session closes its queue first, which releases the
//! hub if it is blocked on this subscriber, then unregisters.

use tokio::io::{AsyncWrite, AsyncWriteExt, BufWriter};

use crate::error::{Error, Result};
use crate::hub::{HubHandle, RawPacket, Subscription};
use crate::protocol::codec::write_packet;
use crate::stats::SessionStats;

/// Default write buffer size for subscriber connections
pub const DEFAULT_WRITE_BUFFER_SIZE: usize = 64 * 1024;

/// Writer loop for one downstream connection
pub struct SubscriberSession<W: AsyncWrite> {
    subscription: Subscription,
    writer: BufWriter<W>,
    hub: HubHandle,
    stats: SessionStats,
}

impl<W: AsyncWrite + Unpin> SubscriberSession<W> {
    pub fn new(subscription: Subscription, writer: W, hub: HubHandle) -> Self {
        Self::with_capacity(DEFAULT_WRITE_BUFFER_SIZE, subscription, writer, hub)
    }

    pub fn with_capacity(
        capacity: usize,
        subscription: Subscription,
        writer: W,
        hub: HubHandle,
    ) -> Self {
        Self {
            subscription,
            writer: BufWriter::with_capacity(capacity, writer),
            hub,
            stats: SessionStats::new(),
        }
    }

    /// Subscriber id
    pub fn id(&self) -> u64 {
        self.subscription.id()
    }

    /// Run until the hub removes this subscriber or a write fails.
    ///
    /// Returns `Error::Connection` after a write failure, once the
    /// subscriber has been unregistered.
    pub async fn run(mut self) -> Result<SessionStats> {
        let id = self.subscription.id();

        match self.drain().await {
            Ok(()) => {
                if let Err(e) = self.writer.shutdown().await {
                    tracing::debug!(subscriber_id = id, error = %e, "Writer shutdown failed");
                }
                tracing::debug!(
                    subscriber_id = id,
                    packets = self.stats.packets,
                    bytes = self.stats.bytes,
                    "Subscriber queue closed by hub"
                );
                Ok(self.stats)
            }
            Err(source) => {
                self.subscription.close();
                if self.hub.unregister(id).await.is_err() {
                    tracing::debug!(subscriber_id = id, "Hub already stopped");
                }

                tracing::debug!(
                    subscriber_id = id,
                    packets = self.stats.packets,
                    error = %source,
                    "Subscriber write failed"
                );
                Err(Error::Connection {
                    subscriber_id: id,
                    source,
                })
            }
        }
    }

    async fn drain(&mut self) -> std::io::Result<()> {
        while let Some(packet) = self.subscription.recv().await {
            self.write(&packet).await?;

            while let Ok(packet) = self.subscription.try_recv() {
                self.write(&packet).await?;
            }

            self.writer.flush().await?;
        }

        self.writer.flush().await
    }

    async fn write(&mut self, packet: &RawPacket) -> std::io::Result<()> {
        write_packet(&mut self.writer, packet)
            .await
            .map_err(|e| match e {
                Error::Io(e) => e,
                other => std::io::Error::new(std::io::ErrorKind::InvalidData, other.to_string()),
            })?;
        self.stats.record(packet.len());
        Ok(())
    }
}
