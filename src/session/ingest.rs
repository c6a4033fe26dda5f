//! Producer session

use tokio::io::{AsyncRead, BufReader};

use crate::error::Result;
use crate::hub::HubHandle;
use crate::protocol::codec::read_packet;
use crate::stats::SessionStats;

/// Default read buffer size for producer connections
pub const DEFAULT_READ_BUFFER_SIZE: usize = 4096;

/// Reads length-prefixed packets from one producer connection
pub struct IngestSession<R> {
    reader: BufReader<R>,
    hub: HubHandle,
    stats: SessionStats,
}

impl<R: AsyncRead + Unpin> IngestSession<R> {
    pub fn new(reader: R, hub: HubHandle) -> Self {
        Self::with_capacity(DEFAULT_READ_BUFFER_SIZE, reader, hub)
    }

    pub fn with_capacity(capacity: usize, reader: R, hub: HubHandle) -> Self {
        Self {
            reader: BufReader::with_capacity(capacity, reader),
            hub,
            stats: SessionStats::new(),
        }
    }

    /// Forward packets until the producer disconnects.
    ///
    /// A clean disconnect returns the session statistics. Framing errors end
    /// the session with `Error::Protocol`; a stopped hub with `Error::Hub`.
    pub async fn run(mut self) -> Result<SessionStats> {
        while let Some(packet) = read_packet(&mut self.reader).await? {
            self.stats.record(packet.len());
            tracing::trace!(len = packet.len(), "Packet received");
            self.hub.submit(packet).await?;
        }

        Ok(self.stats)
    }
}

#[cfg(test)]
mod tests {
    use tokio_test::io::Builder;

    use super::*;
    use crate::error::{Error, ProtocolError};
    use crate::hub::{BroadcastHub, HubConfig, HubError};

    #[tokio::test]
    async fn test_forwards_packets_in_order() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());
        let mut sub = hub.register().await.unwrap();

        let reader = Builder::new()
            .read(&[0x02, 0x00, 0x00, 0x00, 0x09, 0x10])
            .read(&[0x01, 0x00, 0x00, 0x00, 0x41])
            .build();

        let stats = IngestSession::new(reader, hub.clone()).run().await.unwrap();
        assert_eq!(stats.packets, 2);
        assert_eq!(stats.bytes, 3);

        assert_eq!(sub.recv().await.unwrap().data().as_ref(), &[0x09, 0x10]);
        assert_eq!(sub.recv().await.unwrap().data().as_ref(), &[0x41]);
    }

    #[tokio::test]
    async fn test_oversize_prefix_ends_session() {
        let (hub, _task) = BroadcastHub::spawn(HubConfig::default());

        let reader = Builder::new().read(&[0xff, 0xff, 0xff, 0xff]).build();

        let err = IngestSession::new(reader, hub.clone()).run().await.unwrap_err();
        assert!(matches!(
            err,
            Error::Protocol(ProtocolError::PacketTooLarge(0xffff_ffff))
        ));
        assert!(err.is_connection_scoped());
        assert_eq!(hub.stats().await.unwrap().packets_received, 0);
    }

    #[tokio::test]
    async fn test_stopped_hub() {
        let (hub, task) = BroadcastHub::spawn(HubConfig::default());
        hub.shutdown().await;
        task.await.unwrap();

        let reader = Builder::new().read(&[0x01, 0x00, 0x00, 0x00, 0x41]).build();

        let err = IngestSession::new(reader, hub).run().await.unwrap_err();
        assert!(matches!(err, Error::Hub(HubError::Closed)));
    }
}
