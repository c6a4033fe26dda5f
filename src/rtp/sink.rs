//! Payload consumers

use std::future::Future;

use bytes::Bytes;
use tokio::sync::mpsc;

use crate::error::{Error, Result};

/// One serialized FU-A fragment ready to become an RTP payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RtpPayload {
    /// FU indicator, FU header and fragment payload
    pub data: Bytes,
    /// Index of the hub packet this fragment came from
    pub frame_index: u64,
    /// Set on the last fragment of a hub packet
    pub marker: bool,
    /// RTP payload type to send with
    pub payload_type: u8,
}

/// Consumer of serialized fragments, typically an RTP session
pub trait PayloadSink: Send {
    /// Accept one payload. An error stops the tap.
    fn send_payload(&mut self, payload: RtpPayload) -> impl Future<Output = Result<()>> + Send;
}

/// Forwards payloads over a bounded channel
#[derive(Debug, Clone)]
pub struct ChannelSink {
    tx: mpsc::Sender<RtpPayload>,
}

impl ChannelSink {
    /// Create a sink and the receiver an RTP session reads from
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<RtpPayload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self { tx }, rx)
    }
}

impl PayloadSink for ChannelSink {
    async fn send_payload(&mut self, payload: RtpPayload) -> Result<()> {
        self.tx.send(payload).await.map_err(|_| Error::SinkClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn payload(frame_index: u64) -> RtpPayload {
        RtpPayload {
            data: Bytes::from_static(&[0x7c, 0xc5, 0x88]),
            frame_index,
            marker: true,
            payload_type: 96,
        }
    }

    #[tokio::test]
    async fn test_channel_sink_forwards() {
        let (mut sink, mut rx) = ChannelSink::new(4);

        sink.send_payload(payload(0)).await.unwrap();
        sink.send_payload(payload(1)).await.unwrap();

        assert_eq!(rx.recv().await, Some(payload(0)));
        assert_eq!(rx.recv().await, Some(payload(1)));
    }

    #[tokio::test]
    async fn test_channel_sink_closed() {
        let (mut sink, rx) = ChannelSink::new(4);
        drop(rx);

        let err = sink.send_payload(payload(0)).await.unwrap_err();
        assert!(matches!(err, Error::SinkClosed));
    }
}
