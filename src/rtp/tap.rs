//! Hub subscriber that fragments packets for RTP

use crate::error::{FormatError, Result};
use crate::hub::{HubHandle, RawPacket, Subscription};
use crate::media::fragment::{fragment_stream, DEFAULT_MAX_FRAGMENT_PAYLOAD};
use crate::stats::TapStats;

use super::sink::{PayloadSink, RtpPayload};

/// First dynamic RTP payload type, conventionally used for H.264
pub const DYNAMIC_PAYLOAD_TYPE: u8 = 96;

/// Tap configuration
#[derive(Debug, Clone)]
pub struct TapConfig {
    /// Fragment payload budget in bytes
    pub max_fragment_payload: usize,

    /// RTP payload type attached to every payload
    pub payload_type: u8,
}

impl Default for TapConfig {
    fn default() -> Self {
        Self {
            max_fragment_payload: DEFAULT_MAX_FRAGMENT_PAYLOAD,
            payload_type: DYNAMIC_PAYLOAD_TYPE,
        }
    }
}

impl TapConfig {
    /// Set the fragment payload budget (minimum 1)
    pub fn max_fragment_payload(mut self, size: usize) -> Self {
        self.max_fragment_payload = size.max(1);
        self
    }

    /// Set the RTP payload type (7 bits)
    pub fn payload_type(mut self, payload_type: u8) -> Self {
        self.payload_type = payload_type & 0x7F;
        self
    }
}

/// Feeds FU-A payloads of every hub packet to a [`PayloadSink`]
///
/// The tap is an ordinary hub subscriber, so it only sees packets submitted
/// after it attached.
pub struct FragmentTap<S> {
    subscription: Subscription,
    hub: HubHandle,
    sink: S,
    config: TapConfig,
    stats: TapStats,
}

impl<S: PayloadSink> FragmentTap<S> {
    /// Register with the hub
    pub async fn attach(hub: HubHandle, sink: S, config: TapConfig) -> Result<Self> {
        let subscription = hub.register().await?;

        tracing::info!(
            subscriber_id = subscription.id(),
            max_fragment_payload = config.max_fragment_payload,
            payload_type = config.payload_type,
            "RTP tap attached"
        );

        Ok(Self {
            subscription,
            hub,
            sink,
            config,
            stats: TapStats::default(),
        })
    }

    /// Subscriber id of the tap
    pub fn id(&self) -> u64 {
        self.subscription.id()
    }

    /// Run until the hub stops or the sink fails
    pub async fn run(mut self) -> Result<TapStats> {
        let id = self.subscription.id();

        while let Some(packet) = self.subscription.recv().await {
            let frame_index = self.stats.frames + self.stats.skipped_frames;

            let payloads = match payloads(&packet, frame_index, &self.config) {
                Ok(payloads) => payloads,
                Err(e) => {
                    self.stats.skipped_frames += 1;
                    tracing::warn!(
                        subscriber_id = id,
                        frame_index,
                        len = packet.len(),
                        error = %e,
                        "Skipping malformed frame"
                    );
                    continue;
                }
            };

            self.stats.frames += 1;

            for payload in payloads {
                if let Err(e) = self.sink.send_payload(payload).await {
                    self.subscription.close();
                    if let Err(unregister) = self.hub.unregister(id).await {
                        tracing::debug!(
                            subscriber_id = id,
                            error = %unregister,
                            "Hub already stopped"
                        );
                    }
                    tracing::info!(subscriber_id = id, error = %e, "RTP tap stopped");
                    return Err(e);
                }
                self.stats.fragments += 1;
            }

            if self.stats.frames % 100 == 0 {
                tracing::debug!(
                    frames = self.stats.frames,
                    fragments = self.stats.fragments,
                    "RTP tap progress"
                );
            }
        }

        tracing::info!(
            subscriber_id = id,
            frames = self.stats.frames,
            fragments = self.stats.fragments,
            skipped = self.stats.skipped_frames,
            "RTP tap detached"
        );

        Ok(self.stats)
    }
}

/// Serialized FU-A payloads for one hub packet, marker on the last one
pub fn payloads(
    packet: &RawPacket,
    frame_index: u64,
    config: &TapConfig,
) -> std::result::Result<Vec<RtpPayload>, FormatError> {
    let fragments = fragment_stream(packet.data(), config.max_fragment_payload)?;
    let last = fragments.len().saturating_sub(1);

    Ok(fragments
        .iter()
        .enumerate()
        .map(|(i, fragment)| RtpPayload {
            data: fragment.serialize(),
            frame_index,
            marker: i == last,
            payload_type: config.payload_type,
        })
        .collect())
}
