//! Statistics and metrics

use std::time::{Duration, Instant};

/// Hub-wide statistics, snapshot taken on the coordination task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HubStats {
    /// Packets submitted by the producer
    pub packets_received: u64,
    /// Bytes submitted by the producer
    pub bytes_received: u64,
    /// Currently registered subscribers
    pub active_subscribers: u64,
    /// Subscribers ever registered
    pub total_subscribers: u64,
    /// Packets skipped for full subscriber queues
    pub packets_dropped: u64,
    /// Subscribers removed because their queue overflowed
    pub subscribers_disconnected: u64,
}

/// Per-connection statistics
#[derive(Debug, Clone)]
pub struct SessionStats {
    /// Packets read or written
    pub packets: u64,
    /// Payload bytes read or written, length prefixes excluded
    pub bytes: u64,
    /// When the session started
    pub started_at: Instant,
}

impl Default for SessionStats {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionStats {
    pub fn new() -> Self {
        Self {
            packets: 0,
            bytes: 0,
            started_at: Instant::now(),
        }
    }

    /// Account one packet of `len` bytes
    pub fn record(&mut self, len: usize) {
        self.packets += 1;
        self.bytes += len as u64;
    }

    /// Time since the session started
    pub fn duration(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Average bitrate in bits per second
    pub fn bitrate(&self) -> u64 {
        let secs = self.duration().as_secs();
        if secs > 0 {
            (self.bytes * 8) / secs
        } else {
            0
        }
    }
}

/// RTP tap statistics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TapStats {
    /// Packets fragmented
    pub frames: u64,
    /// Fragments handed to the sink
    pub fragments: u64,
    /// Packets skipped because they were malformed
    pub skipped_frames: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_stats_record() {
        let mut stats = SessionStats::new();
        stats.record(100);
        stats.record(28);

        assert_eq!(stats.packets, 2);
        assert_eq!(stats.bytes, 128);
    }

    #[test]
    fn test_session_stats_bitrate_zero_duration() {
        let mut stats = SessionStats::new();
        stats.record(1_000_000);

        // Less than a second has passed
        assert_eq!(stats.bitrate(), 0);
    }

    #[test]
    fn test_session_stats_bitrate() {
        let mut stats = SessionStats::new();
        stats.started_at = Instant::now() - Duration::from_secs(10);
        stats.record(1_000_000);

        let bitrate = stats.bitrate();
        // 1,000,000 bytes * 8 bits / ~10 seconds
        assert!((700_000..=800_000).contains(&bitrate));
    }

    #[test]
    fn test_hub_stats_default() {
        let stats = HubStats::default();
        assert_eq!(stats.packets_received, 0);
        assert_eq!(stats.active_subscribers, 0);
        assert_eq!(stats.total_subscribers, 0);
    }
}
