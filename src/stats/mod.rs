//! Statistics for the hub, sessions and the RTP tap

pub mod metrics;

pub use metrics::{HubStats, SessionStats, TapStats};
