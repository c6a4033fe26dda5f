//! Hub error types

use thiserror::Error;

/// Error type for hub operations
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HubError {
    /// The coordination task has stopped
    #[error("Broadcast hub closed")]
    Closed,
}
