//! Shutdown deadline shared by the hub's handles and its task

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::Instant;

/// Requesting side, held by every `HubHandle`
#[derive(Debug, Clone)]
pub(super) struct ShutdownTrigger {
    requested: Arc<watch::Sender<Option<Instant>>>,
}

impl ShutdownTrigger {
    /// Record the first shutdown request; later requests keep the original time
    pub fn request(&self) {
        self.requested.send_if_modified(|requested| {
            if requested.is_none() {
                *requested = Some(Instant::now());
                true
            } else {
                false
            }
        });
    }
}

/// Hub side: resolves once the grace period after a request has passed
#[derive(Debug)]
pub(super) struct ShutdownDeadline {
    requested: watch::Receiver<Option<Instant>>,
    grace: Duration,
}

impl ShutdownDeadline {
    /// Wait until the grace period after a shutdown request has elapsed.
    ///
    /// Never resolves if no request is made before every handle is dropped.
    pub async fn expired(&mut self) {
        let requested_at = match self.requested.wait_for(Option::is_some).await {
            Ok(requested) => *requested,
            Err(_) => None,
        };

        match requested_at {
            Some(at) => tokio::time::sleep_until(at + self.grace).await,
            None => std::future::pending().await,
        }
    }
}

pub(super) fn channel(grace: Duration) -> (ShutdownTrigger, ShutdownDeadline) {
    let (tx, rx) = watch::channel(None);
    (
        ShutdownTrigger {
            requested: Arc::new(tx),
        },
        ShutdownDeadline {
            requested: rx,
            grace,
        },
    )
}
