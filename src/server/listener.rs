//! Relay server listeners
//!
//! Two TCP accept loops share one broadcast hub:
//! - the ingestion listener serves one producer at a time, inline
//! - the broadcast listener spawns a subscriber session per connection

use std::future::Future;
use std::net::SocketAddr;

use tokio::net::{TcpListener, TcpStream};
use tokio::task::JoinHandle;
use tracing::Instrument;

use crate::error::{Error, Result};
use crate::hub::{BroadcastHub, HubHandle};
use crate::server::config::ServerConfig;
use crate::session::{IngestSession, SubscriberSession};

/// Relay server
pub struct RelayServer {
    config: ServerConfig,
    ingest: TcpListener,
    broadcast: TcpListener,
    hub: HubHandle,
    hub_task: JoinHandle<()>,
}

impl RelayServer {
    /// Bind both listeners and start the hub.
    ///
    /// Bind failures are reported as `Error::Listener`.
    pub async fn bind(config: ServerConfig) -> Result<Self> {
        let ingest = bind(config.ingest_addr).await?;
        let broadcast = bind(config.broadcast_addr).await?;
        let (hub, hub_task) = BroadcastHub::spawn(config.hub.clone());

        Ok(Self {
            config,
            ingest,
            broadcast,
            hub,
            hub_task,
        })
    }

    /// Handle to the server's hub
    pub fn hub(&self) -> &HubHandle {
        &self.hub
    }

    /// Bound producer address
    pub fn ingest_addr(&self) -> Result<SocketAddr> {
        Ok(self.ingest.local_addr()?)
    }

    /// Bound subscriber address
    pub fn broadcast_addr(&self) -> Result<SocketAddr> {
        Ok(self.broadcast.local_addr()?)
    }

    /// Run the server
    ///
    /// This method only returns on a listener failure.
    pub async fn run(self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    ///
    /// When `shutdown` resolves both listeners stop and the hub stops. A hub
    /// blocked on a subscriber that stopped reading gives up after the
    /// configured grace period. Subscriber sessions flush what they have
    /// queued, then exit.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        tracing::info!(
            ingest = %self.ingest.local_addr()?,
            broadcast = %self.broadcast.local_addr()?,
            "Relay server listening"
        );

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = ingest_loop(&self.ingest, &self.hub, &self.config) => result,
            result = broadcast_loop(&self.broadcast, &self.hub, &self.config) => result,
        };

        self.hub.shutdown().await;
        if let Err(e) = self.hub_task.await {
            tracing::error!(error = %e, "Broadcast hub task failed");
        }

        result
    }
}

async fn bind(addr: SocketAddr) -> Result<TcpListener> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| Error::Listener { addr, source })
}

async fn accept(listener: &TcpListener, config: &ServerConfig) -> Result<(TcpStream, SocketAddr)> {
    let (socket, peer_addr) = listener.accept().await.map_err(|source| Error::Listener {
        addr: listener
            .local_addr()
            .unwrap_or_else(|_| SocketAddr::from(([0, 0, 0, 0], 0))),
        source,
    })?;

    if config.tcp_nodelay {
        if let Err(e) = socket.set_nodelay(true) {
            tracing::warn!(peer = %peer_addr, error = %e, "Failed to set TCP_NODELAY");
        }
    }

    Ok((socket, peer_addr))
}

/// Serve producers one at a time. Later connections wait in the accept
/// backlog until the current producer disconnects.
async fn ingest_loop(listener: &TcpListener, hub: &HubHandle, config: &ServerConfig) -> Result<()> {
    loop {
        let (socket, peer_addr) = accept(listener, config).await?;
        tracing::info!(peer = %peer_addr, "Producer connected");

        let session = IngestSession::with_capacity(config.read_buffer_size, socket, hub.clone());

        match session.run().await {
            Ok(stats) => {
                tracing::info!(
                    peer = %peer_addr,
                    packets = stats.packets,
                    bytes = stats.bytes,
                    bitrate = stats.bitrate(),
                    "Producer disconnected"
                );
            }
            Err(e) if e.is_connection_scoped() => {
                tracing::warn!(peer = %peer_addr, error = %e, "Producer connection dropped");
            }
            Err(e) => return Err(e),
        }
    }
}

/// Register every accepted connection and spawn its writer loop
async fn broadcast_loop(
    listener: &TcpListener,
    hub: &HubHandle,
    config: &ServerConfig,
) -> Result<()> {
    loop {
        let (socket, peer_addr) = accept(listener, config).await?;
        let subscription = hub.register().await?;
        let id = subscription.id();

        tracing::info!(subscriber_id = id, peer = %peer_addr, "Subscriber connected");

        let session = SubscriberSession::with_capacity(
            config.write_buffer_size,
            subscription,
            socket,
            hub.clone(),
        );
        let span = tracing::debug_span!("subscriber", id, peer = %peer_addr);

        tokio::spawn(
            async move {
                match session.run().await {
                    Ok(stats) => {
                        tracing::info!(packets = stats.packets, "Subscriber finished");
                    }
                    Err(e) => {
                        tracing::info!(error = %e, "Subscriber disconnected");
                    }
                }
            }
            .instrument(span),
        );
    }
}
