use std::net::SocketAddr;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::info;

use nalcast::{OverflowPolicy, RelayServer, ServerConfig};

#[derive(Parser, Debug)]
#[command(name = "nalcast")]
#[command(about = "H.264 Annex-B broadcast relay", long_about = None)]
struct Args {
    /// Producer listen address
    #[arg(long, env = "NALCAST_INGEST_ADDR", default_value = "0.0.0.0:1337")]
    ingest_addr: SocketAddr,

    /// Subscriber listen address
    #[arg(long, env = "NALCAST_BROADCAST_ADDR", default_value = "0.0.0.0:1338")]
    broadcast_addr: SocketAddr,

    /// Packets buffered per subscriber
    #[arg(long, env = "NALCAST_QUEUE_CAPACITY", default_value_t = nalcast::hub::DEFAULT_QUEUE_CAPACITY)]
    queue_capacity: usize,

    /// What to do when a subscriber queue is full (block, drop-newest, disconnect)
    #[arg(long, env = "NALCAST_OVERFLOW_POLICY", default_value = "block")]
    overflow_policy: OverflowPolicy,

    /// Milliseconds to keep delivering to slow subscribers after Ctrl-C
    #[arg(long, env = "NALCAST_SHUTDOWN_GRACE_MS", default_value_t = 1000)]
    shutdown_grace_ms: u64,

    /// Leave Nagle's algorithm enabled on accepted sockets
    #[arg(long, env = "NALCAST_NO_NODELAY")]
    no_nodelay: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "nalcast=info".into()),
        )
        .init();

    let args = Args::parse();

    let config = ServerConfig::with_addrs(args.ingest_addr, args.broadcast_addr)
        .tcp_nodelay(!args.no_nodelay)
        .queue_capacity(args.queue_capacity)
        .overflow_policy(args.overflow_policy)
        .shutdown_grace(Duration::from_millis(args.shutdown_grace_ms));

    info!(
        queue_capacity = config.hub.queue_capacity,
        overflow_policy = %config.hub.overflow_policy,
        "Starting relay"
    );

    let server = RelayServer::bind(config)
        .await
        .context("failed to bind listeners")?;

    server
        .run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for ctrl-c");
                std::future::pending::<()>().await;
            }
        })
        .await?;

    info!("Relay stopped");
    Ok(())
}
