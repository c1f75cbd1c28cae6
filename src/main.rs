//! contextd - A Line-Oriented Context Server
//!
//! This is the main entry point for the contextd server.
//! It parses arguments, sets up logging, starts the server and waits for a
//! termination signal.

use clap::Parser;
use contextd::config::{CliArgs, ServerConfig};
use contextd::protocol::types::PROTOCOL_VERSION;
use contextd::server::Server;
use contextd::storage::ContextStore;
use std::sync::Arc;
use tokio::signal;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let args = CliArgs::parse();
    let config = ServerConfig::try_from(&args)?;

    // Set up logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        version = contextd::VERSION,
        protocol = PROTOCOL_VERSION,
        max_connections = config.max_connections,
        read_timeout_secs = config.read_timeout.as_secs(),
        "Starting contextd server"
    );

    // Create the context store (shared across all connections)
    let store = Arc::new(ContextStore::new());

    let server = Server::new(config, store);
    let addr = server.start().await?;
    info!("contextd listening on {}", addr);

    wait_for_shutdown().await?;
    info!("Shutdown signal received, stopping server...");

    server.shutdown().await?;
    Ok(())
}

/// Waits for Ctrl+C or, on Unix, SIGTERM.
async fn wait_for_shutdown() -> std::io::Result<()> {
    #[cfg(unix)]
    {
        let mut terminate = signal::unix::signal(signal::unix::SignalKind::terminate())?;
        tokio::select! {
            result = signal::ctrl_c() => result,
            _ = terminate.recv() => Ok(()),
        }
    }

    #[cfg(not(unix))]
    {
        signal::ctrl_c().await
    }
}
