//! calc-server - A Persistent Arithmetic Service
//!
//! This is the main entry point for the server.
//! It sets up logging, the store and the TCP listener, then serves until Ctrl+C.

use calc_server::config::Config;
use calc_server::server::Server;
use calc_server::store::{FileStore, MemoryStore, Store};
use clap::Parser;
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Parse command-line arguments
    let config = Config::parse();

    // Set up logging
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .init();

    info!(
        version = calc_server::VERSION,
        address = %config.bind_address(),
        data_file = ?config.data_file,
        idle_timeout = ?config.idle_timeout(),
        "Starting calc-server"
    );

    // The one store shared by every connection
    let store: Arc<dyn Store> = match &config.data_file {
        Some(path) => Arc::new(FileStore::new(path)),
        None => Arc::new(MemoryStore::new()),
    };

    let server = match Server::bind(&config.bind_address(), store).await {
        Ok(server) => server.with_idle_timeout(config.idle_timeout()),
        Err(e) => {
            error!(error = %e, "Server failed to start");
            return Err(e.into());
        }
    };

    // Set up graceful shutdown
    let shutdown = async {
        match signal::ctrl_c().await {
            Ok(()) => info!("Shutdown signal received, stopping server..."),
            Err(e) => {
                // Without a signal handler, run until the process is killed
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await
            }
        }
    };

    server.run_until(shutdown).await;

    info!("Server shutdown complete");
    Ok(())
}
