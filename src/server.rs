//! TCP Server
//!
//! Binds the listening socket and hands every accepted connection to its
//! own task. The accept loop never waits on a connection, so one slow
//! client cannot delay the next accept.
//!
//! The store is bootstrapped before the socket is bound: if
//! `ensure_schema` fails, no connection is ever accepted.

use crate::commands::CommandHandler;
use crate::connection::{handle_connection, ConnectionStats};
use crate::store::{Store, StoreError};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tracing::{error, info};

/// Errors that stop the server before it accepts anything.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    /// The store could not prepare its schema
    #[error("store bootstrap failed: {0}")]
    Bootstrap(#[source] StoreError),

    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },
}

/// A bound server, ready to accept connections.
pub struct Server {
    listener: TcpListener,
    store: Arc<dyn Store>,
    stats: Arc<ConnectionStats>,
    idle_timeout: Option<Duration>,
}

impl Server {
    /// Bootstraps the store, then binds to `addr` (`host:port`).
    pub async fn bind(addr: &str, store: Arc<dyn Store>) -> Result<Self, ServerError> {
        info!("Initializing store...");
        store.ensure_schema().await.map_err(ServerError::Bootstrap)?;
        info!("Store initialized");

        let listener = TcpListener::bind(addr)
            .await
            .map_err(|source| ServerError::Bind {
                addr: addr.to_string(),
                source,
            })?;

        Ok(Self {
            listener,
            store,
            stats: Arc::new(ConnectionStats::new()),
            idle_timeout: None,
        })
    }

    /// Closes connections that stay silent for longer than `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// The address the server is listening on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Shared connection statistics.
    pub fn stats(&self) -> Arc<ConnectionStats> {
        Arc::clone(&self.stats)
    }

    /// Accepts connections until the process ends.
    pub async fn run(self) {
        if let Ok(addr) = self.local_addr() {
            info!("Server listening on {}", addr);
        }
        self.accept_loop().await
    }

    /// Accepts connections until `shutdown` completes.
    ///
    /// Connections already in progress keep running on their own tasks.
    pub async fn run_until<F>(self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        tokio::select! {
            _ = self.run() => {}
            _ = shutdown => {
                info!("Stopped accepting connections");
            }
        }
    }

    /// Main loop that accepts incoming connections
    async fn accept_loop(self) {
        loop {
            match self.listener.accept().await {
                Ok((stream, addr)) => {
                    let handler = CommandHandler::new(Arc::clone(&self.store));
                    let stats = Arc::clone(&self.stats);
                    let idle_timeout = self.idle_timeout;

                    tokio::spawn(supervise(stream, addr, handler, stats, idle_timeout));
                }
                Err(e) => {
                    error!("Failed to accept connection: {}", e);
                }
            }
        }
    }
}

/// Runs one connection on its own task and reports if it panicked.
///
/// A panic unwinds only that task; the socket is dropped with it.
async fn supervise(
    stream: TcpStream,
    addr: SocketAddr,
    handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    idle_timeout: Option<Duration>,
) {
    let task = tokio::spawn(handle_connection(stream, addr, handler, stats, idle_timeout));
    if let Err(e) = task.await {
        if e.is_panic() {
            error!(client = %addr, "Connection handler panicked");
        }
    }
}

/// Bootstraps `store`, binds `host:port` and serves forever.
pub async fn serve(host: &str, port: u16, store: Arc<dyn Store>) -> Result<(), ServerError> {
    let server = Server::bind(&format!("{}:{}", host, port), store).await?;
    server.run().await;
    Ok(())
}
