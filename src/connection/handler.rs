//! Connection Handler Module
//!
//! This module handles individual client connections. Each client gets its
//! own handler task that runs in a loop, reading a frame, executing it and
//! sending the response before it reads again.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned                       (Open)
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one frame          │ │                (Reading)
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Parse + execute         │ │                (Processing)
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send response           │ │                (Writing)
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Zero-byte read / I/O error / idle timeout
//!        │
//!        ▼
//! 5. Handler dropped, socket closed                  (Closed)
//! ```
//!
//! ## Framing
//!
//! A frame is whatever one read of up to [`FRAME_SIZE`] bytes returns.
//! Nothing is carried over between reads, so a request longer than the
//! buffer is cut short and parsed as it stands.
//!
//! Commands on one connection never overlap: the next read only starts once
//! the previous response has been written in full.

use crate::commands::CommandHandler;
use crate::protocol::{parse_frame, Response, FRAME_SIZE};
use bytes::BytesMut;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt, BufWriter};
use tokio::net::TcpStream;
use tracing::{debug, info, trace, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Frames answered with the command error
    pub protocol_errors: AtomicU64,
    /// Commands that failed in the store
    pub store_failures: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn protocol_error(&self) {
        self.protocol_errors.fetch_add(1, Ordering::Relaxed);
    }

    pub fn store_failure(&self) {
        self.store_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// Owns the socket for the whole session. Dropping the handler closes the
/// socket and marks the connection inactive, whichever way the loop ended.
pub struct ConnectionHandler {
    /// The TCP stream for this connection
    stream: BufWriter<TcpStream>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// Buffer holding the current frame
    buffer: BytesMut,

    /// The command handler (shares the store with every other connection)
    command_handler: CommandHandler,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Close the connection after this long without a frame
    idle_timeout: Option<Duration>,
}

impl ConnectionHandler {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The TCP stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    pub fn new(
        stream: TcpStream,
        addr: SocketAddr,
        command_handler: CommandHandler,
        stats: Arc<ConnectionStats>,
    ) -> Self {
        stats.connection_opened();

        Self {
            stream: BufWriter::new(stream),
            addr,
            buffer: BytesMut::with_capacity(FRAME_SIZE),
            command_handler,
            stats,
            idle_timeout: None,
        }
    }

    /// Closes the connection if no frame arrives within `timeout`.
    pub fn with_idle_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.idle_timeout = timeout;
        self
    }

    /// Runs the main connection loop.
    ///
    /// Returns `Ok(())` when the client closes the connection.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            if self.read_frame().await? == 0 {
                return Ok(());
            }

            let response = self.process_frame().await;
            self.send_response(&response).await?;
        }
    }

    /// Reads one frame into the buffer. Returns the number of bytes read;
    /// zero means the client closed the connection.
    async fn read_frame(&mut self) -> Result<usize, ConnectionError> {
        self.buffer.clear();
        self.buffer.resize(FRAME_SIZE, 0);

        let idle_timeout = self.idle_timeout;
        let read = self.stream.get_mut().read(&mut self.buffer[..]);
        let n = match idle_timeout {
            Some(limit) => tokio::time::timeout(limit, read)
                .await
                .map_err(|_| ConnectionError::IdleTimeout(limit))??,
            None => read.await?,
        };

        self.buffer.truncate(n);
        if n > 0 {
            self.stats.bytes_read(n);
            trace!(client = %self.addr, bytes = n, "Read frame");
        }
        Ok(n)
    }

    /// Parses and executes the frame currently in the buffer.
    async fn process_frame(&mut self) -> Response {
        debug!(
            client = %self.addr,
            frame = %String::from_utf8_lossy(&self.buffer),
            "Received frame"
        );

        let response = match parse_frame(&self.buffer) {
            Ok(command) => self.command_handler.execute(command).await,
            Err(e) => {
                debug!(client = %self.addr, error = %e, "Malformed command");
                Response::CommandError
            }
        };

        self.stats.command_processed();
        match response {
            Response::CommandError => self.stats.protocol_error(),
            Response::StoreFailure => self.stats.store_failure(),
            _ => {}
        }
        response
    }

    /// Sends a response to the client.
    async fn send_response(&mut self, response: &Response) -> Result<(), ConnectionError> {
        let bytes = response.serialize();
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        self.stats.bytes_written(bytes.len());
        trace!(
            client = %self.addr,
            bytes = bytes.len(),
            "Sent response"
        );
        Ok(())
    }
}

impl Drop for ConnectionHandler {
    fn drop(&mut self) {
        self.stats.connection_closed();
    }
}

/// Errors that end a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// No frame arrived within the idle timeout
    #[error("idle for more than {0:?}")]
    IdleTimeout(Duration),
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion.
///
/// # Arguments
///
/// * `stream` - The TCP stream for this connection
/// * `addr` - The client's socket address
/// * `command_handler` - The command handler for executing commands
/// * `stats` - Shared connection statistics
/// * `idle_timeout` - Optional limit on how long the client may stay silent
pub async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    command_handler: CommandHandler,
    stats: Arc<ConnectionStats>,
    idle_timeout: Option<Duration>,
) {
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats)
        .with_idle_timeout(idle_timeout);
    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}
