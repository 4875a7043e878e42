//! Client
//!
//! Keeps one connection open and sends one command per call. Responses
//! carry no length or terminator, so a response is everything that arrives
//! until the connection stays quiet for the settle window, or closes.

use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpStream, ToSocketAddrs};
use tokio::time::timeout;
use tracing::{debug, trace};

/// How long the connection must stay quiet before a response is complete.
pub const DEFAULT_SETTLE_WINDOW: Duration = Duration::from_millis(200);

/// Errors seen by the client.
#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The server closed the connection without answering
    #[error("connection closed by server")]
    Closed,
}

/// A connection to the server.
#[derive(Debug)]
pub struct Client {
    stream: TcpStream,
    settle: Duration,
}

impl Client {
    /// Connects to the server at `addr`.
    pub async fn connect(addr: impl ToSocketAddrs) -> std::io::Result<Self> {
        let stream = TcpStream::connect(addr).await?;
        debug!(server = ?stream.peer_addr().ok(), "Connected");
        Ok(Self {
            stream,
            settle: DEFAULT_SETTLE_WINDOW,
        })
    }

    /// Changes how long the client waits for more response bytes.
    pub fn with_settle_window(mut self, settle: Duration) -> Self {
        self.settle = settle;
        self
    }

    /// Sends one command and returns the response text.
    ///
    /// An empty string is a valid response (`getall` on an empty store).
    pub async fn send(&mut self, command: &str) -> Result<String, ClientError> {
        self.stream.write_all(command.as_bytes()).await?;
        self.stream.flush().await?;
        trace!(command, "Sent command");

        let mut response = Vec::new();
        let mut buf = [0u8; 1024];
        loop {
            match timeout(self.settle, self.stream.read(&mut buf)).await {
                // Quiet for a whole window: the response is complete
                Err(_) => break,
                Ok(Ok(0)) => {
                    if response.is_empty() {
                        return Err(ClientError::Closed);
                    }
                    break;
                }
                Ok(Ok(n)) => response.extend_from_slice(&buf[..n]),
                Ok(Err(e)) => return Err(e.into()),
            }
        }

        trace!(bytes = response.len(), "Received response");
        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    /// Gives back the underlying stream.
    pub fn into_inner(self) -> TcpStream {
        self.stream
    }
}
