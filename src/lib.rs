//! # calc-server - A Persistent Arithmetic Service
//!
//! A TCP service that speaks a tiny text protocol. Clients send `add a b`
//! to have the sum computed and stored, or `getall` to read back every
//! stored result. Anything else gets `Error enter command!`.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                             calc-server                                 │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │                         │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────┐     │
//! │                     │   Frame     │    │      Arc<dyn Store>      │     │
//! │                     │   Parser    │    │  MemoryStore | FileStore │     │
//! │                     └─────────────┘    └──────────────────────────┘     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use calc_server::server::Server;
//! use calc_server::store::MemoryStore;
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let store = Arc::new(MemoryStore::new());
//!     let server = Server::bind("127.0.0.1:8888", store).await?;
//!     server.run().await;
//!     Ok(())
//! }
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: frame parsing and response encoding
//! - [`commands`]: executes commands against the store
//! - [`store`]: the persistence collaborator and its implementations
//! - [`connection`]: per-client read/execute/respond loop
//! - [`server`]: listener and connection dispatch
//! - [`client`]: a client that keeps one connection open
//! - [`config`]: command-line configuration for the server binary

pub mod client;
pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod store;

// Re-export commonly used types for convenience
pub use client::{Client, ClientError};
pub use commands::CommandHandler;
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{parse_frame, Command, ParseError, Response};
pub use server::{serve, Server, ServerError};
pub use store::{FileStore, MemoryStore, NewRecord, Record, Store, StoreError};

/// The default port the server listens on
pub const DEFAULT_PORT: u16 = 8888;

/// The default host the server binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of calc-server
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
