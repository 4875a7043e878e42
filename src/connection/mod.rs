//! Connection Handler Module
//!
//! This module manages individual client connections. Each accepted
//! connection is handled by its own async task, so a slow command on one
//! connection never holds up the listener or any other client.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read frame  │───>│ Parse frame │───>│ Execute cmd │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! │                                               │             │
//! │                                               ▼             │
//! │                                      ┌─────────────┐        │
//! │                                      │ Send resp   │        │
//! │                                      └─────────────┘        │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use calc_server::connection::{handle_connection, ConnectionStats};
//! use calc_server::commands::CommandHandler;
//! use calc_server::store::MemoryStore;
//! use std::sync::Arc;
//!
//! let store = Arc::new(MemoryStore::new());
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(store);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats, None));
//! ```

pub mod handler;

pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
