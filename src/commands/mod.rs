//! Command Handler Module
//!
//! This module implements the command execution layer. It receives parsed
//! commands, runs them against the store, and returns the response to send.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Frame Parser   │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (store module)
//! └─────────────────┘
//! ```

pub mod handler;

pub use handler::CommandHandler;
