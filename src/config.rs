//! Server configuration.
//!
//! Everything comes from the command line; `RUST_LOG`, when set, overrides
//! `--log-level`.

use clap::Parser;
use std::path::PathBuf;
use std::time::Duration;

/// Command-line arguments for the server
#[derive(Parser, Debug, Clone)]
#[command(name = "calc-server")]
#[command(version)]
#[command(about = "Adds numbers and remembers every result", long_about = None)]
pub struct Config {
    /// Host to bind to
    #[arg(long, default_value = crate::DEFAULT_HOST)]
    pub host: String,

    /// Port to listen on
    #[arg(short, long, default_value_t = crate::DEFAULT_PORT)]
    pub port: u16,

    /// Keep records in this file instead of in memory
    #[arg(short = 'f', long)]
    pub data_file: Option<PathBuf>,

    /// Close connections idle for this many seconds (never, if unset)
    #[arg(long)]
    pub idle_timeout_secs: Option<u64>,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    pub log_level: String,
}

impl Config {
    /// Returns the bind address as a string
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    /// Idle timeout, if one was requested. Zero disables it.
    pub fn idle_timeout(&self) -> Option<Duration> {
        self.idle_timeout_secs
            .filter(|&secs| secs > 0)
            .map(Duration::from_secs)
    }
}
