//! calc-client
//!
//! Reads commands from stdin, one per line, sends each over a single
//! connection and prints whatever the server answers.

use calc_server::client::{Client, ClientError};
use clap::Parser;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

/// Command-line client for calc-server
#[derive(Parser, Debug)]
#[command(name = "calc-client")]
#[command(version)]
#[command(about = "Send commands to a calc-server", long_about = None)]
struct Args {
    /// Server address
    #[arg(short, long, default_value = "127.0.0.1:8888")]
    server: String,

    /// Milliseconds of silence that mark the end of a response
    #[arg(long, default_value_t = 200)]
    settle_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "warn")]
    log_level: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&args.log_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let mut client = Client::connect(args.server.as_str())
        .await?
        .with_settle_window(Duration::from_millis(args.settle_ms));
    info!(server = %args.server, "Connected");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        if line.is_empty() {
            continue;
        }

        match client.send(&line).await {
            Ok(response) => println!("Received: {}", response),
            Err(ClientError::Closed) => {
                warn!("Server closed the connection");
                break;
            }
            Err(e) => return Err(e.into()),
        }
    }

    Ok(())
}
