#![warn(missing_docs)]

//! FIFOFS server binary: serves the in-memory reference engine over a
//! shared inbound FIFO.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use fifofs_server::{Server, ServerConfig};
use fifofs_storage::MemoryEngine;

/// FIFOFS file-service server.
#[derive(Debug, Parser)]
#[command(name = "fifofsd")]
struct Args {
    /// Path of the shared inbound FIFO clients write requests to.
    pipe_path: PathBuf,

    /// Number of session slots (one worker per slot).
    #[arg(long, default_value_t = fifofs_server::config::DEFAULT_MAX_SESSIONS)]
    max_sessions: usize,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer())
        .with(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = ServerConfig {
        pipe_path: args.pipe_path,
        max_sessions: args.max_sessions,
        ..ServerConfig::default()
    };

    tracing::info!(pipe = %config.pipe_path.display(), "fifofs server starting...");
    let server = Server::new(config, Arc::new(MemoryEngine::new()));
    server.run().await?;
    Ok(())
}
