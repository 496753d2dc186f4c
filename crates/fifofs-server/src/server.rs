//! Server assembly: conduit setup, worker pool, router lifecycle.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use fifofs_channel::{ChannelReader, ChannelWriter};
use fifofs_proto::SessionId;
use fifofs_storage::StorageEngine;

use crate::config::ServerConfig;
use crate::error::Result;
use crate::registry::Registry;
use crate::router::Router;
use crate::worker::SessionWorker;

/// A FIFOFS server instance.
pub struct Server {
    config: ServerConfig,
    engine: Arc<dyn StorageEngine>,
}

impl Server {
    /// Creates a server over the given storage engine.
    pub fn new(config: ServerConfig, engine: Arc<dyn StorageEngine>) -> Self {
        Self { config, engine }
    }

    /// Runs the server until a successful Shutdown request or an
    /// unrecoverable inbound-stream failure.
    pub async fn run(self) -> Result<()> {
        self.run_with_shutdown(CancellationToken::new()).await
    }

    /// Runs the server with an externally supplied shutdown token.
    pub async fn run_with_shutdown(self, shutdown: CancellationToken) -> Result<()> {
        let path = self.config.pipe_path.clone();

        // Recreate the inbound conduit from scratch; a stale one may linger
        // from an earlier run.
        if path.exists() {
            if let Err(err) = fifofs_channel::remove(&path) {
                warn!(%err, "could not remove stale conduit");
            }
        }
        fifofs_channel::create(&path)?;

        let (registry, receivers) = Registry::new(self.config.max_sessions);
        let registry = Arc::new(registry);

        let mut workers: Vec<JoinHandle<()>> = Vec::with_capacity(self.config.max_sessions);
        for (idx, inbox) in receivers.into_iter().enumerate() {
            let worker = SessionWorker::new(
                SessionId::new(idx as u32),
                Arc::clone(&registry),
                Arc::clone(&self.engine),
                inbox,
                shutdown.clone(),
            );
            workers.push(tokio::spawn(worker.run()));
        }

        let reader = ChannelReader::open(&path)?;
        // Keepalive write end: with the server itself holding a writer, the
        // shared conduit never reads EOF between client connections.
        let keepalive = ChannelWriter::connect(&path).await?;

        info!(
            pipe = %path.display(),
            sessions = self.config.max_sessions,
            "fifofs server started"
        );

        let router = Router::new(
            reader,
            Arc::clone(&registry),
            shutdown.clone(),
            self.config.mount_reject_timeout(),
        );
        let result = router.run().await;

        // Stop the pool whether the router ended by shutdown or by error.
        shutdown.cancel();
        for handle in workers {
            if let Err(err) = handle.await {
                warn!(%err, "worker join failed");
            }
        }
        drop(keepalive);
        if let Err(err) = fifofs_channel::remove(&path) {
            warn!(%err, "could not remove conduit at exit");
        }
        info!("fifofs server stopped");
        result
    }
}
