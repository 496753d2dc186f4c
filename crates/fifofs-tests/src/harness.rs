//! Test harness: a real server over FIFOs in a temporary directory.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use tempfile::TempDir;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use fifofs_server::{Server, ServerConfig};
use fifofs_storage::{MemoryEngine, StorageEngine};

/// A running server instance backed by an in-memory engine.
///
/// Conduit paths live under a per-test temporary directory and must stay
/// short: the wire carries them in a fixed 40-byte name buffer.
pub struct TestServer {
    dir: TempDir,
    pipe_path: PathBuf,
    engine: Arc<MemoryEngine>,
    shutdown: CancellationToken,
    task: JoinHandle<fifofs_server::Result<()>>,
}

impl TestServer {
    /// Starts a server with `max_sessions` slots and waits until its
    /// inbound conduit exists on disk.
    pub async fn start(max_sessions: usize) -> Self {
        let dir = tempfile::tempdir().expect("failed to create temp dir");
        let pipe_path = dir.path().join("srv");

        let config = ServerConfig {
            pipe_path: pipe_path.clone(),
            max_sessions,
            mount_reject_timeout_ms: 500,
        };
        let engine = Arc::new(MemoryEngine::new());
        let shutdown = CancellationToken::new();
        let server = Server::new(config, Arc::clone(&engine) as Arc<dyn StorageEngine>);
        let task = tokio::spawn(server.run_with_shutdown(shutdown.clone()));

        while !pipe_path.exists() {
            tokio::time::sleep(Duration::from_millis(5)).await;
        }

        Self {
            dir,
            pipe_path,
            engine,
            shutdown,
            task,
        }
    }

    /// Path of the shared inbound conduit.
    pub fn pipe_path(&self) -> &Path {
        &self.pipe_path
    }

    /// A client reply-conduit path inside the test directory.
    pub fn client_path(&self, name: &str) -> PathBuf {
        self.dir.path().join(name)
    }

    /// The storage engine behind the server, for state assertions.
    pub fn engine(&self) -> &MemoryEngine {
        &self.engine
    }

    /// Cancels the server and waits for it to exit.
    pub async fn stop(self) {
        self.shutdown.cancel();
        self.task
            .await
            .expect("server task panicked")
            .expect("server exited with error");
    }

    /// Waits for the server to exit on its own, after a Shutdown request.
    pub async fn join(self) {
        self.task
            .await
            .expect("server task panicked")
            .expect("server exited with error");
    }
}
