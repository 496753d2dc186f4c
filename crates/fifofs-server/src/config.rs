//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default number of session slots when none is configured.
pub const DEFAULT_MAX_SESSIONS: usize = 16;

/// Configuration for a FIFOFS server instance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Path of the shared inbound FIFO all clients write to.
    pub pipe_path: PathBuf,
    /// Number of session slots; fixes the worker-pool size at startup.
    pub max_sessions: usize,
    /// How long the router waits for a rejected Mount's client to attach
    /// its read end before giving up on the `-1` reply. Bounded so a dead
    /// client cannot stall the router.
    pub mount_reject_timeout_ms: u64,
}

impl ServerConfig {
    /// Configuration with defaults for everything but the FIFO path.
    pub fn new(pipe_path: impl Into<PathBuf>) -> Self {
        Self {
            pipe_path: pipe_path.into(),
            ..Self::default()
        }
    }

    /// The Mount-rejection reply window as a `Duration`.
    pub fn mount_reject_timeout(&self) -> Duration {
        Duration::from_millis(self.mount_reject_timeout_ms)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            pipe_path: PathBuf::from("/tmp/fifofs.pipe"),
            max_sessions: DEFAULT_MAX_SESSIONS,
            mount_reject_timeout_ms: 1_000,
        }
    }
}
