//! Server error types.

use thiserror::Error;

use fifofs_channel::ChannelError;
use fifofs_proto::ProtocolError;

/// Errors from the server core.
#[derive(Debug, Error)]
pub enum ServerError {
    /// Conduit I/O failure.
    #[error("conduit failure: {0}")]
    Channel(#[from] ChannelError),

    /// Short or malformed message on the shared inbound conduit.
    #[error("protocol failure: {0}")]
    Protocol(#[from] ProtocolError),

    /// No free slot was available for a Mount.
    #[error("session table full")]
    SessionFull,

    /// A message named a session that is not mounted.
    #[error("invalid session id: {0}")]
    InvalidSession(u32),

    /// A session already has a request in flight; the submission was
    /// rejected rather than overwriting the pending request.
    #[error("session {0} already has a request in flight")]
    SessionBusy(u32),

    /// The session's worker task is gone.
    #[error("worker for session {0} has stopped")]
    WorkerGone(u32),
}

/// Result alias for server operations.
pub type Result<T> = std::result::Result<T, ServerError>;
