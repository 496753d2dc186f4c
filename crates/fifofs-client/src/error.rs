//! Client error types.

use thiserror::Error;

use fifofs_channel::ChannelError;
use fifofs_proto::{OpCode, ProtocolError};

/// Errors surfaced by the client API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// Conduit I/O failure.
    #[error("conduit failure: {0}")]
    Channel(#[from] ChannelError),

    /// Malformed response bytes.
    #[error("protocol failure: {0}")]
    Protocol(#[from] ProtocolError),

    /// The server's session table was full.
    #[error("mount rejected: server session table full")]
    MountRejected,

    /// The server answered with the failure sentinel.
    #[error("server rejected {op:?} request")]
    Rejected {
        /// The operation that failed.
        op: OpCode,
    },

    /// The reply-conduit path is not representable on the wire.
    #[error("client conduit path is not valid UTF-8")]
    InvalidPath,

    /// The server answered with a response of the wrong kind.
    #[error("unexpected response kind for {op:?}")]
    UnexpectedResponse {
        /// The operation that was issued.
        op: OpCode,
    },
}

/// Result alias for client operations.
pub type Result<T> = std::result::Result<T, ClientError>;
