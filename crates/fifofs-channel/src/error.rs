//! Conduit error types.

use std::path::PathBuf;
use std::time::Duration;

use thiserror::Error;

/// Errors from conduit lifecycle and I/O, carrying the failing operation.
#[derive(Debug, Error)]
pub enum ChannelError {
    /// Creating the FIFO special file failed.
    #[error("failed to create conduit at {path}: {source}")]
    Create {
        /// Target path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Removing the FIFO special file failed.
    #[error("failed to remove conduit at {path}: {source}")]
    Remove {
        /// Target path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Opening the read end failed.
    #[error("failed to open conduit {path} for reading: {source}")]
    Open {
        /// Target path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// Opening the write end failed for a reason other than a missing reader.
    #[error("failed to connect to conduit {path}: {source}")]
    Connect {
        /// Target path.
        path: PathBuf,
        /// Underlying cause.
        #[source]
        source: std::io::Error,
    },

    /// No reader attached to the conduit within the allowed window.
    #[error("no reader attached to {path} within {waited:?}")]
    ConnectTimeout {
        /// Target path.
        path: PathBuf,
        /// How long the rendezvous was attempted.
        waited: Duration,
    },

    /// A read failed.
    #[error("conduit read failed: {0}")]
    Read(#[source] std::io::Error),

    /// A write failed.
    #[error("conduit write failed: {0}")]
    Write(#[source] std::io::Error),

    /// The peer closed the conduit mid-message.
    #[error("conduit closed by peer mid-message")]
    Closed,
}

/// Result alias for conduit operations.
pub type Result<T> = std::result::Result<T, ChannelError>;
