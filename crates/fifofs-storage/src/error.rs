//! Storage error types.

use thiserror::Error;

/// Errors surfaced by a storage engine.
///
/// At the wire boundary these collapse to the failure sentinel; the variants
/// exist so server logs report the real cause.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum StorageError {
    /// The named file does not exist and `CREATE` was not requested.
    #[error("file not found: {0}")]
    NotFound(String),

    /// The name exceeds the engine's maximum.
    #[error("name too long: {len} bytes (max {max})")]
    NameTooLong {
        /// Observed length.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// The handle does not refer to an open file.
    #[error("invalid handle: {0}")]
    InvalidHandle(i32),

    /// Teardown was requested while handles remain open.
    #[error("{0} handle(s) still open")]
    HandlesOpen(usize),

    /// The engine has been destroyed and accepts no further operations.
    #[error("storage engine destroyed")]
    Destroyed,
}

/// Result alias for storage operations.
pub type Result<T> = std::result::Result<T, StorageError>;
