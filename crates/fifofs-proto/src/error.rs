//! Protocol error types.

use thiserror::Error;

/// Errors produced while encoding or decoding wire messages.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ProtocolError {
    /// Fewer bytes were available than the message layout requires.
    #[error("truncated message: needed {needed} bytes, {available} available")]
    Truncated {
        /// Bytes the layout requires.
        needed: usize,
        /// Bytes actually available.
        available: usize,
    },

    /// A name exceeds the 39-byte maximum (or has no terminator on the wire).
    #[error("name too long: {len} bytes (max {max})")]
    NameTooLong {
        /// Observed length in bytes.
        len: usize,
        /// Maximum permitted length.
        max: usize,
    },

    /// A name field contains bytes that are not valid UTF-8 or an interior NUL.
    #[error("invalid name: {reason}")]
    InvalidName {
        /// Why the name was rejected.
        reason: &'static str,
    },

    /// The operation-code byte does not name any known request kind.
    #[error("unknown operation code: 0x{0:02X}")]
    UnknownOperation(u8),
}

/// Result alias for codec operations.
pub type Result<T> = std::result::Result<T, ProtocolError>;
