#![warn(missing_docs)]

//! FIFOFS wire protocol: fixed-layout framing for the shared request conduit
//! and the per-session reply conduits.

pub mod error;
pub mod frame;
pub mod message;
pub mod wire;

pub use error::{ProtocolError, Result};
pub use message::{OpCode, OpenFlags, Request, Response, SessionId};

/// Size of the fixed name buffer on the wire (39 meaningful bytes + NUL).
pub const NAME_BUF_LEN: usize = 40;

/// Maximum meaningful name length in bytes.
pub const MAX_NAME_LEN: usize = NAME_BUF_LEN - 1;

/// Sentinel written on the wire when an operation fails.
pub const FAILURE_SENTINEL: i32 = -1;
