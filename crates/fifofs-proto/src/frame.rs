//! Framing helpers for the request router.
//!
//! The router reads one message at a time off the shared inbound conduit.
//! It only needs to know how many bytes each operation occupies and where
//! the owning session id sits; full semantic decoding happens in the
//! session worker.

use crate::error::{ProtocolError, Result};
use crate::message::OpCode;
use crate::NAME_BUF_LEN;

/// Number of fixed-field bytes following the operation-code byte.
pub fn fixed_len(op: OpCode) -> usize {
    match op {
        OpCode::Mount => NAME_BUF_LEN,
        OpCode::Unmount | OpCode::Shutdown => 4,
        OpCode::Open => 4 + NAME_BUF_LEN + 4,
        OpCode::Close => 4 + 4,
        OpCode::Write | OpCode::Read => 4 + 4 + 8,
    }
}

/// Number of variable payload bytes following the fixed fields.
///
/// Only Write requests carry a payload; its length is the u64 at the end of
/// the fixed fields.
pub fn payload_len(op: OpCode, fixed: &[u8]) -> Result<usize> {
    if fixed.len() < fixed_len(op) {
        return Err(ProtocolError::Truncated {
            needed: fixed_len(op),
            available: fixed.len(),
        });
    }
    match op {
        OpCode::Write => {
            let b = &fixed[8..16];
            Ok(u64::from_be_bytes([
                b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
            ]) as usize)
        }
        _ => Ok(0),
    }
}

/// Extracts the owning session id from the fixed fields.
///
/// Mount requests carry no session id (the server assigns one); every other
/// kind leads with it.
pub fn session_id(op: OpCode, fixed: &[u8]) -> Result<Option<u32>> {
    if op == OpCode::Mount {
        return Ok(None);
    }
    if fixed.len() < 4 {
        return Err(ProtocolError::Truncated {
            needed: 4,
            available: fixed.len(),
        });
    }
    Ok(Some(u32::from_be_bytes([
        fixed[0], fixed[1], fixed[2], fixed[3],
    ])))
}
