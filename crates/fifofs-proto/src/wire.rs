//! Low-level field encoding/decoding over fixed-layout byte buffers.
//!
//! All multi-byte integers are big-endian. Names travel in a fixed 40-byte
//! buffer: at most 39 meaningful bytes, NUL-terminated, zero-padded.

use bytes::{Bytes, BytesMut};

use crate::error::{ProtocolError, Result};
use crate::{MAX_NAME_LEN, NAME_BUF_LEN};

/// Writes protocol fields into a growable byte buffer.
pub struct WireEncoder {
    buf: BytesMut,
}

impl WireEncoder {
    /// Creates an empty encoder.
    pub fn new() -> Self {
        Self {
            buf: BytesMut::new(),
        }
    }

    /// Creates an encoder with pre-reserved capacity.
    pub fn with_capacity(cap: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(cap),
        }
    }

    /// Encodes a single byte.
    pub fn encode_u8(&mut self, v: u8) {
        self.buf.extend_from_slice(&[v]);
    }

    /// Encodes a 32-bit unsigned integer.
    pub fn encode_u32(&mut self, v: u32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Encodes a 32-bit signed integer.
    pub fn encode_i32(&mut self, v: i32) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Encodes a 64-bit unsigned integer.
    pub fn encode_u64(&mut self, v: u64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Encodes a 64-bit signed integer.
    pub fn encode_i64(&mut self, v: i64) {
        self.buf.extend_from_slice(&v.to_be_bytes());
    }

    /// Encodes raw payload bytes with no length prefix.
    pub fn encode_bytes(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// Encodes a name into the fixed 40-byte buffer.
    ///
    /// Fails with `NameTooLong` for names over 39 bytes and `InvalidName`
    /// for names carrying an interior NUL, which could not round-trip.
    pub fn encode_name(&mut self, name: &str) -> Result<()> {
        let raw = name.as_bytes();
        if raw.len() > MAX_NAME_LEN {
            return Err(ProtocolError::NameTooLong {
                len: raw.len(),
                max: MAX_NAME_LEN,
            });
        }
        if raw.contains(&0) {
            return Err(ProtocolError::InvalidName {
                reason: "interior NUL byte",
            });
        }
        let mut fixed = [0u8; NAME_BUF_LEN];
        fixed[..raw.len()].copy_from_slice(raw);
        self.buf.extend_from_slice(&fixed);
        Ok(())
    }

    /// Consumes the encoder and returns the encoded bytes.
    pub fn finish(self) -> Bytes {
        self.buf.freeze()
    }
}

impl Default for WireEncoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Reads protocol fields from a byte buffer, tracking position.
pub struct WireDecoder<'a> {
    buf: &'a [u8],
    pos: usize,
}

impl<'a> WireDecoder<'a> {
    /// Creates a decoder positioned at the start of `buf`.
    pub fn new(buf: &'a [u8]) -> Self {
        Self { buf, pos: 0 }
    }

    fn ensure_available(&self, len: usize) -> Result<()> {
        if self.pos + len > self.buf.len() {
            return Err(ProtocolError::Truncated {
                needed: self.pos + len,
                available: self.buf.len(),
            });
        }
        Ok(())
    }

    fn read_bytes(&mut self, len: usize) -> Result<&'a [u8]> {
        self.ensure_available(len)?;
        let out = &self.buf[self.pos..self.pos + len];
        self.pos += len;
        Ok(out)
    }

    /// Decodes a single byte.
    pub fn decode_u8(&mut self) -> Result<u8> {
        Ok(self.read_bytes(1)?[0])
    }

    /// Decodes a 32-bit unsigned integer.
    pub fn decode_u32(&mut self) -> Result<u32> {
        let b = self.read_bytes(4)?;
        Ok(u32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decodes a 32-bit signed integer.
    pub fn decode_i32(&mut self) -> Result<i32> {
        let b = self.read_bytes(4)?;
        Ok(i32::from_be_bytes([b[0], b[1], b[2], b[3]]))
    }

    /// Decodes a 64-bit unsigned integer.
    pub fn decode_u64(&mut self) -> Result<u64> {
        let b = self.read_bytes(8)?;
        Ok(u64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Decodes a 64-bit signed integer.
    pub fn decode_i64(&mut self) -> Result<i64> {
        let b = self.read_bytes(8)?;
        Ok(i64::from_be_bytes([
            b[0], b[1], b[2], b[3], b[4], b[5], b[6], b[7],
        ]))
    }

    /// Decodes raw payload bytes with no length prefix.
    pub fn decode_bytes(&mut self, len: usize) -> Result<Vec<u8>> {
        Ok(self.read_bytes(len)?.to_vec())
    }

    /// Decodes a name from the fixed 40-byte buffer.
    ///
    /// A buffer with no NUL within its 40 bytes means the sender exceeded
    /// the 39-byte maximum; that fails with `NameTooLong` rather than being
    /// silently truncated.
    pub fn decode_name(&mut self) -> Result<String> {
        let fixed = self.read_bytes(NAME_BUF_LEN)?;
        let nul = fixed
            .iter()
            .position(|&b| b == 0)
            .ok_or(ProtocolError::NameTooLong {
                len: NAME_BUF_LEN,
                max: MAX_NAME_LEN,
            })?;
        std::str::from_utf8(&fixed[..nul])
            .map(str::to_owned)
            .map_err(|_| ProtocolError::InvalidName {
                reason: "not valid UTF-8",
            })
    }

    /// Bytes not yet consumed.
    pub fn remaining(&self) -> usize {
        self.buf.len() - self.pos
    }
}
