//! Typed request/response messages and their fixed wire layouts.
//!
//! Every message is one operation-code byte followed by fixed-width fields.
//! Variable-length payloads (Write requests, Read responses) carry an
//! explicit length field, never a scanned terminator.

use bytes::Bytes;

use crate::error::{ProtocolError, Result};
use crate::wire::{WireDecoder, WireEncoder};
use crate::{FAILURE_SENTINEL, NAME_BUF_LEN};

/// Identity of a mounted session: an index into the server's slot table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(pub u32);

impl SessionId {
    /// Creates a session ID from a raw slot index.
    pub fn new(id: u32) -> Self {
        Self(id)
    }

    /// Returns the underlying slot index.
    pub fn as_u32(self) -> u32 {
        self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The seven request kinds of the protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum OpCode {
    /// Establish a session; carries the client's reply-conduit path.
    Mount = 1,
    /// Tear down a session.
    Unmount = 2,
    /// Open a file by name.
    Open = 3,
    /// Close an open handle.
    Close = 4,
    /// Write bytes through a handle.
    Write = 5,
    /// Read bytes through a handle.
    Read = 6,
    /// Destroy the storage engine once no handle remains open.
    Shutdown = 7,
}

impl OpCode {
    /// Parses an operation-code byte. Unknown codes are an explicit error,
    /// never silently ignored.
    pub fn from_u8(b: u8) -> Result<Self> {
        match b {
            1 => Ok(OpCode::Mount),
            2 => Ok(OpCode::Unmount),
            3 => Ok(OpCode::Open),
            4 => Ok(OpCode::Close),
            5 => Ok(OpCode::Write),
            6 => Ok(OpCode::Read),
            7 => Ok(OpCode::Shutdown),
            other => Err(ProtocolError::UnknownOperation(other)),
        }
    }

    /// Raw wire representation.
    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Open flags carried as a 4-byte signed bitmask on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct OpenFlags {
    /// Create the file if it does not exist (bit 0).
    pub create: bool,
    /// Truncate existing contents (bit 1).
    pub trunc: bool,
    /// Position the cursor at end-of-file (bit 2).
    pub append: bool,
}

impl OpenFlags {
    /// No flags set.
    pub fn empty() -> Self {
        Self::default()
    }

    /// Convert to the wire bitmask.
    pub fn as_i32(self) -> i32 {
        let mut v = 0;
        if self.create {
            v |= 0x1;
        }
        if self.trunc {
            v |= 0x2;
        }
        if self.append {
            v |= 0x4;
        }
        v
    }

    /// Build from the wire bitmask. Undefined bits are ignored.
    pub fn from_i32(v: i32) -> Self {
        Self {
            create: v & 0x1 != 0,
            trunc: v & 0x2 != 0,
            append: v & 0x4 != 0,
        }
    }
}

/// A decoded client request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    /// Establish a session; the server replies on the named conduit.
    Mount {
        /// Filesystem path of the client's private reply conduit.
        client_channel: String,
    },
    /// Tear down the session.
    Unmount {
        /// Owning session.
        session: SessionId,
    },
    /// Open a file.
    Open {
        /// Owning session.
        session: SessionId,
        /// File name (at most 39 bytes).
        name: String,
        /// Open flags.
        flags: OpenFlags,
    },
    /// Close an open handle.
    Close {
        /// Owning session.
        session: SessionId,
        /// Handle to close.
        handle: i32,
    },
    /// Write bytes through a handle.
    Write {
        /// Owning session.
        session: SessionId,
        /// Target handle.
        handle: i32,
        /// Bytes to write.
        data: Vec<u8>,
    },
    /// Read up to `len` bytes through a handle.
    Read {
        /// Owning session.
        session: SessionId,
        /// Source handle.
        handle: i32,
        /// Maximum bytes to read.
        len: u64,
    },
    /// Destroy the storage engine once no handle remains open.
    Shutdown {
        /// Owning session.
        session: SessionId,
    },
}

impl Request {
    /// The operation code of this request.
    pub fn op(&self) -> OpCode {
        match self {
            Request::Mount { .. } => OpCode::Mount,
            Request::Unmount { .. } => OpCode::Unmount,
            Request::Open { .. } => OpCode::Open,
            Request::Close { .. } => OpCode::Close,
            Request::Write { .. } => OpCode::Write,
            Request::Read { .. } => OpCode::Read,
            Request::Shutdown { .. } => OpCode::Shutdown,
        }
    }

    /// Encodes the full request, operation byte included.
    pub fn encode(&self) -> Result<Bytes> {
        let mut enc = WireEncoder::with_capacity(64);
        enc.encode_u8(self.op().as_u8());
        match self {
            Request::Mount { client_channel } => {
                enc.encode_name(client_channel)?;
            }
            Request::Unmount { session } | Request::Shutdown { session } => {
                enc.encode_u32(session.as_u32());
            }
            Request::Open {
                session,
                name,
                flags,
            } => {
                enc.encode_u32(session.as_u32());
                enc.encode_name(name)?;
                enc.encode_i32(flags.as_i32());
            }
            Request::Close { session, handle } => {
                enc.encode_u32(session.as_u32());
                enc.encode_i32(*handle);
            }
            Request::Write {
                session,
                handle,
                data,
            } => {
                enc.encode_u32(session.as_u32());
                enc.encode_i32(*handle);
                enc.encode_u64(data.len() as u64);
                enc.encode_bytes(data);
            }
            Request::Read {
                session,
                handle,
                len,
            } => {
                enc.encode_u32(session.as_u32());
                enc.encode_i32(*handle);
                enc.encode_u64(*len);
            }
        }
        Ok(enc.finish())
    }

    /// Decodes a full request, operation byte included.
    pub fn decode(buf: &[u8]) -> Result<Self> {
        let mut dec = WireDecoder::new(buf);
        let op = OpCode::from_u8(dec.decode_u8()?)?;
        match op {
            OpCode::Mount => Ok(Request::Mount {
                client_channel: dec.decode_name()?,
            }),
            OpCode::Unmount => Ok(Request::Unmount {
                session: SessionId::new(dec.decode_u32()?),
            }),
            OpCode::Open => Ok(Request::Open {
                session: SessionId::new(dec.decode_u32()?),
                name: dec.decode_name()?,
                flags: OpenFlags::from_i32(dec.decode_i32()?),
            }),
            OpCode::Close => Ok(Request::Close {
                session: SessionId::new(dec.decode_u32()?),
                handle: dec.decode_i32()?,
            }),
            OpCode::Write => {
                let session = SessionId::new(dec.decode_u32()?);
                let handle = dec.decode_i32()?;
                let len = dec.decode_u64()? as usize;
                let data = dec.decode_bytes(len)?;
                Ok(Request::Write {
                    session,
                    handle,
                    data,
                })
            }
            OpCode::Read => Ok(Request::Read {
                session: SessionId::new(dec.decode_u32()?),
                handle: dec.decode_i32()?,
                len: dec.decode_u64()?,
            }),
            OpCode::Shutdown => Ok(Request::Shutdown {
                session: SessionId::new(dec.decode_u32()?),
            }),
        }
    }
}

/// A per-kind server response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Response {
    /// Assigned session id, or -1 when the slot table is full.
    Mount {
        /// Assigned id or the failure sentinel.
        session: i32,
    },
    /// Unmount status: 0 on success, -1 on failure.
    Unmount {
        /// Status code.
        status: i32,
    },
    /// Open result: handle >= 0, or -1 on failure.
    Open {
        /// Handle or the failure sentinel.
        handle: i32,
    },
    /// Close status: 0 on success, -1 on failure.
    Close {
        /// Status code.
        status: i32,
    },
    /// Write result: bytes written, or -1 on failure.
    Write {
        /// Signed byte count.
        count: i64,
    },
    /// Read result: explicit byte count, then exactly that many bytes.
    /// A count of -1 signals failure and carries no payload.
    Read {
        /// Signed byte count.
        count: i64,
        /// Payload; `data.len() == count` when `count >= 0`.
        data: Vec<u8>,
    },
    /// Shutdown status: 0 on success, -1 on failure.
    Shutdown {
        /// Status code.
        status: i32,
    },
}

impl Response {
    /// The operation code this response answers.
    pub fn op(&self) -> OpCode {
        match self {
            Response::Mount { .. } => OpCode::Mount,
            Response::Unmount { .. } => OpCode::Unmount,
            Response::Open { .. } => OpCode::Open,
            Response::Close { .. } => OpCode::Close,
            Response::Write { .. } => OpCode::Write,
            Response::Read { .. } => OpCode::Read,
            Response::Shutdown { .. } => OpCode::Shutdown,
        }
    }

    /// The failure response for an operation kind, used to guarantee exactly
    /// one reply even when the request could not be served.
    pub fn failure(op: OpCode) -> Self {
        match op {
            OpCode::Mount => Response::Mount {
                session: FAILURE_SENTINEL,
            },
            OpCode::Unmount => Response::Unmount {
                status: FAILURE_SENTINEL,
            },
            OpCode::Open => Response::Open {
                handle: FAILURE_SENTINEL,
            },
            OpCode::Close => Response::Close {
                status: FAILURE_SENTINEL,
            },
            OpCode::Write => Response::Write {
                count: FAILURE_SENTINEL as i64,
            },
            OpCode::Read => Response::Read {
                count: FAILURE_SENTINEL as i64,
                data: Vec::new(),
            },
            OpCode::Shutdown => Response::Shutdown {
                status: FAILURE_SENTINEL,
            },
        }
    }

    /// Size in bytes of the fixed leading part of a response of kind `op`.
    /// A Read response is this header plus `count` payload bytes.
    pub fn header_len(op: OpCode) -> usize {
        match op {
            OpCode::Write | OpCode::Read => 8,
            _ => 4,
        }
    }

    /// Encodes the response into its wire form.
    pub fn encode(&self) -> Bytes {
        let mut enc = WireEncoder::with_capacity(16);
        match self {
            Response::Mount { session } => enc.encode_i32(*session),
            Response::Unmount { status }
            | Response::Close { status }
            | Response::Shutdown { status } => enc.encode_i32(*status),
            Response::Open { handle } => enc.encode_i32(*handle),
            Response::Write { count } => enc.encode_i64(*count),
            Response::Read { count, data } => {
                enc.encode_i64(*count);
                if *count >= 0 {
                    enc.encode_bytes(data);
                }
            }
        }
        enc.finish()
    }

    /// Decodes a complete response of the given kind. For Read, `buf` must
    /// contain the count followed by exactly that many payload bytes.
    pub fn decode(op: OpCode, buf: &[u8]) -> Result<Self> {
        let mut dec = WireDecoder::new(buf);
        match op {
            OpCode::Mount => Ok(Response::Mount {
                session: dec.decode_i32()?,
            }),
            OpCode::Unmount => Ok(Response::Unmount {
                status: dec.decode_i32()?,
            }),
            OpCode::Open => Ok(Response::Open {
                handle: dec.decode_i32()?,
            }),
            OpCode::Close => Ok(Response::Close {
                status: dec.decode_i32()?,
            }),
            OpCode::Write => Ok(Response::Write {
                count: dec.decode_i64()?,
            }),
            OpCode::Read => {
                let count = dec.decode_i64()?;
                let data = if count >= 0 {
                    dec.decode_bytes(count as usize)?
                } else {
                    Vec::new()
                };
                Ok(Response::Read { count, data })
            }
            OpCode::Shutdown => Ok(Response::Shutdown {
                status: dec.decode_i32()?,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_NAME_LEN;
    use proptest::prelude::*;

    fn round_trip_request(req: Request) {
        let bytes = req.encode().unwrap();
        assert_eq!(Request::decode(&bytes).unwrap(), req);
    }

    fn round_trip_response(resp: Response) {
        let bytes = resp.encode();
        assert_eq!(Response::decode(resp.op(), &bytes).unwrap(), resp);
    }

    #[test]
    fn test_request_round_trip_all_kinds() {
        round_trip_request(Request::Mount {
            client_channel: "/tmp/client0".to_string(),
        });
        round_trip_request(Request::Unmount {
            session: SessionId::new(3),
        });
        round_trip_request(Request::Open {
            session: SessionId::new(0),
            name: "foo".to_string(),
            flags: OpenFlags {
                create: true,
                trunc: true,
                append: true,
            },
        });
        round_trip_request(Request::Close {
            session: SessionId::new(1),
            handle: 5,
        });
        round_trip_request(Request::Write {
            session: SessionId::new(2),
            handle: 0,
            data: b"hello".to_vec(),
        });
        round_trip_request(Request::Read {
            session: SessionId::new(2),
            handle: 0,
            len: 1024,
        });
        round_trip_request(Request::Shutdown {
            session: SessionId::new(0),
        });
    }

    #[test]
    fn test_request_boundary_values() {
        // Empty name, maximum-length name, flags zero, zero-length payload.
        round_trip_request(Request::Open {
            session: SessionId::new(u32::MAX),
            name: String::new(),
            flags: OpenFlags::empty(),
        });
        round_trip_request(Request::Open {
            session: SessionId::new(0),
            name: "n".repeat(MAX_NAME_LEN),
            flags: OpenFlags::from_i32(7),
        });
        round_trip_request(Request::Write {
            session: SessionId::new(0),
            handle: -1,
            data: Vec::new(),
        });
    }

    #[test]
    fn test_response_round_trip_all_kinds() {
        round_trip_response(Response::Mount { session: 0 });
        round_trip_response(Response::Mount { session: -1 });
        round_trip_response(Response::Unmount { status: 0 });
        round_trip_response(Response::Open { handle: 17 });
        round_trip_response(Response::Open { handle: -1 });
        round_trip_response(Response::Close { status: -1 });
        round_trip_response(Response::Write { count: 4096 });
        round_trip_response(Response::Read {
            count: 5,
            data: b"hello".to_vec(),
        });
        round_trip_response(Response::Read {
            count: 0,
            data: Vec::new(),
        });
        round_trip_response(Response::Shutdown { status: 0 });
    }

    #[test]
    fn test_read_failure_response_carries_no_payload() {
        let resp = Response::failure(OpCode::Read);
        let bytes = resp.encode();
        assert_eq!(bytes.len(), 8);
        assert_eq!(Response::decode(OpCode::Read, &bytes).unwrap(), resp);
    }

    #[test]
    fn test_read_payload_may_contain_nul_bytes() {
        // The count is authoritative; embedded zero bytes must survive.
        let resp = Response::Read {
            count: 3,
            data: vec![0, 1, 0],
        };
        let bytes = resp.encode();
        let decoded = Response::decode(OpCode::Read, &bytes).unwrap();
        assert_eq!(decoded, resp);
    }

    #[test]
    fn test_unknown_opcode_is_an_error() {
        let err = Request::decode(&[0x2A, 0, 0, 0, 0]).unwrap_err();
        assert_eq!(err, ProtocolError::UnknownOperation(0x2A));
    }

    #[test]
    fn test_truncated_request_is_an_error() {
        let full = Request::Close {
            session: SessionId::new(1),
            handle: 2,
        }
        .encode()
        .unwrap();
        let err = Request::decode(&full[..full.len() - 1]).unwrap_err();
        assert!(matches!(err, ProtocolError::Truncated { .. }));
    }

    #[test]
    fn test_write_payload_shorter_than_length_field() {
        let mut bytes = Request::Write {
            session: SessionId::new(0),
            handle: 1,
            data: b"abcd".to_vec(),
        }
        .encode()
        .unwrap()
        .to_vec();
        bytes.truncate(bytes.len() - 2);
        assert!(matches!(
            Request::decode(&bytes).unwrap_err(),
            ProtocolError::Truncated { .. }
        ));
    }

    #[test]
    fn test_failure_helper_covers_every_kind() {
        for code in 1..=7u8 {
            let op = OpCode::from_u8(code).unwrap();
            let resp = Response::failure(op);
            assert_eq!(resp.op(), op);
            let bytes = resp.encode();
            assert_eq!(Response::decode(op, &bytes).unwrap(), resp);
        }
    }

    proptest! {
        #[test]
        fn prop_open_request_round_trips(
            session in any::<u32>(),
            name in "[a-zA-Z0-9_.]{0,39}",
            bits in 0i32..8,
        ) {
            let req = Request::Open {
                session: SessionId::new(session),
                name,
                flags: OpenFlags::from_i32(bits),
            };
            let bytes = req.encode().unwrap();
            prop_assert_eq!(Request::decode(&bytes).unwrap(), req);
        }

        #[test]
        fn prop_write_request_round_trips(
            session in any::<u32>(),
            handle in any::<i32>(),
            data in proptest::collection::vec(any::<u8>(), 0..2048),
        ) {
            let req = Request::Write {
                session: SessionId::new(session),
                handle,
                data,
            };
            let bytes = req.encode().unwrap();
            prop_assert_eq!(Request::decode(&bytes).unwrap(), req);
        }

        #[test]
        fn prop_read_response_round_trips(
            data in proptest::collection::vec(any::<u8>(), 0..2048),
        ) {
            let resp = Response::Read {
                count: data.len() as i64,
                data,
            };
            let bytes = resp.encode();
            prop_assert_eq!(Response::decode(OpCode::Read, &bytes).unwrap(), resp);
        }
    }
}
