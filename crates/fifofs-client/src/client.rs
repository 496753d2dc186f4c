//! The client session handle.
//!
//! One call per wire operation; every call writes one request on the shared
//! inbound conduit and awaits exactly one response on this client's private
//! reply conduit before returning.

use std::path::{Path, PathBuf};

use tracing::debug;

use fifofs_channel::{ChannelReader, ChannelWriter};
use fifofs_proto::{OpCode, OpenFlags, Request, Response, SessionId};

use crate::error::{ClientError, Result};

/// A mounted client session.
#[derive(Debug)]
pub struct FsClient {
    session: SessionId,
    server: ChannelWriter,
    reply: ChannelReader,
    reply_path: PathBuf,
}

impl FsClient {
    /// Mounts a session: creates the private reply FIFO at `client_path`,
    /// announces it to the server listening on `server_path`, and awaits
    /// the assigned session id.
    pub async fn mount(server_path: &Path, client_path: &Path) -> Result<Self> {
        let channel_name = client_path
            .to_str()
            .ok_or(ClientError::InvalidPath)?
            .to_string();

        fifofs_channel::create(client_path)?;
        let request = match (Request::Mount {
            client_channel: channel_name,
        })
        .encode()
        {
            Ok(bytes) => bytes,
            Err(err) => {
                let _ = fifofs_channel::remove(client_path);
                return Err(err.into());
            }
        };

        let mut server = match ChannelWriter::connect(server_path).await {
            Ok(writer) => writer,
            Err(err) => {
                let _ = fifofs_channel::remove(client_path);
                return Err(err.into());
            }
        };
        server.write_all(&request).await?;

        let mut reply = ChannelReader::open(client_path)?;
        let resp = read_response(&mut reply, OpCode::Mount).await?;
        match resp {
            Response::Mount { session } if session >= 0 => {
                debug!(session, "mounted");
                Ok(Self {
                    session: SessionId::new(session as u32),
                    server,
                    reply,
                    reply_path: client_path.to_path_buf(),
                })
            }
            Response::Mount { .. } => {
                let _ = fifofs_channel::remove(client_path);
                Err(ClientError::MountRejected)
            }
            _ => Err(ClientError::UnexpectedResponse { op: OpCode::Mount }),
        }
    }

    /// The session id assigned by the server.
    pub fn session(&self) -> SessionId {
        self.session
    }

    /// Opens `name`, returning the storage handle.
    pub async fn open(&mut self, name: &str, flags: OpenFlags) -> Result<i32> {
        let resp = self
            .call(Request::Open {
                session: self.session,
                name: name.to_string(),
                flags,
            })
            .await?;
        match resp {
            Response::Open { handle } if handle >= 0 => Ok(handle),
            Response::Open { .. } => Err(ClientError::Rejected { op: OpCode::Open }),
            _ => Err(ClientError::UnexpectedResponse { op: OpCode::Open }),
        }
    }

    /// Closes an open handle.
    pub async fn close(&mut self, handle: i32) -> Result<()> {
        let resp = self
            .call(Request::Close {
                session: self.session,
                handle,
            })
            .await?;
        match resp {
            Response::Close { status } if status >= 0 => Ok(()),
            Response::Close { .. } => Err(ClientError::Rejected { op: OpCode::Close }),
            _ => Err(ClientError::UnexpectedResponse { op: OpCode::Close }),
        }
    }

    /// Writes `data` through `handle`, returning the count written.
    pub async fn write(&mut self, handle: i32, data: &[u8]) -> Result<usize> {
        let resp = self
            .call(Request::Write {
                session: self.session,
                handle,
                data: data.to_vec(),
            })
            .await?;
        match resp {
            Response::Write { count } if count >= 0 => Ok(count as usize),
            Response::Write { .. } => Err(ClientError::Rejected { op: OpCode::Write }),
            _ => Err(ClientError::UnexpectedResponse { op: OpCode::Write }),
        }
    }

    /// Reads up to `len` bytes through `handle`. The returned buffer holds
    /// exactly the count the server reported.
    pub async fn read(&mut self, handle: i32, len: u64) -> Result<Vec<u8>> {
        let resp = self
            .call(Request::Read {
                session: self.session,
                handle,
                len,
            })
            .await?;
        match resp {
            Response::Read { count, data } if count >= 0 => Ok(data),
            Response::Read { .. } => Err(ClientError::Rejected { op: OpCode::Read }),
            _ => Err(ClientError::UnexpectedResponse { op: OpCode::Read }),
        }
    }

    /// Asks the server to destroy its storage engine once no handle remains
    /// open anywhere.
    pub async fn shutdown(&mut self) -> Result<()> {
        let resp = self
            .call(Request::Shutdown {
                session: self.session,
            })
            .await?;
        match resp {
            Response::Shutdown { status } if status >= 0 => Ok(()),
            Response::Shutdown { .. } => Err(ClientError::Rejected {
                op: OpCode::Shutdown,
            }),
            _ => Err(ClientError::UnexpectedResponse {
                op: OpCode::Shutdown,
            }),
        }
    }

    /// Unmounts the session, consuming the client. The client side closes
    /// its read end and unlinks the reply FIFO; the server releases the
    /// slot and closes its write end.
    pub async fn unmount(mut self) -> Result<()> {
        let resp = self
            .call(Request::Unmount {
                session: self.session,
            })
            .await?;
        let status = match resp {
            Response::Unmount { status } => status,
            _ => {
                return Err(ClientError::UnexpectedResponse {
                    op: OpCode::Unmount,
                })
            }
        };
        debug!(session = %self.session, "unmounted");
        drop(self.reply);
        fifofs_channel::remove(&self.reply_path)?;
        if status >= 0 {
            Ok(())
        } else {
            Err(ClientError::Rejected {
                op: OpCode::Unmount,
            })
        }
    }

    async fn call(&mut self, req: Request) -> Result<Response> {
        let op = req.op();
        let bytes = req.encode()?;
        self.server.write_all(&bytes).await?;
        read_response(&mut self.reply, op).await
    }
}

/// Reads one complete response of kind `op` off the reply conduit: the
/// fixed header first, then, for Read with a non-negative count, exactly
/// `count` payload bytes.
async fn read_response(reply: &mut ChannelReader, op: OpCode) -> Result<Response> {
    let mut buf = vec![0u8; Response::header_len(op)];
    reply.read_exact(&mut buf).await?;
    if op == OpCode::Read {
        let mut header = [0u8; 8];
        header.copy_from_slice(&buf[..8]);
        let count = i64::from_be_bytes(header);
        if count > 0 {
            let mut payload = vec![0u8; count as usize];
            reply.read_exact(&mut payload).await?;
            buf.extend_from_slice(&payload);
        }
    }
    Ok(Response::decode(op, &buf)?)
}
