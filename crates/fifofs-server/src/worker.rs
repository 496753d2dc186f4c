//! Session workers: one persistent task per slot.
//!
//! A worker sleeps on its mailbox until the router installs a request,
//! decodes it, drives the storage engine, and sends exactly one response on
//! the session's private outbound conduit. No registry lock is held across
//! conduit I/O or storage calls.

use std::path::Path;
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use fifofs_channel::ChannelWriter;
use fifofs_proto::{OpCode, Request, Response, SessionId};
use fifofs_storage::StorageEngine;

use crate::registry::{RawMessage, Registry};

/// Slot-state work a response implies, applied after the reply is sent.
#[derive(Debug, PartialEq, Eq)]
pub enum PostAction {
    /// Nothing beyond the reply.
    None,
    /// Close the outbound conduit and return the slot to Free.
    ReleaseSession,
    /// Begin server shutdown: the storage engine is destroyed.
    Shutdown,
}

/// Runs one already-routed, non-Mount request against the storage engine.
///
/// Pure with respect to conduits, so the dispatch table is testable without
/// any I/O. Always produces exactly one response; engine failures collapse
/// to the failure sentinel on the wire and are logged with their real cause.
pub fn execute(req: &Request, engine: &dyn StorageEngine) -> (Response, PostAction) {
    match req {
        Request::Unmount { session } => {
            debug!(session = %session, "unmount");
            (Response::Unmount { status: 0 }, PostAction::ReleaseSession)
        }
        Request::Open {
            session,
            name,
            flags,
        } => match engine.open(name, *flags) {
            Ok(handle) => {
                debug!(session = %session, name, handle, "open");
                (Response::Open { handle }, PostAction::None)
            }
            Err(err) => {
                debug!(session = %session, name, %err, "open failed");
                (Response::failure(OpCode::Open), PostAction::None)
            }
        },
        Request::Close { session, handle } => match engine.close(*handle) {
            Ok(()) => (Response::Close { status: 0 }, PostAction::None),
            Err(err) => {
                debug!(session = %session, handle, %err, "close failed");
                (Response::failure(OpCode::Close), PostAction::None)
            }
        },
        Request::Write {
            session,
            handle,
            data,
        } => match engine.write(*handle, data) {
            Ok(count) => (
                Response::Write {
                    count: count as i64,
                },
                PostAction::None,
            ),
            Err(err) => {
                debug!(session = %session, handle, %err, "write failed");
                (Response::failure(OpCode::Write), PostAction::None)
            }
        },
        Request::Read {
            session,
            handle,
            len,
        } => match engine.read(*handle, *len as usize) {
            Ok(data) => (
                Response::Read {
                    count: data.len() as i64,
                    data,
                },
                PostAction::None,
            ),
            Err(err) => {
                debug!(session = %session, handle, %err, "read failed");
                (Response::failure(OpCode::Read), PostAction::None)
            }
        },
        Request::Shutdown { session } => match engine.destroy_after_all_closed() {
            Ok(()) => {
                info!(session = %session, "storage destroyed, shutting down");
                (Response::Shutdown { status: 0 }, PostAction::Shutdown)
            }
            Err(err) => {
                debug!(session = %session, %err, "shutdown refused");
                (Response::failure(OpCode::Shutdown), PostAction::None)
            }
        },
        Request::Mount { .. } => {
            // Mount never reaches the dispatch table: the worker handles it
            // directly because it creates the reply conduit.
            warn!("mount request reached dispatch");
            (Response::failure(OpCode::Mount), PostAction::None)
        }
    }
}

/// One session's worker task.
pub struct SessionWorker {
    id: SessionId,
    registry: Arc<Registry>,
    engine: Arc<dyn StorageEngine>,
    inbox: mpsc::Receiver<RawMessage>,
    shutdown: CancellationToken,
    outbound: Option<ChannelWriter>,
}

impl SessionWorker {
    /// Creates the worker for slot `id`.
    pub fn new(
        id: SessionId,
        registry: Arc<Registry>,
        engine: Arc<dyn StorageEngine>,
        inbox: mpsc::Receiver<RawMessage>,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            id,
            registry,
            engine,
            inbox,
            shutdown,
            outbound: None,
        }
    }

    /// Loops until server shutdown: wait for a routed request, serve it,
    /// reset to waiting.
    pub async fn run(mut self) {
        loop {
            let raw = tokio::select! {
                _ = self.shutdown.cancelled() => break,
                msg = self.inbox.recv() => match msg {
                    Some(raw) => raw,
                    None => break,
                },
            };
            self.handle_message(raw).await;
        }
        debug!(session = %self.id, "worker stopped");
    }

    async fn handle_message(&mut self, raw: RawMessage) {
        let req = match Request::decode(&raw) {
            Ok(req) => req,
            Err(err) => {
                warn!(session = %self.id, %err, "malformed routed request");
                // Still exactly one response when the kind is recoverable.
                if let Some(op) = raw.first().copied().and_then(|b| OpCode::from_u8(b).ok()) {
                    self.send(Response::failure(op)).await;
                }
                return;
            }
        };

        if let Request::Mount { client_channel } = &req {
            self.handle_mount(client_channel).await;
            return;
        }

        let (resp, action) = execute(&req, self.engine.as_ref());
        self.send(resp).await;
        match action {
            PostAction::None => {}
            PostAction::ReleaseSession => {
                // Server side closes its write end; the client closes the
                // read end and unlinks the conduit.
                self.outbound = None;
                if let Err(err) = self.registry.release(self.id) {
                    warn!(session = %self.id, %err, "release failed");
                }
                info!(session = %self.id, "session unmounted");
            }
            PostAction::Shutdown => {
                self.shutdown.cancel();
            }
        }
    }

    async fn handle_mount(&mut self, client_channel: &str) {
        // Rendezvous: blocks until the client attaches its read end.
        match ChannelWriter::connect(Path::new(client_channel)).await {
            Ok(writer) => {
                self.outbound = Some(writer);
                info!(session = %self.id, channel = client_channel, "session mounted");
                self.send(Response::Mount {
                    session: self.id.as_u32() as i32,
                })
                .await;
            }
            Err(err) => {
                // No reply conduit exists to report on; give the slot back.
                warn!(session = %self.id, channel = client_channel, %err, "mount failed");
                if let Err(err) = self.registry.release(self.id) {
                    warn!(session = %self.id, %err, "release failed");
                }
            }
        }
    }

    async fn send(&mut self, resp: Response) {
        match self.outbound.as_mut() {
            Some(writer) => {
                if let Err(err) = writer.write_all(&resp.encode()).await {
                    warn!(session = %self.id, %err, "response write failed");
                }
            }
            None => {
                warn!(session = %self.id, op = ?resp.op(), "no reply conduit for response");
            }
        }
    }
}
