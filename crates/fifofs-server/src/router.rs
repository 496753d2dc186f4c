//! The request router: single sequential reader of the shared inbound
//! conduit.
//!
//! The router frames messages: operation byte, that kind's fixed fields,
//! then the Write payload when present. It hands the raw bytes to the
//! owning session's worker. It never semantically decodes a message and
//! never writes a response, with one exception: a Mount that finds the slot
//! table full is answered `-1` directly on the client-supplied path, before
//! any session state exists.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use fifofs_channel::{ChannelReader, ChannelWriter};
use fifofs_proto::wire::WireDecoder;
use fifofs_proto::{frame, OpCode, Response, SessionId};

use crate::error::{Result, ServerError};
use crate::registry::Registry;

/// The router task.
pub struct Router {
    reader: ChannelReader,
    registry: Arc<Registry>,
    shutdown: CancellationToken,
    mount_reject_timeout: Duration,
}

impl Router {
    /// Creates a router over an already-open inbound conduit.
    pub fn new(
        reader: ChannelReader,
        registry: Arc<Registry>,
        shutdown: CancellationToken,
        mount_reject_timeout: Duration,
    ) -> Self {
        Self {
            reader,
            registry,
            shutdown,
            mount_reject_timeout,
        }
    }

    /// Reads and routes messages until shutdown or an unrecoverable framing
    /// loss.
    ///
    /// Per-message failures (unknown session, overlapping submission) are
    /// isolated: logged, the message dropped, the loop continues. An unknown
    /// operation code is the one failure that cannot be isolated: with no
    /// length known, the stream can never be re-framed, so it ends the
    /// accept loop.
    pub async fn run(mut self) -> Result<()> {
        info!("router accepting requests");
        loop {
            let mut op_byte = [0u8; 1];
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("router stopping");
                    return Ok(());
                }
                res = self.reader.read_exact(&mut op_byte) => res?,
            }

            let op = match OpCode::from_u8(op_byte[0]) {
                Ok(op) => op,
                Err(err) => {
                    error!(%err, "inbound stream unframeable");
                    return Err(err.into());
                }
            };

            let mut fixed = vec![0u8; frame::fixed_len(op)];
            self.reader.read_exact(&mut fixed).await?;
            let payload_len = frame::payload_len(op, &fixed)?;

            let mut raw = Vec::with_capacity(1 + fixed.len() + payload_len);
            raw.push(op_byte[0]);
            raw.extend_from_slice(&fixed);
            if payload_len > 0 {
                let mut payload = vec![0u8; payload_len];
                self.reader.read_exact(&mut payload).await?;
                raw.extend_from_slice(&payload);
            }

            self.route(op, &fixed, raw).await;
        }
    }

    async fn route(&self, op: OpCode, fixed: &[u8], raw: Vec<u8>) {
        if op == OpCode::Mount {
            self.route_mount(fixed, raw).await;
            return;
        }

        let id = match frame::session_id(op, fixed) {
            Ok(Some(id)) => SessionId::new(id),
            // fixed is already exactly fixed_len(op) bytes; only Mount
            // yields None, handled above.
            _ => return,
        };
        match self.registry.submit(id, raw) {
            Ok(()) => debug!(session = %id, ?op, "request routed"),
            Err(err) => {
                // Isolated to this message; the server keeps serving.
                warn!(session = %id, ?op, %err, "request dropped");
            }
        }
    }

    async fn route_mount(&self, fixed: &[u8], raw: Vec<u8>) {
        match self.registry.allocate() {
            Ok(id) => {
                if let Err(err) = self.registry.submit(id, raw) {
                    warn!(session = %id, %err, "mount submission failed");
                    if let Err(err) = self.registry.release(id) {
                        warn!(session = %id, %err, "release failed");
                    }
                }
            }
            Err(ServerError::SessionFull) => {
                warn!("mount rejected: session table full");
                self.reject_mount(fixed).await;
            }
            Err(err) => warn!(%err, "mount failed"),
        }
    }

    /// Replies `-1` on the would-be client's conduit. Bounded: a client that
    /// never attaches its read end must not stall the router.
    async fn reject_mount(&self, fixed: &[u8]) {
        let mut dec = WireDecoder::new(fixed);
        let path = match dec.decode_name() {
            Ok(path) => path,
            Err(err) => {
                warn!(%err, "rejected mount carries unusable reply path");
                return;
            }
        };
        match ChannelWriter::connect_timeout(Path::new(&path), self.mount_reject_timeout).await {
            Ok(mut writer) => {
                let resp = Response::Mount { session: -1 }.encode();
                if let Err(err) = writer.write_all(&resp).await {
                    warn!(channel = %path, %err, "mount rejection write failed");
                }
            }
            Err(err) => {
                warn!(channel = %path, %err, "mount rejection undeliverable");
            }
        }
    }
}
