//! The storage engine contract consumed by the server core.
//!
//! The engine is an external collaborator: the server never reaches past
//! this synchronous trait. Handles are opaque non-negative integers scoped
//! to the engine; the server forwards them without interpretation.

use fifofs_proto::OpenFlags;

use crate::error::Result;

/// Synchronous file-storage contract.
///
/// Implementations must be safe to call from multiple worker tasks at once.
/// Calls are expected to be short and non-blocking relative to conduit I/O;
/// the server intentionally calls them outside any registry lock.
pub trait StorageEngine: Send + Sync {
    /// Opens `name` (at most 39 bytes) and returns a non-negative handle.
    fn open(&self, name: &str, flags: OpenFlags) -> Result<i32>;

    /// Closes an open handle.
    fn close(&self, handle: i32) -> Result<()>;

    /// Writes `data` through `handle`, returning the count written.
    fn write(&self, handle: i32, data: &[u8]) -> Result<usize>;

    /// Reads up to `max_len` bytes through `handle`. The returned buffer's
    /// length is the authoritative count; it never exceeds `max_len`.
    fn read(&self, handle: i32, max_len: usize) -> Result<Vec<u8>>;

    /// Destroys the engine once no handle anywhere remains open. Fails with
    /// [`crate::StorageError::HandlesOpen`] otherwise.
    fn destroy_after_all_closed(&self) -> Result<()>;
}
