//! In-memory reference engine.
//!
//! `CREATE` creates a missing file, `TRUNC` clears contents, `APPEND`
//! starts the cursor at end-of-file, and every handle carries its own
//! cursor. Used by the server binary and throughout the test suites.

use std::collections::HashMap;

use parking_lot::Mutex;
use tracing::debug;

use fifofs_proto::{OpenFlags, MAX_NAME_LEN};

use crate::engine::StorageEngine;
use crate::error::{Result, StorageError};

struct OpenHandle {
    name: String,
    cursor: usize,
}

#[derive(Default)]
struct Inner {
    files: HashMap<String, Vec<u8>>,
    handles: HashMap<i32, OpenHandle>,
    next_handle: i32,
    destroyed: bool,
}

/// A heap-backed storage engine with per-handle cursors.
#[derive(Default)]
pub struct MemoryEngine {
    inner: Mutex<Inner>,
}

impl MemoryEngine {
    /// Creates an empty engine.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of currently open handles.
    pub fn open_handles(&self) -> usize {
        self.inner.lock().handles.len()
    }

    /// Number of files currently stored.
    pub fn file_count(&self) -> usize {
        self.inner.lock().files.len()
    }
}

impl StorageEngine for MemoryEngine {
    fn open(&self, name: &str, flags: OpenFlags) -> Result<i32> {
        if name.len() > MAX_NAME_LEN {
            return Err(StorageError::NameTooLong {
                len: name.len(),
                max: MAX_NAME_LEN,
            });
        }
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(StorageError::Destroyed);
        }
        if !inner.files.contains_key(name) {
            if !flags.create {
                return Err(StorageError::NotFound(name.to_string()));
            }
            inner.files.insert(name.to_string(), Vec::new());
        } else if flags.trunc {
            if let Some(file) = inner.files.get_mut(name) {
                file.clear();
            }
        }
        let cursor = if flags.append {
            inner.files.get(name).map(Vec::len).unwrap_or(0)
        } else {
            0
        };
        let handle = inner.next_handle;
        inner.next_handle += 1;
        inner.handles.insert(
            handle,
            OpenHandle {
                name: name.to_string(),
                cursor,
            },
        );
        debug!(name, handle, ?flags, "opened file");
        Ok(handle)
    }

    fn close(&self, handle: i32) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(StorageError::Destroyed);
        }
        inner
            .handles
            .remove(&handle)
            .map(|_| ())
            .ok_or(StorageError::InvalidHandle(handle))
    }

    fn write(&self, handle: i32, data: &[u8]) -> Result<usize> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(StorageError::Destroyed);
        }
        let (name, cursor) = match inner.handles.get(&handle) {
            Some(h) => (h.name.clone(), h.cursor),
            None => return Err(StorageError::InvalidHandle(handle)),
        };
        let end = {
            let file = inner.files.get_mut(&name).expect("handle names live file");
            // Another handle may have truncated the file; the cursor must
            // not point past end-of-file.
            let start = cursor.min(file.len());
            let end = start + data.len();
            if end > file.len() {
                file.resize(end, 0);
            }
            file[start..end].copy_from_slice(data);
            end
        };
        inner
            .handles
            .get_mut(&handle)
            .expect("checked above")
            .cursor = end;
        Ok(data.len())
    }

    fn read(&self, handle: i32, max_len: usize) -> Result<Vec<u8>> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(StorageError::Destroyed);
        }
        let (name, cursor) = match inner.handles.get(&handle) {
            Some(h) => (h.name.clone(), h.cursor),
            None => return Err(StorageError::InvalidHandle(handle)),
        };
        let (out, end) = {
            let file = inner.files.get(&name).expect("handle names live file");
            let start = cursor.min(file.len());
            let n = max_len.min(file.len() - start);
            (file[start..start + n].to_vec(), start + n)
        };
        inner
            .handles
            .get_mut(&handle)
            .expect("checked above")
            .cursor = end;
        Ok(out)
    }

    fn destroy_after_all_closed(&self) -> Result<()> {
        let mut inner = self.inner.lock();
        if inner.destroyed {
            return Err(StorageError::Destroyed);
        }
        if !inner.handles.is_empty() {
            return Err(StorageError::HandlesOpen(inner.handles.len()));
        }
        inner.files.clear();
        inner.destroyed = true;
        debug!("storage engine destroyed");
        Ok(())
    }
}
