#![warn(missing_docs)]

//! FIFOFS storage subsystem: the synchronous engine contract the server
//! consumes, plus the in-memory reference engine.

pub mod engine;
pub mod error;
pub mod memory;

pub use engine::StorageEngine;
pub use error::{Result, StorageError};
pub use memory::MemoryEngine;
