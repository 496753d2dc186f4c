#![warn(missing_docs)]

//! FIFOFS conduit layer: open/read/write/close over filesystem-addressable
//! byte-stream conduits with rendezvous-on-open semantics.

pub mod error;
pub mod fifo;

pub use error::{ChannelError, Result};
pub use fifo::{create, remove, ChannelReader, ChannelWriter};
