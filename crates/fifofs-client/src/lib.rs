#![warn(missing_docs)]

//! FIFOFS client: mount/unmount/open/close/write/read/shutdown, one call
//! per wire operation, each blocking until its response arrives.

pub mod client;
pub mod error;

pub use client::FsClient;
pub use error::{ClientError, Result};
