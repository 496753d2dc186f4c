#![warn(missing_docs)]

//! FIFOFS server core: session-multiplexed request router over a shared
//! inbound conduit, with one persistent worker per session slot.

pub mod config;
pub mod error;
pub mod registry;
pub mod router;
pub mod server;
pub mod worker;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use registry::Registry;
pub use server::Server;
