//! FIFOFS integration infrastructure.
//!
//! The harness spins up a real server over FIFOs in a temporary directory;
//! the end-to-end module drives it with the public client API.

pub mod harness;

#[cfg(test)]
mod end_to_end;

pub use harness::TestServer;
