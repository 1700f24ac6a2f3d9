//! Async runtime layer for the event counter.
//!
//! Hosts the periodic poller that queries the count endpoint of every
//! configured server.

pub mod client;
pub mod poller;

pub use events_core as core;
