//! Data layer for the event counter.
//!
//! Classifies raw log lines, aggregates them into per-minute buckets in a
//! single forward pass, and opens the record sources they are read from.

pub mod aggregator;
pub mod classifier;
pub mod reader;

pub use events_core as core;
