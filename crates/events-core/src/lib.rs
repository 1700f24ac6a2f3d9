//! Shared building blocks for the event counter: error types, settings,
//! timestamp layouts and truncation, bucket models and output rendering.

pub mod error;
pub mod formatting;
pub mod models;
pub mod settings;
pub mod time_utils;

pub use error::{EventsError, Result, TimestampError};
