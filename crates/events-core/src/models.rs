use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One aggregation unit: the number of matching records seen while a single
/// truncated timestamp was current.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Bucket {
    /// Start of the truncated interval (whole minute by default).
    pub minute: DateTime<Utc>,
    /// Matching records observed while this bucket was open.
    pub count: u64,
}

impl Bucket {
    /// Open an empty bucket for `minute`.
    pub fn open(minute: DateTime<Utc>) -> Self {
        Self { minute, count: 0 }
    }

    /// Count one more matching record.
    pub fn record_match(&mut self) {
        self.count += 1;
    }
}

/// A single log line after timestamp extraction and suffix matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClassifiedRecord {
    /// Parsed timestamp floored to the configured granularity.
    pub minute: DateTime<Utc>,
    /// Whether the raw line ends with the configured suffix.
    pub is_match: bool,
}
