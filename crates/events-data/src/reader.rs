//! Record sources: where the event log lines come from.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use events_core::error::{EventsError, Result};
use events_core::models::Bucket;
use tracing::{debug, info};

use crate::aggregator::BucketAggregator;

// ── RecordSource ──────────────────────────────────────────────────────────────

/// A forward-only provider of raw log lines.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RecordSource {
    /// A log file on disk.
    File(PathBuf),
    /// The process's standard input.
    Stdin,
}

impl RecordSource {
    /// `-` selects stdin, anything else is a file path.
    pub fn from_path(path: &Path) -> Self {
        if path.as_os_str() == "-" {
            RecordSource::Stdin
        } else {
            RecordSource::File(path.to_path_buf())
        }
    }

    /// Open the source as a buffered line reader.
    ///
    /// Failing to open a file is [`EventsError::SourceUnavailable`].
    pub fn open(&self) -> Result<Box<dyn BufRead>> {
        match self {
            RecordSource::File(path) => {
                let file = File::open(path).map_err(|source| EventsError::SourceUnavailable {
                    path: path.clone(),
                    source,
                })?;
                debug!("Opened record source {}", path.display());
                Ok(Box::new(BufReader::new(file)))
            }
            RecordSource::Stdin => Ok(Box::new(std::io::stdin().lock())),
        }
    }
}

impl std::fmt::Display for RecordSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordSource::File(path) => write!(f, "{}", path.display()),
            RecordSource::Stdin => f.write_str("<stdin>"),
        }
    }
}

// ── Public API ────────────────────────────────────────────────────────────────

/// Open `source` and aggregate all of its lines.
pub fn count_events(source: &RecordSource, aggregator: &BucketAggregator) -> Result<Vec<Bucket>> {
    let reader = source.open()?;
    let buckets = aggregator.aggregate_reader(reader)?;
    info!("Counted {} buckets from {}", buckets.len(), source);
    Ok(buckets)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
