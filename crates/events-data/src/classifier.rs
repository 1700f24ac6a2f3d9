//! Per-line classification: timestamp extraction, truncation and suffix
//! matching.

use events_core::error::{EventsError, Result};
use events_core::models::ClassifiedRecord;
use events_core::time_utils::{Granularity, TimestampLayout};

// ── RecordClassifier ──────────────────────────────────────────────────────────

/// Decides which bucket a raw log line belongs to and whether it counts.
///
/// Pure: classification depends only on the line and the configuration fixed
/// at construction.
#[derive(Debug, Clone)]
pub struct RecordClassifier {
    layout: TimestampLayout,
    width: usize,
    granularity: Granularity,
    suffix: String,
}

impl RecordClassifier {
    /// Build a classifier.
    ///
    /// The layout must render at a fixed width, since that width is how many
    /// leading characters of every line are treated as the timestamp, and its
    /// rendered timestamps must parse back.
    pub fn new(
        layout: TimestampLayout,
        granularity: Granularity,
        suffix: impl Into<String>,
    ) -> Result<Self> {
        let width = layout
            .fixed_width()
            .ok_or_else(|| EventsError::InvalidLayout {
                layout: layout.pattern().to_string(),
                reason: "input layouts must render at a fixed width".to_string(),
            })?;
        layout.ensure_parseable()?;

        Ok(Self {
            layout,
            width,
            granularity,
            suffix: suffix.into(),
        })
    }

    /// Convenience constructor from a raw strftime pattern.
    pub fn from_pattern(
        pattern: &str,
        granularity: Granularity,
        suffix: impl Into<String>,
    ) -> Result<Self> {
        Self::new(TimestampLayout::new(pattern)?, granularity, suffix)
    }

    /// Classify one raw line.
    ///
    /// * `Ok(None)` – the line is shorter than the timestamp prefix and is
    ///   skipped.
    /// * `Ok(Some(record))` – truncated timestamp plus suffix match.
    /// * `Err(MalformedTimestamp)` – the prefix does not parse.
    pub fn classify(&self, record: &str) -> Result<Option<ClassifiedRecord>> {
        let Some(prefix) = timestamp_prefix(record, self.width) else {
            return Ok(None);
        };

        let timestamp =
            self.layout
                .parse(prefix)
                .map_err(|source| EventsError::MalformedTimestamp {
                    text: prefix.to_string(),
                    layout: self.layout.pattern().to_string(),
                    source,
                })?;

        Ok(Some(ClassifiedRecord {
            minute: self.granularity.truncate(timestamp),
            is_match: record.ends_with(self.suffix.as_str()),
        }))
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

/// The first `width` characters of `record`, or `None` when the line is
/// shorter.
///
/// Counts characters rather than bytes so a multi-byte code point is never
/// split.
pub fn timestamp_prefix(record: &str, width: usize) -> Option<&str> {
    if width == 0 {
        return Some("");
    }
    record
        .char_indices()
        .map(|(i, c)| i + c.len_utf8())
        .nth(width - 1)
        .map(|end| &record[..end])
}

// ── Tests ─────────────────────────────────────────────────────────────────────
