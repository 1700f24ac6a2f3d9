use std::fmt::Write as _;

use chrono::format::{Item, Parsed, StrftimeItems};
use chrono::{DateTime, NaiveDate, TimeDelta, Timelike, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{EventsError, Result, TimestampError};

// ── Defaults ──────────────────────────────────────────────────────────────────

/// Layout of the bracketed timestamp that opens every event log line.
pub const DEFAULT_INPUT_LAYOUT: &str = "[%Y-%m-%d %H:%M:%S]";

/// Layout used when printing bucket minutes.
pub const DEFAULT_OUTPUT_LAYOUT: &str = "[%Y-%m-%d %H:%M]";

/// Layout used to stamp poller result lines with the tick time.
pub const DEFAULT_TICK_LAYOUT: &str = "%Y-%m-%d %H:%M:00";

// ── Granularity ───────────────────────────────────────────────────────────────

/// Resolution that timestamps are floored to before bucketing.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum,
)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Second,
    #[default]
    Minute,
    Hour,
    Day,
}

impl Granularity {
    /// Length of one unit in seconds.
    pub fn seconds(self) -> u32 {
        match self {
            Granularity::Second => 1,
            Granularity::Minute => 60,
            Granularity::Hour => 3_600,
            Granularity::Day => 86_400,
        }
    }

    /// Floor `dt` to the start of its containing unit.
    ///
    /// Never rounds up: `15:04:59.999` truncates to `15:04:00` at minute
    /// resolution.
    pub fn truncate(self, dt: DateTime<Utc>) -> DateTime<Utc> {
        let into_unit = dt.num_seconds_from_midnight() % self.seconds();
        dt - TimeDelta::seconds(i64::from(into_unit))
            - TimeDelta::nanoseconds(i64::from(dt.nanosecond()))
    }
}

impl std::fmt::Display for Granularity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Granularity::Second => "second",
            Granularity::Minute => "minute",
            Granularity::Hour => "hour",
            Granularity::Day => "day",
        };
        f.write_str(name)
    }
}

// ── TimestampLayout ───────────────────────────────────────────────────────────

/// A validated chrono strftime pattern.
///
/// Construction rejects patterns chrono cannot render. The rendered width is
/// measured against two reference instants chosen so that variable-width
/// specifiers (`%B`, `%A`, `%-d`, `%.f`, ...) render at different lengths;
/// [`TimestampLayout::fixed_width`] is `None` for such patterns.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimestampLayout {
    pattern: String,
    fixed_width: Option<usize>,
}

impl TimestampLayout {
    /// Validate `pattern` and measure its rendered width.
    pub fn new(pattern: impl Into<String>) -> Result<Self> {
        let pattern = pattern.into();

        if StrftimeItems::new(&pattern).any(|item| matches!(item, Item::Error)) {
            return Err(EventsError::InvalidLayout {
                layout: pattern,
                reason: "contains an unrecognised strftime specifier".to_string(),
            });
        }

        let (first, second) = reference_instants();
        let short = render(&pattern, first).ok_or_else(|| EventsError::InvalidLayout {
            layout: pattern.clone(),
            reason: "cannot be rendered".to_string(),
        })?;
        let long = render(&pattern, second).ok_or_else(|| EventsError::InvalidLayout {
            layout: pattern.clone(),
            reason: "cannot be rendered".to_string(),
        })?;

        let (a, b) = (short.chars().count(), long.chars().count());
        let fixed_width = (a == b && a > 0).then_some(a);

        Ok(Self {
            pattern,
            fixed_width,
        })
    }

    /// The raw strftime pattern.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// Number of characters every rendered timestamp occupies, or `None` when
    /// the width depends on the instant.
    pub fn fixed_width(&self) -> Option<usize> {
        self.fixed_width
    }

    /// Render `dt` under this layout.
    pub fn format(&self, dt: DateTime<Utc>) -> String {
        // Patterns are validated in `new`, so rendering cannot fail here.
        render(&self.pattern, dt).unwrap_or_default()
    }

    /// Parse `text` as an absolute instant.
    ///
    /// Patterns carrying an offset (`%z`, `%:z`) are honoured and the result
    /// is normalised to UTC; anything else is read as UTC. A pattern without
    /// time fields yields midnight. Second `60` is rejected.
    pub fn parse(&self, text: &str) -> std::result::Result<DateTime<Utc>, TimestampError> {
        let mut parsed = Parsed::new();
        chrono::format::parse(&mut parsed, text, StrftimeItems::new(&self.pattern))?;

        let dt = match parsed.to_datetime() {
            Ok(dt) => dt.with_timezone(&Utc),
            Err(_) => match parsed.to_naive_datetime_with_offset(0) {
                Ok(naive) => naive.and_utc(),
                Err(err) => match parsed.to_naive_date() {
                    Ok(date) => date.and_time(chrono::NaiveTime::MIN).and_utc(),
                    Err(_) => return Err(err.into()),
                },
            },
        };

        // chrono keeps a leap second as nanoseconds past 1_000_000_000.
        if dt.nanosecond() >= 1_000_000_000 {
            return Err(TimestampError::SecondOutOfRange);
        }

        Ok(dt)
    }

    /// Check that timestamps rendered under this layout parse back.
    ///
    /// Some specifiers render but cannot be read (`%Z` prints a zone name
    /// chrono will not parse), which would make every record malformed.
    pub fn ensure_parseable(&self) -> Result<()> {
        let (first, _) = reference_instants();
        let rendered = self.format(first);
        self.parse(&rendered)
            .map(|_| ())
            .map_err(|e| EventsError::InvalidLayout {
                layout: self.pattern.clone(),
                reason: format!("rendered timestamp \"{rendered}\" does not parse back: {e}"),
            })
    }
}

impl std::fmt::Display for TimestampLayout {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.pattern)
    }
}

// ── Helpers ───────────────────────────────────────────────────────────────────

fn render(pattern: &str, dt: DateTime<Utc>) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", dt.format_with_items(StrftimeItems::new(pattern))).ok()?;
    Some(out)
}

/// Two instants that differ in every field's natural width.
fn reference_instants() -> (DateTime<Utc>, DateTime<Utc>) {
    let first = NaiveDate::from_ymd_opt(2006, 1, 2)
        .and_then(|d| d.and_hms_nano_opt(15, 4, 5, 0))
        .map(|n| n.and_utc())
        .unwrap_or_default();
    let second = NaiveDate::from_ymd_opt(2025, 12, 31)
        .and_then(|d| d.and_hms_nano_opt(9, 59, 59, 123_456_789))
        .map(|n| n.and_utc())
        .unwrap_or_default();
    (first, second)
}

// ── Tests ─────────────────────────────────────────────────────────────────────
