use crate::error::Result;
use crate::models::Bucket;
use crate::time_utils::TimestampLayout;

/// How aggregated buckets are written to stdout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum OutputFormat {
    /// One `"<minute> <count>"` line per bucket.
    #[default]
    Text,
    /// A JSON array of `{ "minute", "count" }` objects.
    Json,
}

/// Render a single bucket as `"<minute> <count>"`.
///
/// ```
/// use chrono::{TimeZone, Utc};
/// use events_core::formatting::format_bucket_line;
/// use events_core::models::Bucket;
/// use events_core::time_utils::TimestampLayout;
///
/// let layout = TimestampLayout::new("[%Y-%m-%d %H:%M]").unwrap();
/// let bucket = Bucket { minute: Utc.with_ymd_and_hms(2018, 4, 11, 3, 15, 0).unwrap(), count: 2 };
/// assert_eq!(format_bucket_line(&bucket, &layout), "[2018-04-11 03:15] 2");
/// ```
pub fn format_bucket_line(bucket: &Bucket, layout: &TimestampLayout) -> String {
    format!("{} {}", layout.format(bucket.minute), bucket.count)
}

/// Render all buckets in discovery order, one line each, newline-terminated.
pub fn render_text(buckets: &[Bucket], layout: &TimestampLayout) -> String {
    let mut out = String::new();
    for bucket in buckets {
        out.push_str(&format_bucket_line(bucket, layout));
        out.push('\n');
    }
    out
}

/// Render all buckets as a pretty-printed JSON array.
pub fn render_json(buckets: &[Bucket]) -> Result<String> {
    Ok(serde_json::to_string_pretty(buckets)?)
}

/// Dispatch on `format`.
pub fn render(buckets: &[Bucket], layout: &TimestampLayout, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Text => Ok(render_text(buckets, layout)),
        OutputFormat::Json => {
            let mut json = render_json(buckets)?;
            json.push('\n');
            Ok(json)
        }
    }
}
