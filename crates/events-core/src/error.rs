use std::path::PathBuf;
use thiserror::Error;

/// All errors produced by the event counter libraries.
#[derive(Error, Debug)]
pub enum EventsError {
    /// The record source (log file) could not be opened.
    #[error("Failed to open file path({path}): {source}")]
    SourceUnavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Reading the next line from an open record source failed.
    #[error("Failed to read record: {0}")]
    SourceRead(#[source] std::io::Error),

    /// A record long enough to carry a timestamp did not parse under the layout.
    #[error("failed to parse time string({text}), layout({layout}), error: {source}")]
    MalformedTimestamp {
        text: String,
        layout: String,
        #[source]
        source: TimestampError,
    },

    /// A strftime pattern is invalid or cannot be used where it was given.
    #[error("Invalid layout \"{layout}\": {reason}")]
    InvalidLayout { layout: String, reason: String },

    /// A configuration value is missing or invalid.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A JSON document could not be parsed or produced.
    #[error("Failed to process JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Pass-through for any raw I/O error that does not carry a path.
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Why a timestamp did not parse under its layout.
#[derive(Error, Debug)]
pub enum TimestampError {
    #[error(transparent)]
    Parse(#[from] chrono::ParseError),

    /// chrono reads `:60` as a leap second; event timestamps never carry one.
    #[error("second out of range")]
    SecondOutOfRange,
}

/// Convenience alias used throughout the event counter crates.
pub type Result<T> = std::result::Result<T, EventsError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_source_unavailable() {
        let io_err = std::io::Error::new(std::io::ErrorKind::NotFound, "no such file");
        let err = EventsError::SourceUnavailable {
            path: PathBuf::from("/var/log/events.log"),
            source: io_err,
        };
        assert_eq!(
            err.to_string(),
            "Failed to open file path(/var/log/events.log): no such file"
        );
    }

    #[test]
    fn test_error_display_malformed_timestamp() {
        let source = chrono::NaiveDateTime::parse_from_str("garbage", "%Y").unwrap_err();
        let err = EventsError::MalformedTimestamp {
            text: "garbage".to_string(),
            layout: "[%Y-%m-%d %H:%M:%S]".to_string(),
            source: source.into(),
        };
        let msg = err.to_string();
        assert!(msg.starts_with(
            "failed to parse time string(garbage), layout([%Y-%m-%d %H:%M:%S]), error: "
        ));
    }

    #[test]
    fn test_error_display_second_out_of_range() {
        let err = EventsError::MalformedTimestamp {
            text: "[2018-04-11 03:13:60]".to_string(),
            layout: "[%Y-%m-%d %H:%M:%S]".to_string(),
            source: TimestampError::SecondOutOfRange,
        };
        assert_eq!(
            err.to_string(),
            "failed to parse time string([2018-04-11 03:13:60]), layout([%Y-%m-%d %H:%M:%S]), \
             error: second out of range"
        );
    }

    #[test]
    fn test_error_display_invalid_layout() {
        let err = EventsError::InvalidLayout {
            layout: "%Q".to_string(),
            reason: "unknown specifier".to_string(),
        };
        assert_eq!(err.to_string(), "Invalid layout \"%Q\": unknown specifier");
    }

    #[test]
    fn test_error_display_config() {
        let err = EventsError::Config("interval must be positive".to_string());
        assert_eq!(
            err.to_string(),
            "Configuration error: interval must be positive"
        );
    }

    #[test]
    fn test_error_from_io() {
        let io_err = std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied");
        let err: EventsError = io_err.into();
        assert!(err.to_string().contains("denied"));
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<serde_json::Value>("{invalid}").unwrap_err();
        let err: EventsError = json_err.into();
        assert!(err.to_string().contains("Failed to process JSON"));
    }
}
