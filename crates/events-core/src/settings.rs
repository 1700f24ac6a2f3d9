use clap::{ArgMatches, Args, CommandFactory, FromArgMatches, Parser, Subcommand};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{EventsError, Result};
use crate::formatting::OutputFormat;
use crate::time_utils::{Granularity, DEFAULT_INPUT_LAYOUT, DEFAULT_OUTPUT_LAYOUT};

// ── Defaults ───────────────────────────────────────────────────────────────────

/// Suffix that marks a log line as a counted event.
pub const DEFAULT_SUFFIX: &str = "NOK";

/// Log file read by `count` when no path is given.
pub const DEFAULT_LOG_PATH: &str = "events.log";

/// Endpoint queried on every polled server.
pub const DEFAULT_METRIC_PATH: &str = "/api/count";

/// Seconds between poll ticks.
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 60;

/// Servers polled when none are configured.
pub const DEFAULT_SERVERS: &[&str] = &["maria.ru", "rose.ru", "sina.ru"];

fn default_servers() -> Vec<String> {
    DEFAULT_SERVERS.iter().map(|s| s.to_string()).collect()
}

// ── Settings (CLI) ─────────────────────────────────────────────────────────────

/// Count matching log events per minute and poll remote event counters
#[derive(Parser, Debug, Clone)]
#[command(
    name = "event-counter",
    about = "Count matching log events per minute and poll remote event counters",
    version
)]
pub struct Settings {
    #[command(subcommand)]
    pub command: Command,

    /// Logging level
    #[arg(long, global = true, default_value = "INFO", value_parser = ["DEBUG", "INFO", "WARNING", "ERROR"])]
    pub log_level: String,

    /// Log file path (logs go to stderr when unset)
    #[arg(long, global = true)]
    pub log_file: Option<PathBuf>,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// JSON config file supplying defaults (defaults to ~/.event-counter/config.json)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Count matching events per minute in a log file
    Count(CountArgs),
    /// Periodically poll the event counter of every server
    Poll(PollArgs),
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct CountArgs {
    /// Log file to read, or `-` for stdin
    #[arg(default_value = DEFAULT_LOG_PATH)]
    pub path: PathBuf,

    /// strftime layout of the timestamp prefix on every line
    #[arg(long, default_value = DEFAULT_INPUT_LAYOUT)]
    pub input_layout: String,

    /// strftime layout used to print bucket times
    #[arg(long, default_value = DEFAULT_OUTPUT_LAYOUT)]
    pub output_layout: String,

    /// Lines ending with this text are counted
    #[arg(long, default_value = DEFAULT_SUFFIX)]
    pub suffix: String,

    /// Bucket resolution
    #[arg(long, value_enum, default_value_t = Granularity::Minute)]
    pub granularity: Granularity,

    /// Output format
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    pub output: OutputFormat,
}

#[derive(Args, Debug, Clone, PartialEq)]
pub struct PollArgs {
    /// Server host to poll (repeatable or comma-separated)
    #[arg(long = "server", value_delimiter = ',', default_values_t = default_servers())]
    pub servers: Vec<String>,

    /// Seconds between polls
    #[arg(long, default_value_t = DEFAULT_POLL_INTERVAL_SECS, value_parser = clap::value_parser!(u64).range(1..))]
    pub interval_secs: u64,

    /// Path of the counter endpoint on every server
    #[arg(long, default_value = DEFAULT_METRIC_PATH)]
    pub metric_path: String,
}

// ── ConfigFile ─────────────────────────────────────────────────────────────────

/// Optional defaults read from `~/.event-counter/config.json`.
///
/// Every field is optional; command-line values always win.
#[derive(Debug, Serialize, Deserialize, Default, Clone, PartialEq)]
pub struct ConfigFile {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub input_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_layout: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub suffix: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub granularity: Option<Granularity>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub servers: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub interval_secs: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_path: Option<String>,
}

impl ConfigFile {
    /// Default location of the config file.
    pub fn config_path() -> PathBuf {
        Self::config_path_in(&dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")))
    }

    /// Config path rooted at `base_dir` (used for testing).
    pub fn config_path_in(base_dir: &Path) -> PathBuf {
        base_dir.join(".event-counter").join("config.json")
    }

    /// Load the config at `path`.
    ///
    /// A missing file yields the empty config; an unreadable or malformed one
    /// is a [`EventsError::Config`].
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Self::default()),
            Err(e) => {
                return Err(EventsError::Config(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )))
            }
        };
        serde_json::from_str(&content)
            .map_err(|e| EventsError::Config(format!("invalid {}: {}", path.display(), e)))
    }
}

// ── Settings impl ──────────────────────────────────────────────────────────────

impl Settings {
    /// Parse process arguments and merge in the config file.
    pub fn load() -> Result<Self> {
        Self::load_from_args(std::env::args_os().collect(), &ConfigFile::config_path())
    }

    /// Parse `args`, then fill every value not given on the command line from
    /// the config file (`--config`, or `default_config` when absent).
    ///
    /// Invalid arguments print clap's usage message and exit, like any clap
    /// parser.
    pub fn load_from_args(args: Vec<std::ffi::OsString>, default_config: &Path) -> Result<Self> {
        let matches = Settings::command().get_matches_from(args);
        let mut settings = Settings::from_arg_matches(&matches)
            .map_err(|e| EventsError::Config(e.to_string()))?;

        let config = match &settings.config {
            Some(explicit) => {
                if !explicit.exists() {
                    return Err(EventsError::Config(format!(
                        "config file {} does not exist",
                        explicit.display()
                    )));
                }
                ConfigFile::load_from(explicit)?
            }
            None => ConfigFile::load_from(default_config)?,
        };

        match (&mut settings.command, matches.subcommand()) {
            (Command::Count(args), Some((_, sub))) => args.merge_config(&config, sub),
            (Command::Poll(args), Some((_, sub))) => args.merge_config(&config, sub)?,
            _ => {}
        }

        if settings.debug {
            settings.log_level = "DEBUG".to_string();
        }

        tracing::debug!(?settings, "settings resolved");
        Ok(settings)
    }
}

impl CountArgs {
    fn merge_config(&mut self, config: &ConfigFile, matches: &ArgMatches) {
        if !is_arg_explicitly_set(matches, "input_layout") {
            if let Some(v) = &config.input_layout {
                self.input_layout = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "output_layout") {
            if let Some(v) = &config.output_layout {
                self.output_layout = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "suffix") {
            if let Some(v) = &config.suffix {
                self.suffix = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "granularity") {
            if let Some(v) = config.granularity {
                self.granularity = v;
            }
        }
    }
}

impl PollArgs {
    fn merge_config(&mut self, config: &ConfigFile, matches: &ArgMatches) -> Result<()> {
        if !is_arg_explicitly_set(matches, "servers") {
            if let Some(v) = &config.servers {
                if v.is_empty() {
                    return Err(EventsError::Config("servers must not be empty".to_string()));
                }
                self.servers = v.clone();
            }
        }
        if !is_arg_explicitly_set(matches, "interval_secs") {
            if let Some(v) = config.interval_secs {
                if v == 0 {
                    return Err(EventsError::Config(
                        "interval_secs must be at least 1".to_string(),
                    ));
                }
                self.interval_secs = v;
            }
        }
        if !is_arg_explicitly_set(matches, "metric_path") {
            if let Some(v) = &config.metric_path {
                self.metric_path = v.clone();
            }
        }
        Ok(())
    }
}

// ── Helper: check if an arg was explicitly set on the command line ─────────────

/// Returns `true` when `name` was supplied explicitly on the command line
/// (not via default value).
fn is_arg_explicitly_set(matches: &ArgMatches, name: &str) -> bool {
    matches.value_source(name) == Some(clap::parser::ValueSource::CommandLine)
}

// ── Tests ──────────────────────────────────────────────────────────────────────
