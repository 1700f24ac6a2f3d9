mod bootstrap;

use std::io::Write;
use std::time::Duration;

use anyhow::{Context, Result};
use events_core::formatting::render;
use events_core::settings::{Command, CountArgs, PollArgs, Settings};
use events_core::time_utils::TimestampLayout;
use events_data::aggregator::BucketAggregator;
use events_data::classifier::RecordClassifier;
use events_data::reader::{count_events, RecordSource};
use events_runtime::client::{CountClient, DEFAULT_REQUEST_TIMEOUT};
use events_runtime::poller::CountPoller;

#[tokio::main]
async fn main() -> Result<()> {
    let settings = Settings::load()?;

    bootstrap::setup_logging(&settings.log_level, settings.log_file.as_ref())?;

    tracing::info!("event-counter v{} starting", env!("CARGO_PKG_VERSION"));

    match &settings.command {
        Command::Count(args) => run_count(args),
        Command::Poll(args) => run_poll(args).await,
    }
}

/// Aggregate the log and print every bucket. Nothing is printed unless the
/// whole log aggregates cleanly.
fn run_count(args: &CountArgs) -> Result<()> {
    let classifier =
        RecordClassifier::from_pattern(&args.input_layout, args.granularity, args.suffix.as_str())?;
    let output_layout = TimestampLayout::new(args.output_layout.as_str())?;
    let aggregator = BucketAggregator::new(classifier);

    tracing::info!(
        "Counting lines ending with {:?} per {} in {}",
        args.suffix,
        args.granularity,
        args.path.display()
    );

    let source = RecordSource::from_path(&args.path);
    let buckets = count_events(&source, &aggregator).context("Get events in minute failed")?;

    let rendered = render(&buckets, &output_layout, args.output)?;
    let mut stdout = std::io::stdout().lock();
    stdout.write_all(rendered.as_bytes())?;
    stdout.flush()?;

    Ok(())
}

/// Poll until Ctrl+C, printing one line per server per tick.
async fn run_poll(args: &PollArgs) -> Result<()> {
    let client = CountClient::new(args.metric_path.as_str(), DEFAULT_REQUEST_TIMEOUT)?;
    let poller = CountPoller::new(
        args.servers.clone(),
        Duration::from_secs(args.interval_secs),
        client,
    );

    let (mut rx, handle) = poller.start();

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            report = rx.recv() => match report {
                Some(report) => println!("{}", report),
                None => break,
            },
            _ = &mut ctrl_c => {
                tracing::info!("Ctrl+C received; stopping poller");
                break;
            }
        }
    }

    handle.abort();
    Ok(())
}
