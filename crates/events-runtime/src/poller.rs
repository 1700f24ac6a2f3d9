//! Periodic count poller.
//!
//! Runs in a tokio task and, on every tick, asks each configured server for
//! its current event count. Every server's result (count or error) becomes one
//! [`PollReport`] on an `mpsc` channel, so one failing server never hides the
//! others.

use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Local};
use events_core::time_utils::DEFAULT_TICK_LAYOUT;
use tokio::sync::mpsc;
use tokio::time::{self, Instant, MissedTickBehavior};

use crate::client::{CountClient, FetchError};

// ── PollReport ────────────────────────────────────────────────────────────────

/// Outcome of polling one server on one tick.
#[derive(Debug)]
pub struct PollReport {
    /// When the tick fired.
    pub tick: DateTime<Local>,
    /// Host that was polled.
    pub server: String,
    /// The fetched count, or why there is none.
    pub result: Result<i64, FetchError>,
}

impl fmt::Display for PollReport {
    /// `"<tick> <server> <count|error>"`.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {} ", self.tick.format(DEFAULT_TICK_LAYOUT), self.server)?;
        match &self.result {
            Ok(count) => write!(f, "{}", count),
            Err(e) => write!(f, "{}", e),
        }
    }
}

// ── CountPoller ───────────────────────────────────────────────────────────────

/// Background poller over a static server list.
pub struct CountPoller {
    servers: Vec<String>,
    interval: Duration,
    client: CountClient,
}

impl CountPoller {
    pub fn new(servers: Vec<String>, interval: Duration, client: CountClient) -> Self {
        Self {
            servers,
            interval,
            client,
        }
    }

    /// Spawn the polling loop.
    ///
    /// The first poll happens one full interval after start. Returns the
    /// report channel and a handle that stops the loop.
    pub fn start(self) -> (mpsc::Receiver<PollReport>, PollHandle) {
        let (tx, rx) = mpsc::channel(self.servers.len().max(1) * 4);

        let handle = tokio::spawn(async move {
            self.polling_loop(tx).await;
        });

        (rx, PollHandle { handle })
    }

    // ── Private implementation ────────────────────────────────────────────

    /// Exits when the receiver is dropped.
    async fn polling_loop(self, tx: mpsc::Sender<PollReport>) {
        let mut interval = time::interval_at(Instant::now() + self.interval, self.interval);
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);

        tracing::info!(
            servers = self.servers.len(),
            interval_secs = self.interval.as_secs_f64(),
            "poller started"
        );

        loop {
            interval.tick().await;

            if tx.is_closed() {
                tracing::debug!("poll channel closed; exiting loop");
                break;
            }

            if !self.poll_all(Local::now(), &tx).await {
                tracing::debug!("poll receiver dropped mid-tick; exiting loop");
                break;
            }
        }
    }

    /// Poll every server once, in list order. Returns `false` once the
    /// receiver is gone.
    async fn poll_all(&self, tick: DateTime<Local>, tx: &mpsc::Sender<PollReport>) -> bool {
        for server in &self.servers {
            let result = self.client.fetch_count(server).await;
            if let Err(e) = &result {
                tracing::debug!(server = %server, error = %e, "count request failed");
            }

            let report = PollReport {
                tick,
                server: server.clone(),
                result,
            };
            if tx.send(report).await.is_err() {
                return false;
            }
        }
        true
    }
}

// ── PollHandle ────────────────────────────────────────────────────────────────

/// A handle to the background polling task.
pub struct PollHandle {
    handle: tokio::task::JoinHandle<()>,
}

impl PollHandle {
    /// Immediately abort the polling loop.
    pub fn abort(&self) {
        self.handle.abort();
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
