//! HTTP client for the `/api/count` endpoint exposed by event servers.

use std::time::Duration;

use reqwest::header::CONTENT_TYPE;
use reqwest::StatusCode;
use serde::Deserialize;
use thiserror::Error;

/// Scheme prepended to every server host.
pub const HTTP_PREFIX: &str = "http://";

/// Upper bound on a single count request.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// ── FetchError ────────────────────────────────────────────────────────────────

/// Why a single count request produced no count.
#[derive(Error, Debug)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Request(#[source] reqwest::Error),

    #[error("response status code is not 200: Status Code: {0}")]
    Status(u16),

    #[error("content-type header is not application/json: Content-Type: {0}")]
    ContentType(String),

    #[error("decode json failed: {0}")]
    Decode(#[source] serde_json::Error),

    #[error("response data is empty")]
    EmptyCount,
}

#[derive(Debug, Deserialize)]
struct CountResponse {
    count: Option<i64>,
}

// ── CountClient ───────────────────────────────────────────────────────────────

/// Fetches event counts from servers over plain HTTP.
#[derive(Debug, Clone)]
pub struct CountClient {
    http: reqwest::Client,
    metric_path: String,
}

impl CountClient {
    /// Build a client querying `metric_path` on each server.
    pub fn new(metric_path: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(FetchError::Request)?;
        Ok(Self {
            http,
            metric_path: metric_path.into(),
        })
    }

    /// Full URL of the counter endpoint on `server`.
    pub fn endpoint(&self, server: &str) -> String {
        format!("{}{}{}", HTTP_PREFIX, server, self.metric_path)
    }

    /// Fetch the current count from `server`.
    pub async fn fetch_count(&self, server: &str) -> Result<i64, FetchError> {
        self.fetch_url(&self.endpoint(server)).await
    }

    /// Fetch and validate a count from an absolute URL.
    ///
    /// Checks, in order: transport, status 200, `Content-Type` exactly
    /// `application/json`, JSON body, presence of `count`.
    pub async fn fetch_url(&self, url: &str) -> Result<i64, FetchError> {
        let response = self
            .http
            .get(url)
            .send()
            .await
            .map_err(FetchError::Request)?;

        if response.status() != StatusCode::OK {
            return Err(FetchError::Status(response.status().as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .map(|v| String::from_utf8_lossy(v.as_bytes()).into_owned())
            .unwrap_or_default();
        if content_type != "application/json" {
            return Err(FetchError::ContentType(content_type));
        }

        let body = response.bytes().await.map_err(FetchError::Request)?;
        let decoded: CountResponse = serde_json::from_slice(&body).map_err(FetchError::Decode)?;

        decoded.count.ok_or(FetchError::EmptyCount)
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────
