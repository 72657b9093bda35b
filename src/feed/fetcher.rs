// src/feed/fetcher.rs
//! Single-attempt HTTP GET for the feed.
//!
//! Connect and read timeouts are configured separately. Only `200 OK` counts as
//! success; redirects are not followed and surface as status errors. Idle
//! connections are never pooled, so every call opens its own connection and the
//! connection is closed as soon as the response (or the in-flight future) is
//! dropped, on every exit path.

use std::time::Duration;

use reqwest::{redirect, StatusCode};
use url::Url;

/// Connect phase.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(15);
/// Between reads once connected; 1s proved too tight for a real network.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum FetchError {
    #[error("malformed url: {0}")]
    MalformedUrl(String),
    #[error("could not connect: {0}")]
    Connect(String),
    #[error("response not completed in time")]
    Timeout,
    #[error("unexpected HTTP status {code}")]
    HttpStatus { code: u16 },
    #[error("i/o error: {0}")]
    Io(String),
}

impl FetchError {
    /// Stable label for logs, metrics and API payloads.
    pub fn kind(&self) -> &'static str {
        match self {
            FetchError::MalformedUrl(_) => "malformed_url",
            FetchError::Connect(_) => "connect_error",
            FetchError::Timeout => "timeout",
            FetchError::HttpStatus { .. } => "http_status_error",
            FetchError::Io(_) => "io_error",
        }
    }

    fn from_send(e: reqwest::Error) -> Self {
        // connect timeouts report both; they belong to the connect phase
        if e.is_connect() {
            FetchError::Connect(e.to_string())
        } else if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Io(e.to_string())
        }
    }

    fn from_body(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            FetchError::Timeout
        } else {
            FetchError::Io(e.to_string())
        }
    }
}

#[derive(Clone, Debug)]
pub struct HttpFetcher {
    client: reqwest::Client,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl HttpFetcher {
    pub fn new() -> Result<Self, FetchError> {
        Self::with_timeouts(DEFAULT_CONNECT_TIMEOUT, DEFAULT_READ_TIMEOUT)
    }

    pub fn with_timeouts(connect_timeout: Duration, read_timeout: Duration) -> Result<Self, FetchError> {
        Self::build(connect_timeout, read_timeout, concat!("quake-feed/", env!("CARGO_PKG_VERSION")))
    }

    pub fn build(
        connect_timeout: Duration,
        read_timeout: Duration,
        user_agent: &str,
    ) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder()
            .user_agent(user_agent)
            .connect_timeout(connect_timeout)
            .read_timeout(read_timeout)
            .redirect(redirect::Policy::none())
            .pool_max_idle_per_host(0)
            .build()
            .map_err(|e| FetchError::Io(format!("building http client: {e}")))?;
        Ok(Self {
            client,
            connect_timeout,
            read_timeout,
        })
    }

    pub fn connect_timeout(&self) -> Duration {
        self.connect_timeout
    }

    pub fn read_timeout(&self) -> Duration {
        self.read_timeout
    }

    /// One GET. Returns the body decoded as UTF-8 (lossy) when the status is exactly 200.
    pub async fn fetch(&self, url: &Url) -> Result<String, FetchError> {
        tracing::debug!(target: "feed", %url, "GET");

        // reqwest enforces each phase; the outer bound only guards a stalled header read
        let send = self.client.get(url.clone()).send();
        let resp = tokio::time::timeout(self.connect_timeout + self.read_timeout, send)
            .await
            .map_err(|_| FetchError::Timeout)?
            .map_err(FetchError::from_send)?;

        let status = resp.status();
        if status != StatusCode::OK {
            tracing::debug!(target: "feed", code = status.as_u16(), "non-200 response");
            // `resp` dropped here without reading the body
            return Err(FetchError::HttpStatus {
                code: status.as_u16(),
            });
        }

        let bytes = resp.bytes().await.map_err(FetchError::from_body)?;
        Ok(String::from_utf8_lossy(&bytes).into_owned())
    }

    /// Like [`fetch`](Self::fetch) for a URL that has not been parsed yet.
    pub async fn fetch_str(&self, url: &str) -> Result<String, FetchError> {
        let url = Url::parse(url).map_err(|e| FetchError::MalformedUrl(e.to_string()))?;
        self.fetch(&url).await
    }
}
