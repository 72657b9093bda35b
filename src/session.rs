// src/session.rs
//! Glue between the fetch pipeline and whatever displays its results.
//!
//! The display side only needs two things: the ordered event list and a status
//! that tells "nothing returned" apart from "fetch failed" and "offline".
//! Connectivity is checked before the pipeline is touched at all.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use url::Url;

use crate::feed::pipeline::{FetchHandle, FetchOutcome, FetchPipeline, PipelineError};
use crate::feed::types::{FetchRequestOptions, SeismicEvent};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum FeedStatus {
    SuccessWithData,
    SuccessEmpty,
    NetworkError,
    MalformedFeed,
    NoConnectivity,
}

impl FeedStatus {
    pub fn from_outcome(outcome: &FetchOutcome) -> Self {
        match outcome {
            Ok(events) if events.is_empty() => FeedStatus::SuccessEmpty,
            Ok(_) => FeedStatus::SuccessWithData,
            Err(e) if e.is_malformed_feed() => FeedStatus::MalformedFeed,
            Err(_) => FeedStatus::NetworkError,
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, FeedStatus::SuccessWithData | FeedStatus::SuccessEmpty)
    }
}

/// What the display collaborator receives after each refresh.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedReport {
    pub status: FeedStatus,
    pub events: Vec<SeismicEvent>,
    pub error: Option<PipelineError>,
}

impl FeedReport {
    pub fn from_outcome(outcome: FetchOutcome) -> Self {
        let status = FeedStatus::from_outcome(&outcome);
        match outcome {
            Ok(events) => Self {
                status,
                events,
                error: None,
            },
            Err(e) => Self {
                status,
                events: Vec::new(),
                error: Some(e),
            },
        }
    }

    pub fn no_connectivity() -> Self {
        Self {
            status: FeedStatus::NoConnectivity,
            events: Vec::new(),
            error: None,
        }
    }
}

/// Network availability check; a platform concern, so it sits behind a trait.
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    async fn is_online(&self) -> bool;
}

pub struct AssumeOnline;

#[async_trait]
impl ConnectivityProbe for AssumeOnline {
    async fn is_online(&self) -> bool {
        true
    }
}

/// Online if a TCP connection to the endpoint's host opens within `timeout`.
pub struct TcpProbe {
    host: String,
    port: u16,
    timeout: Duration,
}

impl TcpProbe {
    pub fn for_endpoint(endpoint: &str, timeout: Duration) -> anyhow::Result<Self> {
        let url = Url::parse(endpoint)?;
        let host = url
            .host_str()
            .ok_or_else(|| anyhow::anyhow!("endpoint has no host: {endpoint}"))?
            .to_string();
        let port = url
            .port_or_known_default()
            .ok_or_else(|| anyhow::anyhow!("endpoint has no port: {endpoint}"))?;
        Ok(Self { host, port, timeout })
    }
}

#[async_trait]
impl ConnectivityProbe for TcpProbe {
    async fn is_online(&self) -> bool {
        let addr = (self.host.as_str(), self.port);
        matches!(
            tokio::time::timeout(self.timeout, tokio::net::TcpStream::connect(addr)).await,
            Ok(Ok(_))
        )
    }
}

/// The display collaborator.
pub trait FeedConsumer: Send + Sync + 'static {
    fn on_report(&self, report: FeedReport);
}

/// One consuming session: owns its pipeline, so closing the session cancels its fetch.
pub struct FeedSession<C: FeedConsumer> {
    probe: Arc<dyn ConnectivityProbe>,
    pipeline: FetchPipeline,
    consumer: Arc<C>,
}

impl<C: FeedConsumer> FeedSession<C> {
    pub fn new(probe: Arc<dyn ConnectivityProbe>, pipeline: FetchPipeline, consumer: Arc<C>) -> Self {
        Self {
            probe,
            pipeline,
            consumer,
        }
    }

    /// Report `NoConnectivity` straight away when offline, otherwise start a fetch
    /// (replacing any running one) whose result goes to the consumer.
    pub async fn refresh(&self, options: FetchRequestOptions) -> Option<FetchHandle> {
        if !self.probe.is_online().await {
            tracing::info!(target: "feed", "offline, fetch skipped");
            // a fetch started before going offline is stale now
            self.pipeline.cancel();
            self.consumer.on_report(FeedReport::no_connectivity());
            return None;
        }
        let consumer = Arc::clone(&self.consumer);
        Some(self.pipeline.fetch_all(options, move |outcome| {
            consumer.on_report(FeedReport::from_outcome(outcome));
        }))
    }

    pub fn is_loading(&self) -> bool {
        self.pipeline.is_in_flight()
    }

    pub fn close(self) {
        self.pipeline.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::feed::decoder::DecodeError;
    use crate::feed::fetcher::FetchError;

    #[test]
    fn status_mapping() {
        assert_eq!(FeedStatus::from_outcome(&Ok(vec![])), FeedStatus::SuccessEmpty);
        let ev = SeismicEvent::new("x", 1.0, chrono::Utc::now(), "");
        assert_eq!(
            FeedStatus::from_outcome(&Ok(vec![ev])),
            FeedStatus::SuccessWithData
        );
        assert_eq!(
            FeedStatus::from_outcome(&Err(FetchError::Timeout.into())),
            FeedStatus::NetworkError
        );
        assert_eq!(
            FeedStatus::from_outcome(&Err(DecodeError::MalformedFeed("x".into()).into())),
            FeedStatus::MalformedFeed
        );
    }

    #[test]
    fn tcp_probe_uses_default_port() {
        let p = TcpProbe::for_endpoint(
            "https://earthquake.usgs.gov/fdsnws/event/1/query",
            Duration::from_secs(1),
        )
        .unwrap();
        assert_eq!(p.host, "earthquake.usgs.gov");
        assert_eq!(p.port, 443);
        assert!(TcpProbe::for_endpoint("nope", Duration::from_secs(1)).is_err());
    }
}
