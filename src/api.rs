// src/api.rs
//! HTTP surface: renders fetch results as JSON for UI clients.

use std::sync::Arc;

use axum::{
    extract::{Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use tower_http::cors::CorsLayer;

use crate::display::{format_date, format_magnitude, format_time, split_location, MagnitudeBucket};
use crate::feed::config::FeedConfig;
use crate::feed::fetcher::HttpFetcher;
use crate::feed::pipeline::FetchPipeline;
use crate::feed::types::{FetchRequestOptions, OrderBy, SeismicEvent};
use crate::session::{AssumeOnline, ConnectivityProbe, FeedReport, FeedStatus};

#[derive(Clone)]
pub struct AppState {
    pub config: Arc<FeedConfig>,
    pub fetcher: HttpFetcher,
    pub probe: Arc<dyn ConnectivityProbe>,
}

impl AppState {
    pub fn new(config: FeedConfig, fetcher: HttpFetcher) -> Self {
        Self {
            config: Arc::new(config),
            fetcher,
            probe: Arc::new(AssumeOnline),
        }
    }

    pub fn with_probe(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probe = probe;
        self
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        .route("/events", get(events))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

#[derive(Debug, Default, Deserialize)]
struct EventsQuery {
    minmag: Option<String>,
    orderby: Option<String>,
    limit: Option<String>,
}

#[derive(Serialize)]
struct EventOut {
    location: String,
    location_offset: String,
    primary_location: String,
    magnitude: f64,
    magnitude_display: String,
    magnitude_bucket: MagnitudeBucket,
    color: &'static str,
    time_ms: i64,
    date_display: String,
    time_display: String,
    url: String,
}

impl From<&SeismicEvent> for EventOut {
    fn from(ev: &SeismicEvent) -> Self {
        let (offset, primary) = split_location(ev.location());
        let bucket = MagnitudeBucket::for_magnitude(ev.magnitude());
        Self {
            location: ev.location().to_string(),
            location_offset: offset.to_string(),
            primary_location: primary.to_string(),
            magnitude: ev.magnitude(),
            magnitude_display: format_magnitude(ev.magnitude()),
            magnitude_bucket: bucket,
            color: bucket.hex_color(),
            time_ms: ev.timestamp_millis(),
            date_display: format_date(ev.timestamp()),
            time_display: format_time(ev.timestamp()),
            url: ev.detail_url().to_string(),
        }
    }
}

#[derive(Serialize)]
struct EventsResp {
    status: FeedStatus,
    error: Option<&'static str>,
    events: Vec<EventOut>,
}

#[derive(Serialize)]
struct BadRequest {
    error: String,
}

fn resolve_options(cfg: &FeedConfig, q: &EventsQuery) -> Result<FetchRequestOptions, String> {
    let mut opts = cfg.request_options();
    if let Some(m) = q.minmag.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
        if !m.parse::<f64>().is_ok_and(f64::is_finite) {
            return Err(format!("minmag must be a number, got {m:?}"));
        }
        opts.min_magnitude = m.to_string();
    }
    if let Some(o) = q.orderby.as_deref().filter(|s| !s.trim().is_empty()) {
        opts.order_by = o.parse::<OrderBy>().map_err(|e| e.to_string())?;
    }
    if let Some(l) = q.limit.as_deref().filter(|s| !s.trim().is_empty()) {
        opts.limit = l
            .trim()
            .parse()
            .map_err(|_| format!("limit must be a non-negative integer, got {l:?}"))?;
    }
    Ok(opts)
}

async fn events(State(state): State<AppState>, Query(q): Query<EventsQuery>) -> Response {
    let options = match resolve_options(&state.config, &q) {
        Ok(o) => o,
        Err(error) => return (StatusCode::BAD_REQUEST, Json(BadRequest { error })).into_response(),
    };

    let report = if !state.probe.is_online().await {
        FeedReport::no_connectivity()
    } else {
        // per-request pipeline: a dropped request cancels its own fetch only
        let pipeline = FetchPipeline::new(state.fetcher.clone(), state.config.endpoint.clone());
        match pipeline.fetch_latest(options).await {
            Some(outcome) => FeedReport::from_outcome(outcome),
            None => return StatusCode::SERVICE_UNAVAILABLE.into_response(),
        }
    };

    let code = match report.status {
        FeedStatus::SuccessWithData | FeedStatus::SuccessEmpty => StatusCode::OK,
        FeedStatus::NetworkError | FeedStatus::MalformedFeed => StatusCode::BAD_GATEWAY,
        FeedStatus::NoConnectivity => StatusCode::SERVICE_UNAVAILABLE,
    };
    let body = EventsResp {
        status: report.status,
        error: report.error.as_ref().map(|e| e.kind()),
        events: report.events.iter().map(EventOut::from).collect(),
    };
    (code, Json(body)).into_response()
}
