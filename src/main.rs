//! Quake feed service — binary entrypoint.
//! Boots the Axum HTTP server with the feed routes and `/metrics`.

use quake_feed::api::{self, AppState};
use quake_feed::feed::config::FeedConfig;
use quake_feed::metrics::Metrics;
use quake_feed::session::TcpProbe;
use shuttle_axum::ShuttleAxum;
use std::sync::Arc;
use std::time::Duration;

/// Opt-in: QUAKE_CONNECTIVITY_PROBE=1 checks the endpoint host before each fetch.
fn probe_enabled() -> bool {
    std::env::var("QUAKE_CONNECTIVITY_PROBE")
        .ok()
        .is_some_and(|v| v == "1")
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();
    quake_feed::init_tracing();

    let config = FeedConfig::load_default()?;
    let fetcher = config.fetcher()?;
    tracing::info!(
        endpoint = %config.endpoint,
        minmag = %config.min_magnitude,
        orderby = %config.order_by,
        limit = config.limit,
        "feed config loaded"
    );

    let mut state = AppState::new(config.clone(), fetcher);
    if probe_enabled() {
        let probe = TcpProbe::for_endpoint(&config.endpoint, Duration::from_secs(3))?;
        state = state.with_probe(Arc::new(probe));
    }

    let mut router = api::router(state);
    match Metrics::init() {
        Ok(m) => router = router.merge(m.router()),
        Err(e) => tracing::warn!(error = ?e, "metrics disabled"),
    }

    Ok(router.into())
}
