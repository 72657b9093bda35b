// src/lib.rs
// Public library surface for the service binary, the probe CLI and integration tests.

pub mod api;
pub mod display;
pub mod feed;
pub mod metrics;
pub mod session;

// ---- Re-exports for stable public API ----
pub use crate::api::router;
pub use crate::feed::{
    FetchError, FetchOutcome, FetchPipeline, FetchRequestOptions, HttpFetcher, OrderBy,
    PipelineError, SeismicEvent,
};
pub use crate::session::{FeedReport, FeedStatus};

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Install the global tracing subscriber. Safe to call more than once.
///
/// Filter comes from `RUST_LOG` (default `quake_feed=info,warn`);
/// `QUAKE_LOG_JSON=1` switches to JSON lines.
pub fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("quake_feed=info,feed=info,warn"));
    let json = std::env::var("QUAKE_LOG_JSON").ok().is_some_and(|v| v == "1");

    let registry = tracing_subscriber::registry().with(filter);
    let res = if json {
        registry.with(fmt::layer().json()).try_init()
    } else {
        registry.with(fmt::layer().compact()).try_init()
    };
    if res.is_err() {
        tracing::debug!("tracing subscriber already installed");
    }
}
