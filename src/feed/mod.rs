// src/feed/mod.rs
pub mod config;
pub mod decoder;
pub mod fetcher;
pub mod pipeline;
pub mod request;
pub mod types;

use metrics::{describe_counter, describe_gauge, describe_histogram};
use once_cell::sync::OnceCell;

pub use decoder::{decode, DecodeError};
pub use fetcher::{FetchError, HttpFetcher};
pub use pipeline::{fetch_records, FetchHandle, FetchOutcome, FetchPipeline, PipelineError};
pub use request::{build as build_request_url, RequestError};
pub use types::{FetchRequestOptions, OrderBy, SeismicEvent};

/// One-time metrics registration (so series show up on /metrics).
pub fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("feed_fetch_total", "Feed fetches attempted.");
        describe_counter!("feed_fetch_errors_total", "Feed fetches failed, by kind.");
        describe_counter!(
            "feed_fetch_cancelled_total",
            "In-flight fetches cancelled or replaced."
        );
        describe_counter!("feed_events_decoded_total", "Events decoded from feeds.");
        describe_counter!(
            "feed_features_skipped_total",
            "Features dropped for lacking a properties object."
        );
        describe_counter!(
            "feed_field_defaults_total",
            "Record fields replaced by their default, by field."
        );
        describe_histogram!("feed_fetch_ms", "End-to-end fetch time in milliseconds.");
        describe_histogram!("feed_decode_ms", "Feed decode time in milliseconds.");
        describe_gauge!("feed_last_fetch_ts", "Unix ts of the last completed fetch.");
    });
}
