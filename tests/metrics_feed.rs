// tests/metrics_feed.rs
#![cfg(feature = "strict-metrics")]
use metrics_exporter_prometheus::PrometheusBuilder;
use quake_feed::feed::{decode, ensure_metrics_described};

#[tokio::test]
async fn metrics_exposed_after_decode() {
    // Install a local recorder for the test
    let handle = PrometheusBuilder::new().install_recorder().expect("recorder");
    ensure_metrics_described();

    let raw = r#"{"features":[{"properties":{"place":"A"}},{"id":"no-props"}]}"#;
    let out = decode(raw).expect("decode");
    assert_eq!(out.len(), 1);

    let text = handle.render();
    assert!(text.contains("feed_events_decoded_total"));
    assert!(text.contains("feed_features_skipped_total"));
    assert!(text.contains(r#"feed_field_defaults_total{field="mag"}"#));
}
