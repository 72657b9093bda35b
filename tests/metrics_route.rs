// tests/metrics_route.rs
//
// The installed recorder must see what the feed modules record. Own test
// binary: a process gets one global recorder.

use axum::{
    body::{self, Body},
    http::{Request, StatusCode},
};
use quake_feed::feed::decode;
use quake_feed::metrics::Metrics;
use tower::ServiceExt as _;

#[tokio::test]
async fn metrics_route_shows_feed_counters() {
    let metrics = Metrics::init().expect("recorder installs");

    let raw = r#"{"features":[{"properties":{"mag":5.1,"place":"A","time":1,"url":"u"}}]}"#;
    assert_eq!(decode(raw).expect("decode").len(), 1);

    let req = Request::builder()
        .uri("/metrics")
        .body(Body::empty())
        .expect("build GET");
    let resp = metrics.router().oneshot(req).await.expect("oneshot");
    assert_eq!(resp.status(), StatusCode::OK);

    let bytes = body::to_bytes(resp.into_body(), 1024 * 1024).await.expect("body");
    let text = String::from_utf8(bytes.to_vec()).expect("utf8");
    assert!(text.contains("feed_events_decoded_total 1"), "got:\n{text}");
    assert!(text.contains("feed_decode_ms"), "got:\n{text}");
}
