// tests/feed_fetcher.rs
use quake_feed::feed::fetcher::{FetchError, HttpFetcher};
use std::time::Duration;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn fast_fetcher() -> HttpFetcher {
    HttpFetcher::with_timeouts(Duration::from_secs(1), Duration::from_millis(200))
        .expect("client builds")
}

// Promises 100 bytes, sends 11.
const TRUNCATED_RESPONSE: &[u8] = b"HTTP/1.1 200 OK\r\ncontent-length: 100\r\n\r\n{\"features\"";

/// Accept one connection and read the request head.
async fn accept_request(listener: &TcpListener) -> TcpStream {
    let (mut sock, _) = listener.accept().await.unwrap();
    let mut buf = Vec::new();
    let mut chunk = [0u8; 1024];
    while !buf.windows(4).any(|w| w == b"\r\n\r\n") {
        let n = sock.read(&mut chunk).await.unwrap();
        assert!(n > 0, "client closed before sending a request");
        buf.extend_from_slice(&chunk[..n]);
    }
    sock
}

#[tokio::test]
async fn ok_body_is_returned_as_text() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/query"))
        .respond_with(ResponseTemplate::new(200).set_body_string(r#"{"features":[]}"#))
        .expect(1)
        .mount(&server)
        .await;

    let body = fast_fetcher()
        .fetch_str(&format!("{}/query", server.uri()))
        .await
        .expect("200 ok");
    assert_eq!(body, r#"{"features":[]}"#);
}

#[tokio::test]
async fn not_found_is_http_status_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404).set_body_string("not here"))
        .mount(&server)
        .await;

    let err = fast_fetcher()
        .fetch_str(&format!("{}/query", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::HttpStatus { code: 404 });
}

#[tokio::test]
async fn other_2xx_and_redirects_are_errors_too() {
    let server = MockServer::start().await;
    Mock::given(path("/accepted"))
        .respond_with(ResponseTemplate::new(202).set_body_string("{}"))
        .mount(&server)
        .await;
    Mock::given(path("/moved"))
        .respond_with(
            ResponseTemplate::new(301).insert_header("location", format!("{}/accepted", server.uri())),
        )
        .mount(&server)
        .await;

    let f = fast_fetcher();
    let e1 = f.fetch_str(&format!("{}/accepted", server.uri())).await.unwrap_err();
    assert_eq!(e1, FetchError::HttpStatus { code: 202 });
    let e2 = f.fetch_str(&format!("{}/moved", server.uri())).await.unwrap_err();
    assert_eq!(e2, FetchError::HttpStatus { code: 301 });
}

#[tokio::test]
async fn slow_response_is_timeout() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string("{}")
                .set_delay(Duration::from_secs(3)),
        )
        .mount(&server)
        .await;

    let err = fast_fetcher()
        .fetch_str(&format!("{}/query", server.uri()))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
}

#[tokio::test]
async fn refused_connection_is_connect_error() {
    // grab a free port, then close it
    let addr = {
        let l = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        l.local_addr().unwrap()
    };
    let err = fast_fetcher()
        .fetch_str(&format!("http://{addr}/query"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Connect(_)), "got {err:?}");
}

#[tokio::test]
async fn invalid_utf8_is_replaced_not_fatal() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![b'o', b'k', 0xFF]))
        .mount(&server)
        .await;

    let body = fast_fetcher().fetch_str(&server.uri()).await.unwrap();
    assert!(body.starts_with("ok"));
}

#[tokio::test]
async fn body_cut_short_is_io_error() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let server = tokio::spawn(async move {
        let mut sock = accept_request(&listener).await;
        sock.write_all(TRUNCATED_RESPONSE).await.unwrap();
        // dropped: closes mid-body
    });

    let err = fast_fetcher()
        .fetch_str(&format!("http://{addr}/query"))
        .await
        .unwrap_err();
    assert!(matches!(err, FetchError::Io(_)), "got {err:?}");
    assert_eq!(err.kind(), "io_error");
    server.await.unwrap();
}

#[tokio::test]
async fn stalled_body_is_timeout() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let (release_tx, release_rx) = tokio::sync::oneshot::channel::<()>();
    let server = tokio::spawn(async move {
        let mut sock = accept_request(&listener).await;
        sock.write_all(TRUNCATED_RESPONSE).await.unwrap();
        // headers and part of the body are out; hold the socket open
        let _ = release_rx.await;
    });

    let err = fast_fetcher()
        .fetch_str(&format!("http://{addr}/query"))
        .await
        .unwrap_err();
    assert_eq!(err, FetchError::Timeout);
    drop(release_tx);
    server.await.unwrap();
}
