// inputguard-core/tests/detection_client_tests.rs
use std::time::Duration;

use mockito::{Matcher, Server};
use serde_json::json;

use inputguard_core::detection::Endpoint;
use inputguard_core::{DetectionClient, DetectionError, Endpoints, HttpDetectionClient, PiiEntity, PiiReport};

fn endpoints_for(server: &Server) -> Endpoints {
    Endpoints {
        check_url: format!("{}/check", server.url()),
        ingest_url: format!("{}/ingest", server.url()),
    }
}

#[tokio::test]
async fn test_check_terms_posts_text_and_reads_words() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/check")
        .match_header("content-type", "application/json")
        .match_body(Matcher::Json(json!({"text": "call acme"})))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"sensitive_words": ["acme"]}"#)
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    let check = client.check_terms("call acme").await.unwrap();

    assert_eq!(check.matched_terms, vec!["acme"]);
    mock.assert_async().await;
}

#[tokio::test]
async fn test_ingest_null_marker_means_no_pii() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/ingest")
        .with_status(200)
        .with_body(r#"{"pii": "null"}"#)
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    assert_eq!(client.ingest("hello").await.unwrap(), PiiReport::None);
}

#[tokio::test]
async fn test_ingest_entities() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/ingest")
        .with_status(200)
        .with_body(r#"{"pii": [{"type": "US_SSN", "value": "123-45-6789"}]}"#)
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    let report = client.ingest("my ssn is 123-45-6789").await.unwrap();
    assert_eq!(report.entities(), &[PiiEntity::new("US_SSN", "123-45-6789")]);
}

#[tokio::test]
async fn test_server_error_is_transport_failure() {
    let mut server = Server::new_async().await;
    server.mock("POST", "/check").with_status(503).create_async().await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    let err = client.check_terms("x").await.unwrap_err();
    assert!(matches!(err, DetectionError::Transport(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_non_json_body_is_malformed() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/check")
        .with_status(200)
        .with_body("<html>oops</html>")
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    let err = client.check_terms("x").await.unwrap_err();
    assert!(matches!(err, DetectionError::Malformed(_)), "got {:?}", err);
}

#[tokio::test]
async fn test_service_error_entry_is_a_failure() {
    let mut server = Server::new_async().await;
    server
        .mock("POST", "/ingest")
        .with_status(200)
        .with_body(r#"{"pii": [{"type": "error", "value": "model not loaded"}]}"#)
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    assert!(client.ingest("x").await.is_err());
}

#[tokio::test]
async fn test_endpoint_override_takes_effect() {
    let mut server = Server::new_async().await;
    let moved = server
        .mock("POST", "/v2/check")
        .with_status(200)
        .with_body(r#"{"sensitive_words": []}"#)
        .create_async()
        .await;

    let client = HttpDetectionClient::new(endpoints_for(&server));
    client.set_check_url(&format!("{}/v2/check", server.url()));
    assert_eq!(client.endpoints().check_url, format!("{}/v2/check", server.url()));

    let body = client.post_text(Endpoint::Check, "x").await.unwrap();
    assert_eq!(body, json!({"sensitive_words": []}));
    moved.assert_async().await;
}

#[tokio::test]
async fn test_unreachable_service_is_transport_failure() {
    let endpoints = Endpoints {
        check_url: "http://127.0.0.1:9/check".to_string(),
        ingest_url: "http://127.0.0.1:9/ingest".to_string(),
    };
    let client = HttpDetectionClient::with_timeout(endpoints, Duration::from_secs(2)).unwrap();
    let err = client.check_terms("x").await.unwrap_err();
    assert!(matches!(err, DetectionError::Transport(_)), "got {:?}", err);
}
