//! Resilient HTTP client tests

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde_json::json;
use tokio_test::assert_ok;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

use mower_agent::errors::AgentError;
use mower_agent::http::client::{HttpClient, HttpRequest};

use crate::common::*;

/// Answers with the given statuses in turn, then 200 with an empty list
async fn mount_sequence(server: &MockServer, statuses: &'static [u16], expected_calls: u64) {
    let calls = Arc::new(AtomicUsize::new(0));
    Mock::given(method("GET"))
        .and(path("/mowers"))
        .respond_with(move |_req: &Request| -> ResponseTemplate {
            let current = calls.fetch_add(1, Ordering::SeqCst);
            match statuses.get(current) {
                Some(status) => ResponseTemplate::new(*status),
                None => ResponseTemplate::new(200).set_body_json(mower_list(&[])),
            }
        })
        .expect(expected_calls)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[500, 500], 3).await;

    let http = http_client(&server);
    assert_ok!(http.get_mowers().await);
    assert!(http.last_error().is_none());

    let requests = server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 3);
}

#[tokio::test]
async fn test_server_error_surfaces_after_ceiling() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[502, 503, 500, 500], 3).await;

    let http = http_client(&server);
    let err = http.get_mowers().await.unwrap_err();
    assert!(matches!(err, AgentError::ServerError { status: 500, .. }));
    assert!(http.last_error().unwrap().contains("500"));
}

#[tokio::test]
async fn test_not_found_is_not_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/mowers/id-9"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "errors": [{ "title": "Not found", "detail": "Mower does not exist" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let http = http_client(&server);
    let err = http.get_mower("id-9", "Garden").await.unwrap_err();
    assert!(matches!(err, AgentError::ClientError { status: 404, .. }));

    let last_error = http.last_error().unwrap();
    assert!(last_error.starts_with("(Garden - 404) Not found: Mower does not exist"));
}

#[tokio::test]
async fn test_forbidden_is_retried() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[403], 2).await;

    let http = http_client(&server);
    assert_ok!(http.get_mowers().await);
}

#[tokio::test]
async fn test_forbidden_surfaces_after_ceiling() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[403, 403, 403], 3).await;

    let http = http_client(&server);
    let err = http.get_mowers().await.unwrap_err();
    assert!(matches!(err, AgentError::ClientError { status: 403, .. }));
}

#[tokio::test]
async fn test_rate_limit_flag() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[429], 2).await;

    let http = http_client(&server);
    let err = http.get_mowers().await.unwrap_err();
    assert!(matches!(err, AgentError::RateLimited(_)));
    assert!(http.is_rate_limited());

    // The next success clears it
    assert_ok!(http.get_mowers().await);
    assert!(!http.is_rate_limited());
}

#[tokio::test]
async fn test_message_error_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/actions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({ "message": "Invalid payload" })))
        .expect(1)
        .mount(&server)
        .await;

    let http = http_client(&server);
    let url = format!("{}/mowers/id-1/actions", server.uri());
    let err = http
        .call(HttpRequest::post_json(url, json!({})).for_mower("Front"))
        .await
        .unwrap_err();

    match err {
        AgentError::ClientError { status, message } => {
            assert_eq!(status, 400);
            assert!(message.starts_with("(Front - 400) Invalid payload"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_connection_failure_is_transient() {
    let http = HttpClient::new("http://127.0.0.1:1", fast_http()).unwrap();

    let err = http.get_mowers().await.unwrap_err();
    assert!(matches!(err, AgentError::TransientNetwork(_)));
    assert!(http.last_error().unwrap().contains("Connection error to url"));
}

#[tokio::test]
async fn test_empty_success_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/actions"))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let http = http_client(&server);
    let url = format!("{}/mowers/id-1/actions", server.uri());
    let value = http.call(HttpRequest::post_json(url, json!({}))).await.unwrap();
    assert!(value.is_null());
}

#[tokio::test]
async fn test_closed_client_refuses_calls() {
    let server = MockServer::start().await;
    mount_sequence(&server, &[], 0).await;

    let http = http_client(&server);
    assert!(http.close());
    assert!(!http.close());
    assert!(http.is_closed());

    let err = http.get_mowers().await.unwrap_err();
    assert!(matches!(err, AgentError::ShutdownError(_)));
}
