//! Command dispatcher tests

use std::sync::Arc;

use serde_json::json;
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mower_agent::authn::token_mngr::TokenManagerExt;
use mower_agent::commands::dispatcher::CommandDispatcher;
use mower_agent::errors::AgentError;
use mower_agent::models::action::MowerAction;
use mower_agent::registry::mowers::MowerRegistry;

use crate::common::*;

async fn dispatcher(server: &MockServer) -> CommandDispatcher {
    let http = http_client(server);
    let token_mngr: Arc<dyn TokenManagerExt> = token_manager(server, http.clone());
    let registry = Arc::new(MowerRegistry::new(http.clone(), token_mngr.clone()));
    registry.refresh_list().await.unwrap();
    registry.refresh_status().await.unwrap();
    CommandDispatcher::new(http, token_mngr, registry)
}

#[tokio::test]
async fn test_off_mower_is_refused_locally() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/mowers/.+/(actions|settings)$"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let err = dispatcher
        .send_action("Back", &MowerAction::ResumeSchedule)
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::UnsafeCommand(_)));
}

#[tokio::test]
async fn test_unknown_mower_and_invalid_parameters() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path_regex(r"^/mowers/.+/(actions|settings)$"))
        .respond_with(ResponseTemplate::new(202))
        .expect(0)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;

    let err = dispatcher.send_action("Nope", &MowerAction::Pause).await.unwrap_err();
    assert!(matches!(err, AgentError::UnknownDevice(_)));

    let err = dispatcher
        .send_action("Front", &MowerAction::SetCuttingHeight(0))
        .await
        .unwrap_err();
    assert!(matches!(err, AgentError::ValidationError(_)));
}

#[tokio::test]
async fn test_start_is_posted_to_actions() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/actions"))
        .and(header("content-type", "application/vnd.api+json"))
        .and(body_json(json!({ "data": { "type": "Start", "attributes": { "duration": 1440 } } })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    dispatcher
        .send_action("Front", &MowerAction::Start { duration_minutes: 1440 })
        .await
        .unwrap();
}

#[tokio::test]
async fn test_settings_are_posted_to_settings() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/settings"))
        .and(body_json(json!({ "data": { "type": "settings", "attributes": { "headlight": { "mode": "ALWAYS_OFF" } } } })))
        .respond_with(ResponseTemplate::new(202))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    dispatcher
        .send_action("Front", &MowerAction::SetHeadlight(false))
        .await
        .unwrap();
}

#[tokio::test]
async fn test_remote_refusal_is_surfaced() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/actions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "errors": [{ "title": "Bad Request", "detail": "Mower is in maintenance" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let dispatcher = dispatcher(&server).await;
    let err = dispatcher.send_action("Front", &MowerAction::Pause).await.unwrap_err();
    match err {
        AgentError::ClientError { status, message } => {
            assert_eq!(status, 400);
            assert!(message.contains("Mower is in maintenance"));
        }
        other => panic!("unexpected error: {other:?}"),
    }
}
