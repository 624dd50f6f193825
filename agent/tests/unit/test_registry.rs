//! Mower registry tests

use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mower_agent::authn::token_mngr::TokenManagerExt;
use mower_agent::models::mower::{MowerActivity, MowerState};
use mower_agent::registry::mowers::MowerRegistry;

use crate::common::*;

fn registry(server: &MockServer) -> MowerRegistry {
    let http = http_client(server);
    let token_mngr: std::sync::Arc<dyn TokenManagerExt> = token_manager(server, http.clone());
    MowerRegistry::new(http, token_mngr)
}

#[tokio::test]
async fn test_refresh_list_replaces_collection() {
    let server = MockServer::start().await;
    mount_token(&server, 3600).await;
    Mock::given(method("GET"))
        .and(path("/mowers"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mower_list(&[("id-1", "Front"), ("id-2", "Back")])))
        .up_to_n_times(1)
        .mount(&server)
        .await;
    mount_mower_list(&server, &[("id-3", "Side")]).await;

    let registry = registry(&server);
    assert!(registry.all_off());
    assert!(registry.last_list_refresh().is_none());

    assert_eq!(registry.refresh_list().await.unwrap(), 2);
    assert_eq!(registry.names(), vec!["Front".to_string(), "Back".to_string()]);
    assert_eq!(registry.find_by_name("Back").unwrap().id, "id-2");
    assert!(registry.last_list_refresh().is_some());

    assert_eq!(registry.refresh_list().await.unwrap(), 1);
    assert!(registry.find_by_name("Front").is_none());
    assert_eq!(registry.names(), vec!["Side".to_string()]);
}

#[tokio::test]
async fn test_refresh_status_updates_details() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;

    let registry = registry(&server);
    registry.refresh_list().await.unwrap();
    registry.refresh_status().await.unwrap();

    let front = registry.find_by_name("Front").unwrap();
    assert_eq!(front.state, MowerState::InOperation);
    assert_eq!(front.activity, MowerActivity::Mowing);
    assert_eq!(front.battery_pct, Some(80));
    assert_eq!(front.cutting_height, Some(4));
    assert_eq!(front.location.unwrap().latitude, 50.8509);
    assert_eq!(front.error_code, None);

    assert_eq!(registry.is_off("Back"), Some(true));
    assert_eq!(registry.is_off("Front"), Some(false));
    assert_eq!(registry.is_off("Nope"), None);
    assert!(!registry.all_off());
    assert!(!registry.any_going_home());
}

#[tokio::test]
async fn test_refresh_status_fails_fast() {
    let server = MockServer::start().await;
    mount_token(&server, 3600).await;
    mount_mower_list(&server, &[("id-1", "One"), ("id-2", "Two"), ("id-3", "Three")]).await;
    mount_mower_detail(&server, "id-1", mower_detail("IN_OPERATION", "GOING_HOME", 55, 3)).await;
    Mock::given(method("GET"))
        .and(path("/mowers/id-2"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/mowers/id-3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(mower_detail("PAUSED", "MOWING", 10, 1)))
        .expect(0)
        .mount(&server)
        .await;

    let registry = registry(&server);
    registry.refresh_list().await.unwrap();
    assert!(registry.refresh_status().await.is_err());

    let one = registry.find_by_name("One").unwrap();
    assert_eq!(one.activity, MowerActivity::GoingHome);
    assert_eq!(one.battery_pct, Some(55));
    assert!(registry.any_going_home());

    let three = registry.find_by_name("Three").unwrap();
    assert_eq!(three.state, MowerState::Unknown);
    assert_eq!(three.battery_pct, None);
}

#[tokio::test]
async fn test_error_code_resolution() {
    let server = MockServer::start().await;
    mount_token(&server, 3600).await;
    mount_mower_list(&server, &[("id-1", "One"), ("id-2", "Two")]).await;

    let mut fatal = mower_detail("FATAL_ERROR", "NOT_APPLICABLE", 0, 3);
    fatal["data"]["attributes"]["mower"]["errorCode"] = json!(10);
    mount_mower_detail(&server, "id-1", fatal).await;

    let mut unknown = mower_detail("ERROR", "NOT_APPLICABLE", 0, 3);
    unknown["data"]["attributes"]["mower"]["errorCode"] = json!(9999);
    mount_mower_detail(&server, "id-2", unknown).await;

    let registry = registry(&server);
    registry.refresh_list().await.unwrap();
    registry.refresh_status().await.unwrap();

    let one = registry.find_by_name("One").unwrap();
    assert_eq!(one.error_code, Some(10));
    assert_eq!(one.error_state.as_deref(), Some("Upside down"));

    let two = registry.find_by_name("Two").unwrap();
    assert_eq!(two.error_state.as_deref(), Some("Unknown error code 9999"));
}

#[tokio::test]
async fn test_fetch_messages() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    let messages = json!({ "data": { "attributes": { "messages": [{ "time": 1700000000, "code": 10, "severity": "ERROR" }] } } });
    Mock::given(method("GET"))
        .and(path("/mowers/id-1/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(messages.clone()))
        .expect(1)
        .mount(&server)
        .await;

    let registry = registry(&server);
    assert!(registry.fetch_messages("Front").await.is_err());

    registry.refresh_list().await.unwrap();
    assert_eq!(registry.fetch_messages("Front").await.unwrap(), messages);
}
