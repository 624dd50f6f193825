//! Scheduling tick tests

use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mower_agent::app::state::AppContext;
use mower_agent::authn::token_mngr::TokenManagerExt;
use mower_agent::models::action::MowerAction;
use mower_agent::models::execution::ExecutionStatus;
use mower_agent::scheduler::adaptive::Regime;
use mower_agent::workers::heartbeat::{tick, Options};
use mower_agent::workers::task_queue::{TaskKind, TaskReceiver};

use crate::common::*;

const NOON: u32 = 12;

/// Take every queued task without handling it
async fn drain(ctx: &AppContext, receiver: &mut TaskReceiver) -> Vec<TaskKind> {
    let mut kinds = Vec::new();
    while ctx.tasks.pending() > 0 {
        let task = receiver.next().await.unwrap();
        receiver.task_done();
        kinds.push(task.kind);
    }
    kinds
}

#[tokio::test]
async fn test_first_tick_logs_in_and_refreshes_everything() {
    let server = MockServer::start().await;
    let (ctx, mut receiver, _sink) = app_context(&server);

    let interval = tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(interval, Duration::from_secs(60));
    assert_eq!(ctx.scheduler.regime(), Regime::Normal);

    assert_eq!(
        drain(&ctx, &mut receiver).await,
        vec![TaskKind::Login, TaskKind::RefreshDeviceList, TaskKind::RefreshStatus]
    );
}

#[tokio::test]
async fn test_steady_state_tick_only_refreshes_status() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    let (ctx, mut receiver, _sink) = app_context(&server);
    ctx.token_mngr.acquire_or_renew().await.unwrap();
    ctx.registry.refresh_list().await.unwrap();
    ctx.registry.refresh_status().await.unwrap();

    tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(drain(&ctx, &mut receiver).await, vec![TaskKind::RefreshStatus]);

    // A stale list is fetched again
    let options = Options {
        list_refresh_period: Duration::ZERO,
        ..Default::default()
    };
    tokio::time::sleep(Duration::from_millis(5)).await;
    tick(&options, &ctx, NOON).await.unwrap();
    assert_eq!(
        drain(&ctx, &mut receiver).await,
        vec![TaskKind::RefreshDeviceList, TaskKind::RefreshStatus]
    );
}

#[tokio::test]
async fn test_failed_commands_are_retried_twice() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    let (ctx, mut receiver, _sink) = app_context(&server);
    ctx.token_mngr.acquire_or_renew().await.unwrap();
    ctx.registry.refresh_list().await.unwrap();

    ctx.executions.begin("Front", MowerAction::Pause);
    let retry = TaskKind::Action {
        mower_name: "Front".to_string(),
        action: MowerAction::Pause,
    };

    for expected_retries in 1..=2 {
        ctx.executions.mark_failed("Front");
        tick(&Options::default(), &ctx, NOON).await.unwrap();
        assert_eq!(
            drain(&ctx, &mut receiver).await,
            vec![TaskKind::RefreshStatus, retry.clone()]
        );

        let state = ctx.executions.get("Front").unwrap();
        assert_eq!(state.status, ExecutionStatus::Initiated);
        assert_eq!(state.retry_count, expected_retries);
    }

    ctx.executions.mark_failed("Front");
    tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(drain(&ctx, &mut receiver).await, vec![TaskKind::RefreshStatus]);
    assert_eq!(ctx.executions.get("Front").unwrap().status, ExecutionStatus::Error);
}

#[tokio::test]
async fn test_all_off_slows_polling() {
    let server = MockServer::start().await;
    mount_token(&server, 3600).await;
    mount_mower_list(&server, &[("id-2", "Back")]).await;
    mount_mower_detail(&server, "id-2", mower_detail("OFF", "NOT_APPLICABLE", 100, 2)).await;
    let (ctx, mut receiver, _sink) = app_context(&server);
    ctx.token_mngr.acquire_or_renew().await.unwrap();
    ctx.registry.refresh_list().await.unwrap();
    ctx.registry.refresh_status().await.unwrap();

    let interval = tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(ctx.scheduler.regime(), Regime::AllOff);
    assert_eq!(interval, Duration::from_secs(60 * 60));
    drain(&ctx, &mut receiver).await;
}

#[tokio::test]
async fn test_night_and_system_error_regimes() {
    let server = MockServer::start().await;
    let (ctx, mut receiver, _sink) = app_context(&server);

    let interval = tick(&Options::default(), &ctx, 23).await.unwrap();
    assert_eq!(ctx.scheduler.regime(), Regime::Night);
    assert_eq!(interval, Duration::from_secs(180 * 60));

    for _ in 0..6 {
        ctx.record_system_failure();
    }
    let interval = tick(&Options::default(), &ctx, 23).await.unwrap();
    assert_eq!(ctx.scheduler.regime(), Regime::SystemError);
    assert_eq!(interval, Duration::from_secs(6 * 60));

    ctx.reset_system_failures();
    tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(ctx.scheduler.regime(), Regime::Normal);
    drain(&ctx, &mut receiver).await;
}

#[tokio::test]
async fn test_throttled_login_slows_polling() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(TOKEN_PATH))
        .respond_with(ResponseTemplate::new(429))
        .mount(&server)
        .await;
    let (ctx, mut receiver, _sink) = app_context(&server);

    assert!(!ctx.token_mngr.login().await);
    assert!(ctx.http_client.is_rate_limited());

    let interval = tick(&Options::default(), &ctx, NOON).await.unwrap();
    assert_eq!(ctx.scheduler.regime(), Regime::RateLimited);
    assert_eq!(interval, Duration::from_secs(60 * 60));
    assert_eq!(
        drain(&ctx, &mut receiver).await,
        vec![TaskKind::Login, TaskKind::RefreshDeviceList, TaskKind::RefreshStatus]
    );
}
