//! Agent lifecycle tests

use std::sync::Arc;
use std::time::Duration;

use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use mower_agent::app::commands::{handle_command, CommandInput, CommandOutcome};
use mower_agent::app::run::Agent;
use mower_agent::errors::AgentError;
use mower_agent::models::execution::ExecutionStatus;
use mower_agent::sink::{DeviceSink, MemorySink, WidgetImage, WidgetKind, WidgetValue};
use mower_agent::workers::task_queue::TaskKind;

use crate::common::*;

fn start_agent(server: &MockServer) -> (Agent, Arc<MemorySink>) {
    let sink = Arc::new(MemorySink::new());
    let agent = Agent::start(app_options(server), credentials(), sink.clone(), &mower_config()).unwrap();
    (agent, sink)
}

async fn wait_idle(agent: &Agent) {
    tokio::time::timeout(Duration::from_secs(5), agent.context().tasks.wait_idle())
        .await
        .unwrap();
}

#[tokio::test]
async fn test_start_publishes_every_mower() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;

    let (mut agent, sink) = start_agent(&server);
    wait_idle(&agent).await;

    let mut names = sink.device_names();
    names.sort();
    assert_eq!(names, vec!["Back".to_string(), "Front".to_string()]);

    assert_eq!(
        sink.read_last_displayed_value("Front", WidgetKind::Run),
        Some(WidgetValue::switch(true))
    );
    assert_eq!(
        sink.widget("Back", WidgetKind::State).unwrap().attrs.image,
        WidgetImage::Off
    );
    assert_eq!(agent.context().system_failures(), 0);

    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_shutdown_is_idempotent() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;

    let (mut agent, _sink) = start_agent(&server);
    wait_idle(&agent).await;

    agent.shutdown().await.unwrap();
    agent.shutdown().await.unwrap();

    let ctx = agent.context();
    assert!(ctx.http_client.is_closed());
    assert!(!ctx.http_client.close());

    let err = handle_command(ctx, "Front", CommandInput::ActionSelector(20)).await.unwrap_err();
    assert!(matches!(err, AgentError::ShutdownError(_)));
}

#[tokio::test]
async fn test_failed_action_times_out_the_mower() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;
    Mock::given(method("POST"))
        .and(path("/mowers/id-1/actions"))
        .respond_with(ResponseTemplate::new(500))
        .expect(3)
        .mount(&server)
        .await;

    let (mut agent, sink) = start_agent(&server);
    wait_idle(&agent).await;

    let ctx = agent.context().clone();
    let outcome = handle_command(&ctx, "Front", CommandInput::ActionSelector(20)).await.unwrap();
    assert!(matches!(outcome, CommandOutcome::Queued(_)));
    wait_idle(&agent).await;

    let state = ctx.executions.get("Front").unwrap();
    assert_eq!(state.status, ExecutionStatus::Error);
    assert!(state.is_retry_due());
    assert!(sink.is_timed_out("Front", WidgetKind::State));
    assert!(!sink.is_timed_out("Back", WidgetKind::State));

    agent.shutdown().await.unwrap();
}

#[tokio::test]
async fn test_failed_status_refresh_times_out_every_widget() {
    let server = MockServer::start().await;
    mount_cloud(&server).await;

    let (mut agent, sink) = start_agent(&server);
    wait_idle(&agent).await;
    server.reset().await;

    // Everything answers 404 from now on
    let ctx = agent.context().clone();
    ctx.tasks.enqueue(TaskKind::RefreshStatus).unwrap();
    wait_idle(&agent).await;

    assert_eq!(ctx.system_failures(), 1);
    assert!(sink.is_timed_out("Front", WidgetKind::Battery));
    assert!(sink.is_timed_out("Back", WidgetKind::Battery));

    agent.shutdown().await.unwrap();
}
