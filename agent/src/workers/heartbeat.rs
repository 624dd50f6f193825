//! Heartbeat worker: periodic scheduling ticks

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use chrono::{Local, Timelike, Utc};
use tracing::{debug, info};

use crate::app::state::AppContext;
use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::AgentError;
use crate::scheduler::adaptive::Signals;
use crate::workers::task_queue::TaskKind;

/// Heartbeat worker options
#[derive(Debug, Clone)]
pub struct Options {
    /// Wake-up period; a tick only runs once the scheduler deadline passed
    pub interval: Duration,

    /// Age after which the mower list is fetched again
    pub list_refresh_period: Duration,
}

impl Default for Options {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(10),
            list_refresh_period: Duration::from_secs(24 * 60 * 60),
        }
    }
}

/// Run the heartbeat worker
pub async fn run<S, F>(
    options: &Options,
    ctx: &AppContext,
    sleep_fn: S,
    mut shutdown_signal: Pin<Box<dyn Future<Output = ()> + Send>>,
) where
    S: Fn(Duration) -> F,
    F: Future<Output = ()>,
{
    info!("Heartbeat worker starting...");

    loop {
        tokio::select! {
            _ = &mut shutdown_signal => {
                info!("Heartbeat worker shutting down...");
                return;
            }
            _ = sleep_fn(options.interval) => {}
        }

        if ctx.is_stop_requested() {
            info!("Heartbeat worker shutting down...");
            return;
        }

        if !ctx.scheduler.is_due() {
            continue;
        }

        if let Err(e) = tick(options, ctx, Local::now().hour()).await {
            debug!("Scheduling tick aborted: {}", e);
        }
    }
}

/// One scheduling tick: queue the refresh tasks and due command retries, then
/// select the next interval
pub async fn tick(options: &Options, ctx: &AppContext, local_hour: u32) -> Result<Duration, AgentError> {
    let logged_in = ctx.token_mngr.current_token().await.is_some();
    if !logged_in {
        ctx.tasks.enqueue(TaskKind::Login)?;
    }

    if is_list_stale(ctx, options.list_refresh_period) {
        ctx.tasks.enqueue(TaskKind::RefreshDeviceList)?;
    }

    ctx.tasks.enqueue(TaskKind::RefreshStatus)?;

    let names = ctx.registry.names();
    for (mower_name, action, retry) in ctx.executions.take_due_retries(names.iter().map(String::as_str)) {
        info!(mower = %mower_name, "Retry {} to launch command {}", retry, action);
        ctx.tasks.enqueue(TaskKind::Action { mower_name, action })?;
    }

    let signals = Signals {
        system_failures: ctx.system_failures(),
        rate_limited: ctx.http_client.is_rate_limited(),
        all_off: logged_in && ctx.registry.all_off(),
        any_going_home: ctx.registry.any_going_home(),
    };
    let interval = ctx.scheduler.reschedule(&signals, local_hour);
    debug!("Next status update in {:?}", interval);

    Ok(interval)
}

fn is_list_stale(ctx: &AppContext, period: Duration) -> bool {
    match ctx.registry.last_list_refresh() {
        None => true,
        Some(refreshed_at) => {
            let age = Utc::now().signed_duration_since(refreshed_at);
            age.to_std().map(|age| age > period).unwrap_or(false)
        }
    }
}
