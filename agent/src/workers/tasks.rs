//! Task worker: the only place remote calls are made

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::FutureExt;
use tracing::{debug, error, info, warn};

use crate::app::state::AppContext;
use crate::models::action::MowerAction;
use crate::sink::UnreachableTarget;
use crate::workers::task_queue::{Task, TaskKind, TaskReceiver};

/// Run the task worker until a shutdown task is received or every producer
/// is gone
pub async fn run(mut receiver: TaskReceiver, ctx: Arc<AppContext>) {
    info!("Task worker starting...");

    while let Some(task) = receiver.next().await {
        if task.kind == TaskKind::Shutdown {
            debug!(task_id = %task.id, "Shutdown task received");
            if !ctx.http_client.close() {
                debug!("HTTP session already released");
            }
            receiver.task_done();
            break;
        }

        debug!(task_id = %task.id, "Handling task {}", task.kind);
        let outcome = AssertUnwindSafe(handle_task(&ctx, &task))
            .catch_unwind()
            .await;
        if let Err(panic) = outcome {
            error!(
                task_id = %task.id,
                "Unexpected error in task handler: {}",
                panic_message(panic.as_ref())
            );
        }
        receiver.task_done();
    }

    info!("Task worker stopped");
}

/// Handle a single task
pub async fn handle_task(ctx: &AppContext, task: &Task) {
    match &task.kind {
        TaskKind::Login => handle_login(ctx).await,
        TaskKind::RefreshDeviceList => handle_refresh_list(ctx).await,
        TaskKind::RefreshStatus => handle_refresh_status(ctx).await,
        TaskKind::Action { mower_name, action } => handle_action(ctx, mower_name, action).await,
        TaskKind::Shutdown => {}
    }
}

async fn handle_login(ctx: &AppContext) {
    if ctx.token_mngr.login().await {
        ctx.reset_system_failures();
        debug!("Logged in to the mower cloud");
    } else {
        ctx.record_system_failure();
    }
}

async fn handle_refresh_list(ctx: &AppContext) {
    match ctx.registry.refresh_list().await {
        Ok(_) => {
            ctx.reset_system_failures();
            for name in ctx.registry.names() {
                ctx.executions.ensure(&name);
            }
        }
        Err(e) => {
            error!("Error getting list of mowers from the mower cloud: {}", e);
            ctx.record_system_failure();
        }
    }
}

async fn handle_refresh_status(ctx: &AppContext) {
    match ctx.registry.refresh_status().await {
        Ok(()) if ctx.registry.is_empty() => {
            error!("No mowers available from the mower cloud");
            ctx.record_system_failure();
        }
        Ok(()) => {
            ctx.reset_system_failures();
            ctx.publish_all();
        }
        Err(e) => {
            error!("Error getting detailed status of mowers: {}", e);
            ctx.record_system_failure();
        }
    }
}

async fn handle_action(ctx: &AppContext, mower_name: &str, action: &MowerAction) {
    match ctx.dispatcher.send_action(mower_name, action).await {
        Ok(()) => ctx.executions.mark_done(mower_name),
        Err(e) if e.is_local() => {
            error!(mower = %mower_name, "Command {} refused: {}", action, e);
            ctx.executions.mark_failed_permanently(mower_name);
        }
        Err(e) => {
            warn!(mower = %mower_name, "Command {} failed: {}", action, e);
            ctx.executions.mark_failed(mower_name);
            ctx.sink
                .mark_unreachable(UnreachableTarget::Device(mower_name.to_string()));
        }
    }

    ctx.scheduler.request_quick_refresh();
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}
