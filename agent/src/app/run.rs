//! Main application run loop

use std::future::Future;
use std::sync::Arc;

use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::app::options::{AppOptions, LifecycleOptions};
use crate::app::state::AppContext;
use crate::authn::token_mngr::Credentials;
use crate::errors::AgentError;
use crate::sink::DeviceSink;
use crate::storage::mower_config::ConfigSource;
use crate::workers::task_queue::{TaskKind, TaskReceiver};
use crate::workers::{heartbeat, tasks};

/// Run the mower agent until the shutdown signal resolves
pub async fn run(
    options: AppOptions,
    credentials: Credentials,
    sink: Arc<dyn DeviceSink>,
    config: &dyn ConfigSource,
    shutdown_signal: impl Future<Output = ()> + Send + 'static,
) -> Result<(), AgentError> {
    let mut agent = Agent::start(options, credentials, sink, config)?;

    shutdown_signal.await;
    info!("Shutdown signal received, shutting down...");

    agent.shutdown().await
}

/// A started agent: the task worker and the heartbeat worker
pub struct Agent {
    ctx: Arc<AppContext>,
    shutdown_manager: ShutdownManager,
}

impl Agent {
    /// Build the context, start both workers and queue the initial
    /// login/list/status tasks
    pub fn start(
        options: AppOptions,
        credentials: Credentials,
        sink: Arc<dyn DeviceSink>,
        config: &dyn ConfigSource,
    ) -> Result<Self, AgentError> {
        info!("Initializing mower agent...");

        let (shutdown_tx, _shutdown_rx) = broadcast::channel(1);
        let mut shutdown_manager = ShutdownManager::new(shutdown_tx.clone(), options.lifecycle.clone());

        let (ctx, receiver) = AppContext::init(&options, credentials, sink, config)?;
        let ctx = Arc::new(ctx);

        init_task_worker(receiver, ctx.clone(), &mut shutdown_manager)?;

        ctx.tasks.enqueue(TaskKind::Login)?;
        ctx.tasks.enqueue(TaskKind::RefreshDeviceList)?;
        ctx.tasks.enqueue(TaskKind::RefreshStatus)?;

        init_heartbeat_worker(
            options.heartbeat.clone(),
            ctx.clone(),
            &mut shutdown_manager,
            shutdown_tx.subscribe(),
        )?;

        Ok(Self { ctx, shutdown_manager })
    }

    pub fn context(&self) -> &Arc<AppContext> {
        &self.ctx
    }

    /// Stop the workers. Calling it again is a no-op.
    pub async fn shutdown(&mut self) -> Result<(), AgentError> {
        if !self.ctx.request_stop() {
            debug!("Shutdown already requested");
            return Ok(());
        }
        self.shutdown_manager.shutdown(&self.ctx).await
    }
}

// =============================== INITIALIZATION ================================== //

fn init_task_worker(
    receiver: TaskReceiver,
    ctx: Arc<AppContext>,
    shutdown_manager: &mut ShutdownManager,
) -> Result<(), AgentError> {
    info!("Initializing task worker...");

    let handle = tokio::spawn(tasks::run(receiver, ctx));
    shutdown_manager.with_task_worker_handle(handle)
}

fn init_heartbeat_worker(
    options: heartbeat::Options,
    ctx: Arc<AppContext>,
    shutdown_manager: &mut ShutdownManager,
    mut shutdown_rx: broadcast::Receiver<()>,
) -> Result<(), AgentError> {
    info!("Initializing heartbeat worker...");

    let handle = tokio::spawn(async move {
        heartbeat::run(
            &options,
            ctx.as_ref(),
            tokio::time::sleep,
            Box::pin(async move {
                let _ = shutdown_rx.recv().await;
            }),
        )
        .await;
    });

    shutdown_manager.with_heartbeat_worker_handle(handle)
}

// ================================= SHUTDOWN ===================================== //

struct ShutdownManager {
    shutdown_tx: broadcast::Sender<()>,
    lifecycle_options: LifecycleOptions,
    task_worker_handle: Option<JoinHandle<()>>,
    heartbeat_worker_handle: Option<JoinHandle<()>>,
}

impl ShutdownManager {
    fn new(shutdown_tx: broadcast::Sender<()>, lifecycle_options: LifecycleOptions) -> Self {
        Self {
            shutdown_tx,
            lifecycle_options,
            task_worker_handle: None,
            heartbeat_worker_handle: None,
        }
    }

    fn with_task_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), AgentError> {
        if self.task_worker_handle.is_some() {
            return Err(AgentError::ShutdownError("task_worker_handle already set".to_string()));
        }
        self.task_worker_handle = Some(handle);
        Ok(())
    }

    fn with_heartbeat_worker_handle(&mut self, handle: JoinHandle<()>) -> Result<(), AgentError> {
        if self.heartbeat_worker_handle.is_some() {
            return Err(AgentError::ShutdownError("heartbeat_handle already set".to_string()));
        }
        self.heartbeat_worker_handle = Some(handle);
        Ok(())
    }

    async fn shutdown(&mut self, ctx: &AppContext) -> Result<(), AgentError> {
        info!("Shutting down mower agent...");
        let _ = self.shutdown_tx.send(());

        // 1. Heartbeat worker, so nothing else gets queued
        if let Some(handle) = self.heartbeat_worker_handle.take() {
            handle.await.map_err(|e| AgentError::ShutdownError(e.to_string()))?;
        }

        // 2. Task worker, once the tasks queued before the sentinel are handled
        if let Some(handle) = self.task_worker_handle.take() {
            if let Err(e) = ctx.tasks.enqueue(TaskKind::Shutdown) {
                warn!("Unable to queue the shutdown task: {}", e);
            }

            let join_timeout = self.lifecycle_options.join_timeout;
            match tokio::time::timeout(join_timeout, handle).await {
                Ok(result) => result.map_err(|e| AgentError::ShutdownError(e.to_string()))?,
                Err(_) => {
                    error!("Task worker still running after {:?}", join_timeout);
                    return Err(AgentError::ShutdownError(format!(
                        "task worker did not stop within {:?}",
                        join_timeout
                    )));
                }
            }
        }

        info!("Shutdown complete");
        Ok(())
    }
}
