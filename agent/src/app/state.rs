//! Application context shared by the workers and the command surface

use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Arc;

use tracing::info;

use crate::app::options::AppOptions;
use crate::authn::token_mngr::{Credentials, TokenManager, TokenManagerExt};
use crate::commands::dispatcher::CommandDispatcher;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::execution::ExecutionTracker;
use crate::registry::mowers::MowerRegistry;
use crate::scheduler::adaptive::AdaptiveScheduler;
use crate::sink::publisher::publish_mower;
use crate::sink::{DeviceSink, UnreachableTarget};
use crate::storage::mower_config::{ConfigSource, CuttingRange, Zone};
use crate::workers::task_queue::{task_queue, TaskQueue, TaskReceiver};

/// Everything the agent works with, built once at start-up
pub struct AppContext {
    /// HTTP client for the mower cloud
    pub http_client: Arc<HttpClient>,

    /// Token manager for authentication
    pub token_mngr: Arc<TokenManager>,

    /// Mirror of the remote mowers
    pub registry: Arc<MowerRegistry>,

    pub dispatcher: CommandDispatcher,

    /// Per-mower command bookkeeping
    pub executions: ExecutionTracker,

    /// Polling interval selection
    pub scheduler: AdaptiveScheduler,

    /// Host-side widgets
    pub sink: Arc<dyn DeviceSink>,

    pub zones: Vec<Zone>,

    pub cutting_range: CuttingRange,

    /// Producer side of the task queue
    pub tasks: TaskQueue,

    system_failures: AtomicU32,
    stop_requested: AtomicBool,
}

impl AppContext {
    /// Build the context and the receiver the task worker consumes
    pub fn init(
        options: &AppOptions,
        credentials: Credentials,
        sink: Arc<dyn DeviceSink>,
        config: &dyn ConfigSource,
    ) -> Result<(Self, TaskReceiver), AgentError> {
        info!("Initializing application context...");

        let http_client = Arc::new(HttpClient::new(&options.api.base_url, options.http.clone())?);

        let token_mngr = Arc::new(TokenManager::new(
            credentials,
            &options.api.token_url,
            http_client.clone(),
        ));
        let token_ext: Arc<dyn TokenManagerExt> = token_mngr.clone();

        let registry = Arc::new(MowerRegistry::new(http_client.clone(), token_ext.clone()));
        let dispatcher = CommandDispatcher::new(http_client.clone(), token_ext, registry.clone());

        let (tasks, receiver) = task_queue();

        let context = Self {
            http_client,
            token_mngr,
            registry,
            dispatcher,
            executions: ExecutionTracker::new(),
            scheduler: AdaptiveScheduler::new(options.scheduler.clone()),
            sink,
            zones: config.load_zones(),
            cutting_range: config.load_cutting_range(),
            tasks,
            system_failures: AtomicU32::new(0),
            stop_requested: AtomicBool::new(false),
        };

        Ok((context, receiver))
    }

    /// Consecutive failed login/list/status tasks
    pub fn system_failures(&self) -> u32 {
        self.system_failures.load(Ordering::SeqCst)
    }

    /// Count a failed system task and time out every widget
    pub fn record_system_failure(&self) {
        self.system_failures.fetch_add(1, Ordering::SeqCst);
        self.sink.mark_unreachable(UnreachableTarget::All);
    }

    pub fn reset_system_failures(&self) {
        self.system_failures.store(0, Ordering::SeqCst);
    }

    /// Flag the shutdown; returns `true` only for the first request
    pub fn request_stop(&self) -> bool {
        !self.stop_requested.swap(true, Ordering::SeqCst)
    }

    pub fn is_stop_requested(&self) -> bool {
        self.stop_requested.load(Ordering::SeqCst)
    }

    /// Push the current snapshot of every mower to the sink
    pub fn publish_all(&self) {
        for mower in self.registry.snapshot() {
            publish_mower(self.sink.as_ref(), &mower, &self.zones, &self.cutting_range);
        }
    }
}
