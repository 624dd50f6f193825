//! Application configuration options

use std::time::Duration;

use crate::http::client::HttpOptions;
use crate::scheduler::adaptive::SchedulerOptions;
use crate::storage::settings::{ApiSettings, Settings};
use crate::workers::heartbeat;

/// Main application options
#[derive(Debug, Clone)]
pub struct AppOptions {
    /// Lifecycle configuration
    pub lifecycle: LifecycleOptions,

    /// Remote API endpoints
    pub api: ApiOptions,

    /// HTTP client options
    pub http: HttpOptions,

    /// Polling interval selection
    pub scheduler: SchedulerOptions,

    /// Heartbeat worker options
    pub heartbeat: heartbeat::Options,
}

impl Default for AppOptions {
    fn default() -> Self {
        Self {
            lifecycle: LifecycleOptions::default(),
            api: ApiOptions::default(),
            http: HttpOptions::default(),
            scheduler: SchedulerOptions::default(),
            heartbeat: heartbeat::Options::default(),
        }
    }
}

impl AppOptions {
    /// Options derived from the settings file
    pub fn from_settings(settings: &Settings) -> Self {
        Self {
            api: ApiOptions {
                token_url: settings.api.token_url.clone(),
                base_url: settings.api.base_url.clone(),
            },
            scheduler: SchedulerOptions::with_interval_minutes(settings.update_interval_minutes),
            heartbeat: heartbeat::Options {
                interval: Duration::from_secs(settings.heartbeat_secs),
                ..Default::default()
            },
            ..Default::default()
        }
    }
}

/// Lifecycle options for the agent
#[derive(Debug, Clone)]
pub struct LifecycleOptions {
    /// Maximum wait for the task worker to drain on shutdown
    pub join_timeout: Duration,
}

impl Default for LifecycleOptions {
    fn default() -> Self {
        Self {
            join_timeout: Duration::from_secs(10),
        }
    }
}

/// Remote API endpoints
#[derive(Debug, Clone)]
pub struct ApiOptions {
    pub token_url: String,
    pub base_url: String,
}

impl Default for ApiOptions {
    fn default() -> Self {
        let api = ApiSettings::default();
        Self {
            token_url: api.token_url,
            base_url: api.base_url,
        }
    }
}
