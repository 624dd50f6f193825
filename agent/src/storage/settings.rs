//! Settings file management

use serde::{Deserialize, Deserializer, Serialize};
use url::Url;

use crate::errors::AgentError;
use crate::logs::LogLevel;
use crate::models::mower::Location;

/// Agent settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Settings {
    /// Application key of the developer portal
    #[serde(default)]
    pub client_id: String,

    /// Application secret of the developer portal
    #[serde(default, skip_serializing)]
    pub client_secret: String,

    /// Polling interval in minutes, fractions allowed
    #[serde(
        default = "default_update_interval",
        deserialize_with = "deserialize_lenient_minutes"
    )]
    pub update_interval_minutes: f64,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,

    /// Emit logs as JSON
    #[serde(default)]
    pub log_json: bool,

    /// Directory of the daily log files; stdout only when absent
    #[serde(default)]
    pub log_dir: Option<String>,

    /// Remote API endpoints
    #[serde(default)]
    pub api: ApiSettings,

    /// Zones and cutting height configuration file
    #[serde(default = "default_config_file")]
    pub config_file: String,

    /// Home location, used as the default zone
    #[serde(default)]
    pub home: Option<HomeSettings>,

    /// Heartbeat period in seconds
    #[serde(default = "default_heartbeat_secs")]
    pub heartbeat_secs: u64,
}

fn default_update_interval() -> f64 {
    1.0
}

fn default_config_file() -> String {
    "/etc/mower-agent/mowers.json".to_string()
}

fn default_heartbeat_secs() -> u64 {
    10
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            client_id: String::new(),
            client_secret: String::new(),
            update_interval_minutes: default_update_interval(),
            log_level: LogLevel::Info,
            log_json: false,
            log_dir: None,
            api: ApiSettings::default(),
            config_file: default_config_file(),
            home: None,
            heartbeat_secs: default_heartbeat_secs(),
        }
    }
}

impl Settings {
    /// Check the values the agent cannot start without
    pub fn validate(&self) -> Result<(), AgentError> {
        if self.client_id.trim().is_empty() || self.client_secret.trim().is_empty() {
            return Err(AgentError::ConfigError(
                "client_id and client_secret are required".to_string(),
            ));
        }
        if !(self.update_interval_minutes.is_finite() && self.update_interval_minutes > 0.0) {
            return Err(AgentError::ConfigError(format!(
                "Invalid update interval: {}",
                self.update_interval_minutes
            )));
        }
        if self.heartbeat_secs == 0 {
            return Err(AgentError::ConfigError("heartbeat_secs must be positive".to_string()));
        }
        self.api.validate()
    }
}

/// Remote API settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiSettings {
    /// Authentication endpoint
    #[serde(default = "default_token_url")]
    pub token_url: String,

    /// Base URL of the mower API
    #[serde(default = "default_base_url")]
    pub base_url: String,
}

fn default_token_url() -> String {
    "https://api.authentication.husqvarnagroup.dev/v1/oauth2/token".to_string()
}

fn default_base_url() -> String {
    "https://api.amc.husqvarna.dev/v1".to_string()
}

impl Default for ApiSettings {
    fn default() -> Self {
        Self {
            token_url: default_token_url(),
            base_url: default_base_url(),
        }
    }
}

impl ApiSettings {
    fn validate(&self) -> Result<(), AgentError> {
        for (key, value) in [("token_url", &self.token_url), ("base_url", &self.base_url)] {
            Url::parse(value)
                .map_err(|e| AgentError::ConfigError(format!("Invalid {} '{}': {}", key, value, e)))?;
        }
        Ok(())
    }
}

/// Home location settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HomeSettings {
    #[serde(default = "default_home_name")]
    pub name: String,
    pub latitude: f64,
    pub longitude: f64,
}

fn default_home_name() -> String {
    "Home".to_string()
}

impl HomeSettings {
    pub fn location(&self) -> Location {
        Location {
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Parse minutes written as a number or as a string with either decimal
/// separator (`"1.5"`, `"1,5"`)
pub fn parse_minutes(value: &str) -> Result<f64, AgentError> {
    value
        .trim()
        .replace(',', ".")
        .parse::<f64>()
        .map_err(|e| AgentError::ConfigError(format!("Invalid interval '{}': {}", value, e)))
}

fn deserialize_lenient_minutes<'de, D>(deserializer: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Minutes {
        Number(f64),
        Text(String),
    }

    match Minutes::deserialize(deserializer)? {
        Minutes::Number(minutes) => Ok(minutes),
        Minutes::Text(text) => parse_minutes(&text).map_err(serde::de::Error::custom),
    }
}
