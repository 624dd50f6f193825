//! Error types for the mower agent

use thiserror::Error;

/// Main error type for the mower agent
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Bad or unauthorized credentials
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Timeout or connection failure, surfaced once the retry ceiling is hit
    #[error("Network error: {0}")]
    TransientNetwork(String),

    /// HTTP 429 from the remote service
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// 4xx other than 429, carrying the remote-provided detail
    #[error("Client error ({status}): {message}")]
    ClientError { status: u16, message: String },

    /// 5xx, surfaced once the retry ceiling is hit
    #[error("Server error ({status}): {message}")]
    ServerError { status: u16, message: String },

    #[error("Unknown device: {0}")]
    UnknownDevice(String),

    #[error("Unsafe command: {0}")]
    UnsafeCommand(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Validation error: {0}")]
    ValidationError(String),

    #[error("Shutdown error: {0}")]
    ShutdownError(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl AgentError {
    /// Whether a remote call failing with this error may be attempted again
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            AgentError::TransientNetwork(_) | AgentError::ServerError { .. }
        ) || matches!(self, AgentError::ClientError { status: 403, .. })
    }

    /// Description without the variant prefix, as reported to callers
    pub fn description(&self) -> String {
        match self {
            AgentError::AuthError(message)
            | AgentError::TransientNetwork(message)
            | AgentError::RateLimited(message)
            | AgentError::ClientError { message, .. }
            | AgentError::ServerError { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    /// Whether this error was raised locally, before any remote call
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            AgentError::UnknownDevice(_)
                | AgentError::UnsafeCommand(_)
                | AgentError::ValidationError(_)
        )
    }
}
