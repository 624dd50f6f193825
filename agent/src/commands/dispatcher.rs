//! Command dispatcher

use std::sync::Arc;

use tracing::info;

use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::action::MowerAction;
use crate::registry::mowers::MowerRegistry;

/// Sends actions to mowers known by the registry
pub struct CommandDispatcher {
    http_client: Arc<HttpClient>,
    token_mngr: Arc<dyn TokenManagerExt>,
    registry: Arc<MowerRegistry>,
}

impl CommandDispatcher {
    pub fn new(
        http_client: Arc<HttpClient>,
        token_mngr: Arc<dyn TokenManagerExt>,
        registry: Arc<MowerRegistry>,
    ) -> Self {
        Self {
            http_client,
            token_mngr,
            registry,
        }
    }

    /// Send an action to a mower.
    ///
    /// Unknown names, mowers whose cached state is OFF and invalid parameters
    /// are refused before any remote call.
    pub async fn send_action(&self, mower_name: &str, action: &MowerAction) -> Result<(), AgentError> {
        action.validate()?;

        let mower = self
            .registry
            .find_by_name(mower_name)
            .ok_or_else(|| AgentError::UnknownDevice(mower_name.to_string()))?;

        if mower.is_off() {
            return Err(AgentError::UnsafeCommand(format!(
                "mower {} is switched off and cannot execute {}",
                mower_name, action
            )));
        }

        self.token_mngr.acquire_or_renew().await?;
        self.http_client
            .post_mower_action(&mower.id, &mower.name, action)
            .await?;

        info!(mower = %mower_name, "Action {} accepted", action);
        Ok(())
    }
}
