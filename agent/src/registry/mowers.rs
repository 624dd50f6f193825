//! In-memory registry of the remote mowers

use std::sync::{Arc, RwLock};

use chrono::{DateTime, Utc};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::authn::token_mngr::TokenManagerExt;
use crate::errors::AgentError;
use crate::http::client::HttpClient;
use crate::models::api::MowerAttributes;
use crate::models::error_codes;
use crate::models::mower::{Location, Mower, MowerActivity};

#[derive(Debug, Default)]
struct RegistryState {
    mowers: Vec<Mower>,
    last_list_refresh: Option<DateTime<Utc>>,
}

/// Registry of the mowers linked to the account.
///
/// The list is replaced wholesale by [`MowerRegistry::refresh_list`]; detailed
/// fields are filled in by [`MowerRegistry::refresh_status`]. Readers get
/// cloned snapshots.
pub struct MowerRegistry {
    http_client: Arc<HttpClient>,
    token_mngr: Arc<dyn TokenManagerExt>,
    state: RwLock<RegistryState>,
}

impl MowerRegistry {
    pub fn new(http_client: Arc<HttpClient>, token_mngr: Arc<dyn TokenManagerExt>) -> Self {
        Self {
            http_client,
            token_mngr,
            state: RwLock::new(RegistryState::default()),
        }
    }

    /// Fetch the mower list, replacing the current collection.
    ///
    /// Returns the number of mowers found.
    pub async fn refresh_list(&self) -> Result<usize, AgentError> {
        self.token_mngr.acquire_or_renew().await?;

        let document = self.http_client.get_mowers().await?;
        let mowers: Vec<Mower> = document
            .data
            .into_iter()
            .map(|item| Mower::new(item.id, item.attributes.system.name))
            .collect();

        let count = mowers.len();
        let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
        state.mowers = mowers;
        state.last_list_refresh = Some(Utc::now());

        info!("Mower list refreshed: {} mower(s)", count);
        Ok(count)
    }

    /// Fetch the detailed status of every known mower.
    ///
    /// Stops at the first failing mower; mowers fetched before it keep their
    /// new status.
    pub async fn refresh_status(&self) -> Result<(), AgentError> {
        self.token_mngr.acquire_or_renew().await?;

        let targets: Vec<(String, String)> = {
            let state = self.state.read().unwrap_or_else(|e| e.into_inner());
            state
                .mowers
                .iter()
                .map(|m| (m.id.clone(), m.name.clone()))
                .collect()
        };

        for (id, name) in targets {
            let document = match self.http_client.get_mower(&id, &name).await {
                Ok(document) => document,
                Err(e) => {
                    warn!(mower = %name, "Status refresh aborted: {}", e);
                    return Err(e);
                }
            };

            let mut state = self.state.write().unwrap_or_else(|e| e.into_inner());
            if let Some(mower) = state.mowers.iter_mut().find(|m| m.name == name) {
                apply_status(mower, document.data.attributes);
                debug!(mower = %name, state = %mower.state, activity = %mower.activity, "Status updated");
            }
        }

        Ok(())
    }

    /// Fetch the message log of a mower
    pub async fn fetch_messages(&self, mower_name: &str) -> Result<Value, AgentError> {
        let mower = self
            .find_by_name(mower_name)
            .ok_or_else(|| AgentError::UnknownDevice(mower_name.to_string()))?;

        self.token_mngr.acquire_or_renew().await?;
        self.http_client.get_mower_messages(&mower.id, &mower.name).await
    }

    pub fn find_by_name(&self, mower_name: &str) -> Option<Mower> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.mowers.iter().find(|m| m.name == mower_name).cloned()
    }

    /// Cached OFF state of a mower, `None` when the name is unknown
    pub fn is_off(&self, mower_name: &str) -> Option<bool> {
        self.find_by_name(mower_name).map(|m| m.is_off())
    }

    /// Whether every mower is OFF; true for an empty registry
    pub fn all_off(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.mowers.iter().all(Mower::is_off)
    }

    pub fn any_going_home(&self) -> bool {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state
            .mowers
            .iter()
            .any(|m| m.activity == MowerActivity::GoingHome)
    }

    pub fn snapshot(&self) -> Vec<Mower> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).mowers.clone()
    }

    pub fn names(&self) -> Vec<String> {
        let state = self.state.read().unwrap_or_else(|e| e.into_inner());
        state.mowers.iter().map(|m| m.name.clone()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.state.read().unwrap_or_else(|e| e.into_inner()).mowers.is_empty()
    }

    pub fn last_list_refresh(&self) -> Option<DateTime<Utc>> {
        self.state.read().unwrap_or_else(|e| e.into_inner()).last_list_refresh
    }
}

fn apply_status(mower: &mut Mower, attributes: MowerAttributes) {
    mower.battery_pct = Some(attributes.battery.battery_percent);
    mower.activity = attributes.mower.activity;
    mower.state = attributes.mower.state;
    mower.location = attributes.positions.first().map(|p| Location {
        latitude: p.latitude,
        longitude: p.longitude,
    });
    mower.cutting_height = attributes.settings.and_then(|s| s.cutting_height);

    if mower.state.is_error() {
        let code = attributes.mower.error_code.unwrap_or_default();
        mower.error_code = Some(code);
        mower.error_state = Some(error_codes::describe_or_unknown(code));
    } else {
        mower.error_code = None;
        mower.error_state = None;
    }
}
