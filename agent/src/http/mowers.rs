//! Mower API client

use serde_json::Value;

use crate::errors::AgentError;
use crate::http::client::{HttpClient, HttpRequest};
use crate::models::action::MowerAction;
use crate::models::api::{MowerDocument, MowerListDocument};

impl HttpClient {
    fn mowers_url(&self) -> String {
        format!("{}/mowers", self.base_url())
    }

    /// List the mowers linked to the account
    pub async fn get_mowers(&self) -> Result<MowerListDocument, AgentError> {
        self.call_json(HttpRequest::get(self.mowers_url())).await
    }

    /// Get the detailed status of one mower
    pub async fn get_mower(&self, mower_id: &str, mower_name: &str) -> Result<MowerDocument, AgentError> {
        let url = format!("{}/{}", self.mowers_url(), mower_id);
        self.call_json(HttpRequest::get(url).for_mower(mower_name)).await
    }

    /// Send an action or a settings change to one mower
    pub async fn post_mower_action(
        &self,
        mower_id: &str,
        mower_name: &str,
        action: &MowerAction,
    ) -> Result<(), AgentError> {
        let url = format!(
            "{}/{}/{}",
            self.mowers_url(),
            mower_id,
            action.endpoint().path_segment()
        );
        let _: Value = self
            .call(HttpRequest::post_json(url, action.payload()).for_mower(mower_name))
            .await?;
        Ok(())
    }

    /// Get the message log of one mower, passed through untouched
    pub async fn get_mower_messages(&self, mower_id: &str, mower_name: &str) -> Result<Value, AgentError> {
        let url = format!("{}/{}/messages", self.mowers_url(), mower_id);
        self.call(HttpRequest::get(url).for_mower(mower_name)).await
    }
}
