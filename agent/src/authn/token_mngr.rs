//! Token manager for the client-credentials grant

use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use tokio::sync::RwLock;
use tracing::{debug, error, info};

use crate::authn::access_token::AccessToken;
use crate::errors::AgentError;
use crate::http::client::{HttpClient, HttpRequest};
use crate::models::api::TokenResponse;

/// Application credentials, supplied once
#[derive(Debug)]
pub struct Credentials {
    pub client_id: String,
    pub client_secret: SecretString,
}

impl Credentials {
    pub fn new(client_id: impl Into<String>, client_secret: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_secret: SecretString::from(client_secret.into()),
        }
    }
}

/// Token manager trait for testability
#[async_trait]
pub trait TokenManagerExt: Send + Sync {
    /// Renew the token when none is held or it reached its expiry instant
    async fn acquire_or_renew(&self) -> Result<(), AgentError>;

    /// Get the current token, if any
    async fn current_token(&self) -> Option<AccessToken>;
}

/// Token manager implementation
pub struct TokenManager {
    credentials: Credentials,
    token_url: String,
    http_client: Arc<HttpClient>,
    cached_token: RwLock<Option<AccessToken>>,
}

impl TokenManager {
    /// Create a new token manager; no call is made until the first renewal
    pub fn new(credentials: Credentials, token_url: &str, http_client: Arc<HttpClient>) -> Self {
        Self {
            credentials,
            token_url: token_url.to_string(),
            http_client,
            cached_token: RwLock::new(None),
        }
    }

    /// Log in, reporting success as a plain boolean
    pub async fn login(&self) -> bool {
        match self.acquire_or_renew().await {
            Ok(()) => true,
            Err(e) => {
                error!("Unable to get credentials from the mower cloud: {}", e);
                false
            }
        }
    }

    async fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        let cached = self.cached_token.read().await;
        cached.as_ref().is_some_and(|token| token.is_valid_at(now))
    }

    /// Call the authentication endpoint and install the new token
    async fn renew(&self) -> Result<AccessToken, AgentError> {
        info!("Requesting access token...");

        let fields = vec![
            ("grant_type", "client_credentials".to_string()),
            ("client_id", self.credentials.client_id.clone()),
            (
                "client_secret",
                self.credentials.client_secret.expose_secret().to_string(),
            ),
            ("token_endpoint", self.token_url.clone()),
        ];

        let response: TokenResponse = self
            .http_client
            .call_json(HttpRequest::post_form(&self.token_url, fields))
            .await
            .map_err(|e| match e {
                AgentError::ClientError { status, .. } => AgentError::AuthError(format!(
                    "(Http error: {}) Bad or unauthorized authentication request (url: {})",
                    status, self.token_url
                )),
                other => other,
            })?;

        let token = AccessToken::from_response(response, Utc::now());
        let headers = token.auth_headers(&self.credentials.client_id)?;

        // Replace wholesale so readers never see a half-installed token
        let mut cached = self.cached_token.write().await;
        self.http_client.set_auth_headers(headers);
        *cached = Some(token.clone());

        info!("Access token acquired, renewal due at: {}", token.expires_at());
        Ok(token)
    }
}

#[async_trait]
impl TokenManagerExt for TokenManager {
    async fn acquire_or_renew(&self) -> Result<(), AgentError> {
        if self.is_valid_at(Utc::now()).await {
            debug!("Access token still valid");
            return Ok(());
        }

        self.renew().await.map(|_| ())
    }

    async fn current_token(&self) -> Option<AccessToken> {
        self.cached_token.read().await.clone()
    }
}
