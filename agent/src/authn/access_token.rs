//! OAuth2 access token

use chrono::{DateTime, Duration, Utc};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, ACCEPT, AUTHORIZATION};

use crate::errors::AgentError;
use crate::http::client::JSON_API_CONTENT_TYPE;
use crate::models::api::TokenResponse;

/// Renew this long before the remote expiry
pub const EXPIRY_MARGIN_SECS: i64 = 600;

const API_KEY_HEADER: &str = "x-api-key";
const PROVIDER_HEADER: &str = "authorization-provider";

/// A bearer token obtained with the client-credentials grant
#[derive(Debug, Clone)]
pub struct AccessToken {
    pub token_type: String,
    pub access_token: String,
    pub provider: String,
    pub expires_in_seconds: i64,
    pub issued_at: DateTime<Utc>,
}

impl AccessToken {
    /// Build a token from the authentication endpoint response
    pub fn from_response(response: TokenResponse, issued_at: DateTime<Utc>) -> Self {
        Self {
            token_type: response.token_type,
            access_token: response.access_token,
            provider: response.provider,
            expires_in_seconds: response.expires_in,
            issued_at,
        }
    }

    /// Instant from which the token must be renewed
    pub fn expires_at(&self) -> DateTime<Utc> {
        self.issued_at + Duration::seconds(self.expires_in_seconds - EXPIRY_MARGIN_SECS)
    }

    /// Check if the token may still be used at `now`
    pub fn is_valid_at(&self, now: DateTime<Utc>) -> bool {
        now < self.expires_at()
    }

    /// Get time until renewal is needed, in seconds
    pub fn time_until_expiry(&self) -> i64 {
        (self.expires_at() - Utc::now()).num_seconds()
    }

    /// Headers attached to every authenticated call
    pub fn auth_headers(&self, client_id: &str) -> Result<HeaderMap, AgentError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            AUTHORIZATION,
            header_value(&format!("{} {}", self.token_type, self.access_token))?,
        );
        headers.insert(HeaderName::from_static(PROVIDER_HEADER), header_value(&self.provider)?);
        headers.insert(HeaderName::from_static(API_KEY_HEADER), header_value(client_id)?);
        headers.insert(ACCEPT, HeaderValue::from_static(JSON_API_CONTENT_TYPE));
        Ok(headers)
    }
}

fn header_value(value: &str) -> Result<HeaderValue, AgentError> {
    HeaderValue::from_str(value)
        .map_err(|e| AgentError::AuthError(format!("Invalid header value in token: {}", e)))
}
