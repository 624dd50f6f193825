//! HTTP client implementation

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, RwLock};
use std::time::Duration;

use reqwest::header::{HeaderMap, CONTENT_TYPE};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::errors::AgentError;
use crate::utils::calc_linear_backoff;

/// Content type of every JSON:API request body
pub const JSON_API_CONTENT_TYPE: &str = "application/vnd.api+json";

/// HTTP client options
#[derive(Debug, Clone)]
pub struct HttpOptions {
    /// Per-attempt timeout
    pub timeout: Duration,

    /// Attempts per logical call, first try included
    pub max_attempts: u32,

    /// Delay enforced before every attempt to stay within the remote rate budget
    pub min_call_delay: Duration,

    /// Extra delay added per retry, multiplied by the retry number
    pub retry_backoff: Duration,
}

impl Default for HttpOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            min_call_delay: Duration::from_secs(2),
            retry_backoff: Duration::from_secs(2),
        }
    }
}

/// Body of an outgoing request
#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(Value),
    Form(Vec<(&'static str, String)>),
}

/// One logical call, possibly sent several times
#[derive(Debug, Clone)]
pub struct HttpRequest {
    pub method: Method,
    pub url: String,
    pub body: RequestBody,

    /// Mower the call is about, used to tag error descriptions
    pub mower_name: Option<String>,

    /// Whether the session authorization headers are attached
    pub authenticated: bool,
}

impl HttpRequest {
    pub fn get(url: impl Into<String>) -> Self {
        Self {
            method: Method::GET,
            url: url.into(),
            body: RequestBody::Empty,
            mower_name: None,
            authenticated: true,
        }
    }

    pub fn post_json(url: impl Into<String>, body: Value) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Json(body),
            mower_name: None,
            authenticated: true,
        }
    }

    /// Form-encoded POST sent without the session headers
    pub fn post_form(url: impl Into<String>, fields: Vec<(&'static str, String)>) -> Self {
        Self {
            method: Method::POST,
            url: url.into(),
            body: RequestBody::Form(fields),
            mower_name: None,
            authenticated: false,
        }
    }

    pub fn for_mower(mut self, mower_name: impl Into<String>) -> Self {
        self.mower_name = Some(mower_name.into());
        self
    }
}

/// HTTP client for the mower cloud API.
///
/// Every remote interaction goes through [`HttpClient::call`], which applies
/// the rate budget delay, the bounded retries and the per-status handling. The
/// description of the last failure and the rate-limit flag are kept for the
/// caller to inspect after each operation.
pub struct HttpClient {
    client: Client,
    base_url: String,
    options: HttpOptions,
    auth_headers: RwLock<HeaderMap>,
    last_error: Mutex<Option<String>>,
    rate_limited: AtomicBool,
    closed: AtomicBool,
}

impl HttpClient {
    /// Create a new HTTP client
    pub fn new(base_url: &str, options: HttpOptions) -> Result<Self, AgentError> {
        let client = Client::builder().timeout(options.timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            options,
            auth_headers: RwLock::new(HeaderMap::new()),
            last_error: Mutex::new(None),
            rate_limited: AtomicBool::new(false),
            closed: AtomicBool::new(false),
        })
    }

    /// Get the base URL
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Replace the headers attached to every authenticated request
    pub fn set_auth_headers(&self, headers: HeaderMap) {
        let mut current = self.auth_headers.write().unwrap_or_else(|e| e.into_inner());
        *current = headers;
    }

    /// Description of the last failed call, cleared by the next success
    pub fn last_error(&self) -> Option<String> {
        self.last_error.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    /// Whether the remote service answered 429 since the last success
    pub fn is_rate_limited(&self) -> bool {
        self.rate_limited.load(Ordering::SeqCst)
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Release the session. Returns `true` only for the call that released it.
    pub fn close(&self) -> bool {
        if self.closed.swap(true, Ordering::SeqCst) {
            return false;
        }
        self.set_auth_headers(HeaderMap::new());
        info!("HTTP session released");
        true
    }

    /// Perform a call and decode the JSON response body
    pub async fn call_json<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, AgentError> {
        let value = self.call(request).await?;
        Ok(serde_json::from_value(value)?)
    }

    /// Perform a call with bounded retries, returning the parsed JSON body
    /// (`Value::Null` for an empty body)
    pub async fn call(&self, request: HttpRequest) -> Result<Value, AgentError> {
        if self.is_closed() {
            return Err(AgentError::ShutdownError("HTTP session already released".into()));
        }

        let max_attempts = self.options.max_attempts.max(1);
        let mut attempt = 0;

        loop {
            attempt += 1;

            let delay = calc_linear_backoff(
                self.options.min_call_delay,
                self.options.retry_backoff,
                attempt,
            );
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            debug!(attempt, method = %request.method, url = %request.url, "sending HTTP request");

            let outcome = match self.build(&request).send().await {
                Ok(response) => self.handle_response(&request, response).await,
                Err(err) => Err(transport_error(&request.url, err)),
            };

            match outcome {
                Ok(value) => {
                    self.rate_limited.store(false, Ordering::SeqCst);
                    *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) = None;
                    return Ok(value);
                }
                Err(err) if err.is_retryable() && attempt < max_attempts => {
                    warn!(attempt, url = %request.url, "HTTP call failed, retrying: {}", err);
                }
                Err(err) => {
                    error!(attempt, url = %request.url, "HTTP call failed: {}", err);
                    *self.last_error.lock().unwrap_or_else(|e| e.into_inner()) =
                        Some(err.description());
                    return Err(err);
                }
            }
        }
    }

    fn build(&self, request: &HttpRequest) -> RequestBuilder {
        let mut builder = self.client.request(request.method.clone(), &request.url);

        if request.authenticated {
            let headers = self.auth_headers.read().unwrap_or_else(|e| e.into_inner());
            builder = builder.headers(headers.clone());
        }

        match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(body) => builder
                .header(CONTENT_TYPE, JSON_API_CONTENT_TYPE)
                .body(body.to_string()),
            RequestBody::Form(fields) => builder.form(fields),
        }
    }

    async fn handle_response(
        &self,
        request: &HttpRequest,
        response: Response,
    ) -> Result<Value, AgentError> {
        let status = response.status();
        debug!(url = %request.url, %status, "received HTTP response");

        if status.is_success() {
            let bytes = response
                .bytes()
                .await
                .map_err(|e| transport_error(&request.url, e))?;
            if bytes.iter().all(u8::is_ascii_whitespace) {
                return Ok(Value::Null);
            }
            return Ok(serde_json::from_slice(&bytes)?);
        }

        let code = status.as_u16();
        let body = response.text().await.unwrap_or_default();
        let message = describe_http_error(code, &body, &request.url, request.mower_name.as_deref());

        match code {
            429 => {
                self.rate_limited.store(true, Ordering::SeqCst);
                Err(AgentError::RateLimited(message))
            }
            400..=499 => Err(AgentError::ClientError { status: code, message }),
            500..=599 => Err(AgentError::ServerError { status: code, message }),
            _ => Err(AgentError::Internal(format!(
                "HTTP error ({}) not specifically handled (url: {})",
                code, request.url
            ))),
        }
    }
}

fn transport_error(url: &str, err: reqwest::Error) -> AgentError {
    if err.is_timeout() || err.is_connect() || err.is_request() || err.is_body() {
        AgentError::TransientNetwork(format!("Connection error to url {}: {}", url, err))
    } else {
        AgentError::HttpError(err)
    }
}

/// Build an error description from a failed response body.
///
/// Looks for a JSON:API `errors[0]` entry first, then a plain `message`.
pub fn describe_http_error(status: u16, body: &str, url: &str, mower_name: Option<&str>) -> String {
    let tag = mower_name.unwrap_or("-");
    let parsed: Option<Value> = serde_json::from_str(body).ok();

    if let Some(first) = parsed
        .as_ref()
        .and_then(|v| v.get("errors"))
        .and_then(|errors| errors.get(0))
    {
        let title = first.get("title").and_then(Value::as_str).unwrap_or_default();
        let detail = first.get("detail").and_then(Value::as_str).unwrap_or_default();
        return format!("({} - {}) {}: {} (url: {})", tag, status, title, detail, url);
    }

    if let Some(message) = parsed
        .as_ref()
        .and_then(|v| v.get("message"))
        .and_then(Value::as_str)
    {
        return format!("({} - {}) {} (url: {})", tag, status, message, url);
    }

    format!(
        "({} - {}) Uncaptured error returned by the mower API (url: {})",
        tag, status, url
    )
}
