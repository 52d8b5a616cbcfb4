use super::{AlwaysOnline, Connectivity};
use crate::error::{AppError, ErrorCode, Result};
use portal_core::error::RetryError;
use portal_core::error_boundary;
use portal_core::retry::{RetryPolicy, retry_operation};
use reqwest::{Method, Response, StatusCode};
use serde::Serialize;
use serde::de::DeserializeOwned;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::debug;

/// Failure of a single fetch attempt.
#[derive(Debug, Error)]
pub enum FetchError {
    /// The request never produced a response.
    #[error("{0}")]
    Network(String),

    /// The server answered with a non-2xx status.
    #[error("HTTP {status}: {reason}")]
    Status {
        /// Status code
        status: u16,
        /// Canonical reason phrase
        reason: String,
    },
}

error_boundary!(FetchError => AppError, |e| {
    let code = match &e {
        FetchError::Network(_) => ErrorCode::Network,
        FetchError::Status { status: 401, .. } => ErrorCode::Auth,
        FetchError::Status { status: 403, .. } => ErrorCode::Permission,
        FetchError::Status { status: 404, .. } => ErrorCode::NotFound,
        FetchError::Status { status: 408 | 504, .. } => ErrorCode::Timeout,
        FetchError::Status { .. } => ErrorCode::Unknown,
    };
    AppError::new(code, e.to_string())
});

/// HTTP requests against a fixed base URL that fail fast while offline and
/// retry transient failures otherwise.
///
/// Endpoints are appended to the base URL verbatim, so `"/health"` against
/// `"https://api.example.com"` requests `https://api.example.com/health`.
///
/// # Examples
///
/// ```rust,no_run
/// use portal::network::NetworkAwareFetch;
///
/// # async fn example() -> portal::Result<()> {
/// let api = NetworkAwareFetch::new("https://api.example.com");
/// let status: serde_json::Value = api.get_json("/status").await?;
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct NetworkAwareFetch {
    client: reqwest::Client,
    base_url: String,
    connectivity: Arc<dyn Connectivity>,
    policy: RetryPolicy,
}

impl NetworkAwareFetch {
    /// Per-request timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(8);
    /// Attempts per request.
    pub const DEFAULT_RETRIES: u32 = 2;
    /// Base backoff between attempts.
    pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(1);

    /// Create a fetcher for `base_url` with the default policy.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.into(),
            connectivity: Arc::new(AlwaysOnline),
            policy: RetryPolicy::new(
                Self::DEFAULT_RETRIES,
                Self::DEFAULT_RETRY_DELAY,
                Self::DEFAULT_TIMEOUT,
            ),
        }
    }

    /// Use a preconfigured HTTP client.
    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    /// Use `connectivity` for the offline check.
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// Bound each attempt by `timeout`.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.policy = self.policy.with_timeout(timeout);
        self
    }

    /// Replace the retry policy.
    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// The retry policy requests run under.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Full URL for `endpoint`.
    pub fn url_for(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// `GET` `endpoint`.
    pub async fn get(&self, endpoint: &str) -> Result<Response> {
        self.send(Method::GET, endpoint, None).await
    }

    /// `GET` `endpoint` and decode the JSON body.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T> {
        let response = self.get(endpoint).await?;
        response
            .json()
            .await
            .map_err(|e| AppError::unknown(format!("invalid response body: {e}")))
    }

    /// `POST` `body` as JSON to `endpoint`.
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        endpoint: &str,
        body: &B,
    ) -> Result<Response> {
        let body = serde_json::to_value(body)
            .map_err(|e| AppError::validation(format!("unserializable request body: {e}")))?;
        self.send(Method::POST, endpoint, Some(body)).await
    }

    /// Send a request, retrying per the policy.
    pub async fn send(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<serde_json::Value>,
    ) -> Result<Response> {
        if !self.connectivity.is_online() {
            return Err(AppError::network("no internet connection"));
        }

        let url = self.url_for(endpoint);
        debug!(method = %method, url = %url, "sending request");

        retry_operation(&self.policy, || {
            self.attempt(method.clone(), &url, body.as_ref())
        })
        .await
        .map_err(|err: RetryError<FetchError>| {
            if err.is_timeout() {
                AppError::timeout("request timed out").with_attempts(err.attempts())
            } else {
                AppError::from(err)
            }
        })
    }

    async fn attempt(
        &self,
        method: Method,
        url: &str,
        body: Option<&serde_json::Value>,
    ) -> std::result::Result<Response, FetchError> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request
            .send()
            .await
            .map_err(|e| FetchError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(status_error(status));
        }
        Ok(response)
    }
}

impl std::fmt::Debug for NetworkAwareFetch {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkAwareFetch")
            .field("base_url", &self.base_url)
            .field("policy", &self.policy)
            .finish_non_exhaustive()
    }
}

fn status_error(status: StatusCode) -> FetchError {
    FetchError::Status {
        status: status.as_u16(),
        reason: status.canonical_reason().unwrap_or("Unknown").to_string(),
    }
}
