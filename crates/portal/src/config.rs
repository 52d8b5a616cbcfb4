//! Configuration for the account flows

use portal_core::retry::RetryPolicy;
use secrecy::SecretString;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Identity backend used when none is configured (a local development stack).
pub const DEFAULT_BAAS_URL: &str = "http://localhost:54321";

/// Where the browser lands after OAuth or a password-reset mail, by default.
pub const DEFAULT_REDIRECT_URL: &str = "http://localhost:3000/";

/// Per-attempt timeout for identity provider calls.
pub const DEFAULT_AUTH_TIMEOUT: Duration = Duration::from_secs(15);

/// Attempt budget for identity provider calls.
pub const AUTH_MAX_RETRIES: u32 = 3;

/// Health route of the identity backend, relative to its base URL.
pub const DEFAULT_HEALTH_PATH: &str = "auth/v1/health";

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A required variable is not set.
    #[error("missing required configuration: {0}")]
    Missing(&'static str),

    /// A variable is set but cannot be parsed.
    #[error("invalid value for {var}: {value:?}")]
    InvalidValue {
        /// Variable name
        var: &'static str,
        /// Raw value
        value: String,
    },

    /// A URL variable does not parse.
    #[error("invalid URL in {var}: {source}")]
    InvalidUrl {
        /// Variable name
        var: &'static str,
        /// Parse failure
        #[source]
        source: url::ParseError,
    },
}

/// Settings for [`AccountService`](crate::account::AccountService) and the
/// network helpers.
#[derive(Debug, Clone)]
pub struct PortalConfig {
    /// Identity backend base URL
    pub baas_url: Url,

    /// Publishable (anonymous) key for the identity backend
    pub publishable_key: SecretString,

    /// Default policy for retryable operations
    pub retry: RetryPolicy,

    /// Per-attempt timeout for identity provider calls
    pub auth_timeout: Duration,

    /// Endpoint probed by the health check, overriding the backend's own
    pub health_endpoint: Option<Url>,

    /// Where OAuth sign-in and reset mails send the browser back to
    pub redirect_url: Url,
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            baas_url: Url::parse(DEFAULT_BAAS_URL).expect("default backend URL is valid"),
            publishable_key: SecretString::new(String::new().into_boxed_str()),
            retry: RetryPolicy::default(),
            auth_timeout: DEFAULT_AUTH_TIMEOUT,
            health_endpoint: None,
            redirect_url: Url::parse(DEFAULT_REDIRECT_URL).expect("default redirect URL is valid"),
        }
    }
}

impl PortalConfig {
    /// Create a configuration for the given backend and key.
    pub fn new(baas_url: Url, publishable_key: impl Into<String>) -> Self {
        Self {
            baas_url,
            publishable_key: SecretString::new(publishable_key.into().into_boxed_str()),
            ..Default::default()
        }
    }

    /// Load configuration from environment variables.
    ///
    /// A `.env` file in the working directory is read first, if present.
    /// Looks for:
    /// - `PORTAL_BAAS_URL` and `PORTAL_BAAS_PUBLISHABLE_KEY` (required)
    /// - `PORTAL_MAX_RETRIES`, `PORTAL_RETRY_DELAY_MS`, `PORTAL_TIMEOUT_MS`,
    ///   `PORTAL_MAX_DELAY_MS` for the default retry policy
    /// - `PORTAL_AUTH_TIMEOUT_MS` for identity provider calls
    /// - `PORTAL_HEALTH_ENDPOINT` for the health probe
    /// - `PORTAL_OAUTH_REDIRECT` for OAuth and reset-mail redirects
    #[cfg(feature = "env")]
    pub fn from_env() -> Result<Self, ConfigError> {
        use std::env;

        let _ = dotenvy::dotenv();

        let baas_url = env::var("PORTAL_BAAS_URL")
            .map_err(|_| ConfigError::Missing("PORTAL_BAAS_URL"))
            .and_then(|raw| parse_url("PORTAL_BAAS_URL", &raw))?;
        let publishable_key = env::var("PORTAL_BAAS_PUBLISHABLE_KEY")
            .map_err(|_| ConfigError::Missing("PORTAL_BAAS_PUBLISHABLE_KEY"))?;

        let mut config = Self::new(baas_url, publishable_key);

        let mut retry = RetryPolicy::builder();
        if let Some(max_retries) = env_parse::<u32>("PORTAL_MAX_RETRIES")? {
            retry = retry.max_retries(max_retries);
        }
        if let Some(delay) = env_millis("PORTAL_RETRY_DELAY_MS")? {
            retry = retry.delay(delay);
        }
        if let Some(timeout) = env_millis("PORTAL_TIMEOUT_MS")? {
            retry = retry.timeout(timeout);
        }
        if let Some(max_delay) = env_millis("PORTAL_MAX_DELAY_MS")? {
            retry = retry.max_delay(max_delay);
        }
        config.retry = retry.build();

        if let Some(auth_timeout) = env_millis("PORTAL_AUTH_TIMEOUT_MS")? {
            config.auth_timeout = auth_timeout;
        }
        if let Ok(raw) = env::var("PORTAL_HEALTH_ENDPOINT") {
            config.health_endpoint = Some(parse_url("PORTAL_HEALTH_ENDPOINT", &raw)?);
        }
        if let Ok(raw) = env::var("PORTAL_OAUTH_REDIRECT") {
            config.redirect_url = parse_url("PORTAL_OAUTH_REDIRECT", &raw)?;
        }

        Ok(config)
    }

    /// Replace the default retry policy.
    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Set the per-attempt timeout for identity provider calls.
    pub fn with_auth_timeout(mut self, timeout: Duration) -> Self {
        self.auth_timeout = timeout;
        self
    }

    /// Set the health probe endpoint.
    pub fn with_health_endpoint(mut self, endpoint: Url) -> Self {
        self.health_endpoint = Some(endpoint);
        self
    }

    /// Set the redirect target for OAuth and reset mails.
    pub fn with_redirect_url(mut self, url: Url) -> Self {
        self.redirect_url = url;
        self
    }

    /// Policy for identity provider calls: the default policy's delays with
    /// [`AUTH_MAX_RETRIES`] attempts and the auth timeout.
    pub fn auth_policy(&self) -> RetryPolicy {
        self.retry
            .clone()
            .with_max_retries(AUTH_MAX_RETRIES)
            .with_timeout(self.auth_timeout)
    }

    /// Endpoint the health check probes: the configured one, or
    /// [`DEFAULT_HEALTH_PATH`] under the backend URL.
    pub fn health_url(&self) -> Url {
        match &self.health_endpoint {
            Some(endpoint) => endpoint.clone(),
            None => self
                .baas_url
                .join(DEFAULT_HEALTH_PATH)
                .unwrap_or_else(|_| self.baas_url.clone()),
        }
    }

    /// Landing page for password-reset mails.
    pub fn password_reset_redirect(&self) -> Url {
        self.redirect_url
            .join("reset-password")
            .unwrap_or_else(|_| self.redirect_url.clone())
    }
}

fn parse_url(var: &'static str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|source| ConfigError::InvalidUrl { var, source })
}

#[cfg(feature = "env")]
fn env_parse<T: std::str::FromStr>(var: &'static str) -> Result<Option<T>, ConfigError> {
    match std::env::var(var) {
        Ok(value) => value
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value }),
        Err(_) => Ok(None),
    }
}

#[cfg(feature = "env")]
fn env_millis(var: &'static str) -> Result<Option<Duration>, ConfigError> {
    Ok(env_parse::<u64>(var)?.map(Duration::from_millis))
}
