//! Application error type shared by every account flow.
//!
//! Lower layers keep their own error enums ([`ProviderError`],
//! [`ValidationError`], [`RetryError`], [`ConfigError`]); at the crate
//! boundary they fold into [`AppError`], which carries a machine-readable
//! [`ErrorCode`] the UI can branch on plus an [`ErrorAdvice`] describing how
//! to present the failure.

use crate::baas::ProviderError;
use crate::config::ConfigError;
use crate::validation::{FormErrors, ValidationError};
use chrono::{DateTime, Utc};
use portal_core::error::{AttemptError, RetryError};
use portal_core::error_boundary;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::fmt;
use std::time::Duration;
use thiserror::Error;

/// Result type alias for Portal operations.
pub type Result<T> = std::result::Result<T, AppError>;

/// Category of an [`AppError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ErrorCode {
    /// No connectivity, or the transport failed.
    #[serde(rename = "NETWORK_ERROR")]
    Network,
    /// Input was rejected before any request was made.
    #[serde(rename = "VALIDATION_ERROR")]
    Validation,
    /// The identity provider rejected the credentials or session.
    #[serde(rename = "AUTH_ERROR")]
    Auth,
    /// The caller may not perform the action.
    #[serde(rename = "PERMISSION_ERROR")]
    Permission,
    /// The target record does not exist.
    #[serde(rename = "NOT_FOUND")]
    NotFound,
    /// The operation did not finish in time.
    #[serde(rename = "TIMEOUT_ERROR")]
    Timeout,
    /// The operation was cancelled by the caller.
    #[serde(rename = "CANCELLED")]
    Cancelled,
    /// Configuration is missing or malformed.
    #[serde(rename = "CONFIG_ERROR")]
    Config,
    /// Anything else.
    #[serde(rename = "UNKNOWN_ERROR")]
    Unknown,
}

impl ErrorCode {
    /// Wire name of the code.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Network => "NETWORK_ERROR",
            Self::Validation => "VALIDATION_ERROR",
            Self::Auth => "AUTH_ERROR",
            Self::Permission => "PERMISSION_ERROR",
            Self::NotFound => "NOT_FOUND",
            Self::Timeout => "TIMEOUT_ERROR",
            Self::Cancelled => "CANCELLED",
            Self::Config => "CONFIG_ERROR",
            Self::Unknown => "UNKNOWN_ERROR",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A classified, user-presentable failure.
#[derive(Debug, Clone, Error, Serialize)]
#[error("{message}")]
pub struct AppError {
    code: ErrorCode,
    message: String,
    #[serde(skip_serializing_if = "Value::is_null")]
    details: Value,
    timestamp: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    attempts: Option<u32>,
    #[serde(skip)]
    retry_after: Option<Duration>,
}

impl AppError {
    /// Create an error with `code` and `message`, stamped with the current time.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            details: Value::Null,
            timestamp: Utc::now(),
            attempts: None,
            retry_after: None,
        }
    }

    /// Network failure.
    pub fn network(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Network, message)
    }

    /// Validation failure.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Validation, message)
    }

    /// Authentication failure.
    pub fn auth(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Auth, message)
    }

    /// Timeout.
    pub fn timeout(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Timeout, message)
    }

    /// Unclassified failure.
    pub fn unknown(message: impl Into<String>) -> Self {
        Self::new(ErrorCode::Unknown, message)
    }

    /// Attach structured details.
    pub fn with_details(mut self, details: Value) -> Self {
        self.details = details;
        self
    }

    /// Record how many attempts were made before giving up.
    pub fn with_attempts(mut self, attempts: u32) -> Self {
        self.attempts = Some(attempts);
        self
    }

    /// Ask the caller to wait before trying again.
    pub fn with_retry_after(mut self, retry_after: Duration) -> Self {
        self.retry_after = Some(retry_after);
        self
    }

    /// Replace the message, keeping everything else.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    /// Error category.
    pub fn code(&self) -> ErrorCode {
        self.code
    }

    /// Human-readable message.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// Structured details, `Null` when none were attached.
    pub fn details(&self) -> &Value {
        &self.details
    }

    /// When the error was created.
    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// Attempts made, when the error came out of a retry loop.
    pub fn attempts(&self) -> Option<u32> {
        self.attempts
    }

    /// Cooldown requested by the backend, if any.
    pub fn retry_after(&self) -> Option<Duration> {
        self.retry_after
    }

    /// How the failure should be presented and whether to try again.
    ///
    /// A backend-requested cooldown takes precedence over the code's default.
    pub fn advice(&self) -> ErrorAdvice {
        if let Some(delay) = self.retry_after {
            return ErrorAdvice {
                user_message: format!(
                    "Too many attempts. Wait {} seconds before trying again.",
                    delay.as_secs()
                ),
                should_retry: true,
                retry_delay: Some(delay),
                redirect_to: None,
            };
        }

        match self.code {
            ErrorCode::Network => ErrorAdvice {
                user_message: "Connection problem. Check your internet connection.".into(),
                should_retry: true,
                retry_delay: Some(Duration::from_secs(5)),
                redirect_to: None,
            },
            ErrorCode::Timeout => ErrorAdvice {
                user_message: "The operation is taking too long. Try again in a moment.".into(),
                should_retry: true,
                retry_delay: Some(Duration::from_secs(3)),
                redirect_to: None,
            },
            ErrorCode::Auth => ErrorAdvice {
                user_message: "Your session has expired. Please sign in again.".into(),
                should_retry: false,
                retry_delay: None,
                redirect_to: Some("/login"),
            },
            _ => ErrorAdvice {
                user_message: "An unexpected error occurred. Try again later.".into(),
                should_retry: false,
                retry_delay: None,
                redirect_to: None,
            },
        }
    }
}

/// Presentation hints derived from an [`AppError`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ErrorAdvice {
    /// Message suitable for end users
    pub user_message: String,
    /// Whether an automatic retry makes sense
    pub should_retry: bool,
    /// How long to wait before retrying
    pub retry_delay: Option<Duration>,
    /// Route to send the user to instead
    pub redirect_to: Option<&'static str>,
}

/// Emit a structured error event for `error`.
///
/// `context` is free-form JSON describing where the error surfaced.
pub fn log_error(error: &AppError, context: &Value) {
    tracing::error!(
        code = %error.code,
        message = %error.message,
        attempts = ?error.attempts,
        timestamp = %error.timestamp.to_rfc3339(),
        context = %context,
        "application error"
    );
}

error_boundary!(ProviderError => AppError, |e| {
    match e {
        ProviderError::Network(message) => AppError::network(message),
        ProviderError::Timeout => AppError::timeout("request timed out"),
        ProviderError::Auth(message) => AppError::auth(message),
        ProviderError::RateLimited { message, retry_after } => {
            let err = AppError::auth(message);
            match retry_after {
                Some(delay) => err.with_retry_after(delay),
                None => err,
            }
        }
        ProviderError::PermissionDenied(message) => AppError::new(ErrorCode::Permission, message),
        ProviderError::NotFound(message) => AppError::new(ErrorCode::NotFound, message),
        ProviderError::Other(message) => AppError::unknown(message),
    }
});

error_boundary!(ValidationError => AppError, |e| {
    AppError::validation(e.to_string()).with_details(json!({ "field": e.field() }))
});

error_boundary!(FormErrors => AppError, |e| {
    let fields: serde_json::Map<String, Value> = e
        .iter()
        .map(|(field, err)| (field.to_string(), Value::String(err.to_string())))
        .collect();
    AppError::validation(e.to_string()).with_details(json!({ "fields": fields }))
});

error_boundary!(ConfigError => AppError, |e| {
    AppError::new(ErrorCode::Config, e.to_string())
});

/// A spent retry loop keeps the inner error's classification and the full
/// "failed after N attempts" message.
impl<E> From<RetryError<E>> for AppError
where
    E: Into<AppError> + fmt::Display,
{
    fn from(err: RetryError<E>) -> Self {
        let message = err.to_string();
        match err {
            RetryError::Cancelled { attempts } => {
                AppError::new(ErrorCode::Cancelled, message).with_attempts(attempts)
            }
            RetryError::Exhausted {
                attempts,
                last: AttemptError::Timeout(_),
            } => AppError::timeout(message).with_attempts(attempts),
            RetryError::Exhausted {
                attempts,
                last: AttemptError::Operation(inner),
            } => inner
                .into()
                .with_message(message)
                .with_attempts(attempts),
        }
    }
}
