//! The identity provider seam.
//!
//! Identity, sessions and user metadata live in a hosted backend that this
//! crate treats as a black box. [`IdentityProvider`] is the narrow surface
//! the account flows need from it; an implementation is constructed by the
//! application and passed into [`AccountService`](crate::account::AccountService),
//! so tests can substitute a fake.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use thiserror::Error;
use url::Url;

/// Errors reported by an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderError {
    /// The provider could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The provider did not answer in time.
    #[error("provider request timed out")]
    Timeout,

    /// Credentials, session or account state were rejected.
    #[error("{0}")]
    Auth(String),

    /// Too many requests; the provider asks to wait.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Message from the provider
        message: String,
        /// How long the provider asked to wait, when it said so
        retry_after: Option<Duration>,
    },

    /// The caller may not perform this action.
    #[error("permission denied: {0}")]
    PermissionDenied(String),

    /// The requested record does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// Anything else the provider reported.
    #[error("{0}")]
    Other(String),
}

impl ProviderError {
    /// Whether retrying the same request can plausibly succeed.
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            Self::Network(_) | Self::Timeout | Self::RateLimited { .. }
        )
    }
}

/// Email and password pair.
#[derive(Debug, Clone)]
pub struct Credentials {
    /// Account email
    pub email: String,
    /// Account password
    pub password: SecretString,
}

impl Credentials {
    /// Create credentials.
    pub fn new(email: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            email: email.into(),
            password: SecretString::new(password.into().into_boxed_str()),
        }
    }
}

/// Free-form profile attributes stored alongside the account.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMetadata {
    /// Full name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_name: Option<String>,
    /// Public display name
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    /// Avatar location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar_url: Option<String>,
    /// Application role
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
}

/// An account as seen by the provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    /// Provider-assigned identifier
    pub id: String,
    /// Account email, absent for some OAuth accounts
    #[serde(default)]
    pub email: Option<String>,
    /// Profile attributes
    #[serde(default, rename = "user_metadata")]
    pub metadata: UserMetadata,
}

impl User {
    /// Role from metadata, `"user"` when none is set.
    pub fn role(&self) -> &str {
        self.metadata.role.as_deref().unwrap_or("user")
    }
}

/// An authenticated session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Bearer token for the provider's APIs
    pub access_token: SecretString,
    /// Expiry instant, when the provider reports one
    pub expires_at: Option<DateTime<Utc>>,
    /// The signed-in user
    pub user: User,
}

impl Session {
    /// Create a session without a known expiry.
    pub fn new(access_token: impl Into<String>, user: User) -> Self {
        Self {
            access_token: SecretString::new(access_token.into().into_boxed_str()),
            expires_at: None,
            user,
        }
    }

    /// Whether the session has expired as of `now`.
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|expires_at| expires_at <= now)
    }
}

/// Result of a sign-up.
///
/// `session` is `None` when the provider requires email confirmation first.
#[derive(Debug, Clone)]
pub struct SignUpOutcome {
    /// The created user
    pub user: User,
    /// Session, if the account is usable right away
    pub session: Option<Session>,
}

/// Third-party identity providers available for OAuth sign-in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
#[non_exhaustive]
pub enum OAuthProvider {
    /// Google accounts
    Google,
}

impl OAuthProvider {
    /// Provider identifier as the backend names it.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Google => "google",
        }
    }
}

impl fmt::Display for OAuthProvider {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where to send the browser to complete an OAuth sign-in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OAuthRedirect {
    /// Provider authorization URL
    pub url: Url,
}

/// Changes to apply to the signed-in user.
#[derive(Debug, Clone, Default)]
pub struct UserUpdate {
    /// New password
    pub password: Option<SecretString>,
    /// New profile attributes
    pub metadata: Option<UserMetadata>,
}

impl UserUpdate {
    /// Update only the password.
    pub fn password(password: impl Into<String>) -> Self {
        Self {
            password: Some(SecretString::new(password.into().into_boxed_str())),
            metadata: None,
        }
    }

    /// Update only the profile attributes.
    pub fn metadata(metadata: UserMetadata) -> Self {
        Self {
            password: None,
            metadata: Some(metadata),
        }
    }
}

/// Operations the account flows need from the identity backend.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Sign in with email and password.
    async fn sign_in_with_password(&self, credentials: &Credentials)
    -> Result<Session, ProviderError>;

    /// Start an OAuth sign-in; the browser returns to `redirect_to` afterwards.
    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
    ) -> Result<OAuthRedirect, ProviderError>;

    /// Register a new account.
    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: &UserMetadata,
    ) -> Result<SignUpOutcome, ProviderError>;

    /// End the current session.
    async fn sign_out(&self) -> Result<(), ProviderError>;

    /// Email a password-reset link that lands on `redirect_to`.
    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &Url,
    ) -> Result<(), ProviderError>;

    /// Apply `update` to the signed-in user.
    async fn update_user(&self, update: &UserUpdate) -> Result<User, ProviderError>;

    /// The current session, if any.
    async fn current_session(&self) -> Result<Option<Session>, ProviderError>;
}
