//! Account flows over an injected [`IdentityProvider`].
//!
//! Every flow follows the same path: validate input locally, refuse early
//! when offline, run the provider call as a retryable operation under the
//! auth policy, then classify and log any failure as an [`AppError`].
//!
//! # Examples
//!
//! ```rust,no_run
//! use portal::account::{AccountService, SignUpForm};
//! use portal::baas::IdentityProvider;
//! use portal::config::PortalConfig;
//! use std::sync::Arc;
//!
//! # async fn example(provider: Arc<dyn IdentityProvider>) -> portal::Result<()> {
//! let accounts = AccountService::new(provider, PortalConfig::default());
//!
//! let outcome = accounts
//!     .sign_up(&SignUpForm {
//!         email: "ada@example.com".into(),
//!         password: "Analytical1".into(),
//!         confirm_password: "Analytical1".into(),
//!         full_name: "Ada Lovelace".into(),
//!     })
//!     .await?;
//! println!("created {}", outcome.user.id);
//! # Ok(())
//! # }
//! ```

use crate::baas::{
    Credentials, IdentityProvider, OAuthProvider, OAuthRedirect, ProviderError, Session,
    SignUpOutcome, User, UserMetadata, UserUpdate,
};
use crate::config::PortalConfig;
use crate::error::{AppError, Result, log_error};
use crate::network::{AlwaysOnline, Connectivity};
use crate::observability::OperationTimer;
use crate::validation::{
    FormValidation, ValidationError, sanitize_input, validate_email, validate_full_name,
    validate_password, validate_password_confirmation,
};
use portal_core::error::RetryError;
use portal_core::retry::create_retryable_operation;
use serde_json::json;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Cooldown the identity backend imposes after repeated sign-ups.
pub const SIGN_UP_COOLDOWN: Duration = Duration::from_secs(40);

/// Input of the sign-up form.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    /// Account email
    pub email: String,
    /// Chosen password
    pub password: String,
    /// Password typed a second time
    pub confirm_password: String,
    /// Full name for the profile
    pub full_name: String,
}

/// Account operations with validation, retries and error classification.
#[derive(Clone)]
pub struct AccountService {
    provider: Arc<dyn IdentityProvider>,
    connectivity: Arc<dyn Connectivity>,
    config: PortalConfig,
}

impl AccountService {
    /// Create a service over `provider`, assuming the host is always online.
    pub fn new(provider: Arc<dyn IdentityProvider>, config: PortalConfig) -> Self {
        Self {
            provider,
            connectivity: Arc::new(AlwaysOnline),
            config,
        }
    }

    /// Check `connectivity` before every provider call.
    pub fn with_connectivity(mut self, connectivity: Arc<dyn Connectivity>) -> Self {
        self.connectivity = connectivity;
        self
    }

    /// The configuration the service runs with.
    pub fn config(&self) -> &PortalConfig {
        &self.config
    }

    /// Register a new account.
    ///
    /// All form fields are validated together. A sign-up rate limit is
    /// reported with a [`SIGN_UP_COOLDOWN`] retry hint.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<SignUpOutcome> {
        let confirmation = validate_password_confirmation(&form.password, &form.confirm_password)
            .and_then(|()| validate_password(&form.confirm_password));
        FormValidation::new()
            .field("email", validate_email(&form.email))
            .field("password", validate_password(&form.password))
            .field("confirm_password", confirmation)
            .field("full_name", validate_full_name(&form.full_name))
            .finish()?;

        let credentials = Credentials::new(form.email.trim(), form.password.as_str());
        let metadata = UserMetadata {
            full_name: Some(sanitize_input(&form.full_name)),
            ..Default::default()
        };

        self.run(
            "sign_up",
            move |provider| {
                let credentials = credentials.clone();
                let metadata = metadata.clone();
                async move { provider.sign_up(&credentials, &metadata).await }
            },
            sign_up_error,
        )
        .await
    }

    /// Sign in with email and password.
    pub async fn login(&self, email: &str, password: &str) -> Result<Session> {
        let password_present = if password.is_empty() {
            Err(ValidationError::Required { field: "password" })
        } else {
            Ok(())
        };
        FormValidation::new()
            .field("email", validate_email(email))
            .field("password", password_present)
            .finish()?;

        let credentials = Credentials::new(email.trim(), password);
        self.run(
            "login",
            move |provider| {
                let credentials = credentials.clone();
                async move { provider.sign_in_with_password(&credentials).await }
            },
            AppError::from,
        )
        .await
    }

    /// Start an OAuth sign-in that returns to the configured redirect URL.
    pub async fn login_with_oauth(&self, oauth: OAuthProvider) -> Result<OAuthRedirect> {
        let redirect_to = self.config.redirect_url.clone();
        self.run(
            "login_with_oauth",
            move |provider| {
                let redirect_to = redirect_to.clone();
                async move { provider.sign_in_with_oauth(oauth, &redirect_to).await }
            },
            AppError::from,
        )
        .await
    }

    /// End the current session.
    pub async fn logout(&self) -> Result<()> {
        self.run(
            "logout",
            |provider| async move { provider.sign_out().await },
            AppError::from,
        )
        .await
    }

    /// Email a password-reset link.
    pub async fn request_password_reset(&self, email: &str) -> Result<()> {
        validate_email(email)?;

        let email = email.trim().to_string();
        let redirect_to = self.config.password_reset_redirect();
        self.run(
            "request_password_reset",
            move |provider| {
                let email = email.clone();
                let redirect_to = redirect_to.clone();
                async move { provider.reset_password_for_email(&email, &redirect_to).await }
            },
            AppError::from,
        )
        .await
    }

    /// Set a new password for the signed-in user, typically after following
    /// a reset link.
    ///
    /// Fails with an auth error when there is no session, which is how an
    /// expired or invalid reset link shows up.
    pub async fn update_password(&self, password: &str, confirmation: &str) -> Result<User> {
        let suggestions = validate_password(password)?;
        if !suggestions.is_empty() {
            debug!(?suggestions, "password accepted with suggestions");
        }
        validate_password_confirmation(password, confirmation)?;

        if self.current_session().await?.is_none() {
            return Err(AppError::auth(
                "password reset link is invalid or has expired",
            ));
        }

        let update = UserUpdate::password(password);
        self.run(
            "update_password",
            move |provider| {
                let update = update.clone();
                async move { provider.update_user(&update).await }
            },
            AppError::from,
        )
        .await
    }

    /// Update the signed-in user's profile attributes.
    ///
    /// Free-text fields are sanitized; a present full name must be valid.
    pub async fn update_profile(&self, metadata: UserMetadata) -> Result<User> {
        if let Some(full_name) = &metadata.full_name {
            validate_full_name(full_name)?;
        }
        let metadata = UserMetadata {
            full_name: metadata.full_name.as_deref().map(sanitize_input),
            display_name: metadata.display_name.as_deref().map(sanitize_input),
            ..metadata
        };

        let update = UserUpdate::metadata(metadata);
        self.run(
            "update_profile",
            move |provider| {
                let update = update.clone();
                async move { provider.update_user(&update).await }
            },
            AppError::from,
        )
        .await
    }

    /// The current session, if any.
    pub async fn current_session(&self) -> Result<Option<Session>> {
        self.run(
            "current_session",
            |provider| async move { provider.current_session().await },
            AppError::from,
        )
        .await
    }

    async fn run<T, F, Fut, C>(&self, action: &'static str, call: F, classify: C) -> Result<T>
    where
        F: Fn(Arc<dyn IdentityProvider>) -> Fut,
        Fut: Future<Output = std::result::Result<T, ProviderError>>,
        C: FnOnce(RetryError<ProviderError>) -> AppError,
    {
        let timer = OperationTimer::start(action);

        if !self.connectivity.is_online() {
            let err = AppError::network("no internet connection");
            timer.log_failure(err.code().as_str(), None, err.message());
            return Err(err);
        }

        let operation = create_retryable_operation(call, self.config.auth_policy());
        match operation.call(Arc::clone(&self.provider)).await {
            Ok(value) => {
                timer.log_success();
                Ok(value)
            }
            Err(err) => {
                let err = classify(err);
                timer.log_failure(err.code().as_str(), err.attempts(), err.message());
                log_error(&err, &json!({ "action": action }));
                Err(err)
            }
        }
    }
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

/// Map well-known sign-up rejections to friendlier errors.
fn sign_up_error(err: RetryError<ProviderError>) -> AppError {
    let attempts = err.attempts();
    let provider_message = err
        .last_error()
        .and_then(|last| last.operation_error())
        .map(ToString::to_string)
        .unwrap_or_default();

    if provider_message.contains("40 seconds") {
        return AppError::auth(format!(
            "Too many sign-up attempts. Wait {} seconds before trying again.",
            SIGN_UP_COOLDOWN.as_secs()
        ))
        .with_retry_after(SIGN_UP_COOLDOWN)
        .with_attempts(attempts);
    }
    if provider_message.contains("already registered") {
        return AppError::auth("This email is already registered. Try signing in instead.")
            .with_attempts(attempts);
    }
    if provider_message.contains("Invalid email") {
        return AppError::validation("Invalid email format.").with_attempts(attempts);
    }
    if provider_message.contains("Password should be at least") {
        return AppError::validation("Password must be at least 6 characters.")
            .with_attempts(attempts);
    }
    AppError::from(err)
}
