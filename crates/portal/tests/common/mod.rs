//! Common test utilities and helpers

use async_trait::async_trait;
use portal::baas::{
    Credentials, IdentityProvider, OAuthProvider, OAuthRedirect, ProviderError, Session,
    SignUpOutcome, User, UserMetadata, UserUpdate,
};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicU32, Ordering};
use url::Url;

/// A user as the fake provider returns it
#[allow(dead_code)]
pub fn test_user() -> User {
    User {
        id: "user-1".to_string(),
        email: Some("ada@example.com".to_string()),
        metadata: UserMetadata::default(),
    }
}

/// What the fake provider was asked to do
#[allow(dead_code)]
#[derive(Debug, Clone)]
pub enum Recorded {
    SignIn { email: String },
    OAuth { provider: OAuthProvider, redirect_to: Url },
    SignUp { email: String, metadata: UserMetadata },
    SignOut,
    ResetPassword { email: String, redirect_to: Url },
    UpdateUser { password_changed: bool, metadata: Option<UserMetadata> },
    CurrentSession,
}

/// Identity provider double: every call is recorded, scripted failures are
/// returned first, and hanging calls never resolve.
#[derive(Default)]
pub struct FakeProvider {
    recorded: Mutex<Vec<Recorded>>,
    failures: Mutex<VecDeque<ProviderError>>,
    hanging: AtomicU32,
    session: Mutex<Option<Session>>,
}

#[allow(dead_code)]
impl FakeProvider {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail the next calls with `errors`, in order
    pub fn failing(errors: impl IntoIterator<Item = ProviderError>) -> Self {
        let provider = Self::default();
        provider.failures.lock().unwrap().extend(errors);
        provider
    }

    /// Let the next `count` calls hang forever
    pub fn hanging(count: u32) -> Self {
        let provider = Self::default();
        provider.hanging.store(count, Ordering::SeqCst);
        provider
    }

    /// Start with an active session
    pub fn signed_in(self) -> Self {
        *self.session.lock().unwrap() = Some(Session::new("tok_test", test_user()));
        self
    }

    pub fn recorded(&self) -> Vec<Recorded> {
        self.recorded.lock().unwrap().clone()
    }

    pub fn call_count(&self) -> usize {
        self.recorded.lock().unwrap().len()
    }

    async fn step(&self, call: Recorded) -> Result<(), ProviderError> {
        self.recorded.lock().unwrap().push(call);

        let hang = self
            .hanging
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
            .is_ok();
        if hang {
            std::future::pending::<()>().await;
        }

        match self.failures.lock().unwrap().pop_front() {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}

#[async_trait]
impl IdentityProvider for FakeProvider {
    async fn sign_in_with_password(
        &self,
        credentials: &Credentials,
    ) -> Result<Session, ProviderError> {
        self.step(Recorded::SignIn {
            email: credentials.email.clone(),
        })
        .await?;
        let session = Session::new("tok_test", test_user());
        *self.session.lock().unwrap() = Some(session.clone());
        Ok(session)
    }

    async fn sign_in_with_oauth(
        &self,
        provider: OAuthProvider,
        redirect_to: &Url,
    ) -> Result<OAuthRedirect, ProviderError> {
        self.step(Recorded::OAuth {
            provider,
            redirect_to: redirect_to.clone(),
        })
        .await?;
        let mut url = Url::parse("https://accounts.example.com/authorize").unwrap();
        url.query_pairs_mut()
            .append_pair("provider", provider.as_str())
            .append_pair("redirect_to", redirect_to.as_str());
        Ok(OAuthRedirect { url })
    }

    async fn sign_up(
        &self,
        credentials: &Credentials,
        metadata: &UserMetadata,
    ) -> Result<SignUpOutcome, ProviderError> {
        self.step(Recorded::SignUp {
            email: credentials.email.clone(),
            metadata: metadata.clone(),
        })
        .await?;
        let user = User {
            email: Some(credentials.email.clone()),
            metadata: metadata.clone(),
            ..test_user()
        };
        Ok(SignUpOutcome {
            session: Some(Session::new("tok_new", user.clone())),
            user,
        })
    }

    async fn sign_out(&self) -> Result<(), ProviderError> {
        self.step(Recorded::SignOut).await?;
        *self.session.lock().unwrap() = None;
        Ok(())
    }

    async fn reset_password_for_email(
        &self,
        email: &str,
        redirect_to: &Url,
    ) -> Result<(), ProviderError> {
        self.step(Recorded::ResetPassword {
            email: email.to_string(),
            redirect_to: redirect_to.clone(),
        })
        .await
    }

    async fn update_user(&self, update: &UserUpdate) -> Result<User, ProviderError> {
        self.step(Recorded::UpdateUser {
            password_changed: update.password.is_some(),
            metadata: update.metadata.clone(),
        })
        .await?;
        Ok(User {
            metadata: update.metadata.clone().unwrap_or_default(),
            ..test_user()
        })
    }

    async fn current_session(&self) -> Result<Option<Session>, ProviderError> {
        self.step(Recorded::CurrentSession).await?;
        Ok(self.session.lock().unwrap().clone())
    }
}
