//! Account flows against a scripted identity provider
//!
//! Time is paused, so backoff and timeouts are exact.

mod common;

use common::{FakeProvider, Recorded};
use portal::baas::{OAuthProvider, ProviderError, UserMetadata};
use portal::network::StaticConnectivity;
use portal::{AccountService, ErrorCode, PortalConfig, SignUpForm};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;
use url::Url;

fn service(provider: &Arc<FakeProvider>) -> AccountService {
    let config = PortalConfig::default()
        .with_redirect_url(Url::parse("https://app.example.com/").unwrap());
    AccountService::new(provider.clone(), config)
}

fn form() -> SignUpForm {
    SignUpForm {
        email: "ada@example.com".into(),
        password: "Analytical1".into(),
        confirm_password: "Analytical1".into(),
        full_name: "Ada Lovelace".into(),
    }
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_passes_metadata() -> anyhow::Result<()> {
    let provider = Arc::new(FakeProvider::new());
    let outcome = service(&provider).sign_up(&form()).await?;

    assert_eq!(outcome.user.metadata.full_name.as_deref(), Some("Ada Lovelace"));
    assert!(outcome.session.is_some());
    match &provider.recorded()[..] {
        [Recorded::SignUp { email, metadata }] => {
            assert_eq!(email, "ada@example.com");
            assert_eq!(metadata.full_name.as_deref(), Some("Ada Lovelace"));
        }
        other => panic!("unexpected calls: {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_reports_every_invalid_field() {
    let provider = Arc::new(FakeProvider::new());
    let err = service(&provider)
        .sign_up(&SignUpForm {
            email: "ada@".into(),
            confirm_password: "Analytical2".into(),
            ..form()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Validation);
    let fields = &err.details()["fields"];
    assert!(fields.get("email").is_some());
    assert!(fields.get("confirm_password").is_some());
    assert!(fields.get("full_name").is_none());
    assert!(fields.get("password").is_none());
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_sign_up_rate_limit_sets_cooldown() {
    let rate_limited =
        || ProviderError::Auth("For security purposes, you can only request this after 40 seconds.".into());
    let provider = Arc::new(FakeProvider::failing([rate_limited(), rate_limited(), rate_limited()]));

    let err = service(&provider).sign_up(&form()).await.unwrap_err();

    assert_eq!(err.retry_after(), Some(Duration::from_secs(40)));
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(provider.call_count(), 3);
}

#[tokio::test(start_paused = true)]
async fn test_login_retries_transient_failures_with_backoff() {
    let provider = Arc::new(FakeProvider::failing([
        ProviderError::Network("connection reset".into()),
        ProviderError::Timeout,
    ]));

    let start = Instant::now();
    let session = service(&provider)
        .login("ada@example.com", "Analytical1")
        .await
        .unwrap();

    assert_eq!(session.user.id, "user-1");
    assert_eq!(provider.call_count(), 3);
    assert_eq!(start.elapsed(), Duration::from_secs(3));
}

#[tokio::test(start_paused = true)]
async fn test_login_rejected_after_every_attempt() {
    let rejected = || ProviderError::Auth("Invalid login credentials".into());
    let provider = Arc::new(FakeProvider::failing([rejected(), rejected(), rejected()]));

    let err = service(&provider)
        .login("ada@example.com", "wrong-password")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Auth);
    assert_eq!(err.attempts(), Some(3));
    assert_eq!(
        err.message(),
        "operation failed after 3 attempts: Invalid login credentials"
    );
    assert_eq!(err.advice().redirect_to, Some("/login"));
}

#[tokio::test(start_paused = true)]
async fn test_login_requires_password() {
    let provider = Arc::new(FakeProvider::new());
    let err = service(&provider)
        .login("ada@example.com", "")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_hanging_provider_times_out() {
    let provider = Arc::new(FakeProvider::hanging(3));
    let accounts = AccountService::new(
        provider.clone(),
        PortalConfig::default().with_auth_timeout(Duration::from_secs(15)),
    );

    let start = Instant::now();
    let err = accounts.logout().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Timeout);
    assert_eq!(err.attempts(), Some(3));
    // three 15s attempts plus 1s and 2s of backoff
    assert_eq!(start.elapsed(), Duration::from_secs(48));
}

#[tokio::test(start_paused = true)]
async fn test_offline_fails_before_calling_provider() {
    let provider = Arc::new(FakeProvider::new());
    let accounts =
        service(&provider).with_connectivity(Arc::new(StaticConnectivity::new(false)));

    let err = accounts.logout().await.unwrap_err();

    assert_eq!(err.code(), ErrorCode::Network);
    assert_eq!(err.message(), "no internet connection");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_oauth_returns_to_configured_redirect() -> anyhow::Result<()> {
    let provider = Arc::new(FakeProvider::new());
    let redirect = service(&provider)
        .login_with_oauth(OAuthProvider::Google)
        .await?;

    assert!(redirect.url.as_str().contains("provider=google"));
    match &provider.recorded()[..] {
        [Recorded::OAuth { redirect_to, .. }] => {
            assert_eq!(redirect_to.as_str(), "https://app.example.com/")
        }
        other => panic!("unexpected calls: {other:?}"),
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_password_reset_mail_lands_on_reset_page() {
    let provider = Arc::new(FakeProvider::new());
    service(&provider)
        .request_password_reset(" ada@example.com ")
        .await
        .unwrap_err();

    service(&provider)
        .request_password_reset("ada@example.com")
        .await
        .unwrap();

    match &provider.recorded()[..] {
        [Recorded::ResetPassword { email, redirect_to }] => {
            assert_eq!(email, "ada@example.com");
            assert_eq!(redirect_to.as_str(), "https://app.example.com/reset-password");
        }
        other => panic!("unexpected calls: {other:?}"),
    }
}

#[tokio::test(start_paused = true)]
async fn test_update_password_requires_session() {
    let provider = Arc::new(FakeProvider::new());
    let err = service(&provider)
        .update_password("Analytical2", "Analytical2")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Auth);
    assert!(err.message().contains("invalid or has expired"));
    assert!(matches!(&provider.recorded()[..], [Recorded::CurrentSession]));
}

#[tokio::test(start_paused = true)]
async fn test_update_password_with_session() {
    let provider = Arc::new(FakeProvider::new().signed_in());
    service(&provider)
        .update_password("Analytical2", "Analytical2")
        .await
        .unwrap();

    assert!(matches!(
        &provider.recorded()[..],
        [
            Recorded::CurrentSession,
            Recorded::UpdateUser {
                password_changed: true,
                metadata: None
            }
        ]
    ));
}

#[tokio::test(start_paused = true)]
async fn test_update_password_mismatch_is_rejected_locally() {
    let provider = Arc::new(FakeProvider::new().signed_in());
    let err = service(&provider)
        .update_password("Analytical2", "Analytical3")
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(err.details()["field"], "confirm_password");
    assert_eq!(provider.call_count(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_update_profile_sanitizes_free_text() {
    let provider = Arc::new(FakeProvider::new().signed_in());
    let user = service(&provider)
        .update_profile(UserMetadata {
            full_name: Some("Ada Lovelace".into()),
            display_name: Some("  <ada>  ".into()),
            ..Default::default()
        })
        .await
        .unwrap();

    assert_eq!(user.metadata.display_name.as_deref(), Some("ada"));
}

#[tokio::test(start_paused = true)]
async fn test_update_profile_rejects_bad_name() {
    let provider = Arc::new(FakeProvider::new().signed_in());
    let err = service(&provider)
        .update_profile(UserMetadata {
            full_name: Some("R2-D2".into()),
            ..Default::default()
        })
        .await
        .unwrap_err();

    assert_eq!(err.code(), ErrorCode::Validation);
    assert_eq!(provider.call_count(), 0);
}
