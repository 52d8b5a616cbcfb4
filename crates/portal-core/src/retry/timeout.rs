//! Racing a single attempt against a timer.

use crate::error::{AttemptError, TimeoutError};
use std::future::Future;
use std::time::Duration;

/// Run `future` against a timer of length `timeout`.
///
/// Whichever settles first decides the outcome. If the timer wins, the
/// attempt fails with [`AttemptError::Timeout`] and `future` is dropped,
/// which cancels any work it had not finished. Work the future had already
/// handed off elsewhere (a spawned task, a request already on the wire)
/// is not recalled.
///
/// The timer is released as soon as the race settles.
///
/// # Examples
///
/// ```rust
/// use portal_core::retry::with_timeout;
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let outcome = with_timeout(
///     std::future::pending::<Result<(), std::io::Error>>(),
///     Duration::from_millis(10),
/// )
/// .await;
///
/// assert!(outcome.unwrap_err().is_timeout());
/// # }
/// ```
pub async fn with_timeout<F, T, E>(future: F, timeout: Duration) -> Result<T, AttemptError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match tokio::time::timeout(timeout, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(err)) => Err(AttemptError::Operation(err)),
        Err(_) => Err(AttemptError::Timeout(TimeoutError { after: timeout })),
    }
}

/// Run one attempt, bounded by `timeout` when one is configured.
pub(crate) async fn attempt<F, T, E>(
    future: F,
    timeout: Option<Duration>,
) -> Result<T, AttemptError<E>>
where
    F: Future<Output = Result<T, E>>,
{
    match timeout {
        Some(timeout) => with_timeout(future, timeout).await,
        None => future.await.map_err(AttemptError::Operation),
    }
}
