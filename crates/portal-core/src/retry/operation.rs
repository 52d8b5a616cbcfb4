//! The retry loop and the retryable-operation factory.

use super::policy::RetryPolicy;
use super::strategy::BackoffStrategy;
use super::timeout::attempt;
use crate::cancel::CancelToken;
use crate::error::RetryError;
use std::fmt::Display;
use std::future::Future;
use std::time::Duration;
use tracing::{debug, warn};

/// Retry `operation` under `policy`.
///
/// Attempts run strictly one after another. Each attempt is bounded by the
/// policy's timeout; after failed attempt `k` the loop sleeps
/// `delay * 2^(k-1)` (capped at the policy's `max_delay`) and tries again.
/// Once the attempt budget is spent the last failure is returned wrapped in
/// [`RetryError::Exhausted`], even when the budget is a single attempt.
///
/// # Examples
///
/// ```rust
/// use portal_core::retry::{retry_operation, RetryPolicy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_secs(1));
///
/// let err = retry_operation(&policy, || async {
///     Err::<(), _>(std::io::Error::other("x"))
/// })
/// .await
/// .unwrap_err();
///
/// assert_eq!(err.attempts(), 2);
/// assert!(err.to_string().contains("x"));
/// # }
/// ```
pub async fn retry_operation<F, Fut, T, E>(
    policy: &RetryPolicy,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    run(policy, policy.timeout(), None, operation).await
}

/// Like [`retry_operation`], but gives up with [`RetryError::Cancelled`] as
/// soon as `cancel` fires, abandoning the in-flight attempt or backoff sleep.
pub async fn retry_operation_with_cancel<F, Fut, T, E>(
    policy: &RetryPolicy,
    cancel: &CancelToken,
    operation: F,
) -> Result<T, RetryError<E>>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    run(policy, policy.timeout(), Some(cancel), operation).await
}

/// Retry `operation` on an arbitrary [`BackoffStrategy`], bounding each
/// attempt by `timeout` when given.
pub async fn retry_with_strategy<S, F, Fut, T, E>(
    strategy: &S,
    timeout: Option<Duration>,
    operation: F,
) -> Result<T, RetryError<E>>
where
    S: BackoffStrategy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    run(strategy, timeout, None, operation).await
}

async fn run<S, F, Fut, T, E>(
    strategy: &S,
    timeout: Option<Duration>,
    cancel: Option<&CancelToken>,
    mut operation: F,
) -> Result<T, RetryError<E>>
where
    S: BackoffStrategy + ?Sized,
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Display,
{
    let max_attempts = strategy.max_attempts().max(1);
    let mut attempts = 0;

    loop {
        if cancel.is_some_and(CancelToken::is_cancelled) {
            debug!(attempts, "retryable operation cancelled before attempt");
            return Err(RetryError::Cancelled { attempts });
        }
        attempts += 1;

        let outcome = match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(attempts, "retryable operation cancelled mid-attempt");
                        return Err(RetryError::Cancelled { attempts });
                    }
                    outcome = attempt(operation(), timeout) => outcome,
                }
            }
            None => attempt(operation(), timeout).await,
        };

        let err = match outcome {
            Ok(value) => {
                if attempts > 1 {
                    debug!(attempts, "retryable operation succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => err,
        };

        if attempts >= max_attempts {
            warn!(
                attempts,
                timed_out = err.is_timeout(),
                error = %err,
                "retryable operation exhausted its attempts"
            );
            return Err(RetryError::Exhausted {
                attempts,
                last: err,
            });
        }

        let delay = strategy.delay_for_attempt(attempts);
        warn!(
            attempt = attempts,
            max_attempts,
            delay_ms = delay.as_millis() as u64,
            timed_out = err.is_timeout(),
            error = %err,
            "attempt failed, backing off"
        );

        match cancel {
            Some(token) => {
                tokio::select! {
                    biased;
                    _ = token.cancelled() => {
                        debug!(attempts, "retryable operation cancelled during backoff");
                        return Err(RetryError::Cancelled { attempts });
                    }
                    _ = tokio::time::sleep(delay) => {}
                }
            }
            None => tokio::time::sleep(delay).await,
        }
    }
}

/// Create a reusable callable that runs `operation` under `policy`.
///
/// See [`RetryableOperation`].
pub fn create_retryable_operation<F>(operation: F, policy: RetryPolicy) -> RetryableOperation<F> {
    RetryableOperation::new(operation, policy)
}

/// An operation bound to a retry policy.
///
/// Each [`call`](Self::call) performs the full attempt, timeout and retry
/// cycle with its own attempt counter and timers; the only state shared
/// between calls is the immutable operation and policy, so concurrent calls
/// are independent.
///
/// The arguments of a call are cloned into every attempt.
///
/// # Examples
///
/// ```rust
/// use portal_core::retry::{create_retryable_operation, RetryPolicy};
/// use std::time::Duration;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let lookup = create_retryable_operation(
///     |id: u32| async move { Ok::<_, std::io::Error>(id * 2) },
///     RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(1)),
/// );
///
/// assert_eq!(lookup.call(21).await.unwrap(), 42);
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct RetryableOperation<F> {
    operation: F,
    policy: RetryPolicy,
}

impl<F> RetryableOperation<F> {
    /// Bind `operation` to `policy`.
    pub fn new(operation: F, policy: RetryPolicy) -> Self {
        Self { operation, policy }
    }

    /// The policy every call runs under.
    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Run the operation with `args`, retrying per the policy.
    pub async fn call<A, Fut, T, E>(&self, args: A) -> Result<T, RetryError<E>>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        retry_operation(&self.policy, || (self.operation)(args.clone())).await
    }

    /// Run the operation with `args`, giving up as soon as `cancel` fires.
    pub async fn call_with_cancel<A, Fut, T, E>(
        &self,
        args: A,
        cancel: &CancelToken,
    ) -> Result<T, RetryError<E>>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = Result<T, E>>,
        E: Display,
    {
        retry_operation_with_cancel(&self.policy, cancel, || (self.operation)(args.clone())).await
    }
}
