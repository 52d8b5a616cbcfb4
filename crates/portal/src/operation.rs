//! A stateful runner for one retryable operation, for UI layers.
//!
//! [`NetworkOperation`] wraps a [`RetryableOperation`] and publishes its
//! progress as an [`OperationState`] over a `tokio::sync::watch` channel.
//! When a failure's [`ErrorAdvice`](crate::error::ErrorAdvice) says a retry
//! makes sense, the operation re-executes itself in the background after the
//! advised delay, up to `max_retries` times, unless cancelled. Dropping the
//! last handle cancels whatever is still pending.

use crate::error::{AppError, ErrorCode, Result};
use crate::network::{AlwaysOnline, Connectivity};
use portal_core::cancel::{CancelSignal, CancelToken};
use portal_core::error::RetryError;
use portal_core::retry::{RetryPolicy, RetryableOperation, create_retryable_operation};
use std::fmt::Display;
use std::future::Future;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, info};

/// Tuning for a [`NetworkOperation`].
#[derive(Debug, Clone, PartialEq)]
pub struct OperationOptions {
    /// Attempts per execution, and the cap on background re-executions
    pub max_retries: u32,
    /// Base backoff between attempts, and the fallback auto-retry delay
    pub retry_delay: Duration,
    /// Per-attempt timeout
    pub timeout: Duration,
    /// Re-execute in the background when the failure advice allows it
    pub auto_retry: bool,
}

impl Default for OperationOptions {
    fn default() -> Self {
        Self {
            max_retries: 3,
            retry_delay: Duration::from_secs(1),
            timeout: Duration::from_secs(10),
            auto_retry: true,
        }
    }
}

impl OperationOptions {
    fn policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.max_retries, self.retry_delay, self.timeout)
    }
}

/// Observable state of a [`NetworkOperation`].
#[derive(Debug, Clone)]
pub struct OperationState<T> {
    /// An execution is in flight
    pub loading: bool,
    /// Result of the last successful execution
    pub data: Option<T>,
    /// Failure of the last execution
    pub error: Option<AppError>,
    /// Background re-executions scheduled since the last reset
    pub retry_count: u32,
}

impl<T> Default for OperationState<T> {
    fn default() -> Self {
        Self {
            loading: false,
            data: None,
            error: None,
            retry_count: 0,
        }
    }
}

/// A retryable operation with published state, auto-retry and cancellation.
///
/// Cheap to clone; clones share state.
///
/// # Examples
///
/// ```rust
/// use portal::operation::{NetworkOperation, OperationOptions};
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() {
/// let load_profile = NetworkOperation::new(
///     |user_id: u32| async move { Ok::<_, portal::AppError>(format!("profile {user_id}")) },
///     OperationOptions::default(),
/// );
///
/// let state = load_profile.subscribe();
/// load_profile.execute(7).await.unwrap();
/// assert_eq!(state.borrow().data.as_deref(), Some("profile 7"));
/// # }
/// ```
pub struct NetworkOperation<F, T> {
    inner: Arc<Inner<F, T>>,
}

struct Inner<F, T> {
    operation: RetryableOperation<F>,
    options: OperationOptions,
    connectivity: Arc<dyn Connectivity>,
    state: watch::Sender<OperationState<T>>,
    cancel: Mutex<CancelSignal>,
}

impl<F, T> Drop for Inner<F, T> {
    fn drop(&mut self) {
        self.cancel
            .get_mut()
            .unwrap_or_else(PoisonError::into_inner)
            .cancel();
    }
}

impl<F, T> Clone for NetworkOperation<F, T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<F, T> NetworkOperation<F, T>
where
    T: Clone + Send + Sync + 'static,
{
    /// Wrap `operation`, assuming the host is always online.
    pub fn new<A, Fut, E>(operation: F, options: OperationOptions) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        Self::with_connectivity(operation, options, Arc::new(AlwaysOnline))
    }

    /// Wrap `operation`, checking `connectivity` before each execution.
    pub fn with_connectivity<A, Fut, E>(
        operation: F,
        options: OperationOptions,
        connectivity: Arc<dyn Connectivity>,
    ) -> Self
    where
        F: Fn(A) -> Fut,
        Fut: Future<Output = std::result::Result<T, E>>,
    {
        let (state, _) = watch::channel(OperationState::default());
        Self {
            inner: Arc::new(Inner {
                operation: create_retryable_operation(operation, options.policy()),
                options,
                connectivity,
                state,
                cancel: Mutex::new(CancelSignal::new()),
            }),
        }
    }

    /// Watch state changes.
    pub fn subscribe(&self) -> watch::Receiver<OperationState<T>> {
        self.inner.state.subscribe()
    }

    /// Snapshot of the current state.
    pub fn state(&self) -> OperationState<T> {
        self.inner.state.borrow().clone()
    }

    /// Whether the connectivity probe reports online.
    pub fn is_online(&self) -> bool {
        self.inner.connectivity.is_online()
    }

    /// Abort the in-flight execution and any pending background retry.
    ///
    /// Later calls to [`execute`](Self::execute) run normally.
    pub fn cancel(&self) {
        let mut signal = self
            .inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner);
        signal.cancel();
        *signal = CancelSignal::new();
        drop(signal);

        self.inner.state.send_modify(|state| state.loading = false);
        debug!("network operation cancelled");
    }

    /// Clear data, error and the retry counter.
    pub fn reset(&self) {
        self.inner.state.send_modify(|state| {
            state.data = None;
            state.error = None;
            state.retry_count = 0;
        });
    }

    /// Run the operation with `args`.
    ///
    /// Returns the outcome of this execution. When it fails with retryable
    /// advice and auto-retry is on, a background re-execution is scheduled;
    /// its progress shows up in the published state.
    pub async fn execute<A, Fut, E>(&self, args: A) -> Result<T>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<AppError> + Display + Send + 'static,
    {
        self.check_online()?;

        let token = self.token();
        let outcome = self.run_once(args.clone(), &token).await;
        if let Err(err) = &outcome
            && let Some(delay) = self.schedule_retry(err)
        {
            let inner = Arc::downgrade(&self.inner);
            tokio::spawn(Self::auto_retry(inner, args, token, delay));
        }
        outcome
    }

    /// Reset state, then execute.
    pub async fn retry<A, Fut, E>(&self, args: A) -> Result<T>
    where
        F: Fn(A) -> Fut + Send + Sync + 'static,
        A: Clone + Send + Sync + 'static,
        Fut: Future<Output = std::result::Result<T, E>> + Send + 'static,
        E: Into<AppError> + Display + Send + 'static,
    {
        self.reset();
        self.execute(args).await
    }

    fn token(&self) -> CancelToken {
        self.inner
            .cancel
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .token()
    }

    fn check_online(&self) -> Result<()> {
        if self.is_online() {
            return Ok(());
        }
        let err = AppError::network("no internet connection");
        self.inner
            .state
            .send_modify(|state| state.error = Some(err.clone()));
        Err(err)
    }

    async fn run_once<A, Fut, E>(&self, args: A, token: &CancelToken) -> Result<T>
    where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<AppError> + Display,
    {
        // checked under the state lock so a concurrent cancel always wins
        let started = self.inner.state.send_if_modified(|state| {
            if token.is_cancelled() {
                return false;
            }
            state.loading = true;
            state.error = None;
            true
        });
        if !started {
            return Err(AppError::from(RetryError::<E>::Cancelled { attempts: 0 }));
        }

        match self.inner.operation.call_with_cancel(args, token).await {
            Ok(data) => {
                self.inner.state.send_modify(|state| {
                    state.data = Some(data.clone());
                    state.loading = false;
                });
                Ok(data)
            }
            Err(err) => {
                let err = AppError::from(err);
                if err.code() != ErrorCode::Cancelled {
                    self.inner.state.send_modify(|state| {
                        state.error = Some(err.clone());
                        state.loading = false;
                    });
                }
                Err(err)
            }
        }
    }

    /// Claim a background retry slot for `err`, returning the delay to wait.
    fn schedule_retry(&self, err: &AppError) -> Option<Duration> {
        if !self.inner.options.auto_retry {
            return None;
        }
        let advice = err.advice();
        if !advice.should_retry {
            return None;
        }

        let max_retries = self.inner.options.max_retries;
        let mut scheduled = false;
        self.inner.state.send_if_modified(|state| {
            if state.retry_count < max_retries {
                state.retry_count += 1;
                scheduled = true;
            }
            scheduled
        });

        let delay = advice.retry_delay.unwrap_or(self.inner.options.retry_delay);
        if scheduled {
            info!(
                delay_ms = delay.as_millis(),
                code = %err.code(),
                "scheduling automatic retry"
            );
        }
        scheduled.then_some(delay)
    }

    /// Background re-executions. Holds only a weak handle, so it ends once
    /// every [`NetworkOperation`] handle is gone.
    async fn auto_retry<A, Fut, E>(
        inner: Weak<Inner<F, T>>,
        args: A,
        token: CancelToken,
        mut delay: Duration,
    ) where
        F: Fn(A) -> Fut,
        A: Clone,
        Fut: Future<Output = std::result::Result<T, E>>,
        E: Into<AppError> + Display,
    {
        loop {
            tokio::select! {
                biased;
                _ = token.cancelled() => return,
                _ = tokio::time::sleep(delay) => {}
            }

            let Some(inner) = inner.upgrade() else {
                debug!("network operation dropped, abandoning automatic retry");
                return;
            };
            let this = Self { inner };
            if this.check_online().is_err() {
                return;
            }
            match this.run_once(args.clone(), &token).await {
                Ok(_) => return,
                Err(err) => match this.schedule_retry(&err) {
                    Some(next) => delay = next,
                    None => return,
                },
            }
        }
    }
}

impl<F, T> std::fmt::Debug for NetworkOperation<F, T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetworkOperation")
            .field("options", &self.inner.options)
            .finish_non_exhaustive()
    }
}
