//! The backoff seam used by the retry loop.

use std::time::Duration;

/// Decides how many attempts an operation gets and how long to wait between them.
///
/// The retry loop in [`retry_with_strategy`](super::retry_with_strategy) only
/// talks to this trait, so alternative schedules (fixed delay, linear, a
/// fake schedule in tests) plug in without touching the loop.
///
/// # Examples
///
/// ```rust
/// use portal_core::retry::BackoffStrategy;
/// use std::time::Duration;
///
/// struct Fixed;
///
/// impl BackoffStrategy for Fixed {
///     fn delay_for_attempt(&self, _attempt: u32) -> Duration {
///         Duration::from_millis(250)
///     }
///
///     fn max_attempts(&self) -> u32 {
///         4
///     }
/// }
///
/// assert_eq!(Fixed.delay_for_attempt(3), Duration::from_millis(250));
/// ```
pub trait BackoffStrategy: Send + Sync {
    /// Delay to wait after the failed attempt `attempt` (1-indexed) before
    /// starting the next one.
    fn delay_for_attempt(&self, attempt: u32) -> Duration;

    /// Total number of attempts allowed, including the first.
    ///
    /// The retry loop treats zero as one: an operation always gets at least
    /// one attempt.
    fn max_attempts(&self) -> u32;
}

impl<S: BackoffStrategy + ?Sized> BackoffStrategy for &S {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        (**self).delay_for_attempt(attempt)
    }

    fn max_attempts(&self) -> u32 {
        (**self).max_attempts()
    }
}
