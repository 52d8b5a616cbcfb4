//! Exponential backoff with a delay ceiling and optional jitter.

use super::strategy::BackoffStrategy;
use std::time::Duration;

/// Exponential backoff schedule.
///
/// The wait after failed attempt `k` (1-indexed) is `base_delay * 2^(k-1)`,
/// capped at `max_delay`. Jitter, when configured, randomizes the capped
/// delay by up to `±jitter` of its value and is capped again.
///
/// # Mathematical Formula
///
/// ```text
/// base    = base_delay * 2^(k - 1)
/// capped  = min(base, max_delay)
/// delay   = min(capped + capped * jitter * random(-1, +1), max_delay)
/// ```
///
/// # Examples
///
/// ```rust
/// use portal_core::retry::{BackoffStrategy, ExponentialBackoff};
/// use std::time::Duration;
///
/// let backoff = ExponentialBackoff::builder()
///     .max_attempts(3)
///     .base_delay(Duration::from_millis(100))
///     .build();
///
/// assert_eq!(backoff.delay_for_attempt(1), Duration::from_millis(100));
/// assert_eq!(backoff.delay_for_attempt(2), Duration::from_millis(200));
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct ExponentialBackoff {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: f64,
}

impl ExponentialBackoff {
    /// Default number of attempts.
    pub const DEFAULT_MAX_ATTEMPTS: u32 = 3;
    /// Default base delay.
    pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);
    /// Default ceiling for a single wait.
    pub const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(10);

    /// Create a new builder for configuring exponential backoff.
    pub fn builder() -> ExponentialBackoffBuilder {
        ExponentialBackoffBuilder::default()
    }

    /// The base delay (wait after the first failed attempt).
    pub fn base_delay(&self) -> Duration {
        self.base_delay
    }

    /// The ceiling for a single wait.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// Jitter factor in `[0.0, 1.0]`.
    pub fn jitter(&self) -> f64 {
        self.jitter
    }
}

impl Default for ExponentialBackoff {
    /// Defaults:
    /// - `max_attempts`: 3
    /// - `base_delay`: 1s
    /// - `max_delay`: 10s
    /// - `jitter`: 0.0
    fn default() -> Self {
        Self {
            max_attempts: Self::DEFAULT_MAX_ATTEMPTS,
            base_delay: Self::DEFAULT_BASE_DELAY,
            max_delay: Self::DEFAULT_MAX_DELAY,
            jitter: 0.0,
        }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        let factor = 2_u32.saturating_pow(attempt.saturating_sub(1));
        let capped = self.base_delay.saturating_mul(factor).min(self.max_delay);

        if self.jitter <= 0.0 {
            return capped;
        }

        let base = capped.as_secs_f64();
        let jitter_amount = base * self.jitter * (rand::random::<f64>() - 0.5) * 2.0;
        Duration::from_secs_f64((base + jitter_amount).max(0.0)).min(self.max_delay)
    }

    fn max_attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Builder for [`ExponentialBackoff`].
#[derive(Debug, Default)]
pub struct ExponentialBackoffBuilder {
    max_attempts: Option<u32>,
    base_delay: Option<Duration>,
    max_delay: Option<Duration>,
    jitter: Option<f64>,
}

impl ExponentialBackoffBuilder {
    /// Set the total number of attempts, including the first.
    ///
    /// Values below one are raised to one.
    ///
    /// Default: 3
    pub fn max_attempts(mut self, max_attempts: u32) -> Self {
        self.max_attempts = Some(max_attempts.max(1));
        self
    }

    /// Set the wait after the first failed attempt.
    ///
    /// Default: 1s
    pub fn base_delay(mut self, delay: Duration) -> Self {
        self.base_delay = Some(delay);
        self
    }

    /// Set the ceiling for a single wait.
    ///
    /// Default: 10s
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the jitter factor, clamped to `[0.0, 1.0]`.
    ///
    /// Default: 0.0
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the [`ExponentialBackoff`], using defaults for unset values.
    pub fn build(self) -> ExponentialBackoff {
        ExponentialBackoff {
            max_attempts: self
                .max_attempts
                .unwrap_or(ExponentialBackoff::DEFAULT_MAX_ATTEMPTS),
            base_delay: self
                .base_delay
                .unwrap_or(ExponentialBackoff::DEFAULT_BASE_DELAY),
            max_delay: self
                .max_delay
                .unwrap_or(ExponentialBackoff::DEFAULT_MAX_DELAY),
            jitter: self.jitter.unwrap_or(0.0),
        }
    }
}
