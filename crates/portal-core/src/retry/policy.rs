//! Retry policy: attempt budget, backoff and per-attempt timeout.

use super::exponential::ExponentialBackoff;
use super::strategy::BackoffStrategy;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// The full policy a retryable operation runs under.
///
/// `max_retries` is the total number of attempts (at least one), `delay` the
/// base backoff unit, and `timeout` the bound on each individual attempt.
/// The policy is immutable once built and cheap to clone.
///
/// Durations serialize as integer milliseconds, so a policy can live in a
/// configuration file:
///
/// ```rust
/// use portal_core::retry::RetryPolicy;
/// use std::time::Duration;
///
/// let policy: RetryPolicy = serde_json::from_str(
///     r#"{ "max_retries": 3, "delay_ms": 100, "timeout_ms": 1000 }"#,
/// ).unwrap();
///
/// assert_eq!(policy.max_retries(), 3);
/// assert_eq!(policy.delay(), Duration::from_millis(100));
/// assert_eq!(policy.timeout(), Some(Duration::from_secs(1)));
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    max_retries: u32,
    #[serde(rename = "delay_ms", with = "duration_ms")]
    delay: Duration,
    #[serde(rename = "timeout_ms", with = "optional_duration_ms")]
    timeout: Option<Duration>,
    #[serde(rename = "max_delay_ms", with = "duration_ms")]
    max_delay: Duration,
    jitter: f64,
}

impl RetryPolicy {
    /// Default per-attempt timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Create a policy from the three core knobs, keeping defaults for the
    /// delay ceiling and jitter.
    pub fn new(max_retries: u32, delay: Duration, timeout: Duration) -> Self {
        Self::builder()
            .max_retries(max_retries)
            .delay(delay)
            .timeout(timeout)
            .build()
    }

    /// Create a new builder.
    pub fn builder() -> RetryPolicyBuilder {
        RetryPolicyBuilder::default()
    }

    /// Total number of attempts allowed (never below one).
    pub fn max_retries(&self) -> u32 {
        self.max_retries.max(1)
    }

    /// Base backoff unit.
    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Per-attempt timeout, if any.
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Ceiling for a single inter-attempt wait.
    pub fn max_delay(&self) -> Duration {
        self.max_delay
    }

    /// The backoff schedule this policy waits on.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff::builder()
            .max_attempts(self.max_retries())
            .base_delay(self.delay)
            .max_delay(self.max_delay)
            .jitter(self.jitter)
            .build()
    }

    /// Copy of this policy with a different per-attempt timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Copy of this policy with a different attempt budget.
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }
}

impl Default for RetryPolicy {
    /// Defaults: 3 attempts, 1s base delay, 10s timeout, 10s delay ceiling, no jitter.
    fn default() -> Self {
        Self {
            max_retries: ExponentialBackoff::DEFAULT_MAX_ATTEMPTS,
            delay: ExponentialBackoff::DEFAULT_BASE_DELAY,
            timeout: Some(Self::DEFAULT_TIMEOUT),
            max_delay: ExponentialBackoff::DEFAULT_MAX_DELAY,
            jitter: 0.0,
        }
    }
}

impl BackoffStrategy for RetryPolicy {
    fn delay_for_attempt(&self, attempt: u32) -> Duration {
        self.backoff().delay_for_attempt(attempt)
    }

    fn max_attempts(&self) -> u32 {
        self.max_retries()
    }
}

/// Builder for [`RetryPolicy`].
#[derive(Debug, Default)]
pub struct RetryPolicyBuilder {
    max_retries: Option<u32>,
    delay: Option<Duration>,
    timeout: Option<Option<Duration>>,
    max_delay: Option<Duration>,
    jitter: Option<f64>,
}

impl RetryPolicyBuilder {
    /// Set the total number of attempts. Values below one are raised to one.
    pub fn max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = Some(max_retries.max(1));
        self
    }

    /// Set the base backoff unit.
    pub fn delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    /// Bound every attempt by `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(Some(timeout));
        self
    }

    /// Let attempts run without a timeout.
    pub fn no_timeout(mut self) -> Self {
        self.timeout = Some(None);
        self
    }

    /// Set the ceiling for a single inter-attempt wait.
    pub fn max_delay(mut self, delay: Duration) -> Self {
        self.max_delay = Some(delay);
        self
    }

    /// Set the jitter factor, clamped to `[0.0, 1.0]`.
    pub fn jitter(mut self, jitter: f64) -> Self {
        self.jitter = Some(jitter.clamp(0.0, 1.0));
        self
    }

    /// Build the policy, using defaults for unset values.
    pub fn build(self) -> RetryPolicy {
        let defaults = RetryPolicy::default();
        RetryPolicy {
            max_retries: self.max_retries.unwrap_or(defaults.max_retries),
            delay: self.delay.unwrap_or(defaults.delay),
            timeout: self.timeout.unwrap_or(defaults.timeout),
            max_delay: self.max_delay.unwrap_or(defaults.max_delay),
            jitter: self.jitter.unwrap_or(defaults.jitter),
        }
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}

mod optional_duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(
        value: &Option<Duration>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        match value {
            Some(duration) => serializer.serialize_some(&(duration.as_millis() as u64)),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<Duration>, D::Error> {
        Option::<u64>::deserialize(deserializer).map(|ms| ms.map(Duration::from_millis))
    }
}
