//! Error taxonomy for retryable operations.
//!
//! Three layers of failure exist:
//!
//! - [`TimeoutError`]: a single attempt exceeded its allotted duration.
//! - [`AttemptError`]: the outcome of one failed attempt, either a timeout or
//!   the operation's own error passed through untouched.
//! - [`RetryError`]: the terminal failure surfaced to the caller once the
//!   policy gives up. It always records how many attempts were made, so it can
//!   be told apart from a raw operation error.

mod boundary;

use std::time::Duration;
use thiserror::Error;

/// An attempt did not settle within its timeout.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("operation timed out after {}ms", .after.as_millis())]
pub struct TimeoutError {
    /// The timeout that elapsed.
    pub after: Duration,
}

/// Failure of a single attempt.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    /// The attempt lost the race against its timer.
    #[error(transparent)]
    Timeout(#[from] TimeoutError),

    /// The operation itself failed.
    #[error("{0}")]
    Operation(E),
}

impl<E> AttemptError<E> {
    /// Whether this attempt failed by timing out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Timeout(_))
    }

    /// The operation's own error, if the attempt did not time out.
    pub fn operation_error(&self) -> Option<&E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Timeout(_) => None,
        }
    }

    /// Consume the attempt error, returning the operation's error if any.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Operation(err) => Some(err),
            Self::Timeout(_) => None,
        }
    }
}

/// Terminal failure of a retryable operation.
#[derive(Debug, Error)]
pub enum RetryError<E> {
    /// Every allowed attempt failed.
    #[error("operation failed after {attempts} attempts: {last}")]
    Exhausted {
        /// Number of attempts performed.
        attempts: u32,
        /// Failure of the final attempt.
        last: AttemptError<E>,
    },

    /// A cancellation signal fired before the operation could finish.
    #[error("operation cancelled after {attempts} {}", attempt_noun(.attempts))]
    Cancelled {
        /// Number of attempts started before cancellation.
        attempts: u32,
    },
}

fn attempt_noun(attempts: &u32) -> &'static str {
    if *attempts == 1 { "attempt" } else { "attempts" }
}

impl<E> RetryError<E> {
    /// Number of attempts started before the operation gave up.
    pub fn attempts(&self) -> u32 {
        match self {
            Self::Exhausted { attempts, .. } | Self::Cancelled { attempts } => *attempts,
        }
    }

    /// Whether the final attempt timed out.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Exhausted { last, .. } if last.is_timeout())
    }

    /// Whether the operation was cancelled.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled { .. })
    }

    /// Failure of the final attempt, if the policy ran out of attempts.
    pub fn last_error(&self) -> Option<&AttemptError<E>> {
        match self {
            Self::Exhausted { last, .. } => Some(last),
            Self::Cancelled { .. } => None,
        }
    }

    /// Consume the error, returning the final operation error if there was one.
    pub fn into_operation_error(self) -> Option<E> {
        match self {
            Self::Exhausted { last, .. } => last.into_operation_error(),
            Self::Cancelled { .. } => None,
        }
    }
}
