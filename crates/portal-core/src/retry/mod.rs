//! Retryable operations: timeout race, retry with exponential backoff, and
//! the factory that binds an operation to a policy.
//!
//! # Key Types
//!
//! - [`RetryPolicy`] - attempt budget, base delay, delay ceiling, per-attempt timeout
//! - [`RetryableOperation`] - an operation bound to a policy, callable many times
//! - [`BackoffStrategy`] - the seam the retry loop schedules through
//! - [`ExponentialBackoff`] - `delay * 2^(attempt-1)`, capped
//!
//! # Examples
//!
//! ```rust
//! use portal_core::retry::{create_retryable_operation, RetryPolicy};
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let send_reset_mail = create_retryable_operation(
//!     |email: String| async move {
//!         // Call the identity provider here
//!         Ok::<_, std::io::Error>(format!("mail queued for {email}"))
//!     },
//!     RetryPolicy::new(3, Duration::from_millis(100), Duration::from_secs(15)),
//! );
//!
//! let receipt = send_reset_mail.call("ada@example.com".to_string()).await?;
//! assert!(receipt.contains("ada@example.com"));
//! # Ok(())
//! # }
//! ```

mod exponential;
mod operation;
mod policy;
mod strategy;
mod timeout;

pub use exponential::{ExponentialBackoff, ExponentialBackoffBuilder};
pub use operation::{
    RetryableOperation, create_retryable_operation, retry_operation,
    retry_operation_with_cancel, retry_with_strategy,
};
pub use policy::{RetryPolicy, RetryPolicyBuilder};
pub use strategy::BackoffStrategy;
pub use timeout::with_timeout;
