#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Core primitives for the Portal account toolkit.
//!
//! Every network-facing call the account flows make (sign-up, password
//! reset, profile updates) goes through the same small combinator: bound
//! each attempt with a timeout, retry failures with exponential backoff, and
//! surface a classified error once the attempt budget is spent.
//!
//! - **Timeout race** via [`retry::with_timeout`]
//! - **Retry with backoff** via [`retry::retry_operation`] and the
//!   [`retry::BackoffStrategy`] seam
//! - **Reusable retryable callables** via [`retry::create_retryable_operation`]
//! - **Cancellation** via [`cancel::CancelSignal`] / [`cancel::CancelToken`]
//! - **Error taxonomy** in [`error`], plus the `error_boundary!` macro for
//!   folding these errors into an application error
//!
//! # Examples
//!
//! ```rust
//! use portal_core::prelude::*;
//! use std::time::Duration;
//!
//! # #[tokio::main(flavor = "current_thread")]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let policy = RetryPolicy::builder()
//!     .max_retries(3)
//!     .delay(Duration::from_millis(100))
//!     .timeout(Duration::from_secs(1))
//!     .build();
//!
//! let value = retry_operation(&policy, || async {
//!     Ok::<_, std::io::Error>(42)
//! }).await?;
//! assert_eq!(value, 42);
//! # Ok(())
//! # }
//! ```

pub mod cancel;
pub mod error;
pub mod retry;

/// Convenient re-exports of commonly used items.
///
/// ```rust
/// use portal_core::prelude::*;
/// ```
pub mod prelude {
    pub use crate::cancel::{CancelSignal, CancelToken, cancel_pair};
    pub use crate::error::{AttemptError, RetryError, TimeoutError};
    pub use crate::error_boundary;
    pub use crate::retry::{
        BackoffStrategy, ExponentialBackoff, RetryPolicy, RetryableOperation,
        create_retryable_operation, retry_operation, retry_operation_with_cancel, with_timeout,
    };
}
