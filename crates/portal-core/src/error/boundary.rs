/// Declare a conversion between two error types at a module boundary.
///
/// Expands to a `From` implementation so the `?` operator converts the inner
/// error into the outer one. Callers use it to fold retry failures,
/// validation failures and provider errors into a single application error.
///
/// # Example
///
/// ```
/// use portal_core::error_boundary;
/// use portal_core::error::RetryError;
/// use std::io;
///
/// #[derive(Debug, thiserror::Error)]
/// enum AccountError {
///     #[error("request failed after {attempts} attempts")]
///     Unavailable { attempts: u32 },
/// }
///
/// error_boundary!(RetryError<io::Error> => AccountError, |e| {
///     AccountError::Unavailable { attempts: e.attempts() }
/// });
///
/// fn refresh() -> Result<(), AccountError> {
///     let failed: Result<(), RetryError<io::Error>> =
///         Err(RetryError::Cancelled { attempts: 2 });
///     failed?;
///     Ok(())
/// }
///
/// assert!(matches!(refresh(), Err(AccountError::Unavailable { attempts: 2 })));
/// ```
#[macro_export]
macro_rules! error_boundary {
    ($inner:ty => $outer:ty, |$err:ident| $body:expr) => {
        impl ::std::convert::From<$inner> for $outer {
            fn from($err: $inner) -> $outer {
                $body
            }
        }
    };
}
