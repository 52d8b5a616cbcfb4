#![deny(unsafe_code)]
#![warn(missing_docs)]

//! Resilient account flows for applications backed by a hosted identity
//! provider.
//!
//! Portal sits between a UI and an identity backend. Each flow validates its
//! input, refuses early while offline, runs the provider call with a timeout
//! and exponential-backoff retries (from [`portal_core`]), and reports
//! failures as a classified [`AppError`] with presentation advice.
//!
//! # Modules
//!
//! - [`account`] - sign-up, login, OAuth, logout, password reset, profile updates
//! - [`baas`] - the [`IdentityProvider`](baas::IdentityProvider) seam
//! - [`operation`] - a stateful runner with auto-retry for UI layers
//! - [`network`] - connectivity, health probes, a retrying fetch wrapper
//! - [`validation`] - form validation and input sanitizing
//! - [`config`] - configuration, optionally from the environment
//! - [`error`] - [`AppError`], [`ErrorCode`] and error advice
//!
//! # Examples
//!
//! ```rust
//! use portal::validation::validate_email;
//! use portal::{AppError, ErrorCode};
//!
//! let err: AppError = validate_email("not-an-email").unwrap_err().into();
//! assert_eq!(err.code(), ErrorCode::Validation);
//! assert!(!err.advice().should_retry);
//! ```

pub mod account;
pub mod baas;
pub mod config;
pub mod error;
pub mod network;
pub mod observability;
pub mod operation;
pub mod validation;

pub use account::{AccountService, SignUpForm};
pub use config::PortalConfig;
pub use error::{AppError, ErrorAdvice, ErrorCode, Result};
pub use operation::{NetworkOperation, OperationOptions, OperationState};

pub use portal_core;
