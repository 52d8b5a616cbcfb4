//! Client-side validation for the account forms.
//!
//! Validation runs before any request reaches the identity provider, so bad
//! input fails fast with a field-level error instead of burning retries.
//!
//! Password strength is advisory: a password that meets the hard limits is
//! accepted, and [`validate_password`] returns [`PasswordSuggestion`]s the
//! form may display without blocking submission.
//!
//! # Examples
//!
//! ```rust
//! use portal::validation::{FormValidation, validate_email, validate_password};
//!
//! let outcome = FormValidation::new()
//!     .field("email", validate_email("ada@example"))
//!     .field("password", validate_password("hunter22"))
//!     .finish();
//!
//! let errors = outcome.unwrap_err();
//! assert_eq!(errors.len(), 1);
//! assert!(errors.get("email").is_some());
//! ```

use regex::Regex;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

/// Longest accepted email address.
pub const MAX_EMAIL_LENGTH: usize = 254;
/// Shortest accepted password.
pub const MIN_PASSWORD_LENGTH: usize = 6;
/// Password length below which a longer password is suggested.
pub const RECOMMENDED_PASSWORD_LENGTH: usize = 8;
/// Longest accepted password.
pub const MAX_PASSWORD_LENGTH: usize = 128;
/// Shortest accepted full name.
pub const MIN_FULL_NAME_LENGTH: usize = 2;
/// Longest accepted full name.
pub const MAX_FULL_NAME_LENGTH: usize = 100;
/// Shortest accepted username.
pub const MIN_USERNAME_LENGTH: usize = 3;
/// Longest accepted username.
pub const MAX_USERNAME_LENGTH: usize = 50;

static EMAIL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("valid email pattern"));
static FULL_NAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-ZÀ-ÿ\s'-]+$").expect("valid full name pattern"));
static USERNAME: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[a-zA-Z0-9_]+$").expect("valid username pattern"));
static SCRIPT_PROTOCOL: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)javascript:").expect("valid protocol pattern"));
static EVENT_HANDLER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)on\w+=").expect("valid handler pattern"));

/// A single field failed validation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    /// The field was empty.
    #[error("{} is required", label(.field))]
    Required {
        /// Field name
        field: &'static str,
    },

    /// The field does not have the expected shape.
    #[error("{} format is invalid", label(.field))]
    InvalidFormat {
        /// Field name
        field: &'static str,
    },

    /// The field is shorter than allowed.
    #[error("{} must be at least {min} characters", label(.field))]
    TooShort {
        /// Field name
        field: &'static str,
        /// Minimum length
        min: usize,
    },

    /// The field is longer than allowed.
    #[error("{} must be at most {max} characters", label(.field))]
    TooLong {
        /// Field name
        field: &'static str,
        /// Maximum length
        max: usize,
    },

    /// The field contains characters outside the allowed set.
    #[error("{} contains invalid characters", label(.field))]
    InvalidCharacters {
        /// Field name
        field: &'static str,
    },

    /// Password and confirmation differ.
    #[error("passwords do not match")]
    Mismatch,
}

/// Human-readable form of a field key.
fn label(field: &str) -> String {
    field.replace('_', " ")
}

impl ValidationError {
    /// Form key of the offending field.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Required { field }
            | Self::InvalidFormat { field }
            | Self::TooShort { field, .. }
            | Self::TooLong { field, .. }
            | Self::InvalidCharacters { field } => field,
            Self::Mismatch => "confirm_password",
        }
    }
}

/// Non-blocking advice for strengthening a password.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PasswordSuggestion {
    /// Shorter than the recommended length.
    UseLongerPassword,
    /// No uppercase letter.
    AddUppercase,
    /// No lowercase letter.
    AddLowercase,
    /// No digit.
    AddDigit,
}

impl fmt::Display for PasswordSuggestion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::UseLongerPassword => "Consider using at least 8 characters",
            Self::AddUppercase => "Add at least one uppercase letter",
            Self::AddLowercase => "Add at least one lowercase letter",
            Self::AddDigit => "Add at least one number",
        };
        f.write_str(text)
    }
}

/// Validate an email address.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
    const FIELD: &str = "email";

    if email.is_empty() {
        return Err(ValidationError::Required { field: FIELD });
    }
    if !EMAIL.is_match(email) {
        return Err(ValidationError::InvalidFormat { field: FIELD });
    }
    if email.chars().count() > MAX_EMAIL_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_EMAIL_LENGTH,
        });
    }
    Ok(())
}

/// Validate a password, returning advisory suggestions when it is accepted.
pub fn validate_password(password: &str) -> Result<Vec<PasswordSuggestion>, ValidationError> {
    const FIELD: &str = "password";

    let length = password.chars().count();
    if length == 0 {
        return Err(ValidationError::Required { field: FIELD });
    }
    if length < MIN_PASSWORD_LENGTH {
        return Err(ValidationError::TooShort {
            field: FIELD,
            min: MIN_PASSWORD_LENGTH,
        });
    }
    if length > MAX_PASSWORD_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_PASSWORD_LENGTH,
        });
    }

    let mut suggestions = Vec::new();
    if length < RECOMMENDED_PASSWORD_LENGTH {
        suggestions.push(PasswordSuggestion::UseLongerPassword);
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        suggestions.push(PasswordSuggestion::AddUppercase);
    }
    if !password.chars().any(|c| c.is_ascii_lowercase()) {
        suggestions.push(PasswordSuggestion::AddLowercase);
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        suggestions.push(PasswordSuggestion::AddDigit);
    }
    Ok(suggestions)
}

/// Check that a password confirmation matches the password.
pub fn validate_password_confirmation(
    password: &str,
    confirmation: &str,
) -> Result<(), ValidationError> {
    if password != confirmation {
        return Err(ValidationError::Mismatch);
    }
    Ok(())
}

/// Validate a person's full name.
pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
    const FIELD: &str = "full_name";

    let length = full_name.chars().count();
    if length == 0 {
        return Err(ValidationError::Required { field: FIELD });
    }
    if length < MIN_FULL_NAME_LENGTH {
        return Err(ValidationError::TooShort {
            field: FIELD,
            min: MIN_FULL_NAME_LENGTH,
        });
    }
    if length > MAX_FULL_NAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_FULL_NAME_LENGTH,
        });
    }
    if !FULL_NAME.is_match(full_name) {
        return Err(ValidationError::InvalidCharacters { field: FIELD });
    }
    Ok(())
}

/// Validate a public username.
pub fn validate_username(username: &str) -> Result<(), ValidationError> {
    const FIELD: &str = "username";

    let length = username.chars().count();
    if length == 0 {
        return Err(ValidationError::Required { field: FIELD });
    }
    if length < MIN_USERNAME_LENGTH {
        return Err(ValidationError::TooShort {
            field: FIELD,
            min: MIN_USERNAME_LENGTH,
        });
    }
    if length > MAX_USERNAME_LENGTH {
        return Err(ValidationError::TooLong {
            field: FIELD,
            max: MAX_USERNAME_LENGTH,
        });
    }
    if !USERNAME.is_match(username) {
        return Err(ValidationError::InvalidCharacters { field: FIELD });
    }
    Ok(())
}

/// Strip markup-like fragments from free text before it is stored.
///
/// Trims the input, drops `<` and `>`, `javascript:` and inline `on*=`
/// event handler prefixes. Not a substitute for output escaping.
pub fn sanitize_input(input: &str) -> String {
    let stripped: String = input.trim().chars().filter(|c| !matches!(c, '<' | '>')).collect();
    let stripped = SCRIPT_PROTOCOL.replace_all(&stripped, "");
    EVENT_HANDLER.replace_all(&stripped, "").into_owned()
}

/// Per-field errors collected from a whole form.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{} field(s) failed validation", .errors.len())]
pub struct FormErrors {
    errors: BTreeMap<&'static str, ValidationError>,
}

impl FormErrors {
    /// Error for `field`, if it failed.
    pub fn get(&self, field: &str) -> Option<&ValidationError> {
        self.errors.get(field)
    }

    /// Number of failing fields.
    pub fn len(&self) -> usize {
        self.errors.len()
    }

    /// Whether no field failed.
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    /// Failing fields in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &ValidationError)> {
        self.errors.iter().map(|(field, err)| (*field, err))
    }
}

/// Collects the outcome of every field so a form reports all errors at once.
#[derive(Debug, Default)]
pub struct FormValidation {
    checked: usize,
    errors: FormErrors,
}

impl FormValidation {
    /// Start an empty form check.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the outcome for `field`. The first failure per field wins.
    pub fn field<T>(mut self, field: &'static str, outcome: Result<T, ValidationError>) -> Self {
        self.checked += 1;
        if let Err(err) = outcome {
            debug!(field = %field, reason = %err, "form field failed validation");
            self.errors.errors.entry(field).or_insert(err);
        }
        self
    }

    /// Finish the check.
    pub fn finish(self) -> Result<(), FormErrors> {
        if self.errors.is_empty() {
            debug!(fields_validated = self.checked, "form validation passed");
            Ok(())
        } else {
            Err(self.errors)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("ada@example.com")]
    #[case("first.last+tag@sub.example.co")]
    fn test_valid_emails(#[case] email: &str) {
        assert_eq!(validate_email(email), Ok(()));
    }

    #[rstest]
    #[case("", ValidationError::Required { field: "email" })]
    #[case("ada@example", ValidationError::InvalidFormat { field: "email" })]
    #[case("ada example@x.io", ValidationError::InvalidFormat { field: "email" })]
    #[case("@example.com", ValidationError::InvalidFormat { field: "email" })]
    fn test_invalid_emails(#[case] email: &str, #[case] expected: ValidationError) {
        assert_eq!(validate_email(email), Err(expected));
    }

    #[test]
    fn test_email_too_long() {
        let email = format!("{}@example.com", "a".repeat(250));
        assert_eq!(
            validate_email(&email),
            Err(ValidationError::TooLong {
                field: "email",
                max: 254
            })
        );
    }

    #[test]
    fn test_password_limits() {
        assert_eq!(
            validate_password(""),
            Err(ValidationError::Required { field: "password" })
        );
        assert_eq!(
            validate_password("abc12"),
            Err(ValidationError::TooShort {
                field: "password",
                min: 6
            })
        );
        assert!(matches!(
            validate_password(&"a".repeat(129)),
            Err(ValidationError::TooLong { max: 128, .. })
        ));
    }

    #[test]
    fn test_weak_password_is_accepted_with_suggestions() {
        let suggestions = validate_password("abcdef").unwrap();
        assert_eq!(
            suggestions,
            vec![
                PasswordSuggestion::UseLongerPassword,
                PasswordSuggestion::AddUppercase,
                PasswordSuggestion::AddDigit,
            ]
        );
    }

    #[test]
    fn test_strong_password_has_no_suggestions() {
        assert!(validate_password("Tr0ub4dor&3").unwrap().is_empty());
    }

    #[rstest]
    #[case("Ada Lovelace")]
    #[case("Zoë O'Neil-Brontë")]
    fn test_valid_full_names(#[case] name: &str) {
        assert_eq!(validate_full_name(name), Ok(()));
    }

    #[rstest]
    #[case("", ValidationError::Required { field: "full_name" })]
    #[case("A", ValidationError::TooShort { field: "full_name", min: 2 })]
    #[case("R2-D2", ValidationError::InvalidCharacters { field: "full_name" })]
    fn test_invalid_full_names(#[case] name: &str, #[case] expected: ValidationError) {
        assert_eq!(validate_full_name(name), Err(expected));
    }

    #[rstest]
    #[case("ada_99", true)]
    #[case("ab", false)]
    #[case("ada.lovelace", false)]
    #[case("abcdefghijklmnopqrstuvwxyz_abcdefghijklmnopqrstuvwx", false)]
    fn test_usernames(#[case] username: &str, #[case] valid: bool) {
        assert_eq!(validate_username(username).is_ok(), valid);
    }

    #[test]
    fn test_password_confirmation() {
        assert_eq!(validate_password_confirmation("secret1", "secret1"), Ok(()));
        let err = validate_password_confirmation("secret1", "secret2").unwrap_err();
        assert_eq!(err, ValidationError::Mismatch);
        assert_eq!(err.field(), "confirm_password");
    }

    #[test]
    fn test_messages_use_readable_field_names() {
        let err = validate_full_name("").unwrap_err();
        assert_eq!(err.field(), "full_name");
        assert_eq!(err.to_string(), "full name is required");
        assert_eq!(
            validate_full_name("A").unwrap_err().to_string(),
            "full name must be at least 2 characters"
        );
    }

    #[rstest]
    #[case("  hello  ", "hello")]
    #[case("<b>bold</b>", "bbold/b")]
    #[case("JavaScript:alert(1)", "alert(1)")]
    #[case("img onerror=steal()", "img steal()")]
    fn test_sanitize_input(#[case] input: &str, #[case] expected: &str) {
        assert_eq!(sanitize_input(input), expected);
    }

    #[test]
    fn test_form_collects_every_failure() {
        let errors = FormValidation::new()
            .field("email", validate_email(""))
            .field("password", validate_password("abc"))
            .field("full_name", validate_full_name("Ada Lovelace"))
            .finish()
            .unwrap_err();

        assert_eq!(errors.len(), 2);
        assert_eq!(
            errors.get("email"),
            Some(&ValidationError::Required { field: "email" })
        );
        assert!(errors.get("full_name").is_none());
        assert_eq!(errors.to_string(), "2 field(s) failed validation");
    }

    #[test]
    fn test_form_keeps_first_failure_per_field() {
        let errors = FormValidation::new()
            .field("password", validate_password(""))
            .field("password", validate_password_confirmation("a", "b"))
            .finish()
            .unwrap_err();

        assert_eq!(
            errors.get("password"),
            Some(&ValidationError::Required { field: "password" })
        );
    }

    #[test]
    fn test_form_passes() {
        assert!(
            FormValidation::new()
                .field("email", validate_email("ada@example.com"))
                .finish()
                .is_ok()
        );
    }
}
