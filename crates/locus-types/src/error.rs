//! Unified error interface for locus.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so callers
//! get machine-readable codes and a retry hint without matching on
//! concrete types.
//!
//! # Code Format
//!
//! - **UPPER_SNAKE_CASE**, prefixed per crate: `SPEC_`, `LOCATION_`,
//!   `POOL_`, `REMOTE_`, `RESOLVE_`
//! - **Stable**: codes are part of the API contract and do not change
//!
//! # Recoverability
//!
//! An error is recoverable when retrying may succeed (a pool may free a
//! machine, a host may come back). Validation errors such as bad spec
//! syntax or an unknown resolver are never recoverable: they
//! are configuration or programming mistakes and retrying will not help.
//!
//! # Example
//!
//! ```
//! use locus_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum MyError {
//!     Exhausted,
//!     BadInput(String),
//! }
//!
//! impl ErrorCode for MyError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Exhausted => "MY_EXHAUSTED",
//!             Self::BadInput(_) => "MY_BAD_INPUT",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Exhausted)
//!     }
//! }
//!
//! assert_eq!(MyError::Exhausted.code(), "MY_EXHAUSTED");
//! assert!(MyError::Exhausted.is_recoverable());
//! ```
pub trait ErrorCode {
    /// Returns a machine-readable error code.
    ///
    /// UPPER_SNAKE_CASE, prefixed with the owning crate's domain, stable
    /// across versions.
    fn code(&self) -> &'static str;

    /// Returns whether retrying the failed operation may succeed.
    fn is_recoverable(&self) -> bool;
}

/// Validates that an error code follows locus conventions.
///
/// Checks the code is non-empty, carries the expected prefix, and is
/// UPPER_SNAKE_CASE.
///
/// # Panics
///
/// Panics with a descriptive message if validation fails. Intended for
/// tests.
pub fn assert_error_code<E: ErrorCode>(err: &E, expected_prefix: &str) {
    let code = err.code();

    assert!(!code.is_empty(), "Error code must not be empty");
    assert!(
        code.starts_with(expected_prefix),
        "Error code '{}' must start with prefix '{}'",
        code,
        expected_prefix
    );
    assert!(
        is_upper_snake_case(code),
        "Error code '{}' must be UPPER_SNAKE_CASE",
        code
    );
}

/// Validates every error in a slice with [`assert_error_code`].
///
/// Use this to verify all variants of an error enum at once.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

/// Checks if a string is UPPER_SNAKE_CASE.
fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }
    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
