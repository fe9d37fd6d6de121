//! Shared error-code interface.
//!
//! Every error enum in the workspace implements [`ErrorCode`] so the
//! binary (and tests) can match on a stable, machine-readable code
//! instead of a display string.
//!
//! # Example
//!
//! ```
//! use modchat_types::ErrorCode;
//!
//! #[derive(Debug)]
//! enum StreamError {
//!     Closed,
//!     Full,
//! }
//!
//! impl ErrorCode for StreamError {
//!     fn code(&self) -> &'static str {
//!         match self {
//!             Self::Closed => "STREAM_CLOSED",
//!             Self::Full => "STREAM_FULL",
//!         }
//!     }
//!
//!     fn is_recoverable(&self) -> bool {
//!         matches!(self, Self::Full)
//!     }
//! }
//!
//! assert_eq!(StreamError::Full.code(), "STREAM_FULL");
//! assert!(!StreamError::Closed.is_recoverable());
//! ```

/// Stable error code plus recoverability.
///
/// # Code Format
///
/// - `UPPER_SNAKE_CASE`
/// - prefixed with the layer that raised it (`BUS_`, `CONFIG_`,
///   `SESSION_`, `MODERATION_`, ...)
/// - never renamed once published
///
/// # Recoverability
///
/// A recoverable error affects one record or one message and processing
/// continues (a malformed chat line, a full bus). A non-recoverable error
/// ends the component that hit it (a missing config file, a bus that was
/// never created).
pub trait ErrorCode {
    /// Returns the machine-readable error code.
    fn code(&self) -> &'static str;

    /// Returns whether the caller can drop the offending item and keep going.
    fn is_recoverable(&self) -> bool;
}

/// Asserts that an error code is non-empty, carries `expected_prefix`
/// and is `UPPER_SNAKE_CASE`.
///
/// # Panics
///
/// Panics with a descriptive message if any check fails.
///
/// # Example
///
/// ```
/// use modchat_types::{assert_error_code, ErrorCode};
///
/// struct Timeout;
///
/// impl ErrorCode for Timeout {
///     fn code(&self) -> &'static str { "BUS_TIMEOUT" }
///     fn is_recoverable(&self) -> bool { true }
/// }
///
/// assert_error_code(&Timeout, "BUS_");
/// ```
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

/// Runs [`assert_error_code`] over every variant in `errors`.
pub fn assert_error_codes<E: ErrorCode>(errors: &[E], expected_prefix: &str) {
    for err in errors {
        assert_error_code(err, expected_prefix);
    }
}

fn is_upper_snake_case(s: &str) -> bool {
    if s.is_empty() || s.starts_with('_') || s.ends_with('_') || s.contains("__") {
        return false;
    }

    s.chars()
        .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
