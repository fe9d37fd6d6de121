//! Record parsing errors.
//!
//! All variants concern a single chat record and are recoverable: the
//! session logs the error, drops the record and keeps reading.
//!
//! | Variant | Code |
//! |---------|------|
//! | [`EventError::Empty`] | `EVENT_EMPTY` |
//! | [`EventError::InvalidTimestamp`] | `EVENT_INVALID_TIMESTAMP` |
//! | [`EventError::MissingText`] | `EVENT_MISSING_TEXT` |
//! | [`EventError::ExtraTokens`] | `EVENT_EXTRA_TOKENS` |
//! | [`EventError::TextTooLong`] | `EVENT_TEXT_TOO_LONG` |

use modchat_types::ErrorCode;
use thiserror::Error;

/// Failure to parse one `<timestamp> <token>` record.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EventError {
    /// The record had no content.
    #[error("empty record")]
    Empty,

    /// The first field is not an integer.
    #[error("invalid timestamp: {0:?}")]
    InvalidTimestamp(String),

    /// Only a timestamp was present.
    #[error("record has a timestamp but no text")]
    MissingText,

    /// More than one whitespace-separated token followed the timestamp.
    #[error("expected a single text token, found {0}")]
    ExtraTokens(usize),

    /// The token exceeds the byte limit under the reject policy.
    #[error("text is {len} bytes, limit is {max}")]
    TextTooLong {
        /// Actual length in bytes.
        len: usize,
        /// Configured limit in bytes.
        max: usize,
    },
}

impl ErrorCode for EventError {
    fn code(&self) -> &'static str {
        match self {
            Self::Empty => "EVENT_EMPTY",
            Self::InvalidTimestamp(_) => "EVENT_INVALID_TIMESTAMP",
            Self::MissingText => "EVENT_MISSING_TEXT",
            Self::ExtraTokens(_) => "EVENT_EXTRA_TOKENS",
            Self::TextTooLong { .. } => "EVENT_TEXT_TOO_LONG",
        }
    }

    fn is_recoverable(&self) -> bool {
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                EventError::Empty,
                EventError::InvalidTimestamp("x".into()),
                EventError::MissingText,
                EventError::ExtraTokens(3),
                EventError::TextTooLong { len: 300, max: 255 },
            ],
            "EVENT_",
        );
    }

    #[test]
    fn parse_errors_are_recoverable() {
        assert!(EventError::MissingText.is_recoverable());
        assert!(EventError::TextTooLong { len: 1, max: 0 }.is_recoverable());
    }

    #[test]
    fn display_mentions_limit() {
        let err = EventError::TextTooLong { len: 300, max: 255 };
        assert!(err.to_string().contains("255"));
    }
}
