//! Chat records on a user stream.
//!
//! A user agent writes one record per line onto its private stream:
//!
//! ```text
//! <timestamp> <token>\n
//! ```
//!
//! The group session parses each line with a [`RecordParser`]. Lines that
//! do not parse are dropped by the caller; they never reach the bus.

use crate::error::EventError;
use crate::message::ChatEvent;
use modchat_types::{GroupId, UserId};
use serde::{Deserialize, Serialize};

/// Default text limit in bytes.
pub const DEFAULT_MAX_TEXT_BYTES: usize = 255;

/// What to do with a token longer than the limit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TextPolicy {
    /// Drop the record with [`EventError::TextTooLong`].
    #[default]
    Reject,
    /// Keep the longest valid UTF-8 prefix within the limit and flag it.
    Truncate,
}

/// A parsed `(timestamp, token)` pair.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRecord {
    /// Logical timestamp.
    pub timestamp: i64,
    /// The token, possibly truncated.
    pub text: String,
    /// `true` if [`TextPolicy::Truncate`] shortened the token.
    pub truncated: bool,
}

impl ChatRecord {
    /// Attributes this record to a sender.
    #[must_use]
    pub fn into_event(self, group_id: GroupId, user_id: UserId) -> ChatEvent {
        ChatEvent {
            group_id,
            user_id,
            timestamp: self.timestamp,
            text: self.text,
            truncated: self.truncated,
        }
    }
}

/// Formats a record as a stream line, newline included.
///
/// ```
/// use modchat_event::encode_record;
///
/// assert_eq!(encode_record(12, "hi"), "12 hi\n");
/// ```
#[must_use]
pub fn encode_record(timestamp: i64, text: &str) -> String {
    format!("{timestamp} {text}\n")
}

/// Parses stream lines into [`ChatRecord`]s.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RecordParser {
    max_text_bytes: usize,
    policy: TextPolicy,
}

impl RecordParser {
    /// Creates a parser with the given limit and overlong-text policy.
    #[must_use]
    pub fn new(max_text_bytes: usize, policy: TextPolicy) -> Self {
        Self {
            max_text_bytes,
            policy,
        }
    }

    /// Parses one line.
    ///
    /// # Errors
    ///
    /// Returns an [`EventError`] when the line is empty, the timestamp is
    /// not an integer, the token is missing or followed by more tokens, or
    /// the token is too long under [`TextPolicy::Reject`].
    ///
    /// # Example
    ///
    /// ```
    /// use modchat_event::{RecordParser, TextPolicy};
    ///
    /// let parser = RecordParser::new(4, TextPolicy::Truncate);
    /// let rec = parser.parse("7 abcdef").unwrap();
    /// assert_eq!(rec.timestamp, 7);
    /// assert_eq!(rec.text, "abcd");
    /// assert!(rec.truncated);
    ///
    /// assert!(parser.parse("seven abc").is_err());
    /// ```
    pub fn parse(&self, line: &str) -> Result<ChatRecord, EventError> {
        let mut fields = line.split_whitespace();

        let ts_field = fields.next().ok_or(EventError::Empty)?;
        let timestamp = ts_field
            .parse::<i64>()
            .map_err(|_| EventError::InvalidTimestamp(ts_field.to_string()))?;

        let token = fields.next().ok_or(EventError::MissingText)?;

        let extra = fields.count();
        if extra > 0 {
            return Err(EventError::ExtraTokens(extra + 1));
        }

        let (text, truncated) = self.apply_limit(token)?;
        Ok(ChatRecord {
            timestamp,
            text,
            truncated,
        })
    }

    fn apply_limit(&self, token: &str) -> Result<(String, bool), EventError> {
        if token.len() <= self.max_text_bytes {
            return Ok((token.to_string(), false));
        }

        match self.policy {
            TextPolicy::Reject => Err(EventError::TextTooLong {
                len: token.len(),
                max: self.max_text_bytes,
            }),
            TextPolicy::Truncate => {
                let mut end = self.max_text_bytes;
                while !token.is_char_boundary(end) {
                    end -= 1;
                }
                Ok((token[..end].to_string(), true))
            }
        }
    }
}

impl Default for RecordParser {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_TEXT_BYTES, TextPolicy::Reject)
    }
}
