//! Group session errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`SessionError::Config`] | `SESSION_CONFIG` | No |
//! | [`SessionError::Bus`] | `SESSION_BUS` | No |
//! | [`SessionError::Agent`] | `SESSION_AGENT` | No |
//!
//! Record parse failures are not session errors; they are logged and the
//! record is dropped.

use crate::bus::BusError;
use crate::config::ConfigError;
use modchat_types::{ErrorCode, GroupId, UserId};
use thiserror::Error;

/// Fatal failure of one group session.
#[derive(Debug, Error)]
pub enum SessionError {
    /// The descriptor or a user script is missing or malformed.
    #[error("group config: {0}")]
    Config(#[from] ConfigError),

    /// A bus could not be attached, or was torn down mid-run.
    #[error("group bus: {0}")]
    Bus(#[from] BusError),

    /// A user agent task panicked or was cancelled.
    #[error("agent for user {user} in group {group} failed: {message}")]
    Agent {
        group: GroupId,
        user: UserId,
        message: String,
    },
}

impl SessionError {
    /// Creates an agent error.
    pub fn agent(group: GroupId, user: UserId, message: impl Into<String>) -> Self {
        Self::Agent {
            group,
            user,
            message: message.into(),
        }
    }
}

impl ErrorCode for SessionError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "SESSION_CONFIG",
            Self::Bus(_) => "SESSION_BUS",
            Self::Agent { .. } => "SESSION_AGENT",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bus::BusKey;
    use modchat_types::assert_error_codes;

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                SessionError::from(ConfigError::MissingFile("x".into())),
                SessionError::from(BusError::NotFound(BusKey::new(1))),
                SessionError::agent(GroupId::new(0), UserId::new(1), "panicked"),
            ],
            "SESSION_",
        );
    }

    #[test]
    fn wraps_source_message() {
        let err = SessionError::from(BusError::NotFound(BusKey::new(42)));
        assert!(err.to_string().contains("42"));
        assert!(!err.is_recoverable());
    }
}
