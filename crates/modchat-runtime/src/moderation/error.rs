//! Moderation engine errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`ModerationError::Config`] | `MODERATION_CONFIG` | No |
//! | [`ModerationError::Bus`] | `MODERATION_BUS` | No |
//!
//! Both only occur while the engine is being set up. Once running, the
//! engine logs failures and keeps going until its bus is torn down.

use crate::bus::BusError;
use crate::config::ConfigError;
use modchat_types::ErrorCode;
use thiserror::Error;

/// Moderation setup failure.
#[derive(Debug, Error)]
pub enum ModerationError {
    /// The filtered-words file could not be loaded.
    #[error("moderation config: {0}")]
    Config(#[from] ConfigError),

    /// The moderation bus could not be opened.
    #[error("moderation bus: {0}")]
    Bus(#[from] BusError),
}

impl ErrorCode for ModerationError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "MODERATION_CONFIG",
            Self::Bus(_) => "MODERATION_BUS",
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
                ModerationError::from(ConfigError::MissingFile("filtered_words.txt".into())),
                ModerationError::from(BusError::NotFound(BusKey::new(7))),
            ],
            "MODERATION_",
        );
    }
}
