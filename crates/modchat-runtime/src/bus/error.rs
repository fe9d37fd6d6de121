//! Bus errors.
//!
//! | Variant | Code | Recoverable |
//! |---------|------|-------------|
//! | [`BusError::NotFound`] | `BUS_NOT_FOUND` | No |
//! | [`BusError::Removed`] | `BUS_REMOVED` | No |
//! | [`BusError::Full`] | `BUS_FULL` | Yes |
//!
//! `Full` means one send gave up after the configured timeout; the
//! caller drops that message and carries on. The other two end the
//! component that hit them.

use super::BusKey;
use modchat_types::ErrorCode;
use thiserror::Error;

/// Bus layer error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BusError {
    /// Attach-only open of a key nobody created.
    #[error("no bus exists for key {0}")]
    NotFound(BusKey),

    /// The bus was torn down.
    #[error("bus {0} has been removed")]
    Removed(BusKey),

    /// The bus stayed at capacity for the whole send timeout.
    #[error("bus {key} is full ({capacity} messages)")]
    Full {
        /// Bus key.
        key: BusKey,
        /// Configured capacity.
        capacity: usize,
    },
}

impl ErrorCode for BusError {
    fn code(&self) -> &'static str {
        match self {
            Self::NotFound(_) => "BUS_NOT_FOUND",
            Self::Removed(_) => "BUS_REMOVED",
            Self::Full { .. } => "BUS_FULL",
        }
    }

    fn is_recoverable(&self) -> bool {
        matches!(self, Self::Full { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_types::assert_error_codes;

    fn all_variants() -> Vec<BusError> {
        vec![
            BusError::NotFound(BusKey::new(1)),
            BusError::Removed(BusKey::new(1)),
            BusError::Full {
                key: BusKey::new(1),
                capacity: 8,
            },
        ]
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(&all_variants(), "BUS_");
    }

    #[test]
    fn only_full_is_recoverable() {
        let recoverable: Vec<_> = all_variants()
            .into_iter()
            .filter(|e| e.is_recoverable())
            .collect();
        assert_eq!(recoverable.len(), 1);
        assert_eq!(recoverable[0].code(), "BUS_FULL");
    }
}
