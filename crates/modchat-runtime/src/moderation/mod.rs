//! Centralized moderation.
//!
//! - [`ModerationEngine`]: the bus consumer
//! - [`FilteredWordSet`]: lowercase substring list
//! - [`ViolationLedger`]: per-(group, user) counters and threshold crossing
//! - [`ModerationError`]: `MODERATION_*` error codes

mod engine;
mod error;
mod ledger;
mod words;

pub use engine::{CounterEntry, ModerationEngine, ModerationSummary, RemovalReport};
pub use error::ModerationError;
pub use ledger::{Assessment, ViolationLedger};
pub use words::FilteredWordSet;
