//! Message bus layer.
//!
//! # Architecture
//!
//! ```text
//! ┌──────────────────────────── BusRegistry ────────────────────────────┐
//! │  key → Arc<Bus>                                                      │
//! │                                                                      │
//! │  validation_key ──► Bus  (Admin + Chat copies for validation)        │
//! │  app_key        ──► Bus  (GroupTerminated for the orchestrator)      │
//! │  moderator_key  ──► Bus  (Chat copies in, Removal(g) out)            │
//! └──────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! - [`BusRegistry`]: open-or-create / attach by key, teardown
//! - [`Bus`]: bounded FIFO with topic-filtered receive
//! - [`BusError`]: `BUS_*` error codes

#[allow(clippy::module_inception)]
mod bus;
mod error;
mod registry;

pub use bus::{Bus, BusOptions, DEFAULT_CAPACITY, DEFAULT_SEND_TIMEOUT};
pub use error::BusError;
pub use registry::{BusRegistry, OpenMode};

use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer key a bus is opened under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BusKey(i64);

impl BusKey {
    /// Wraps a raw key.
    #[must_use]
    pub const fn new(raw: i64) -> Self {
        Self(raw)
    }

    /// Returns the raw key.
    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }
}

impl fmt::Display for BusKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
