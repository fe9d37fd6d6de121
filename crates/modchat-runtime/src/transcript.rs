//! Human-readable run transcript.
//!
//! Components push [`TranscriptEvent`]s on an unbounded channel; the binary
//! prints one line per event on stdout while logs go to stderr.
//!
//! ```text
//! Spawned group 0
//! User 1 from group 0 has been removed due to 3 violations.
//! All users terminated. Exiting group process 0.
//! ```

use crate::moderation::RemovalReport;
use modchat_types::GroupId;
use serde::Serialize;
use std::fmt;
use tokio::sync::mpsc;

/// Sending half of the transcript channel.
pub type TranscriptSender = mpsc::UnboundedSender<TranscriptEvent>;

/// Receiving half of the transcript channel.
pub type TranscriptReceiver = mpsc::UnboundedReceiver<TranscriptEvent>;

/// Creates a transcript channel.
#[must_use]
pub fn transcript_channel() -> (TranscriptSender, TranscriptReceiver) {
    mpsc::unbounded_channel()
}

/// One transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum TranscriptEvent {
    /// The orchestrator spawned a group session.
    GroupSpawned {
        /// Spawned group.
        group: GroupId,
    },
    /// The orchestrator received a group's `Terminated` event.
    GroupTerminated {
        /// Terminated group.
        group: GroupId,
        /// Users removed in that group.
        removed: u32,
    },
    /// Moderation removed a user.
    UserRemoved(RemovalReport),
}

impl fmt::Display for TranscriptEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupSpawned { group } => write!(f, "Spawned group {group}"),
            Self::GroupTerminated { group, .. } => {
                write!(f, "All users terminated. Exiting group process {group}.")
            }
            Self::UserRemoved(report) => report.fmt(f),
        }
    }
}
