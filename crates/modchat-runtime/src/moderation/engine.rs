//! ModerationEngine: single consumer of all chat traffic.
//!
//! ```text
//!            moderation bus
//!  Chat(g) ───────────────► ModerationEngine ──count_hits──► ViolationLedger
//!                                  │                               │
//!                                  │◄──────── crossed ─────────────┘
//!                                  ▼
//!  Removal(g) ◄──────────── RemovalCommand + RemovalReport
//! ```
//!
//! The engine reads with [`TopicFilter::ExceptRemoval`], so the commands it
//! posts stay queued for the owning session. It stops when the bus is
//! torn down and returns a [`ModerationSummary`].

use super::ledger::ViolationLedger;
use super::words::FilteredWordSet;
use crate::bus::{Bus, BusError};
use crate::transcript::{TranscriptEvent, TranscriptSender};
use modchat_event::{ChatEvent, Envelope, Message, RemovalCommand, TopicFilter};
use modchat_types::{ErrorCode, GroupId, UserId};
use serde::Serialize;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// One user crossing the threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct RemovalReport {
    /// Removed user.
    pub user: UserId,
    /// User's group.
    pub group: GroupId,
    /// Counter value at the crossing.
    pub violations: u32,
}

impl fmt::Display for RemovalReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "User {} from group {} has been removed due to {} violations.",
            self.user, self.group, self.violations
        )
    }
}

/// Per-pair counter in a [`ModerationSummary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CounterEntry {
    /// Group.
    pub group: GroupId,
    /// User.
    pub user: UserId,
    /// Cumulative distinct-word hits.
    pub violations: u32,
}

/// What the engine saw over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ModerationSummary {
    /// Chat events scored.
    pub processed: usize,
    /// Admin messages skipped.
    pub ignored_admin: usize,
    /// Envelopes whose topic and payload disagree.
    pub malformed: usize,
    /// Removals issued, in order.
    pub removals: Vec<RemovalReport>,
    /// Removal commands that could not be sent.
    pub failed_removals: usize,
    /// Final counters, sorted by (group, user).
    pub counters: Vec<CounterEntry>,
}

impl ModerationSummary {
    /// Counter for a pair, zero if never seen.
    #[must_use]
    pub fn violations(&self, group: GroupId, user: UserId) -> u32 {
        self.counters
            .iter()
            .find(|c| c.group == group && c.user == user)
            .map_or(0, |c| c.violations)
    }
}

/// See the [module docs](self).
#[derive(Debug)]
pub struct ModerationEngine {
    bus: Arc<Bus>,
    words: FilteredWordSet,
    ledger: ViolationLedger,
    transcript: Option<TranscriptSender>,
    summary: ModerationSummary,
}

impl ModerationEngine {
    /// Creates an engine reading `bus`.
    #[must_use]
    pub fn new(bus: Arc<Bus>, words: FilteredWordSet, threshold: u32) -> Self {
        Self {
            bus,
            words,
            ledger: ViolationLedger::new(threshold),
            transcript: None,
            summary: ModerationSummary::default(),
        }
    }

    /// Reports removals on `transcript` as well as in the log.
    #[must_use]
    pub fn with_transcript(mut self, transcript: TranscriptSender) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Consumes the bus until it is torn down.
    pub async fn run(mut self) -> ModerationSummary {
        info!(
            bus = %self.bus.key(),
            words = self.words.len(),
            threshold = self.ledger.threshold(),
            "Moderation engine started"
        );

        loop {
            match self.bus.receive(TopicFilter::ExceptRemoval).await {
                Ok(envelope) => self.handle_envelope(envelope).await,
                Err(BusError::Removed(_)) => break,
                Err(e) => {
                    error!(code = e.code(), error = %e, "Moderation bus failed");
                    break;
                }
            }
        }

        info!(
            processed = self.summary.processed,
            removals = self.summary.removals.len(),
            "Moderation engine stopped"
        );
        self.into_summary()
    }

    /// Handles one envelope taken from the bus.
    pub async fn handle_envelope(&mut self, envelope: Envelope) {
        if !envelope.is_consistent() {
            self.summary.malformed += 1;
            warn!(topic = %envelope.topic, "Skipped malformed message");
            return;
        }

        match envelope.message {
            Message::Admin(_) => self.summary.ignored_admin += 1,
            Message::Chat(chat) => self.score(&chat).await,
            Message::Removal(cmd) => {
                debug!(group = %cmd.group_id, user = %cmd.user_id, "Ignored removal command");
            }
        }
    }

    async fn score(&mut self, chat: &ChatEvent) {
        self.summary.processed += 1;
        let hits = self.words.count_hits(&chat.text);
        let assessment = self.ledger.record(chat.group_id, chat.user_id, hits);

        if hits > 0 {
            debug!(
                group = %chat.group_id,
                user = %chat.user_id,
                hits,
                total = assessment.after,
                "Violation recorded"
            );
        }
        if !assessment.crossed {
            return;
        }

        let report = RemovalReport {
            user: chat.user_id,
            group: chat.group_id,
            violations: assessment.after,
        };
        info!(group = %report.group, user = %report.user, violations = report.violations, "{report}");

        let command = RemovalCommand::new(chat.group_id, chat.user_id);
        if let Err(e) = self.bus.send(command).await {
            self.summary.failed_removals += 1;
            error!(code = e.code(), error = %e, group = %report.group, user = %report.user, "Removal command not sent");
        }

        if let Some(tx) = &self.transcript {
            let _ = tx.send(TranscriptEvent::UserRemoved(report));
        }
        self.summary.removals.push(report);
    }

    /// Current counter for a pair.
    #[must_use]
    pub fn violations(&self, group: GroupId, user: UserId) -> u32 {
        self.ledger.count(group, user)
    }

    fn into_summary(self) -> ModerationSummary {
        let mut summary = self.summary;
        let mut counters: Vec<CounterEntry> = self
            .ledger
            .counters()
            .iter()
            .map(|(&(group, user), &violations)| CounterEntry {
                group,
                user,
                violations,
            })
            .collect();
        counters.sort_by_key(|c| (c.group, c.user));
        summary.counters = counters;
        summary
    }
}
