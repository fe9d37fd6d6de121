//! Orchestrator: spawns group sessions and waits for them to terminate.
//!
//! # Lifecycle
//!
//! ```text
//! preflight ──► create app bus ──► spawn sessions ──► await n Terminated ──► teardown
//!   │                                   │                    ▲
//!   │ CONFIG_*                          └── session error ───┤ abort run
//!   ▼                                                        │
//! fail before anything is spawned                     teardown always runs
//! ```
//!
//! Preflight validates the group count and loads every group descriptor,
//! which checks that every user script exists. Teardown removes the app,
//! moderation and validation buses, which is what ends the moderation
//! engine and the validation sink.

use crate::bus::{BusError, BusRegistry, OpenMode};
use crate::config::{ConfigError, GroupDescriptor, LimitsConfig, SimConfig, TestcaseConfig};
use crate::session::{run_group_session, SessionError, SessionParams, SessionReport};
use crate::transcript::{TranscriptEvent, TranscriptSender};
use modchat_event::{AdminKind, Message, Topic, TopicFilter};
use modchat_types::{ErrorCode, GroupId};
use serde::Serialize;
use thiserror::Error;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Orchestrator failure.
///
/// | Variant | Code |
/// |---------|------|
/// | [`OrchestratorError::Config`] | `ORCHESTRATOR_CONFIG` |
/// | [`OrchestratorError::Bus`] | `ORCHESTRATOR_BUS` |
/// | [`OrchestratorError::Session`] | `ORCHESTRATOR_SESSION` |
/// | [`OrchestratorError::Join`] | `ORCHESTRATOR_JOIN` |
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Preflight rejected the testcase.
    #[error("testcase: {0}")]
    Config(#[from] ConfigError),

    /// The app bus failed.
    #[error("app bus: {0}")]
    Bus(#[from] BusError),

    /// A group session failed.
    #[error("group {group}: {source}")]
    Session {
        group: GroupId,
        #[source]
        source: SessionError,
    },

    /// A group session task panicked or was cancelled.
    #[error("group session task failed: {0}")]
    Join(String),
}

impl ErrorCode for OrchestratorError {
    fn code(&self) -> &'static str {
        match self {
            Self::Config(_) => "ORCHESTRATOR_CONFIG",
            Self::Bus(_) => "ORCHESTRATOR_BUS",
            Self::Session { .. } => "ORCHESTRATOR_SESSION",
            Self::Join(_) => "ORCHESTRATOR_JOIN",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// One observed `Terminated` event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct GroupOutcome {
    /// Terminated group.
    pub group: GroupId,
    /// Users removed in it.
    pub removed: u32,
}

/// Result of a complete run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationReport {
    /// Testcase identifier.
    pub testcase: String,
    /// `Terminated` events in arrival order.
    pub terminations: Vec<GroupOutcome>,
    /// Session reports, sorted by group.
    pub sessions: Vec<SessionReport>,
}

impl SimulationReport {
    /// Total users removed across all groups.
    #[must_use]
    pub fn total_removed(&self) -> u32 {
        self.terminations.iter().map(|t| t.removed).sum()
    }
}

type SessionResult = (GroupId, Result<SessionReport, SessionError>);

/// Validates `testcase` against `limits` without touching any bus.
///
/// Checks the bus keys and group count, then loads every group
/// descriptor, which checks the user count and that every script exists.
///
/// # Errors
///
/// The first [`ConfigError`] found.
pub fn preflight(testcase: &TestcaseConfig, limits: &LimitsConfig) -> Result<(), ConfigError> {
    testcase.validate(limits)?;
    for path in &testcase.group_files {
        GroupDescriptor::load(path, &testcase.dir, limits)?;
    }
    Ok(())
}

/// See the [module docs](self).
#[derive(Debug)]
pub struct Orchestrator {
    testcase: TestcaseConfig,
    config: SimConfig,
    registry: BusRegistry,
    transcript: Option<TranscriptSender>,
}

impl Orchestrator {
    /// Creates an orchestrator for `testcase` on `registry`.
    #[must_use]
    pub fn new(testcase: TestcaseConfig, config: SimConfig, registry: BusRegistry) -> Self {
        Self {
            testcase,
            config,
            registry,
            transcript: None,
        }
    }

    /// Emits spawn and termination lines on `transcript`.
    #[must_use]
    pub fn with_transcript(mut self, transcript: TranscriptSender) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Validates the testcase without spawning anything.
    ///
    /// # Errors
    ///
    /// [`OrchestratorError::Config`] on a capacity violation or a missing
    /// or malformed descriptor or user script.
    pub fn preflight(&self) -> Result<(), OrchestratorError> {
        Ok(preflight(&self.testcase, &self.config.limits)?)
    }

    /// Runs every group to termination, then tears the buses down.
    ///
    /// Teardown runs whether or not the run succeeded.
    ///
    /// # Errors
    ///
    /// Any [`OrchestratorError`]; a failing session aborts the others.
    pub async fn run(self) -> Result<SimulationReport, OrchestratorError> {
        let result = self.drive().await;
        self.teardown();
        if let Err(e) = &result {
            error!(code = e.code(), error = %e, "Simulation aborted");
        }
        result
    }

    async fn drive(&self) -> Result<SimulationReport, OrchestratorError> {
        self.preflight()?;

        let app = self
            .registry
            .open(self.testcase.app_key, OpenMode::CreateOrAttach)?;
        let mut sessions: JoinSet<SessionResult> = JoinSet::new();

        for (index, descriptor) in (0u32..).zip(&self.testcase.group_files) {
            let group = GroupId::new(index);
            let params = SessionParams {
                descriptor: descriptor.clone(),
                group,
                testcase_id: self.testcase.id.clone(),
                testcase_dir: self.testcase.dir.clone(),
                validation_key: self.testcase.validation_key,
                app_key: self.testcase.app_key,
                moderator_key: self.testcase.moderator_key,
                violation_threshold: self.testcase.violation_threshold,
            };
            let registry = self.registry.clone();
            let config = self.config.clone();
            sessions.spawn(async move { (group, run_group_session(params, registry, config).await) });

            info!(group = %group, "Spawned group");
            self.emit(TranscriptEvent::GroupSpawned { group });
        }

        let expected = self.testcase.n_groups;
        let mut terminations = Vec::with_capacity(expected);
        let mut reports = Vec::with_capacity(expected);
        let filter = TopicFilter::Exact(Topic::GroupTerminated);

        while terminations.len() < expected {
            tokio::select! {
                biased;

                received = app.receive(filter) => {
                    let envelope = received?;
                    match envelope.message {
                        Message::Admin(ev) if ev.kind == AdminKind::Terminated => {
                            let outcome = GroupOutcome { group: ev.group_id, removed: ev.payload };
                            info!(group = %outcome.group, removed = outcome.removed, "Group terminated");
                            self.emit(TranscriptEvent::GroupTerminated {
                                group: outcome.group,
                                removed: outcome.removed,
                            });
                            terminations.push(outcome);
                        }
                        other => warn!(message = ?other, "Unexpected message on termination topic"),
                    }
                }

                joined = sessions.join_next(), if !sessions.is_empty() => {
                    if let Some(joined) = joined {
                        reports.push(Self::session_report(joined)?);
                    }
                }
            }
        }

        while let Some(joined) = sessions.join_next().await {
            reports.push(Self::session_report(joined)?);
        }
        reports.sort_by_key(|r| r.group);

        Ok(SimulationReport {
            testcase: self.testcase.id.clone(),
            terminations,
            sessions: reports,
        })
    }

    fn session_report(
        joined: Result<SessionResult, tokio::task::JoinError>,
    ) -> Result<SessionReport, OrchestratorError> {
        match joined {
            Ok((_, Ok(report))) => Ok(report),
            Ok((group, Err(source))) => Err(OrchestratorError::Session { group, source }),
            Err(e) => Err(OrchestratorError::Join(e.to_string())),
        }
    }

    fn teardown(&self) {
        for key in [
            self.testcase.app_key,
            self.testcase.moderator_key,
            self.testcase.validation_key,
        ] {
            if let Err(e) = self.registry.remove(key) {
                debug!(bus = %key, error = %e, "Bus already gone");
            }
        }
    }

    fn emit(&self, event: TranscriptEvent) {
        if let Some(tx) = &self.transcript {
            let _ = tx.send(event);
        }
    }
}
