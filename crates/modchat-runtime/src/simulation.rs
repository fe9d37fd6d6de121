//! One complete run: sinks, moderation engine and orchestrator.
//!
//! ```text
//! Simulation::run
//!   ├─ preflight (capacities, descriptors, scripts)
//!   ├─ create validation bus ──► ValidationLog task
//!   ├─ create moderation bus ──► ModerationEngine task
//!   ├─ Orchestrator::run (sessions, teardown)
//!   └─ join both tasks (they end on teardown)
//! ```

use crate::bus::{BusRegistry, OpenMode};
use crate::config::{SimConfig, TestcaseConfig};
use crate::moderation::{FilteredWordSet, ModerationEngine, ModerationError, ModerationSummary};
use crate::orchestrator::{preflight, Orchestrator, OrchestratorError, SimulationReport};
use crate::transcript::TranscriptSender;
use crate::validation::ValidationLog;
use modchat_types::ErrorCode;
use serde::Serialize;
use thiserror::Error;
use tracing::info;

/// Failure of a whole run.
///
/// Wraps the component that failed; codes are passed through unchanged.
/// Only a failed sink task carries its own `SIMULATION_` code.
#[derive(Debug, Error)]
pub enum SimulationError {
    /// Moderation could not be set up.
    #[error(transparent)]
    Moderation(#[from] ModerationError),

    /// The orchestrated run failed.
    #[error(transparent)]
    Orchestrator(#[from] OrchestratorError),

    /// A sink task panicked.
    #[error("{task} task failed: {message}")]
    Task {
        task: &'static str,
        message: String,
    },
}

impl ErrorCode for SimulationError {
    fn code(&self) -> &'static str {
        match self {
            Self::Moderation(e) => e.code(),
            Self::Orchestrator(e) => e.code(),
            Self::Task { .. } => "SIMULATION_TASK",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SimulationOutcome {
    /// Orchestrator report.
    pub report: SimulationReport,
    /// Moderation summary.
    pub moderation: ModerationSummary,
    /// Validation bus contents.
    pub validation: ValidationLog,
}

/// Builder for one run.
///
/// # Example
///
/// ```ignore
/// use modchat_runtime::{Simulation, config::{SimConfig, TestcaseConfig}};
///
/// let testcase = TestcaseConfig::load(root, "1")?;
/// let outcome = Simulation::new(testcase, SimConfig::default()).run().await?;
/// println!("{} users removed", outcome.report.total_removed());
/// ```
#[derive(Debug)]
pub struct Simulation {
    testcase: TestcaseConfig,
    config: SimConfig,
    registry: Option<BusRegistry>,
    transcript: Option<TranscriptSender>,
}

impl Simulation {
    /// Creates a run of `testcase` with `config`.
    #[must_use]
    pub fn new(testcase: TestcaseConfig, config: SimConfig) -> Self {
        Self {
            testcase,
            config,
            registry: None,
            transcript: None,
        }
    }

    /// Runs on `registry` instead of a fresh one built from the bus config.
    #[must_use]
    pub fn with_registry(mut self, registry: BusRegistry) -> Self {
        self.registry = Some(registry);
        self
    }

    /// Overrides the testcase's violation threshold.
    #[must_use]
    pub fn with_threshold(mut self, threshold: u32) -> Self {
        self.testcase.violation_threshold = threshold;
        self
    }

    /// Sends transcript lines to `transcript`.
    #[must_use]
    pub fn with_transcript(mut self, transcript: TranscriptSender) -> Self {
        self.transcript = Some(transcript);
        self
    }

    /// Runs the simulation to completion.
    ///
    /// # Errors
    ///
    /// [`SimulationError`] if the testcase fails preflight, the filtered
    /// words cannot be loaded, the orchestrated run fails, or a sink task
    /// panics. Preflight failures happen before any bus is created; every
    /// bus created is torn down.
    pub async fn run(self) -> Result<SimulationOutcome, SimulationError> {
        let tc = &self.testcase;
        preflight(tc, &self.config.limits).map_err(OrchestratorError::from)?;

        let registry = self
            .registry
            .clone()
            .unwrap_or_else(|| BusRegistry::new(self.config.bus_options()));

        let words = FilteredWordSet::from_file(
            &tc.filtered_words_path(),
            self.config.limits.max_filtered_words,
        )
        .map_err(ModerationError::from)?;

        let validation_bus = registry
            .open(tc.validation_key, OpenMode::CreateOrAttach)
            .map_err(ModerationError::from)?;
        let moderator_bus = registry
            .open(tc.moderator_key, OpenMode::CreateOrAttach)
            .map_err(ModerationError::from)?;

        let validation = ValidationLog::spawn(validation_bus);

        let mut engine = ModerationEngine::new(moderator_bus, words, tc.violation_threshold);
        if let Some(tx) = &self.transcript {
            engine = engine.with_transcript(tx.clone());
        }
        let moderation = tokio::spawn(engine.run());

        info!(
            testcase = %tc.id,
            groups = tc.n_groups,
            threshold = tc.violation_threshold,
            "Simulation started"
        );

        let mut orchestrator =
            Orchestrator::new(self.testcase.clone(), self.config.clone(), registry);
        if let Some(tx) = self.transcript {
            orchestrator = orchestrator.with_transcript(tx);
        }
        let report = orchestrator.run().await;

        let moderation = moderation.await.map_err(|e| SimulationError::Task {
            task: "moderation",
            message: e.to_string(),
        })?;
        let validation = validation.await.map_err(|e| SimulationError::Task {
            task: "validation",
            message: e.to_string(),
        })?;
        let report = report?;

        info!(
            removed = report.total_removed(),
            chats = validation.chats.len(),
            "Simulation finished"
        );

        Ok(SimulationOutcome {
            report,
            moderation,
            validation,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_types::assert_error_codes;

    #[test]
    fn error_codes_pass_through() {
        let moderation =
            SimulationError::from(ModerationError::from(crate::config::ConfigError::MissingFile(
                "filtered_words.txt".into(),
            )));
        assert_eq!(moderation.code(), "MODERATION_CONFIG");

        assert_error_codes(
            &[SimulationError::Task {
                task: "validation",
                message: "panicked".into(),
            }],
            "SIMULATION_",
        );
    }
}
