//! modchat runtime.
//!
//! Everything that runs: the keyed bus namespace, group sessions and
//! their user agents, the moderation engine, the orchestrator, and the
//! validation sink.
//!
//! # Crate Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │  modchat-types  : GroupId, UserId, ErrorCode                │
//! │  modchat-event  : Topic, Message, Envelope, RecordParser    │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │                   Runtime Layer (THIS CRATE)                 │
//! ├─────────────────────────────────────────────────────────────┤
//! │  bus/          : Bus, BusRegistry, BusKey                   │
//! │  config/       : TestcaseConfig, SimConfig, ConfigLoader    │
//! │  session/      : GroupSession, UserAgent, User              │
//! │  moderation/   : ModerationEngine, ViolationLedger          │
//! │  orchestrator  : Orchestrator, SimulationReport             │
//! │  validation    : ValidationLog                              │
//! │  simulation    : Simulation (wires it all together)         │
//! └─────────────────────────────────────────────────────────────┘
//!                               ↓
//! ┌─────────────────────────────────────────────────────────────┐
//! │  modchat-cli    : `modchat` binary                          │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Tasks
//!
//! One tokio task per user agent, stream reader, group session,
//! moderation engine and validation sink. They share nothing but buses
//! and byte streams.
//!
//! # Error Codes
//!
//! | Layer | Prefix |
//! |-------|--------|
//! | [`bus`] | `BUS_` |
//! | [`config`] | `CONFIG_` |
//! | [`session`] | `SESSION_` |
//! | [`moderation`] | `MODERATION_` |
//! | [`orchestrator`] | `ORCHESTRATOR_` |
//! | [`simulation`] | `SIMULATION_` |

pub mod bus;
pub mod config;
pub mod moderation;
pub mod orchestrator;
pub mod session;
pub mod simulation;
pub mod transcript;
pub mod validation;

pub use bus::{Bus, BusError, BusKey, BusRegistry, OpenMode};
pub use config::{ConfigError, ConfigLoader, SimConfig, TestcaseConfig};
pub use moderation::{ModerationEngine, ModerationError, ModerationSummary};
pub use orchestrator::{Orchestrator, OrchestratorError, SimulationReport};
pub use session::{GroupSession, SessionError, SessionReport};
pub use simulation::{Simulation, SimulationError, SimulationOutcome};
pub use transcript::{transcript_channel, TranscriptEvent};
pub use validation::ValidationLog;
