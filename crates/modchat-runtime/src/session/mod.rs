//! Group sessions and their user agents.
//!
//! ```text
//!  UserAgent 0 ──duplex──► reader 0 ──┐
//!  UserAgent 1 ──duplex──► reader 1 ──┼──► fan-in ──► GroupSession ──► validation / moderation bus
//!  UserAgent 2 ──duplex──► reader 2 ──┘                    ▲
//!                                                          └── Removal(g) from moderation bus
//! ```
//!
//! - [`GroupSession`]: the per-group loop
//! - [`UserAgent`]: paced script replay onto a private stream
//! - [`User`] / [`UserState`]: one-way lifecycle
//! - [`SessionError`]: `SESSION_*` error codes

mod agent;
mod error;
#[allow(clippy::module_inception)]
mod session;
mod stream;
mod user;

pub use agent::{AgentReport, UserAgent};
pub use error::SessionError;
pub use session::{
    run_group_session, GroupSession, SessionParams, SessionReport, UserOutcome,
};
pub use stream::{spawn_reader, StreamEvent, StreamItem};
pub use user::{User, UserState};
