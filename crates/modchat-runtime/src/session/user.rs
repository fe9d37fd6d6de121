//! Per-user lifecycle inside a group session.
//!
//! # State Machine
//!
//! ```text
//!                 ┌────────┐
//!       ┌─────────│ Active │─────────┐
//!       │         └────────┘         │
//!       │ close() (EOF)              │ remove() (RemovalCommand)
//!       ▼                            ▼
//!  ┌────────┐                  ┌─────────┐
//!  │ Closed │                  │ Removed │
//!  └────────┘                  └─────────┘
//! ```
//!
//! Both end states are terminal. A user whose stream has reached EOF can
//! no longer be removed, and a removed user never reaches EOF.

use modchat_types::UserId;
use serde::Serialize;
use std::path::{Path, PathBuf};

/// Lifecycle state of a [`User`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UserState {
    /// Stream is being read.
    Active,
    /// Stream reached EOF.
    Closed,
    /// Removed by moderation; stream read side dropped.
    Removed,
}

/// A group member, owned by its session.
#[derive(Debug, Clone)]
pub struct User {
    id: UserId,
    script: PathBuf,
    state: UserState,
}

impl User {
    /// Creates an active user.
    #[must_use]
    pub fn new(id: UserId, script: impl Into<PathBuf>) -> Self {
        Self {
            id,
            script: script.into(),
            state: UserState::Active,
        }
    }

    /// Returns the user's index within the group.
    #[must_use]
    pub fn id(&self) -> UserId {
        self.id
    }

    /// Returns the script path.
    #[must_use]
    pub fn script(&self) -> &Path {
        &self.script
    }

    /// Returns the current state.
    #[must_use]
    pub fn state(&self) -> UserState {
        self.state
    }

    /// Returns `true` while the stream is still being read.
    #[must_use]
    pub fn is_active(&self) -> bool {
        self.state == UserState::Active
    }

    /// `Active → Closed`. Returns `false` from any other state.
    pub fn close(&mut self) -> bool {
        self.transition(UserState::Closed)
    }

    /// `Active → Removed`. Returns `false` from any other state.
    pub fn remove(&mut self) -> bool {
        self.transition(UserState::Removed)
    }

    fn transition(&mut self, to: UserState) -> bool {
        if self.is_active() {
            self.state = to;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user() -> User {
        User::new(UserId::new(0), "u.txt")
    }

    #[test]
    fn starts_active() {
        let u = user();
        assert!(u.is_active());
        assert_eq!(u.script(), Path::new("u.txt"));
    }

    #[test]
    fn close_is_terminal() {
        let mut u = user();
        assert!(u.close());
        assert_eq!(u.state(), UserState::Closed);
        assert!(!u.close());
        assert!(!u.remove());
        assert_eq!(u.state(), UserState::Closed);
    }

    #[test]
    fn remove_is_terminal() {
        let mut u = user();
        assert!(u.remove());
        assert_eq!(u.state(), UserState::Removed);
        assert!(!u.close());
        assert!(!u.remove());
    }
}
