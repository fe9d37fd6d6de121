//! Group and user identifiers.
//!
//! Both are plain indexes: a group is identified by its position in the
//! testcase config, a user by its position in the group descriptor. The
//! newtypes keep the two from being swapped at call sites such as
//! `RemovalCommand::new(group, user)`.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Index of a group in the testcase config, `0..n_groups`.
///
/// # Example
///
/// ```
/// use modchat_types::GroupId;
///
/// let g = GroupId::new(3);
/// assert_eq!(g.index(), 3);
/// assert_eq!(g.to_string(), "3");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct GroupId(u32);

impl GroupId {
    /// Wraps a raw group index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for GroupId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for GroupId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}

/// Index of a user within its group, `0..users_in_group`.
///
/// User ids are only unique within one group; the moderation engine keys
/// its state by `(GroupId, UserId)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UserId(u32);

impl UserId {
    /// Wraps a raw user index.
    #[must_use]
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    /// Returns the raw index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }

    /// Returns the index as a `usize` for slice access.
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for UserId {
    fn from(index: u32) -> Self {
        Self(index)
    }
}
