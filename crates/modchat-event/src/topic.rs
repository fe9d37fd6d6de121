//! Bus topics and receive filters.
//!
//! A [`Topic`] names both the category of a message and, for chat and
//! removal traffic, the group it belongs to. Routing is done on the enum;
//! the numeric [`Topic::code`] is kept only so logs and external
//! validators see the same message type numbers.
//!
//! # Numbering
//!
//! | Topic | Code |
//! |-------|------|
//! | `GroupCreated` | `1` |
//! | `UserJoined` | `2` |
//! | `GroupTerminated` | `3` |
//! | `Chat(g)` | `CHAT_TOPIC_BASE + g` |
//! | `Removal(g)` | `g + 1` |
//!
//! Removal codes overlap the admin codes numerically; they travel on the
//! moderation bus, admin events on the validation and app buses, so the
//! pair (bus, code) is still unique.

use modchat_types::GroupId;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Code of the group-created admin topic.
pub const TOPIC_GROUP_CREATED: i64 = 1;
/// Code of the user-joined admin topic.
pub const TOPIC_USER_JOINED: i64 = 2;
/// Code of the group-terminated admin topic.
pub const TOPIC_GROUP_TERMINATED: i64 = 3;
/// First chat topic code. Larger than every admin code.
pub const CHAT_TOPIC_BASE: i64 = 30;

/// Logical address of a message on a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Topic {
    /// A group session has started.
    GroupCreated,
    /// A user has joined a group at startup.
    UserJoined,
    /// A group session has ended.
    GroupTerminated,
    /// Chat traffic originating in a group.
    Chat(GroupId),
    /// Removal commands addressed to a group session.
    Removal(GroupId),
}

impl Topic {
    /// Returns the interop code of this topic.
    ///
    /// ```
    /// use modchat_event::Topic;
    /// use modchat_types::GroupId;
    ///
    /// assert_eq!(Topic::GroupTerminated.code(), 3);
    /// assert_eq!(Topic::Chat(GroupId::new(2)).code(), 32);
    /// assert_eq!(Topic::Removal(GroupId::new(2)).code(), 3);
    /// ```
    #[must_use]
    pub fn code(self) -> i64 {
        match self {
            Self::GroupCreated => TOPIC_GROUP_CREATED,
            Self::UserJoined => TOPIC_USER_JOINED,
            Self::GroupTerminated => TOPIC_GROUP_TERMINATED,
            Self::Chat(g) => CHAT_TOPIC_BASE + i64::from(g.index()),
            Self::Removal(g) => i64::from(g.index()) + 1,
        }
    }

    /// Returns `true` for the three administrative topics.
    #[must_use]
    pub fn is_admin(self) -> bool {
        matches!(
            self,
            Self::GroupCreated | Self::UserJoined | Self::GroupTerminated
        )
    }

    /// Returns `true` for chat topics.
    #[must_use]
    pub fn is_chat(self) -> bool {
        matches!(self, Self::Chat(_))
    }

    /// Returns `true` for removal topics.
    #[must_use]
    pub fn is_removal(self) -> bool {
        matches!(self, Self::Removal(_))
    }

    /// Returns the group this topic is scoped to, if any.
    #[must_use]
    pub fn group(self) -> Option<GroupId> {
        match self {
            Self::Chat(g) | Self::Removal(g) => Some(g),
            _ => None,
        }
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::GroupCreated => write!(f, "group-created"),
            Self::UserJoined => write!(f, "user-joined"),
            Self::GroupTerminated => write!(f, "group-terminated"),
            Self::Chat(g) => write!(f, "chat/{g}"),
            Self::Removal(g) => write!(f, "removal/{g}"),
        }
    }
}

/// Selects which queued messages a receive call may take.
///
/// Messages that do not match stay queued in order for other receivers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TopicFilter {
    /// Every topic.
    Any,
    /// One specific topic.
    Exact(Topic),
    /// Any of the three admin topics.
    Admin,
    /// Any chat topic.
    Chat,
    /// Everything except removal commands.
    ///
    /// The moderation engine reads its bus with this filter so it never
    /// consumes the commands it posts for group sessions.
    ExceptRemoval,
}

impl TopicFilter {
    /// Returns `true` if `topic` passes this filter.
    #[must_use]
    pub fn matches(self, topic: Topic) -> bool {
        match self {
            Self::Any => true,
            Self::Exact(t) => t == topic,
            Self::Admin => topic.is_admin(),
            Self::Chat => topic.is_chat(),
            Self::ExceptRemoval => !topic.is_removal(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_codes_are_below_chat_base() {
        for t in [Topic::GroupCreated, Topic::UserJoined, Topic::GroupTerminated] {
            assert!(t.is_admin());
            assert!(t.code() < CHAT_TOPIC_BASE);
        }
        assert!(!Topic::Chat(GroupId::new(0)).is_admin());
        assert_eq!(Topic::Chat(GroupId::new(0)).code(), CHAT_TOPIC_BASE);
    }

    #[test]
    fn removal_code_is_group_plus_one() {
        assert_eq!(Topic::Removal(GroupId::new(0)).code(), 1);
        assert_eq!(Topic::Removal(GroupId::new(9)).code(), 10);
    }

    #[test]
    fn group_scope() {
        let g = GroupId::new(4);
        assert_eq!(Topic::Chat(g).group(), Some(g));
        assert_eq!(Topic::Removal(g).group(), Some(g));
        assert_eq!(Topic::UserJoined.group(), None);
    }

    #[test]
    fn filters() {
        let g0 = GroupId::new(0);
        let g1 = GroupId::new(1);

        assert!(TopicFilter::Any.matches(Topic::Removal(g0)));
        assert!(TopicFilter::Exact(Topic::Removal(g0)).matches(Topic::Removal(g0)));
        assert!(!TopicFilter::Exact(Topic::Removal(g0)).matches(Topic::Removal(g1)));
        assert!(TopicFilter::Admin.matches(Topic::GroupTerminated));
        assert!(!TopicFilter::Admin.matches(Topic::Chat(g0)));
        assert!(TopicFilter::Chat.matches(Topic::Chat(g1)));
        assert!(TopicFilter::ExceptRemoval.matches(Topic::Chat(g1)));
        assert!(TopicFilter::ExceptRemoval.matches(Topic::UserJoined));
        assert!(!TopicFilter::ExceptRemoval.matches(Topic::Removal(g1)));
    }

    #[test]
    fn display() {
        assert_eq!(Topic::Chat(GroupId::new(3)).to_string(), "chat/3");
        assert_eq!(Topic::GroupCreated.to_string(), "group-created");
    }
}
