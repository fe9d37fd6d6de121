//! Messages carried on the bus.
//!
//! ```text
//! GroupSession ──Chat(ChatEvent)──────────► validation bus, moderation bus
//! GroupSession ──Admin(AdminEvent)────────► validation bus, app bus
//! Moderation   ──Removal(RemovalCommand)──► moderation bus (per-group topic)
//! ```
//!
//! An [`Envelope`] pairs a [`Message`] with its [`Topic`]. The normal
//! constructor derives the topic from the message so the two cannot
//! disagree; [`Envelope::raw`] exists for interop and tests and lets a
//! consumer exercise its malformed-message path.

use crate::topic::Topic;
use modchat_types::{GroupId, UserId};
use serde::{Deserialize, Serialize};

/// One chat line, parsed and attributed to a (group, user).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatEvent {
    /// Group the line was sent in.
    pub group_id: GroupId,
    /// Sender within the group.
    pub user_id: UserId,
    /// Logical timestamp from the user script. Not used for ordering.
    pub timestamp: i64,
    /// The text token.
    pub text: String,
    /// Set when the token was cut down to the configured byte limit.
    #[serde(default)]
    pub truncated: bool,
}

impl ChatEvent {
    /// Creates an untruncated chat event.
    #[must_use]
    pub fn new(group_id: GroupId, user_id: UserId, timestamp: i64, text: impl Into<String>) -> Self {
        Self {
            group_id,
            user_id,
            timestamp,
            text: text.into(),
            truncated: false,
        }
    }
}

/// Kind of an administrative lifecycle event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdminKind {
    /// Group session started.
    Created,
    /// A user joined at startup. Payload is the user index.
    UserJoined,
    /// Group session ended. Payload is the removed-user count.
    Terminated,
}

impl AdminKind {
    /// Returns the admin topic this kind is sent on.
    #[must_use]
    pub fn topic(self) -> Topic {
        match self {
            Self::Created => Topic::GroupCreated,
            Self::UserJoined => Topic::UserJoined,
            Self::Terminated => Topic::GroupTerminated,
        }
    }
}

/// Lifecycle notification for the validation service and orchestrator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AdminEvent {
    /// What happened.
    pub kind: AdminKind,
    /// Group it happened to.
    pub group_id: GroupId,
    /// Joining user's index, removed-user count, or 0 for `Created`.
    pub payload: u32,
}

impl AdminEvent {
    /// A group session has started.
    #[must_use]
    pub fn created(group_id: GroupId) -> Self {
        Self {
            kind: AdminKind::Created,
            group_id,
            payload: 0,
        }
    }

    /// `user` joined `group_id`.
    #[must_use]
    pub fn user_joined(group_id: GroupId, user: UserId) -> Self {
        Self {
            kind: AdminKind::UserJoined,
            group_id,
            payload: user.index(),
        }
    }

    /// `group_id` terminated after removing `removed` users.
    #[must_use]
    pub fn terminated(group_id: GroupId, removed: u32) -> Self {
        Self {
            kind: AdminKind::Terminated,
            group_id,
            payload: removed,
        }
    }
}

/// Instruction to a group session to remove one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RemovalCommand {
    /// Group the user belongs to.
    pub group_id: GroupId,
    /// User to remove.
    pub user_id: UserId,
}

impl RemovalCommand {
    /// Creates a removal command.
    #[must_use]
    pub fn new(group_id: GroupId, user_id: UserId) -> Self {
        Self { group_id, user_id }
    }
}

/// Payload of a bus envelope.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Message {
    /// Administrative lifecycle event.
    Admin(AdminEvent),
    /// Chat line.
    Chat(ChatEvent),
    /// Removal command.
    Removal(RemovalCommand),
}

impl Message {
    /// Returns the topic this message is addressed to.
    #[must_use]
    pub fn topic(&self) -> Topic {
        match self {
            Self::Admin(ev) => ev.kind.topic(),
            Self::Chat(ev) => Topic::Chat(ev.group_id),
            Self::Removal(cmd) => Topic::Removal(cmd.group_id),
        }
    }
}

impl From<AdminEvent> for Message {
    fn from(ev: AdminEvent) -> Self {
        Self::Admin(ev)
    }
}

impl From<ChatEvent> for Message {
    fn from(ev: ChatEvent) -> Self {
        Self::Chat(ev)
    }
}

impl From<RemovalCommand> for Message {
    fn from(cmd: RemovalCommand) -> Self {
        Self::Removal(cmd)
    }
}

/// A message together with the topic it was sent on.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Envelope {
    /// Routing topic.
    pub topic: Topic,
    /// Payload.
    pub message: Message,
}

impl Envelope {
    /// Wraps a message on its natural topic.
    ///
    /// ```
    /// use modchat_event::{Envelope, RemovalCommand, Topic};
    /// use modchat_types::{GroupId, UserId};
    ///
    /// let env = Envelope::new(RemovalCommand::new(GroupId::new(1), UserId::new(0)));
    /// assert_eq!(env.topic, Topic::Removal(GroupId::new(1)));
    /// assert!(env.is_consistent());
    /// ```
    #[must_use]
    pub fn new(message: impl Into<Message>) -> Self {
        let message = message.into();
        Self {
            topic: message.topic(),
            message,
        }
    }

    /// Wraps a message on an arbitrary topic.
    ///
    /// The result may be inconsistent; consumers check
    /// [`is_consistent`](Self::is_consistent) and drop such envelopes.
    #[must_use]
    pub fn raw(topic: Topic, message: Message) -> Self {
        Self { topic, message }
    }

    /// Returns `true` if the topic is the one the payload implies.
    #[must_use]
    pub fn is_consistent(&self) -> bool {
        self.topic == self.message.topic()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn g(i: u32) -> GroupId {
        GroupId::new(i)
    }

    fn u(i: u32) -> UserId {
        UserId::new(i)
    }

    #[test]
    fn admin_events_map_to_admin_topics() {
        assert_eq!(
            Message::from(AdminEvent::created(g(0))).topic(),
            Topic::GroupCreated
        );
        assert_eq!(
            Message::from(AdminEvent::user_joined(g(0), u(3))).topic(),
            Topic::UserJoined
        );
        assert_eq!(
            Message::from(AdminEvent::terminated(g(0), 2)).topic(),
            Topic::GroupTerminated
        );
    }

    #[test]
    fn admin_payloads() {
        assert_eq!(AdminEvent::created(g(1)).payload, 0);
        assert_eq!(AdminEvent::user_joined(g(1), u(5)).payload, 5);
        assert_eq!(AdminEvent::terminated(g(1), 2).payload, 2);
    }

    #[test]
    fn chat_event_routes_to_its_group() {
        let env = Envelope::new(ChatEvent::new(g(4), u(1), 10, "hello"));
        assert_eq!(env.topic, Topic::Chat(g(4)));
        assert!(env.is_consistent());
    }

    #[test]
    fn raw_envelope_can_be_inconsistent() {
        let env = Envelope::raw(
            Topic::Chat(g(1)),
            ChatEvent::new(g(2), u(0), 1, "x").into(),
        );
        assert!(!env.is_consistent());

        let env = Envelope::raw(
            Topic::Chat(g(0)),
            RemovalCommand::new(g(0), u(0)).into(),
        );
        assert!(!env.is_consistent());
    }

    #[test]
    fn message_json_is_tagged() {
        let msg = Message::from(RemovalCommand::new(g(2), u(7)));
        let json = serde_json::to_value(&msg).unwrap();
        assert_eq!(json["type"], "removal");
        assert_eq!(json["group_id"], 2);
        assert_eq!(json["user_id"], 7);
    }
}
