//! Validation sink.
//!
//! Drains the validation bus until teardown and keeps every admin and
//! chat event in arrival order. Used for the end-of-run summary and for
//! checking run properties in tests.

use crate::bus::{Bus, BusError};
use modchat_event::{AdminEvent, AdminKind, ChatEvent, Message, TopicFilter};
use modchat_types::{ErrorCode, GroupId, UserId};
use serde::Serialize;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Everything seen on the validation bus.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ValidationLog {
    /// Admin events in arrival order.
    pub admin: Vec<AdminEvent>,
    /// Chat events in arrival order.
    pub chats: Vec<ChatEvent>,
    /// Removal commands that should never reach this bus.
    pub unexpected: usize,
}

impl ValidationLog {
    /// Spawns a task that records `bus` until it is torn down.
    #[must_use]
    pub fn spawn(bus: Arc<Bus>) -> JoinHandle<ValidationLog> {
        tokio::spawn(async move {
            let mut log = ValidationLog::default();
            loop {
                match bus.receive(TopicFilter::Any).await {
                    Ok(envelope) => log.record(envelope.message),
                    Err(BusError::Removed(_)) => break,
                    Err(e) => {
                        error!(code = e.code(), error = %e, "Validation bus failed");
                        break;
                    }
                }
            }
            debug!(
                admin = log.admin.len(),
                chats = log.chats.len(),
                "Validation log closed"
            );
            log
        })
    }

    /// Records one message.
    pub fn record(&mut self, message: Message) {
        match message {
            Message::Admin(ev) => self.admin.push(ev),
            Message::Chat(ev) => self.chats.push(ev),
            Message::Removal(_) => self.unexpected += 1,
        }
    }

    /// Admin events of one kind.
    pub fn admin_of(&self, kind: AdminKind) -> impl Iterator<Item = &AdminEvent> {
        self.admin.iter().filter(move |ev| ev.kind == kind)
    }

    /// Groups that announced themselves.
    #[must_use]
    pub fn created_groups(&self) -> Vec<GroupId> {
        self.admin_of(AdminKind::Created).map(|ev| ev.group_id).collect()
    }

    /// `Terminated` events as `(group, removed)`.
    #[must_use]
    pub fn terminations(&self) -> Vec<(GroupId, u32)> {
        self.admin_of(AdminKind::Terminated)
            .map(|ev| (ev.group_id, ev.payload))
            .collect()
    }

    /// Chat events from one user.
    pub fn chats_from(&self, group: GroupId, user: UserId) -> impl Iterator<Item = &ChatEvent> {
        self.chats
            .iter()
            .filter(move |c| c.group_id == group && c.user_id == user)
    }
}
