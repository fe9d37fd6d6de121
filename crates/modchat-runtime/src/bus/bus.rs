//! Topic-addressed message bus.
//!
//! A [`Bus`] is a single bounded FIFO of [`Envelope`]s shared by any
//! number of producers and consumers. Consumers take the *first queued
//! message matching their [`TopicFilter`]*; everything else stays queued
//! in order. This gives per-topic FIFO and lets several consumers share
//! one bus as long as their filters are disjoint:
//!
//! ```text
//!              ┌──────────────── moderation bus ────────────────┐
//! Session 0 ──►│ Chat(0)  Chat(1)  Removal(0)  Chat(0)  Removal(1)│
//! Session 1 ──►└────────────────────────────────────────────────┘
//!                  │                    │                  │
//!       ExceptRemoval             Exact(Removal(0))   Exact(Removal(1))
//!                  ▼                    ▼                  ▼
//!             Moderation            Session 0          Session 1
//! ```
//!
//! # Teardown
//!
//! After [`Bus::remove`], sends fail with [`BusError::Removed`]. Receivers
//! still get messages that were queued before teardown and match their
//! filter, then [`BusError::Removed`].

use super::error::BusError;
use super::BusKey;
use modchat_event::{Envelope, Message, TopicFilter};
use parking_lot::Mutex;
use std::collections::VecDeque;
use std::time::Duration;
use tokio::sync::Notify;
use tokio::time::Instant;
use tracing::trace;

/// Default queue capacity in messages.
pub const DEFAULT_CAPACITY: usize = 4096;

/// Default time a send may wait for free space.
pub const DEFAULT_SEND_TIMEOUT: Duration = Duration::from_secs(1);

/// Capacity and send timeout for a bus.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BusOptions {
    /// Maximum number of queued messages.
    pub capacity: usize,
    /// How long a send waits for space before failing with [`BusError::Full`].
    pub send_timeout: Duration,
}

impl Default for BusOptions {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            send_timeout: DEFAULT_SEND_TIMEOUT,
        }
    }
}

#[derive(Debug, Default)]
struct BusState {
    queue: VecDeque<Envelope>,
    removed: bool,
}

/// Shared topic-addressed queue. See the [module docs](self).
///
/// Obtain one through [`BusRegistry::open`](super::BusRegistry::open);
/// share it as `Arc<Bus>`.
#[derive(Debug)]
pub struct Bus {
    key: BusKey,
    options: BusOptions,
    state: Mutex<BusState>,
    /// Woken when a message is pushed or the bus is removed.
    readable: Notify,
    /// Woken when a message is taken or the bus is removed.
    writable: Notify,
}

impl Bus {
    pub(super) fn new(key: BusKey, options: BusOptions) -> Self {
        Self {
            key,
            options,
            state: Mutex::new(BusState::default()),
            readable: Notify::new(),
            writable: Notify::new(),
        }
    }

    /// Returns the key this bus was opened under.
    #[must_use]
    pub fn key(&self) -> BusKey {
        self.key
    }

    /// Returns the number of queued messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock().queue.len()
    }

    /// Returns `true` if nothing is queued.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Returns `true` once [`remove`](Self::remove) has been called.
    #[must_use]
    pub fn is_removed(&self) -> bool {
        self.state.lock().removed
    }

    /// Sends a message on its natural topic.
    ///
    /// # Errors
    ///
    /// [`BusError::Removed`] after teardown, [`BusError::Full`] if the bus
    /// stays at capacity for the whole send timeout.
    pub async fn send(&self, message: impl Into<Message>) -> Result<(), BusError> {
        self.send_envelope(Envelope::new(message)).await
    }

    /// Sends a prebuilt envelope.
    ///
    /// # Errors
    ///
    /// Same as [`send`](Self::send).
    pub async fn send_envelope(&self, envelope: Envelope) -> Result<(), BusError> {
        let deadline = Instant::now() + self.options.send_timeout;

        loop {
            let space = self.writable.notified();
            tokio::pin!(space);
            space.as_mut().enable();

            {
                let mut state = self.state.lock();
                if state.removed {
                    return Err(BusError::Removed(self.key));
                }
                if state.queue.len() < self.options.capacity {
                    trace!(bus = %self.key, topic = %envelope.topic, "send");
                    state.queue.push_back(envelope);
                    drop(state);
                    self.readable.notify_waiters();
                    return Ok(());
                }
            }

            if tokio::time::timeout_at(deadline, space).await.is_err() {
                return Err(BusError::Full {
                    key: self.key,
                    capacity: self.options.capacity,
                });
            }
        }
    }

    /// Takes the first queued message matching `filter`, without waiting.
    ///
    /// Returns `Ok(None)` when nothing matches.
    ///
    /// # Errors
    ///
    /// [`BusError::Removed`] once the bus is torn down and no matching
    /// message is left.
    pub fn try_receive(&self, filter: TopicFilter) -> Result<Option<Envelope>, BusError> {
        let mut state = self.state.lock();

        let position = state.queue.iter().position(|e| filter.matches(e.topic));
        match position {
            Some(idx) => {
                let envelope = state.queue.remove(idx);
                drop(state);
                self.writable.notify_waiters();
                Ok(envelope)
            }
            None if state.removed => Err(BusError::Removed(self.key)),
            None => Ok(None),
        }
    }

    /// Waits for the first message matching `filter`.
    ///
    /// # Errors
    ///
    /// [`BusError::Removed`] once the bus is torn down and no matching
    /// message is left.
    pub async fn receive(&self, filter: TopicFilter) -> Result<Envelope, BusError> {
        loop {
            let arrival = self.readable.notified();
            tokio::pin!(arrival);
            arrival.as_mut().enable();

            if let Some(envelope) = self.try_receive(filter)? {
                return Ok(envelope);
            }

            arrival.await;
        }
    }

    /// Tears the bus down and wakes every waiter.
    pub(super) fn remove(&self) {
        self.state.lock().removed = true;
        self.readable.notify_waiters();
        self.writable.notify_waiters();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_event::{AdminEvent, ChatEvent, RemovalCommand, Topic};
    use modchat_types::{GroupId, UserId};
    use std::sync::Arc;

    fn bus() -> Bus {
        Bus::new(BusKey::new(100), BusOptions::default())
    }

    fn chat(group: u32, ts: i64) -> ChatEvent {
        ChatEvent::new(GroupId::new(group), UserId::new(0), ts, "hi")
    }

    #[tokio::test]
    async fn fifo_within_topic() {
        let bus = bus();
        for ts in 0..3 {
            bus.send(chat(0, ts)).await.unwrap();
        }

        for ts in 0..3 {
            let env = bus.try_receive(TopicFilter::Chat).unwrap().unwrap();
            match env.message {
                Message::Chat(ev) => assert_eq!(ev.timestamp, ts),
                other => panic!("unexpected {other:?}"),
            }
        }
        assert!(bus.try_receive(TopicFilter::Any).unwrap().is_none());
    }

    #[tokio::test]
    async fn filter_skips_other_topics() {
        let bus = bus();
        let g0 = GroupId::new(0);
        let g1 = GroupId::new(1);

        bus.send(chat(0, 1)).await.unwrap();
        bus.send(RemovalCommand::new(g1, UserId::new(2))).await.unwrap();
        bus.send(RemovalCommand::new(g0, UserId::new(3))).await.unwrap();

        let env = bus
            .try_receive(TopicFilter::Exact(Topic::Removal(g0)))
            .unwrap()
            .unwrap();
        assert_eq!(
            env.message,
            Message::Removal(RemovalCommand::new(g0, UserId::new(3)))
        );

        // Session 0 sees nothing more; the other two messages are still queued
        assert!(bus
            .try_receive(TopicFilter::Exact(Topic::Removal(g0)))
            .unwrap()
            .is_none());
        assert_eq!(bus.len(), 2);

        let env = bus.try_receive(TopicFilter::ExceptRemoval).unwrap().unwrap();
        assert_eq!(env.topic, Topic::Chat(g0));
    }

    #[tokio::test]
    async fn blocking_receive_wakes_on_send() {
        let bus = Arc::new(bus());
        let rx = Arc::clone(&bus);
        let waiter = tokio::spawn(async move { rx.receive(TopicFilter::Admin).await });

        tokio::task::yield_now().await;
        bus.send(chat(0, 1)).await.unwrap();
        bus.send(AdminEvent::created(GroupId::new(0))).await.unwrap();

        let env = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver woke")
            .unwrap()
            .unwrap();
        assert_eq!(env.topic, Topic::GroupCreated);
        assert_eq!(bus.len(), 1);
    }

    #[tokio::test]
    async fn send_after_remove_fails() {
        let bus = bus();
        bus.remove();
        let err = bus.send(chat(0, 1)).await.unwrap_err();
        assert_eq!(err, BusError::Removed(BusKey::new(100)));
    }

    #[tokio::test]
    async fn receivers_drain_before_removed() {
        let bus = bus();
        bus.send(chat(0, 1)).await.unwrap();
        bus.remove();

        assert!(bus.receive(TopicFilter::Any).await.is_ok());
        assert_eq!(
            bus.receive(TopicFilter::Any).await.unwrap_err(),
            BusError::Removed(BusKey::new(100))
        );
    }

    #[tokio::test]
    async fn remove_wakes_blocked_receiver() {
        let bus = Arc::new(bus());
        let rx = Arc::clone(&bus);
        let waiter = tokio::spawn(async move { rx.receive(TopicFilter::Any).await });

        tokio::task::yield_now().await;
        bus.remove();

        let res = tokio::time::timeout(Duration::from_secs(1), waiter)
            .await
            .expect("receiver woke")
            .unwrap();
        assert!(matches!(res, Err(BusError::Removed(_))));
    }

    #[tokio::test]
    async fn full_bus_times_out() {
        let bus = Bus::new(
            BusKey::new(7),
            BusOptions {
                capacity: 1,
                send_timeout: Duration::from_millis(20),
            },
        );
        bus.send(chat(0, 1)).await.unwrap();

        let err = bus.send(chat(0, 2)).await.unwrap_err();
        assert!(matches!(err, BusError::Full { capacity: 1, .. }));
    }

    #[tokio::test]
    async fn full_bus_accepts_after_receive() {
        let bus = Arc::new(Bus::new(
            BusKey::new(7),
            BusOptions {
                capacity: 1,
                send_timeout: Duration::from_secs(1),
            },
        ));
        bus.send(chat(0, 1)).await.unwrap();

        let tx = Arc::clone(&bus);
        let sender = tokio::spawn(async move { tx.send(chat(0, 2)).await });

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert!(bus.try_receive(TopicFilter::Any).unwrap().is_some());

        sender.await.unwrap().unwrap();
        assert_eq!(bus.len(), 1);
    }
}
