//! GroupSession: one group's users, streams and bus traffic.
//!
//! # Lifecycle
//!
//! 1. [`GroupSession::start`] loads the descriptor and scripts, attaches to
//!    the three buses, announces the group and its users, and spawns one
//!    agent plus one stream reader per user.
//! 2. [`GroupSession::run`] loops while at least two users are `Active`:
//!    - wait up to the poll interval for the first fan-in item, then take
//!      whatever else is already queued;
//!    - parse and forward each line (validation copy, then moderation copy);
//!    - drain this group's removal topic without waiting.
//! 3. Shutdown aborts the remaining readers, joins every agent and sends
//!    `Terminated` to the validation and app buses.

use super::agent::{AgentReport, UserAgent};
use super::error::SessionError;
use super::stream::{spawn_reader, StreamEvent, StreamItem};
use super::user::{User, UserState};
use crate::bus::{Bus, BusError, BusKey, BusRegistry, OpenMode};
use crate::config::{GroupDescriptor, SimConfig, UserScript};
use modchat_event::{AdminEvent, ChatEvent, Message, RecordParser, Topic, TopicFilter};
use modchat_types::{ErrorCode, GroupId, UserId};
use serde::Serialize;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

/// Fan-in queue length per user.
const FAN_IN_PER_USER: usize = 16;

/// Everything a group session is spawned with.
#[derive(Debug, Clone)]
pub struct SessionParams {
    /// Group descriptor file.
    pub descriptor: PathBuf,
    /// This group's index.
    pub group: GroupId,
    /// Testcase identifier.
    pub testcase_id: String,
    /// Directory user script paths resolve against.
    pub testcase_dir: PathBuf,
    /// Validation bus key.
    pub validation_key: BusKey,
    /// Orchestrator bus key.
    pub app_key: BusKey,
    /// Moderation bus key.
    pub moderator_key: BusKey,
    /// Removal threshold, carried for logging.
    pub violation_threshold: u32,
}

/// Final state of one user.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct UserOutcome {
    /// User index.
    pub user: UserId,
    /// State when the session ended.
    pub state: UserState,
    /// Chat events forwarded for this user.
    pub forwarded: usize,
}

/// What a finished session did.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SessionReport {
    /// Group index.
    pub group: GroupId,
    /// Per-user outcome, in user order.
    pub users: Vec<UserOutcome>,
    /// Users removed by moderation; the `Terminated` payload.
    pub removed: u32,
    /// Chat events forwarded (each to both buses).
    pub forwarded: usize,
    /// Lines that failed to parse.
    pub dropped_records: usize,
    /// Copies lost to a full bus.
    pub dropped_sends: usize,
    /// Per-agent write counts.
    pub agents: Vec<AgentReport>,
}

/// A running group. See the [module docs](self).
pub struct GroupSession {
    group: GroupId,
    users: Vec<User>,
    forwarded_by_user: Vec<usize>,
    readers: Vec<Option<JoinHandle<()>>>,
    agents: Vec<JoinHandle<AgentReport>>,
    fan_in: mpsc::Receiver<StreamItem>,
    validation: Arc<Bus>,
    app: Arc<Bus>,
    moderator: Arc<Bus>,
    parser: RecordParser,
    poll_interval: Duration,
    removed: u32,
    forwarded: usize,
    dropped_records: usize,
    dropped_sends: usize,
}

impl std::fmt::Debug for GroupSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroupSession")
            .field("group", &self.group)
            .field("users", &self.users)
            .field("removed", &self.removed)
            .finish_non_exhaustive()
    }
}

impl GroupSession {
    /// Loads the group, attaches to the buses and spawns the user agents.
    ///
    /// Nothing is spawned or sent unless every file loads and every bus
    /// exists.
    ///
    /// # Errors
    ///
    /// [`SessionError::Config`] for a missing or malformed descriptor or
    /// script, [`SessionError::Bus`] if a bus is not open.
    pub async fn start(
        params: SessionParams,
        registry: &BusRegistry,
        config: &SimConfig,
    ) -> Result<Self, SessionError> {
        let group = params.group;
        let descriptor =
            GroupDescriptor::load(&params.descriptor, &params.testcase_dir, &config.limits)?;
        let scripts = descriptor
            .user_files
            .iter()
            .map(|path| UserScript::load(path))
            .collect::<Result<Vec<_>, _>>()?;

        let validation = registry.open(params.validation_key, OpenMode::Attach)?;
        let app = registry.open(params.app_key, OpenMode::Attach)?;
        let moderator = registry.open(params.moderator_key, OpenMode::Attach)?;

        let users: Vec<User> = (0u32..)
            .zip(&descriptor.user_files)
            .map(|(idx, path)| User::new(UserId::new(idx), path.clone()))
            .collect();

        validation.send(AdminEvent::created(group)).await?;
        for user in &users {
            validation
                .send(AdminEvent::user_joined(group, user.id()))
                .await?;
        }

        let (tx, fan_in) = mpsc::channel(users.len().max(1) * FAN_IN_PER_USER);
        let buffer = config.agent.stream_buffer_bytes.max(1);
        let mut readers = Vec::with_capacity(users.len());
        let mut agents = Vec::with_capacity(users.len());

        for (user, script) in users.iter().zip(scripts) {
            let (writer, reader) = tokio::io::duplex(buffer);
            let agent = UserAgent::new(user.id(), script, config.agent.pacing(), writer);
            agents.push(tokio::spawn(agent.run()));
            readers.push(Some(spawn_reader(user.id(), reader, tx.clone())));
        }

        info!(
            group = %group,
            testcase = %params.testcase_id,
            users = users.len(),
            threshold = params.violation_threshold,
            "Group session started"
        );

        Ok(Self {
            group,
            forwarded_by_user: vec![0; users.len()],
            users,
            readers,
            agents,
            fan_in,
            validation,
            app,
            moderator,
            parser: config.record_parser(),
            poll_interval: config.session.poll_interval(),
            removed: 0,
            forwarded: 0,
            dropped_records: 0,
            dropped_sends: 0,
        })
    }

    /// Returns this session's group.
    #[must_use]
    pub fn group(&self) -> GroupId {
        self.group
    }

    /// Number of users still `Active`.
    #[must_use]
    pub fn active_count(&self) -> usize {
        self.users.iter().filter(|u| u.is_active()).count()
    }

    /// Runs until fewer than two users are active, then shuts down.
    ///
    /// # Errors
    ///
    /// [`SessionError::Bus`] if a bus is torn down under the session,
    /// [`SessionError::Agent`] if an agent task fails.
    pub async fn run(mut self) -> Result<SessionReport, SessionError> {
        while self.active_count() >= 2 {
            self.service_streams().await?;
            self.drain_removals()?;
        }

        debug!(
            group = %self.group,
            active = self.active_count(),
            "Termination condition reached"
        );
        self.shutdown().await
    }

    /// One bounded wait on the fan-in queue, then everything already queued.
    async fn service_streams(&mut self) -> Result<(), SessionError> {
        let first = match tokio::time::timeout(self.poll_interval, self.fan_in.recv()).await {
            Ok(Some(item)) => item,
            Ok(None) => {
                tokio::time::sleep(self.poll_interval).await;
                return Ok(());
            }
            Err(_) => return Ok(()),
        };
        self.handle_item(first).await?;

        let mut budget = self.users.len();
        while budget > 0 {
            match self.fan_in.try_recv() {
                Ok(item) => self.handle_item(item).await?,
                Err(_) => break,
            }
            budget -= 1;
        }
        Ok(())
    }

    async fn handle_item(&mut self, item: StreamItem) -> Result<(), SessionError> {
        let idx = item.user.as_usize();
        let Some(user) = self.users.get_mut(idx) else {
            return Ok(());
        };
        if !user.is_active() {
            return Ok(());
        }

        match item.event {
            StreamEvent::Line(line) => match self.parser.parse(&line) {
                Ok(record) => {
                    let event = record.into_event(self.group, item.user);
                    self.forward(event).await?;
                    self.forwarded_by_user[idx] += 1;
                }
                Err(e) => {
                    self.dropped_records += 1;
                    warn!(
                        group = %self.group,
                        user = %item.user,
                        code = e.code(),
                        error = %e,
                        "Dropped malformed record"
                    );
                }
            },
            StreamEvent::Eof => {
                user.close();
                self.readers[idx] = None;
                debug!(group = %self.group, user = %item.user, "User stream closed");
            }
            StreamEvent::Failed(reason) => {
                user.close();
                self.readers[idx] = None;
                warn!(group = %self.group, user = %item.user, %reason, "User stream failed");
            }
        }
        Ok(())
    }

    /// Sends one copy to validation and one to moderation.
    async fn forward(&mut self, event: ChatEvent) -> Result<(), SessionError> {
        let validation_copy = Message::Chat(event.clone());
        self.send_or_drop(Arc::clone(&self.validation), validation_copy)
            .await?;
        self.send_or_drop(Arc::clone(&self.moderator), Message::Chat(event))
            .await?;
        self.forwarded += 1;
        Ok(())
    }

    async fn send_or_drop(&mut self, bus: Arc<Bus>, message: Message) -> Result<(), SessionError> {
        match bus.send(message).await {
            Ok(()) => Ok(()),
            Err(e @ BusError::Full { .. }) => {
                self.dropped_sends += 1;
                warn!(group = %self.group, code = e.code(), error = %e, "Dropped chat copy");
                Ok(())
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Applies every pending removal for this group.
    fn drain_removals(&mut self) -> Result<(), SessionError> {
        let filter = TopicFilter::Exact(Topic::Removal(self.group));
        while let Some(envelope) = self.moderator.try_receive(filter)? {
            let Message::Removal(cmd) = envelope.message else {
                warn!(group = %self.group, topic = %envelope.topic, "Ignored non-removal message");
                continue;
            };

            let idx = cmd.user_id.as_usize();
            let Some(user) = self.users.get_mut(idx) else {
                warn!(group = %self.group, user = %cmd.user_id, "Removal for unknown user");
                continue;
            };

            if user.remove() {
                if let Some(reader) = self.readers[idx].take() {
                    reader.abort();
                }
                self.removed += 1;
                info!(group = %self.group, user = %cmd.user_id, "User removed");
            } else {
                debug!(
                    group = %self.group,
                    user = %cmd.user_id,
                    state = ?user.state(),
                    "Removal ignored, user not active"
                );
            }
        }
        Ok(())
    }

    async fn shutdown(mut self) -> Result<SessionReport, SessionError> {
        for reader in self.readers.iter_mut().filter_map(Option::take) {
            reader.abort();
        }
        self.fan_in.close();

        let mut agents = Vec::with_capacity(self.agents.len());
        for (user, handle) in self.users.iter().zip(self.agents.drain(..)) {
            let report = handle
                .await
                .map_err(|e| SessionError::agent(self.group, user.id(), e.to_string()))?;
            agents.push(report);
        }

        let terminated = AdminEvent::terminated(self.group, self.removed);
        self.validation.send(terminated).await?;
        self.app.send(terminated).await?;

        info!(
            group = %self.group,
            removed = self.removed,
            forwarded = self.forwarded,
            "Group session terminated"
        );

        let users = self
            .users
            .iter()
            .zip(&self.forwarded_by_user)
            .map(|(u, &forwarded)| UserOutcome {
                user: u.id(),
                state: u.state(),
                forwarded,
            })
            .collect();

        Ok(SessionReport {
            group: self.group,
            users,
            removed: self.removed,
            forwarded: self.forwarded,
            dropped_records: self.dropped_records,
            dropped_sends: self.dropped_sends,
            agents,
        })
    }
}

/// Starts and runs one group session to completion.
///
/// # Errors
///
/// Any [`SessionError`] from [`GroupSession::start`] or
/// [`GroupSession::run`].
pub async fn run_group_session(
    params: SessionParams,
    registry: BusRegistry,
    config: SimConfig,
) -> Result<SessionReport, SessionError> {
    GroupSession::start(params, &registry, &config)
        .await?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_event::RemovalCommand;
    use std::path::Path;
    use tempfile::TempDir;

    const VALIDATION: BusKey = BusKey::new(10);
    const APP: BusKey = BusKey::new(20);
    const MODERATOR: BusKey = BusKey::new(30);

    fn fast_config() -> SimConfig {
        let mut config = SimConfig::default();
        config.agent.pacing_ms = 1;
        config.session.poll_interval_ms = 5;
        config
    }

    fn registry() -> BusRegistry {
        let registry = BusRegistry::default();
        for key in [VALIDATION, APP, MODERATOR] {
            registry.open(key, OpenMode::CreateOrAttach).unwrap();
        }
        registry
    }

    fn write_group(dir: &Path, scripts: &[&str]) -> PathBuf {
        let mut desc = format!("{}\n", scripts.len());
        for (i, body) in scripts.iter().enumerate() {
            let name = format!("user_{i}.txt");
            std::fs::write(dir.join(&name), body).unwrap();
            desc.push_str(&name);
            desc.push('\n');
        }
        let path = dir.join("group_0.txt");
        std::fs::write(&path, desc).unwrap();
        path
    }

    fn params(dir: &Path, descriptor: PathBuf) -> SessionParams {
        SessionParams {
            descriptor,
            group: GroupId::new(0),
            testcase_id: "t".into(),
            testcase_dir: dir.to_path_buf(),
            validation_key: VALIDATION,
            app_key: APP,
            moderator_key: MODERATOR,
            violation_threshold: 3,
        }
    }

    fn drain(bus: &Bus) -> Vec<Message> {
        let mut out = Vec::new();
        while let Ok(Some(env)) = bus.try_receive(TopicFilter::Any) {
            out.push(env.message);
        }
        out
    }

    #[tokio::test]
    async fn announces_group_and_users() {
        let temp = TempDir::new().unwrap();
        let desc = write_group(temp.path(), &["", ""]);
        let registry = registry();

        let report = run_group_session(params(temp.path(), desc), registry.clone(), fast_config())
            .await
            .unwrap();
        assert_eq!(report.forwarded, 0);

        let validation = registry.open(VALIDATION, OpenMode::Attach).unwrap();
        let admin: Vec<_> = drain(&validation)
            .into_iter()
            .filter_map(|m| match m {
                Message::Admin(a) => Some(a),
                _ => None,
            })
            .collect();
        assert_eq!(admin.first(), Some(&AdminEvent::created(GroupId::new(0))));
        assert_eq!(admin[1], AdminEvent::user_joined(GroupId::new(0), UserId::new(0)));
        assert_eq!(admin[2], AdminEvent::user_joined(GroupId::new(0), UserId::new(1)));
        assert_eq!(admin.last(), Some(&AdminEvent::terminated(GroupId::new(0), 0)));
    }

    #[tokio::test]
    async fn forwards_identical_copies() {
        let temp = TempDir::new().unwrap();
        let desc = write_group(temp.path(), &["1 hello\n2 there\n", "1 hi\n"]);
        let registry = registry();

        let report = run_group_session(params(temp.path(), desc), registry.clone(), fast_config())
            .await
            .unwrap();

        let validation = registry.open(VALIDATION, OpenMode::Attach).unwrap();
        let moderator = registry.open(MODERATOR, OpenMode::Attach).unwrap();
        let chats = |msgs: Vec<Message>| -> Vec<ChatEvent> {
            msgs.into_iter()
                .filter_map(|m| match m {
                    Message::Chat(c) => Some(c),
                    _ => None,
                })
                .collect()
        };
        let v = chats(drain(&validation));
        let m = chats(drain(&moderator));

        assert_eq!(v, m);
        assert_eq!(v.len(), report.forwarded);
        assert!(v.iter().all(|c| c.group_id == GroupId::new(0)));
    }

    #[tokio::test]
    async fn single_user_group_terminates_immediately() {
        let temp = TempDir::new().unwrap();
        let desc = write_group(temp.path(), &["1 a\n2 b\n"]);
        let registry = registry();

        let report = run_group_session(params(temp.path(), desc), registry.clone(), fast_config())
            .await
            .unwrap();
        assert_eq!(report.forwarded, 0);
        assert_eq!(report.users[0].state, UserState::Active);

        let app = registry.open(APP, OpenMode::Attach).unwrap();
        let env = app.try_receive(TopicFilter::Any).unwrap().unwrap();
        assert_eq!(env.topic, Topic::GroupTerminated);
    }

    #[tokio::test]
    async fn removal_ends_group_of_two() {
        let temp = TempDir::new().unwrap();
        let long: String = (0..400).map(|i| format!("{i} word\n")).collect();
        let desc = write_group(temp.path(), &[&long, &long]);
        let registry = registry();
        let moderator = registry.open(MODERATOR, OpenMode::Attach).unwrap();

        moderator
            .send(RemovalCommand::new(GroupId::new(0), UserId::new(1)))
            .await
            .unwrap();
        // unknown user, ignored
        moderator
            .send(RemovalCommand::new(GroupId::new(0), UserId::new(9)))
            .await
            .unwrap();

        let report = run_group_session(params(temp.path(), desc), registry.clone(), fast_config())
            .await
            .unwrap();

        assert_eq!(report.removed, 1);
        assert_eq!(report.users[1].state, UserState::Removed);
        assert!(report.forwarded < 800);
    }

    #[tokio::test]
    async fn removed_user_forwards_nothing_more() {
        let temp = TempDir::new().unwrap();
        let steady: String = (0..300).map(|i| format!("{i} word\n")).collect();
        let chatty: String = (0..1000).map(|i| format!("{i} chatter\n")).collect();
        let desc = write_group(temp.path(), &[&steady, &chatty, &steady]);
        let registry = registry();
        let (g, target) = (GroupId::new(0), UserId::new(1));

        let mut session = GroupSession::start(params(temp.path(), desc), &registry, &fast_config())
            .await
            .unwrap();

        tokio::time::timeout(Duration::from_secs(5), async {
            while session.forwarded_by_user[1] == 0 {
                session.service_streams().await.unwrap();
            }
        })
        .await
        .expect("user 1 forwarded something");

        let moderator = registry.open(MODERATOR, OpenMode::Attach).unwrap();
        moderator.send(RemovalCommand::new(g, target)).await.unwrap();
        session.drain_removals().unwrap();
        assert_eq!(session.users[1].state(), UserState::Removed);
        let at_removal = session.forwarded_by_user[1];

        // lines already queued on the fan-in must not leak through
        for _ in 0..20 {
            if session.active_count() < 2 {
                break;
            }
            session.service_streams().await.unwrap();
            assert_eq!(session.forwarded_by_user[1], at_removal);
        }

        let report = session.run().await.unwrap();
        assert_eq!(report.users[1].state, UserState::Removed);
        assert_eq!(report.users[1].forwarded, at_removal);
        assert!(report.agents[1].undelivered > 0);

        let validation = registry.open(VALIDATION, OpenMode::Attach).unwrap();
        let from_target = drain(&validation)
            .into_iter()
            .filter(|m| matches!(m, Message::Chat(c) if c.user_id == target))
            .count();
        assert_eq!(from_target, at_removal);
    }

    #[tokio::test]
    async fn missing_bus_is_fatal() {
        let temp = TempDir::new().unwrap();
        let desc = write_group(temp.path(), &["", ""]);
        let registry = BusRegistry::default();

        let err = run_group_session(params(temp.path(), desc), registry, fast_config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_BUS");
    }

    #[tokio::test]
    async fn missing_script_is_fatal() {
        let temp = TempDir::new().unwrap();
        let desc = temp.path().join("group_0.txt");
        std::fs::write(&desc, "1\nnobody.txt\n").unwrap();

        let err = run_group_session(params(temp.path(), desc), registry(), fast_config())
            .await
            .unwrap_err();
        assert_eq!(err.code(), "SESSION_CONFIG");
    }
}
