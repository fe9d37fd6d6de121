//! Bus message types for modchat.
//!
//! # Message Flow
//!
//! ```text
//! ┌────────────┐  stream  ┌──────────────┐  Chat   ┌────────────┐
//! │ UserAgent  │ ───────► │ GroupSession │ ──────► │ Moderation │
//! └────────────┘  record  └──────────────┘         └────────────┘
//!                            │    ▲                      │
//!                       Admin│    │ Removal(g)           │
//!                       Chat │    └──────────────────────┘
//!                            ▼
//!                     validation / app buses
//! ```
//!
//! - [`Topic`] / [`TopicFilter`]: routing tags and receive filters
//! - [`Message`] / [`Envelope`]: the tagged payloads
//! - [`RecordParser`]: `<timestamp> <token>` stream lines
//! - [`EventError`]: per-record parse failures (recoverable)

mod error;
mod message;
mod record;
mod topic;

pub use error::EventError;
pub use message::{AdminEvent, AdminKind, ChatEvent, Envelope, Message, RemovalCommand};
pub use record::{encode_record, ChatRecord, RecordParser, TextPolicy, DEFAULT_MAX_TEXT_BYTES};
pub use topic::{
    Topic, TopicFilter, CHAT_TOPIC_BASE, TOPIC_GROUP_CREATED, TOPIC_GROUP_TERMINATED,
    TOPIC_USER_JOINED,
};
