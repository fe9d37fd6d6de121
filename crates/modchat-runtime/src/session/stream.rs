//! Fan-in of user streams.
//!
//! One reader task per user turns its stream into [`StreamItem`]s on a
//! single queue the session loop consumes with a bounded wait:
//!
//! ```text
//! user 0 stream ──► reader ──┐
//! user 1 stream ──► reader ──┼──► mpsc<StreamItem> ──► GroupSession::run
//! user 2 stream ──► reader ──┘
//! ```
//!
//! Each reader ends with exactly one `Eof` or `Failed` item unless it is
//! aborted first. Aborting a reader drops its read half, which the agent
//! on the other side observes as a broken pipe.

use modchat_types::UserId;
use tokio::io::{AsyncBufReadExt, AsyncRead, BufReader};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::trace;

/// What a reader observed on its stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// One line, newline stripped.
    Line(String),
    /// Zero-byte read: the agent closed its side.
    Eof,
    /// The stream failed; treated like EOF by the session.
    Failed(String),
}

/// A [`StreamEvent`] tagged with its user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StreamItem {
    /// Stream owner.
    pub user: UserId,
    /// What happened.
    pub event: StreamEvent,
}

/// Spawns a reader forwarding `stream` into `tx`.
///
/// The task ends after EOF, on a read error, or when the receiver is gone.
pub fn spawn_reader<R>(user: UserId, stream: R, tx: mpsc::Sender<StreamItem>) -> JoinHandle<()>
where
    R: AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let mut lines = BufReader::new(stream).lines();
        loop {
            let event = match lines.next_line().await {
                Ok(Some(line)) => StreamEvent::Line(line),
                Ok(None) => StreamEvent::Eof,
                Err(e) => StreamEvent::Failed(e.to_string()),
            };
            let last = !matches!(event, StreamEvent::Line(_));

            if tx.send(StreamItem { user, event }).await.is_err() {
                trace!(user = %user, "fan-in closed, reader exiting");
                return;
            }
            if last {
                return;
            }
        }
    })
}
