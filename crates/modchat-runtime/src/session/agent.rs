//! User agent: replays a script onto a private stream.
//!
//! The agent writes one line per record, then sleeps for the pacing
//! delay. It has no cancellation signal. Once the session drops the read
//! side (the user was removed, or the group terminated) the next write
//! fails with `BrokenPipe`; the remaining records are counted as
//! undelivered and the agent returns.

use crate::config::UserScript;
use modchat_types::UserId;
use serde::Serialize;
use std::time::Duration;
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::{debug, trace};

/// What an agent managed to write.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct AgentReport {
    /// Agent's user.
    pub user: UserId,
    /// Records written to the stream.
    pub delivered: usize,
    /// Records left when the reader went away.
    pub undelivered: usize,
}

/// Paced writer for one user.
#[derive(Debug)]
pub struct UserAgent<W> {
    user: UserId,
    script: UserScript,
    pacing: Duration,
    stream: W,
}

impl<W> UserAgent<W>
where
    W: AsyncWrite + Unpin,
{
    /// Creates an agent writing `script` to `stream`.
    #[must_use]
    pub fn new(user: UserId, script: UserScript, pacing: Duration, stream: W) -> Self {
        Self {
            user,
            script,
            pacing,
            stream,
        }
    }

    /// Writes every record, pacing between them, then closes the stream.
    ///
    /// Stops early if the reader is gone.
    pub async fn run(mut self) -> AgentReport {
        let total = self.script.len();
        let mut delivered = 0;
        let mut reader_gone = false;

        for line in &self.script.lines {
            let mut record = String::with_capacity(line.len() + 1);
            record.push_str(line);
            record.push('\n');

            match self.stream.write_all(record.as_bytes()).await {
                Ok(()) => {
                    delivered += 1;
                    trace!(user = %self.user, "record written");
                }
                Err(e) => {
                    debug!(user = %self.user, error = %e, "stream closed by reader");
                    reader_gone = true;
                    break;
                }
            }

            tokio::time::sleep(self.pacing).await;
        }

        if !reader_gone {
            let _ = self.stream.shutdown().await;
        }

        AgentReport {
            user: self.user,
            delivered,
            undelivered: total - delivered,
        }
    }
}
