//! Shared E2E test helpers for `modchat` binary tests.

#![allow(dead_code)]

use assert_cmd::cargo::cargo_bin_cmd;
use std::path::Path;
use std::time::Duration;
use tempfile::TempDir;

/// Default timeout for one simulation run.
pub const TIMEOUT_BASIC: Duration = Duration::from_secs(20);

/// Environment variables that would change tuning under the tests.
const MODCHAT_VARS: &[&str] = &[
    "MODCHAT_PACING_MS",
    "MODCHAT_POLL_INTERVAL_MS",
    "MODCHAT_BUS_CAPACITY",
    "MODCHAT_SEND_TIMEOUT_MS",
    "MODCHAT_MAX_TEXT_BYTES",
    "MODCHAT_TEXT_POLICY",
    "RUST_LOG",
];

/// Build a Command for the `modchat` binary with a clean environment.
pub fn modchat_cmd() -> assert_cmd::Command {
    let mut cmd: assert_cmd::Command = cargo_bin_cmd!("modchat");
    cmd.timeout(TIMEOUT_BASIC);
    for var in MODCHAT_VARS {
        cmd.env_remove(var);
    }
    cmd
}

/// Build a Command pointed at `root` with fast pacing.
pub fn modchat_in(root: &Path) -> assert_cmd::Command {
    let mut cmd = modchat_cmd();
    cmd.arg("-C").arg(root);
    cmd.env("MODCHAT_PACING_MS", "1");
    cmd.env("MODCHAT_POLL_INTERVAL_MS", "10");
    cmd
}

/// `n` records of `text`, one per line.
pub fn script(n: usize, text: &str) -> String {
    (0..n).map(|i| format!("{i} {text}\n")).collect()
}

/// On-disk testcase builder.
pub struct TestcaseBuilder {
    id: String,
    threshold: u32,
    words: String,
    groups: Vec<Vec<String>>,
}

impl TestcaseBuilder {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            threshold: 3,
            words: "spam\nscam\n".to_string(),
            groups: Vec::new(),
        }
    }

    pub fn threshold(mut self, threshold: u32) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn words(mut self, words: &str) -> Self {
        self.words = words.to_string();
        self
    }

    pub fn group(mut self, users: Vec<String>) -> Self {
        self.groups.push(users);
        self
    }

    /// Writes `testcase_<id>/` under a fresh temp dir.
    pub fn write(self) -> TempDir {
        let root = tempfile::tempdir().expect("create temp root");
        self.write_into(root.path());
        root
    }

    /// Writes `testcase_<id>/` under `root`.
    pub fn write_into(self, root: &Path) {
        let dir = root.join(format!("testcase_{}", self.id));
        std::fs::create_dir_all(&dir).expect("create testcase dir");
        std::fs::write(dir.join("filtered_words.txt"), &self.words).expect("write words");

        let mut input = format!("{} 501 502 503 {}\n", self.groups.len(), self.threshold);
        for (g, users) in self.groups.iter().enumerate() {
            let mut desc = format!("{}\n", users.len());
            for (u, body) in users.iter().enumerate() {
                let name = format!("user_{g}_{u}.txt");
                std::fs::write(dir.join(&name), body).expect("write user script");
                desc.push_str(&name);
                desc.push('\n');
            }
            let name = format!("group_{g}.txt");
            std::fs::write(dir.join(&name), desc).expect("write group descriptor");
            input.push_str(&name);
            input.push('\n');
        }
        std::fs::write(dir.join("input.txt"), input).expect("write input.txt");
    }
}
