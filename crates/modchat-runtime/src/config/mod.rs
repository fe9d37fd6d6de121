//! Testcase files and runtime tuning.
//!
//! Two kinds of configuration feed a run:
//!
//! | Aspect | Testcase | Tuning |
//! |--------|----------|--------|
//! | Format | whitespace tokens | TOML |
//! | Scope | one `testcase_<id>/` directory | project / file / env |
//! | Types | [`TestcaseConfig`], [`GroupDescriptor`], [`UserScript`] | [`SimConfig`] |
//! | Errors | always fatal | always fatal |
//!
//! # Tuning Priority
//!
//! ```text
//! Priority (highest to lowest):
//!
//! ┌─────────────────────────────────────────────┐
//! │  1. CLI flags (applied by the binary)       │
//! ├─────────────────────────────────────────────┤
//! │  2. Environment Variables (MODCHAT_*)       │
//! ├─────────────────────────────────────────────┤
//! │  3. Explicit file (--config)                │
//! ├─────────────────────────────────────────────┤
//! │  4. Project Config (.modchat/config.toml)   │
//! ├─────────────────────────────────────────────┤
//! │  5. Default Values (compile-time)           │
//! └─────────────────────────────────────────────┘
//! ```
//!
//! # Environment Variables
//!
//! | Variable | Config Field | Type |
//! |----------|--------------|------|
//! | `MODCHAT_PACING_MS` | `agent.pacing_ms` | u64 |
//! | `MODCHAT_POLL_INTERVAL_MS` | `session.poll_interval_ms` | u64 |
//! | `MODCHAT_BUS_CAPACITY` | `bus.capacity` | usize |
//! | `MODCHAT_SEND_TIMEOUT_MS` | `bus.send_timeout_ms` | u64 |
//! | `MODCHAT_MAX_TEXT_BYTES` | `limits.max_text_bytes` | usize |
//! | `MODCHAT_TEXT_POLICY` | `limits.text_policy` | `reject` / `truncate` |
//!
//! # Example Configuration
//!
//! ```toml
//! # <root>/.modchat/config.toml
//!
//! [agent]
//! pacing_ms = 5
//! stream_buffer_bytes = 4096
//!
//! [session]
//! poll_interval_ms = 50
//!
//! [bus]
//! capacity = 4096
//! send_timeout_ms = 1000
//!
//! [limits]
//! max_groups = 30
//! max_users_per_group = 50
//! max_filtered_words = 50
//! max_text_bytes = 255
//! text_policy = "reject"
//! ```

mod error;
mod loader;
mod testcase;
mod types;

pub use error::ConfigError;
pub use loader::ConfigLoader;
pub use testcase::{
    testcase_dir, GroupDescriptor, TestcaseConfig, UserScript, FILTERED_WORDS_FILE, INPUT_FILE,
};
pub use types::{AgentConfig, BusConfig, LimitsConfig, SessionConfig, SimConfig};

/// Project-local config directory name.
pub const PROJECT_CONFIG_DIR: &str = ".modchat";

/// Config file name inside [`PROJECT_CONFIG_DIR`].
pub const PROJECT_CONFIG_FILE: &str = "config.toml";
