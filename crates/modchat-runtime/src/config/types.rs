//! Runtime tuning types.
//!
//! All types implement [`Default`]; every field is optional in a TOML
//! file thanks to `#[serde(default)]`.

use crate::bus::BusOptions;
use modchat_event::{RecordParser, TextPolicy, DEFAULT_MAX_TEXT_BYTES};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Unified tuning configuration after all layers are merged.
///
/// # Example
///
/// ```
/// use modchat_runtime::config::SimConfig;
///
/// let config = SimConfig::from_toml("[agent]\npacing_ms = 1\n").unwrap();
/// assert_eq!(config.agent.pacing_ms, 1);
/// assert_eq!(config.limits.max_groups, 30);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SimConfig {
    /// User agent pacing and stream sizing.
    pub agent: AgentConfig,
    /// Group session loop timing.
    pub session: SessionConfig,
    /// Bus capacity and send timeout.
    pub bus: BusConfig,
    /// Capacity limits and text policy.
    pub limits: LimitsConfig,
}

impl SimConfig {
    /// Serializes to a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if serialization fails.
    pub fn to_toml(&self) -> Result<String, toml::ser::Error> {
        toml::to_string_pretty(self)
    }

    /// Deserializes from a TOML string.
    ///
    /// # Errors
    ///
    /// Returns error if the string is not valid TOML for this type.
    pub fn from_toml(toml_str: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(toml_str)
    }

    /// Merges `other` into `self`.
    ///
    /// A field of `other` wins only if it differs from the default, so a
    /// file that sets one key does not reset the others.
    pub fn merge(&mut self, other: &Self) {
        let d = Self::default();

        if other.agent.pacing_ms != d.agent.pacing_ms {
            self.agent.pacing_ms = other.agent.pacing_ms;
        }
        if other.agent.stream_buffer_bytes != d.agent.stream_buffer_bytes {
            self.agent.stream_buffer_bytes = other.agent.stream_buffer_bytes;
        }
        if other.session.poll_interval_ms != d.session.poll_interval_ms {
            self.session.poll_interval_ms = other.session.poll_interval_ms;
        }
        if other.bus.capacity != d.bus.capacity {
            self.bus.capacity = other.bus.capacity;
        }
        if other.bus.send_timeout_ms != d.bus.send_timeout_ms {
            self.bus.send_timeout_ms = other.bus.send_timeout_ms;
        }
        if other.limits.max_groups != d.limits.max_groups {
            self.limits.max_groups = other.limits.max_groups;
        }
        if other.limits.max_users_per_group != d.limits.max_users_per_group {
            self.limits.max_users_per_group = other.limits.max_users_per_group;
        }
        if other.limits.max_filtered_words != d.limits.max_filtered_words {
            self.limits.max_filtered_words = other.limits.max_filtered_words;
        }
        if other.limits.max_text_bytes != d.limits.max_text_bytes {
            self.limits.max_text_bytes = other.limits.max_text_bytes;
        }
        if other.limits.text_policy != d.limits.text_policy {
            self.limits.text_policy = other.limits.text_policy;
        }
    }

    /// Returns the bus options for newly created buses.
    #[must_use]
    pub fn bus_options(&self) -> BusOptions {
        BusOptions {
            capacity: self.bus.capacity.max(1),
            send_timeout: Duration::from_millis(self.bus.send_timeout_ms),
        }
    }

    /// Returns the record parser group sessions use.
    #[must_use]
    pub fn record_parser(&self) -> RecordParser {
        RecordParser::new(self.limits.max_text_bytes, self.limits.text_policy)
    }
}

/// User agent settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct AgentConfig {
    /// Delay between two records, in milliseconds.
    pub pacing_ms: u64,
    /// Size of each private user stream, in bytes.
    pub stream_buffer_bytes: usize,
}

impl AgentConfig {
    /// Returns the pacing delay.
    #[must_use]
    pub fn pacing(&self) -> Duration {
        Duration::from_millis(self.pacing_ms)
    }
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            pacing_ms: 5,
            stream_buffer_bytes: 4096,
        }
    }
}

/// Group session settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct SessionConfig {
    /// Longest wait on the fan-in queue before a cycle proceeds without
    /// chat data, in milliseconds.
    pub poll_interval_ms: u64,
}

impl SessionConfig {
    /// Returns the poll interval.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms.max(1))
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            poll_interval_ms: 50,
        }
    }
}

/// Bus settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct BusConfig {
    /// Maximum queued messages per bus.
    pub capacity: usize,
    /// How long a send may wait for space, in milliseconds.
    pub send_timeout_ms: u64,
}

impl Default for BusConfig {
    fn default() -> Self {
        let options = BusOptions::default();
        Self {
            capacity: options.capacity,
            send_timeout_ms: options.send_timeout.as_millis() as u64,
        }
    }
}

/// Capacity limits, checked before anything is spawned.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum number of groups in a testcase.
    pub max_groups: usize,
    /// Maximum number of users in one group.
    pub max_users_per_group: usize,
    /// Filtered words beyond this count are ignored.
    pub max_filtered_words: usize,
    /// Longest accepted chat token, in bytes.
    pub max_text_bytes: usize,
    /// What happens to tokens longer than `max_text_bytes`.
    pub text_policy: TextPolicy,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_groups: 30,
            max_users_per_group: 50,
            max_filtered_words: 50,
            max_text_bytes: DEFAULT_MAX_TEXT_BYTES,
            text_policy: TextPolicy::Reject,
        }
    }
}
