//! Tuning config loader with layered merging.
//!
//! # Load Order
//!
//! 1. Default values (compile-time)
//! 2. Project config (`<root>/.modchat/config.toml`)
//! 3. Explicit config file (`--config`)
//! 4. Environment variables (`MODCHAT_*`)
//!
//! Each layer overrides the previous.
//!
//! # Limitation
//!
//! File layers are merged with [`SimConfig::merge`], which only takes a
//! field whose value differs from the default. A later file that sets a
//! key back to its default value (for example `pacing_ms = 5`) therefore
//! leaves an earlier file's value in place. Environment variables are
//! assigned directly and do not have this limitation.

use super::{ConfigError, SimConfig, PROJECT_CONFIG_DIR, PROJECT_CONFIG_FILE};
use modchat_event::TextPolicy;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Parses a numeric environment variable into a config field.
macro_rules! parse_env_num {
    ($field:expr, $var:literal) => {
        if let Ok(val) = std::env::var($var) {
            $field = val
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_env_var($var, "expected a number"))?;
        }
    };
}

/// Configuration loader with builder pattern.
///
/// # Example
///
/// ```ignore
/// use modchat_runtime::config::ConfigLoader;
///
/// let config = ConfigLoader::new()
///     .with_project_root("/path/to/testcases")
///     .skip_env_vars()
///     .load()?;
/// ```
#[derive(Debug, Clone, Default)]
pub struct ConfigLoader {
    project_root: Option<PathBuf>,
    config_file: Option<PathBuf>,
    skip_env: bool,
    skip_project: bool,
}

impl ConfigLoader {
    /// Creates a new loader with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the directory whose `.modchat/config.toml` is loaded.
    #[must_use]
    pub fn with_project_root(mut self, path: impl Into<PathBuf>) -> Self {
        self.project_root = Some(path.into());
        self
    }

    /// Adds an explicit config file. Unlike the project file it must exist.
    #[must_use]
    pub fn with_config_file(mut self, path: impl Into<PathBuf>) -> Self {
        self.config_file = Some(path.into());
        self
    }

    /// Skips environment variable loading.
    #[must_use]
    pub fn skip_env_vars(mut self) -> Self {
        self.skip_env = true;
        self
    }

    /// Skips project config loading.
    #[must_use]
    pub fn skip_project_config(mut self) -> Self {
        self.skip_project = true;
        self
    }

    /// Loads and merges configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a config file cannot be read or parsed,
    /// if the explicit config file is missing, or if a `MODCHAT_*`
    /// variable is invalid.
    pub fn load(&self) -> Result<SimConfig, ConfigError> {
        let mut config = SimConfig::default();

        if !self.skip_project {
            if let Some(ref root) = self.project_root {
                let path = root.join(PROJECT_CONFIG_DIR).join(PROJECT_CONFIG_FILE);
                if path.exists() {
                    config.merge(&Self::load_file(&path)?);
                    debug!(path = %path.display(), "Loaded project config");
                }
            }
        }

        if let Some(ref path) = self.config_file {
            config.merge(&Self::load_file(path)?);
            debug!(path = %path.display(), "Loaded config file");
        }

        if !self.skip_env {
            Self::apply_env_vars(&mut config)?;
        }

        Ok(config)
    }

    fn load_file(path: &Path) -> Result<SimConfig, ConfigError> {
        let content = ConfigError::read_to_string(path)?;
        SimConfig::from_toml(&content).map_err(|e| ConfigError::parse_toml(path, e))
    }

    fn apply_env_vars(config: &mut SimConfig) -> Result<(), ConfigError> {
        parse_env_num!(config.agent.pacing_ms, "MODCHAT_PACING_MS");
        parse_env_num!(config.session.poll_interval_ms, "MODCHAT_POLL_INTERVAL_MS");
        parse_env_num!(config.bus.capacity, "MODCHAT_BUS_CAPACITY");
        parse_env_num!(config.bus.send_timeout_ms, "MODCHAT_SEND_TIMEOUT_MS");
        parse_env_num!(config.limits.max_text_bytes, "MODCHAT_MAX_TEXT_BYTES");

        if let Ok(val) = std::env::var("MODCHAT_TEXT_POLICY") {
            config.limits.text_policy = parse_text_policy(&val).ok_or_else(|| {
                ConfigError::invalid_env_var("MODCHAT_TEXT_POLICY", "expected reject or truncate")
            })?;
        }

        Ok(())
    }
}

fn parse_text_policy(s: &str) -> Option<TextPolicy> {
    match s.trim().to_lowercase().as_str() {
        "reject" => Some(TextPolicy::Reject),
        "truncate" => Some(TextPolicy::Truncate),
        _ => None,
    }
}
