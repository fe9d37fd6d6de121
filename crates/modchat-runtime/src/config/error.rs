//! Configuration errors.
//!
//! Every variant is fatal: the simulation refuses to start on a bad
//! testcase rather than run a partial one.
//!
//! | Variant | Code |
//! |---------|------|
//! | [`ConfigError::ReadFile`] | `CONFIG_READ_FILE` |
//! | [`ConfigError::MissingFile`] | `CONFIG_MISSING_FILE` |
//! | [`ConfigError::Malformed`] | `CONFIG_MALFORMED` |
//! | [`ConfigError::ParseToml`] | `CONFIG_PARSE_TOML` |
//! | [`ConfigError::InvalidEnvVar`] | `CONFIG_INVALID_ENV_VAR` |
//! | [`ConfigError::CapacityExceeded`] | `CONFIG_CAPACITY_EXCEEDED` |

use modchat_types::ErrorCode;
use std::path::PathBuf;
use thiserror::Error;

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A file exists but could not be read.
    #[error("failed to read '{path}': {source}")]
    ReadFile {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A referenced file does not exist.
    #[error("file '{0}' does not exist")]
    MissingFile(PathBuf),

    /// A testcase file does not follow its format.
    #[error("malformed '{path}': {message}")]
    Malformed { path: PathBuf, message: String },

    /// A tuning file is not valid TOML for [`SimConfig`](super::SimConfig).
    #[error("failed to parse config file '{path}': {source}")]
    ParseToml {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A `MODCHAT_*` environment variable has an unusable value.
    #[error("invalid value for environment variable '{name}': {message}")]
    InvalidEnvVar { name: String, message: String },

    /// More groups, users or words than the configured maximum.
    #[error("{what} count {count} exceeds maximum {max}")]
    CapacityExceeded {
        what: &'static str,
        count: usize,
        max: usize,
    },
}

impl ConfigError {
    /// Creates a read file error.
    pub fn read_file(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::ReadFile {
            path: path.into(),
            source,
        }
    }

    /// Creates a malformed-file error.
    pub fn malformed(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Malformed {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Creates a parse TOML error.
    pub fn parse_toml(path: impl Into<PathBuf>, source: toml::de::Error) -> Self {
        Self::ParseToml {
            path: path.into(),
            source,
        }
    }

    /// Creates an invalid env var error.
    pub fn invalid_env_var(name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidEnvVar {
            name: name.into(),
            message: message.into(),
        }
    }

    /// Creates a capacity error.
    pub fn capacity(what: &'static str, count: usize, max: usize) -> Self {
        Self::CapacityExceeded { what, count, max }
    }

    /// Reads a whole file, mapping not-found to [`ConfigError::MissingFile`].
    pub(crate) fn read_to_string(path: &std::path::Path) -> Result<String, Self> {
        std::fs::read_to_string(path).map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                Self::MissingFile(path.to_path_buf())
            } else {
                Self::read_file(path, e)
            }
        })
    }
}

impl ErrorCode for ConfigError {
    fn code(&self) -> &'static str {
        match self {
            Self::ReadFile { .. } => "CONFIG_READ_FILE",
            Self::MissingFile(_) => "CONFIG_MISSING_FILE",
            Self::Malformed { .. } => "CONFIG_MALFORMED",
            Self::ParseToml { .. } => "CONFIG_PARSE_TOML",
            Self::InvalidEnvVar { .. } => "CONFIG_INVALID_ENV_VAR",
            Self::CapacityExceeded { .. } => "CONFIG_CAPACITY_EXCEEDED",
        }
    }

    fn is_recoverable(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use modchat_types::assert_error_codes;

    fn toml_error() -> toml::de::Error {
        toml::from_str::<toml::Value>("= nope").unwrap_err()
    }

    #[test]
    fn all_error_codes_valid() {
        assert_error_codes(
            &[
                ConfigError::read_file("x", std::io::Error::other("boom")),
                ConfigError::MissingFile("x".into()),
                ConfigError::malformed("x", "bad"),
                ConfigError::parse_toml("x", toml_error()),
                ConfigError::invalid_env_var("X", "bad"),
                ConfigError::capacity("group", 31, 30),
            ],
            "CONFIG_",
        );
    }

    #[test]
    fn capacity_display() {
        let err = ConfigError::capacity("group", 31, 30);
        assert_eq!(err.to_string(), "group count 31 exceeds maximum 30");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn missing_file_is_detected() {
        let err = ConfigError::read_to_string(std::path::Path::new("/definitely/not/here.txt"))
            .unwrap_err();
        assert_eq!(err.code(), "CONFIG_MISSING_FILE");
    }
}
