//! Testcase files.
//!
//! ```text
//! <root>/testcase_<id>/
//! ├── input.txt            n_groups validation_key app_key moderator_key threshold
//! │                        followed by n_groups group descriptor paths
//! ├── filtered_words.txt   one word per line
//! ├── groups/group_0.txt   n_users followed by n_users user script paths
//! └── users/user_0_0.txt   "<timestamp> <token>" per line
//! ```
//!
//! Every relative path inside these files resolves against the testcase
//! directory. All files are whitespace-token formats; line breaks carry no
//! meaning except in user scripts.

use super::{ConfigError, LimitsConfig};
use crate::bus::BusKey;
use std::path::{Path, PathBuf};

/// Name of the top-level testcase file.
pub const INPUT_FILE: &str = "input.txt";

/// Name of the filtered-words file.
pub const FILTERED_WORDS_FILE: &str = "filtered_words.txt";

/// Returns `<root>/testcase_<id>`.
#[must_use]
pub fn testcase_dir(root: &Path, id: &str) -> PathBuf {
    root.join(format!("testcase_{id}"))
}

/// Parsed `input.txt`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TestcaseConfig {
    /// Testcase identifier (`<id>` in `testcase_<id>`).
    pub id: String,
    /// Directory every relative path resolves against.
    pub dir: PathBuf,
    /// Number of groups to spawn.
    pub n_groups: usize,
    /// Key of the validation bus.
    pub validation_key: BusKey,
    /// Key of the orchestrator's bus.
    pub app_key: BusKey,
    /// Key of the moderation bus.
    pub moderator_key: BusKey,
    /// Violation count at which a user is removed.
    pub violation_threshold: u32,
    /// Group descriptor paths, already resolved against `dir`.
    pub group_files: Vec<PathBuf>,
}

impl TestcaseConfig {
    /// Loads `<root>/testcase_<id>/input.txt`.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] if the file is absent,
    /// [`ConfigError::Malformed`] if it does not follow the format.
    pub fn load(root: &Path, id: &str) -> Result<Self, ConfigError> {
        let dir = testcase_dir(root, id);
        let path = dir.join(INPUT_FILE);
        let text = ConfigError::read_to_string(&path)?;
        Self::parse(&text, id, &dir, &path)
    }

    /// Parses the contents of an `input.txt`.
    ///
    /// `source` is only used in error messages.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Malformed`] on a missing or non-numeric header field,
    /// a negative group count or threshold, or fewer paths than groups.
    pub fn parse(text: &str, id: &str, dir: &Path, source: &Path) -> Result<Self, ConfigError> {
        let mut tokens = text.split_whitespace();
        let mut header = |name: &str| -> Result<i64, ConfigError> {
            let token = tokens
                .next()
                .ok_or_else(|| ConfigError::malformed(source, format!("missing {name}")))?;
            token.parse::<i64>().map_err(|_| {
                ConfigError::malformed(source, format!("{name} '{token}' is not an integer"))
            })
        };

        let n_groups = header("group count")?;
        let validation_key = header("validation key")?;
        let app_key = header("app key")?;
        let moderator_key = header("moderator key")?;
        let threshold = header("violation threshold")?;

        let n_groups = usize::try_from(n_groups)
            .map_err(|_| ConfigError::malformed(source, "group count is negative"))?;
        let violation_threshold = u32::try_from(threshold)
            .map_err(|_| ConfigError::malformed(source, "violation threshold is negative"))?;

        let group_files: Vec<PathBuf> = tokens.take(n_groups).map(|p| dir.join(p)).collect();
        if group_files.len() < n_groups {
            return Err(ConfigError::malformed(
                source,
                format!(
                    "expected {n_groups} group paths, found {}",
                    group_files.len()
                ),
            ));
        }

        Ok(Self {
            id: id.to_string(),
            dir: dir.to_path_buf(),
            n_groups,
            validation_key: BusKey::new(validation_key),
            app_key: BusKey::new(app_key),
            moderator_key: BusKey::new(moderator_key),
            violation_threshold,
            group_files,
        })
    }

    /// Checks the bus keys, the group count and that every descriptor
    /// exists. The three bus keys must be pairwise distinct.
    ///
    /// # Errors
    ///
    /// [`ConfigError::Malformed`] if two bus keys are equal,
    /// [`ConfigError::CapacityExceeded`] or [`ConfigError::MissingFile`].
    pub fn validate(&self, limits: &LimitsConfig) -> Result<(), ConfigError> {
        let (v, a, m) = (self.validation_key, self.app_key, self.moderator_key);
        if v == a || v == m || a == m {
            return Err(ConfigError::malformed(
                self.dir.join(INPUT_FILE),
                format!("bus keys must be distinct (validation {v}, app {a}, moderator {m})"),
            ));
        }
        if self.n_groups > limits.max_groups {
            return Err(ConfigError::capacity(
                "group",
                self.n_groups,
                limits.max_groups,
            ));
        }
        for path in &self.group_files {
            if !path.is_file() {
                return Err(ConfigError::MissingFile(path.clone()));
            }
        }
        Ok(())
    }

    /// Returns the path of `filtered_words.txt`.
    #[must_use]
    pub fn filtered_words_path(&self) -> PathBuf {
        self.dir.join(FILTERED_WORDS_FILE)
    }
}

/// Parsed group descriptor.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GroupDescriptor {
    /// Descriptor file this was loaded from.
    pub path: PathBuf,
    /// User script paths in user-index order, resolved against the
    /// testcase directory.
    pub user_files: Vec<PathBuf>,
}

impl GroupDescriptor {
    /// Loads a descriptor and checks every user script exists.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] for the descriptor or any script,
    /// [`ConfigError::Malformed`] on a bad count, and
    /// [`ConfigError::CapacityExceeded`] above `max_users_per_group`.
    pub fn load(path: &Path, testcase_dir: &Path, limits: &LimitsConfig) -> Result<Self, ConfigError> {
        let text = ConfigError::read_to_string(path)?;
        let mut tokens = text.split_whitespace();

        let count_token = tokens
            .next()
            .ok_or_else(|| ConfigError::malformed(path, "missing user count"))?;
        let n_users: usize = count_token.parse().map_err(|_| {
            ConfigError::malformed(path, format!("user count '{count_token}' is not a count"))
        })?;

        if n_users > limits.max_users_per_group {
            return Err(ConfigError::capacity(
                "user",
                n_users,
                limits.max_users_per_group,
            ));
        }

        let user_files: Vec<PathBuf> = tokens.take(n_users).map(|p| testcase_dir.join(p)).collect();
        if user_files.len() < n_users {
            return Err(ConfigError::malformed(
                path,
                format!("expected {n_users} user paths, found {}", user_files.len()),
            ));
        }

        for file in &user_files {
            if !file.is_file() {
                return Err(ConfigError::MissingFile(file.clone()));
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            user_files,
        })
    }

    /// Number of users in the group.
    #[must_use]
    pub fn len(&self) -> usize {
        self.user_files.len()
    }

    /// Returns `true` for a group without users.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.user_files.is_empty()
    }
}

/// A user's scripted records, one raw line each.
///
/// Lines are not parsed here: a malformed line still travels the stream
/// and is dropped by the session, like any other bad record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UserScript {
    /// Non-blank lines, trimmed.
    pub lines: Vec<String>,
}

impl UserScript {
    /// Reads a script file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] or [`ConfigError::ReadFile`].
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = ConfigError::read_to_string(path)?;
        Ok(Self::from_text(&text))
    }

    /// Builds a script from file contents.
    #[must_use]
    pub fn from_text(text: &str) -> Self {
        let lines = text
            .lines()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .map(str::to_string)
            .collect();
        Self { lines }
    }

    /// Number of records.
    #[must_use]
    pub fn len(&self) -> usize {
        self.lines.len()
    }

    /// Returns `true` if the script has no records.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn parse(text: &str) -> Result<TestcaseConfig, ConfigError> {
        TestcaseConfig::parse(text, "1", Path::new("/tc"), Path::new("/tc/input.txt"))
    }

    #[test]
    fn parses_header_and_paths() {
        let tc = parse("2 100 200 300 3\ngroups/a.txt\ngroups/b.txt\n").unwrap();
        assert_eq!(tc.n_groups, 2);
        assert_eq!(tc.validation_key, BusKey::new(100));
        assert_eq!(tc.app_key, BusKey::new(200));
        assert_eq!(tc.moderator_key, BusKey::new(300));
        assert_eq!(tc.violation_threshold, 3);
        assert_eq!(
            tc.group_files,
            vec![
                PathBuf::from("/tc/groups/a.txt"),
                PathBuf::from("/tc/groups/b.txt")
            ]
        );
    }

    #[test]
    fn header_errors() {
        assert!(matches!(parse(""), Err(ConfigError::Malformed { .. })));
        assert!(matches!(
            parse("1 2 x 4 5 g.txt"),
            Err(ConfigError::Malformed { .. })
        ));
        assert!(matches!(
            parse("-1 2 3 4 5"),
            Err(ConfigError::Malformed { .. })
        ));
        let err = parse("2 1 2 3 4 only_one.txt").unwrap_err();
        assert!(err.to_string().contains("expected 2 group paths, found 1"));
    }

    #[test]
    fn validate_checks_capacity_and_files() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("g0.txt"), "0\n").unwrap();

        let tc = TestcaseConfig::parse(
            "1 1 2 3 3 g0.txt",
            "x",
            temp.path(),
            &temp.path().join(INPUT_FILE),
        )
        .unwrap();
        assert!(tc.validate(&LimitsConfig::default()).is_ok());

        let limits = LimitsConfig {
            max_groups: 0,
            ..LimitsConfig::default()
        };
        assert!(matches!(
            tc.validate(&limits),
            Err(ConfigError::CapacityExceeded { what: "group", .. })
        ));

        let missing = TestcaseConfig::parse(
            "1 1 2 3 3 nope.txt",
            "x",
            temp.path(),
            &temp.path().join(INPUT_FILE),
        )
        .unwrap();
        assert!(matches!(
            missing.validate(&LimitsConfig::default()),
            Err(ConfigError::MissingFile(_))
        ));
    }

    #[test]
    fn validate_rejects_shared_bus_keys() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("g0.txt"), "0\n").unwrap();
        let source = temp.path().join(INPUT_FILE);

        for header in ["1 10 10 30 3", "1 10 30 30 3", "1 30 20 30 3"] {
            let tc = TestcaseConfig::parse(&format!("{header} g0.txt"), "x", temp.path(), &source)
                .unwrap();
            let err = tc.validate(&LimitsConfig::default()).unwrap_err();
            assert!(matches!(err, ConfigError::Malformed { .. }), "{header}");
            assert!(err.to_string().contains("bus keys must be distinct"), "{header}");
        }
    }

    #[test]
    fn load_from_root() {
        let temp = TempDir::new().unwrap();
        let dir = testcase_dir(temp.path(), "7");
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(INPUT_FILE), "0 1 2 3 4\n").unwrap();

        let tc = TestcaseConfig::load(temp.path(), "7").unwrap();
        assert_eq!(tc.id, "7");
        assert_eq!(tc.n_groups, 0);
        assert_eq!(tc.filtered_words_path(), dir.join(FILTERED_WORDS_FILE));

        assert!(matches!(
            TestcaseConfig::load(temp.path(), "8"),
            Err(ConfigError::MissingFile(_))
        ));
    }

    #[test]
    fn group_descriptor_resolves_users() {
        let temp = TempDir::new().unwrap();
        std::fs::write(temp.path().join("u0.txt"), "1 hi\n").unwrap();
        std::fs::write(temp.path().join("u1.txt"), "").unwrap();
        let desc_path = temp.path().join("g.txt");
        std::fs::write(&desc_path, "2\nu0.txt\nu1.txt\n").unwrap();

        let desc = GroupDescriptor::load(&desc_path, temp.path(), &LimitsConfig::default()).unwrap();
        assert_eq!(desc.len(), 2);
        assert_eq!(desc.user_files[1], temp.path().join("u1.txt"));
    }

    #[test]
    fn group_descriptor_errors() {
        let temp = TempDir::new().unwrap();
        let desc_path = temp.path().join("g.txt");

        std::fs::write(&desc_path, "1\nmissing.txt\n").unwrap();
        assert!(matches!(
            GroupDescriptor::load(&desc_path, temp.path(), &LimitsConfig::default()),
            Err(ConfigError::MissingFile(_))
        ));

        std::fs::write(&desc_path, "51\n").unwrap();
        assert!(matches!(
            GroupDescriptor::load(&desc_path, temp.path(), &LimitsConfig::default()),
            Err(ConfigError::CapacityExceeded { what: "user", count: 51, max: 50 })
        ));

        std::fs::write(&desc_path, "two\n").unwrap();
        assert!(matches!(
            GroupDescriptor::load(&desc_path, temp.path(), &LimitsConfig::default()),
            Err(ConfigError::Malformed { .. })
        ));
    }

    #[test]
    fn user_script_skips_blank_lines() {
        let script = UserScript::from_text("1 a\n\n  2 b  \r\n\n");
        assert_eq!(script.lines, vec!["1 a", "2 b"]);
        assert!(UserScript::from_text("").is_empty());
    }
}
