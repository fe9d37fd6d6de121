//! Filtered word list.

use crate::config::ConfigError;
use std::path::Path;
use tracing::{debug, warn};

/// Lowercase, deduplicated, bounded set of words matched as substrings.
///
/// # Example
///
/// ```
/// use modchat_runtime::moderation::FilteredWordSet;
///
/// let words = FilteredWordSet::from_words(["Spam", "scam", "SPAM"], 50);
/// assert_eq!(words.len(), 2);
/// assert_eq!(words.count_hits("SPAMSCAM!"), 2);
/// assert_eq!(words.count_hits("spamspamspam"), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilteredWordSet {
    words: Vec<String>,
}

impl FilteredWordSet {
    /// Builds a set from raw words, keeping at most `max` distinct ones.
    ///
    /// Words past the cap are ignored with a warning.
    pub fn from_words<I, S>(words: I, max: usize) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut kept: Vec<String> = Vec::new();
        let mut ignored = 0usize;

        for word in words {
            let word = word.as_ref().trim().to_lowercase();
            if word.is_empty() || kept.contains(&word) {
                continue;
            }
            if kept.len() >= max {
                ignored += 1;
                continue;
            }
            kept.push(word);
        }

        if ignored > 0 {
            warn!(kept = kept.len(), ignored, max, "Filtered word list truncated");
        }
        Self { words: kept }
    }

    /// Loads whitespace-separated words from a file.
    ///
    /// # Errors
    ///
    /// [`ConfigError::MissingFile`] or [`ConfigError::ReadFile`].
    pub fn from_file(path: &Path, max: usize) -> Result<Self, ConfigError> {
        let text = ConfigError::read_to_string(path)?;
        let set = Self::from_words(text.split_whitespace(), max);
        debug!(path = %path.display(), words = set.len(), "Loaded filtered words");
        Ok(set)
    }

    /// Number of distinct words in `text` (case-insensitive substrings).
    #[must_use]
    pub fn count_hits(&self, text: &str) -> u32 {
        let lowered = text.to_lowercase();
        let hits = self
            .words
            .iter()
            .filter(|w| lowered.contains(w.as_str()))
            .count();
        u32::try_from(hits).unwrap_or(u32::MAX)
    }

    /// Number of words.
    #[must_use]
    pub fn len(&self) -> usize {
        self.words.len()
    }

    /// Returns `true` if no word is filtered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.words.is_empty()
    }

    /// Iterates over the words.
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.words.iter().map(String::as_str)
    }
}
