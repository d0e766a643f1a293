//! Chapters and their identifiers.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::ParseError;

const CHAPTER_PREFIX: &str = "chapter-";

/// Chapter identifier, stored as `chapter-{n}` with `n >= 1`.
///
/// Ordering follows the numeric ordinal, so `chapter-10` sorts after
/// `chapter-9`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ChapterId(u32);

impl ChapterId {
    /// Create an id from a 1-based ordinal. Zero is bumped to 1.
    pub fn new(ordinal: u32) -> Self {
        Self(ordinal.max(1))
    }

    pub fn ordinal(self) -> u32 {
        self.0
    }

    /// One past the highest ordinal in `ids`, or `chapter-1` when empty.
    pub fn next_after<'a>(ids: impl IntoIterator<Item = &'a Self>) -> Self {
        let highest = ids.into_iter().map(|id| id.0).max().unwrap_or(0);
        Self::new(highest.saturating_add(1))
    }
}

impl fmt::Display for ChapterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{CHAPTER_PREFIX}{}", self.0)
    }
}

impl FromStr for ChapterId {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(CHAPTER_PREFIX)
            .and_then(|n| n.parse::<u32>().ok())
            .filter(|n| *n >= 1)
            .map(Self)
            .ok_or_else(|| ParseError::new("chapter id", s, &["chapter-1", "chapter-2", "..."]))
    }
}

impl Serialize for ChapterId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ChapterId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// Chapter lifecycle status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChapterStatus {
    #[default]
    Draft,
    Review,
    Complete,
}

impl ChapterStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::Review => "review",
            Self::Complete => "complete",
        }
    }
}

impl fmt::Display for ChapterStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChapterStatus {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "draft" => Ok(Self::Draft),
            "review" => Ok(Self::Review),
            "complete" => Ok(Self::Complete),
            _ => Err(ParseError::new("chapter status", s, &["draft", "review", "complete"])),
        }
    }
}

/// One chapter of the manuscript.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Chapter {
    pub title: String,

    #[serde(default)]
    pub content: String,

    #[serde(default)]
    pub status: ChapterStatus,

    /// Whitespace-delimited token count of `content`
    #[serde(default)]
    pub word_count: usize,
}

impl Chapter {
    /// Empty draft chapter.
    pub fn new(title: impl Into<String>) -> Self {
        Self { title: title.into(), content: String::new(), status: ChapterStatus::Draft, word_count: 0 }
    }

    /// Replace the content and recompute the word count.
    pub fn set_content(&mut self, content: impl Into<String>) {
        self.content = content.into();
        self.word_count = word_count(&self.content);
    }

    /// Whether `word_count` agrees with `content`.
    pub fn is_consistent(&self) -> bool {
        self.word_count == word_count(&self.content)
    }
}

/// Number of whitespace-delimited tokens. Blank text counts as zero.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}
