//! Editing suggestions raised against chapter text.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::chapter::ChapterId;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SuggestionKind {
    Grammar,
    Style,
    Content,
}

impl fmt::Display for SuggestionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Grammar => "grammar",
            Self::Style => "style",
            Self::Content => "content",
        };
        f.write_str(s)
    }
}

/// A single editing suggestion. Only the session holds these; they are not
/// persisted with the project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditingSuggestion {
    pub chapter_id: ChapterId,
    /// Character offset into the chapter content
    pub position: usize,
    #[serde(rename = "type")]
    pub kind: SuggestionKind,
    pub suggestion: String,
    #[serde(default)]
    pub resolved: bool,
}

impl EditingSuggestion {
    pub fn new(
        chapter_id: ChapterId,
        position: usize,
        kind: SuggestionKind,
        suggestion: impl Into<String>,
    ) -> Self {
        Self { chapter_id, position, kind, suggestion: suggestion.into(), resolved: false }
    }
}
