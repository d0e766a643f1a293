//! Data model for book projects.
//!
//! Everything a pipeline reads or writes lives here: the [`ProjectRecord`]
//! root entity and the artifacts merged into it (chapters, research
//! snapshots, marketing tasks), plus the session-scoped editing suggestions.
//!
//! Records serialize to camelCase JSON with epoch-millisecond timestamps so
//! they can be stored as-is under `users/{userId}/projects/{projectId}`.

mod chapter;
mod editing;
mod marketing;
mod project;
mod research;

use chrono::{DateTime, Utc};

pub use chapter::{word_count, Chapter, ChapterId, ChapterStatus};
pub use editing::{EditingSuggestion, SuggestionKind};
pub use marketing::{Marketing, MarketingTask, Platform, TaskStatus};
pub use project::{Audience, Genre, NewProject, Phase, ProjectRecord};
pub use research::{BookData, Research, ResearchSuggestion};

/// Error returned when parsing one of the model's enumerations from text.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid {kind} '{value}'. Valid values: {expected}")]
pub struct ParseError {
    kind: &'static str,
    value: String,
    expected: String,
}

impl ParseError {
    pub(crate) fn new(kind: &'static str, value: &str, expected: &[&str]) -> Self {
        Self { kind, value: value.to_string(), expected: expected.join(", ") }
    }
}

/// Current time truncated to whole milliseconds.
///
/// Records persist timestamps as epoch milliseconds, so in-memory values are
/// kept at the same precision to compare equal after a store round trip.
pub fn now_millis() -> DateTime<Utc> {
    let now = Utc::now();
    DateTime::from_timestamp_millis(now.timestamp_millis()).unwrap_or(now)
}

/// Next `updatedAt` value: now, but never earlier than `previous`.
pub fn next_stamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    now_millis().max(previous)
}
