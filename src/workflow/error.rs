//! Errors returned by workflow operations.

use std::time::Duration;

use crate::model::{ChapterId, Phase};
use crate::store::StoreError;

/// Broad class of a [`WorkflowError`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Rejected locally before any external call
    Validation,
    /// Search, generation or store failure
    External,
    /// Generation response did not have the expected shape
    Parsing,
}

/// Error type for every pipeline operation.
///
/// No variant is raised after a partial write: an operation either
/// persisted and merged its result or left the record as it was.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("Enter a keyword to search")]
    EmptyKeyword,

    #[error("Search for books before analyzing the market")]
    NoBooksToAnalyze,

    #[error("Chapter not found: {0}")]
    ChapterNotFound(ChapterId),

    #[error("Title cannot be empty")]
    EmptyTitle,

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),

    #[error("Unknown platform '{0}'")]
    UnknownPlatform(String),

    #[error("Editing suggestion {0} not found")]
    SuggestionNotFound(usize),

    #[error("Cannot move from {from} back to {to}")]
    TransitionRejected { from: Phase, to: Phase },

    #[error("Search failed: {0}")]
    Search(#[source] anyhow::Error),

    #[error("Failed to {task}: {source}")]
    Generation {
        task: &'static str,
        #[source]
        source: anyhow::Error,
    },

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("{service} timed out after {}s", .after.as_secs())]
    TimedOut { service: &'static str, after: Duration },

    #[error("Malformed suggestion: {0}")]
    MalformedSuggestion(String),
}

impl WorkflowError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::EmptyKeyword
            | Self::NoBooksToAnalyze
            | Self::ChapterNotFound(_)
            | Self::EmptyTitle
            | Self::MissingField(_)
            | Self::InvalidDate(_)
            | Self::UnknownPlatform(_)
            | Self::SuggestionNotFound(_)
            | Self::TransitionRejected { .. } => ErrorKind::Validation,
            Self::Search(_) | Self::Generation { .. } | Self::Store(_) | Self::TimedOut { .. } => {
                ErrorKind::External
            }
            Self::MalformedSuggestion(_) => ErrorKind::Parsing,
        }
    }

    /// External failures can be retried by the author as-is.
    pub fn is_recoverable(&self) -> bool {
        self.kind() == ErrorKind::External
    }

    /// Short message suitable for showing to the author.
    pub fn user_message(&self) -> String {
        match self {
            Self::Search(_) => "Failed to fetch book data. Please try again.".to_string(),
            Self::Generation { task, .. } => format!("Failed to {task}. Please try again."),
            Self::Store(StoreError::NotFound(_)) => "Project not found.".to_string(),
            Self::Store(_) => "Failed to save changes. Please try again.".to_string(),
            Self::TimedOut { service, .. } => {
                format!("The {service} took too long to respond. Please try again.")
            }
            Self::MalformedSuggestion(_) => {
                "The market analysis could not be understood. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }
}
