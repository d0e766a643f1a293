//! The project record and the enumerations fixed at project creation.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::chapter::{Chapter, ChapterId};
use super::marketing::Marketing;
use super::research::Research;
use super::{now_millis, ParseError};

/// Production phase of a book project.
///
/// The active phase is stored as the record's `status` and doubles as the
/// default tab when the project is opened.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    #[default]
    Research,
    Writing,
    Editing,
    Marketing,
}

impl Phase {
    /// All phases in production order.
    pub const ALL: [Self; 4] = [Self::Research, Self::Writing, Self::Editing, Self::Marketing];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Research => "research",
            Self::Writing => "writing",
            Self::Editing => "editing",
            Self::Marketing => "marketing",
        }
    }

    /// Human-readable label.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Research => "Research",
            Self::Writing => "Writing",
            Self::Editing => "Editing",
            Self::Marketing => "Marketing",
        }
    }

    /// Zero-based position in production order.
    pub fn ordinal(self) -> usize {
        self as usize
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Phase {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "research" => Ok(Self::Research),
            "writing" => Ok(Self::Writing),
            "editing" => Ok(Self::Editing),
            "marketing" => Ok(Self::Marketing),
            _ => Err(ParseError::new(
                "phase",
                s,
                &["research", "writing", "editing", "marketing"],
            )),
        }
    }
}

/// Book genres offered at project creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Genre {
    Fiction,
    #[serde(rename = "Non-Fiction")]
    NonFiction,
    Mystery,
    #[serde(rename = "Science Fiction")]
    ScienceFiction,
    Fantasy,
    Romance,
    Thriller,
    Horror,
    Biography,
    #[serde(rename = "Self-Help")]
    SelfHelp,
    Business,
    Other,
}

impl Genre {
    pub const ALL: [Self; 12] = [
        Self::Fiction,
        Self::NonFiction,
        Self::Mystery,
        Self::ScienceFiction,
        Self::Fantasy,
        Self::Romance,
        Self::Thriller,
        Self::Horror,
        Self::Biography,
        Self::SelfHelp,
        Self::Business,
        Self::Other,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Fiction => "Fiction",
            Self::NonFiction => "Non-Fiction",
            Self::Mystery => "Mystery",
            Self::ScienceFiction => "Science Fiction",
            Self::Fantasy => "Fantasy",
            Self::Romance => "Romance",
            Self::Thriller => "Thriller",
            Self::Horror => "Horror",
            Self::Biography => "Biography",
            Self::SelfHelp => "Self-Help",
            Self::Business => "Business",
            Self::Other => "Other",
        }
    }
}

impl fmt::Display for Genre {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Genre {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL.into_iter().find(|g| normalize(g.as_str()) == wanted).ok_or_else(|| {
            ParseError::new("genre", s, &Self::ALL.map(|g| g.as_str()))
        })
    }
}

/// Target audiences offered at project creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Audience {
    Children,
    #[serde(rename = "Young Adult")]
    YoungAdult,
    Adult,
    Professional,
    Academic,
    General,
}

impl Audience {
    pub const ALL: [Self; 6] = [
        Self::Children,
        Self::YoungAdult,
        Self::Adult,
        Self::Professional,
        Self::Academic,
        Self::General,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Children => "Children",
            Self::YoungAdult => "Young Adult",
            Self::Adult => "Adult",
            Self::Professional => "Professional",
            Self::Academic => "Academic",
            Self::General => "General",
        }
    }
}

impl fmt::Display for Audience {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Audience {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = normalize(s);
        Self::ALL.into_iter().find(|a| normalize(a.as_str()) == wanted).ok_or_else(|| {
            ParseError::new("audience", s, &Self::ALL.map(|a| a.as_str()))
        })
    }
}

/// Case- and separator-insensitive key ("young-adult" == "Young Adult").
fn normalize(s: &str) -> String {
    s.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

/// Input for creating a new project.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewProject {
    pub title: String,
    pub description: String,
    pub genre: Genre,
    pub target_audience: Audience,
}

impl NewProject {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        genre: Genre,
        target_audience: Audience,
    ) -> Self {
        Self { title: title.into(), description: description.into(), genre, target_audience }
    }
}

/// Full persisted state of one book project.
///
/// `id` is the key the store assigned on creation; it is not part of the
/// serialized body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProjectRecord {
    #[serde(skip)]
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// Free text; validated against [`Genre`] only at creation
    #[serde(default)]
    pub genre: String,

    /// Free text; validated against [`Audience`] only at creation
    #[serde(default)]
    pub target_audience: String,

    /// Active phase
    #[serde(default)]
    pub status: Phase,

    /// Completion metric, 0-100
    #[serde(default)]
    pub progress: u8,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub created_at: DateTime<Utc>,

    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub updated_at: DateTime<Utc>,

    #[serde(default)]
    pub outline: Vec<String>,

    #[serde(default)]
    pub research: Research,

    #[serde(default)]
    pub chapters: BTreeMap<ChapterId, Chapter>,

    #[serde(default)]
    pub marketing: Marketing,
}

impl ProjectRecord {
    /// Build a fresh record: research phase, progress 0, empty artifacts.
    pub fn new(project: NewProject) -> Self {
        let now = now_millis();
        Self {
            id: String::new(),
            title: project.title.trim().to_string(),
            description: project.description.trim().to_string(),
            genre: project.genre.as_str().to_string(),
            target_audience: project.target_audience.as_str().to_string(),
            status: Phase::Research,
            progress: 0,
            created_at: now,
            updated_at: now,
            outline: Vec::new(),
            research: Research::default(),
            chapters: BTreeMap::new(),
            marketing: Marketing::default(),
        }
    }

    /// Attach the store-assigned id.
    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = id.into();
        self
    }

    pub fn chapter(&self, id: ChapterId) -> Option<&Chapter> {
        self.chapters.get(&id)
    }

    /// Chapters in display order.
    pub fn chapters_in_order(&self) -> impl Iterator<Item = (ChapterId, &Chapter)> {
        self.chapters.iter().map(|(id, chapter)| (*id, chapter))
    }

    /// Words written across all chapters.
    pub fn total_words(&self) -> usize {
        self.chapters.values().map(|c| c.word_count).sum()
    }

    /// Id the next added chapter receives.
    pub fn next_chapter_id(&self) -> ChapterId {
        ChapterId::next_after(self.chapters.keys())
    }
}
