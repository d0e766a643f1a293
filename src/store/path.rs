//! Slash-separated paths into the store tree.

use std::fmt;
use std::str::FromStr;

use super::StoreError;

/// Characters a path segment may not contain.
const FORBIDDEN: &[char] = &['.', '#', '$', '[', ']'];

/// Validated path such as `users/ada/projects/p1/chapters/chapter-2`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StorePath {
    segments: Vec<String>,
}

impl StorePath {
    /// The tree root.
    pub fn root() -> Self {
        Self::default()
    }

    /// Parse a path. Leading and trailing slashes are ignored; empty inner
    /// segments are rejected.
    pub fn parse(raw: &str) -> Result<Self, StoreError> {
        let trimmed = raw.trim_matches('/');
        if trimmed.is_empty() {
            return Ok(Self::root());
        }

        let mut path = Self::root();
        for segment in trimmed.split('/') {
            path.push(segment).map_err(|reason| invalid(raw, reason))?;
        }
        Ok(path)
    }

    /// `users/{user_id}/projects`
    pub fn projects(user_id: &str) -> Result<Self, StoreError> {
        Self::root().child("users")?.child(user_id)?.child("projects")
    }

    /// `users/{user_id}/projects/{project_id}`
    pub fn project(user_id: &str, project_id: &str) -> Result<Self, StoreError> {
        Self::projects(user_id)?.child(project_id)
    }

    /// Append one segment.
    pub fn child(mut self, segment: &str) -> Result<Self, StoreError> {
        let rendered = format!("{self}/{segment}");
        self.push(segment).map_err(|reason| invalid(&rendered, reason))?;
        Ok(self)
    }

    /// Append every segment of `relative`.
    pub fn join(&self, relative: &Self) -> Self {
        let mut segments = self.segments.clone();
        segments.extend(relative.segments.iter().cloned());
        Self { segments }
    }

    fn push(&mut self, segment: &str) -> Result<(), &'static str> {
        if segment.is_empty() {
            return Err("empty segment");
        }
        if segment.contains(FORBIDDEN) || segment.chars().any(char::is_control) {
            return Err("segment contains a forbidden character");
        }
        self.segments.push(segment.to_string());
        Ok(())
    }

    pub fn segments(&self) -> &[String] {
        &self.segments
    }

    pub fn is_root(&self) -> bool {
        self.segments.is_empty()
    }

    /// Path without its last segment; `None` for the root.
    pub fn parent(&self) -> Option<Self> {
        let (_, rest) = self.segments.split_last()?;
        Some(Self { segments: rest.to_vec() })
    }

    /// Last segment, if any.
    pub fn key(&self) -> Option<&str> {
        self.segments.last().map(String::as_str)
    }

    /// True when `self` equals `other` or is one of its ancestors.
    pub fn contains(&self, other: &Self) -> bool {
        other.segments.starts_with(&self.segments)
    }

    /// True when a write at one path can change the value at the other.
    pub fn overlaps(&self, other: &Self) -> bool {
        self.contains(other) || other.contains(self)
    }
}

fn invalid(path: &str, reason: &'static str) -> StoreError {
    StoreError::InvalidPath { path: path.to_string(), reason }
}

impl fmt::Display for StorePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.segments.join("/"))
    }
}

impl FromStr for StorePath {
    type Err = StoreError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_and_display() {
        let path = StorePath::parse("/users/ada/projects/").unwrap();
        assert_eq!(path.segments().len(), 3);
        assert_eq!(path.to_string(), "users/ada/projects");
        assert_eq!(path.key(), Some("projects"));
        assert_eq!(path.parent().unwrap().to_string(), "users/ada");
        assert!(StorePath::root().parent().is_none());
        assert!(StorePath::parse("").unwrap().is_root());
    }

    #[test]
    fn test_rejects_bad_segments() {
        assert!(StorePath::parse("users//projects").is_err());
        assert!(StorePath::parse("users/a.b").is_err());
        assert!(StorePath::parse("users/a[0]").is_err());
        assert!(StorePath::projects("").is_err());
    }

    #[test]
    fn test_project_helpers() {
        let path = StorePath::project("ada", "p1").unwrap();
        assert_eq!(path.to_string(), "users/ada/projects/p1");

        let chapter = path.clone().child("chapters").unwrap().child("chapter-2").unwrap();
        assert_eq!(chapter.to_string(), "users/ada/projects/p1/chapters/chapter-2");
    }

    #[test]
    fn test_containment_and_overlap() {
        let project = StorePath::parse("users/ada/projects/p1").unwrap();
        let chapter = StorePath::parse("users/ada/projects/p1/chapters/chapter-1").unwrap();
        let other = StorePath::parse("users/ada/projects/p2").unwrap();

        assert!(project.contains(&chapter));
        assert!(!chapter.contains(&project));
        assert!(chapter.overlaps(&project));
        assert!(!other.overlaps(&project));
        assert!(StorePath::root().contains(&other));
    }

    #[test]
    fn test_join() {
        let base = StorePath::parse("users/ada").unwrap();
        let rel = StorePath::parse("projects/p1").unwrap();
        assert_eq!(base.join(&rel).to_string(), "users/ada/projects/p1");
    }
}
