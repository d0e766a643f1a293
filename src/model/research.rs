//! Research artifacts: market snapshots and generated suggestions.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Competitor book returned by the search backend.
///
/// Every field is optional on the wire; the scraper fills what it can.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct BookData {
    pub title: String,
    pub author: String,
    pub description: String,
    pub price: String,
    /// Best-seller rank
    pub bsr: String,
    pub publish_date: String,
    pub keywords: Vec<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rating: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub review_count: Option<String>,
}

/// Research sub-record of a project.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Research {
    #[serde(default)]
    pub market_analysis: String,

    #[serde(default)]
    pub competitor_analysis: String,

    /// Every keyword ever searched, in order, duplicates kept
    #[serde(default)]
    pub keywords: Vec<String>,

    #[serde(
        default,
        with = "chrono::serde::ts_milliseconds_option",
        skip_serializing_if = "Option::is_none"
    )]
    pub last_searched: Option<DateTime<Utc>>,

    /// Snapshot from the most recent successful search
    #[serde(default)]
    pub book_data: Vec<BookData>,
}

/// Title, description and outline proposed by market analysis.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResearchSuggestion {
    pub title: String,
    pub description: String,
    #[serde(default)]
    pub outline: Vec<String>,
}

impl ResearchSuggestion {
    /// True when every part is present.
    pub fn is_complete(&self) -> bool {
        !self.title.trim().is_empty()
            && !self.description.trim().is_empty()
            && self.outline.iter().any(|line| !line.trim().is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_book_data_tolerates_partial_scraper_output() {
        let json = serde_json::json!({
            "title": "Dragonfall",
            "author": "A. Writer",
            "price": "$4.99",
            "rating": "4.5 out of 5 stars",
            "reviewCount": "1,203"
        });

        let book: BookData = serde_json::from_value(json).unwrap();
        assert_eq!(book.title, "Dragonfall");
        assert!(book.description.is_empty());
        assert!(book.keywords.is_empty());
        assert_eq!(book.review_count.as_deref(), Some("1,203"));
    }

    #[test]
    fn test_last_searched_round_trips_as_millis() {
        let research = Research {
            keywords: vec!["dragons".into()],
            last_searched: DateTime::from_timestamp_millis(1_700_000_000_123),
            ..Research::default()
        };
        let json = serde_json::to_value(&research).unwrap();
        assert_eq!(json["lastSearched"], 1_700_000_000_123_i64);

        let back: Research = serde_json::from_value(json).unwrap();
        assert_eq!(back, research);
    }

    #[test]
    fn test_suggestion_completeness() {
        let mut suggestion = ResearchSuggestion {
            title: "Ember".into(),
            description: "A tale".into(),
            outline: vec!["1. Start".into()],
        };
        assert!(suggestion.is_complete());

        suggestion.outline = vec!["  ".into()];
        assert!(!suggestion.is_complete());
    }
}
