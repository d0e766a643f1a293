//! Marketing sub-record: target platforms, copy and the publishing schedule.

use std::fmt;
use std::str::FromStr;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use super::ParseError;

/// Platforms a marketing task can target.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Website,
    Twitter,
    Instagram,
    Facebook,
}

impl Platform {
    pub const ALL: [Self; 4] = [Self::Website, Self::Twitter, Self::Instagram, Self::Facebook];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Website => "website",
            Self::Twitter => "twitter",
            Self::Instagram => "instagram",
            Self::Facebook => "facebook",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Website => "Website",
            Self::Twitter => "Twitter",
            Self::Instagram => "Instagram",
            Self::Facebook => "Facebook",
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let lower = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|p| p.as_str() == lower)
            .ok_or_else(|| ParseError::new("platform", s, &Self::ALL.map(|p| p.as_str())))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskStatus {
    #[default]
    Pending,
    Published,
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Pending => f.write_str("pending"),
            Self::Published => f.write_str("published"),
        }
    }
}

/// A scheduled promotional post.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarketingTask {
    pub id: String,
    pub platform: Platform,
    pub content: String,
    /// Calendar date, `YYYY-MM-DD` on the wire
    pub scheduled_date: NaiveDate,
    #[serde(default)]
    pub status: TaskStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Marketing {
    pub target_platforms: Vec<String>,
    pub promotional_content: Vec<String>,
    pub schedule: Vec<MarketingTask>,
}

impl Marketing {
    pub fn task(&self, id: &str) -> Option<&MarketingTask> {
        self.schedule.iter().find(|t| t.id == id)
    }

    pub fn published_count(&self) -> usize {
        self.schedule.iter().filter(|t| t.status == TaskStatus::Published).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_task_json_shape() {
        let task = MarketingTask {
            id: "1700000000000".into(),
            platform: Platform::Twitter,
            content: "Out now".into(),
            scheduled_date: NaiveDate::from_ymd_opt(2025, 3, 1).unwrap(),
            status: TaskStatus::Pending,
        };
        let json = serde_json::to_value(&task).unwrap();
        assert_eq!(json["scheduledDate"], "2025-03-01");
        assert_eq!(json["platform"], "twitter");
        assert_eq!(json["status"], "pending");
    }

    #[test]
    fn test_platform_parse() {
        assert_eq!("Instagram".parse::<Platform>().unwrap(), Platform::Instagram);
        assert!("myspace".parse::<Platform>().is_err());
    }

    #[test]
    fn test_published_count() {
        let date = NaiveDate::from_ymd_opt(2025, 1, 1).unwrap();
        let mk = |id: &str, status| MarketingTask {
            id: id.into(),
            platform: Platform::Website,
            content: "x".into(),
            scheduled_date: date,
            status,
        };
        let marketing = Marketing {
            schedule: vec![mk("1", TaskStatus::Published), mk("2", TaskStatus::Pending)],
            ..Marketing::default()
        };
        assert_eq!(marketing.published_count(), 1);
        assert!(marketing.task("2").is_some());
        assert!(marketing.task("3").is_none());
    }
}
