//! Marketing phase: promotional copy and the publishing schedule.

use chrono::{NaiveDate, Utc};
use serde_json::json;

use super::{SessionContext, WorkflowError};
use crate::core::CopySource;
use crate::model::{next_stamp, MarketingTask, Platform, ProjectRecord, TaskStatus};
use crate::store::patch;

const DATE_FORMAT: &str = "%Y-%m-%d";

/// Manages `marketing.schedule`.
///
/// Every change rewrites the whole schedule array.
pub struct MarketingPipeline {
    ctx: SessionContext,
}

impl MarketingPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Draft promotional copy for `platform`. Nothing is persisted.
    pub async fn generate_promotional_copy(
        &self,
        record: &ProjectRecord,
        platform: Platform,
    ) -> Result<String, WorkflowError> {
        match self.ctx.settings.promo_copy {
            CopySource::Template => Ok(template_copy(record)),
            CopySource::Ai => {
                tracing::debug!(project = %record.id, %platform, "Generating promotional copy");
                let copy = self.ctx.generate("generate content", &copy_prompt(record, platform)).await?;
                Ok(copy.trim().to_string())
            }
        }
    }

    /// Append a pending task. `platform`, `content` and `date` are all
    /// required; `date` is `YYYY-MM-DD`.
    pub async fn schedule_task(
        &self,
        record: &mut ProjectRecord,
        platform: &str,
        content: &str,
        date: &str,
    ) -> Result<MarketingTask, WorkflowError> {
        let (platform, content, date) = (platform.trim(), content.trim(), date.trim());
        if platform.is_empty() {
            return Err(WorkflowError::MissingField("platform"));
        }
        if content.is_empty() {
            return Err(WorkflowError::MissingField("content"));
        }
        if date.is_empty() {
            return Err(WorkflowError::MissingField("scheduledDate"));
        }
        let platform: Platform =
            platform.parse().map_err(|_| WorkflowError::UnknownPlatform(platform.to_string()))?;
        let scheduled_date = NaiveDate::parse_from_str(date, DATE_FORMAT)
            .map_err(|_| WorkflowError::InvalidDate(date.to_string()))?;

        let task = MarketingTask {
            id: next_task_id(record),
            platform,
            content: content.to_string(),
            scheduled_date,
            status: TaskStatus::Pending,
        };
        let mut schedule = record.marketing.schedule.clone();
        schedule.push(task.clone());

        self.write_schedule(record, schedule).await?;
        tracing::info!(project = %record.id, task = %task.id, %platform, "Marketing task scheduled");
        Ok(task)
    }

    /// Mark a task published. Unknown ids are a no-op returning `false`.
    pub async fn mark_published(
        &self,
        record: &mut ProjectRecord,
        task_id: &str,
    ) -> Result<bool, WorkflowError> {
        if record.marketing.task(task_id).is_none() {
            return Ok(false);
        }
        let schedule: Vec<MarketingTask> = record
            .marketing
            .schedule
            .iter()
            .cloned()
            .map(|mut task| {
                if task.id == task_id {
                    task.status = TaskStatus::Published;
                }
                task
            })
            .collect();

        self.write_schedule(record, schedule).await?;
        tracing::info!(project = %record.id, task = task_id, "Marketing task published");
        Ok(true)
    }

    /// Remove a task. Unknown ids are a no-op returning `false`.
    pub async fn delete_task(&self, record: &mut ProjectRecord, task_id: &str) -> Result<bool, WorkflowError> {
        if record.marketing.task(task_id).is_none() {
            return Ok(false);
        }
        let schedule: Vec<MarketingTask> =
            record.marketing.schedule.iter().filter(|task| task.id != task_id).cloned().collect();

        self.write_schedule(record, schedule).await?;
        tracing::info!(project = %record.id, task = task_id, "Marketing task deleted");
        Ok(true)
    }

    /// `(published, total)` over the schedule.
    pub fn completion(record: &ProjectRecord) -> (usize, usize) {
        (record.marketing.published_count(), record.marketing.schedule.len())
    }

    async fn write_schedule(
        &self,
        record: &mut ProjectRecord,
        schedule: Vec<MarketingTask>,
    ) -> Result<(), WorkflowError> {
        let updated_at = next_stamp(record.updated_at);
        self.ctx
            .persist(
                &record.id,
                patch([
                    ("marketing/schedule", json!(schedule)),
                    ("updatedAt", json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        record.marketing.schedule = schedule;
        record.updated_at = updated_at;
        Ok(())
    }
}

/// Built-in promotional copy for a project.
pub fn template_copy(record: &ProjectRecord) -> String {
    format!(
        "Check out \"{}\" - A compelling {} book that will take you on an unforgettable journey. \
         #books #reading #{}",
        record.title,
        record.genre,
        genre_hashtag(&record.genre)
    )
}

fn genre_hashtag(genre: &str) -> String {
    genre.chars().filter(|c| c.is_alphanumeric()).flat_map(char::to_lowercase).collect()
}

fn copy_prompt(record: &ProjectRecord, platform: Platform) -> String {
    format!(
        "Write a short promotional post for {} announcing the book \"{}\".\n\
         Genre: {}\nTarget audience: {}\nDescription: {}\n\
         Reply with the post text only, including a few relevant hashtags.",
        platform.label(),
        record.title,
        record.genre,
        record.target_audience,
        record.description
    )
}

/// Time-based id, bumped past any id already in the schedule.
fn next_task_id(record: &ProjectRecord) -> String {
    let mut candidate = Utc::now().timestamp_millis();
    while record.marketing.task(&candidate.to_string()).is_some() {
        candidate += 1;
    }
    candidate.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerationService;
    use crate::core::WorkflowConfig;
    use crate::model::{Audience, Genre, NewProject};
    use crate::search::NoSearch;
    use crate::store::{MemoryStore, ProjectStore, StorePath};
    use std::sync::Arc;

    struct Canned;

    #[async_trait::async_trait]
    impl GenerationService for Canned {
        async fn generate(&self, _prompt: &str) -> anyhow::Result<String> {
            Ok("  Dragons await! #fantasy \n".into())
        }

        fn name(&self) -> &str {
            "canned"
        }
    }

    async fn setup(copy: CopySource) -> (MarketingPipeline, MemoryStore, ProjectRecord) {
        let store = MemoryStore::new();
        let record = ProjectRecord::new(NewProject::new(
            "Ember",
            "A tale",
            Genre::ScienceFiction,
            Audience::YoungAdult,
        ));
        let id = store.create("ada", &record).await.unwrap();
        let ctx = SessionContext::new("ada", Arc::new(store.clone()), Arc::new(NoSearch), Arc::new(Canned))
            .with_settings(WorkflowConfig { promo_copy: copy, ..WorkflowConfig::default() });
        (MarketingPipeline::new(ctx), store, record.with_id(id))
    }

    async fn stored_schedule(store: &MemoryStore, record: &ProjectRecord) -> serde_json::Value {
        let path = StorePath::project("ada", &record.id).unwrap();
        store.read(&path).await.unwrap().unwrap()["marketing"]["schedule"].clone()
    }

    #[tokio::test]
    async fn test_template_copy() {
        let (marketing, _store, record) = setup(CopySource::Template).await;
        let copy = marketing.generate_promotional_copy(&record, Platform::Twitter).await.unwrap();
        assert_eq!(
            copy,
            "Check out \"Ember\" - A compelling Science Fiction book that will take you on an \
             unforgettable journey. #books #reading #sciencefiction"
        );
    }

    #[tokio::test]
    async fn test_generated_copy() {
        let (marketing, _store, record) = setup(CopySource::Ai).await;
        let copy = marketing.generate_promotional_copy(&record, Platform::Website).await.unwrap();
        assert_eq!(copy, "Dragons await! #fantasy");
    }

    #[tokio::test]
    async fn test_schedule_then_delete_restores_length() {
        let (marketing, store, mut record) = setup(CopySource::Template).await;

        let task = marketing.schedule_task(&mut record, "twitter", "Launch!", "2026-11-01").await.unwrap();
        assert_eq!(task.status, TaskStatus::Pending);
        assert_eq!(record.marketing.schedule.len(), 1);
        assert_eq!(stored_schedule(&store, &record).await[0]["scheduledDate"], "2026-11-01");

        assert!(marketing.delete_task(&mut record, &task.id).await.unwrap());
        assert!(record.marketing.schedule.is_empty());
        assert_eq!(stored_schedule(&store, &record).await, serde_json::json!([]));
    }

    #[tokio::test]
    async fn test_unknown_task_ids_are_noops() {
        let (marketing, _store, mut record) = setup(CopySource::Template).await;
        marketing.schedule_task(&mut record, "website", "Launch", "2026-11-01").await.unwrap();
        let before = record.clone();

        assert!(!marketing.delete_task(&mut record, "missing").await.unwrap());
        assert!(!marketing.mark_published(&mut record, "missing").await.unwrap());
        assert_eq!(record, before);
    }

    #[tokio::test]
    async fn test_task_ids_are_unique() {
        let (marketing, _store, mut record) = setup(CopySource::Template).await;
        let a = marketing.schedule_task(&mut record, "twitter", "One", "2026-11-01").await.unwrap();
        let b = marketing.schedule_task(&mut record, "twitter", "Two", "2026-11-02").await.unwrap();
        assert_ne!(a.id, b.id);
    }

    #[tokio::test]
    async fn test_mark_published_and_completion() {
        let (marketing, store, mut record) = setup(CopySource::Template).await;
        let a = marketing.schedule_task(&mut record, "twitter", "One", "2026-11-01").await.unwrap();
        marketing.schedule_task(&mut record, "facebook", "Two", "2026-11-02").await.unwrap();

        assert!(marketing.mark_published(&mut record, &a.id).await.unwrap());
        assert_eq!(MarketingPipeline::completion(&record), (1, 2));
        assert_eq!(stored_schedule(&store, &record).await[0]["status"], "published");
    }

    #[tokio::test]
    async fn test_schedule_validation() {
        let (marketing, _store, mut record) = setup(CopySource::Template).await;

        let err = marketing.schedule_task(&mut record, "", "x", "2026-11-01").await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("platform")));
        let err = marketing.schedule_task(&mut record, "twitter", " ", "2026-11-01").await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("content")));
        let err = marketing.schedule_task(&mut record, "myspace", "x", "2026-11-01").await.unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownPlatform(_)));
        let err = marketing.schedule_task(&mut record, "twitter", "x", "11/01/2026").await.unwrap_err();
        assert!(matches!(err, WorkflowError::InvalidDate(_)));
        assert!(record.marketing.schedule.is_empty());
    }
}
