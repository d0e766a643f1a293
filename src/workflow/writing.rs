//! Writing phase: chapters and drafted content.

use std::collections::BTreeSet;

use serde_json::json;

use super::{SessionContext, WorkflowError};
use crate::ai::{AIError, ChapterRequest};
use crate::model::{next_stamp, Chapter, ChapterId, ChapterStatus, ProjectRecord};
use crate::store::patch;

/// Manages the chapter collection of a project.
///
/// Every write targets a single `chapters/{id}` key so sessions editing
/// different chapters do not overwrite each other. Content typed through
/// [`edit_content`](Self::edit_content) stays local until committed.
pub struct WritingPipeline {
    ctx: SessionContext,
    dirty: BTreeSet<ChapterId>,
}

impl WritingPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx, dirty: BTreeSet::new() }
    }

    /// Append an empty draft chapter named `Chapter {n}`.
    pub async fn add_chapter(&mut self, record: &mut ProjectRecord) -> Result<ChapterId, WorkflowError> {
        let id = record.next_chapter_id();
        let chapter = Chapter::new(format!("Chapter {}", id.ordinal()));
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    (format!("chapters/{id}"), json!(chapter)),
                    ("updatedAt".to_string(), json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        record.chapters.insert(id, chapter);
        record.updated_at = updated_at;

        tracing::info!(project = %record.id, chapter = %id, "Chapter added");
        Ok(id)
    }

    /// Replace a chapter's content with generated text.
    pub async fn generate_content<'r>(
        &mut self,
        record: &'r mut ProjectRecord,
        id: ChapterId,
    ) -> Result<&'r Chapter, WorkflowError> {
        let chapter = record.chapter(id).ok_or(WorkflowError::ChapterNotFound(id))?;
        let request = ChapterRequest {
            chapter_title: chapter.title.clone(),
            outline: record.outline.clone(),
            genre: record.genre.clone(),
            target_audience: record.target_audience.clone(),
        };
        request.validate().map_err(|e| match e {
            AIError::MissingField(field) => WorkflowError::MissingField(field),
            other => WorkflowError::Generation { task: "generate content", source: other.into() },
        })?;

        tracing::debug!(project = %record.id, chapter = %id, "Generating chapter content");
        let content = self.ctx.generate_chapter(&request).await?;

        let mut updated = chapter.clone();
        updated.set_content(content);
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    (format!("chapters/{id}"), json!(updated)),
                    ("updatedAt".to_string(), json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        tracing::info!(
            project = %record.id,
            chapter = %id,
            words = updated.word_count,
            "Chapter content generated"
        );
        record.updated_at = updated_at;
        self.dirty.remove(&id);
        record.chapters.insert(id, updated);
        record.chapter(id).ok_or(WorkflowError::ChapterNotFound(id))
    }

    /// Local edit. The word count follows immediately; nothing is written
    /// until [`commit`](Self::commit).
    pub fn edit_content(
        &mut self,
        record: &mut ProjectRecord,
        id: ChapterId,
        content: impl Into<String>,
    ) -> Result<usize, WorkflowError> {
        let chapter = record.chapters.get_mut(&id).ok_or(WorkflowError::ChapterNotFound(id))?;
        chapter.set_content(content);
        self.dirty.insert(id);
        Ok(chapter.word_count)
    }

    pub fn is_dirty(&self, id: ChapterId) -> bool {
        self.dirty.contains(&id)
    }

    /// Chapters with uncommitted edits.
    pub fn dirty_chapters(&self) -> impl Iterator<Item = ChapterId> + '_ {
        self.dirty.iter().copied()
    }

    /// Persist local edits of one chapter. Returns `false` when there was
    /// nothing to write.
    pub async fn commit(&mut self, record: &mut ProjectRecord, id: ChapterId) -> Result<bool, WorkflowError> {
        if !self.dirty.contains(&id) {
            return Ok(false);
        }
        let chapter = record.chapter(id).ok_or(WorkflowError::ChapterNotFound(id))?;
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    (format!("chapters/{id}/content"), json!(chapter.content)),
                    (format!("chapters/{id}/wordCount"), json!(chapter.word_count)),
                    ("updatedAt".to_string(), json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        record.updated_at = updated_at;
        self.dirty.remove(&id);
        tracing::debug!(project = %record.id, chapter = %id, "Chapter edits committed");
        Ok(true)
    }

    /// Persist every chapter with local edits. Stops at the first failure,
    /// leaving the remaining chapters dirty.
    pub async fn commit_all(&mut self, record: &mut ProjectRecord) -> Result<usize, WorkflowError> {
        let pending: Vec<ChapterId> = self.dirty.iter().copied().collect();
        let mut committed = 0;
        for id in pending {
            if self.commit(record, id).await? {
                committed += 1;
            }
        }
        Ok(committed)
    }

    /// Rename a chapter. Blank titles are rejected.
    pub async fn rename_chapter(
        &mut self,
        record: &mut ProjectRecord,
        id: ChapterId,
        title: &str,
    ) -> Result<(), WorkflowError> {
        let title = title.trim();
        if title.is_empty() {
            return Err(WorkflowError::EmptyTitle);
        }
        if record.chapter(id).is_none() {
            return Err(WorkflowError::ChapterNotFound(id));
        }
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    (format!("chapters/{id}/title"), json!(title)),
                    ("updatedAt".to_string(), json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        if let Some(chapter) = record.chapters.get_mut(&id) {
            chapter.title = title.to_string();
        }
        record.updated_at = updated_at;
        tracing::info!(project = %record.id, chapter = %id, title, "Chapter renamed");
        Ok(())
    }

    /// Set a chapter's status. Any status may follow any other.
    pub async fn set_status(
        &mut self,
        record: &mut ProjectRecord,
        id: ChapterId,
        status: ChapterStatus,
    ) -> Result<(), WorkflowError> {
        if record.chapter(id).is_none() {
            return Err(WorkflowError::ChapterNotFound(id));
        }
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    (format!("chapters/{id}/status"), json!(status)),
                    ("updatedAt".to_string(), json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        if let Some(chapter) = record.chapters.get_mut(&id) {
            chapter.status = status;
        }
        record.updated_at = updated_at;
        tracing::info!(project = %record.id, chapter = %id, %status, "Chapter status set");
        Ok(())
    }
}
