//! Editing phase: per-chapter suggestions and resolution progress.

use async_trait::async_trait;
use serde::Deserialize;
use serde_json::json;

use super::progress::{ProgressCalculator, ProgressRule};
use super::{SessionContext, WorkflowError};
use crate::core::AnalyzerKind;
use crate::model::{next_stamp, Chapter, ChapterId, EditingSuggestion, ProjectRecord, SuggestionKind};
use crate::store::patch;

const ANALYZE_TASK: &str = "analyze chapter";

/// Produces editing suggestions for one chapter.
#[async_trait]
pub trait SuggestionAnalyzer: Send + Sync {
    async fn analyze(
        &self,
        ctx: &SessionContext,
        chapter_id: ChapterId,
        chapter: &Chapter,
    ) -> Result<Vec<EditingSuggestion>, WorkflowError>;

    fn name(&self) -> &str;
}

/// Fixed sample suggestions, plus a content note for empty chapters.
pub struct RuleBasedAnalyzer;

#[async_trait]
impl SuggestionAnalyzer for RuleBasedAnalyzer {
    async fn analyze(
        &self,
        _ctx: &SessionContext,
        chapter_id: ChapterId,
        chapter: &Chapter,
    ) -> Result<Vec<EditingSuggestion>, WorkflowError> {
        let mut batch = vec![
            EditingSuggestion::new(
                chapter_id,
                0,
                SuggestionKind::Grammar,
                "Consider revising this sentence for clarity.",
            ),
            EditingSuggestion::new(
                chapter_id,
                100,
                SuggestionKind::Style,
                "This paragraph could be more engaging.",
            ),
        ];
        if chapter.content.trim().is_empty() {
            batch.push(EditingSuggestion::new(
                chapter_id,
                0,
                SuggestionKind::Content,
                "This chapter has no content yet.",
            ));
        }
        Ok(batch)
    }

    fn name(&self) -> &str {
        "rules"
    }
}

/// Asks the generation service for a JSON array of suggestions.
pub struct GenerativeAnalyzer;

#[derive(Deserialize)]
struct RawSuggestion {
    #[serde(default)]
    position: usize,
    #[serde(rename = "type")]
    kind: SuggestionKind,
    suggestion: String,
}

impl GenerativeAnalyzer {
    pub fn prompt(chapter: &Chapter) -> String {
        format!(
            "Review the following book chapter titled \"{}\" and suggest edits.\n\
             Respond with a JSON array only. Each element must have:\n\
             - \"position\": character offset the suggestion applies to\n\
             - \"type\": one of \"grammar\", \"style\", \"content\"\n\
             - \"suggestion\": the suggested change\n\n\
             Chapter text:\n{}",
            chapter.title, chapter.content
        )
    }

    /// Parse the first JSON array found in `response`.
    pub fn parse(chapter_id: ChapterId, response: &str) -> anyhow::Result<Vec<EditingSuggestion>> {
        let start = response.find('[');
        let end = response.rfind(']');
        let body = match (start, end) {
            (Some(start), Some(end)) if start < end => &response[start..=end],
            _ => anyhow::bail!("response contains no JSON array"),
        };
        let raw: Vec<RawSuggestion> = serde_json::from_str(body)?;
        Ok(raw
            .into_iter()
            .filter(|r| !r.suggestion.trim().is_empty())
            .map(|r| EditingSuggestion::new(chapter_id, r.position, r.kind, r.suggestion.trim()))
            .collect())
    }
}

#[async_trait]
impl SuggestionAnalyzer for GenerativeAnalyzer {
    async fn analyze(
        &self,
        ctx: &SessionContext,
        chapter_id: ChapterId,
        chapter: &Chapter,
    ) -> Result<Vec<EditingSuggestion>, WorkflowError> {
        let response = ctx.generate(ANALYZE_TASK, &Self::prompt(chapter)).await?;
        Self::parse(chapter_id, &response)
            .map_err(|source| WorkflowError::Generation { task: ANALYZE_TASK, source })
    }

    fn name(&self) -> &str {
        "ai"
    }
}

/// Session-scoped working set of editing suggestions.
///
/// Suggestions live only as long as the pipeline. Resolving one recomputes
/// project progress over the whole set, across all chapters.
pub struct EditingPipeline {
    ctx: SessionContext,
    analyzer: Box<dyn SuggestionAnalyzer>,
    suggestions: Vec<EditingSuggestion>,
}

impl EditingPipeline {
    /// Pipeline using the analyzer selected in the session settings.
    pub fn new(ctx: SessionContext) -> Self {
        let analyzer: Box<dyn SuggestionAnalyzer> = match ctx.settings.editing_analyzer {
            AnalyzerKind::Rules => Box::new(RuleBasedAnalyzer),
            AnalyzerKind::Ai => Box::new(GenerativeAnalyzer),
        };
        Self::with_analyzer(ctx, analyzer)
    }

    pub fn with_analyzer(ctx: SessionContext, analyzer: Box<dyn SuggestionAnalyzer>) -> Self {
        Self { ctx, analyzer, suggestions: Vec::new() }
    }

    pub fn analyzer(&self) -> &str {
        self.analyzer.name()
    }

    pub fn suggestions(&self) -> &[EditingSuggestion] {
        &self.suggestions
    }

    /// Analyze a chapter and append the resulting batch. Nothing is appended
    /// unless the whole batch was produced.
    pub async fn request_suggestions(
        &mut self,
        record: &ProjectRecord,
        chapter_id: ChapterId,
    ) -> Result<&[EditingSuggestion], WorkflowError> {
        let chapter = record.chapter(chapter_id).ok_or(WorkflowError::ChapterNotFound(chapter_id))?;

        tracing::debug!(
            project = %record.id,
            chapter = %chapter_id,
            analyzer = self.analyzer.name(),
            "Analyzing chapter"
        );
        let batch = self.analyzer.analyze(&self.ctx, chapter_id, chapter).await?;

        let start = self.suggestions.len();
        self.suggestions.extend(batch);
        tracing::info!(
            project = %record.id,
            chapter = %chapter_id,
            added = self.suggestions.len() - start,
            "Suggestions added"
        );
        Ok(&self.suggestions[start..])
    }

    /// Mark suggestion `index` resolved and persist the recomputed progress.
    ///
    /// Resolving an already-resolved suggestion still recomputes and writes
    /// progress. Returns the new progress value. With no suggestions at all
    /// nothing is written and the current progress is returned.
    pub async fn resolve(&mut self, record: &mut ProjectRecord, index: usize) -> Result<u8, WorkflowError> {
        if self.suggestions.is_empty() {
            tracing::debug!(project = %record.id, index, "No suggestions to resolve");
            return Ok(record.progress);
        }
        let target = self.suggestions.get(index).ok_or(WorkflowError::SuggestionNotFound(index))?;

        let mut resolved = self.suggestions.iter().filter(|s| s.resolved).count();
        if !target.resolved {
            resolved += 1;
        }
        let rule = ProgressRule::EditingResolution { resolved, total: self.suggestions.len() };
        let progress = ProgressCalculator::compute_progress(record, rule);
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    ("progress", json!(progress)),
                    ("updatedAt", json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        if let Some(suggestion) = self.suggestions.get_mut(index) {
            suggestion.resolved = true;
        }
        record.progress = progress;
        record.updated_at = updated_at;

        tracing::info!(project = %record.id, index, progress, "Suggestion resolved");
        Ok(progress)
    }

    /// `(resolved, total)` for one chapter.
    pub fn chapter_completion(&self, chapter_id: ChapterId) -> (usize, usize) {
        self.suggestions
            .iter()
            .filter(|s| s.chapter_id == chapter_id)
            .fold((0, 0), |(resolved, total), s| (resolved + usize::from(s.resolved), total + 1))
    }

    /// `(resolved, total)` across all chapters.
    pub fn completion(&self) -> (usize, usize) {
        let resolved = self.suggestions.iter().filter(|s| s.resolved).count();
        (resolved, self.suggestions.len())
    }
}
