//! Research phase: competitor search and market analysis.

use std::fmt::Write as _;

use serde::Deserialize;
use serde_json::json;

use super::progress::{ProgressCalculator, ProgressRule};
use super::{SessionContext, WorkflowError};
use crate::model::{next_stamp, now_millis, BookData, ProjectRecord, ResearchSuggestion};
use crate::store::patch;

/// Turns a keyword into market data and a title/description/outline proposal.
pub struct ResearchPipeline {
    ctx: SessionContext,
    books: Vec<BookData>,
    pending: Option<ResearchSuggestion>,
}

impl ResearchPipeline {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx, books: Vec::new(), pending: None }
    }

    /// Results of the last successful search in this session.
    pub fn books(&self) -> &[BookData] {
        &self.books
    }

    /// Suggestion awaiting approval or rejection.
    pub fn pending(&self) -> Option<&ResearchSuggestion> {
        self.pending.as_ref()
    }

    /// Search for competitor books.
    ///
    /// On success the keyword is appended to `research.keywords` (duplicates
    /// kept) and the results replace `research.bookData`.
    pub async fn search(
        &mut self,
        record: &mut ProjectRecord,
        keyword: &str,
    ) -> Result<&[BookData], WorkflowError> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            return Err(WorkflowError::EmptyKeyword);
        }

        tracing::debug!(project = %record.id, keyword, "Searching books");
        let books = self.ctx.search_books(keyword).await?;

        let mut keywords = record.research.keywords.clone();
        keywords.push(keyword.to_string());
        let searched_at = now_millis();
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    ("research/keywords", json!(keywords)),
                    ("research/lastSearched", json!(searched_at.timestamp_millis())),
                    ("research/bookData", json!(books)),
                    ("updatedAt", json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        record.research.keywords = keywords;
        record.research.last_searched = Some(searched_at);
        record.research.book_data.clone_from(&books);
        record.updated_at = updated_at;

        tracing::info!(project = %record.id, keyword, results = books.len(), "Search stored");
        self.books = books;
        Ok(&self.books)
    }

    /// Ask the generation service for a suggestion based on `books`.
    ///
    /// The suggestion is held as pending; nothing is written to the record.
    pub async fn analyze_market(
        &mut self,
        record: &ProjectRecord,
        books: &[BookData],
    ) -> Result<ResearchSuggestion, WorkflowError> {
        if books.is_empty() {
            return Err(WorkflowError::NoBooksToAnalyze);
        }

        tracing::debug!(project = %record.id, books = books.len(), "Analyzing market");
        let prompt = market_prompt(record, books);
        let response = self.ctx.generate("analyze market data", &prompt).await?;
        let suggestion = parse_suggestion(&response)?;

        self.pending = Some(suggestion.clone());
        Ok(suggestion)
    }

    /// Analyze the results of the last search.
    pub async fn analyze_last_search(
        &mut self,
        record: &ProjectRecord,
    ) -> Result<ResearchSuggestion, WorkflowError> {
        let books = std::mem::take(&mut self.books);
        let result = self.analyze_market(record, &books).await;
        self.books = books;
        result
    }

    /// Write the suggestion onto the record and set the research checkpoint.
    pub async fn approve_suggestion(
        &mut self,
        record: &mut ProjectRecord,
        suggestion: ResearchSuggestion,
    ) -> Result<(), WorkflowError> {
        if suggestion.title.trim().is_empty() {
            return Err(WorkflowError::EmptyTitle);
        }

        let progress = ProgressCalculator::compute_progress(record, ProgressRule::ResearchApproved);
        let updated_at = next_stamp(record.updated_at);

        self.ctx
            .persist(
                &record.id,
                patch([
                    ("title", json!(suggestion.title)),
                    ("description", json!(suggestion.description)),
                    ("outline", json!(suggestion.outline)),
                    ("progress", json!(progress)),
                    ("updatedAt", json!(updated_at.timestamp_millis())),
                ]),
            )
            .await?;

        record.title = suggestion.title;
        record.description = suggestion.description;
        record.outline = suggestion.outline;
        record.progress = progress;
        record.updated_at = updated_at;
        self.pending = None;

        tracing::info!(project = %record.id, progress, "Research suggestion approved");
        Ok(())
    }

    /// Approve the pending suggestion, if any.
    pub async fn approve_pending(&mut self, record: &mut ProjectRecord) -> Result<bool, WorkflowError> {
        match self.pending.clone() {
            Some(suggestion) => self.approve_suggestion(record, suggestion).await.map(|()| true),
            None => Ok(false),
        }
    }

    /// Discard the pending suggestion. The record is not touched.
    pub fn reject_suggestion(&mut self) -> Option<ResearchSuggestion> {
        self.pending.take()
    }
}

/// Build the market analysis prompt.
pub fn market_prompt(record: &ProjectRecord, books: &[BookData]) -> String {
    let mut prompt = format!("Analyze these books in the {} genre:\n", record.genre);

    for book in books {
        let _ = write!(
            prompt,
            "\nTitle: {}\nDescription: {}\nBSR: {}\nPrice: {}\nKeywords: {}\n",
            book.title,
            book.description,
            book.bsr,
            book.price,
            book.keywords.join(", ")
        );
    }

    let _ = write!(
        prompt,
        "\nBased on this analysis:\n\
         1. Suggest a unique book title\n\
         2. Write a compelling description\n\
         3. Create a high-level outline\n\
         Consider the target audience: {}\n\n\
         Respond with only a JSON object of the form \
         {{\"title\": \"...\", \"description\": \"...\", \"outline\": [\"...\", \"...\"]}}",
        record.target_audience
    );
    prompt
}

#[derive(Deserialize)]
struct JsonSuggestion {
    title: String,
    description: String,
    outline: JsonOutline,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum JsonOutline {
    Lines(Vec<String>),
    Text(String),
}

/// Parse a generation response into a suggestion.
///
/// Accepts a JSON object anywhere in the text. Otherwise the response must
/// hold at least three blank-line separated segments: title, description,
/// then outline lines (further segments continue the outline).
pub fn parse_suggestion(response: &str) -> Result<ResearchSuggestion, WorkflowError> {
    if let Some(suggestion) = parse_json(response) {
        return Ok(suggestion);
    }

    let segments = segments(response);
    if segments.len() < 3 {
        return Err(WorkflowError::MalformedSuggestion(format!(
            "expected title, description and outline segments, found {}",
            segments.len()
        )));
    }

    let title = strip_label(&segments[0], "Title");
    let description = strip_label(&segments[1], "Description");
    let mut lines = segments[2..].iter().flat_map(|segment| segment.lines()).map(str::trim);
    let heading = lines.find(|line| !line.is_empty()).map(|line| strip_label(line, "Outline"));
    let outline: Vec<String> = heading
        .into_iter()
        .chain(lines.map(str::to_string))
        .filter(|line| !line.is_empty())
        .filter(|line| !line.trim_end_matches(':').eq_ignore_ascii_case("outline"))
        .collect();

    let suggestion = ResearchSuggestion { title, description, outline };
    if suggestion.is_complete() {
        Ok(suggestion)
    } else {
        Err(WorkflowError::MalformedSuggestion("a segment is empty".to_string()))
    }
}

fn parse_json(response: &str) -> Option<ResearchSuggestion> {
    let start = response.find('{')?;
    let end = response.rfind('}')?;
    if end <= start {
        return None;
    }

    let parsed: JsonSuggestion = serde_json::from_str(&response[start..=end]).ok()?;
    let outline = match parsed.outline {
        JsonOutline::Lines(lines) => lines,
        JsonOutline::Text(text) => text.lines().map(str::to_string).collect(),
    };
    let suggestion = ResearchSuggestion {
        title: parsed.title.trim().to_string(),
        description: parsed.description.trim().to_string(),
        outline: outline
            .into_iter()
            .map(|line| line.trim().to_string())
            .filter(|line| !line.is_empty())
            .collect(),
    };
    suggestion.is_complete().then_some(suggestion)
}

/// Split on blank lines, dropping empty segments.
fn segments(response: &str) -> Vec<String> {
    let mut segments = Vec::new();
    let mut current: Vec<&str> = Vec::new();

    for line in response.lines() {
        if line.trim().is_empty() {
            if !current.is_empty() {
                segments.push(current.join("\n"));
                current.clear();
            }
        } else {
            current.push(line);
        }
    }
    if !current.is_empty() {
        segments.push(current.join("\n"));
    }
    segments
}

/// Remove a leading `Label:` (optionally bolded) and surrounding whitespace.
fn strip_label(segment: &str, label: &str) -> String {
    let text = segment.trim().trim_start_matches("**");
    let stripped = text
        .get(..label.len())
        .filter(|head| head.eq_ignore_ascii_case(label))
        .and_then(|_| text[label.len()..].trim_start_matches("**").strip_prefix(':'))
        .map_or(text, |rest| rest.trim_start_matches("**"));
    stripped.trim().to_string()
}
