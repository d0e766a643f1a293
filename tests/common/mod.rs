//! Shared test doubles for the integration tests.

#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};

use authorflow::ai::GenerationService;
use authorflow::model::{Audience, BookData, Genre, NewProject, ProjectRecord};
use authorflow::search::SearchProvider;
use authorflow::store::{MemoryStore, ProjectStore, StoreError, StorePath, Subscription};
use authorflow::workflow::{ProjectCatalog, SessionContext};

pub const USER: &str = "ada";

/// Search provider returning a fixed result set, or failing.
pub struct ScriptedSearch {
    books: Option<Vec<BookData>>,
    pub queries: Mutex<Vec<String>>,
}

impl ScriptedSearch {
    pub fn returning(books: Vec<BookData>) -> Self {
        Self { books: Some(books), queries: Mutex::new(Vec::new()) }
    }

    pub fn failing() -> Self {
        Self { books: None, queries: Mutex::new(Vec::new()) }
    }
}

#[async_trait]
impl SearchProvider for ScriptedSearch {
    async fn search(&self, keyword: &str) -> anyhow::Result<Vec<BookData>> {
        self.queries.lock().push(keyword.to_string());
        self.books.clone().ok_or_else(|| anyhow::anyhow!("scraper unavailable"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Generation service replying from a queue. An empty queue fails.
pub struct ScriptedGenerator {
    replies: Mutex<VecDeque<String>>,
    pub prompts: Mutex<Vec<String>>,
}

impl ScriptedGenerator {
    pub fn new<I, S>(replies: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            replies: Mutex::new(replies.into_iter().map(Into::into).collect()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    pub fn failing() -> Self {
        Self::new(Vec::<String>::new())
    }
}

#[async_trait]
impl GenerationService for ScriptedGenerator {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        self.prompts.lock().push(prompt.to_string());
        self.replies.lock().pop_front().ok_or_else(|| anyhow::anyhow!("rate limited"))
    }

    fn name(&self) -> &str {
        "scripted"
    }
}

/// Memory store whose writes can be made to fail.
#[derive(Clone, Default)]
pub struct FlakyStore {
    pub inner: MemoryStore,
    fail_writes: Arc<AtomicBool>,
}

impl FlakyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl ProjectStore for FlakyStore {
    async fn create(&self, user_id: &str, record: &ProjectRecord) -> Result<String, StoreError> {
        self.inner.create(user_id, record).await
    }

    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.inner.read(path).await
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Rejected("permission denied".into()));
        }
        self.inner.update(path, patch).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        self.inner.subscribe(path).await
    }
}

pub fn book(title: &str, bsr: &str) -> BookData {
    BookData {
        title: title.to_string(),
        author: "A. Writer".to_string(),
        description: format!("{title} is a sweeping tale."),
        price: "$4.99".to_string(),
        bsr: bsr.to_string(),
        publish_date: "2024-05-01".to_string(),
        keywords: vec!["dragons".to_string(), "epic".to_string()],
        ..BookData::default()
    }
}

pub fn dragon_books() -> Vec<BookData> {
    vec![book("Wings of Ash", "1,204"), book("The Last Rider", "3,881"), book("Ember Crown", "9,310")]
}

pub fn session(
    store: Arc<dyn ProjectStore>,
    search: Arc<dyn SearchProvider>,
    generator: Arc<dyn GenerationService>,
) -> SessionContext {
    SessionContext::new(USER, store, search, generator)
}

/// Create a Fantasy / Young Adult project through the catalog.
pub async fn create_project(ctx: &SessionContext) -> ProjectRecord {
    ProjectCatalog::new(ctx.clone())
        .create_project(NewProject::new(
            "Untitled dragon book",
            "A story about dragons",
            Genre::Fantasy,
            Audience::YoungAdult,
        ))
        .await
        .unwrap()
}

/// Read the stored project body.
pub async fn stored(store: &dyn ProjectStore, record: &ProjectRecord) -> Value {
    let path = StorePath::project(USER, &record.id).unwrap();
    store.read(&path).await.unwrap().unwrap()
}
