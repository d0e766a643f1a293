//! Explicit per-session state handed to every pipeline.

use std::future::Future;
use std::sync::Arc;

use serde_json::{Map, Value};

use super::WorkflowError;
use crate::ai::{ChapterRequest, GenerationManager, GenerationService};
use crate::core::{retry_async, CallError, Config, RetryConfig, WorkflowConfig};
use crate::model::BookData;
use crate::search::SearchProvider;
use crate::store::{ProjectStore, StorePath};

const SEARCH_SERVICE: &str = "search service";
const GENERATION_SERVICE: &str = "generation service";

/// Owner identity plus the collaborators a pipeline talks to.
#[derive(Clone)]
pub struct SessionContext {
    pub user_id: String,
    pub store: Arc<dyn ProjectStore>,
    pub search: Arc<dyn SearchProvider>,
    pub generator: Arc<dyn GenerationService>,
    pub search_policy: RetryConfig,
    pub generation_policy: RetryConfig,
    pub settings: WorkflowConfig,
}

impl SessionContext {
    pub fn new(
        user_id: impl Into<String>,
        store: Arc<dyn ProjectStore>,
        search: Arc<dyn SearchProvider>,
        generator: Arc<dyn GenerationService>,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            store,
            search,
            generator,
            search_policy: RetryConfig::search(30, 0),
            generation_policy: RetryConfig::generation(120, 0),
            settings: WorkflowConfig::default(),
        }
    }

    /// Build a session from configuration, wiring the HTTP search backend and
    /// the generation provider chain.
    pub fn from_config(config: &Config, store: Arc<dyn ProjectStore>) -> Self {
        #[cfg(feature = "http")]
        let search: Arc<dyn SearchProvider> =
            Arc::new(crate::search::HttpSearchProvider::from_config(&config.search));
        #[cfg(not(feature = "http"))]
        let search: Arc<dyn SearchProvider> = Arc::new(crate::search::NoSearch);

        let generator = GenerationManager::from_config(&config.ai);
        if generator.is_available() {
            tracing::debug!(providers = ?generator.provider_names(), "Generation chain ready");
        } else {
            tracing::warn!("No generation provider configured; AI-backed operations will fail");
        }

        Self {
            user_id: config.general.user_id.clone(),
            store,
            search,
            generator: Arc::new(generator),
            search_policy: RetryConfig::search(config.search.timeout_secs, config.search.max_attempts),
            generation_policy: RetryConfig::generation(config.ai.timeout_secs, config.ai.max_attempts),
            settings: config.workflow.clone(),
        }
    }

    pub fn with_settings(mut self, settings: WorkflowConfig) -> Self {
        self.settings = settings;
        self
    }

    pub fn with_policies(mut self, search: RetryConfig, generation: RetryConfig) -> Self {
        self.search_policy = search;
        self.generation_policy = generation;
        self
    }

    pub fn projects_path(&self) -> Result<StorePath, WorkflowError> {
        Ok(StorePath::projects(&self.user_id)?)
    }

    pub fn project_path(&self, project_id: &str) -> Result<StorePath, WorkflowError> {
        Ok(StorePath::project(&self.user_id, project_id)?)
    }

    /// Merge `patch` into the project node.
    pub(crate) async fn persist(
        &self,
        project_id: &str,
        patch: Map<String, Value>,
    ) -> Result<(), WorkflowError> {
        let path = self.project_path(project_id)?;
        self.store.update(&path, patch).await?;
        Ok(())
    }

    pub(crate) async fn search_books(&self, keyword: &str) -> Result<Vec<BookData>, WorkflowError> {
        let search = Arc::clone(&self.search);
        policed(&self.search_policy, SEARCH_SERVICE, || {
            let search = Arc::clone(&search);
            let keyword = keyword.to_string();
            async move { search.search(&keyword).await }
        })
        .await
        .map_err(|e| e.into_workflow(WorkflowError::Search))
    }

    pub(crate) async fn generate(
        &self,
        task: &'static str,
        prompt: &str,
    ) -> Result<String, WorkflowError> {
        let generator = Arc::clone(&self.generator);
        policed(&self.generation_policy, GENERATION_SERVICE, || {
            let generator = Arc::clone(&generator);
            let prompt = prompt.to_string();
            async move { generator.generate(&prompt).await }
        })
        .await
        .map_err(|e| e.into_workflow(|source| WorkflowError::Generation { task, source }))
    }

    pub(crate) async fn generate_chapter(
        &self,
        request: &ChapterRequest,
    ) -> Result<String, WorkflowError> {
        let generator = Arc::clone(&self.generator);
        policed(&self.generation_policy, GENERATION_SERVICE, || {
            let generator = Arc::clone(&generator);
            let request = request.clone();
            async move { generator.generate_chapter(&request).await }
        })
        .await
        .map_err(|e| {
            e.into_workflow(|source| WorkflowError::Generation { task: "generate content", source })
        })
    }
}

impl std::fmt::Debug for SessionContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionContext")
            .field("user_id", &self.user_id)
            .field("search", &self.search.name())
            .field("generator", &self.generator.name())
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

/// A failed external call, tagged with the service it went to.
struct ServiceFailure {
    service: &'static str,
    error: CallError<anyhow::Error>,
}

impl ServiceFailure {
    fn into_workflow(self, failed: impl FnOnce(anyhow::Error) -> WorkflowError) -> WorkflowError {
        match self.error {
            CallError::TimedOut(after) => WorkflowError::TimedOut { service: self.service, after },
            CallError::Failed(source) => failed(source),
        }
    }
}

async fn policed<T, F, Fut>(
    policy: &RetryConfig,
    service: &'static str,
    operation: F,
) -> Result<T, ServiceFailure>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = anyhow::Result<T>>,
{
    let outcome = retry_async(policy, operation).await;
    if outcome.was_retried() {
        tracing::debug!(service, attempts = outcome.attempts, "External call retried");
    }
    outcome.into_result().map_err(|error| {
        tracing::warn!(service, error = %error, "External call failed");
        ServiceFailure { service, error }
    })
}
