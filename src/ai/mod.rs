//! Text generation integration.
//!
//! Generation backs market analysis, chapter drafting and, when configured,
//! editing suggestions and promotional copy. Providers are tried in order by
//! [`GenerationManager`]; the first success wins.
//!
//! ## Providers
//!
//! - OpenRouter (OpenAI-compatible, `OPENROUTER_API_KEY`)
//! - OpenAI (`OPENAI_API_KEY`)
//! - Claude (`ANTHROPIC_API_KEY`)

#[cfg(feature = "http")]
mod claude;
#[cfg(feature = "http")]
mod openai;

#[cfg(feature = "http")]
pub use claude::ClaudeProvider;
#[cfg(feature = "http")]
pub use openai::OpenAIProvider;

use async_trait::async_trait;

use crate::core::AiConfig;
#[cfg(feature = "http")]
use crate::core::ProviderKind;

/// System prompt shared by the HTTP providers.
pub(crate) const SYSTEM_PROMPT: &str = "You are a publishing assistant helping an author research, write, \
edit and market a book. Follow the requested output format exactly.";

/// Trait for text generation providers.
#[async_trait]
pub trait GenerationService: Send + Sync {
    /// Free-text completion.
    async fn generate(&self, prompt: &str) -> anyhow::Result<String>;

    /// Draft a chapter from its title and the book's context.
    async fn generate_chapter(&self, request: &ChapterRequest) -> anyhow::Result<String> {
        request.validate()?;
        self.generate(&request.to_prompt()).await
    }

    /// Get the provider name.
    fn name(&self) -> &str;
}

/// Structured chapter generation request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChapterRequest {
    pub chapter_title: String,
    pub outline: Vec<String>,
    pub genre: String,
    pub target_audience: String,
}

impl ChapterRequest {
    /// Title, genre and audience must be present. The outline may be empty.
    pub fn validate(&self) -> Result<(), AIError> {
        let required = [
            ("chapterTitle", &self.chapter_title),
            ("genre", &self.genre),
            ("targetAudience", &self.target_audience),
        ];
        match required.iter().find(|(_, value)| value.trim().is_empty()) {
            Some((field, _)) => Err(AIError::MissingField(field)),
            None => Ok(()),
        }
    }

    /// Render the request as a completion prompt.
    pub fn to_prompt(&self) -> String {
        let mut prompt = format!(
            "Write the chapter \"{}\" of a {} book for a {} audience.\n",
            self.chapter_title, self.genre, self.target_audience
        );

        if !self.outline.is_empty() {
            prompt.push_str("\nBook outline:\n");
            for line in &self.outline {
                prompt.push_str("- ");
                prompt.push_str(line);
                prompt.push('\n');
            }
        }

        prompt.push_str("\nRespond with the chapter text only, without headings or commentary.");
        prompt
    }
}

/// Generation error types.
#[derive(Debug, thiserror::Error)]
pub enum AIError {
    #[error("Provider not available: {0}")]
    ProviderNotAvailable(String),

    #[error("API error: {0}")]
    ApiError(String),

    #[error("Missing required field: {0}")]
    MissingField(&'static str),

    #[error("No response from AI")]
    NoResponse,
}

/// Provider chain with fallback support.
#[derive(Default)]
pub struct GenerationManager {
    providers: Vec<Box<dyn GenerationService>>,
}

impl GenerationManager {
    /// Chain over explicit providers, tried in order.
    pub fn new(providers: Vec<Box<dyn GenerationService>>) -> Self {
        Self { providers }
    }

    /// Build the chain from configuration and the API keys in the environment.
    ///
    /// The configured provider comes first, with its model and endpoint
    /// overrides; every other provider whose key is set follows as a fallback.
    #[cfg(feature = "http")]
    pub fn from_config(config: &AiConfig) -> Self {
        if !config.enabled {
            return Self::default();
        }

        let order = std::iter::once(config.provider).chain(
            [ProviderKind::OpenRouter, ProviderKind::OpenAI, ProviderKind::Claude]
                .into_iter()
                .filter(|kind| *kind != config.provider),
        );

        let mut providers: Vec<Box<dyn GenerationService>> = Vec::new();
        for kind in order {
            let preferred = kind == config.provider;
            let built = match kind {
                ProviderKind::OpenRouter => OpenAIProvider::openrouter().map(|p| {
                    Box::new(apply_openai_overrides(p, config, preferred)) as Box<dyn GenerationService>
                }),
                ProviderKind::OpenAI => OpenAIProvider::new().map(|p| {
                    Box::new(apply_openai_overrides(p, config, preferred)) as Box<dyn GenerationService>
                }),
                ProviderKind::Claude => ClaudeProvider::new().map(|mut p| {
                    if preferred {
                        if let Some(model) = &config.model {
                            p = p.with_model(model);
                        }
                        if let Some(url) = &config.base_url {
                            p = p.with_base_url(url);
                        }
                    }
                    Box::new(p) as Box<dyn GenerationService>
                }),
            };

            match built {
                Ok(provider) => providers.push(provider),
                Err(e) => tracing::debug!(provider = ?kind, error = %e, "Skipping provider"),
            }
        }

        Self { providers }
    }

    /// Without HTTP support there are no built-in providers.
    #[cfg(not(feature = "http"))]
    pub fn from_config(_config: &AiConfig) -> Self {
        Self::default()
    }

    /// Check if any provider is configured.
    pub fn is_available(&self) -> bool {
        !self.providers.is_empty()
    }

    /// Get the first provider's name.
    pub fn active_provider(&self) -> Option<&str> {
        self.providers.first().map(|p| p.name())
    }

    /// Names of all providers in fallback order.
    pub fn provider_names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }
}

#[cfg(feature = "http")]
fn apply_openai_overrides(
    mut provider: OpenAIProvider,
    config: &AiConfig,
    preferred: bool,
) -> OpenAIProvider {
    if preferred {
        if let Some(model) = &config.model {
            provider = provider.with_model(model);
        }
        if let Some(url) = &config.base_url {
            provider = provider.with_base_url(url);
        }
    }
    provider
}

#[async_trait]
impl GenerationService for GenerationManager {
    async fn generate(&self, prompt: &str) -> anyhow::Result<String> {
        for provider in &self.providers {
            match provider.generate(prompt).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                }
            }
        }

        Err(AIError::ProviderNotAvailable("No AI provider available".to_string()).into())
    }

    async fn generate_chapter(&self, request: &ChapterRequest) -> anyhow::Result<String> {
        request.validate()?;

        for provider in &self.providers {
            match provider.generate_chapter(request).await {
                Ok(result) => return Ok(result),
                Err(e) => {
                    tracing::warn!(provider = provider.name(), error = %e, "Provider failed, trying next");
                }
            }
        }

        Err(AIError::ProviderNotAvailable("No AI provider available".to_string()).into())
    }

    fn name(&self) -> &str {
        self.active_provider().unwrap_or("none")
    }
}
