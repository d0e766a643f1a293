//! Configuration management for Authorflow.
//!
//! Handles loading and saving configuration from TOML files.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Environment variable that overrides `general.user_id`.
pub const USER_ENV: &str = "AUTHORFLOW_USER";

/// Application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Generation service settings
    pub ai: AiConfig,

    /// Search backend settings
    pub search: SearchConfig,

    /// Persistent store settings
    pub store: StoreConfig,

    /// Workflow policies
    pub workflow: WorkflowConfig,

    /// Log output
    pub logging: LoggingConfig,
}

/// General application settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Owner id used in store paths (`users/{user_id}/projects`)
    pub user_id: String,

    /// Directory for the project store; defaults to the platform data dir
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,
}

/// Generation provider selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenRouter,
    OpenAI,
    Claude,
}

/// Generation service settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AiConfig {
    /// Whether generation is available at all
    pub enabled: bool,

    /// Preferred provider; others with a key act as fallbacks
    pub provider: ProviderKind,

    /// Model override for the preferred provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Endpoint override for the preferred provider
    #[serde(skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,

    /// Per-attempt deadline in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_attempts: u32,
}

/// Search backend settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SearchConfig {
    /// Base URL of the book search backend
    pub base_url: String,

    /// Upper bound on results per search
    pub max_results: usize,

    /// Per-attempt deadline in seconds
    pub timeout_secs: u64,

    /// Retries after the first attempt
    pub max_attempts: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    #[default]
    File,
    Memory,
}

/// Persistent store settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    pub backend: StoreBackend,

    /// Store file, relative to the data directory unless absolute
    pub path: PathBuf,
}

/// Phase transition policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PhaseOrder {
    /// Any phase may be selected from any phase
    #[default]
    Free,
    /// Moving back to an earlier phase is rejected
    Sequential,
}

/// Source of editing suggestions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AnalyzerKind {
    #[default]
    Rules,
    Ai,
}

/// Source of promotional copy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CopySource {
    #[default]
    Template,
    Ai,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub phase_order: PhaseOrder,
    pub editing_analyzer: AnalyzerKind,
    pub promo_copy: CopySource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default filter directive when `RUST_LOG` is unset
    pub level: String,

    /// Emit JSON lines instead of human-readable output
    pub json: bool,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Looks for config in:
    /// 1. `.authorflow.toml` in current directory
    /// 2. `~/.config/authorflow/config.toml`
    /// 3. Falls back to defaults
    ///
    /// `AUTHORFLOW_USER` is applied on top of whichever source was used.
    pub fn load() -> anyhow::Result<Self> {
        let local_config = PathBuf::from(".authorflow.toml");
        let mut config = if local_config.exists() {
            Self::load_from_file(&local_config)?
        } else if let Some(global_config) =
            Self::config_dir().map(|d| d.join("config.toml")).filter(|p| p.exists())
        {
            Self::load_from_file(&global_config)?
        } else {
            Self::default()
        };

        config.apply_env();
        Ok(config)
    }

    /// Load configuration from a specific file.
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Invalid config {}: {e}", path.display()))?;
        Ok(config)
    }

    /// Apply environment overrides.
    pub fn apply_env(&mut self) {
        if let Ok(user) = std::env::var(USER_ENV) {
            let user = user.trim();
            if !user.is_empty() {
                self.general.user_id = user.to_string();
            }
        }
    }

    /// Get the config directory path.
    pub fn config_dir() -> Option<PathBuf> {
        dirs::config_dir().map(|d| d.join("authorflow"))
    }

    /// Directory holding the project store.
    pub fn data_dir(&self) -> PathBuf {
        self.general
            .data_dir
            .clone()
            .or_else(|| dirs::data_dir().map(|d| d.join("authorflow")))
            .unwrap_or_else(|| PathBuf::from(".authorflow"))
    }

    /// Resolved path of the store file.
    pub fn store_path(&self) -> PathBuf {
        if self.store.path.is_absolute() {
            self.store.path.clone()
        } else {
            self.data_dir().join(&self.store.path)
        }
    }
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self { user_id: "local".to_string(), data_dir: None }
    }
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            provider: ProviderKind::OpenRouter,
            model: None,
            base_url: None,
            timeout_secs: 120,
            max_attempts: 0,
        }
    }
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000".to_string(),
            max_results: 10,
            timeout_secs: 30,
            max_attempts: 0,
        }
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self { backend: StoreBackend::File, path: PathBuf::from("projects.json") }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self { level: "warn".to_string(), json: false }
    }
}
