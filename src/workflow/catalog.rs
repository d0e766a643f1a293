//! Project creation, listing and dashboard statistics.

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::Value;

use super::{SessionContext, WorkflowError};
use crate::model::{NewProject, Phase, ProjectRecord};
use crate::store::{decode_project, ProjectWatcher, StoreError};

/// Criteria for [`ProjectCatalog::list_projects`].
#[derive(Debug, Clone, Default)]
pub struct ProjectFilter {
    /// Case-insensitive substring of the title or description
    pub search: Option<String>,
    /// Only projects in this phase
    pub phase: Option<Phase>,
}

impl ProjectFilter {
    pub fn matches(&self, record: &ProjectRecord) -> bool {
        if self.phase.is_some_and(|phase| phase != record.status) {
            return false;
        }
        match self.search.as_deref().map(str::trim) {
            Some(term) if !term.is_empty() => {
                let term = term.to_lowercase();
                record.title.to_lowercase().contains(&term)
                    || record.description.to_lowercase().contains(&term)
            }
            _ => true,
        }
    }
}

/// Dashboard numbers over all of a user's projects.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CatalogStats {
    pub total: usize,
    pub per_phase: BTreeMap<Phase, usize>,
    pub average_progress: f64,
    pub total_words: usize,
}

impl CatalogStats {
    pub fn from_records(records: &[ProjectRecord]) -> Self {
        let mut per_phase: BTreeMap<Phase, usize> = Phase::ALL.into_iter().map(|p| (p, 0)).collect();
        for record in records {
            *per_phase.entry(record.status).or_default() += 1;
        }
        let average_progress = if records.is_empty() {
            0.0
        } else {
            records.iter().map(|r| f64::from(r.progress)).sum::<f64>() / records.len() as f64
        };
        Self {
            total: records.len(),
            per_phase,
            average_progress,
            total_words: records.iter().map(ProjectRecord::total_words).sum(),
        }
    }
}

/// All projects owned by the session user.
pub struct ProjectCatalog {
    ctx: SessionContext,
}

impl ProjectCatalog {
    pub fn new(ctx: SessionContext) -> Self {
        Self { ctx }
    }

    /// Create a project in the research phase with empty artifacts.
    pub async fn create_project(&self, project: NewProject) -> Result<ProjectRecord, WorkflowError> {
        if project.title.trim().is_empty() {
            return Err(WorkflowError::MissingField("title"));
        }
        if project.description.trim().is_empty() {
            return Err(WorkflowError::MissingField("description"));
        }

        let record = ProjectRecord::new(project);
        let id = self.ctx.store.create(&self.ctx.user_id, &record).await?;
        tracing::info!(project = %id, title = %record.title, "Project created");
        Ok(record.with_id(id))
    }

    /// Load one project.
    pub async fn load(&self, project_id: &str) -> Result<ProjectRecord, WorkflowError> {
        let path = self.ctx.project_path(project_id)?;
        let value = self.ctx.store.read(&path).await?.ok_or_else(|| StoreError::NotFound(path.to_string()))?;
        Ok(decode_project(project_id, value)?)
    }

    /// Live view of one project.
    pub async fn watch(&self, project_id: &str) -> Result<ProjectWatcher, WorkflowError> {
        let path = self.ctx.project_path(project_id)?;
        let subscription = self.ctx.store.subscribe(&path).await?;
        Ok(ProjectWatcher::new(project_id, subscription))
    }

    /// Projects matching `filter`, most recently updated first.
    ///
    /// Entries that fail to decode are skipped with a warning.
    pub async fn list_projects(&self, filter: &ProjectFilter) -> Result<Vec<ProjectRecord>, WorkflowError> {
        let mut records: Vec<ProjectRecord> =
            self.all_projects().await?.into_iter().filter(|r| filter.matches(r)).collect();
        records.sort_by(|a, b| b.updated_at.cmp(&a.updated_at).then_with(|| a.id.cmp(&b.id)));
        Ok(records)
    }

    pub async fn stats(&self) -> Result<CatalogStats, WorkflowError> {
        Ok(CatalogStats::from_records(&self.all_projects().await?))
    }

    async fn all_projects(&self) -> Result<Vec<ProjectRecord>, WorkflowError> {
        let path = self.ctx.projects_path()?;
        let Some(Value::Object(entries)) = self.ctx.store.read(&path).await? else {
            return Ok(Vec::new());
        };

        let mut records = Vec::with_capacity(entries.len());
        for (id, value) in entries {
            match decode_project(&id, value) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!(project = %id, error = %e, "Skipping unreadable project"),
            }
        }
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ai::GenerationManager;
    use crate::model::{Audience, Genre};
    use crate::search::NoSearch;
    use crate::store::{patch, MemoryStore, ProjectStore, StorePath};
    use serde_json::json;
    use std::sync::Arc;

    fn catalog() -> (ProjectCatalog, MemoryStore) {
        let store = MemoryStore::new();
        let ctx = SessionContext::new(
            "ada",
            Arc::new(store.clone()),
            Arc::new(NoSearch),
            Arc::new(GenerationManager::default()),
        );
        (ProjectCatalog::new(ctx), store)
    }

    fn project(title: &str, description: &str) -> NewProject {
        NewProject::new(title, description, Genre::Fantasy, Audience::YoungAdult)
    }

    #[tokio::test]
    async fn test_create_project_starts_in_research() {
        let (catalog, _store) = catalog();
        let record = catalog.create_project(project("Ember", "Dragons")).await.unwrap();

        assert!(!record.id.is_empty());
        assert_eq!(record.status, Phase::Research);
        assert_eq!(record.progress, 0);
        assert_eq!(record.target_audience, "Young Adult");

        let loaded = catalog.load(&record.id).await.unwrap();
        assert_eq!(loaded, record);
    }

    #[tokio::test]
    async fn test_create_project_requires_title_and_description() {
        let (catalog, _store) = catalog();
        let err = catalog.create_project(project("  ", "Dragons")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("title")));
        let err = catalog.create_project(project("Ember", "")).await.unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("description")));
        assert!(catalog.list_projects(&ProjectFilter::default()).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_load_missing_project() {
        let (catalog, _store) = catalog();
        let err = catalog.load("nope").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_list_filters_and_orders() {
        let (catalog, store) = catalog();
        let first = catalog.create_project(project("Ember", "Dragons rise")).await.unwrap();
        let second = catalog.create_project(project("Ledger", "A heist")).await.unwrap();

        let path = StorePath::project("ada", &first.id).unwrap();
        let later = second.updated_at.timestamp_millis() + 1000;
        store
            .update(&path, patch([("status", json!("writing")), ("updatedAt", json!(later))]))
            .await
            .unwrap();

        let all = catalog.list_projects(&ProjectFilter::default()).await.unwrap();
        assert_eq!(all.iter().map(|r| r.id.as_str()).collect::<Vec<_>>(), [first.id.as_str(), second.id.as_str()]);

        let filter = ProjectFilter { search: Some("DRAGON".into()), phase: None };
        assert_eq!(catalog.list_projects(&filter).await.unwrap().len(), 1);

        let filter = ProjectFilter { search: None, phase: Some(Phase::Research) };
        let research = catalog.list_projects(&filter).await.unwrap();
        assert_eq!(research.len(), 1);
        assert_eq!(research[0].id, second.id);
    }

    #[tokio::test]
    async fn test_stats() {
        let (catalog, store) = catalog();
        let a = catalog.create_project(project("Ember", "Dragons")).await.unwrap();
        catalog.create_project(project("Ledger", "A heist")).await.unwrap();

        let path = StorePath::project("ada", &a.id).unwrap();
        store
            .update(
                &path,
                patch([
                    ("progress", json!(50)),
                    ("chapters/chapter-1", json!({"title": "One", "content": "a b c", "wordCount": 3})),
                ]),
            )
            .await
            .unwrap();

        let stats = catalog.stats().await.unwrap();
        assert_eq!(stats.total, 2);
        assert_eq!(stats.per_phase[&Phase::Research], 2);
        assert_eq!(stats.per_phase[&Phase::Marketing], 0);
        assert!((stats.average_progress - 25.0).abs() < f64::EPSILON);
        assert_eq!(stats.total_words, 3);
    }

    #[tokio::test]
    async fn test_watch_pushes_changes() {
        let (catalog, store) = catalog();
        let record = catalog.create_project(project("Ember", "Dragons")).await.unwrap();
        let mut watcher = catalog.watch(&record.id).await.unwrap();

        let initial = watcher.next().await.unwrap().unwrap().unwrap();
        assert_eq!(initial.title, "Ember");

        let path = StorePath::project("ada", &record.id).unwrap();
        store.update(&path, patch([("title", json!("Ashes"))])).await.unwrap();
        let pushed = watcher.next().await.unwrap().unwrap().unwrap();
        assert_eq!(pushed.title, "Ashes");
    }
}
