//! JSON-file-backed store.
//!
//! Holds the tree in a [`MemoryStore`] and rewrites the whole file after
//! every write. A write only becomes visible once the file is on disk.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::{Map, Value};

use super::memory::Tree;
use super::{new_project_id, MemoryStore, ProjectStore, StoreError, StorePath, Subscription};
use crate::model::ProjectRecord;

/// Store persisted to a single JSON document.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    write_lock: tokio::sync::Mutex<()>,
}

impl FileStore {
    /// Open the store at `path`, starting empty if the file does not exist.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let memory = match tokio::fs::read_to_string(&path).await {
            Ok(content) if content.trim().is_empty() => MemoryStore::new(),
            Ok(content) => MemoryStore::from_value(serde_json::from_str(&content)?)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => MemoryStore::new(),
            Err(e) => return Err(e.into()),
        };

        tracing::debug!(path = %path.display(), "Opened project store");
        Ok(Self { path, memory, write_lock: tokio::sync::Mutex::new(()) })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Apply `change` to a copy of the tree, persist it, then publish it.
    async fn write<F>(&self, change: F) -> Result<(), StoreError>
    where
        F: FnOnce(&mut Tree) -> Result<Vec<StorePath>, StoreError> + Send,
    {
        let _guard = self.write_lock.lock().await;

        let mut tree = self.memory.tree();
        let touched = change(&mut tree)?;
        persist(&self.path, &tree).await?;
        self.memory.commit(tree, &touched);
        Ok(())
    }
}

/// Write via a sibling temp file so a failed write leaves the old file intact.
async fn persist(path: &Path, tree: &Tree) -> Result<(), StoreError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await?;
    }

    let body = serde_json::to_vec_pretty(&tree.to_value())?;
    let tmp = path.with_extension("json.tmp");
    tokio::fs::write(&tmp, body).await?;
    tokio::fs::rename(&tmp, path).await?;
    Ok(())
}

#[async_trait]
impl ProjectStore for FileStore {
    async fn create(&self, user_id: &str, record: &ProjectRecord) -> Result<String, StoreError> {
        let id = new_project_id();
        let path = StorePath::project(user_id, &id)?;
        let value = serde_json::to_value(record)?;

        self.write(|tree| {
            tree.set(&path, value);
            Ok(vec![path.clone()])
        })
        .await?;

        tracing::debug!(user = user_id, project = %id, "Created project");
        Ok(id)
    }

    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        self.memory.read(path).await
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        self.write(|tree| tree.merge(path, patch)).await
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        self.memory.subscribe(path).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Audience, Genre, NewProject};
    use crate::store::patch;
    use serde_json::json;
    use tempfile::TempDir;

    fn record() -> ProjectRecord {
        ProjectRecord::new(NewProject::new("Ember", "A tale", Genre::Fantasy, Audience::Adult))
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("projects.json")).await.unwrap();
        assert!(store.read(&StorePath::root()).await.unwrap().is_none());
        assert!(!store.path().exists());
    }

    #[tokio::test]
    async fn test_writes_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("nested").join("projects.json");

        let id = {
            let store = FileStore::open(&file).await.unwrap();
            let id = store.create("ada", &record()).await.unwrap();
            let project = StorePath::project("ada", &id).unwrap();
            store.update(&project, patch([("progress", json!(25))])).await.unwrap();
            id
        };

        let reopened = FileStore::open(&file).await.unwrap();
        let project = StorePath::project("ada", &id).unwrap();
        let value = reopened.read(&project).await.unwrap().unwrap();
        assert_eq!(value["progress"], 25);
        assert_eq!(value["title"], "Ember");
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_file() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("projects.json");
        tokio::fs::write(&file, "{not json").await.unwrap();

        assert!(matches!(FileStore::open(&file).await, Err(StoreError::Serde(_))));
    }

    #[tokio::test]
    async fn test_failed_persist_leaves_state_untouched() {
        let dir = TempDir::new().unwrap();
        // A directory where the file should be makes the rename fail.
        let file = dir.path().join("projects.json");
        let store = FileStore::open(&file).await.unwrap();
        tokio::fs::create_dir_all(&file).await.unwrap();

        let project = StorePath::project("ada", "p1").unwrap();
        let result = store.update(&project, patch([("title", json!("Ember"))])).await;

        assert!(result.is_err());
        assert!(store.read(&project).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_notified_after_persist() {
        let dir = TempDir::new().unwrap();
        let store = FileStore::open(dir.path().join("projects.json")).await.unwrap();
        let project = StorePath::project("ada", "p1").unwrap();

        let mut sub = store.subscribe(&project).await.unwrap();
        assert_eq!(sub.next().await, Some(None));

        store.update(&project, patch([("status", json!("writing"))])).await.unwrap();
        assert_eq!(sub.next().await, Some(Some(json!({"status": "writing"}))));
    }
}
