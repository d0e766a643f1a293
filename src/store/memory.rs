//! In-memory JSON tree with push subscriptions.

use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::watch;

use super::{new_project_id, ProjectStore, StoreError, StorePath, Subscription};
use crate::model::ProjectRecord;

/// The stored document. The root is always an object.
#[derive(Debug, Clone, Default, PartialEq)]
pub(crate) struct Tree {
    root: Map<String, Value>,
}

impl Tree {
    pub(crate) fn from_value(value: Value) -> Result<Self, StoreError> {
        match value {
            Value::Object(root) => Ok(Self { root }),
            Value::Null => Ok(Self::default()),
            other => Err(StoreError::Rejected(format!("store root must be an object, found {other}"))),
        }
    }

    pub(crate) fn to_value(&self) -> Value {
        Value::Object(self.root.clone())
    }

    pub(crate) fn get(&self, path: &StorePath) -> Option<&Value> {
        let mut node = self.root.get(path.segments().first()?)?;
        for segment in &path.segments()[1..] {
            node = node.as_object()?.get(segment)?;
        }
        Some(node)
    }

    /// Value at `path`, cloned. The root reads as `None` when empty.
    pub(crate) fn value_at(&self, path: &StorePath) -> Option<Value> {
        if path.is_root() {
            return (!self.root.is_empty()).then(|| self.to_value());
        }
        self.get(path).cloned()
    }

    /// Object at `path`, creating (or replacing non-object) nodes on the way.
    fn object_mut(&mut self, path: &StorePath) -> Option<&mut Map<String, Value>> {
        let mut node = &mut self.root;
        for segment in path.segments() {
            let child = node.entry(segment.clone()).or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            node = child.as_object_mut()?;
        }
        Some(node)
    }

    fn get_mut(&mut self, path: &StorePath) -> Option<&mut Value> {
        let (first, rest) = path.segments().split_first()?;
        let mut node = self.root.get_mut(first)?;
        for segment in rest {
            node = node.as_object_mut()?.get_mut(segment)?;
        }
        Some(node)
    }

    /// Replace the value at `path`. `null` removes it.
    pub(crate) fn set(&mut self, path: &StorePath, value: Value) {
        let (Some(parent), Some(key)) = (path.parent(), path.key()) else {
            self.root = match value {
                Value::Object(map) => map,
                _ => Map::new(),
            };
            return;
        };

        if value.is_null() {
            if self.remove_child(&parent, key).is_some() {
                self.prune(&parent);
            }
        } else if let Some(map) = self.object_mut(&parent) {
            map.insert(key.to_string(), value);
        }
    }

    fn remove_child(&mut self, parent: &StorePath, key: &str) -> Option<Value> {
        if parent.is_root() {
            self.root.remove(key)
        } else {
            self.get_mut(parent)?.as_object_mut()?.remove(key)
        }
    }

    /// Drop empty objects left behind by removals, walking up from `path`.
    fn prune(&mut self, path: &StorePath) {
        let mut current = path.clone();
        while let (Some(parent), Some(key)) = (current.parent(), current.key()) {
            let empty = matches!(self.get(&current), Some(Value::Object(map)) if map.is_empty());
            if !empty {
                break;
            }
            let key = key.to_string();
            self.remove_child(&parent, &key);
            current = parent;
        }
    }

    /// Apply a patch at `path` and return the absolute paths it wrote.
    ///
    /// Keys are validated before anything is written.
    pub(crate) fn merge(
        &mut self,
        path: &StorePath,
        patch: Map<String, Value>,
    ) -> Result<Vec<StorePath>, StoreError> {
        let entries = patch
            .into_iter()
            .map(|(key, value)| {
                let relative = StorePath::parse(&key)?;
                if relative.is_root() {
                    return Err(StoreError::InvalidPath {
                        path: key,
                        reason: "empty patch key",
                    });
                }
                Ok((path.join(&relative), value))
            })
            .collect::<Result<Vec<_>, _>>()?;

        let mut touched = Vec::with_capacity(entries.len());
        for (target, value) in entries {
            self.set(&target, value);
            touched.push(target);
        }
        Ok(touched)
    }
}

/// Open subscriptions, keyed by watched path.
#[derive(Debug, Default)]
struct Watchers {
    entries: Vec<(StorePath, watch::Sender<Option<Value>>)>,
}

impl Watchers {
    fn subscribe(&mut self, path: &StorePath, tree: &Tree) -> watch::Receiver<Option<Value>> {
        if let Some((_, sender)) = self.entries.iter().find(|(p, s)| p == path && !s.is_closed()) {
            return sender.subscribe();
        }
        let (sender, receiver) = watch::channel(tree.value_at(path));
        self.entries.push((path.clone(), sender));
        receiver
    }

    /// Push fresh values to every watcher overlapping a touched path.
    fn notify(&mut self, tree: &Tree, touched: &[StorePath]) {
        self.entries.retain(|(_, sender)| !sender.is_closed());

        for (watched, sender) in &self.entries {
            if !touched.iter().any(|t| t.overlaps(watched)) {
                continue;
            }
            let fresh = tree.value_at(watched);
            sender.send_if_modified(|current| {
                if *current == fresh {
                    false
                } else {
                    *current = fresh;
                    true
                }
            });
        }
    }
}

#[derive(Debug, Default)]
struct State {
    tree: Tree,
    watchers: Watchers,
}

/// Store held entirely in memory. Clones share the same tree.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    state: Arc<Mutex<State>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store seeded with an existing document.
    pub fn from_value(value: Value) -> Result<Self, StoreError> {
        let tree = Tree::from_value(value)?;
        Ok(Self { state: Arc::new(Mutex::new(State { tree, watchers: Watchers::default() })) })
    }

    /// Entire document.
    pub fn snapshot(&self) -> Value {
        self.state.lock().tree.to_value()
    }

    pub(crate) fn tree(&self) -> Tree {
        self.state.lock().tree.clone()
    }

    /// Swap in an already-updated tree and notify watchers of `touched`.
    pub(crate) fn commit(&self, tree: Tree, touched: &[StorePath]) {
        let mut state = self.state.lock();
        state.tree = tree;
        let State { tree, watchers } = &mut *state;
        watchers.notify(tree, touched);
    }

    /// Number of live subscriptions.
    pub fn subscriber_count(&self) -> usize {
        let state = self.state.lock();
        state.watchers.entries.iter().map(|(_, s)| s.receiver_count()).sum()
    }
}

#[async_trait]
impl ProjectStore for MemoryStore {
    async fn create(&self, user_id: &str, record: &ProjectRecord) -> Result<String, StoreError> {
        let id = new_project_id();
        let path = StorePath::project(user_id, &id)?;
        let value = serde_json::to_value(record)?;

        let mut state = self.state.lock();
        state.tree.set(&path, value);
        let State { tree, watchers } = &mut *state;
        watchers.notify(tree, std::slice::from_ref(&path));

        tracing::debug!(user = user_id, project = %id, "Created project");
        Ok(id)
    }

    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError> {
        Ok(self.state.lock().tree.value_at(path))
    }

    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError> {
        let mut state = self.state.lock();
        let touched = state.tree.merge(path, patch)?;
        let State { tree, watchers } = &mut *state;
        watchers.notify(tree, &touched);
        Ok(())
    }

    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError> {
        let mut state = self.state.lock();
        let State { tree, watchers } = &mut *state;
        Ok(Subscription::new(path.clone(), watchers.subscribe(path, tree)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::patch;
    use serde_json::json;

    fn path(raw: &str) -> StorePath {
        StorePath::parse(raw).unwrap()
    }

    #[tokio::test]
    async fn test_update_creates_intermediate_nodes() {
        let store = MemoryStore::new();
        store.update(&path("users/ada/projects/p1"), patch([("title", json!("Ember"))])).await.unwrap();

        assert_eq!(
            store.read(&path("users/ada/projects/p1/title")).await.unwrap(),
            Some(json!("Ember"))
        );
        assert!(store.read(&path("users/bob")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_update_replaces_each_key_wholly() {
        let store = MemoryStore::new();
        let p = path("users/ada/projects/p1");
        store
            .update(&p, patch([("research", json!({"keywords": ["a"], "marketAnalysis": "x"}))]))
            .await
            .unwrap();
        store.update(&p, patch([("research", json!({"keywords": ["a", "b"]}))])).await.unwrap();

        let research = store.read(&p.clone().child("research").unwrap()).await.unwrap().unwrap();
        assert_eq!(research, json!({"keywords": ["a", "b"]}));
    }

    #[tokio::test]
    async fn test_nested_keys_write_narrowly() {
        let store = MemoryStore::new();
        let p = path("users/ada/projects/p1");
        store
            .update(
                &p,
                patch([
                    ("chapters/chapter-1", json!({"title": "One"})),
                    ("chapters/chapter-2", json!({"title": "Two"})),
                ]),
            )
            .await
            .unwrap();
        store
            .update(&p, patch([("chapters/chapter-2", json!({"title": "Deux"}))]))
            .await
            .unwrap();

        let chapters = store.read(&p.clone().child("chapters").unwrap()).await.unwrap().unwrap();
        assert_eq!(chapters["chapter-1"]["title"], "One");
        assert_eq!(chapters["chapter-2"]["title"], "Deux");
    }

    #[tokio::test]
    async fn test_null_removes_and_prunes() {
        let store = MemoryStore::new();
        let p = path("users/ada/projects/p1");
        store.update(&p, patch([("chapters/chapter-1", json!({"title": "One"}))])).await.unwrap();
        store.update(&p, patch([("chapters/chapter-1", Value::Null)])).await.unwrap();

        assert!(store.read(&p).await.unwrap().is_none());
        assert_eq!(store.snapshot(), json!({}));
    }

    #[tokio::test]
    async fn test_invalid_patch_key_writes_nothing() {
        let store = MemoryStore::new();
        let p = path("users/ada/projects/p1");
        let result = store
            .update(&p, patch([("title", json!("Ember")), ("bad.key", json!(1))]))
            .await;

        assert!(matches!(result, Err(StoreError::InvalidPath { .. })));
        assert!(store.read(&p).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_subscribers_see_overlapping_writes_only() {
        let store = MemoryStore::new();
        let p1 = path("users/ada/projects/p1");
        let p2 = path("users/ada/projects/p2");

        let mut sub1 = store.subscribe(&p1).await.unwrap();
        let mut sub2 = store.subscribe(&p2).await.unwrap();
        assert_eq!(sub1.next().await, Some(None));
        assert_eq!(sub2.next().await, Some(None));

        store.update(&p1, patch([("progress", json!(25))])).await.unwrap();
        assert_eq!(sub1.next().await, Some(Some(json!({"progress": 25}))));
        assert!(!sub2.receiver.has_changed().unwrap());
    }

    #[tokio::test]
    async fn test_ancestor_subscription_sees_descendant_write() {
        let store = MemoryStore::new();
        let projects = path("users/ada/projects");
        let mut sub = store.subscribe(&projects).await.unwrap();
        sub.next().await;

        store
            .update(&path("users/ada/projects/p1/chapters"), patch([("chapter-1", json!({"title": "One"}))]))
            .await
            .unwrap();
        let value = sub.next().await.unwrap().unwrap();
        assert_eq!(value["p1"]["chapters"]["chapter-1"]["title"], "One");
    }

    #[tokio::test]
    async fn test_dropping_subscription_unsubscribes() {
        let store = MemoryStore::new();
        let p = path("users/ada/projects/p1");
        let sub = store.subscribe(&p).await.unwrap();
        assert_eq!(store.subscriber_count(), 1);

        drop(sub);
        store.update(&p, patch([("progress", json!(1))])).await.unwrap();
        assert_eq!(store.subscriber_count(), 0);
    }

    #[tokio::test]
    async fn test_from_value_rejects_non_object_root() {
        assert!(MemoryStore::from_value(json!([1, 2])).is_err());
        let store = MemoryStore::from_value(json!({"users": {}})).unwrap();
        assert_eq!(store.snapshot(), json!({"users": {}}));
    }
}
