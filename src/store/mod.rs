//! Persistent project store.
//!
//! The store is a JSON tree addressed by [`StorePath`]. Projects live at
//! `users/{userId}/projects/{projectId}`. Writes merge a patch into the node
//! at a path; subscribers receive the current value at their path right
//! away and again after every write that touches it.

mod file;
mod memory;
mod path;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use path::StorePath;

use async_trait::async_trait;
use futures::Stream;
use serde_json::{Map, Value};
use tokio::sync::watch;

use crate::model::ProjectRecord;

/// Store error types.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Invalid store path '{path}': {reason}")]
    InvalidPath { path: String, reason: &'static str },

    #[error("Nothing stored at '{0}'")]
    NotFound(String),

    #[error("Malformed data: {0}")]
    Serde(#[from] serde_json::Error),

    #[error("Store I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Write rejected: {0}")]
    Rejected(String),
}

/// Trait for project store backends.
#[async_trait]
pub trait ProjectStore: Send + Sync {
    /// Store a new project under a generated id and return that id.
    async fn create(&self, user_id: &str, record: &ProjectRecord) -> Result<String, StoreError>;

    /// Current value at `path`, if any.
    async fn read(&self, path: &StorePath) -> Result<Option<Value>, StoreError>;

    /// Merge `patch` into the node at `path`.
    ///
    /// Each key replaces that child wholly. Keys may be relative paths
    /// (`chapters/chapter-2`) for narrow writes. `null` removes the child.
    /// The whole patch applies or none of it does.
    async fn update(&self, path: &StorePath, patch: Map<String, Value>) -> Result<(), StoreError>;

    /// Watch the value at `path`.
    async fn subscribe(&self, path: &StorePath) -> Result<Subscription, StoreError>;
}

/// Live view of one store path. Dropping it unsubscribes.
#[derive(Debug)]
pub struct Subscription {
    path: StorePath,
    receiver: watch::Receiver<Option<Value>>,
    delivered_initial: bool,
}

impl Subscription {
    pub(crate) fn new(path: StorePath, receiver: watch::Receiver<Option<Value>>) -> Self {
        Self { path, receiver, delivered_initial: false }
    }

    pub fn path(&self) -> &StorePath {
        &self.path
    }

    /// Latest value without waiting.
    pub fn current(&self) -> Option<Value> {
        self.receiver.borrow().clone()
    }

    /// Next value: the current one on the first call, then one per change.
    ///
    /// Returns `None` once the store has been dropped.
    pub async fn next(&mut self) -> Option<Option<Value>> {
        if self.delivered_initial {
            self.receiver.changed().await.ok()?;
        } else {
            self.delivered_initial = true;
        }
        Some(self.receiver.borrow_and_update().clone())
    }

    /// Adapt into a stream of values.
    pub fn into_stream(self) -> impl Stream<Item = Option<Value>> {
        futures::stream::unfold(self, |mut sub| async move {
            let value = sub.next().await?;
            Some((value, sub))
        })
    }
}

/// Subscription that decodes pushed values into [`ProjectRecord`]s.
#[derive(Debug)]
pub struct ProjectWatcher {
    project_id: String,
    subscription: Subscription,
}

impl ProjectWatcher {
    pub fn new(project_id: impl Into<String>, subscription: Subscription) -> Self {
        Self { project_id: project_id.into(), subscription }
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Next pushed record. `Ok(None)` means the project no longer exists.
    pub async fn next(&mut self) -> Option<Result<Option<ProjectRecord>, StoreError>> {
        let value = self.subscription.next().await?;
        Some(value.map(|v| decode_project(&self.project_id, v)).transpose())
    }
}

/// Decode a stored project body and attach its id.
pub fn decode_project(project_id: &str, value: Value) -> Result<ProjectRecord, StoreError> {
    let record: ProjectRecord = serde_json::from_value(value)?;
    Ok(record.with_id(project_id))
}

/// Build a patch from key/value pairs.
pub fn patch<I, K>(entries: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (K, Value)>,
    K: Into<String>,
{
    entries.into_iter().map(|(k, v)| (k.into(), v)).collect()
}

/// Generate a new, time-ordered project id.
pub(crate) fn new_project_id() -> String {
    uuid::Uuid::now_v7().simple().to_string()
}
