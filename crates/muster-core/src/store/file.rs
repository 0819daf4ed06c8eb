//! File-backed entity store.
//!
//! Entities live in memory and every commit rewrites the backing JSON
//! document. The write goes to a sibling temp file first and is renamed
//! over the target, so a crash mid-write leaves the previous snapshot
//! intact.

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::fs;
use tracing::debug;

use super::{AttrQuery, EntityStore, InMemoryStore};
use crate::error::StoreResult;
use crate::model::{Entity, EntityKind};

pub struct FileStore {
    path: PathBuf,
    inner: InMemoryStore,
}

impl FileStore {
    /// Open the inventory document at `path`, loading every persisted
    /// entity. A missing file is an empty inventory, created on the first
    /// commit.
    pub async fn open(path: impl Into<PathBuf>) -> StoreResult<Self> {
        let path = path.into();
        let entities = match fs::read_to_string(&path).await {
            Ok(contents) if contents.trim().is_empty() => Vec::new(),
            Ok(contents) => serde_json::from_str::<Vec<Entity>>(&contents)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), entities = entities.len(), "Loaded inventory");
        Ok(Self {
            inner: InMemoryStore::with_entities(entities).await,
            path,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn persist(&self) -> StoreResult<()> {
        let snapshot = self.inner.snapshot().await;
        let contents = serde_json::to_string_pretty(&snapshot)?;

        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).await?;
            }
        }
        let mut tmp = self.path.clone().into_os_string();
        tmp.push(".tmp");
        let tmp = PathBuf::from(tmp);
        fs::write(&tmp, contents).await?;
        fs::rename(&tmp, &self.path).await?;
        debug!(path = %self.path.display(), entities = snapshot.len(), "Persisted inventory");
        Ok(())
    }
}

#[async_trait]
impl EntityStore for FileStore {
    async fn add(&self, entity: Entity) -> StoreResult<()> {
        self.inner.add(entity).await
    }

    async fn commit(&self) -> StoreResult<()> {
        self.inner.commit().await?;
        self.persist().await
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Entity> {
        self.inner.get(kind, id).await
    }

    async fn all(&self, kinds: &[EntityKind]) -> StoreResult<Vec<Entity>> {
        self.inner.all(kinds).await
    }

    async fn search(&self, kinds: &[EntityKind], query: &AttrQuery) -> StoreResult<Vec<Entity>> {
        self.inner.search(kinds, query).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::EntityAttrs;
    use serde_json::json;

    fn entity(kind: EntityKind, value: serde_json::Value) -> Entity {
        let attrs: EntityAttrs = serde_json::from_value(value).unwrap();
        Entity::from_attrs(kind, &attrs).unwrap()
    }

    #[tokio::test]
    async fn test_open_missing_file_starts_empty() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::open(dir.path().join("inventory.json"))
            .await
            .unwrap();

        assert!(store.all(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_commit_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .add(entity(
                EntityKind::Compute,
                json!({"id": "i-abc123", "name": "api-1", "state": "active"}),
            ))
            .await
            .unwrap();
        store.commit().await.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        let fetched = reopened.get(EntityKind::Compute, "i-abc123").await.unwrap();
        assert_eq!(fetched.name(), Some("api-1"));
    }

    #[tokio::test]
    async fn test_uncommitted_writes_are_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .add(entity(
                EntityKind::Service,
                json!({"id": "ser_001", "state": "active"}),
            ))
            .await
            .unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        assert!(reopened.all(&[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_open_rejects_corrupt_document() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        std::fs::write(&path, "{not json").unwrap();

        assert!(FileStore::open(&path).await.is_err());
    }

    #[tokio::test]
    async fn test_commit_creates_missing_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/stash/inventory.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .add(entity(
                EntityKind::Person,
                json!({"id": "peo_001", "name": "Jane", "state": "active"}),
            ))
            .await
            .unwrap();
        store.commit().await.unwrap();

        assert!(path.exists());
    }
}
