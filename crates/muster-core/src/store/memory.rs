//! In-memory entity store.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::{compile_query, matches_query, AttrQuery, EntityStore};
use crate::error::{StoreError, StoreResult};
use crate::model::{Entity, EntityKind};

type EntityMap = BTreeMap<(EntityKind, String), Entity>;

/// Entity store backed by process memory. Ordered by kind tag then id so
/// reads come back deterministic.
pub struct InMemoryStore {
    committed: Arc<RwLock<EntityMap>>,
    staged: Arc<RwLock<EntityMap>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self {
            committed: Arc::new(RwLock::new(BTreeMap::new())),
            staged: Arc::new(RwLock::new(BTreeMap::new())),
        }
    }

    /// Creates a store with the given entities already committed.
    pub async fn with_entities(entities: impl IntoIterator<Item = Entity>) -> Self {
        let store = Self::new();
        {
            let mut committed = store.committed.write().await;
            for entity in entities {
                committed.insert((entity.kind(), entity.id().to_string()), entity);
            }
        }
        store
    }

    /// Every committed entity, in storage order.
    pub async fn snapshot(&self) -> Vec<Entity> {
        self.committed.read().await.values().cloned().collect()
    }
}

impl Default for InMemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl EntityStore for InMemoryStore {
    async fn add(&self, entity: Entity) -> StoreResult<()> {
        let mut staged = self.staged.write().await;
        staged.insert((entity.kind(), entity.id().to_string()), entity);
        Ok(())
    }

    async fn commit(&self) -> StoreResult<()> {
        let mut staged = self.staged.write().await;
        let mut committed = self.committed.write().await;
        committed.append(&mut staged);
        Ok(())
    }

    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Entity> {
        let committed = self.committed.read().await;
        committed
            .get(&(kind, id.to_string()))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{kind} {id}")))
    }

    async fn all(&self, kinds: &[EntityKind]) -> StoreResult<Vec<Entity>> {
        let committed = self.committed.read().await;
        let entities = committed
            .iter()
            .filter(|((kind, _), _)| kinds.is_empty() || kinds.contains(kind))
            .map(|(_, entity)| entity.clone())
            .collect();
        Ok(entities)
    }

    async fn search(&self, kinds: &[EntityKind], query: &AttrQuery) -> StoreResult<Vec<Entity>> {
        let compiled = compile_query(query)?;
        let committed = self.committed.read().await;
        let mut matched = Vec::new();
        for ((kind, _), entity) in committed.iter() {
            if !kinds.is_empty() && !kinds.contains(kind) {
                continue;
            }
            if matches_query(entity, &compiled)? {
                matched.push(entity.clone());
            }
        }
        if matched.is_empty() {
            return Err(StoreError::NotFound(format!(
                "no entities match {query:?}"
            )));
        }
        Ok(matched)
    }
}
