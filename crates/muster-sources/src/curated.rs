//! Curated records source.

use async_trait::async_trait;

use muster_core::model::{Entity, EntityKind, EntityUpdate};
use muster_core::source::{Source, SourceResult};

/// Source for the hand-maintained record kinds.
///
/// Curated entries enter the inventory through direct writes rather than
/// a reconciliation feed, so an update run has nothing to pull from here.
/// The source still exists so every kind has a named owner in the source
/// list and update runs report it cleanly.
#[derive(Debug, Default, Clone, Copy)]
pub struct CuratedSource;

impl CuratedSource {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Source for CuratedSource {
    fn name(&self) -> &str {
        "curated"
    }

    async fn update(
        &self,
        _kinds: &[EntityKind],
        _active: Vec<Entity>,
    ) -> SourceResult<Vec<EntityUpdate>> {
        Ok(Vec::new())
    }
}
