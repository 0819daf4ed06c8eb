//! Source that replays a pre-recorded batch of updates.

use async_trait::async_trait;

use muster_core::model::{Entity, EntityKind, EntityUpdate};
use muster_core::source::{Source, SourceError, SourceResult};

/// Source that hands back a fixed batch of updates.
///
/// Useful for seeding an inventory from an export and for driving the
/// reconciliation engine without a live provider.
pub struct ReplaySource {
    name: String,
    updates: Vec<EntityUpdate>,
    failure: Option<SourceError>,
}

impl ReplaySource {
    pub fn new(name: &str, updates: Vec<EntityUpdate>) -> Self {
        Self {
            name: name.to_string(),
            updates,
            failure: None,
        }
    }

    /// Replay a failure instead of the recorded updates.
    pub fn failing(name: &str, failure: SourceError) -> Self {
        Self {
            name: name.to_string(),
            updates: Vec::new(),
            failure: Some(failure),
        }
    }
}

#[async_trait]
impl Source for ReplaySource {
    fn name(&self) -> &str {
        &self.name
    }

    async fn update(
        &self,
        kinds: &[EntityKind],
        _active: Vec<Entity>,
    ) -> SourceResult<Vec<EntityUpdate>> {
        if let Some(failure) = &self.failure {
            return Err(failure.clone());
        }
        Ok(self
            .updates
            .iter()
            .filter(|update| kinds.is_empty() || kinds.contains(&update.kind))
            .cloned()
            .collect())
    }
}
