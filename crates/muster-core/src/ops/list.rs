//! Listing and id synthesis.

use tracing::debug;

use crate::error::{OpsError, OpsResult};
use crate::model::{Entity, EntityKind, EntityState};
use crate::store::EntityStore;

use super::resolve_kinds;

/// Which lifecycle states a listing or search admits. The default keeps
/// terminated entities out of view.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StateFilter {
    /// Admit every state. Dominates `inactive` when both are set.
    pub all: bool,
    /// Admit only terminated entities.
    pub inactive: bool,
}

impl StateFilter {
    pub fn admits(self, state: EntityState) -> bool {
        if self.all {
            true
        } else if self.inactive {
            state.is_terminated()
        } else {
            !state.is_terminated()
        }
    }
}

/// Every entity of the requested kinds that passes the state filter,
/// ordered by kind tag then id. An empty kind slice lists everything.
pub async fn list_entities(
    store: &dyn EntityStore,
    kinds: &[EntityKind],
    filter: StateFilter,
) -> OpsResult<Vec<Entity>> {
    let entities: Vec<Entity> = store
        .all(resolve_kinds(kinds))
        .await?
        .into_iter()
        .filter(|entity| filter.admits(entity.state()))
        .collect();
    if entities.is_empty() {
        return Err(OpsError::no_matches(kinds));
    }
    debug!(entities = entities.len(), "Listed entities");
    Ok(entities)
}

/// The next free id for a curated kind: the highest numeric suffix in use
/// plus one, zero padded. Kinds observed from a provider keep the ids the
/// provider assigned and cannot be generated here.
pub async fn next_id(store: &dyn EntityStore, kind: EntityKind) -> OpsResult<String> {
    if !kind.is_curated() {
        return Err(OpsError::ProviderAssignedIds(kind));
    }
    let prefix = format!("{}_", kind.tag());
    let mut highest = 0u32;
    for entity in store.all(&[kind]).await? {
        if let Some(number) = entity
            .id()
            .strip_prefix(&prefix)
            .and_then(|suffix| suffix.parse::<u32>().ok())
        {
            highest = highest.max(number);
        }
    }
    Ok(format!("{}_{:03}", kind.tag(), highest + 1))
}
