//! Inventory operations.
//!
//! The verbs the CLI exposes: reconciling sources into the store, listing,
//! searching, usage analysis, and single-entity manipulation. Everything
//! here works against [`EntityStore`] so the operations run the same over
//! the file-backed store and the in-memory one.

pub mod list;
pub mod reconcile;
pub mod search;
pub mod usage;

pub use list::{list_entities, next_id, StateFilter};
pub use reconcile::{Reconciler, RunReport};
pub use search::SearchBatches;
pub use usage::unused;

use crate::error::{OpsError, OpsResult, StoreError};
use crate::model::{Entity, EntityKind};
use crate::store::{AttrQuery, EntityStore};

/// An empty kind selection means the caller wants every kind.
pub(crate) fn resolve_kinds(requested: &[EntityKind]) -> &[EntityKind] {
    if requested.is_empty() {
        EntityKind::all()
    } else {
        requested
    }
}

/// The query selecting entities whose state equals `state` exactly.
pub(crate) fn state_query(state: &str) -> AttrQuery {
    AttrQuery::from([("state".to_string(), format!("^{state}$"))])
}

/// Find an entity by id alone, probing every kind. Ids carry their kind
/// prefix, so at most one kind can hold a given id.
pub async fn find_entity(store: &dyn EntityStore, id: &str) -> OpsResult<Entity> {
    for kind in EntityKind::all() {
        match store.get(*kind, id).await {
            Ok(entity) => return Ok(entity),
            Err(StoreError::NotFound(_)) => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Err(OpsError::no_matches(&[]))
}

/// Write one entity straight through to the committed store.
pub async fn add_entity(store: &dyn EntityStore, entity: Entity) -> OpsResult<()> {
    store.add(entity).await?;
    store.commit().await?;
    Ok(())
}
