//! Unused-entity analysis.

use std::collections::HashSet;

use tracing::debug;

use crate::error::{OpsResult, StoreError};
use crate::model::{Entity, EntityKind};
use crate::store::EntityStore;

use super::{resolve_kinds, state_query};

/// Kinds that sit at the top of the dependency graph. Nothing is expected
/// to reference them, so reporting them as unused would be noise.
const TOP_LEVEL_KINDS: [EntityKind; 2] = [EntityKind::Project, EntityKind::IamGroup];

/// Active entities of the requested kinds that no active entity references,
/// ordered by kind tag then id. An empty kind slice considers every kind.
/// Projects and IAM groups are never candidates, but their own references
/// still count. "Unused" means not directly referenced, not unreachable.
pub async fn unused(store: &dyn EntityStore, kinds: &[EntityKind]) -> OpsResult<Vec<Entity>> {
    let active = match store.search(&[], &state_query("active")).await {
        Ok(entities) => entities,
        Err(StoreError::NotFound(_)) => return Ok(Vec::new()),
        Err(e) => return Err(e.into()),
    };

    let requested = resolve_kinds(kinds);
    let mut candidates: HashSet<String> = active
        .iter()
        .filter(|entity| requested.contains(&entity.kind()))
        .filter(|entity| !TOP_LEVEL_KINDS.contains(&entity.kind()))
        .map(|entity| entity.id().to_string())
        .collect();

    for entity in &active {
        if candidates.is_empty() {
            break;
        }
        for id in entity.uses(&candidates) {
            candidates.remove(&id);
        }
    }
    debug!(active = active.len(), unused = candidates.len(), "Usage analysis done");

    // `active` came back in store order, so filtering keeps the result
    // ordered by kind tag then id.
    Ok(active
        .into_iter()
        .filter(|entity| candidates.contains(entity.id()))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::EntityAttrs;
    use crate::store::InMemoryStore;
    use serde_json::json;

    fn entity(kind: EntityKind, value: serde_json::Value) -> Entity {
        let attrs: EntityAttrs = serde_json::from_value(value).unwrap();
        Entity::from_attrs(kind, &attrs).unwrap()
    }

    #[tokio::test]
    async fn test_empty_inventory_has_nothing_unused() {
        let store = InMemoryStore::new();

        assert!(unused(&store, &[]).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_referenced_entities_are_not_reported() {
        let store = InMemoryStore::with_entities([
            entity(
                EntityKind::Service,
                json!({
                    "id": "ser_001",
                    "state": "active",
                    "resources": ["i-aaa111"],
                }),
            ),
            entity(EntityKind::Compute, json!({"id": "i-aaa111", "state": "active"})),
            entity(EntityKind::Compute, json!({"id": "i-bbb222", "state": "active"})),
        ])
        .await;

        let report = unused(&store, &[]).await.unwrap();

        let ids: Vec<&str> = report.iter().map(Entity::id).collect();
        assert_eq!(ids, vec!["i-bbb222", "ser_001"]);
    }

    #[tokio::test]
    async fn test_kind_restriction_narrows_candidates_only() {
        let store = InMemoryStore::with_entities([
            entity(
                EntityKind::Project,
                json!({
                    "id": "pro_001",
                    "state": "active",
                    "services": ["ser_001"],
                }),
            ),
            entity(EntityKind::Service, json!({"id": "ser_001", "state": "active"})),
            entity(EntityKind::Service, json!({"id": "ser_002", "state": "active"})),
            entity(EntityKind::Compute, json!({"id": "i-aaa111", "state": "active"})),
        ])
        .await;

        let report = unused(&store, &[EntityKind::Service]).await.unwrap();

        // The compute instance is outside the requested kinds, and the
        // project still shields ser_001.
        let ids: Vec<&str> = report.iter().map(Entity::id).collect();
        assert_eq!(ids, vec!["ser_002"]);
    }

    #[tokio::test]
    async fn test_references_from_terminated_entities_do_not_count() {
        let store = InMemoryStore::with_entities([
            entity(
                EntityKind::Service,
                json!({
                    "id": "ser_001",
                    "state": "terminated",
                    "resources": ["i-aaa111"],
                }),
            ),
            entity(EntityKind::Compute, json!({"id": "i-aaa111", "state": "active"})),
        ])
        .await;

        let report = unused(&store, &[]).await.unwrap();

        let ids: Vec<&str> = report.iter().map(Entity::id).collect();
        assert_eq!(ids, vec!["i-aaa111"]);
    }

    #[tokio::test]
    async fn test_top_level_kinds_are_never_candidates_but_their_edges_count() {
        let store = InMemoryStore::with_entities([
            entity(
                EntityKind::Project,
                json!({
                    "id": "pro_001",
                    "state": "active",
                    "services": ["ser_001"],
                }),
            ),
            entity(EntityKind::Service, json!({"id": "ser_001", "state": "active"})),
            entity(EntityKind::IamGroup, json!({"id": "iamg-admins", "state": "active"})),
        ])
        .await;

        let report = unused(&store, &[]).await.unwrap();

        // The project keeps its service out of the report, and neither the
        // project nor the group shows up as unused themselves.
        assert!(report.is_empty());
    }

    #[tokio::test]
    async fn test_chained_references_only_shield_direct_targets() {
        let store = InMemoryStore::with_entities([
            entity(
                EntityKind::Service,
                json!({
                    "id": "ser_001",
                    "state": "active",
                    "resources": ["i-aaa111"],
                }),
            ),
            entity(
                EntityKind::Compute,
                json!({
                    "id": "i-aaa111",
                    "state": "active",
                    "security_groups": ["sg-01"],
                }),
            ),
            entity(EntityKind::SecurityGroup, json!({"id": "sg-01", "state": "active"})),
        ])
        .await;

        let report = unused(&store, &[]).await.unwrap();

        let ids: Vec<&str> = report.iter().map(Entity::id).collect();
        assert_eq!(ids, vec!["ser_001"]);
    }
}
