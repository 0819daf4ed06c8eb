//! Entity storage.
//!
//! Provides the storage trait plus the in-memory and file-backed
//! implementations. Writes are staged through [`EntityStore::add`] and stay
//! invisible to readers until [`EntityStore::commit`] publishes them as one
//! batch.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::InMemoryStore;

use std::collections::HashMap;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::error::{StoreError, StoreResult};
use crate::model::{Entity, EntityKind};

/// A search query: attribute name to regular expression, combined with AND.
pub type AttrQuery = HashMap<String, String>;

/// Trait for persisting and querying inventory entities.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Stage an entity write, keyed by kind and id. A second write to the
    /// same key before commit replaces the first. Staged writes are not
    /// visible to any read until [`EntityStore::commit`].
    async fn add(&self, entity: Entity) -> StoreResult<()>;

    /// Publish every staged write at once and persist the result.
    async fn commit(&self) -> StoreResult<()>;

    /// Fetch one committed entity by kind and id.
    ///
    /// Returns [`StoreError::NotFound`] when the id is not in the store.
    async fn get(&self, kind: EntityKind, id: &str) -> StoreResult<Entity>;

    /// Every committed entity of the given kinds, ordered by kind tag then
    /// id. An empty slice means every kind.
    async fn all(&self, kinds: &[EntityKind]) -> StoreResult<Vec<Entity>>;

    /// Committed entities of the given kinds whose attributes match every
    /// expression in the query. An empty slice means every kind.
    ///
    /// Returns [`StoreError::NotFound`] when nothing matches and
    /// [`StoreError::InvalidQuery`] when an expression does not compile.
    async fn search(&self, kinds: &[EntityKind], query: &AttrQuery) -> StoreResult<Vec<Entity>>;
}

/// Compile every query expression up front so one bad pattern fails the
/// whole search instead of silently matching nothing.
pub(crate) fn compile_query(query: &AttrQuery) -> StoreResult<Vec<(String, Regex)>> {
    let mut compiled = Vec::with_capacity(query.len());
    for (attribute, pattern) in query {
        let regex = Regex::new(pattern)
            .map_err(|e| StoreError::InvalidQuery(format!("{attribute}: {e}")))?;
        compiled.push((attribute.clone(), regex));
    }
    Ok(compiled)
}

/// Whether the entity matches every compiled expression. Matching happens
/// over the entity's persisted attribute form.
pub(crate) fn matches_query(entity: &Entity, compiled: &[(String, Regex)]) -> StoreResult<bool> {
    let value = serde_json::to_value(entity)?;
    let Value::Object(attributes) = value else {
        return Ok(false);
    };
    Ok(compiled.iter().all(|(attribute, regex)| {
        attributes
            .get(attribute.as_str())
            .is_some_and(|value| value_matches(regex, value))
    }))
}

/// A string attribute matches directly, a list matches when any element
/// does, and scalars match against their JSON rendering. Unset attributes
/// never match.
fn value_matches(regex: &Regex, value: &Value) -> bool {
    match value {
        Value::String(text) => regex.is_match(text),
        Value::Array(items) => items.iter().any(|item| value_matches(regex, item)),
        Value::Null => false,
        other => regex.is_match(&other.to_string()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::EntityAttrs;
    use serde_json::json;

    fn entity(kind: EntityKind, value: Value) -> Entity {
        let attrs: EntityAttrs = serde_json::from_value(value).unwrap();
        Entity::from_attrs(kind, &attrs).unwrap()
    }

    fn query(pairs: &[(&str, &str)]) -> AttrQuery {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_string_attributes_match_by_regex() {
        let instance = entity(
            EntityKind::Compute,
            json!({"id": "i-abc123", "name": "api-production-1", "state": "active"}),
        );
        let compiled = compile_query(&query(&[("name", "production")])).unwrap();

        assert!(matches_query(&instance, &compiled).unwrap());
    }

    #[test]
    fn test_list_attributes_match_on_any_element() {
        let instance = entity(
            EntityKind::Compute,
            json!({
                "id": "i-abc123",
                "state": "active",
                "private_ips": ["10.0.0.5", "10.0.1.9"],
            }),
        );
        let compiled = compile_query(&query(&[("private_ips", r"10\.0\.1\.")])).unwrap();

        assert!(matches_query(&instance, &compiled).unwrap());
    }

    #[test]
    fn test_query_expressions_combine_with_and() {
        let instance = entity(
            EntityKind::Compute,
            json!({"id": "i-abc123", "name": "api-1", "state": "active"}),
        );
        let compiled = compile_query(&query(&[("name", "api"), ("state", "stopped")])).unwrap();

        assert!(!matches_query(&instance, &compiled).unwrap());
    }

    #[test]
    fn test_unset_attributes_never_match() {
        let instance = entity(
            EntityKind::Compute,
            json!({"id": "i-abc123", "state": "active"}),
        );
        let compiled = compile_query(&query(&[("name", ".*")])).unwrap();

        assert!(!matches_query(&instance, &compiled).unwrap());
    }

    #[test]
    fn test_scalar_attributes_match_their_rendering() {
        let information = entity(
            EntityKind::Information,
            json!({"id": "info_001", "state": "active", "personal_data": true}),
        );
        let compiled = compile_query(&query(&[("personal_data", "true")])).unwrap();

        assert!(matches_query(&information, &compiled).unwrap());
    }

    #[test]
    fn test_invalid_expression_is_rejected() {
        let error = compile_query(&query(&[("name", "[unclosed")])).unwrap_err();

        assert!(matches!(error, StoreError::InvalidQuery(_)));
    }
}
