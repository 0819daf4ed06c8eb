//! Multi-kind regex search, delivered in per-attribute batches.

use std::collections::{HashSet, VecDeque};

use tracing::debug;

use crate::error::{OpsError, OpsResult, StoreError};
use crate::model::{Entity, EntityKind};
use crate::store::{AttrQuery, EntityStore};

use super::list::StateFilter;
use super::resolve_kinds;

/// A search in progress. Each call to [`SearchBatches::next_batch`] probes
/// the next searchable attribute across every requested kind and returns
/// the entities that matched there for the first time, so callers can show
/// results as they arrive instead of waiting for the full sweep.
pub struct SearchBatches<'a> {
    store: &'a dyn EntityStore,
    regexp: String,
    requested: Vec<EntityKind>,
    resolved: Vec<EntityKind>,
    filter: StateFilter,
    attributes: VecDeque<&'static str>,
    seen: HashSet<(EntityKind, String)>,
    matched_any: bool,
    done: bool,
}

impl<'a> SearchBatches<'a> {
    /// Start a search for `regexp` over the requested kinds. An empty kind
    /// slice searches everything.
    pub fn new(
        store: &'a dyn EntityStore,
        regexp: impl Into<String>,
        kinds: &[EntityKind],
        filter: StateFilter,
    ) -> Self {
        let resolved = resolve_kinds(kinds).to_vec();
        // One probe per attribute name, in the order the kinds declare
        // them. Attributes shared between kinds are probed once.
        let mut attributes = VecDeque::new();
        let mut declared = HashSet::new();
        for kind in &resolved {
            for attribute in kind.searchable_attributes() {
                if declared.insert(*attribute) {
                    attributes.push_back(*attribute);
                }
            }
        }
        Self {
            store,
            regexp: regexp.into(),
            requested: kinds.to_vec(),
            resolved,
            filter,
            attributes,
            seen: HashSet::new(),
            matched_any: false,
            done: false,
        }
    }

    /// The next non-empty batch of fresh matches, `Ok(None)` once every
    /// attribute has been probed. A search that never matched anything ends
    /// with the no-match error instead. The search cannot be restarted.
    pub async fn next_batch(&mut self) -> OpsResult<Option<Vec<Entity>>> {
        while let Some(attribute) = self.attributes.pop_front() {
            let query = AttrQuery::from([(attribute.to_string(), self.regexp.clone())]);
            let found = match self.store.search(&self.resolved, &query).await {
                Ok(entities) => entities,
                Err(StoreError::NotFound(_)) => continue,
                Err(e) => return Err(e.into()),
            };
            let batch: Vec<Entity> = found
                .into_iter()
                .filter(|entity| self.filter.admits(entity.state()))
                .filter(|entity| {
                    self.seen
                        .insert((entity.kind(), entity.id().to_string()))
                })
                .collect();
            if !batch.is_empty() {
                debug!(attribute, matches = batch.len(), "Search batch ready");
                self.matched_any = true;
                return Ok(Some(batch));
            }
        }
        if self.done {
            return Ok(None);
        }
        self.done = true;
        if self.matched_any {
            Ok(None)
        } else {
            Err(OpsError::no_matches(&self.requested))
        }
    }
}
