//! Reconciliation engine.
//!
//! Drives every configured source once, folds the resulting updates into
//! the store as merge patches, and publishes the whole run as a single
//! commit. A failing source never aborts the run and never causes
//! terminations for the kinds it failed to observe; that is the source's
//! own contract to uphold.

use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::attrs;
use crate::error::{OpsResult, StoreError};
use crate::model::{Entity, EntityKind, EntityUpdate};
use crate::source::Source;
use crate::store::EntityStore;

use super::{resolve_kinds, state_query};

/// Outcome of one reconciliation run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    /// When the run started.
    pub started_at: DateTime<Utc>,
    /// Wall clock duration of the run.
    pub duration_ms: u64,
    /// Entities created or refreshed from source observations.
    pub upserted: usize,
    /// Active entities marked terminated because a source stopped seeing them.
    pub terminated: usize,
    /// Updates dropped because they did not produce a valid entity.
    pub skipped: usize,
    /// Sources that failed outright and contributed nothing.
    pub source_errors: usize,
}

impl RunReport {
    pub fn total_changes(&self) -> usize {
        self.upserted + self.terminated
    }

    /// Whether every source reported and every update applied.
    pub fn is_clean(&self) -> bool {
        self.skipped == 0 && self.source_errors == 0
    }
}

/// Reconciles the store against a fixed set of sources.
pub struct Reconciler {
    sources: Vec<Arc<dyn Source>>,
}

impl Reconciler {
    pub fn new(sources: Vec<Arc<dyn Source>>) -> Self {
        Self { sources }
    }

    /// Run one reconciliation pass over the requested kinds. An empty slice
    /// reconciles every kind. All staged writes become visible in one
    /// commit at the end, so readers never observe a half-applied run.
    pub async fn run(
        &self,
        store: &dyn EntityStore,
        kinds: &[EntityKind],
    ) -> OpsResult<RunReport> {
        let started_at = Utc::now();
        let clock = Instant::now();
        let kinds = resolve_kinds(kinds);

        // The active snapshot covers the requested kinds; each source
        // narrows it further to the kinds it observes when deciding what
        // has disappeared.
        let active = match store.search(kinds, &state_query("active")).await {
            Ok(entities) => entities,
            Err(StoreError::NotFound(_)) => Vec::new(),
            Err(e) => return Err(e.into()),
        };
        info!(kinds = kinds.len(), active = active.len(), "Starting reconciliation");

        let mut report = RunReport {
            started_at,
            duration_ms: 0,
            upserted: 0,
            terminated: 0,
            skipped: 0,
            source_errors: 0,
        };

        for source in &self.sources {
            let updates = match source.update(kinds, active.clone()).await {
                Ok(updates) => updates,
                Err(e) => {
                    warn!(source = source.name(), error = %e, "Source update failed");
                    report.source_errors += 1;
                    continue;
                }
            };
            info!(source = source.name(), updates = updates.len(), "Applying updates");
            for update in updates {
                self.apply(store, update, &mut report).await?;
            }
        }

        store.commit().await?;
        report.duration_ms = clock.elapsed().as_millis() as u64;
        info!(
            upserted = report.upserted,
            terminated = report.terminated,
            skipped = report.skipped,
            source_errors = report.source_errors,
            duration_ms = report.duration_ms,
            "Reconciliation finished"
        );
        Ok(report)
    }

    /// Merge one update over the saved attributes and stage the result.
    /// Updates that do not produce a valid entity are logged and dropped;
    /// one bad record must not sink the rest of the run.
    async fn apply(
        &self,
        store: &dyn EntityStore,
        update: EntityUpdate,
        report: &mut RunReport,
    ) -> OpsResult<()> {
        let Some(id) = update.id().map(str::to_string) else {
            warn!(kind = %update.kind, "Skipping update without an id");
            report.skipped += 1;
            return Ok(());
        };

        let previous = match store.get(update.kind, &id).await {
            Ok(entity) => Some(entity),
            Err(StoreError::NotFound(_)) => None,
            Err(e) => return Err(e.into()),
        };
        let merged = match &previous {
            Some(entity) => attrs::merge(&entity.to_attrs()?, &update.attrs),
            None => update.attrs.clone(),
        };

        match Entity::from_attrs(update.kind, &merged) {
            Ok(entity) => {
                let was_live = previous
                    .as_ref()
                    .is_some_and(|p| !p.state().is_terminated());
                if entity.state().is_terminated() && was_live {
                    report.terminated += 1;
                } else {
                    report.upserted += 1;
                }
                store.add(entity).await?;
            }
            Err(e) => {
                warn!(kind = %update.kind, id = %id, error = %e, "Skipping invalid update");
                report.skipped += 1;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::attrs::EntityAttrs;
    use crate::source::{SourceError, SourceResult};
    use crate::store::InMemoryStore;
    use async_trait::async_trait;
    use serde_json::json;
    use tokio::sync::Mutex;

    fn entity(kind: EntityKind, value: serde_json::Value) -> Entity {
        let attrs: EntityAttrs = serde_json::from_value(value).unwrap();
        Entity::from_attrs(kind, &attrs).unwrap()
    }

    fn update(kind: EntityKind, value: serde_json::Value) -> EntityUpdate {
        let attrs: EntityAttrs = serde_json::from_value(value).unwrap();
        EntityUpdate::new(kind, attrs)
    }

    /// Source that replays a fixed result and records what it was asked.
    struct ScriptedSource {
        result: SourceResult<Vec<EntityUpdate>>,
        seen_active: Mutex<Vec<String>>,
    }

    impl ScriptedSource {
        fn ok(updates: Vec<EntityUpdate>) -> Self {
            Self {
                result: Ok(updates),
                seen_active: Mutex::new(Vec::new()),
            }
        }

        fn failing() -> Self {
            Self {
                result: Err(SourceError::ConnectionFailed("refused".to_string())),
                seen_active: Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Source for ScriptedSource {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn update(
            &self,
            _kinds: &[EntityKind],
            active: Vec<Entity>,
        ) -> SourceResult<Vec<EntityUpdate>> {
            let mut seen = self.seen_active.lock().await;
            *seen = active.iter().map(|e| e.id().to_string()).collect();
            self.result.clone()
        }
    }

    #[tokio::test]
    async fn test_new_entities_are_upserted_and_committed() {
        let store = InMemoryStore::new();
        let source = Arc::new(ScriptedSource::ok(vec![update(
            EntityKind::Compute,
            json!({"id": "i-abc123", "name": "api-1", "state": "active"}),
        )]));
        let reconciler = Reconciler::new(vec![source]);

        let report = reconciler.run(&store, &[]).await.unwrap();

        assert_eq!(report.upserted, 1);
        assert_eq!(report.terminated, 0);
        assert!(report.is_clean());
        let fetched = store.get(EntityKind::Compute, "i-abc123").await.unwrap();
        assert_eq!(fetched.name(), Some("api-1"));
    }

    #[tokio::test]
    async fn test_updates_merge_over_saved_attributes() {
        let store = InMemoryStore::with_entities([entity(
            EntityKind::Compute,
            json!({
                "id": "i-abc123",
                "name": "api-1",
                "state": "active",
                "description": "provisioned by hand",
            }),
        )])
        .await;
        // The source never observes descriptions, so the update omits it.
        let source = Arc::new(ScriptedSource::ok(vec![update(
            EntityKind::Compute,
            json!({"id": "i-abc123", "name": "api-1-renamed", "state": "active"}),
        )]));
        let reconciler = Reconciler::new(vec![source]);

        reconciler.run(&store, &[]).await.unwrap();

        let fetched = store.get(EntityKind::Compute, "i-abc123").await.unwrap();
        assert_eq!(fetched.name(), Some("api-1-renamed"));
        assert_eq!(fetched.description(), Some("provisioned by hand"));
    }

    #[tokio::test]
    async fn test_terminations_are_counted_and_preserve_attributes() {
        let saved = entity(
            EntityKind::Compute,
            json!({
                "id": "i-abc123",
                "state": "active",
                "description": "kept for the audit trail",
            }),
        );
        let store = InMemoryStore::with_entities([saved.clone()]).await;
        let source = Arc::new(ScriptedSource::ok(vec![
            EntityUpdate::terminating(&saved).unwrap(),
        ]));
        let reconciler = Reconciler::new(vec![source]);

        let report = reconciler.run(&store, &[]).await.unwrap();

        assert_eq!(report.terminated, 1);
        assert_eq!(report.upserted, 0);
        let fetched = store.get(EntityKind::Compute, "i-abc123").await.unwrap();
        assert!(fetched.state().is_terminated());
        assert_eq!(fetched.description(), Some("kept for the audit trail"));
    }

    #[tokio::test]
    async fn test_sources_receive_the_active_snapshot() {
        let store = InMemoryStore::with_entities([
            entity(EntityKind::Compute, json!({"id": "i-abc123", "state": "active"})),
            entity(EntityKind::Compute, json!({"id": "i-old999", "state": "terminated"})),
        ])
        .await;
        let source = Arc::new(ScriptedSource::ok(Vec::new()));
        let reconciler = Reconciler::new(vec![Arc::clone(&source) as Arc<dyn Source>]);

        reconciler.run(&store, &[]).await.unwrap();

        let seen = source.seen_active.lock().await;
        assert_eq!(*seen, vec!["i-abc123".to_string()]);
    }

    #[tokio::test]
    async fn test_failed_source_leaves_store_untouched() {
        let store = InMemoryStore::with_entities([entity(
            EntityKind::Compute,
            json!({"id": "i-abc123", "state": "active"}),
        )])
        .await;
        let reconciler = Reconciler::new(vec![Arc::new(ScriptedSource::failing())]);

        let report = reconciler.run(&store, &[]).await.unwrap();

        assert_eq!(report.source_errors, 1);
        assert_eq!(report.total_changes(), 0);
        assert!(!report.is_clean());
        let fetched = store.get(EntityKind::Compute, "i-abc123").await.unwrap();
        assert_eq!(fetched.state(), crate::model::EntityState::Active);
    }

    #[tokio::test]
    async fn test_invalid_updates_are_skipped_not_fatal() {
        let store = InMemoryStore::new();
        let source = Arc::new(ScriptedSource::ok(vec![
            update(EntityKind::Compute, json!({"id": "not-an-instance", "state": "active"})),
            update(EntityKind::Compute, json!({"id": "i-abc123", "state": "active"})),
        ]));
        let reconciler = Reconciler::new(vec![source]);

        let report = reconciler.run(&store, &[]).await.unwrap();

        assert_eq!(report.skipped, 1);
        assert_eq!(report.upserted, 1);
        assert!(store.get(EntityKind::Compute, "i-abc123").await.is_ok());
    }

    #[tokio::test]
    async fn test_rerunning_the_same_updates_converges() {
        let store = InMemoryStore::new();
        let source = Arc::new(ScriptedSource::ok(vec![update(
            EntityKind::Service,
            json!({"id": "ser_001", "name": "billing", "state": "active"}),
        )]));
        let reconciler = Reconciler::new(vec![source]);

        reconciler.run(&store, &[]).await.unwrap();
        let first = store.snapshot().await;
        reconciler.run(&store, &[]).await.unwrap();
        let second = store.snapshot().await;

        assert_eq!(first, second);
    }
}
