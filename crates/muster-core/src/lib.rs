//! # muster-core
//!
//! Core model, storage, and operations for the muster inventory.
//!
//! This crate provides the entity model, the store trait with its file and
//! in-memory backends, the reconciliation engine that folds source
//! observations into the store, and the read-side operations (listing,
//! search, usage analysis).

pub mod attrs;
pub mod error;
pub mod model;
pub mod ops;
pub mod source;
pub mod store;

pub use attrs::EntityAttrs;
pub use error::{ModelError, ModelResult, OpsError, OpsResult, StoreError, StoreResult};
pub use model::{Entity, EntityKind, EntityState, EntityUpdate};
pub use ops::{
    add_entity, find_entity, list_entities, next_id, unused, Reconciler, RunReport, SearchBatches,
    StateFilter,
};
pub use source::{Source, SourceError, SourceResult};
pub use store::{AttrQuery, EntityStore, FileStore, InMemoryStore};
