//! Source adapter interface.
//!
//! A source observes some system of record (a cloud provider, a curated
//! registry) and reports the updates the inventory needs to converge on it.
//! The reconciliation engine consumes sources through this trait only.

use async_trait::async_trait;
use thiserror::Error;

use crate::model::{Entity, EntityKind, EntityUpdate};

/// Errors that can occur while a source gathers updates.
#[derive(Error, Debug, Clone)]
pub enum SourceError {
    #[error("Authentication failed: {0}")]
    AuthenticationFailed(String),

    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    #[error("Request failed: {0}")]
    RequestFailed(String),

    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type for source operations.
pub type SourceResult<T> = Result<T, SourceError>;

/// Trait implemented by every system the inventory reconciles against.
#[async_trait]
pub trait Source: Send + Sync {
    /// Returns the source name, used in logs and run reports.
    fn name(&self) -> &str;

    /// Gather the updates for the requested kinds.
    ///
    /// `active` is the snapshot of currently active entities; the source
    /// compares it against what it observes and emits an upsert for every
    /// observed entity plus a termination for every active entity of an
    /// observed kind that has disappeared. Kinds the source does not cover,
    /// or could not fully observe, produce no updates at all.
    async fn update(
        &self,
        kinds: &[EntityKind],
        active: Vec<Entity>,
    ) -> SourceResult<Vec<EntityUpdate>>;
}
