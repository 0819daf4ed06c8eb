//! Error types shared across the inventory core.

use thiserror::Error;

use crate::model::EntityKind;

/// Errors raised while building or validating entities.
#[derive(Debug, Error)]
pub enum ModelError {
    /// The id does not match the format required by the concrete kind.
    #[error("Invalid identifier '{id}' for kind {kind}")]
    InvalidIdentifier { kind: EntityKind, id: String },

    /// The state is not one of the universal lifecycle states.
    #[error("Invalid entity state '{0}'")]
    InvalidState(String),

    /// The kind tag is not part of the registry.
    #[error("Unknown entity kind '{0}'")]
    UnknownKind(String),

    /// The attribute mapping does not deserialize into the concrete kind.
    #[error("Malformed entity attributes: {0}")]
    Malformed(#[from] serde_json::Error),
}

pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised by entity store implementations.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A lookup found nothing, or a search matched nothing.
    #[error("Not found: {0}")]
    NotFound(String),

    /// A search query contained an expression the store cannot compile.
    #[error("Invalid query: {0}")]
    InvalidQuery(String),

    /// The backing file could not be read or written.
    #[error("Storage error: {0}")]
    Io(#[from] std::io::Error),

    /// Persisted state could not be encoded or decoded.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Errors surfaced by the inventory operations to their callers.
#[derive(Debug, Error)]
pub enum OpsError {
    /// Nothing matched a list or search across every requested kind.
    #[error("There are no entities in the inventory that match the criteria.")]
    NoMatches,

    /// Nothing matched within an explicit set of requested kinds.
    #[error("There are no entities of kind {0} in the inventory that match the criteria.")]
    NoMatchesOfKind(String),

    /// The kind's ids are synthesized by the provider, not generated locally.
    #[error("Ids of kind {0} are assigned by the provider")]
    ProviderAssignedIds(EntityKind),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Model(#[from] ModelError),
}

pub type OpsResult<T> = Result<T, OpsError>;

impl OpsError {
    /// Build the no-match error for the kinds the caller asked for. An empty
    /// slice means the caller did not restrict kinds at all, which gets the
    /// generic message.
    pub fn no_matches(requested: &[EntityKind]) -> Self {
        if requested.is_empty() {
            OpsError::NoMatches
        } else {
            let kinds = requested
                .iter()
                .map(|kind| kind.tag())
                .collect::<Vec<_>>()
                .join(", ");
            OpsError::NoMatchesOfKind(kinds)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_no_matches_message_without_kinds() {
        let error = OpsError::no_matches(&[]);
        assert_eq!(
            error.to_string(),
            "There are no entities in the inventory that match the criteria."
        );
    }

    #[test]
    fn test_no_matches_message_with_kinds() {
        let error = OpsError::no_matches(&[EntityKind::Compute, EntityKind::Service]);
        assert_eq!(
            error.to_string(),
            "There are no entities of kind compute, ser in the inventory that match the criteria."
        );
    }
}
