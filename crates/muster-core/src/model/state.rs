//! Universal entity lifecycle states.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// The lifecycle state every tracked entity carries.
///
/// Providers report their own state vocabulary; source adapters normalize
/// the known values (`running` and `available` become `active`) and pass
/// everything else through, where it fails validation at construction time.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityState {
    /// The entity exists and is in service.
    Active,
    /// The entity is being created.
    Pending,
    /// The entity exists but is not running.
    Stopped,
    /// The entity was expected in a listing and was not observed. Never
    /// deleted, only marked.
    Terminated,
    /// Placeholder for curated records whose state nobody has decided yet.
    #[default]
    Unknown,
}

impl EntityState {
    pub fn is_terminated(self) -> bool {
        self == EntityState::Terminated
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EntityState::Active => "active",
            EntityState::Pending => "pending",
            EntityState::Stopped => "stopped",
            EntityState::Terminated => "terminated",
            EntityState::Unknown => "unknown",
        }
    }
}

impl fmt::Display for EntityState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for EntityState {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "active" => Ok(EntityState::Active),
            "pending" => Ok(EntityState::Pending),
            "stopped" => Ok(EntityState::Stopped),
            "terminated" => Ok(EntityState::Terminated),
            "unknown" => Ok(EntityState::Unknown),
            other => Err(ModelError::InvalidState(other.to_string())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_roundtrip() {
        for state in [
            EntityState::Active,
            EntityState::Pending,
            EntityState::Stopped,
            EntityState::Terminated,
            EntityState::Unknown,
        ] {
            assert_eq!(state.as_str().parse::<EntityState>().unwrap(), state);
        }
    }

    #[test]
    fn test_parse_rejects_provider_literals() {
        let error = "shutting-down".parse::<EntityState>().unwrap_err();
        assert!(matches!(error, ModelError::InvalidState(s) if s == "shutting-down"));
    }

    #[test]
    fn test_serde_names() {
        assert_eq!(
            serde_json::to_string(&EntityState::Terminated).unwrap(),
            "\"terminated\""
        );
        let state: EntityState = serde_json::from_str("\"unknown\"").unwrap();
        assert_eq!(state, EntityState::Unknown);
    }
}
