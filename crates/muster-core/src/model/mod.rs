//! The entity model: one closed sum type over every concrete kind, plus the
//! ephemeral update value that sources hand to the reconciliation engine.

mod cloud;
mod curated;
mod kind;
mod state;

pub use cloud::{
    Bucket, ComputeInstance, Database, DnsRecord, IamGroup, IamUser, Network, ScalingGroup,
    SecurityGroup, SecurityGroupRule,
};
pub use curated::{Environment, Information, Person, Project, Service, ServiceAccess};
pub use kind::EntityKind;
pub use state::EntityState;

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::attrs::{self, EntityAttrs};
use crate::error::ModelResult;

/// Run one expression against the concrete struct inside an [`Entity`].
macro_rules! dispatch {
    ($entity:expr, $inner:ident => $body:expr) => {
        match $entity {
            Entity::ScalingGroup($inner) => $body,
            Entity::Bucket($inner) => $body,
            Entity::Compute($inner) => $body,
            Entity::Database($inner) => $body,
            Entity::DnsRecord($inner) => $body,
            Entity::IamGroup($inner) => $body,
            Entity::IamUser($inner) => $body,
            Entity::Information($inner) => $body,
            Entity::Network($inner) => $body,
            Entity::Person($inner) => $body,
            Entity::Project($inner) => $body,
            Entity::Service($inner) => $body,
            Entity::SecurityGroup($inner) => $body,
        }
    };
}

/// A typed, identified record representing one tracked asset or curated
/// fact. Persisted as a single object tagged with the kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Entity {
    #[serde(rename = "asg")]
    ScalingGroup(ScalingGroup),
    #[serde(rename = "bkt")]
    Bucket(Bucket),
    #[serde(rename = "compute")]
    Compute(ComputeInstance),
    #[serde(rename = "db")]
    Database(Database),
    #[serde(rename = "dns")]
    DnsRecord(DnsRecord),
    #[serde(rename = "iamg")]
    IamGroup(IamGroup),
    #[serde(rename = "iamu")]
    IamUser(IamUser),
    #[serde(rename = "info")]
    Information(Information),
    #[serde(rename = "net")]
    Network(Network),
    #[serde(rename = "peo")]
    Person(Person),
    #[serde(rename = "pro")]
    Project(Project),
    #[serde(rename = "ser")]
    Service(Service),
    #[serde(rename = "sg")]
    SecurityGroup(SecurityGroup),
}

impl Entity {
    /// Build an entity of the given kind from a flat attribute mapping.
    ///
    /// The id format and the state literal are validated before the mapping
    /// is deserialized, so the caller can tell an invalid identifier or
    /// state apart from a structurally malformed mapping.
    pub fn from_attrs(kind: EntityKind, attributes: &EntityAttrs) -> ModelResult<Entity> {
        let id = attrs::get_str(attributes, "id").unwrap_or_default();
        kind.validate_id(id)?;
        if let Some(state) = attrs::get_str(attributes, "state") {
            state.parse::<EntityState>()?;
        }

        let value = Value::Object(attributes.clone());
        let entity = match kind {
            EntityKind::ScalingGroup => Entity::ScalingGroup(serde_json::from_value(value)?),
            EntityKind::Bucket => Entity::Bucket(serde_json::from_value(value)?),
            EntityKind::Compute => Entity::Compute(serde_json::from_value(value)?),
            EntityKind::Database => Entity::Database(serde_json::from_value(value)?),
            EntityKind::DnsRecord => Entity::DnsRecord(serde_json::from_value(value)?),
            EntityKind::IamGroup => Entity::IamGroup(serde_json::from_value(value)?),
            EntityKind::IamUser => Entity::IamUser(serde_json::from_value(value)?),
            EntityKind::Information => Entity::Information(serde_json::from_value(value)?),
            EntityKind::Network => Entity::Network(serde_json::from_value(value)?),
            EntityKind::Person => Entity::Person(serde_json::from_value(value)?),
            EntityKind::Project => Entity::Project(serde_json::from_value(value)?),
            EntityKind::Service => Entity::Service(serde_json::from_value(value)?),
            EntityKind::SecurityGroup => Entity::SecurityGroup(serde_json::from_value(value)?),
        };
        Ok(entity)
    }

    /// Flatten the entity back into an attribute mapping, without the kind
    /// tag. The inverse of [`Entity::from_attrs`] up to default fields.
    pub fn to_attrs(&self) -> ModelResult<EntityAttrs> {
        let value = serde_json::to_value(self)?;
        let mut attributes: EntityAttrs = serde_json::from_value(value)?;
        attributes.remove("kind");
        Ok(attributes)
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::ScalingGroup(_) => EntityKind::ScalingGroup,
            Entity::Bucket(_) => EntityKind::Bucket,
            Entity::Compute(_) => EntityKind::Compute,
            Entity::Database(_) => EntityKind::Database,
            Entity::DnsRecord(_) => EntityKind::DnsRecord,
            Entity::IamGroup(_) => EntityKind::IamGroup,
            Entity::IamUser(_) => EntityKind::IamUser,
            Entity::Information(_) => EntityKind::Information,
            Entity::Network(_) => EntityKind::Network,
            Entity::Person(_) => EntityKind::Person,
            Entity::Project(_) => EntityKind::Project,
            Entity::Service(_) => EntityKind::Service,
            Entity::SecurityGroup(_) => EntityKind::SecurityGroup,
        }
    }

    pub fn id(&self) -> &str {
        dispatch!(self, inner => &inner.id)
    }

    pub fn name(&self) -> Option<&str> {
        dispatch!(self, inner => inner.name.as_deref())
    }

    pub fn state(&self) -> EntityState {
        dispatch!(self, inner => inner.state)
    }

    pub fn description(&self) -> Option<&str> {
        dispatch!(self, inner => inner.description.as_deref())
    }

    /// Every id this entity references, reference-valued attribute by
    /// reference-valued attribute. Kinds without outgoing edges return
    /// nothing.
    pub fn reference_ids(&self) -> Vec<&str> {
        dispatch!(self, inner => inner.reference_ids())
    }

    /// The subset of `candidates` this entity uses: single reference fields
    /// compared by equality, list-valued ones by membership. Relationships
    /// are directed; only the dependent side declares them.
    pub fn uses(&self, candidates: &HashSet<String>) -> HashSet<String> {
        self.reference_ids()
            .into_iter()
            .filter(|id| candidates.contains(*id))
            .map(str::to_string)
            .collect()
    }
}

/// An ephemeral "this entity should now look like this" value. Created by a
/// source adapter, consumed exactly once by the reconciliation engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityUpdate {
    pub kind: EntityKind,
    pub attrs: EntityAttrs,
}

impl EntityUpdate {
    pub fn new(kind: EntityKind, attrs: EntityAttrs) -> Self {
        Self { kind, attrs }
    }

    /// Synthesize the termination update for an entity that was expected in
    /// a listing and not observed: every known attribute preserved, state
    /// forced to `terminated`.
    pub fn terminating(entity: &Entity) -> ModelResult<Self> {
        let mut attrs = entity.to_attrs()?;
        attrs.insert(
            "state".to_string(),
            Value::String(EntityState::Terminated.to_string()),
        );
        Ok(Self::new(entity.kind(), attrs))
    }

    /// The id carried in the attribute mapping, when present.
    pub fn id(&self) -> Option<&str> {
        attrs::get_str(&self.attrs, "id")
    }
}
