//! Entity kinds authored by the operators rather than observed through a
//! provider. These records never arrive through reconciliation; they enter
//! the store directly and rely on the merge-patch rule to survive it.

use std::fmt;

use serde::{Deserialize, Serialize};

use super::state::EntityState;

/// How widely a service is exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServiceAccess {
    Public,
    Internal,
    #[default]
    Unknown,
}

impl fmt::Display for ServiceAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ServiceAccess::Public => "public",
            ServiceAccess::Internal => "internal",
            ServiceAccess::Unknown => "unknown",
        };
        write!(f, "{name}")
    }
}

/// The logical environment a service runs in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    Production,
    Staging,
    Testing,
    Ephemeral,
}

impl fmt::Display for Environment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Environment::Production => "production",
            Environment::Staging => "staging",
            Environment::Testing => "testing",
            Environment::Ephemeral => "ephemeral",
        };
        write!(f, "{name}")
    }
}

/// An aggregation of resources presenting one utility to its users.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Service {
    /// Curated id, `ser_` followed by a numeric suffix.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub access: ServiceAccess,
    #[serde(default)]
    pub environment: Option<Environment>,
    /// Authentication methods required to reach the service.
    #[serde(default)]
    pub authentication: Vec<String>,
    /// Person id of whoever answers for the service.
    #[serde(default)]
    pub responsible: Option<String>,
    /// Information ids the service handles.
    #[serde(default)]
    pub informations: Vec<String>,
    /// Service ids this service depends on.
    #[serde(default)]
    pub dependencies: Vec<String>,
    /// Cloud resource ids backing the service.
    #[serde(default)]
    pub resources: Vec<String>,
    /// Person ids with access to the service.
    #[serde(default)]
    pub users: Vec<String>,
}

impl Service {
    pub fn reference_ids(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        refs.extend(self.responsible.as_deref());
        refs.extend(self.informations.iter().map(String::as_str));
        refs.extend(self.dependencies.iter().map(String::as_str));
        refs.extend(self.resources.iter().map(String::as_str));
        refs.extend(self.users.iter().map(String::as_str));
        refs
    }
}

/// The reason a group of services and informations exists. Projects are
/// top-level records; nothing references a project, so the usage analyzer
/// never treats them as candidates.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Project {
    /// Curated id, `pro_` followed by a numeric suffix.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    /// Alternative names the project goes by.
    #[serde(default)]
    pub aliases: Vec<String>,
    /// Person id of whoever answers for the project.
    #[serde(default)]
    pub responsible: Option<String>,
    #[serde(default)]
    pub services: Vec<String>,
    #[serde(default)]
    pub informations: Vec<String>,
    /// Person ids working on the project.
    #[serde(default)]
    pub people: Vec<String>,
}

impl Project {
    pub fn reference_ids(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = Vec::new();
        refs.extend(self.responsible.as_deref());
        refs.extend(self.services.iter().map(String::as_str));
        refs.extend(self.informations.iter().map(String::as_str));
        refs.extend(self.people.iter().map(String::as_str));
        refs
    }
}

/// A piece of data a service or project handles. Information records have
/// no outgoing edges; `responsible` is a free text legal owner, not a
/// reference into the inventory.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Information {
    /// Curated id, `info_` followed by a numeric suffix.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    /// Whether the data falls under personal data regulation.
    #[serde(default)]
    pub personal_data: bool,
    #[serde(default)]
    pub responsible: Option<String>,
}

impl Information {
    pub fn reference_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// A member of the team.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Person {
    /// Curated id, `peo_` followed by a numeric suffix.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    /// Id of the person's IAM user, when they have one.
    #[serde(default)]
    pub iam_user: Option<String>,
}

impl Person {
    pub fn reference_ids(&self) -> Vec<&str> {
        self.iam_user.as_deref().into_iter().collect()
    }
}
