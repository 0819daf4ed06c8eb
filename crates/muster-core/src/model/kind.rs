//! The closed registry of concrete entity kinds.
//!
//! Each kind carries a short CLI-facing tag, an id format predicate, and the
//! static list of attribute names the search engine may scan. Keeping these
//! tables here, rather than introspecting types at runtime, makes the set of
//! kinds and searchable attributes explicit and checkable.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::OnceLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Every concrete kind the inventory tracks.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize,
)]
pub enum EntityKind {
    #[serde(rename = "asg")]
    ScalingGroup,
    #[serde(rename = "bkt")]
    Bucket,
    #[serde(rename = "compute")]
    Compute,
    #[serde(rename = "db")]
    Database,
    #[serde(rename = "dns")]
    DnsRecord,
    #[serde(rename = "iamg")]
    IamGroup,
    #[serde(rename = "iamu")]
    IamUser,
    #[serde(rename = "info")]
    Information,
    #[serde(rename = "net")]
    Network,
    #[serde(rename = "peo")]
    Person,
    #[serde(rename = "pro")]
    Project,
    #[serde(rename = "ser")]
    Service,
    #[serde(rename = "sg")]
    SecurityGroup,
}

const ALL_KINDS: [EntityKind; 13] = [
    EntityKind::ScalingGroup,
    EntityKind::Bucket,
    EntityKind::Compute,
    EntityKind::Database,
    EntityKind::DnsRecord,
    EntityKind::IamGroup,
    EntityKind::IamUser,
    EntityKind::Information,
    EntityKind::Network,
    EntityKind::Person,
    EntityKind::Project,
    EntityKind::Service,
    EntityKind::SecurityGroup,
];

const CURATED_KINDS: [EntityKind; 4] = [
    EntityKind::Information,
    EntityKind::Person,
    EntityKind::Project,
    EntityKind::Service,
];

/// Id format per kind. Cloud ids come from the provider (or are synthesized
/// at the gateway boundary with the kind's prefix); curated ids are numeric
/// suffixes, zero-padded to at least three digits.
const ID_PATTERNS: [(EntityKind, &str); 13] = [
    (EntityKind::ScalingGroup, r"^asg-[0-9a-zA-Z][0-9a-zA-Z._-]*$"),
    (EntityKind::Bucket, r"^bkt-[0-9a-zA-Z][0-9a-zA-Z._-]*$"),
    (EntityKind::Compute, r"^i-[0-9a-zA-Z]+$"),
    (EntityKind::Database, r"^db-[0-9a-zA-Z]+$"),
    (
        EntityKind::DnsRecord,
        r"^zn-[0-9a-zA-Z]+:[0-9a-zA-Z.*_@-]+:[a-z]+$",
    ),
    (EntityKind::IamGroup, r"^iamg-[0-9a-z][0-9a-z._-]*$"),
    (EntityKind::IamUser, r"^iamu-[0-9a-z][0-9a-z._@-]*$"),
    (EntityKind::Information, r"^info_[0-9]{3,}$"),
    (EntityKind::Network, r"^net-[0-9a-zA-Z]+$"),
    (EntityKind::Person, r"^peo_[0-9]{3,}$"),
    (EntityKind::Project, r"^pro_[0-9]{3,}$"),
    (EntityKind::Service, r"^ser_[0-9]{3,}$"),
    (EntityKind::SecurityGroup, r"^sg-[0-9a-zA-Z]+$"),
];

fn id_patterns() -> &'static HashMap<EntityKind, Regex> {
    static PATTERNS: OnceLock<HashMap<EntityKind, Regex>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        ID_PATTERNS
            .iter()
            .map(|(kind, pattern)| {
                (*kind, Regex::new(pattern).expect("Invalid id pattern"))
            })
            .collect()
    })
}

impl EntityKind {
    /// All kinds, in tag order.
    pub fn all() -> &'static [EntityKind] {
        &ALL_KINDS
    }

    /// The kinds whose records are authored by humans rather than observed
    /// through a provider gateway.
    pub fn curated() -> &'static [EntityKind] {
        &CURATED_KINDS
    }

    pub fn is_curated(self) -> bool {
        CURATED_KINDS.contains(&self)
    }

    /// The short tag used on the command line and as the persisted kind tag.
    pub fn tag(self) -> &'static str {
        match self {
            EntityKind::ScalingGroup => "asg",
            EntityKind::Bucket => "bkt",
            EntityKind::Compute => "compute",
            EntityKind::Database => "db",
            EntityKind::DnsRecord => "dns",
            EntityKind::IamGroup => "iamg",
            EntityKind::IamUser => "iamu",
            EntityKind::Information => "info",
            EntityKind::Network => "net",
            EntityKind::Person => "peo",
            EntityKind::Project => "pro",
            EntityKind::Service => "ser",
            EntityKind::SecurityGroup => "sg",
        }
    }

    /// A human friendly name for views and log lines.
    pub fn display_name(self) -> &'static str {
        match self {
            EntityKind::ScalingGroup => "Scaling Group",
            EntityKind::Bucket => "Storage Bucket",
            EntityKind::Compute => "Compute Instance",
            EntityKind::Database => "Database",
            EntityKind::DnsRecord => "DNS Record",
            EntityKind::IamGroup => "IAM Group",
            EntityKind::IamUser => "IAM User",
            EntityKind::Information => "Information",
            EntityKind::Network => "Network",
            EntityKind::Person => "Person",
            EntityKind::Project => "Project",
            EntityKind::Service => "Service",
            EntityKind::SecurityGroup => "Security Group",
        }
    }

    /// Check an id against the kind's format predicate.
    pub fn validate_id(self, id: &str) -> Result<(), ModelError> {
        let pattern = &id_patterns()[&self];
        if pattern.is_match(id) {
            Ok(())
        } else {
            Err(ModelError::InvalidIdentifier {
                kind: self,
                id: id.to_string(),
            })
        }
    }

    /// The attribute names the search engine may scan for this kind, in
    /// declaration order. The common attributes come first for every kind.
    pub fn searchable_attributes(self) -> &'static [&'static str] {
        macro_rules! attrs {
            ($($extra:literal),* $(,)?) => {
                &["id", "name", "state", "description", $($extra),*]
            };
        }
        match self {
            EntityKind::ScalingGroup => attrs![
                "region",
                "min_size",
                "max_size",
                "desired_size",
                "availability_zones",
                "healthcheck",
                "instances",
            ],
            EntityKind::Bucket => attrs![
                "region",
                "created_at",
                "public_read",
                "public_write",
            ],
            EntityKind::Compute => attrs![
                "region",
                "size",
                "image",
                "created_at",
                "state_transition",
                "monitor",
                "private_ips",
                "public_ips",
                "security_groups",
                "subnet",
                "network",
            ],
            EntityKind::Database => attrs![
                "region",
                "engine",
                "size",
                "endpoint",
                "created_at",
                "monitor",
                "security_groups",
                "subnets",
                "network",
            ],
            EntityKind::DnsRecord => attrs!["zone", "record_type", "public", "values"],
            EntityKind::IamGroup => attrs!["resource_name", "users"],
            EntityKind::IamUser => attrs!["resource_name"],
            EntityKind::Information => attrs!["personal_data", "responsible"],
            EntityKind::Network => attrs!["region", "cidr", "subnets"],
            EntityKind::Person => attrs!["email", "iam_user"],
            EntityKind::Project => attrs![
                "aliases",
                "responsible",
                "services",
                "informations",
                "people",
            ],
            EntityKind::Service => attrs![
                "access",
                "environment",
                "authentication",
                "responsible",
                "informations",
                "dependencies",
                "resources",
                "users",
            ],
            EntityKind::SecurityGroup => attrs!["region", "ingress", "egress"],
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.tag())
    }
}

impl FromStr for EntityKind {
    type Err = ModelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ALL_KINDS
            .iter()
            .find(|kind| kind.tag() == s)
            .copied()
            .ok_or_else(|| ModelError::UnknownKind(s.to_string()))
    }
}
