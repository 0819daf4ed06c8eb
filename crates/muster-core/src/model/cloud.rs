//! Entity kinds observed through the cloud provider gateway.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::state::EntityState;

/// A virtual machine.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComputeInstance {
    /// Provider-assigned id, `i-` prefixed.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Instance size, e.g. `m1.large`.
    #[serde(default)]
    pub size: Option<String>,
    /// Machine image the instance was launched from.
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Provider's explanation of the last state change.
    #[serde(default)]
    pub state_transition: Option<String>,
    /// Whether the operators flagged the instance for monitoring.
    #[serde(default)]
    pub monitor: Option<bool>,
    #[serde(default)]
    pub private_ips: Vec<String>,
    #[serde(default)]
    pub public_ips: Vec<String>,
    /// Ids of the security groups attached to the instance.
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub subnet: Option<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl ComputeInstance {
    pub fn reference_ids(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.security_groups.iter().map(String::as_str).collect();
        refs.extend(self.subnet.as_deref());
        refs.extend(self.network.as_deref());
        refs
    }
}

/// A managed database instance.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Database {
    /// Provider-assigned id, `db-` prefixed.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    /// Engine and version, e.g. `postgres 15.4`.
    #[serde(default)]
    pub engine: Option<String>,
    #[serde(default)]
    pub size: Option<String>,
    /// `host:port` the database listens on.
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub monitor: Option<bool>,
    #[serde(default)]
    pub security_groups: Vec<String>,
    #[serde(default)]
    pub subnets: Vec<String>,
    #[serde(default)]
    pub network: Option<String>,
}

impl Database {
    pub fn reference_ids(&self) -> Vec<&str> {
        let mut refs: Vec<&str> = self.security_groups.iter().map(String::as_str).collect();
        refs.extend(self.subnets.iter().map(String::as_str));
        refs.extend(self.network.as_deref());
        refs
    }
}

/// An object storage bucket.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Bucket {
    /// Synthesized id, `bkt-` followed by the bucket name.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    /// Whether the bucket grants read access to everyone.
    #[serde(default)]
    pub public_read: bool,
    /// Whether the bucket grants write access to everyone.
    #[serde(default)]
    pub public_write: bool,
}

impl Bucket {
    pub fn reference_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// One record set inside a hosted DNS zone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DnsRecord {
    /// Synthesized id, `{zone}:{name}:{type}`.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    /// Id of the hosted zone containing the record.
    #[serde(default)]
    pub zone: Option<String>,
    #[serde(default)]
    pub record_type: Option<String>,
    /// Whether the zone resolves on the public internet.
    #[serde(default)]
    pub public: bool,
    #[serde(default)]
    pub values: Vec<String>,
}

impl DnsRecord {
    pub fn reference_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// A private network.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Network {
    /// Provider-assigned id, `net-` prefixed.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub cidr: Option<String>,
    /// Subnet ids carved out of the network. Subnets are not tracked as
    /// entities of their own.
    #[serde(default)]
    pub subnets: Vec<String>,
}

impl Network {
    pub fn reference_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// A group of instances managed as one scaling unit.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalingGroup {
    /// Synthesized id, `asg-` followed by the group name.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub min_size: Option<i64>,
    #[serde(default)]
    pub max_size: Option<i64>,
    #[serde(default)]
    pub desired_size: Option<i64>,
    #[serde(default)]
    pub availability_zones: Vec<String>,
    #[serde(default)]
    pub healthcheck: Option<String>,
    /// Ids of the member instances.
    #[serde(default)]
    pub instances: Vec<String>,
}

impl ScalingGroup {
    pub fn reference_ids(&self) -> Vec<&str> {
        self.instances.iter().map(String::as_str).collect()
    }
}

/// One rule of a security group.
///
/// `ports` uses two sentinels from the provider protocol: `[-1]` together
/// with protocol `TCP & UDP & ICMP` means every port of every protocol, and
/// `[-2]` means ICMP, which has no port concept.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroupRule {
    #[serde(default)]
    pub protocol: String,
    #[serde(default)]
    pub ports: Vec<i64>,
    #[serde(default)]
    pub ip_ranges: Vec<String>,
    #[serde(default)]
    pub ipv6_ranges: Vec<String>,
    /// Ids of security groups this rule grants access to or from.
    #[serde(default)]
    pub sg_range: Vec<String>,
    #[serde(default)]
    pub description: Option<String>,
}

/// A firewall ruleset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecurityGroup {
    /// Provider-assigned id, `sg-` prefixed.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub ingress: Vec<SecurityGroupRule>,
    #[serde(default)]
    pub egress: Vec<SecurityGroupRule>,
}

impl SecurityGroup {
    pub fn reference_ids(&self) -> Vec<&str> {
        self.ingress
            .iter()
            .chain(self.egress.iter())
            .flat_map(|rule| rule.sg_range.iter().map(String::as_str))
            .collect()
    }
}

/// An identity and access management user.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IamUser {
    /// Synthesized id, `iamu-` followed by the lowercased user name.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    /// The provider's fully qualified resource name.
    #[serde(default)]
    pub resource_name: Option<String>,
}

impl IamUser {
    pub fn reference_ids(&self) -> Vec<&str> {
        Vec::new()
    }
}

/// An identity and access management group.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IamGroup {
    /// Synthesized id, `iamg-` followed by the lowercased group name.
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub state: EntityState,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub resource_name: Option<String>,
    /// Ids of the member users.
    #[serde(default)]
    pub users: Vec<String>,
}

impl IamGroup {
    pub fn reference_ids(&self) -> Vec<&str> {
        self.users.iter().map(String::as_str).collect()
    }
}
