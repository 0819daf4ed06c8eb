//! Replayable gateway for tests.

use std::collections::{HashMap, HashSet};

use async_trait::async_trait;
use muster_core::source::{SourceError, SourceResult};
use serde_json::Value;

use super::gateway::CloudApi;

/// Gateway double that replays recorded listings without making any
/// network calls. Regions and items are fixed up front; individual
/// endpoints can be told to fail for failure-path testing.
#[derive(Default)]
pub struct ReplayGateway {
    regions: Vec<String>,
    instances: HashMap<String, Vec<Value>>,
    databases: HashMap<String, Vec<Value>>,
    networks: HashMap<String, Vec<Value>>,
    security_groups: HashMap<String, Vec<Value>>,
    scaling_groups: HashMap<String, Vec<Value>>,
    buckets: Vec<Value>,
    dns_zones: Vec<Value>,
    dns_records: HashMap<String, Vec<Value>>,
    iam_users: Vec<Value>,
    iam_groups: Vec<Value>,
    failing: HashSet<String>,
}

impl ReplayGateway {
    pub fn new(regions: &[&str]) -> Self {
        Self {
            regions: regions.iter().map(|region| region.to_string()).collect(),
            ..Default::default()
        }
    }

    pub fn with_instances(mut self, region: &str, items: Vec<Value>) -> Self {
        self.instances.insert(region.to_string(), items);
        self
    }

    pub fn with_databases(mut self, region: &str, items: Vec<Value>) -> Self {
        self.databases.insert(region.to_string(), items);
        self
    }

    pub fn with_networks(mut self, region: &str, items: Vec<Value>) -> Self {
        self.networks.insert(region.to_string(), items);
        self
    }

    pub fn with_security_groups(mut self, region: &str, items: Vec<Value>) -> Self {
        self.security_groups.insert(region.to_string(), items);
        self
    }

    pub fn with_scaling_groups(mut self, region: &str, items: Vec<Value>) -> Self {
        self.scaling_groups.insert(region.to_string(), items);
        self
    }

    pub fn with_buckets(mut self, items: Vec<Value>) -> Self {
        self.buckets = items;
        self
    }

    /// Record a hosted zone and its record listing in one step.
    pub fn with_dns_zone(mut self, zone: Value, records: Vec<Value>) -> Self {
        if let Some(zone_id) = zone.get("id").and_then(Value::as_str) {
            self.dns_records.insert(zone_id.to_string(), records);
        }
        self.dns_zones.push(zone);
        self
    }

    pub fn with_iam_users(mut self, items: Vec<Value>) -> Self {
        self.iam_users = items;
        self
    }

    pub fn with_iam_groups(mut self, items: Vec<Value>) -> Self {
        self.iam_groups = items;
        self
    }

    /// Make one endpoint fail, named after the [`CloudApi`] method.
    pub fn with_failure(mut self, endpoint: &str) -> Self {
        self.failing.insert(endpoint.to_string());
        self
    }

    fn check(&self, endpoint: &str) -> SourceResult<()> {
        if self.failing.contains(endpoint) {
            return Err(SourceError::RequestFailed(format!(
                "Replayed failure for {}",
                endpoint
            )));
        }
        Ok(())
    }

    fn regional(map: &HashMap<String, Vec<Value>>, region: &str) -> Vec<Value> {
        map.get(region).cloned().unwrap_or_default()
    }
}

#[async_trait]
impl CloudApi for ReplayGateway {
    async fn regions(&self) -> SourceResult<Vec<String>> {
        self.check("regions")?;
        Ok(self.regions.clone())
    }

    async fn instances(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.check("instances")?;
        Ok(Self::regional(&self.instances, region))
    }

    async fn databases(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.check("databases")?;
        Ok(Self::regional(&self.databases, region))
    }

    async fn networks(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.check("networks")?;
        Ok(Self::regional(&self.networks, region))
    }

    async fn security_groups(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.check("security_groups")?;
        Ok(Self::regional(&self.security_groups, region))
    }

    async fn scaling_groups(&self, region: &str) -> SourceResult<Vec<Value>> {
        self.check("scaling_groups")?;
        Ok(Self::regional(&self.scaling_groups, region))
    }

    async fn buckets(&self) -> SourceResult<Vec<Value>> {
        self.check("buckets")?;
        Ok(self.buckets.clone())
    }

    async fn dns_zones(&self) -> SourceResult<Vec<Value>> {
        self.check("dns_zones")?;
        Ok(self.dns_zones.clone())
    }

    async fn dns_records(&self, zone_id: &str) -> SourceResult<Vec<Value>> {
        self.check("dns_records")?;
        Ok(self.dns_records.get(zone_id).cloned().unwrap_or_default())
    }

    async fn iam_users(&self) -> SourceResult<Vec<Value>> {
        self.check("iam_users")?;
        Ok(self.iam_users.clone())
    }

    async fn iam_groups(&self) -> SourceResult<Vec<Value>> {
        self.check("iam_groups")?;
        Ok(self.iam_groups.clone())
    }
}
