//! Cloud provider source.
//!
//! Walks the provider gateway's listings, flattens each raw payload into
//! the attribute shape the inventory stores, and reports anything that was
//! active last run but absent from the listings as terminated. Kinds whose
//! listings could not be fetched are left exactly as they were.

use std::collections::HashSet;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use muster_core::attrs::{self, EntityAttrs};
use muster_core::model::{Entity, EntityKind, EntityUpdate};
use muster_core::source::{Source, SourceResult};

pub mod gateway;
pub mod replay;

pub use gateway::{AuthConfig, CloudApi, GatewayConfig, HttpGateway};
pub use replay::ReplayGateway;

/// Kinds this source observes. Everything else is curated by hand and
/// never touched here.
pub const CLOUD_KINDS: [EntityKind; 9] = [
    EntityKind::ScalingGroup,
    EntityKind::Bucket,
    EntityKind::Compute,
    EntityKind::Database,
    EntityKind::DnsRecord,
    EntityKind::IamGroup,
    EntityKind::IamUser,
    EntityKind::Network,
    EntityKind::SecurityGroup,
];

/// Source that feeds the inventory from a cloud provider via a [`CloudApi`]
/// gateway.
pub struct CloudSource<A> {
    api: A,
}

impl<A: CloudApi> CloudSource<A> {
    pub fn new(api: A) -> Self {
        Self { api }
    }

    /// Fetch and flatten every listing for one kind. Regional kinds walk
    /// all regions; global kinds issue a single listing. Each observed
    /// item is pre-merged with its saved counterpart, which is removed
    /// from `remaining` so the caller can treat leftovers as gone.
    async fn collect(
        &self,
        kind: EntityKind,
        regions: &[String],
        remaining: &mut Vec<Entity>,
    ) -> SourceResult<Vec<EntityUpdate>> {
        let mut updates = Vec::new();
        match kind {
            EntityKind::Compute => {
                for region in regions {
                    for raw in self.api.instances(region).await? {
                        updates.push(account(kind, instance_attrs(&raw, region), remaining));
                    }
                }
            }
            EntityKind::Database => {
                for region in regions {
                    for raw in self.api.databases(region).await? {
                        updates.push(account(kind, database_attrs(&raw, region), remaining));
                    }
                }
            }
            EntityKind::Network => {
                for region in regions {
                    for raw in self.api.networks(region).await? {
                        updates.push(account(kind, network_attrs(&raw, region), remaining));
                    }
                }
            }
            EntityKind::SecurityGroup => {
                for region in regions {
                    for raw in self.api.security_groups(region).await? {
                        updates.push(account(kind, security_group_attrs(&raw, region), remaining));
                    }
                }
            }
            EntityKind::ScalingGroup => {
                for region in regions {
                    for raw in self.api.scaling_groups(region).await? {
                        updates.push(account(kind, scaling_group_attrs(&raw, region), remaining));
                    }
                }
            }
            EntityKind::Bucket => {
                for raw in self.api.buckets().await? {
                    updates.push(account(kind, bucket_attrs(&raw), remaining));
                }
            }
            EntityKind::DnsRecord => {
                for zone in self.api.dns_zones().await? {
                    let Some(zone_id) = zone.get("id").and_then(Value::as_str) else {
                        warn!("Skipping a hosted zone without an id");
                        continue;
                    };
                    let public = !zone.get("private").and_then(Value::as_bool).unwrap_or(false);
                    for raw in self.api.dns_records(zone_id).await? {
                        updates.push(account(
                            kind,
                            dns_record_attrs(&raw, zone_id, public),
                            remaining,
                        ));
                    }
                }
            }
            EntityKind::IamUser => {
                for raw in self.api.iam_users().await? {
                    updates.push(account(kind, iam_user_attrs(&raw), remaining));
                }
            }
            EntityKind::IamGroup => {
                for raw in self.api.iam_groups().await? {
                    updates.push(account(kind, iam_group_attrs(&raw), remaining));
                }
            }
            _ => {}
        }
        debug!(kind = %kind, count = updates.len(), "Collected listings");
        Ok(updates)
    }
}

#[async_trait]
impl<A: CloudApi> Source for CloudSource<A> {
    fn name(&self) -> &str {
        "cloud"
    }

    #[instrument(skip(self, active))]
    async fn update(
        &self,
        kinds: &[EntityKind],
        active: Vec<Entity>,
    ) -> SourceResult<Vec<EntityUpdate>> {
        let requested: Vec<EntityKind> = if kinds.is_empty() {
            CLOUD_KINDS.to_vec()
        } else {
            kinds
                .iter()
                .copied()
                .filter(|kind| CLOUD_KINDS.contains(kind))
                .collect()
        };
        if requested.is_empty() {
            return Ok(Vec::new());
        }

        let regions = self.api.regions().await?;
        info!(
            regions = regions.len(),
            kinds = requested.len(),
            "Collecting cloud listings"
        );

        let mut remaining = active;
        let mut updates = Vec::new();
        let mut observed = HashSet::new();

        for kind in &requested {
            match self.collect(*kind, &regions, &mut remaining).await {
                Ok(mut collected) => {
                    observed.insert(*kind);
                    updates.append(&mut collected);
                }
                Err(e) => {
                    warn!(kind = %kind, error = %e, "Listing failed, keeping previous state for this kind");
                }
            }
        }

        // Whatever is still active in the inventory but absent from a fully
        // observed listing has disappeared from the provider.
        for entity in remaining {
            if !observed.contains(&entity.kind()) {
                continue;
            }
            info!(kind = %entity.kind(), id = entity.id(), "No longer listed, marking as terminated");
            match EntityUpdate::terminating(&entity) {
                Ok(update) => updates.push(update),
                Err(e) => {
                    warn!(id = entity.id(), error = %e, "Could not build a termination update");
                }
            }
        }

        Ok(updates)
    }
}

/// Turn one observed attribute mapping into an update, folding in the saved
/// entity's attributes when the inventory already knows this id. The saved
/// entity is removed from `remaining`; observed values win on collision.
fn account(kind: EntityKind, observed: EntityAttrs, remaining: &mut Vec<Entity>) -> EntityUpdate {
    let position = attrs::get_str(&observed, "id").and_then(|id| {
        remaining
            .iter()
            .position(|entity| entity.kind() == kind && entity.id() == id)
    });
    let Some(index) = position else {
        return EntityUpdate::new(kind, observed);
    };
    let saved = remaining.remove(index);
    match saved.to_attrs() {
        Ok(saved_attrs) => EntityUpdate::new(kind, attrs::merge(&saved_attrs, &observed)),
        Err(e) => {
            warn!(id = saved.id(), error = %e, "Could not read saved attributes, using observed ones only");
            EntityUpdate::new(kind, observed)
        }
    }
}

fn put_str(attrs: &mut EntityAttrs, key: &str, value: Option<&Value>) {
    if let Some(text) = value.and_then(Value::as_str) {
        attrs.insert(key.to_string(), Value::String(text.to_string()));
    }
}

fn put_value(attrs: &mut EntityAttrs, key: &str, value: Option<&Value>) {
    if let Some(value) = value {
        if !value.is_null() {
            attrs.insert(key.to_string(), value.clone());
        }
    }
}

fn str_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Pull the `id` field out of every element of a list of objects.
fn id_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("id"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// Monitoring tags arrive as strings or booleans depending on the endpoint.
fn tag_flag(raw: &Value, pointer: &str) -> Option<bool> {
    match raw.pointer(pointer)? {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) => Some(!text.is_empty()),
        _ => None,
    }
}

fn instance_attrs(raw: &Value, region: &str) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    put_str(&mut out, "id", raw.get("id"));
    put_str(&mut out, "name", raw.get("name"));
    out.insert("region".to_string(), Value::String(region.to_string()));
    put_str(&mut out, "size", raw.get("type"));
    put_str(&mut out, "image", raw.get("image"));
    put_str(&mut out, "created_at", raw.get("launched_at"));
    if let Some(state) = raw.pointer("/state/name").and_then(Value::as_str) {
        let state = if state == "running" { "active" } else { state };
        out.insert("state".to_string(), Value::String(state.to_string()));
    }
    put_str(&mut out, "state_transition", raw.pointer("/state/transition"));
    put_str(&mut out, "network", raw.pointer("/network/id"));
    put_str(&mut out, "subnet", raw.pointer("/network/subnet"));
    out.insert(
        "security_groups".to_string(),
        json_strings(id_list(raw.get("security_groups"))),
    );
    let mut private_ips = Vec::new();
    let mut public_ips = Vec::new();
    if let Some(interfaces) = raw.get("interfaces").and_then(Value::as_array) {
        for interface in interfaces {
            private_ips.extend(str_list(interface.get("private_ips")));
            public_ips.extend(str_list(interface.get("public_ips")));
        }
    }
    out.insert("private_ips".to_string(), json_strings(private_ips));
    out.insert("public_ips".to_string(), json_strings(public_ips));
    if let Some(monitor) = tag_flag(raw, "/tags/monitor") {
        out.insert("monitor".to_string(), Value::Bool(monitor));
    }
    out
}

fn database_attrs(raw: &Value, region: &str) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    put_str(&mut out, "id", raw.get("id"));
    put_str(&mut out, "name", raw.get("name"));
    out.insert("region".to_string(), Value::String(region.to_string()));
    let engine = raw.pointer("/engine/name").and_then(Value::as_str);
    let version = raw.pointer("/engine/version").and_then(Value::as_str);
    match (engine, version) {
        (Some(engine), Some(version)) => {
            out.insert(
                "engine".to_string(),
                Value::String(format!("{} {}", engine, version)),
            );
        }
        (Some(engine), None) => {
            out.insert("engine".to_string(), Value::String(engine.to_string()));
        }
        _ => {}
    }
    put_str(&mut out, "size", raw.get("class"));
    if let Some(address) = raw.pointer("/endpoint/address").and_then(Value::as_str) {
        let endpoint = match raw.pointer("/endpoint/port").and_then(Value::as_i64) {
            Some(port) => format!("{}:{}", address, port),
            None => address.to_string(),
        };
        out.insert("endpoint".to_string(), Value::String(endpoint));
    }
    put_str(&mut out, "created_at", raw.get("created_at"));
    if let Some(state) = raw.get("status").and_then(Value::as_str) {
        let state = if state == "available" { "active" } else { state };
        out.insert("state".to_string(), Value::String(state.to_string()));
    }
    out.insert(
        "security_groups".to_string(),
        json_strings(id_list(raw.get("security_groups"))),
    );
    out.insert(
        "subnets".to_string(),
        json_strings(str_list(raw.pointer("/network/subnets"))),
    );
    put_str(&mut out, "network", raw.pointer("/network/id"));
    if let Some(monitor) = tag_flag(raw, "/tags/monitor") {
        out.insert("monitor".to_string(), Value::Bool(monitor));
    }
    out
}

fn bucket_attrs(raw: &Value) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    if let Some(name) = raw.get("name").and_then(Value::as_str) {
        out.insert("id".to_string(), Value::String(format!("bkt-{}", name)));
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    put_str(&mut out, "region", raw.get("region"));
    put_str(&mut out, "created_at", raw.get("created_at"));
    out.insert("state".to_string(), Value::String("active".to_string()));
    let public_read = raw
        .pointer("/acl/public_read")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let public_write = raw
        .pointer("/acl/public_write")
        .and_then(Value::as_bool)
        .unwrap_or(false);
    out.insert("public_read".to_string(), Value::Bool(public_read));
    out.insert("public_write".to_string(), Value::Bool(public_write));
    out
}

fn dns_record_attrs(raw: &Value, zone_id: &str, public: bool) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    let name = raw
        .get("name")
        .and_then(Value::as_str)
        .map(|name| name.trim_end_matches('.').to_string());
    let record_type = raw.get("type").and_then(Value::as_str);
    if let (Some(name), Some(record_type)) = (&name, record_type) {
        out.insert(
            "id".to_string(),
            Value::String(format!("{}:{}:{}", zone_id, name, record_type.to_lowercase())),
        );
        out.insert("name".to_string(), Value::String(name.clone()));
        out.insert(
            "record_type".to_string(),
            Value::String(record_type.to_string()),
        );
    }
    out.insert("zone".to_string(), Value::String(zone_id.to_string()));
    out.insert("public".to_string(), Value::Bool(public));
    out.insert("state".to_string(), Value::String("active".to_string()));
    let mut values = str_list(raw.get("values"));
    if values.is_empty() {
        if let Some(alias) = raw.get("alias").and_then(Value::as_str) {
            values.push(alias.to_string());
        }
    }
    out.insert("values".to_string(), json_strings(values));
    out
}

fn network_attrs(raw: &Value, region: &str) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    put_str(&mut out, "id", raw.get("id"));
    put_str(&mut out, "name", raw.get("name"));
    out.insert("region".to_string(), Value::String(region.to_string()));
    out.insert("state".to_string(), Value::String("active".to_string()));
    put_str(&mut out, "cidr", raw.get("cidr"));
    out.insert(
        "subnets".to_string(),
        json_strings(str_list(raw.get("subnets"))),
    );
    out
}

fn scaling_group_attrs(raw: &Value, region: &str) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    if let Some(name) = raw.get("name").and_then(Value::as_str) {
        out.insert("id".to_string(), Value::String(format!("asg-{}", name)));
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    out.insert("region".to_string(), Value::String(region.to_string()));
    out.insert("state".to_string(), Value::String("active".to_string()));
    put_value(&mut out, "min_size", raw.get("min_size"));
    put_value(&mut out, "max_size", raw.get("max_size"));
    put_value(&mut out, "desired_size", raw.get("desired_size"));
    out.insert(
        "availability_zones".to_string(),
        json_strings(str_list(raw.get("availability_zones"))),
    );
    put_str(&mut out, "healthcheck", raw.get("healthcheck"));
    out.insert(
        "instances".to_string(),
        json_strings(id_list(raw.get("instances"))),
    );
    out
}

fn security_group_attrs(raw: &Value, region: &str) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    put_str(&mut out, "id", raw.get("id"));
    put_str(&mut out, "name", raw.get("name"));
    put_str(&mut out, "description", raw.get("description"));
    out.insert("region".to_string(), Value::String(region.to_string()));
    out.insert("state".to_string(), Value::String("active".to_string()));
    for direction in ["ingress", "egress"] {
        let rules: Vec<Value> = raw
            .get(direction)
            .and_then(Value::as_array)
            .map(|rules| rules.iter().map(rule_attrs).collect())
            .unwrap_or_default();
        out.insert(direction.to_string(), Value::Array(rules));
    }
    out
}

/// Flatten one firewall rule. Protocol `-1` means the provider's
/// "anything" rule; ICMP has no real port range, so both get sentinel
/// port values instead of an expansion.
fn rule_attrs(raw: &Value) -> Value {
    let mut rule = EntityAttrs::new();
    let protocol = raw
        .get("protocol")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_uppercase();
    if protocol == "ICMP" {
        rule.insert("protocol".to_string(), Value::String(protocol));
        rule.insert("ports".to_string(), Value::Array(vec![Value::from(-2)]));
    } else if protocol == "-1" {
        rule.insert(
            "protocol".to_string(),
            Value::String("TCP & UDP & ICMP".to_string()),
        );
        rule.insert("ports".to_string(), Value::Array(vec![Value::from(-1)]));
    } else {
        rule.insert("protocol".to_string(), Value::String(protocol));
        let from = raw.get("from_port").and_then(Value::as_i64);
        let to = raw.get("to_port").and_then(Value::as_i64);
        if let (Some(from), Some(to)) = (from, to) {
            let ports: Vec<Value> = (from..=to).map(Value::from).collect();
            rule.insert("ports".to_string(), Value::Array(ports));
        }
    }
    rule.insert(
        "ip_ranges".to_string(),
        json_strings(cidr_list(raw.get("ip_ranges"))),
    );
    rule.insert(
        "ipv6_ranges".to_string(),
        json_strings(cidr_list(raw.get("ipv6_ranges"))),
    );
    rule.insert(
        "sg_range".to_string(),
        json_strings(id_list(raw.get("groups"))),
    );
    if let Some(description) = rule_description(raw) {
        rule.insert("description".to_string(), Value::String(description));
    }
    Value::Object(rule)
}

fn cidr_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| item.get("cidr"))
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

/// First per-element description found across the rule's range lists.
fn rule_description(raw: &Value) -> Option<String> {
    for key in ["ip_ranges", "ipv6_ranges", "groups"] {
        let Some(items) = raw.get(key).and_then(Value::as_array) else {
            continue;
        };
        for item in items {
            if let Some(description) = item.get("description").and_then(Value::as_str) {
                return Some(description.to_string());
            }
        }
    }
    None
}

fn iam_user_attrs(raw: &Value) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    if let Some(username) = raw.get("username").and_then(Value::as_str) {
        out.insert(
            "id".to_string(),
            Value::String(format!("iamu-{}", username.to_lowercase())),
        );
        out.insert("name".to_string(), Value::String(username.to_string()));
    }
    put_str(&mut out, "resource_name", raw.get("resource_name"));
    out.insert("state".to_string(), Value::String("active".to_string()));
    out
}

fn iam_group_attrs(raw: &Value) -> EntityAttrs {
    let mut out = EntityAttrs::new();
    if let Some(name) = raw.get("name").and_then(Value::as_str) {
        out.insert(
            "id".to_string(),
            Value::String(format!("iamg-{}", name.to_lowercase())),
        );
        out.insert("name".to_string(), Value::String(name.to_string()));
    }
    put_str(&mut out, "resource_name", raw.get("resource_name"));
    out.insert("state".to_string(), Value::String("active".to_string()));
    let users: Vec<String> = str_list(raw.get("members"))
        .into_iter()
        .map(|member| format!("iamu-{}", member.to_lowercase()))
        .collect();
    out.insert("users".to_string(), json_strings(users));
    out
}

fn json_strings(items: Vec<String>) -> Value {
    Value::Array(items.into_iter().map(Value::String).collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use muster_core::model::EntityState;
    use serde_json::json;

    fn entity(kind: EntityKind, value: Value) -> Entity {
        let Value::Object(map) = value else {
            panic!("expected an object");
        };
        Entity::from_attrs(kind, &map).unwrap()
    }

    fn find<'a>(updates: &'a [EntityUpdate], id: &str) -> &'a EntityUpdate {
        updates
            .iter()
            .find(|update| update.id() == Some(id))
            .unwrap_or_else(|| panic!("no update for {}", id))
    }

    fn raw_instance() -> Value {
        json!({
            "id": "i-0123abc",
            "name": "api-server",
            "type": "m5.large",
            "image": "img-9876fed",
            "launched_at": "2024-03-01T10:00:00Z",
            "state": {"name": "running", "transition": ""},
            "network": {"id": "net-0aaa111", "subnet": "sub-0bbb222"},
            "security_groups": [{"id": "sg-0ccc333", "name": "web"}],
            "interfaces": [
                {"private_ips": ["10.0.1.5"], "public_ips": ["52.31.7.9"]}
            ],
            "tags": {"monitor": "true"}
        })
    }

    #[tokio::test]
    async fn test_instance_listing_is_flattened() {
        let gateway =
            ReplayGateway::new(&["eu-west-1"]).with_instances("eu-west-1", vec![raw_instance()]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let update = find(&updates, "i-0123abc");
        assert_eq!(update.kind, EntityKind::Compute);
        assert_eq!(update.attrs["state"], json!("active"));
        assert_eq!(update.attrs["size"], json!("m5.large"));
        assert_eq!(update.attrs["region"], json!("eu-west-1"));
        assert_eq!(update.attrs["security_groups"], json!(["sg-0ccc333"]));
        assert_eq!(update.attrs["private_ips"], json!(["10.0.1.5"]));
        assert_eq!(update.attrs["public_ips"], json!(["52.31.7.9"]));
        assert_eq!(update.attrs["monitor"], json!(true));

        let entity = Entity::from_attrs(EntityKind::Compute, &update.attrs).unwrap();
        assert_eq!(entity.state(), EntityState::Active);
    }

    #[tokio::test]
    async fn test_database_engine_and_endpoint_are_joined() {
        let raw = json!({
            "id": "db-7findme",
            "name": "orders",
            "engine": {"name": "postgres", "version": "14.2"},
            "class": "db.t3.medium",
            "endpoint": {"address": "orders.db.internal", "port": 5432},
            "created_at": "2023-11-11T08:30:00Z",
            "status": "available",
            "network": {"id": "net-0aaa111", "subnets": ["sub-1", "sub-2"]},
            "security_groups": [{"id": "sg-0ccc333"}]
        });
        let gateway = ReplayGateway::new(&["eu-west-1"]).with_databases("eu-west-1", vec![raw]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let update = find(&updates, "db-7findme");
        assert_eq!(update.attrs["engine"], json!("postgres 14.2"));
        assert_eq!(update.attrs["endpoint"], json!("orders.db.internal:5432"));
        assert_eq!(update.attrs["state"], json!("active"));
        assert_eq!(update.attrs["subnets"], json!(["sub-1", "sub-2"]));
    }

    #[tokio::test]
    async fn test_saved_attributes_survive_observation() {
        let saved = entity(
            EntityKind::Compute,
            json!({
                "id": "i-0123abc",
                "state": "active",
                "description": "Payments API box"
            }),
        );
        let gateway =
            ReplayGateway::new(&["eu-west-1"]).with_instances("eu-west-1", vec![raw_instance()]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], vec![saved]).await.unwrap();

        let update = find(&updates, "i-0123abc");
        assert_eq!(update.attrs["description"], json!("Payments API box"));
        assert_eq!(update.attrs["size"], json!("m5.large"));
    }

    #[tokio::test]
    async fn test_unlisted_entities_are_terminated() {
        let saved = entity(
            EntityKind::Compute,
            json!({"id": "i-gone", "name": "old-box", "state": "active"}),
        );
        let gateway = ReplayGateway::new(&["eu-west-1"]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], vec![saved]).await.unwrap();

        let update = find(&updates, "i-gone");
        assert_eq!(update.attrs["state"], json!("terminated"));
        assert_eq!(update.attrs["name"], json!("old-box"));
    }

    #[tokio::test]
    async fn test_failed_listing_suppresses_termination_for_that_kind() {
        let compute = entity(
            EntityKind::Compute,
            json!({"id": "i-stays", "state": "active"}),
        );
        let bucket = entity(
            EntityKind::Bucket,
            json!({"id": "bkt-stale", "state": "active"}),
        );
        let gateway = ReplayGateway::new(&["eu-west-1"]).with_failure("instances");
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], vec![compute, bucket]).await.unwrap();

        // The bucket listing succeeded and came back empty, so the stale
        // bucket is terminated. The instance listing failed, so the
        // instance is left alone.
        assert!(updates.iter().all(|update| update.id() != Some("i-stays")));
        let update = find(&updates, "bkt-stale");
        assert_eq!(update.attrs["state"], json!("terminated"));
    }

    #[tokio::test]
    async fn test_only_requested_kinds_are_collected() {
        let compute = entity(
            EntityKind::Compute,
            json!({"id": "i-ignored", "state": "active"}),
        );
        let gateway = ReplayGateway::new(&["eu-west-1"])
            .with_instances("eu-west-1", vec![raw_instance()])
            .with_buckets(vec![json!({"name": "assets", "region": "eu-west-1"})]);
        let source = CloudSource::new(gateway);

        let updates = source
            .update(&[EntityKind::Bucket], vec![compute])
            .await
            .unwrap();

        assert_eq!(updates.len(), 1);
        assert_eq!(updates[0].id(), Some("bkt-assets"));
    }

    #[tokio::test]
    async fn test_kinds_outside_the_provider_produce_nothing() {
        // The gateway would blow up if it were consulted at all.
        let gateway = ReplayGateway::new(&[]).with_failure("regions");
        let source = CloudSource::new(gateway);

        let updates = source
            .update(&[EntityKind::Service], Vec::new())
            .await
            .unwrap();

        assert!(updates.is_empty());
    }

    #[tokio::test]
    async fn test_security_group_rules_are_built() {
        let raw = json!({
            "id": "sg-0ccc333",
            "name": "web",
            "description": "Front door",
            "ingress": [
                {
                    "protocol": "tcp",
                    "from_port": 443,
                    "to_port": 445,
                    "ip_ranges": [{"cidr": "10.0.0.0/8", "description": "Office"}],
                    "ipv6_ranges": [],
                    "groups": []
                },
                {
                    "protocol": "icmp",
                    "from_port": -1,
                    "to_port": -1,
                    "ip_ranges": [{"cidr": "0.0.0.0/0"}]
                }
            ],
            "egress": [
                {
                    "protocol": "-1",
                    "groups": [{"id": "sg-0ddd444"}]
                }
            ]
        });
        let gateway = ReplayGateway::new(&["eu-west-1"]).with_security_groups("eu-west-1", vec![raw]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let update = find(&updates, "sg-0ccc333");
        let ingress = update.attrs["ingress"].as_array().unwrap();
        assert_eq!(ingress[0]["protocol"], json!("TCP"));
        assert_eq!(ingress[0]["ports"], json!([443, 444, 445]));
        assert_eq!(ingress[0]["ip_ranges"], json!(["10.0.0.0/8"]));
        assert_eq!(ingress[0]["description"], json!("Office"));
        assert_eq!(ingress[1]["protocol"], json!("ICMP"));
        assert_eq!(ingress[1]["ports"], json!([-2]));
        let egress = update.attrs["egress"].as_array().unwrap();
        assert_eq!(egress[0]["protocol"], json!("TCP & UDP & ICMP"));
        assert_eq!(egress[0]["ports"], json!([-1]));
        assert_eq!(egress[0]["sg_range"], json!(["sg-0ddd444"]));
    }

    #[tokio::test]
    async fn test_dns_records_get_zone_scoped_ids() {
        let zone = json!({"id": "zn-0eee555", "name": "example.com.", "private": false});
        let records = vec![
            json!({"name": "www.example.com.", "type": "A", "values": ["52.31.7.9"]}),
            json!({"name": "cdn.example.com.", "type": "CNAME", "alias": "edge.provider.net"}),
        ];
        let gateway = ReplayGateway::new(&["eu-west-1"]).with_dns_zone(zone, records);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let www = find(&updates, "zn-0eee555:www.example.com:a");
        assert_eq!(www.attrs["public"], json!(true));
        assert_eq!(www.attrs["values"], json!(["52.31.7.9"]));
        let cdn = find(&updates, "zn-0eee555:cdn.example.com:cname");
        assert_eq!(cdn.attrs["values"], json!(["edge.provider.net"]));
    }

    #[tokio::test]
    async fn test_iam_ids_are_lowercased() {
        let gateway = ReplayGateway::new(&[])
            .with_iam_users(vec![json!({
                "username": "Deploy.Bot",
                "resource_name": "arn:cloud:iam::123:user/Deploy.Bot"
            })])
            .with_iam_groups(vec![json!({
                "name": "DevOps",
                "resource_name": "arn:cloud:iam::123:group/DevOps",
                "members": ["Deploy.Bot"]
            })]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let user = find(&updates, "iamu-deploy.bot");
        assert_eq!(user.attrs["name"], json!("Deploy.Bot"));
        let group = find(&updates, "iamg-devops");
        assert_eq!(group.attrs["users"], json!(["iamu-deploy.bot"]));
    }

    #[tokio::test]
    async fn test_bucket_acl_flags() {
        let gateway = ReplayGateway::new(&[]).with_buckets(vec![json!({
            "name": "public-assets",
            "region": "eu-west-1",
            "created_at": "2022-05-05T00:00:00Z",
            "acl": {"public_read": true, "public_write": false}
        })]);
        let source = CloudSource::new(gateway);

        let updates = source.update(&[], Vec::new()).await.unwrap();

        let update = find(&updates, "bkt-public-assets");
        assert_eq!(update.attrs["public_read"], json!(true));
        assert_eq!(update.attrs["public_write"], json!(false));
        assert_eq!(update.attrs["state"], json!("active"));
    }
}
