//! Per-cluster view of a binding, as reported by `fleetd status`.

use std::collections::BTreeMap;

use serde::Serialize;

use fleetbind_state::{Binding, JsonPatch};

/// What one cluster receives from a binding.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ClusterView {
    /// Resource name → overrides applied on this cluster, in binding order.
    pub resources: BTreeMap<String, Vec<JsonPatch>>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BindingStatus {
    pub binding: String,
    pub owner: String,
    pub resource_version: u64,
    pub clusters: BTreeMap<String, ClusterView>,
}

impl BindingStatus {
    pub fn from_binding(binding: &Binding) -> Self {
        let mut clusters: BTreeMap<String, ClusterView> = BTreeMap::new();
        for resource in &binding.spec.resources {
            for cluster in &resource.clusters {
                clusters
                    .entry(cluster.name.clone())
                    .or_default()
                    .resources
                    .insert(resource.name.clone(), cluster.overrides.clone());
            }
        }

        Self {
            binding: binding.table_key(),
            owner: format!("{}/{}", binding.owner.kind, binding.owner.name),
            resource_version: binding.resource_version,
            clusters,
        }
    }
}
