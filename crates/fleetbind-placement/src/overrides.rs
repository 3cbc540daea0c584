//! Override builder: turns a placement decision into binding patches.

use fleetbind_core::{NAMESPACE_PATH, namespace_mapping_label};
use fleetbind_state::{JsonPatch, Labels, PlacedResource};

use crate::distributor::TargetPlacement;

/// Builds per-cluster overrides for one policy namespace.
#[derive(Debug, Clone, Copy)]
pub struct OverrideBuilder<'a> {
    namespace: &'a str,
    namespace_labels: &'a Labels,
}

impl<'a> OverrideBuilder<'a> {
    pub fn new(namespace: &'a str, namespace_labels: &'a Labels) -> Self {
        Self {
            namespace,
            namespace_labels,
        }
    }

    /// Overrides for `resource` on one target, replica patch first.
    pub fn build(&self, resource: &PlacedResource, target: &TargetPlacement) -> Vec<JsonPatch> {
        let mut overrides = Vec::with_capacity(2);

        if let (Some(path), Some(replicas)) = (resource.replica_path.as_deref(), target.replicas) {
            if !path.is_empty() {
                overrides.push(JsonPatch::replace(path, replicas.to_string()));
            }
        }

        if let Some(mapped) = self.mapped_namespace(&target.mapping_key) {
            overrides.push(JsonPatch::replace(NAMESPACE_PATH, mapped));
        }

        overrides
    }

    /// Namespace that `mapping_key` maps the policy namespace to, if any.
    pub fn mapped_namespace(&self, mapping_key: &str) -> Option<&'a str> {
        self.namespace_labels
            .get(&namespace_mapping_label(mapping_key, self.namespace))
            .map(String::as_str)
            .filter(|ns| !ns.is_empty())
    }
}
