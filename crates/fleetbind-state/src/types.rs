//! Domain types for the fleetbind state store.
//!
//! These types represent schedule policies, the clusters and cluster sets
//! they target, and the bindings the placement engine produces. All types
//! are serializable to/from JSON for storage in redb tables.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use fleetbind_core::{SCHEDULE_POLICY_KIND, binding_name, object_key};

/// Label set used by clusters, namespaces and selectors.
pub type Labels = BTreeMap<String, String>;

// ── Schedule policy ───────────────────────────────────────────────

/// Operator-authored placement policy for a set of resources.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulePolicy {
    pub namespace: String,
    pub name: String,
    /// Stable identity used in binding owner references.
    pub uid: String,
    pub spec: SchedulePolicySpec,
    #[serde(default)]
    pub status: SchedulePolicyStatus,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SchedulePolicySpec {
    /// Resources to place, in binding order.
    pub resources: Vec<String>,
    pub cluster_source: ClusterSource,
    /// Cluster set name; only read when `cluster_source` is `ClusterSet`.
    #[serde(default)]
    pub clusterset: Option<String>,
    /// Target total replicas.
    #[serde(default)]
    pub replicas: u32,
    /// Only read when `cluster_source` is `Assign`.
    #[serde(default)]
    pub schedule_mode: ScheduleMode,
    /// Per-cluster (Assign) or per-role (ClusterSet) entries.
    #[serde(default)]
    pub policy: Vec<PolicyEntry>,
    /// Ordered failover pool.
    #[serde(default)]
    pub failover_policy: Vec<FailoverEntry>,
    /// Whether the controller should run the placement engine at all.
    #[serde(default)]
    pub reschedule: bool,
}

/// Where a policy's primary clusters come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterSource {
    Assign,
    ClusterSet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleMode {
    #[default]
    Duplicated,
    Weighted,
}

/// A weighted placement entry, addressed by cluster name or by role.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct PolicyEntry {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub weight: u32,
    #[serde(default)]
    pub min: Option<u32>,
    #[serde(default)]
    pub max: Option<u32>,
}

impl PolicyEntry {
    /// Lower replica bound; unset means zero.
    pub fn lower_bound(&self) -> u32 {
        self.min.unwrap_or(0)
    }

    /// Upper replica bound; unset means unbounded.
    pub fn upper_bound(&self) -> u32 {
        self.max.unwrap_or(u32::MAX)
    }
}

/// One entry of a failover pool.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct FailoverEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: FailoverKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FailoverKind {
    /// A single named cluster.
    Clusters,
    /// Every member of the named cluster set.
    ClusterSet,
}

/// Scheduling timestamps stamped by the controller (unix seconds).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SchedulePolicyStatus {
    pub last_schedule_time: Option<u64>,
    pub last_modify_time: Option<u64>,
}

impl SchedulePolicy {
    /// Build the composite key for the policies table.
    pub fn table_key(&self) -> String {
        object_key(&self.namespace, &self.name)
    }

    /// Name of the binding this policy owns.
    pub fn binding_name(&self) -> String {
        binding_name(&self.name)
    }

    /// Owner reference stamped onto the policy's binding.
    pub fn owner_reference(&self) -> OwnerReference {
        OwnerReference {
            kind: SCHEDULE_POLICY_KIND.to_string(),
            name: self.name.clone(),
            uid: self.uid.clone(),
        }
    }
}

// ── Clusters and cluster sets ─────────────────────────────────────

/// A member cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Cluster {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
    #[serde(default)]
    pub status: ClusterStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct ClusterStatus {
    pub status: ClusterState,
}

/// Connection state reported for a member cluster.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClusterState {
    Online,
    Offline,
    #[default]
    Initializing,
}

impl Cluster {
    /// Only online clusters can receive placements.
    pub fn is_online(&self) -> bool {
        self.status.status == ClusterState::Online
    }

    /// True when every selector label is present with the same value.
    pub fn matches(&self, selector: &Labels) -> bool {
        selector
            .iter()
            .all(|(k, v)| self.labels.get(k).is_some_and(|cv| cv == v))
    }
}

/// Named group of clusters, by explicit role list or by label selector.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClusterSet {
    pub name: String,
    #[serde(default)]
    pub clusters: Vec<ClusterSetMember>,
    #[serde(default)]
    pub selector: Option<Labels>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClusterSetMember {
    pub name: String,
    #[serde(default)]
    pub role: String,
}

/// Resolved membership mode of a cluster set.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Membership<'a> {
    Roles(&'a [ClusterSetMember]),
    Selector(&'a Labels),
}

impl ClusterSet {
    /// Returns `None` when the set declares both or neither membership mode.
    pub fn membership(&self) -> Option<Membership<'_>> {
        match (&self.selector, self.clusters.is_empty()) {
            (Some(selector), true) => Some(Membership::Selector(selector)),
            (None, false) => Some(Membership::Roles(&self.clusters)),
            _ => None,
        }
    }
}

// ── Placed resources and namespaces ───────────────────────────────

/// Descriptor of a resource that schedule policies can place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PlacedResource {
    pub namespace: String,
    pub name: String,
    /// JSON pointer to the replica field, e.g. `/spec/replicas`.
    #[serde(default)]
    pub replica_path: Option<String>,
}

impl PlacedResource {
    pub fn table_key(&self) -> String {
        object_key(&self.namespace, &self.name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Namespace {
    pub name: String,
    #[serde(default)]
    pub labels: Labels,
}

// ── Binding ───────────────────────────────────────────────────────

/// Placement decision consumed by downstream synchronization.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Binding {
    pub namespace: String,
    pub name: String,
    pub owner: OwnerReference,
    /// Bumped by the store on every successful create/update.
    #[serde(default)]
    pub resource_version: u64,
    pub spec: BindingSpec,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct OwnerReference {
    pub kind: String,
    pub name: String,
    pub uid: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindingSpec {
    pub resources: Vec<BindingResource>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindingResource {
    pub name: String,
    pub clusters: Vec<BindingCluster>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct BindingCluster {
    pub name: String,
    #[serde(rename = "override", default)]
    pub overrides: Vec<JsonPatch>,
}

/// A single field replacement applied to a manifest for one cluster.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct JsonPatch {
    pub op: PatchOp,
    pub path: String,
    pub value: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PatchOp {
    Replace,
}

impl JsonPatch {
    pub fn replace(path: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            op: PatchOp::Replace,
            path: path.into(),
            value: value.into(),
        }
    }
}

impl Binding {
    pub fn table_key(&self) -> String {
        object_key(&self.namespace, &self.name)
    }

    /// True when this binding was produced for `policy`.
    pub fn is_owned_by(&self, policy: &SchedulePolicy) -> bool {
        self.owner.kind == SCHEDULE_POLICY_KIND
            && self.owner.name == policy.name
            && self.owner.uid == policy.uid
    }
}
