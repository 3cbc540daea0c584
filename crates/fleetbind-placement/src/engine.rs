//! Placement engine: runs the full pipeline for one schedule policy.
//!
//! ```text
//! check_clusters → resolve_targets → distribute → OverrideBuilder (per resource × cluster)
//! ```
//!
//! The result is the binding spec the scheduler hands to the binding writer.
//! Any error aborts the whole computation; nothing partial is returned.

use serde::Serialize;
use tracing::{debug, info};

use fleetbind_state::{BindingCluster, BindingResource, BindingSpec, SchedulePolicy};

use crate::availability::check_clusters;
use crate::directory::{ClusterDirectory, ResourceCatalog};
use crate::distributor::{Strategy, TargetPlacement, distribute};
use crate::error::PlacementResult;
use crate::failover::resolve_targets;
use crate::overrides::OverrideBuilder;

/// Outcome of one placement computation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PlacementPlan {
    pub policy: String,
    pub strategy: Strategy,
    pub placements: Vec<TargetPlacement>,
    pub spec: BindingSpec,
}

/// Compute the binding spec for `policy`.
pub fn compute_binding(
    policy: &SchedulePolicy,
    directory: &impl ClusterDirectory,
    catalog: &impl ResourceCatalog,
) -> PlacementResult<PlacementPlan> {
    let key = policy.table_key();
    let spec = &policy.spec;

    let report = check_clusters(spec, directory)?;
    let targets = resolve_targets(&report)?;
    let (strategy, placements) = distribute(spec, &report, &targets)?;

    let namespace_labels = catalog.namespace_labels(&policy.namespace)?;
    let builder = OverrideBuilder::new(&policy.namespace, &namespace_labels);

    let mut resources = Vec::with_capacity(spec.resources.len());
    for name in &spec.resources {
        let descriptor = catalog.placed_resource(&policy.namespace, name)?;
        let clusters = placements
            .iter()
            .map(|p| BindingCluster {
                name: p.cluster.clone(),
                overrides: builder.build(&descriptor, p),
            })
            .collect();
        debug!(policy = %key, resource = %name, "resource placed");
        resources.push(BindingResource {
            name: name.clone(),
            clusters,
        });
    }

    info!(
        policy = %key,
        ?strategy,
        clusters = placements.len(),
        resources = resources.len(),
        substituted = placements.iter().filter(|p| p.substituted_for.is_some()).count(),
        "placement computed"
    );

    Ok(PlacementPlan {
        policy: key,
        strategy,
        placements,
        spec: BindingSpec { resources },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlacementError;
    use crate::testing::*;
    use fleetbind_core::{NAMESPACE_PATH, namespace_mapping_label};
    use fleetbind_state::{JsonPatch, Labels, Namespace, StateStore};

    fn cluster_names(spec: &BindingSpec, resource: usize) -> Vec<&str> {
        spec.resources[resource]
            .clusters
            .iter()
            .map(|c| c.name.as_str())
            .collect()
    }

    #[test]
    fn all_online_duplicated_binds_primaries_unmodified() {
        let store = store_with_clusters(&[
            ("cluster1", true),
            ("cluster2", true),
            ("cluster3", true),
        ]);
        put_resource(&store, "web", None);
        let policy = policy_from(assign_spec(&["cluster1", "cluster2", "cluster3"], 5));

        let plan = compute_binding(&policy, &store, &store).unwrap();

        assert_eq!(plan.strategy, Strategy::Duplicated);
        assert_eq!(cluster_names(&plan.spec, 0), vec!["cluster1", "cluster2", "cluster3"]);
        assert!(plan.placements.iter().all(|p| p.substituted_for.is_none()));
    }

    #[test]
    fn one_entry_per_resource_in_declared_order() {
        let store = store_with_clusters(&[("c1", true)]);
        put_resource(&store, "web", Some("/spec/replicas"));
        put_resource(&store, "worker", Some("/spec/parallelism"));
        let mut spec = assign_spec(&["c1"], 2);
        spec.resources = vec!["worker".to_string(), "web".to_string()];

        let plan = compute_binding(&policy_from(spec), &store, &store).unwrap();

        let names: Vec<&str> = plan.spec.resources.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["worker", "web"]);
        assert_eq!(
            plan.spec.resources[0].clusters[0].overrides,
            vec![JsonPatch::replace("/spec/parallelism", "2")]
        );
    }

    #[test]
    fn namespace_mapping_follows_replica_override() {
        let store = store_with_clusters(&[("c1", true), ("c2", true)]);
        put_resource(&store, "web", Some("/spec/replicas"));
        let mut labels = Labels::new();
        labels.insert(namespace_mapping_label("c2", "default"), "web-prod".to_string());
        store
            .put_namespace(&Namespace {
                name: "default".to_string(),
                labels,
            })
            .unwrap();

        let policy = policy_from(assign_spec(&["c1", "c2"], 3));
        let plan = compute_binding(&policy, &store, &store).unwrap();

        let clusters = &plan.spec.resources[0].clusters;
        assert_eq!(clusters[0].overrides, vec![JsonPatch::replace("/spec/replicas", "3")]);
        assert_eq!(
            clusters[1].overrides,
            vec![
                JsonPatch::replace("/spec/replicas", "3"),
                JsonPatch::replace(NAMESPACE_PATH, "web-prod"),
            ]
        );
    }

    #[test]
    fn capacity_error_produces_no_plan() {
        let store = store_with_clusters(&[("c1", false), ("c2", false), ("spare", true)]);
        put_resource(&store, "web", None);
        let mut spec = assign_spec(&["c1", "c2"], 2);
        spec.failover_policy = vec![failover_cluster("spare")];

        let err = compute_binding(&policy_from(spec), &store, &store).unwrap_err();
        assert!(matches!(err, PlacementError::CapacityExceeded { available: 1, .. }));
    }

    #[test]
    fn missing_descriptor_is_lookup_failure() {
        let store = store_with_clusters(&[("c1", true)]);
        let policy = policy_from(assign_spec(&["c1"], 1));
        let err = compute_binding(&policy, &store, &store).unwrap_err();
        assert!(matches!(err, PlacementError::NotFound { kind: "placed resource", .. }));
    }

    #[test]
    fn recovered_primary_replaces_substitute() {
        let store = store_with_clusters(&[("c1", false), ("spare", true)]);
        put_resource(&store, "web", None);
        let mut spec = assign_spec(&["c1"], 1);
        spec.failover_policy = vec![failover_cluster("spare")];
        let policy = policy_from(spec);

        let before = compute_binding(&policy, &store, &store).unwrap();
        assert_eq!(cluster_names(&before.spec, 0), vec!["spare"]);

        store
            .set_cluster_state("c1", fleetbind_state::ClusterState::Online)
            .unwrap();
        let after = compute_binding(&policy, &store, &store).unwrap();
        assert_eq!(cluster_names(&after.spec, 0), vec!["c1"]);
    }

    #[test]
    fn online_primary_in_failover_is_not_bound_twice() {
        let store = store_with_clusters(&[("c1", true), ("c2", false), ("spare", true)]);
        put_resource(&store, "web", Some("/spec/replicas"));
        let mut spec = weighted_spec(&[("c1", 1, 0, 8), ("c2", 3, 0, 8)], 8);
        spec.failover_policy = vec![failover_cluster("c1"), failover_cluster("spare")];

        let plan = compute_binding(&policy_from(spec), &store, &store).unwrap();

        let clusters = &plan.spec.resources[0].clusters;
        assert_eq!(cluster_names(&plan.spec, 0), vec!["c1", "spare"]);
        assert_eq!(clusters[0].overrides, vec![JsonPatch::replace("/spec/replicas", "2")]);
        assert_eq!(clusters[1].overrides, vec![JsonPatch::replace("/spec/replicas", "6")]);
    }

    #[test]
    fn role_set_namespace_mapping_is_keyed_by_role() {
        let store = store_with_clusters(&[("east", true), ("west", true)]);
        put_role_set(&store, "regional", &[("east", "primary"), ("west", "secondary")]);
        put_resource(&store, "web", Some("/spec/replicas"));
        let mut labels = Labels::new();
        labels.insert(namespace_mapping_label("secondary", "default"), "web-standby".to_string());
        labels.insert(namespace_mapping_label("east", "default"), "by-cluster-name".to_string());
        store
            .put_namespace(&Namespace {
                name: "default".to_string(),
                labels,
            })
            .unwrap();
        let spec = role_spec("regional", 4, &[("primary", 1), ("secondary", 1)]);

        let plan = compute_binding(&policy_from(spec), &store, &store).unwrap();

        assert_eq!(plan.strategy, Strategy::WeightedByRole);
        let clusters = &plan.spec.resources[0].clusters;
        assert_eq!(clusters[0].name, "east");
        assert_eq!(clusters[0].overrides, vec![JsonPatch::replace("/spec/replicas", "2")]);
        assert_eq!(clusters[1].name, "west");
        assert_eq!(
            clusters[1].overrides,
            vec![
                JsonPatch::replace("/spec/replicas", "2"),
                JsonPatch::replace(NAMESPACE_PATH, "web-standby"),
            ]
        );
    }

    #[test]
    fn empty_store_fails_lookup() {
        let store = StateStore::open_in_memory().unwrap();
        let policy = policy_from(assign_spec(&["c1"], 1));
        let err = compute_binding(&policy, &store, &store).unwrap_err();
        assert!(matches!(err, PlacementError::NotFound { kind: "cluster", .. }));
    }
}
