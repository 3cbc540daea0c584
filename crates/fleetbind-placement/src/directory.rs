//! Read-only lookups the placement engine consumes.
//!
//! [`ClusterDirectory`] answers cluster status and cluster-set membership;
//! [`ResourceCatalog`] answers placed-resource descriptors and namespace
//! labels. Both are implemented for [`StateStore`].

use fleetbind_state::{Cluster, ClusterSet, Labels, PlacedResource, StateStore};

use crate::error::{PlacementError, PlacementResult};

/// Cluster and cluster-set lookups.
pub trait ClusterDirectory {
    /// Fetch one cluster by name.
    fn cluster(&self, name: &str) -> PlacementResult<Cluster>;

    /// Fetch one cluster set by name.
    fn cluster_set(&self, name: &str) -> PlacementResult<ClusterSet>;

    /// Every cluster whose labels satisfy `selector`.
    ///
    /// Implementations must return clusters in ascending name order: failover
    /// cursors and primary positions depend on a stable expansion order.
    fn clusters_matching(&self, selector: &Labels) -> PlacementResult<Vec<Cluster>>;
}

/// Descriptor and namespace lookups used to build overrides.
pub trait ResourceCatalog {
    fn placed_resource(&self, namespace: &str, name: &str) -> PlacementResult<PlacedResource>;

    /// Labels of a namespace. Unknown namespaces carry no labels.
    fn namespace_labels(&self, namespace: &str) -> PlacementResult<Labels>;
}

impl ClusterDirectory for StateStore {
    fn cluster(&self, name: &str) -> PlacementResult<Cluster> {
        self.get_cluster(name)?
            .ok_or_else(|| PlacementError::not_found("cluster", name))
    }

    fn cluster_set(&self, name: &str) -> PlacementResult<ClusterSet> {
        self.get_cluster_set(name)?
            .ok_or_else(|| PlacementError::not_found("cluster set", name))
    }

    fn clusters_matching(&self, selector: &Labels) -> PlacementResult<Vec<Cluster>> {
        // The clusters table is keyed by name, so iteration order is already sorted.
        Ok(self
            .list_clusters()?
            .into_iter()
            .filter(|c| c.matches(selector))
            .collect())
    }
}

impl ResourceCatalog for StateStore {
    fn placed_resource(&self, namespace: &str, name: &str) -> PlacementResult<PlacedResource> {
        self.get_resource(namespace, name)?.ok_or_else(|| {
            PlacementError::not_found("placed resource", format!("{namespace}/{name}"))
        })
    }

    fn namespace_labels(&self, namespace: &str) -> PlacementResult<Labels> {
        Ok(self
            .get_namespace(namespace)?
            .map(|ns| ns.labels)
            .unwrap_or_default())
    }
}
