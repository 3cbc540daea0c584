//! JSON manifests loaded by `fleetd apply`.
//!
//! A manifest carries any mix of clusters, cluster sets, namespaces,
//! placed-resource descriptors and schedule policies. Objects are written
//! in dependency order so a single file can describe a whole fleet.

use std::path::Path;

use anyhow::{Context, bail};
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use fleetbind_state::{Cluster, ClusterSet, Namespace, PlacedResource, SchedulePolicy, StateStore};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub clusters: Vec<Cluster>,
    #[serde(default)]
    pub cluster_sets: Vec<ClusterSet>,
    #[serde(default)]
    pub namespaces: Vec<Namespace>,
    #[serde(default)]
    pub resources: Vec<PlacedResource>,
    #[serde(default)]
    pub policies: Vec<SchedulePolicy>,
}

/// Number of objects written per kind.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ApplySummary {
    pub clusters: usize,
    pub cluster_sets: usize,
    pub namespaces: usize,
    pub resources: usize,
    pub policies: usize,
}

impl Manifest {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read {}", path.display()))?;
        let manifest: Manifest = serde_json::from_str(&content)
            .with_context(|| format!("failed to parse {}", path.display()))?;
        Ok(manifest)
    }

    fn validate(&self) -> anyhow::Result<()> {
        for policy in &self.policies {
            if policy.namespace.is_empty() || policy.name.is_empty() {
                bail!("schedule policy is missing a namespace or name");
            }
            if policy.uid.is_empty() {
                bail!("schedule policy {} has no uid", policy.table_key());
            }
        }
        Ok(())
    }

    /// Write every object to the store.
    ///
    /// Existing policies keep their status times; everything else is
    /// replaced as given.
    pub fn apply(&self, state: &StateStore) -> anyhow::Result<ApplySummary> {
        self.validate()?;

        for cluster in &self.clusters {
            state.put_cluster(cluster)?;
            debug!(cluster = %cluster.name, status = ?cluster.status.status, "cluster applied");
        }
        for set in &self.cluster_sets {
            state.put_cluster_set(set)?;
        }
        for namespace in &self.namespaces {
            state.put_namespace(namespace)?;
        }
        for resource in &self.resources {
            state.put_resource(resource)?;
        }
        for policy in &self.policies {
            let key = policy.table_key();
            let mut policy = policy.clone();
            if let Some(existing) = state.get_policy(&key)? {
                if existing.uid == policy.uid {
                    policy.status = existing.status;
                }
            }
            state.put_policy(&policy)?;
            debug!(policy = %key, "policy applied");
        }

        let summary = ApplySummary {
            clusters: self.clusters.len(),
            cluster_sets: self.cluster_sets.len(),
            namespaces: self.namespaces.len(),
            resources: self.resources.len(),
            policies: self.policies.len(),
        };
        info!(?summary, "manifest applied");
        Ok(summary)
    }
}
