//! Shared fixtures for placement unit tests.

use fleetbind_state::*;

pub fn store_with_clusters(clusters: &[(&str, bool)]) -> StateStore {
    let store = StateStore::open_in_memory().unwrap();
    for &(name, online) in clusters {
        store
            .put_cluster(&Cluster {
                name: name.to_string(),
                labels: Labels::new(),
                status: ClusterStatus {
                    status: if online {
                        ClusterState::Online
                    } else {
                        ClusterState::Offline
                    },
                },
            })
            .unwrap();
    }
    store
}

pub fn label_cluster(store: &StateStore, name: &str, key: &str, value: &str) {
    let mut cluster = store.get_cluster(name).unwrap().unwrap();
    cluster.labels.insert(key.to_string(), value.to_string());
    store.put_cluster(&cluster).unwrap();
}

pub fn put_role_set(store: &StateStore, name: &str, members: &[(&str, &str)]) {
    store
        .put_cluster_set(&ClusterSet {
            name: name.to_string(),
            clusters: members
                .iter()
                .map(|(n, r)| ClusterSetMember {
                    name: n.to_string(),
                    role: r.to_string(),
                })
                .collect(),
            selector: None,
        })
        .unwrap();
}

pub fn put_selector_set(store: &StateStore, name: &str, selector: &[(&str, &str)]) {
    store
        .put_cluster_set(&ClusterSet {
            name: name.to_string(),
            clusters: Vec::new(),
            selector: Some(
                selector
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect(),
            ),
        })
        .unwrap();
}

fn base_spec(cluster_source: ClusterSource, replicas: u32) -> SchedulePolicySpec {
    SchedulePolicySpec {
        resources: vec!["web".to_string()],
        cluster_source,
        clusterset: None,
        replicas,
        schedule_mode: ScheduleMode::Duplicated,
        policy: Vec::new(),
        failover_policy: Vec::new(),
        reschedule: true,
    }
}

/// Assign-mode spec with one weight-1, unbounded entry per cluster.
pub fn assign_spec(clusters: &[&str], replicas: u32) -> SchedulePolicySpec {
    let mut spec = base_spec(ClusterSource::Assign, replicas);
    spec.policy = clusters
        .iter()
        .map(|c| PolicyEntry {
            name: Some(c.to_string()),
            weight: 1,
            ..Default::default()
        })
        .collect();
    spec
}

/// Weighted Assign-mode spec from `(cluster, weight, min, max)` entries.
pub fn weighted_spec(entries: &[(&str, u32, u32, u32)], replicas: u32) -> SchedulePolicySpec {
    let mut spec = base_spec(ClusterSource::Assign, replicas);
    spec.schedule_mode = ScheduleMode::Weighted;
    spec.policy = entries
        .iter()
        .map(|&(name, weight, min, max)| PolicyEntry {
            name: Some(name.to_string()),
            role: None,
            weight,
            min: Some(min),
            max: Some(max),
        })
        .collect();
    spec
}

pub fn role_spec(set: &str, replicas: u32, roles: &[(&str, u32)]) -> SchedulePolicySpec {
    let mut spec = base_spec(ClusterSource::ClusterSet, replicas);
    spec.clusterset = Some(set.to_string());
    spec.policy = roles
        .iter()
        .map(|&(role, weight)| PolicyEntry {
            role: Some(role.to_string()),
            weight,
            ..Default::default()
        })
        .collect();
    spec
}

pub fn selector_spec(set: &str, replicas: u32) -> SchedulePolicySpec {
    let mut spec = base_spec(ClusterSource::ClusterSet, replicas);
    spec.clusterset = Some(set.to_string());
    spec
}

pub fn failover_cluster(name: &str) -> FailoverEntry {
    FailoverEntry {
        name: name.to_string(),
        kind: FailoverKind::Clusters,
    }
}

pub fn failover_set(name: &str) -> FailoverEntry {
    FailoverEntry {
        name: name.to_string(),
        kind: FailoverKind::ClusterSet,
    }
}

pub fn policy_from(spec: SchedulePolicySpec) -> SchedulePolicy {
    SchedulePolicy {
        namespace: "default".to_string(),
        name: "web".to_string(),
        uid: "uid-web".to_string(),
        spec,
        status: SchedulePolicyStatus::default(),
    }
}

pub fn put_resource(store: &StateStore, name: &str, replica_path: Option<&str>) {
    store
        .put_resource(&PlacedResource {
            namespace: "default".to_string(),
            name: name.to_string(),
            replica_path: replica_path.map(str::to_string),
        })
        .unwrap();
}
