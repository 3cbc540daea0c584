//! Test fixtures: three online clusters and one replica-bearing resource.

use fleetbind_state::*;

pub fn fixture_store() -> StateStore {
    let state = StateStore::open_in_memory().unwrap();
    for name in ["cluster1", "cluster2", "cluster3"] {
        state
            .put_cluster(&Cluster {
                name: name.to_string(),
                labels: Labels::new(),
                status: ClusterStatus {
                    status: ClusterState::Online,
                },
            })
            .unwrap();
    }
    state
        .put_resource(&PlacedResource {
            namespace: "default".to_string(),
            name: "web".to_string(),
            replica_path: Some("/spec/replicas".to_string()),
        })
        .unwrap();
    state
}

pub fn assign_policy(clusters: &[&str], replicas: u32) -> SchedulePolicySpec {
    SchedulePolicySpec {
        resources: vec!["web".to_string()],
        cluster_source: ClusterSource::Assign,
        clusterset: None,
        replicas,
        schedule_mode: ScheduleMode::Duplicated,
        policy: clusters
            .iter()
            .map(|c| PolicyEntry {
                name: Some(c.to_string()),
                weight: 1,
                ..Default::default()
            })
            .collect(),
        failover_policy: Vec::new(),
        reschedule: true,
    }
}

pub fn failover(cluster: &str) -> FailoverEntry {
    FailoverEntry {
        name: cluster.to_string(),
        kind: FailoverKind::Clusters,
    }
}

pub fn put_policy(state: &StateStore, name: &str, spec: SchedulePolicySpec) {
    state
        .put_policy(&SchedulePolicy {
            namespace: "default".to_string(),
            name: name.to_string(),
            uid: format!("uid-{name}"),
            spec,
            status: SchedulePolicyStatus::default(),
        })
        .unwrap();
}
