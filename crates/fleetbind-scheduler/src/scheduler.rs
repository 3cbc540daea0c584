//! Scheduler: reconciles one schedule policy into its binding.
//!
//! A reconcile loads the policy, runs the placement engine against the
//! store, writes the resulting binding if it changed, and stamps the
//! policy's status times. Placement failures abort before any write.

use std::time::{SystemTime, UNIX_EPOCH};

use serde::Serialize;
use tracing::{debug, info};

use fleetbind_placement::{PlacementPlan, compute_binding};
use fleetbind_state::{Binding, SchedulePolicy, StateStore};

use crate::binding_writer::{WriteOutcome, candidate_binding, write_binding};
use crate::error::{SchedulerError, SchedulerResult};

/// Result of a reconcile that ran the engine.
#[derive(Debug, Clone, Serialize)]
pub struct ScheduleOutcome {
    pub policy: String,
    pub write: WriteOutcome,
    pub binding: Binding,
    pub plan: PlacementPlan,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum ReconcileOutcome {
    /// The policy has `reschedule` turned off.
    Skipped { policy: String },
    Scheduled(ScheduleOutcome),
}

/// Runs placement for policies held in the state store.
#[derive(Clone)]
pub struct Scheduler {
    state: StateStore,
}

impl Scheduler {
    pub fn new(state: StateStore) -> Self {
        Self { state }
    }

    pub fn state(&self) -> &StateStore {
        &self.state
    }

    /// Compute the placement for a policy without writing anything.
    pub fn plan(&self, key: &str) -> SchedulerResult<PlacementPlan> {
        let policy = self.load_policy(key)?;
        Ok(compute_binding(&policy, &self.state, &self.state)?)
    }

    /// Reconcile a policy end to end.
    pub fn reconcile(&self, key: &str) -> SchedulerResult<ReconcileOutcome> {
        let mut policy = self.load_policy(key)?;
        if !policy.spec.reschedule {
            debug!(policy = %key, "reschedule disabled, skipping");
            return Ok(ReconcileOutcome::Skipped {
                policy: key.to_string(),
            });
        }

        let plan = compute_binding(&policy, &self.state, &self.state)?;
        let candidate = candidate_binding(&policy, plan.spec.clone());
        let (write, binding) = write_binding(&self.state, &candidate)?;

        let now = epoch_secs();
        policy.status.last_schedule_time = Some(now);
        if write.wrote() {
            policy.status.last_modify_time = Some(now);
        }
        self.state.put_policy(&policy)?;

        info!(
            policy = %key,
            binding = %binding.table_key(),
            ?write,
            version = binding.resource_version,
            "policy reconciled"
        );

        Ok(ReconcileOutcome::Scheduled(ScheduleOutcome {
            policy: key.to_string(),
            write,
            binding,
            plan,
        }))
    }

    fn load_policy(&self, key: &str) -> SchedulerResult<SchedulePolicy> {
        self.state
            .get_policy(key)?
            .ok_or_else(|| SchedulerError::PolicyNotFound(key.to_string()))
    }
}

fn epoch_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::*;
    use fleetbind_placement::PlacementError;
    use fleetbind_state::{ClusterState, JsonPatch};

    fn scheduled(outcome: ReconcileOutcome) -> ScheduleOutcome {
        match outcome {
            ReconcileOutcome::Scheduled(s) => s,
            other => panic!("expected scheduled, got {other:?}"),
        }
    }

    #[test]
    fn first_reconcile_creates_binding_and_stamps_status() {
        let state = fixture_store();
        put_policy(&state, "web", assign_policy(&["cluster1", "cluster2", "cluster3"], 5));
        let scheduler = Scheduler::new(state.clone());

        let outcome = scheduled(scheduler.reconcile("default/web").unwrap());

        assert_eq!(outcome.write, WriteOutcome::Created);
        assert_eq!(outcome.binding.name, "web-binding");
        let clusters: Vec<&str> = outcome.binding.spec.resources[0]
            .clusters
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(clusters, vec!["cluster1", "cluster2", "cluster3"]);

        let policy = state.get_policy("default/web").unwrap().unwrap();
        assert!(policy.status.last_schedule_time.is_some());
        assert_eq!(policy.status.last_modify_time, policy.status.last_schedule_time);
    }

    #[test]
    fn second_reconcile_is_a_no_op_write() {
        let state = fixture_store();
        put_policy(&state, "web", assign_policy(&["cluster1", "cluster2"], 2));
        let scheduler = Scheduler::new(state.clone());

        scheduler.reconcile("default/web").unwrap();
        let second = scheduled(scheduler.reconcile("default/web").unwrap());

        assert_eq!(second.write, WriteOutcome::Unchanged);
        assert_eq!(second.binding.resource_version, 1);
        let policy = state.get_policy("default/web").unwrap().unwrap();
        assert!(policy.status.last_schedule_time.is_some());
    }

    #[test]
    fn cluster_going_offline_updates_binding() {
        let state = fixture_store();
        let mut spec = assign_policy(&["cluster1", "cluster2"], 2);
        spec.failover_policy = vec![failover("cluster3")];
        put_policy(&state, "web", spec);
        let scheduler = Scheduler::new(state.clone());
        scheduler.reconcile("default/web").unwrap();

        state.set_cluster_state("cluster2", ClusterState::Offline).unwrap();
        let outcome = scheduled(scheduler.reconcile("default/web").unwrap());

        assert_eq!(outcome.write, WriteOutcome::Updated);
        assert_eq!(outcome.binding.resource_version, 2);
        assert_eq!(outcome.binding.spec.resources[0].clusters[1].name, "cluster3");
        assert_eq!(
            outcome.binding.spec.resources[0].clusters[1].overrides,
            vec![JsonPatch::replace("/spec/replicas", "2")]
        );
    }

    #[test]
    fn capacity_error_leaves_no_binding() {
        let state = fixture_store();
        state.set_cluster_state("cluster1", ClusterState::Offline).unwrap();
        state.set_cluster_state("cluster2", ClusterState::Offline).unwrap();
        let mut spec = assign_policy(&["cluster1", "cluster2"], 2);
        spec.failover_policy = vec![failover("cluster3")];
        put_policy(&state, "web", spec);
        let scheduler = Scheduler::new(state.clone());

        let err = scheduler.reconcile("default/web").unwrap_err();

        assert!(matches!(
            err,
            SchedulerError::Placement(PlacementError::CapacityExceeded { available: 1, .. })
        ));
        assert!(err.is_transient());
        assert!(state.get_binding("default", "web-binding").unwrap().is_none());
        let policy = state.get_policy("default/web").unwrap().unwrap();
        assert!(policy.status.last_schedule_time.is_none());
    }

    #[test]
    fn reschedule_off_skips_engine() {
        let state = fixture_store();
        let mut spec = assign_policy(&["cluster1"], 1);
        spec.reschedule = false;
        put_policy(&state, "web", spec);

        let outcome = Scheduler::new(state.clone()).reconcile("default/web").unwrap();

        assert!(matches!(outcome, ReconcileOutcome::Skipped { .. }));
        assert!(state.get_binding("default", "web-binding").unwrap().is_none());
    }

    #[test]
    fn plan_does_not_write() {
        let state = fixture_store();
        put_policy(&state, "web", assign_policy(&["cluster1"], 1));

        let plan = Scheduler::new(state.clone()).plan("default/web").unwrap();

        assert_eq!(plan.policy, "default/web");
        assert!(state.get_binding("default", "web-binding").unwrap().is_none());
    }

    #[test]
    fn unknown_policy() {
        let scheduler = Scheduler::new(fixture_store());
        let err = scheduler.reconcile("default/missing").unwrap_err();
        assert!(matches!(err, SchedulerError::PolicyNotFound(_)));
        assert!(!err.is_transient());
    }

    #[test]
    fn epoch_secs_returns_reasonable_value() {
        // After 2024-01-01.
        assert!(epoch_secs() > 1_704_067_200);
    }
}
