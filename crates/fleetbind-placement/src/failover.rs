//! Failover resolution: substitutes failover clusters for unavailable primaries.
//!
//! A [`FailoverCursor`] walks the [`FailoverPool`] snapshot in declared order.
//! Single-cluster entries are consumed whole; cluster-set entries are consumed
//! member by member, so one set can serve several unavailable primaries before
//! the cursor moves on. Offline failover members are skipped.

use tracing::debug;

use fleetbind_state::FailoverKind;

use crate::availability::{AvailabilityReport, FailoverPool};
use crate::error::{PlacementError, PlacementResult};

/// Substitution state for one resolver session.
///
/// Construct one per cluster-list build; it is never shared between policies.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailoverCursor {
    /// Current entry in the failover pool.
    pub failover_index: usize,
    /// Next member to inspect inside a cluster-set entry.
    pub cluster_set_index: usize,
    /// Position in `FailoverPool::unavailable` of the next offline member the
    /// walk will meet.
    pub unavailable_failover_index: usize,
    /// Substitutions handed out so far.
    pub done: usize,
}

impl FailoverCursor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the substitute for the next unavailable primary.
    ///
    /// Returns `None` once the pool is exhausted.
    pub fn next_substitute(&mut self, pool: &FailoverPool) -> Option<String> {
        while let Some(entry) = pool.entries.get(self.failover_index) {
            let member = match entry.kind {
                FailoverKind::Clusters => {
                    self.failover_index += 1;
                    match entry.members.first() {
                        Some(member) => member,
                        None => continue,
                    }
                }
                FailoverKind::ClusterSet => {
                    let Some(member) = entry.members.get(self.cluster_set_index) else {
                        self.cluster_set_index = 0;
                        self.failover_index += 1;
                        continue;
                    };
                    self.cluster_set_index += 1;
                    if self.cluster_set_index == entry.members.len() {
                        self.cluster_set_index = 0;
                        self.failover_index += 1;
                    }
                    member
                }
            };

            if member.online {
                self.done += 1;
                return Some(member.name.clone());
            }

            // The pool records offline members in walk order.
            debug_assert_eq!(
                pool.unavailable.get(self.unavailable_failover_index),
                Some(&member.name)
            );
            if self.unavailable_failover_index + 1 < pool.unavailable.len() {
                self.unavailable_failover_index += 1;
            }
            debug!(
                cluster = %member.name,
                source = %entry.source,
                "skipping offline failover cluster"
            );
        }
        None
    }
}

/// A resolved placement target: a primary or its substitute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    /// Cluster that will receive the resources.
    pub name: String,
    /// Position of the primary this target stands for.
    pub primary: usize,
    /// Role inherited from the primary, for role-based cluster sets.
    pub role: Option<String>,
    /// Name of the unavailable primary this target replaces.
    pub substituted_for: Option<String>,
}

/// Resolve every primary to a target cluster, substituting in ascending
/// primary order.
pub fn resolve_targets(report: &AvailabilityReport) -> PlacementResult<Vec<Target>> {
    let mut cursor = FailoverCursor::new();
    let mut targets = Vec::with_capacity(report.primaries.len());

    for (i, primary) in report.primaries.iter().enumerate() {
        if primary.online {
            targets.push(Target {
                name: primary.name.clone(),
                primary: i,
                role: primary.role.clone(),
                substituted_for: None,
            });
            continue;
        }

        let substitute = report
            .failover
            .as_ref()
            .and_then(|pool| cursor.next_substitute(pool))
            .ok_or_else(|| PlacementError::CapacityExceeded {
                unavailable: report.unavailable_names(),
                available: cursor.done,
            })?;

        debug!(unavailable = %primary.name, substitute = %substitute, "failover substitution");
        targets.push(Target {
            name: substitute,
            primary: i,
            role: primary.role.clone(),
            substituted_for: Some(primary.name.clone()),
        });
    }

    Ok(targets)
}
