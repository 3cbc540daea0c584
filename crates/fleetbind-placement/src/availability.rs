//! Availability checking: classifies primary clusters and sizes the failover pool.
//!
//! The primary list comes from the policy entries (`Assign`) or from the
//! referenced cluster set (explicit role list or label-selector expansion).
//! When some primaries are not online, the failover policy is expanded once
//! into a [`FailoverPool`] snapshot that the resolver later walks, so both
//! steps always see the same member order.

use std::collections::BTreeSet;

use tracing::{debug, warn};

use fleetbind_state::{
    ClusterSet, ClusterSource, FailoverEntry, FailoverKind, Membership, SchedulePolicySpec,
};

use crate::directory::ClusterDirectory;
use crate::error::{PlacementError, PlacementResult};

/// How the primary cluster list was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrimarySource {
    /// Policy entries name clusters directly.
    Assign,
    /// Cluster set with an explicit `{name, role}` list.
    RoleSet,
    /// Cluster set with a label selector.
    SelectorSet,
}

/// One primary cluster and its current availability.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Primary {
    pub name: String,
    /// Declared role, for role-based cluster sets.
    pub role: Option<String>,
    pub online: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolMember {
    pub name: String,
    pub online: bool,
}

/// A failover policy entry expanded to its members.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolEntry {
    pub kind: FailoverKind,
    /// Name declared in the failover policy (cluster or cluster set).
    pub source: String,
    /// A `Clusters` entry always has exactly one member.
    pub members: Vec<PoolMember>,
}

/// Ordered failover pool snapshot.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FailoverPool {
    pub entries: Vec<PoolEntry>,
    /// Number of online failover members.
    pub capacity: usize,
    /// Offline failover members, in encounter order.
    pub unavailable: Vec<String>,
}

/// Result of [`check_clusters`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityReport {
    pub source: PrimarySource,
    pub primaries: Vec<Primary>,
    /// Ascending positions in `primaries` that are not online.
    pub unavailable_index: Vec<usize>,
    /// Present only when some primary is unavailable.
    pub failover: Option<FailoverPool>,
}

impl AvailabilityReport {
    pub fn unavailable_names(&self) -> Vec<String> {
        self.unavailable_index
            .iter()
            .map(|&i| self.primaries[i].name.clone())
            .collect()
    }
}

/// Classify every primary cluster and, if needed, verify failover capacity.
///
/// Fails without producing any partial result when unavailable primaries
/// cannot all be replaced.
pub fn check_clusters(
    spec: &SchedulePolicySpec,
    directory: &impl ClusterDirectory,
) -> PlacementResult<AvailabilityReport> {
    let (source, primaries) = primary_clusters(spec, directory)?;

    let unavailable_index: Vec<usize> = primaries
        .iter()
        .enumerate()
        .filter(|(_, p)| !p.online)
        .map(|(i, _)| i)
        .collect();

    let mut report = AvailabilityReport {
        source,
        primaries,
        unavailable_index,
        failover: None,
    };

    if report.unavailable_index.is_empty() {
        debug!(clusters = report.primaries.len(), "all primary clusters online");
        return Ok(report);
    }

    let unavailable = report.unavailable_names();
    if spec.failover_policy.is_empty() {
        warn!(?unavailable, "primary clusters unavailable without failover policy");
        return Err(PlacementError::NoFailoverPolicy(unavailable));
    }

    let pool = failover_policy_check(&spec.failover_policy, &report.primaries, directory)?;
    if unavailable.len() > pool.capacity {
        warn!(
            ?unavailable,
            available = pool.capacity,
            "not enough failover clusters"
        );
        return Err(PlacementError::CapacityExceeded {
            unavailable,
            available: pool.capacity,
        });
    }

    debug!(
        ?unavailable,
        capacity = pool.capacity,
        offline_failover = ?pool.unavailable,
        "failover required"
    );
    report.failover = Some(pool);
    Ok(report)
}

/// Expand the failover policy, in declared order, into a pool snapshot.
///
/// Online primaries already receive the resources, so they are left out of
/// the pool. A cluster listed by several entries is kept only where it first
/// appears.
pub fn failover_policy_check(
    entries: &[FailoverEntry],
    primaries: &[Primary],
    directory: &impl ClusterDirectory,
) -> PlacementResult<FailoverPool> {
    let mut pool = FailoverPool::default();
    let mut seen: BTreeSet<String> = primaries
        .iter()
        .filter(|p| p.online)
        .map(|p| p.name.clone())
        .collect();

    for entry in entries {
        let members = match entry.kind {
            FailoverKind::Clusters => {
                let cluster = directory.cluster(&entry.name)?;
                vec![PoolMember {
                    online: cluster.is_online(),
                    name: cluster.name,
                }]
            }
            FailoverKind::ClusterSet => {
                let set = directory.cluster_set(&entry.name)?;
                set_members(&set, directory)?
                    .into_iter()
                    .map(|p| PoolMember {
                        name: p.name,
                        online: p.online,
                    })
                    .collect()
            }
        };

        let members: Vec<PoolMember> = members
            .into_iter()
            .filter(|m| {
                let fresh = seen.insert(m.name.clone());
                if !fresh {
                    debug!(
                        cluster = %m.name,
                        source = %entry.name,
                        "failover member already placed"
                    );
                }
                fresh
            })
            .collect();

        for member in &members {
            if member.online {
                pool.capacity += 1;
            } else {
                pool.unavailable.push(member.name.clone());
            }
        }

        pool.entries.push(PoolEntry {
            kind: entry.kind,
            source: entry.name.clone(),
            members,
        });
    }

    Ok(pool)
}

fn primary_clusters(
    spec: &SchedulePolicySpec,
    directory: &impl ClusterDirectory,
) -> PlacementResult<(PrimarySource, Vec<Primary>)> {
    match spec.cluster_source {
        ClusterSource::Assign => {
            let mut primaries = Vec::with_capacity(spec.policy.len());
            for (i, entry) in spec.policy.iter().enumerate() {
                let name = entry.name.as_deref().ok_or_else(|| {
                    PlacementError::InvalidPolicy(format!("policy entry {i} has no cluster name"))
                })?;
                let cluster = directory.cluster(name)?;
                primaries.push(Primary {
                    online: cluster.is_online(),
                    name: cluster.name,
                    role: None,
                });
            }
            Ok((PrimarySource::Assign, primaries))
        }
        ClusterSource::ClusterSet => {
            let set_name = spec.clusterset.as_deref().ok_or_else(|| {
                PlacementError::InvalidPolicy(
                    "cluster source is cluster_set but no clusterset is named".into(),
                )
            })?;
            let set = directory.cluster_set(set_name)?;
            let source = match set.membership() {
                Some(Membership::Roles(_)) => PrimarySource::RoleSet,
                Some(Membership::Selector(_)) => PrimarySource::SelectorSet,
                None => return Err(invalid_membership(set_name)),
            };
            Ok((source, set_members(&set, directory)?))
        }
    }
}

/// Expand a cluster set into its members with their online status.
fn set_members(
    set: &ClusterSet,
    directory: &impl ClusterDirectory,
) -> PlacementResult<Vec<Primary>> {
    match set.membership() {
        Some(Membership::Roles(members)) => members
            .iter()
            .map(|m| {
                let cluster = directory.cluster(&m.name)?;
                Ok(Primary {
                    online: cluster.is_online(),
                    name: cluster.name,
                    role: Some(m.role.clone()),
                })
            })
            .collect(),
        Some(Membership::Selector(selector)) => Ok(directory
            .clusters_matching(selector)?
            .into_iter()
            .map(|c| Primary {
                online: c.is_online(),
                name: c.name,
                role: None,
            })
            .collect()),
        None => Err(invalid_membership(&set.name)),
    }
}

fn invalid_membership(name: &str) -> PlacementError {
    PlacementError::InvalidPolicy(format!(
        "cluster set {name} must declare exactly one of clusters or selector"
    ))
}
