//! Replica distribution across resolved target clusters.
//!
//! Four strategies, selected by how the primary list was produced and by the
//! policy's schedule mode:
//!
//! | primary source | schedule mode | strategy             |
//! |----------------|---------------|----------------------|
//! | Assign         | Duplicated    | `Duplicated`         |
//! | Assign         | Weighted      | `WeightedByCluster`  |
//! | role set       | (ignored)     | `WeightedByRole`     |
//! | selector set   | (ignored)     | `SelectorDuplicated` |
//!
//! # Weighted allocation
//!
//! ```text
//! raw    = floor(replicas / total_weight * weight)
//! value  = clamp(raw, min, max)
//! owed   = replicas - sum(value)
//! ```
//!
//! A non-zero `owed` is spread by [`redistribute`]: first an even `owed / n`
//! step toward each entry's bound, then single units in descending-weight
//! order until nothing is owed or every entry sits at its bound.

use serde::Serialize;
use tracing::{debug, warn};

use fleetbind_state::{PolicyEntry, ScheduleMode, SchedulePolicySpec};

use crate::availability::{AvailabilityReport, PrimarySource};
use crate::error::{PlacementError, PlacementResult};
use crate::failover::Target;

/// Replica distribution strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Strategy {
    Duplicated,
    SelectorDuplicated,
    WeightedByCluster,
    WeightedByRole,
}

/// Choose the strategy for a policy whose primaries came from `source`.
pub fn select_strategy(source: PrimarySource, mode: ScheduleMode) -> Strategy {
    match (source, mode) {
        (PrimarySource::Assign, ScheduleMode::Duplicated) => Strategy::Duplicated,
        (PrimarySource::Assign, ScheduleMode::Weighted) => Strategy::WeightedByCluster,
        (PrimarySource::RoleSet, _) => Strategy::WeightedByRole,
        (PrimarySource::SelectorSet, _) => Strategy::SelectorDuplicated,
    }
}

/// Replica decision for one target cluster.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TargetPlacement {
    pub cluster: String,
    /// Key used for namespace-mapping lookups: the role for role-based
    /// sets, the target cluster name otherwise.
    pub mapping_key: String,
    /// `None` when no replica override applies.
    pub replicas: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub substituted_for: Option<String>,
}

/// Compute per-target replica counts.
pub fn distribute(
    spec: &SchedulePolicySpec,
    report: &AvailabilityReport,
    targets: &[Target],
) -> PlacementResult<(Strategy, Vec<TargetPlacement>)> {
    let strategy = select_strategy(report.source, spec.schedule_mode);

    let placements = match strategy {
        Strategy::Duplicated | Strategy::SelectorDuplicated => targets
            .iter()
            .map(|t| placement(t, t.name.clone(), Some(spec.replicas)))
            .collect(),
        Strategy::WeightedByCluster => {
            let shares = weighted_shares(spec.replicas, &spec.policy)?;
            targets
                .iter()
                .map(|t| placement(t, t.name.clone(), shares.get(t.primary).copied()))
                .collect()
        }
        Strategy::WeightedByRole => {
            let shares = weighted_shares(spec.replicas, &spec.policy)?;
            // Every cluster of a role receives the full role share; the share
            // is not divided among the role's clusters.
            targets
                .iter()
                .map(|t| {
                    let role = t.role.clone().unwrap_or_default();
                    let share = spec
                        .policy
                        .iter()
                        .position(|e| e.role.as_deref() == Some(role.as_str()))
                        .map(|i| shares[i]);
                    if share.is_none() {
                        warn!(
                            cluster = %t.name,
                            %role,
                            "no policy entry for role, skipping replica override"
                        );
                    }
                    placement(t, role, share)
                })
                .collect()
        }
    };

    debug!(?strategy, targets = targets.len(), "replicas distributed");
    Ok((strategy, placements))
}

fn placement(target: &Target, mapping_key: String, replicas: Option<u32>) -> TargetPlacement {
    TargetPlacement {
        cluster: target.name.clone(),
        mapping_key,
        replicas,
        substituted_for: target.substituted_for.clone(),
    }
}

/// Weighted allocation of `replicas` over `entries`, one value per entry.
///
/// Every value lies within its entry's `[min, max]`. The values sum to
/// `replicas` whenever the bounds admit such an assignment.
pub fn weighted_shares(replicas: u32, entries: &[PolicyEntry]) -> PlacementResult<Vec<u32>> {
    for (i, entry) in entries.iter().enumerate() {
        if entry.lower_bound() > entry.upper_bound() {
            return Err(PlacementError::InvalidPolicy(format!(
                "policy entry {i} has min {} greater than max {}",
                entry.lower_bound(),
                entry.upper_bound()
            )));
        }
    }

    let total_weight: u64 = entries.iter().map(|e| u64::from(e.weight)).sum();
    if total_weight == 0 {
        return Err(PlacementError::InvalidPolicy(
            "weighted scheduling requires a non-zero total weight".to_string(),
        ));
    }

    let per_weight = f64::from(replicas) / total_weight as f64;
    let mut values: Vec<u32> = entries
        .iter()
        .map(|e| {
            let raw = (per_weight * f64::from(e.weight)).floor() as u32;
            let value = raw.clamp(e.lower_bound(), e.upper_bound());
            if value != raw {
                debug!(raw, value, "weighted share clamped");
            }
            value
        })
        .collect();

    let assigned: i64 = values.iter().map(|&v| i64::from(v)).sum();
    let owed = i64::from(replicas) - assigned;
    if owed != 0 {
        redistribute(&mut values, entries, owed);
    }
    Ok(values)
}

/// Spread `owed` replicas (negative: surplus to take back) over `values`.
///
/// Stops silently when every entry has reached its bound.
pub fn redistribute(values: &mut [u32], entries: &[PolicyEntry], owed: i64) {
    if values.is_empty() || owed == 0 {
        return;
    }
    let raising = owed > 0;
    let count = values.len() as u64;
    let magnitude = owed.unsigned_abs();
    let fill = magnitude / count;
    let mut add = magnitude % count;

    let room = |value: u32, entry: &PolicyEntry| -> u64 {
        if raising {
            u64::from(entry.upper_bound() - value)
        } else {
            u64::from(value - entry.lower_bound())
        }
    };

    // Pass 1: even step toward each bound; shortfall carries into `add`.
    if fill > 0 {
        for (value, entry) in values.iter_mut().zip(entries) {
            let step = fill.min(room(*value, entry));
            // `step <= room`, so the result stays within u32 bounds.
            let step32 = step as u32;
            if raising {
                *value += step32;
            } else {
                *value -= step32;
            }
            add += fill - step;
        }
    }

    // Pass 2: one unit at a time, heaviest entries first.
    let mut order: Vec<usize> = (0..values.len()).collect();
    order.sort_by(|&a, &b| entries[b].weight.cmp(&entries[a].weight));

    let mut cursor = 0;
    while add > 0 && !order.is_empty() {
        if cursor >= order.len() {
            cursor = 0;
        }
        let idx = order[cursor];
        if room(values[idx], &entries[idx]) == 0 {
            order.remove(cursor);
            continue;
        }
        if raising {
            values[idx] += 1;
        } else {
            values[idx] -= 1;
        }
        add -= 1;
        cursor += 1;
    }

    if add > 0 {
        debug!(unplaced = add, raising, "replica bounds exhausted during redistribution");
    }
}
