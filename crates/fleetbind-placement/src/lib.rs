//! fleetbind placement engine: availability, failover, replica distribution.
//!
//! This crate decides, for one schedule policy, which member clusters
//! receive the policy's resources, how many replicas each runs, and which
//! field overrides apply. It does NOT persist anything (that's
//! `fleetbind-scheduler`, which owns the binding writer). Instead, it
//! produces a [`PlacementPlan`] whose binding spec the scheduler writes.
//!
//! # Components
//!
//! - **`directory`**: Read-only cluster, cluster-set, and descriptor lookups
//! - **`availability`**: Primary classification and failover capacity
//! - **`failover`**: Cursor-based substitution of unavailable primaries
//! - **`distributor`**: Duplicated / weighted replica strategies
//! - **`overrides`**: Replica and namespace-mapping patches
//! - **`engine`**: The end-to-end pipeline

pub mod availability;
pub mod directory;
pub mod distributor;
pub mod engine;
pub mod error;
pub mod failover;
pub mod overrides;

#[cfg(test)]
pub(crate) mod testing;

pub use availability::{AvailabilityReport, FailoverPool, PrimarySource, check_clusters};
pub use directory::{ClusterDirectory, ResourceCatalog};
pub use distributor::{Strategy, TargetPlacement, distribute, weighted_shares};
pub use engine::{PlacementPlan, compute_binding};
pub use error::{PlacementError, PlacementResult};
pub use failover::{FailoverCursor, Target, resolve_targets};
pub use overrides::OverrideBuilder;
