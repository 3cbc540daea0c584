//! redb table definitions for the fleetbind state store.
//!
//! Each table uses `&str` keys and `&[u8]` values (JSON-serialized domain types).
//! Namespaced tables are keyed by `{namespace}/{name}`, cluster-scoped ones by name.

use redb::TableDefinition;

/// Schedule policies keyed by `{namespace}/{name}`.
pub const POLICIES: TableDefinition<&str, &[u8]> = TableDefinition::new("policies");

/// Member clusters keyed by `{name}`.
pub const CLUSTERS: TableDefinition<&str, &[u8]> = TableDefinition::new("clusters");

/// Cluster sets keyed by `{name}`.
pub const CLUSTER_SETS: TableDefinition<&str, &[u8]> = TableDefinition::new("cluster_sets");

/// Bindings keyed by `{namespace}/{name}`.
pub const BINDINGS: TableDefinition<&str, &[u8]> = TableDefinition::new("bindings");

/// Placed-resource descriptors keyed by `{namespace}/{name}`.
pub const RESOURCES: TableDefinition<&str, &[u8]> = TableDefinition::new("resources");

/// Namespaces keyed by `{name}`.
pub const NAMESPACES: TableDefinition<&str, &[u8]> = TableDefinition::new("namespaces");
