//! StateStore: redb-backed state persistence for fleetbind.
//!
//! Provides typed CRUD operations over schedule policies, clusters, cluster
//! sets, placed resources, namespaces and bindings. All values are
//! JSON-serialized into redb's `&[u8]` value columns. The store supports both
//! on-disk and in-memory backends (the latter for testing).

use std::path::Path;
use std::sync::Arc;

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use fleetbind_core::object_key;

use crate::error::{StateError, StateResult};
use crate::tables::*;
use crate::types::*;

/// Convert any `Display` error into a `StateError` variant via a closure factory.
macro_rules! map_err {
    ($variant:ident) => {
        |e| StateError::$variant(e.to_string())
    };
}

type Table = TableDefinition<'static, &'static str, &'static [u8]>;

/// Thread-safe state store backed by redb.
#[derive(Clone)]
pub struct StateStore {
    db: Arc<Database>,
}

impl StateStore {
    /// Open (or create) a persistent state store at the given path.
    pub fn open(path: &Path) -> StateResult<Self> {
        let db = Database::create(path).map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!(?path, "state store opened");
        Ok(store)
    }

    /// Create an ephemeral in-memory state store (for testing).
    pub fn open_in_memory() -> StateResult<Self> {
        let backend = redb::backends::InMemoryBackend::new();
        let db = Database::builder()
            .create_with_backend(backend)
            .map_err(map_err!(Open))?;
        let store = Self { db: Arc::new(db) };
        store.ensure_tables()?;
        debug!("in-memory state store opened");
        Ok(store)
    }

    /// Create all tables if they don't exist yet.
    fn ensure_tables(&self) -> StateResult<()> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        // Opening a table in a write transaction creates it if absent.
        for table in [POLICIES, CLUSTERS, CLUSTER_SETS, BINDINGS, RESOURCES, NAMESPACES] {
            txn.open_table(table).map_err(map_err!(Table))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    // ── Generic record access ──────────────────────────────────────

    fn put<T: Serialize>(&self, table: Table, key: &str, record: &T) -> StateResult<()> {
        let value = serde_json::to_vec(record).map_err(map_err!(Serialize))?;
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            t.insert(key, value.as_slice()).map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(())
    }

    fn get<T: DeserializeOwned>(&self, table: Table, key: &str) -> StateResult<Option<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        match t.get(key).map_err(map_err!(Read))? {
            Some(guard) => {
                let record: T =
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?;
                Ok(Some(record))
            }
            None => Ok(None),
        }
    }

    /// List records whose key starts with `prefix` (empty = all), in key order.
    fn list<T: DeserializeOwned>(&self, table: Table, prefix: &str) -> StateResult<Vec<T>> {
        let txn = self.db.begin_read().map_err(map_err!(Transaction))?;
        let t = txn.open_table(table).map_err(map_err!(Table))?;
        let mut results = Vec::new();
        for entry in t.iter().map_err(map_err!(Read))? {
            let (key, value) = entry.map_err(map_err!(Read))?;
            if key.value().starts_with(prefix) {
                let record: T =
                    serde_json::from_slice(value.value()).map_err(map_err!(Deserialize))?;
                results.push(record);
            }
        }
        Ok(results)
    }

    fn remove(&self, table: Table, key: &str) -> StateResult<bool> {
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let existed;
        {
            let mut t = txn.open_table(table).map_err(map_err!(Table))?;
            existed = t.remove(key).map_err(map_err!(Write))?.is_some();
        }
        txn.commit().map_err(map_err!(Transaction))?;
        Ok(existed)
    }

    // ── Schedule policies ──────────────────────────────────────────

    /// Insert or update a schedule policy (spec and status).
    pub fn put_policy(&self, policy: &SchedulePolicy) -> StateResult<()> {
        let key = policy.table_key();
        self.put(POLICIES, &key, policy)?;
        debug!(%key, "policy stored");
        Ok(())
    }

    /// Get a policy by `{namespace}/{name}` key.
    pub fn get_policy(&self, key: &str) -> StateResult<Option<SchedulePolicy>> {
        self.get(POLICIES, key)
    }

    /// List all policies, sorted by key.
    pub fn list_policies(&self) -> StateResult<Vec<SchedulePolicy>> {
        self.list(POLICIES, "")
    }

    /// Delete a policy and every binding it owns (owner garbage collection).
    ///
    /// Returns the number of bindings removed, or `None` if the policy did
    /// not exist.
    pub fn delete_policy_cascade(&self, key: &str) -> StateResult<Option<u32>> {
        let Some(policy) = self.get_policy(key)? else {
            return Ok(None);
        };
        let owned: Vec<String> = self
            .list_bindings_for_owner(&policy)?
            .iter()
            .map(Binding::table_key)
            .collect();

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut policies = txn.open_table(POLICIES).map_err(map_err!(Table))?;
            policies.remove(key).map_err(map_err!(Write))?;
            let mut bindings = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
            for binding_key in &owned {
                bindings
                    .remove(binding_key.as_str())
                    .map_err(map_err!(Write))?;
            }
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, bindings = owned.len(), "policy deleted with owned bindings");
        Ok(Some(owned.len() as u32))
    }

    // ── Clusters ───────────────────────────────────────────────────

    pub fn put_cluster(&self, cluster: &Cluster) -> StateResult<()> {
        self.put(CLUSTERS, &cluster.name, cluster)
    }

    pub fn get_cluster(&self, name: &str) -> StateResult<Option<Cluster>> {
        self.get(CLUSTERS, name)
    }

    /// List all clusters, sorted by name.
    pub fn list_clusters(&self) -> StateResult<Vec<Cluster>> {
        self.list(CLUSTERS, "")
    }

    /// Update only the connection state of an existing cluster.
    pub fn set_cluster_state(&self, name: &str, state: ClusterState) -> StateResult<()> {
        let mut cluster = self
            .get_cluster(name)?
            .ok_or_else(|| StateError::NotFound(format!("cluster {name}")))?;
        cluster.status.status = state;
        self.put_cluster(&cluster)?;
        debug!(cluster = %name, ?state, "cluster state updated");
        Ok(())
    }

    // ── Cluster sets ───────────────────────────────────────────────

    pub fn put_cluster_set(&self, set: &ClusterSet) -> StateResult<()> {
        self.put(CLUSTER_SETS, &set.name, set)
    }

    pub fn get_cluster_set(&self, name: &str) -> StateResult<Option<ClusterSet>> {
        self.get(CLUSTER_SETS, name)
    }

    // ── Placed resources ───────────────────────────────────────────

    pub fn put_resource(&self, resource: &PlacedResource) -> StateResult<()> {
        self.put(RESOURCES, &resource.table_key(), resource)
    }

    pub fn get_resource(&self, namespace: &str, name: &str) -> StateResult<Option<PlacedResource>> {
        self.get(RESOURCES, &object_key(namespace, name))
    }

    // ── Namespaces ─────────────────────────────────────────────────

    pub fn put_namespace(&self, namespace: &Namespace) -> StateResult<()> {
        self.put(NAMESPACES, &namespace.name, namespace)
    }

    pub fn get_namespace(&self, name: &str) -> StateResult<Option<Namespace>> {
        self.get(NAMESPACES, name)
    }

    // ── Bindings ───────────────────────────────────────────────────

    /// Get a binding by namespace and name.
    pub fn get_binding(&self, namespace: &str, name: &str) -> StateResult<Option<Binding>> {
        self.get(BINDINGS, &object_key(namespace, name))
    }

    /// List bindings in a namespace, sorted by name.
    pub fn list_bindings(&self, namespace: &str) -> StateResult<Vec<Binding>> {
        self.list(BINDINGS, &format!("{namespace}/"))
    }

    /// Bindings in the policy's namespace whose owner reference is `policy`.
    pub fn list_bindings_for_owner(&self, policy: &SchedulePolicy) -> StateResult<Vec<Binding>> {
        Ok(self
            .list_bindings(&policy.namespace)?
            .into_iter()
            .filter(|b| b.is_owned_by(policy))
            .collect())
    }

    /// Create a binding. Fails if one with the same key already exists.
    ///
    /// Returns the stored binding with its first resource version.
    pub fn create_binding(&self, binding: &Binding) -> StateResult<Binding> {
        let key = binding.table_key();
        let mut stored = binding.clone();
        stored.resource_version = 1;
        let value = serde_json::to_vec(&stored).map_err(map_err!(Serialize))?;

        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        {
            let mut table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
            if table.get(key.as_str()).map_err(map_err!(Read))?.is_some() {
                return Err(StateError::AlreadyExists(format!("binding {key}")));
            }
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, "binding created");
        Ok(stored)
    }

    /// Replace an existing binding.
    ///
    /// The caller's `resource_version` must match the stored one; on success
    /// the version is bumped and the stored binding returned.
    pub fn update_binding(&self, binding: &Binding) -> StateResult<Binding> {
        let key = binding.table_key();
        let txn = self.db.begin_write().map_err(map_err!(Transaction))?;
        let stored;
        {
            let mut table = txn.open_table(BINDINGS).map_err(map_err!(Table))?;
            let current: Binding = match table.get(key.as_str()).map_err(map_err!(Read))? {
                Some(guard) => {
                    serde_json::from_slice(guard.value()).map_err(map_err!(Deserialize))?
                }
                None => return Err(StateError::NotFound(format!("binding {key}"))),
            };
            if current.resource_version != binding.resource_version {
                return Err(StateError::Conflict {
                    key,
                    expected: binding.resource_version,
                    found: current.resource_version,
                });
            }
            let mut next = binding.clone();
            next.resource_version = current.resource_version + 1;
            let value = serde_json::to_vec(&next).map_err(map_err!(Serialize))?;
            table
                .insert(key.as_str(), value.as_slice())
                .map_err(map_err!(Write))?;
            stored = next;
        }
        txn.commit().map_err(map_err!(Transaction))?;
        debug!(%key, version = stored.resource_version, "binding updated");
        Ok(stored)
    }

    /// Delete a binding. Returns true if it existed.
    pub fn delete_binding(&self, namespace: &str, name: &str) -> StateResult<bool> {
        self.remove(BINDINGS, &object_key(namespace, name))
    }
}
