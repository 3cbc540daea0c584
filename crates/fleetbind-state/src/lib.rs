//! fleetbind-state: embedded state store for fleetbind.
//!
//! Backed by [redb](https://docs.rs/redb), holds the records the placement
//! engine reads (schedule policies, clusters, cluster sets, placed-resource
//! descriptors, namespaces) and the bindings it writes.
//!
//! # Architecture
//!
//! All domain types are JSON-serialized into redb's `&[u8]` value columns.
//! Namespaced records use `{namespace}/{name}` keys; cluster-scoped records
//! use their bare name. redb iterates keys in ascending order, so every
//! `list_*` call returns records sorted by key.
//!
//! The `StateStore` is `Clone` + `Send` + `Sync` (backed by `Arc<Database>`)
//! and can be shared across async tasks.

pub mod error;
pub mod store;
pub mod tables;
pub mod types;

pub use error::{StateError, StateResult};
pub use store::StateStore;
pub use types::*;
