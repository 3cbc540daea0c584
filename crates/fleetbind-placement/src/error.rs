//! Placement error types.

use thiserror::Error;

use fleetbind_state::StateError;

/// Errors that abort one placement computation.
///
/// None of these are fatal to the process; the controller requeues the
/// policy and retries with backoff.
#[derive(Debug, Error)]
pub enum PlacementError {
    #[error("{kind} not found: {name}")]
    NotFound { kind: &'static str, name: String },

    #[error(
        "unavailable clusters {unavailable:?} exceed available failover capacity {available}"
    )]
    CapacityExceeded {
        unavailable: Vec<String>,
        available: usize,
    },

    #[error("clusters {0:?} are unavailable and no failover policy is configured")]
    NoFailoverPolicy(Vec<String>),

    #[error("invalid policy: {0}")]
    InvalidPolicy(String),

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl PlacementError {
    pub(crate) fn not_found(kind: &'static str, name: impl Into<String>) -> Self {
        Self::NotFound {
            kind,
            name: name.into(),
        }
    }
}

pub type PlacementResult<T> = Result<T, PlacementError>;
