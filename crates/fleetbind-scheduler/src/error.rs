//! Scheduler error types.

use thiserror::Error;

use fleetbind_placement::PlacementError;
use fleetbind_state::StateError;

/// Errors that can occur while reconciling a schedule policy.
#[derive(Debug, Error)]
pub enum SchedulerError {
    #[error("schedule policy not found: {0}")]
    PolicyNotFound(String),

    #[error("placement error: {0}")]
    Placement(#[from] PlacementError),

    #[error("failed to write binding {key}: {source}")]
    BindingWrite {
        key: String,
        #[source]
        source: StateError,
    },

    #[error("state store error: {0}")]
    State(#[from] StateError),
}

impl SchedulerError {
    /// Failures the controller expects to clear on their own (offline
    /// clusters recovering, a concurrent writer finishing).
    pub fn is_transient(&self) -> bool {
        matches!(
            self,
            SchedulerError::Placement(PlacementError::CapacityExceeded { .. })
                | SchedulerError::Placement(PlacementError::NoFailoverPolicy(_))
                | SchedulerError::BindingWrite { .. }
        )
    }
}

pub type SchedulerResult<T> = Result<T, SchedulerError>;
