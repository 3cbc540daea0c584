//! Binding writer: persists a placement plan as the policy's binding.
//!
//! The candidate binding is compared with the stored one by deep structural
//! equality of its spec. Equal specs produce no write at all; otherwise the
//! whole spec is replaced in a single create or update.

use tracing::{debug, info};

use fleetbind_state::{Binding, BindingSpec, SchedulePolicy, StateStore};

use crate::error::{SchedulerError, SchedulerResult};

/// What [`write_binding`] did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum WriteOutcome {
    Created,
    Updated,
    Unchanged,
}

impl WriteOutcome {
    pub fn wrote(self) -> bool {
        self != WriteOutcome::Unchanged
    }
}

/// Build the binding a policy should own for `spec`.
pub fn candidate_binding(policy: &SchedulePolicy, spec: BindingSpec) -> Binding {
    Binding {
        namespace: policy.namespace.clone(),
        name: policy.binding_name(),
        owner: policy.owner_reference(),
        resource_version: 0,
        spec,
    }
}

/// Create or update `candidate`, skipping the write when nothing changed.
///
/// Returns the outcome and the binding as stored afterwards.
pub fn write_binding(
    state: &StateStore,
    candidate: &Binding,
) -> SchedulerResult<(WriteOutcome, Binding)> {
    let key = candidate.table_key();
    let write_err = |source| SchedulerError::BindingWrite {
        key: key.clone(),
        source,
    };

    let existing = state
        .get_binding(&candidate.namespace, &candidate.name)
        .map_err(write_err)?;

    match existing {
        None => {
            let stored = state.create_binding(candidate).map_err(write_err)?;
            info!(binding = %key, "binding created");
            Ok((WriteOutcome::Created, stored))
        }
        Some(current) if current.spec == candidate.spec => {
            debug!(binding = %key, "binding unchanged, skipping write");
            Ok((WriteOutcome::Unchanged, current))
        }
        Some(current) => {
            let next = Binding {
                spec: candidate.spec.clone(),
                ..current
            };
            let stored = state.update_binding(&next).map_err(write_err)?;
            info!(
                binding = %key,
                version = stored.resource_version,
                "binding updated"
            );
            Ok((WriteOutcome::Updated, stored))
        }
    }
}
