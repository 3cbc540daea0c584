//! fleetbind scheduler: turns schedule policies into bindings.
//!
//! The [`Scheduler`] reconciles a single policy: it runs the placement
//! engine, writes the binding only when its spec changed, and stamps the
//! policy status. The [`Controller`] drives the scheduler on a resync
//! interval and requeues failures with exponential backoff.

pub mod binding_writer;
pub mod controller;
pub mod error;
pub mod scheduler;
pub mod status;

#[cfg(test)]
pub(crate) mod testing;

pub use binding_writer::{WriteOutcome, candidate_binding, write_binding};
pub use controller::{Controller, ResyncSummary};
pub use error::{SchedulerError, SchedulerResult};
pub use scheduler::{ReconcileOutcome, ScheduleOutcome, Scheduler};
pub use status::{BindingStatus, ClusterView};
