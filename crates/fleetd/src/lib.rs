//! fleetd: the fleetbind daemon.
//!
//! The binary wires the state store, scheduler and controller together.
//! This library half holds the pieces the binary and its integration tests
//! share.

pub mod manifest;

use fleetbind_core::config::LoggingConfig;
use tracing_subscriber::EnvFilter;

pub use manifest::{ApplySummary, Manifest};

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured filter when set.
pub fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.filter));

    if logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
}
