//! fleetd.toml configuration parser.

use anyhow::ensure;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FleetConfig {
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub controller: ControllerConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Directory holding `fleetbind.redb`.
    pub data_dir: PathBuf,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("/var/lib/fleetbind"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerConfig {
    /// Seconds between full resyncs of all schedule policies.
    pub resync_interval_secs: u64,
    /// First requeue delay after a failed reconcile.
    pub initial_backoff_ms: u64,
    /// Upper bound on the requeue delay.
    pub max_backoff_secs: u64,
    pub backoff_multiplier: f64,
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            resync_interval_secs: 30,
            initial_backoff_ms: 500,
            max_backoff_secs: 300,
            backoff_multiplier: 2.0,
        }
    }
}

impl ControllerConfig {
    pub fn resync_interval(&self) -> Duration {
        Duration::from_secs(self.resync_interval_secs)
    }

    pub fn initial_backoff(&self) -> Duration {
        Duration::from_millis(self.initial_backoff_ms)
    }

    pub fn max_backoff(&self) -> Duration {
        Duration::from_secs(self.max_backoff_secs)
    }

    /// Reject settings that would stall or spin the resync loop.
    pub fn validate(&self) -> anyhow::Result<()> {
        ensure!(
            self.resync_interval_secs > 0,
            "controller.resync_interval_secs must be greater than 0"
        );
        ensure!(
            self.initial_backoff_ms > 0,
            "controller.initial_backoff_ms must be greater than 0"
        );
        ensure!(
            self.max_backoff() >= self.initial_backoff(),
            "controller.max_backoff_secs ({}s) is below initial_backoff_ms ({}ms)",
            self.max_backoff_secs,
            self.initial_backoff_ms
        );
        ensure!(
            self.backoff_multiplier.is_finite() && self.backoff_multiplier >= 1.0,
            "controller.backoff_multiplier must be a finite number >= 1, got {}",
            self.backoff_multiplier
        );
        Ok(())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `EnvFilter` directive used when `RUST_LOG` is unset.
    pub filter: String,
    /// Emit JSON lines instead of the human-readable format.
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,fleetd=debug,fleetbind=debug".to_string(),
            json: false,
        }
    }
}

impl FleetConfig {
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: FleetConfig = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        self.controller.validate()
    }

    pub fn to_toml_string(&self) -> anyhow::Result<String> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Path of the redb database file inside the data directory.
    pub fn db_path(&self) -> PathBuf {
        self.store.data_dir.join("fleetbind.redb")
    }
}
