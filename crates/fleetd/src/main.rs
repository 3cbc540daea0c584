//! fleetd: the fleetbind daemon.
//!
//! # Usage
//!
//! ```text
//! fleetd --config /etc/fleetbind/fleetd.toml run
//! fleetd apply fleet.json
//! fleetd schedule default/web
//! fleetd status default/web
//! ```

use std::path::PathBuf;

use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use tokio::sync::watch;
use tracing::info;

use fleetbind_core::{FleetConfig, split_object_key};
use fleetbind_scheduler::{BindingStatus, Controller, Scheduler};
use fleetbind_state::StateStore;
use fleetd::{Manifest, init_tracing};

#[derive(Parser)]
#[command(name = "fleetd", about = "fleetbind placement daemon", version)]
struct Cli {
    /// Path to fleetd.toml. Defaults are used when omitted.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the store's data directory.
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the resync controller until Ctrl-C.
    Run,
    /// Load a JSON manifest of clusters, cluster sets, namespaces,
    /// resources and policies into the store.
    Apply {
        file: PathBuf,
    },
    /// Reconcile one policy (`namespace/name`) and print the outcome.
    Schedule {
        policy: String,
        /// Compute the placement without writing the binding.
        #[arg(long)]
        dry_run: bool,
    },
    /// Show the per-cluster view of a policy's binding.
    Status {
        policy: String,
    },
    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => FleetConfig::from_file(path)?,
        None => FleetConfig::default(),
    };
    if let Some(data_dir) = cli.data_dir {
        config.store.data_dir = data_dir;
    }

    init_tracing(&config.logging);

    if let Command::Config = cli.command {
        print!("{}", config.to_toml_string()?);
        return Ok(());
    }

    std::fs::create_dir_all(&config.store.data_dir).with_context(|| {
        format!("failed to create {}", config.store.data_dir.display())
    })?;
    let db_path = config.db_path();
    let state = StateStore::open(&db_path)?;
    info!(path = ?db_path, "state store opened");

    match cli.command {
        Command::Run => run(state, config).await,
        Command::Apply { file } => {
            let summary = Manifest::from_file(&file)?.apply(&state)?;
            println!("{}", serde_json::to_string_pretty(&summary)?);
            Ok(())
        }
        Command::Schedule { policy, dry_run } => {
            check_key(&policy)?;
            let scheduler = Scheduler::new(state);
            let output = if dry_run {
                serde_json::to_string_pretty(&scheduler.plan(&policy)?)?
            } else {
                serde_json::to_string_pretty(&scheduler.reconcile(&policy)?)?
            };
            println!("{output}");
            Ok(())
        }
        Command::Status { policy } => status(&state, &policy),
        Command::Config => Ok(()),
    }
}

async fn run(state: StateStore, config: FleetConfig) -> anyhow::Result<()> {
    info!("fleetd starting controller");

    let mut controller = Controller::new(Scheduler::new(state), config.controller);
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    let handle = tokio::spawn(async move {
        controller.run(shutdown_rx).await;
    });

    tokio::signal::ctrl_c()
        .await
        .context("failed to install Ctrl-C handler")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    handle.await?;
    info!("fleetd stopped");
    Ok(())
}

fn status(state: &StateStore, key: &str) -> anyhow::Result<()> {
    check_key(key)?;
    let policy = state
        .get_policy(key)?
        .with_context(|| format!("schedule policy not found: {key}"))?;
    let Some(binding) = state.get_binding(&policy.namespace, &policy.binding_name())? else {
        bail!("policy {key} has not been scheduled yet");
    };

    let view = serde_json::json!({
        "policy": key,
        "last_schedule_time": policy.status.last_schedule_time,
        "last_modify_time": policy.status.last_modify_time,
        "binding": BindingStatus::from_binding(&binding),
    });
    println!("{}", serde_json::to_string_pretty(&view)?);
    Ok(())
}

fn check_key(key: &str) -> anyhow::Result<()> {
    if split_object_key(key).is_none() {
        bail!("expected a policy key of the form namespace/name, got {key:?}");
    }
    Ok(())
}
