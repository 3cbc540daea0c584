//! Controller: periodic resync of every schedule policy.
//!
//! Each pass reconciles the policies whose requeue time has arrived.
//! Failed policies are pushed back with exponential backoff and jitter;
//! a success clears their backoff state.

use std::collections::HashMap;
use std::time::Duration;

use rand::Rng;
use tokio::sync::watch;
use tokio::time::Instant;
use tracing::{debug, error, info, warn};

use fleetbind_core::config::ControllerConfig;

use crate::binding_writer::WriteOutcome;
use crate::error::{SchedulerError, SchedulerResult};
use crate::scheduler::{ReconcileOutcome, Scheduler};

/// Floor for the first requeue delay.
const MIN_BACKOFF: Duration = Duration::from_millis(10);

/// Backoff bookkeeping for a policy whose last reconcile failed.
#[derive(Debug, Clone)]
struct QueueEntry {
    due: Instant,
    failures: u32,
    /// Un-jittered delay used for the current wait.
    delay: Duration,
}

/// Counts from one resync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResyncSummary {
    pub written: usize,
    pub unchanged: usize,
    pub skipped: usize,
    pub failed: usize,
    /// Policies still waiting out a backoff.
    pub deferred: usize,
}

pub struct Controller {
    scheduler: Scheduler,
    config: ControllerConfig,
    queue: HashMap<String, QueueEntry>,
}

impl Controller {
    pub fn new(scheduler: Scheduler, config: ControllerConfig) -> Self {
        Self {
            scheduler,
            config,
            queue: HashMap::new(),
        }
    }

    /// Reconcile every policy that is not backing off at `now`.
    pub fn reconcile_due(&mut self, now: Instant) -> SchedulerResult<ResyncSummary> {
        let policies = self.scheduler.state().list_policies()?;

        let live: Vec<String> = policies.iter().map(|p| p.table_key()).collect();
        self.queue.retain(|key, _| live.contains(key));

        let mut summary = ResyncSummary::default();
        for key in live {
            if self.queue.get(&key).is_some_and(|entry| entry.due > now) {
                summary.deferred += 1;
                continue;
            }

            match self.scheduler.reconcile(&key) {
                Ok(ReconcileOutcome::Scheduled(outcome)) => {
                    self.queue.remove(&key);
                    if outcome.write == WriteOutcome::Unchanged {
                        summary.unchanged += 1;
                    } else {
                        summary.written += 1;
                    }
                }
                Ok(ReconcileOutcome::Skipped { .. }) => {
                    self.queue.remove(&key);
                    summary.skipped += 1;
                }
                Err(e) => {
                    summary.failed += 1;
                    self.requeue(&key, now, &e);
                }
            }
        }

        debug!(?summary, "resync pass complete");
        Ok(summary)
    }

    /// Current un-jittered backoff for `key`, if it is queued.
    pub fn backoff(&self, key: &str) -> Option<Duration> {
        self.queue.get(key).map(|entry| entry.delay)
    }

    /// How long to sleep before the next pass.
    pub fn next_wake(&self, now: Instant) -> Duration {
        let interval = self.config.resync_interval();
        self.queue
            .values()
            .map(|entry| entry.due.saturating_duration_since(now))
            .fold(interval, Duration::min)
    }

    fn requeue(&mut self, key: &str, now: Instant, err: &SchedulerError) {
        // Configs built in code may skip `validate`.
        let initial = self.config.initial_backoff().max(MIN_BACKOFF).as_secs_f64();
        let max = self.config.max_backoff().as_secs_f64().max(initial);
        let multiplier = self.config.backoff_multiplier;

        let entry = self.queue.entry(key.to_string()).or_insert(QueueEntry {
            due: now,
            failures: 0,
            delay: Duration::ZERO,
        });
        let secs = if entry.failures == 0 {
            initial
        } else {
            entry.delay.as_secs_f64() * multiplier
        };
        // NaN fails both comparisons in `clamp` and would reach from_secs_f64.
        let secs = if secs.is_nan() { max } else { secs.clamp(initial, max) };
        entry.delay = Duration::from_secs_f64(secs);
        entry.failures += 1;

        // 0.5x to 1.5x of the delay
        let jitter = rand::thread_rng().gen_range(0.5..1.5);
        let jittered = Duration::from_secs_f64(entry.delay.as_secs_f64() * jitter);
        entry.due = now + jittered;

        if err.is_transient() {
            warn!(
                policy = %key,
                error = %err,
                failures = entry.failures,
                retry_ms = jittered.as_millis() as u64,
                "reconcile failed, requeued with backoff"
            );
        } else {
            error!(
                policy = %key,
                error = %err,
                failures = entry.failures,
                retry_ms = jittered.as_millis() as u64,
                "reconcile failed"
            );
        }
    }

    /// Run resync passes until `shutdown` changes.
    pub async fn run(&mut self, mut shutdown: watch::Receiver<bool>) {
        info!(
            interval_secs = self.config.resync_interval_secs,
            "controller started"
        );

        let mut wait = Duration::ZERO;
        loop {
            tokio::select! {
                _ = tokio::time::sleep(wait) => {
                    let now = Instant::now();
                    if let Err(e) = self.reconcile_due(now) {
                        error!(error = %e, "resync pass failed");
                    }
                    wait = self.next_wake(Instant::now());
                }
                _ = shutdown.changed() => {
                    info!("controller shutting down");
                    break;
                }
            }
        }
    }
}
