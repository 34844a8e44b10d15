//! # Sweep Scheduler
//!
//! One loop per sweep, each on its own interval. A run is awaited inside
//! its loop, so it never overlaps its own next tick; ticks missed while a
//! run was in flight are skipped, not queued. A manual [`Scheduler::run_once`]
//! that finds the same sweep already running returns `None` instead of
//! starting a second run.
//!
//! Shutdown is a `watch` signal. Loops stop between runs, and a run in
//! flight is dropped, which aborts its incident tasks.

use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use tokio::sync::{watch, Mutex};
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use nisinp_core::{EngineError, TimeSource, Timestamp};

use crate::context::EngineContext;
use crate::metrics::SweepMetrics;
use crate::sweep::{
    ReconciliationSweep, ReminderSweep, RetentionSweep, Sweep, SweepOptions, SweepReport,
    DEFAULT_RETENTION_DAYS,
};

/// Scheduler and sweep settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SchedulerConfig {
    /// Seconds between status reconciliation runs.
    pub status_interval_secs: u64,
    /// Seconds between reminder runs.
    pub reminder_interval_secs: u64,
    /// Seconds between retention runs.
    pub retention_interval_secs: u64,
    /// Incidents evaluated concurrently per sweep.
    pub workers: usize,
    /// Budget for one incident, in seconds.
    pub incident_timeout_secs: u64,
    /// Closed incidents older than this many days are deleted.
    pub retention_days: u32,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            status_interval_secs: 3600,
            reminder_interval_secs: 3600,
            retention_interval_secs: 86_400,
            workers: 8,
            incident_timeout_secs: 30,
            retention_days: DEFAULT_RETENTION_DAYS,
        }
    }
}

impl SchedulerConfig {
    /// Fan-out limits for the per-incident sweeps.
    pub fn sweep_options(&self) -> SweepOptions {
        SweepOptions {
            workers: self.workers,
            incident_timeout: Duration::from_secs(self.incident_timeout_secs),
        }
    }
}

struct Job {
    sweep: Arc<dyn Sweep>,
    every: Duration,
    running: Mutex<()>,
}

/// Runs sweeps on their intervals.
pub struct Scheduler {
    jobs: Vec<Arc<Job>>,
    clock: Arc<dyn TimeSource>,
    metrics: SweepMetrics,
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("sweeps", &self.names())
            .finish()
    }
}

impl Scheduler {
    /// A scheduler with no sweeps.
    pub fn new(clock: Arc<dyn TimeSource>, metrics: SweepMetrics) -> Self {
        Self {
            jobs: Vec::new(),
            clock,
            metrics,
        }
    }

    /// The status, reminder and retention sweeps over `ctx`.
    pub fn from_config(ctx: &EngineContext, config: &SchedulerConfig) -> Self {
        let options = config.sweep_options();
        Self::new(ctx.clock.clone(), ctx.metrics.clone())
            .with_sweep(
                Arc::new(ReconciliationSweep::new(ctx.clone(), options)),
                Duration::from_secs(config.status_interval_secs),
            )
            .with_sweep(
                Arc::new(ReminderSweep::new(ctx.clone(), options)),
                Duration::from_secs(config.reminder_interval_secs),
            )
            .with_sweep(
                Arc::new(RetentionSweep::new(ctx.clone(), config.retention_days)),
                Duration::from_secs(config.retention_interval_secs),
            )
    }

    /// Add a sweep running every `every`.
    pub fn with_sweep(mut self, sweep: Arc<dyn Sweep>, every: Duration) -> Self {
        self.jobs.push(Arc::new(Job {
            sweep,
            every: every.max(Duration::from_secs(1)),
            running: Mutex::new(()),
        }));
        self
    }

    /// Names of the registered sweeps.
    pub fn names(&self) -> Vec<&'static str> {
        self.jobs.iter().map(|j| j.sweep.name()).collect()
    }

    /// Run one sweep now, as of `at` (the clock when `None`). Returns
    /// `None` when that sweep is already running.
    pub async fn run_once(
        &self,
        name: &str,
        at: Option<Timestamp>,
    ) -> Result<Option<SweepReport>, EngineError> {
        let job = self
            .jobs
            .iter()
            .find(|j| j.sweep.name() == name)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown sweep {name:?}")))?;
        let now = at.unwrap_or_else(|| self.clock.now());
        run_job(job, now, &self.metrics).await
    }

    /// Drive every sweep on its interval until `shutdown` turns true or its
    /// sender is dropped.
    pub async fn run(self, shutdown: watch::Receiver<bool>) {
        let mut loops = JoinSet::new();
        for job in self.jobs {
            loops.spawn(drive(
                job,
                self.clock.clone(),
                self.metrics.clone(),
                shutdown.clone(),
            ));
        }
        tracing::info!(sweeps = loops.len(), "scheduler started");
        while let Some(joined) = loops.join_next().await {
            if let Err(e) = joined {
                tracing::error!(error = %e, "sweep loop ended abnormally");
            }
        }
        tracing::info!("scheduler stopped");
    }
}

async fn drive(
    job: Arc<Job>,
    clock: Arc<dyn TimeSource>,
    metrics: SweepMetrics,
    mut shutdown: watch::Receiver<bool>,
) {
    let name = job.sweep.name();
    let mut ticker = tokio::time::interval(job.every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    loop {
        if *shutdown.borrow() {
            break;
        }
        tokio::select! {
            _ = ticker.tick() => {}
            _ = shutdown.changed() => break,
        }
        tokio::select! {
            result = run_job(&job, clock.now(), &metrics) => {
                if let Err(e) = result {
                    tracing::error!(sweep = name, error = %e, "sweep failed");
                }
            }
            _ = shutdown.changed() => {
                tracing::warn!(sweep = name, "shutdown during sweep, in-flight work aborted");
                break;
            }
        }
    }
    tracing::debug!(sweep = name, "sweep loop stopped");
}

async fn run_job(
    job: &Job,
    now: Timestamp,
    metrics: &SweepMetrics,
) -> Result<Option<SweepReport>, EngineError> {
    let name = job.sweep.name();
    let Ok(_running) = job.running.try_lock() else {
        tracing::debug!(sweep = name, "previous run still in flight, skipping");
        return Ok(None);
    };
    let started = Instant::now();
    let report = job.sweep.run(now).await?;
    let elapsed = started.elapsed();
    metrics.record_run(name, elapsed.as_secs_f64(), report.failures);
    tracing::info!(
        sweep = name,
        at = %now,
        incidents = report.incidents,
        changes = report.changes,
        notified = report.notified,
        notify_failures = report.notify_failures,
        failures = report.failures,
        duration_ms = elapsed.as_millis() as u64,
        "sweep finished"
    );
    Ok(Some(report))
}
