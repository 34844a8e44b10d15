//! # Sweeps
//!
//! Periodic jobs over the incident store. The status and reminder sweeps
//! visit every ONGOING incident independently: each incident runs as its own
//! task on a [`JoinSet`], bounded by a semaphore of `workers` permits and a
//! per-incident timeout. A failure or timeout on one incident is logged,
//! counted, and does not affect the others.
//!
//! Dropping a running sweep aborts its in-flight incident tasks. Each
//! incident's writes are single compare-and-swap operations, so an aborted
//! task leaves either the old status or the new one, never a partial write.

mod reminder;
mod retention;
mod status;

pub use reminder::ReminderSweep;
pub use retention::{RetentionSweep, DEFAULT_RETENTION_DAYS};
pub use status::ReconciliationSweep;

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use nisinp_core::{EngineError, IncidentId, Timestamp};

/// A periodic job.
#[async_trait]
pub trait Sweep: Send + Sync {
    /// Stable name, used in logs and metric labels.
    fn name(&self) -> &'static str;

    /// Run once as of `now`.
    async fn run(&self, now: Timestamp) -> Result<SweepReport, EngineError>;
}

/// Fan-out limits of a sweep.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SweepOptions {
    /// Incidents evaluated concurrently.
    pub workers: usize,
    /// Budget for one incident's evaluation, writes and notifications.
    pub incident_timeout: Duration,
}

impl Default for SweepOptions {
    fn default() -> Self {
        Self {
            workers: 8,
            incident_timeout: Duration::from_secs(30),
        }
    }
}

/// What one sweep run did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SweepReport {
    /// Sweep name.
    pub sweep: &'static str,
    /// The instant the run evaluated at.
    pub at: Option<Timestamp>,
    /// Incidents visited.
    pub incidents: usize,
    /// State changes persisted (status transitions, reminders recorded,
    /// incidents deleted).
    pub changes: usize,
    /// Notifications delivered.
    pub notified: usize,
    /// Notifications that failed after their state change was persisted.
    pub notify_failures: usize,
    /// Incidents whose evaluation failed or timed out.
    pub failures: usize,
}

impl SweepReport {
    pub(crate) fn new(sweep: &'static str, at: Timestamp) -> Self {
        Self {
            sweep,
            at: Some(at),
            ..Self::default()
        }
    }

    fn absorb(&mut self, outcome: IncidentOutcome) {
        self.changes += outcome.changes;
        self.notified += outcome.notified;
        self.notify_failures += outcome.notify_failures;
    }
}

impl std::fmt::Display for SweepReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} incidents, {} changes, {} notified, {} notify failures, {} failures",
            self.sweep, self.incidents, self.changes, self.notified, self.notify_failures, self.failures
        )
    }
}

/// Effects on one incident.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct IncidentOutcome {
    pub changes: usize,
    pub notified: usize,
    pub notify_failures: usize,
}

impl IncidentOutcome {
    pub(crate) fn notification(&mut self, delivered: bool) {
        if delivered {
            self.notified += 1;
        } else {
            self.notify_failures += 1;
        }
    }
}

/// Run `visit` for every incident of `ids` under the limits of `options`.
pub(crate) async fn fan_out<F, Fut>(
    report: &mut SweepReport,
    ids: Vec<IncidentId>,
    options: SweepOptions,
    visit: F,
) where
    F: Fn(IncidentId) -> Fut,
    Fut: Future<Output = Result<IncidentOutcome, EngineError>> + Send + 'static,
{
    let sweep = report.sweep;
    let permits = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut tasks = JoinSet::new();

    for id in ids {
        let Ok(permit) = permits.clone().acquire_owned().await else {
            break;
        };
        let work = visit(id);
        let timeout = options.incident_timeout;
        report.incidents += 1;
        tasks.spawn(async move {
            let _permit = permit;
            let result = match tokio::time::timeout(timeout, work).await {
                Ok(result) => result,
                Err(_) => Err(EngineError::Timeout(timeout)),
            };
            (id, result)
        });
    }

    while let Some(joined) = tasks.join_next().await {
        match joined {
            Ok((_, Ok(outcome))) => report.absorb(outcome),
            Ok((id, Err(e))) => {
                tracing::warn!(sweep, incident_id = %id, error = %e, "incident skipped");
                report.failures += 1;
            }
            Err(e) => {
                tracing::warn!(sweep, error = %e, "incident task did not complete");
                report.failures += 1;
            }
        }
    }
}
