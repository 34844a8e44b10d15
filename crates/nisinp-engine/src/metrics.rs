//! # Sweep Metrics
//!
//! Prometheus registry for the engine. Sweeps and the intake service push
//! into it; the daemon encodes it on `GET /metrics`.

use std::sync::Arc;

use prometheus::core::Collector;
use prometheus::{
    Encoder, HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts, Registry, TextEncoder,
};

use nisinp_notify::NotificationKind;
use nisinp_state::ReviewStatus;

/// Outcome label of a dispatched notification.
pub const SENT: &str = "sent";
/// Outcome label of a failed notification.
pub const FAILED: &str = "failed";

/// Shared metrics state backed by a Prometheus registry.
#[derive(Clone)]
pub struct SweepMetrics {
    inner: Arc<Inner>,
}

struct Inner {
    registry: Registry,
    sweep_runs_total: IntCounterVec,
    sweep_duration_seconds: HistogramVec,
    status_transitions_total: IntCounterVec,
    notifications_total: IntCounterVec,
    incident_failures_total: IntCounterVec,
    retention_deleted_total: IntCounter,
}

impl std::fmt::Debug for SweepMetrics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SweepMetrics")
            .field("notifications", &sum(&self.inner.notifications_total))
            .field("transitions", &sum(&self.inner.status_transitions_total))
            .finish()
    }
}

impl SweepMetrics {
    /// Create a fresh registry with every engine metric registered.
    pub fn new() -> Self {
        let registry = Registry::new();

        let sweep_runs_total = IntCounterVec::new(
            Opts::new("nisinp_sweep_runs_total", "Completed sweep runs"),
            &["sweep"],
        )
        .expect("metric can be created");

        let sweep_duration_seconds = HistogramVec::new(
            HistogramOpts::new("nisinp_sweep_duration_seconds", "Sweep run duration in seconds")
                .buckets(vec![0.01, 0.05, 0.1, 0.5, 1.0, 5.0, 15.0, 60.0, 300.0]),
            &["sweep"],
        )
        .expect("metric can be created");

        let status_transitions_total = IntCounterVec::new(
            Opts::new(
                "nisinp_status_transitions_total",
                "Persisted step status transitions by target status",
            ),
            &["status"],
        )
        .expect("metric can be created");

        let notifications_total = IntCounterVec::new(
            Opts::new("nisinp_notifications_total", "Notification dispatches"),
            &["kind", "outcome"],
        )
        .expect("metric can be created");

        let incident_failures_total = IntCounterVec::new(
            Opts::new(
                "nisinp_incident_failures_total",
                "Incidents whose sweep evaluation failed or timed out",
            ),
            &["sweep"],
        )
        .expect("metric can be created");

        let retention_deleted_total = IntCounter::new(
            "nisinp_retention_deleted_total",
            "Closed incidents deleted by the retention sweep",
        )
        .expect("metric can be created");

        let collectors: [Box<dyn Collector>; 6] = [
            Box::new(sweep_runs_total.clone()),
            Box::new(sweep_duration_seconds.clone()),
            Box::new(status_transitions_total.clone()),
            Box::new(notifications_total.clone()),
            Box::new(incident_failures_total.clone()),
            Box::new(retention_deleted_total.clone()),
        ];
        for collector in collectors {
            registry
                .register(collector)
                .expect("metric can be registered");
        }

        Self {
            inner: Arc::new(Inner {
                registry,
                sweep_runs_total,
                sweep_duration_seconds,
                status_transitions_total,
                notifications_total,
                incident_failures_total,
                retention_deleted_total,
            }),
        }
    }

    /// Record a completed sweep run.
    pub fn record_run(&self, sweep: &str, duration_secs: f64, failures: usize) {
        self.inner.sweep_runs_total.with_label_values(&[sweep]).inc();
        self.inner
            .sweep_duration_seconds
            .with_label_values(&[sweep])
            .observe(duration_secs);
        if failures > 0 {
            self.inner
                .incident_failures_total
                .with_label_values(&[sweep])
                .inc_by(failures as u64);
        }
    }

    /// Record a persisted status transition.
    pub fn record_transition(&self, status: ReviewStatus) {
        self.inner
            .status_transitions_total
            .with_label_values(&[status.as_str()])
            .inc();
    }

    /// Record a notification dispatch and its outcome.
    pub fn record_notification(&self, kind: NotificationKind, outcome: &str) {
        self.inner
            .notifications_total
            .with_label_values(&[kind.as_str(), outcome])
            .inc();
    }

    /// Record incidents deleted by retention.
    pub fn record_retention(&self, deleted: u64) {
        self.inner.retention_deleted_total.inc_by(deleted);
    }

    /// Completed runs of one sweep.
    pub fn runs(&self, sweep: &str) -> u64 {
        self.inner.sweep_runs_total.with_label_values(&[sweep]).get()
    }

    /// Persisted transitions into `status`.
    pub fn transitions(&self, status: ReviewStatus) -> u64 {
        self.inner
            .status_transitions_total
            .with_label_values(&[status.as_str()])
            .get()
    }

    /// Dispatches of `kind` with `outcome`.
    pub fn notifications(&self, kind: NotificationKind, outcome: &str) -> u64 {
        self.inner
            .notifications_total
            .with_label_values(&[kind.as_str(), outcome])
            .get()
    }

    /// Gather all metrics and encode to Prometheus text format.
    pub fn gather_and_encode(&self) -> Result<String, String> {
        let encoder = TextEncoder::new();
        let families = self.inner.registry.gather();
        let mut buffer = Vec::new();
        encoder
            .encode(&families, &mut buffer)
            .map_err(|e| format!("failed to encode metrics: {e}"))?;
        String::from_utf8(buffer).map_err(|e| format!("metrics encoding produced invalid UTF-8: {e}"))
    }
}

impl Default for SweepMetrics {
    fn default() -> Self {
        Self::new()
    }
}

fn sum(counter: &IntCounterVec) -> u64 {
    counter
        .collect()
        .iter()
        .flat_map(|mf| mf.get_metric())
        .map(|m| m.get_counter().get_value() as u64)
        .sum()
}
