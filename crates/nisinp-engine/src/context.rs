//! # Engine Context
//!
//! The collaborators every engine component shares: the catalog, the
//! repository, the notifier, the clock, the metrics and the per-incident
//! locks. Cloning is cheap; everything is behind an `Arc`.

use std::sync::Arc;

use nisinp_core::{EmailTemplateId, TimeSource};
use nisinp_notify::{NotificationKind, Notifier};
use nisinp_state::Incident;
use nisinp_store::IncidentRepository;

use crate::catalog::Catalog;
use crate::locks::IncidentLocks;
use crate::metrics::{SweepMetrics, FAILED, SENT};

/// Shared engine collaborators.
#[derive(Clone)]
pub struct EngineContext {
    /// Immutable workflow configuration.
    pub catalog: Arc<Catalog>,
    /// Incident persistence.
    pub repository: Arc<dyn IncidentRepository>,
    /// Notification delivery.
    pub notifier: Arc<dyn Notifier>,
    /// Source of "now".
    pub clock: Arc<dyn TimeSource>,
    /// Prometheus metrics.
    pub metrics: SweepMetrics,
    /// Per-incident write serialisation.
    pub locks: IncidentLocks,
}

impl std::fmt::Debug for EngineContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineContext")
            .field("graphs", &self.catalog.graphs.len())
            .field("notifier", &self.notifier.name())
            .field("metrics", &self.metrics)
            .finish()
    }
}

impl EngineContext {
    /// Assemble a context with fresh metrics and locks.
    pub fn new(
        catalog: Catalog,
        repository: Arc<dyn IncidentRepository>,
        notifier: Arc<dyn Notifier>,
        clock: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            catalog: Arc::new(catalog),
            repository,
            notifier,
            clock,
            metrics: SweepMetrics::new(),
            locks: IncidentLocks::new(),
        }
    }

    /// Replace the metrics registry.
    pub fn with_metrics(mut self, metrics: SweepMetrics) -> Self {
        self.metrics = metrics;
        self
    }

    /// Render and deliver one notification. Failures are logged and
    /// counted, never propagated: the state change that caused the
    /// notification is already persisted.
    pub(crate) async fn dispatch(
        &self,
        kind: NotificationKind,
        template: Option<&EmailTemplateId>,
        incident: &Incident,
        step: Option<i32>,
    ) -> bool {
        let message = self.catalog.templates.render(kind, template, incident, step);
        match self.notifier.notify(&message).await {
            Ok(()) => {
                self.metrics.record_notification(kind, SENT);
                true
            }
            Err(e) => {
                tracing::warn!(
                    incident_id = %incident.id,
                    step = ?step,
                    %kind,
                    notifier = self.notifier.name(),
                    error = %e,
                    "notification dispatch failed"
                );
                self.metrics.record_notification(kind, FAILED);
                false
            }
        }
    }
}
