//! # Status Reconciliation
//!
//! Persists OVERDUE for every unsubmitted step whose deadline has elapsed,
//! and notifies once per transition.
//!
//! The sweep only ever proposes UNSUBMITTED → OVERDUE. Submitted steps take
//! their status from the submission, which only the intake service and the
//! regulator change. The transition is a compare-and-swap on the stored
//! status; the notification is sent only by the caller whose swap won, so
//! re-running the sweep with the same `now`, or two overlapping runs, cannot
//! notify twice for one step.

use async_trait::async_trait;

use nisinp_core::{EngineError, IncidentId, Timestamp};
use nisinp_notify::NotificationKind;
use nisinp_state::ReviewStatus;
use nisinp_workflow::DeadlineEvaluator;

use crate::context::EngineContext;
use crate::sweep::{fan_out, IncidentOutcome, Sweep, SweepOptions, SweepReport};

/// Periodic OVERDUE reconciliation.
#[derive(Debug, Clone)]
pub struct ReconciliationSweep {
    ctx: EngineContext,
    options: SweepOptions,
}

impl ReconciliationSweep {
    /// Create the sweep.
    pub fn new(ctx: EngineContext, options: SweepOptions) -> Self {
        Self { ctx, options }
    }
}

#[async_trait]
impl Sweep for ReconciliationSweep {
    fn name(&self) -> &'static str {
        "status"
    }

    async fn run(&self, now: Timestamp) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::new(self.name(), now);
        let ids = self.ctx.repository.list_ongoing_incidents().await?;
        fan_out(&mut report, ids, self.options, |id| {
            reconcile_incident(self.ctx.clone(), id, now)
        })
        .await;
        Ok(report)
    }
}

async fn reconcile_incident(
    ctx: EngineContext,
    incident: IncidentId,
    now: Timestamp,
) -> Result<IncidentOutcome, EngineError> {
    let _guard = ctx.locks.lock(incident).await;
    let state = ctx.repository.load_state(incident).await?;
    let mut outcome = IncidentOutcome::default();
    if !state.incident.is_ongoing() {
        return Ok(outcome);
    }
    let graph = ctx.catalog.graphs.get(&state.incident.step_graph)?;
    let evaluator = DeadlineEvaluator::new(graph);

    for step in graph.steps() {
        if state.has_submission(step.position) {
            continue;
        }
        let stored = state.stored_status(step.position);
        let candidate = evaluator.evaluate(step, &state, now);
        if candidate == stored || candidate != ReviewStatus::Overdue {
            continue;
        }
        let won = ctx
            .repository
            .transition_step_status(incident, step.position, stored, candidate)
            .await?;
        if !won {
            tracing::debug!(
                incident_id = %incident,
                step = step.position,
                "status changed concurrently, skipping"
            );
            continue;
        }
        outcome.changes += 1;
        ctx.metrics.record_transition(candidate);
        tracing::info!(
            incident_id = %incident,
            step = step.position,
            from = %stored,
            to = %candidate,
            "step deadline elapsed"
        );
        let delivered = ctx
            .dispatch(
                NotificationKind::StatusChanged,
                graph.status_changed_email.as_ref(),
                &state.incident,
                Some(step.position),
            )
            .await;
        outcome.notification(delivered);
    }
    Ok(outcome)
}
