//! # Reminder Sweep
//!
//! Sends each reminder rule's notification at its hour mark. A reminder is
//! recorded in the repository before it is sent; only the run that records
//! it first sends it, so two runs inside the same hour send once.

use async_trait::async_trait;

use nisinp_core::{EngineError, IncidentId, Timestamp};
use nisinp_notify::NotificationKind;
use nisinp_workflow::due_reminders;

use crate::context::EngineContext;
use crate::sweep::{fan_out, IncidentOutcome, Sweep, SweepOptions, SweepReport};

/// Periodic hour-mark reminders.
#[derive(Debug, Clone)]
pub struct ReminderSweep {
    ctx: EngineContext,
    options: SweepOptions,
}

impl ReminderSweep {
    /// Create the sweep.
    pub fn new(ctx: EngineContext, options: SweepOptions) -> Self {
        Self { ctx, options }
    }
}

#[async_trait]
impl Sweep for ReminderSweep {
    fn name(&self) -> &'static str {
        "reminder"
    }

    async fn run(&self, now: Timestamp) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::new(self.name(), now);
        let ids = self.ctx.repository.list_ongoing_incidents().await?;
        fan_out(&mut report, ids, self.options, |id| {
            remind_incident(self.ctx.clone(), id, now)
        })
        .await;
        Ok(report)
    }
}

async fn remind_incident(
    ctx: EngineContext,
    incident: IncidentId,
    now: Timestamp,
) -> Result<IncidentOutcome, EngineError> {
    let _guard = ctx.locks.lock(incident).await;
    let state = ctx.repository.load_state(incident).await?;
    let graph = ctx.catalog.graphs.get(&state.incident.step_graph)?;
    let mut outcome = IncidentOutcome::default();

    for due in due_reminders(graph, &state, now) {
        if !ctx.repository.mark_reminder_sent(&due.key, now).await? {
            continue;
        }
        outcome.changes += 1;
        tracing::info!(
            incident_id = %incident,
            step = due.key.step_position,
            template = %due.key.template,
            delay_hours = due.key.delay_hours,
            "reminder due"
        );
        let delivered = ctx
            .dispatch(
                NotificationKind::Reminder,
                Some(&due.key.template),
                &state.incident,
                Some(due.key.step_position),
            )
            .await;
        outcome.notification(delivered);
    }
    Ok(outcome)
}

#[cfg(test)]
mod tests {
    use super::*;
    use nisinp_core::TimeSource;

    use crate::service::IncidentService;
    use crate::testing::{harness, open_request};

    #[tokio::test]
    async fn fires_once_at_hour_mark() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        service.open_incident(open_request("ILR-0200")).await.unwrap();
        let sweep = ReminderSweep::new(h.ctx.clone(), SweepOptions::default());

        h.clock.advance_hours(11);
        assert_eq!(sweep.run(h.clock.now()).await.unwrap().changes, 0);

        h.clock.advance_hours(1);
        let report = sweep.run(h.clock.now()).await.unwrap();
        assert_eq!(report.changes, 1);
        assert_eq!(report.notified, 1);

        h.clock.advance_secs(1800);
        assert_eq!(sweep.run(h.clock.now()).await.unwrap().changes, 0);
        h.clock.advance_hours(1);
        assert_eq!(sweep.run(h.clock.now()).await.unwrap().changes, 0);

        let reminders = h.notifier.of_kind(NotificationKind::Reminder);
        assert_eq!(reminders.len(), 1);
        assert_eq!(reminders[0].subject, "Early warning due ILR-0200");
        assert_eq!(h.repository.reminder_count(), 1);
    }

    #[tokio::test]
    async fn missed_hour_mark_is_skipped() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        service.open_incident(open_request("ILR-0201")).await.unwrap();
        let sweep = ReminderSweep::new(h.ctx.clone(), SweepOptions::default());

        h.clock.advance_hours(13);
        assert_eq!(sweep.run(h.clock.now()).await.unwrap().changes, 0);
        assert_eq!(h.notifier.count(), 1);
    }
}
