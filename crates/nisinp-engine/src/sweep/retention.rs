//! # Retention Sweep
//!
//! Deletes CLOSED incidents notified more than `retention_days` ago, with
//! their submissions, step statuses and reminder log. ONGOING incidents are
//! never deleted, however old.

use async_trait::async_trait;

use nisinp_core::{EngineError, Timestamp};

use crate::context::EngineContext;
use crate::sweep::{Sweep, SweepReport};

/// Default retention period in days.
pub const DEFAULT_RETENTION_DAYS: u32 = 365;

/// Daily deletion of old closed incidents.
#[derive(Debug, Clone)]
pub struct RetentionSweep {
    ctx: EngineContext,
    retention_days: u32,
}

impl RetentionSweep {
    /// Create the sweep.
    pub fn new(ctx: EngineContext, retention_days: u32) -> Self {
        Self {
            ctx,
            retention_days,
        }
    }
}

#[async_trait]
impl Sweep for RetentionSweep {
    fn name(&self) -> &'static str {
        "retention"
    }

    async fn run(&self, now: Timestamp) -> Result<SweepReport, EngineError> {
        let mut report = SweepReport::new(self.name(), now);
        let Some(cutoff) = now.checked_minus_days(i64::from(self.retention_days)) else {
            tracing::debug!(retention_days = self.retention_days, "retention window precedes the calendar");
            return Ok(report);
        };
        let deleted = self.ctx.repository.delete_closed_before(cutoff).await?;
        self.ctx.metrics.record_retention(deleted);
        if deleted > 0 {
            tracing::info!(deleted, %cutoff, "closed incidents deleted");
        }
        report.changes = usize::try_from(deleted).unwrap_or(usize::MAX);
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nisinp_core::TimeSource;

    use crate::service::IncidentService;
    use crate::testing::{harness, open_request};

    #[tokio::test]
    async fn deletes_only_old_closed_incidents() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let old_closed = service.open_incident(open_request("ILR-0300")).await.unwrap();
        service.open_incident(open_request("ILR-0301")).await.unwrap();
        service.close_incident(old_closed.id).await.unwrap();

        h.clock.advance_hours(24 * 200);
        let recent = service.open_incident(open_request("ILR-0302")).await.unwrap();
        service.close_incident(recent.id).await.unwrap();

        h.clock.advance_hours(24 * 200);
        let sweep = RetentionSweep::new(h.ctx.clone(), DEFAULT_RETENTION_DAYS);
        let report = sweep.run(h.clock.now()).await.unwrap();

        assert_eq!(report.changes, 1);
        assert_eq!(h.repository.incident_count(), 2);
        assert!(matches!(
            service.incident_state(old_closed.id).await,
            Err(EngineError::IncidentNotFound(_))
        ));
    }

    #[tokio::test]
    async fn unbounded_retention_keeps_everything() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let closed = service.open_incident(open_request("ILR-0303")).await.unwrap();
        service.close_incident(closed.id).await.unwrap();
        h.clock.advance_hours(24 * 1000);

        let sweep = RetentionSweep::new(h.ctx.clone(), u32::MAX);
        let report = sweep.run(h.clock.now()).await.unwrap();
        assert_eq!(report.changes, 0);
        assert_eq!(h.repository.incident_count(), 1);
    }
}
