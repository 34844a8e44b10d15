//! # Incident Lifecycle
//!
//! An incident from opening to deletion: every report submitted, a
//! revision requested and honoured, reminders at their hour mark, closure,
//! and the retention sweep. Checks the notifications each step sends.

mod common;

use nisinp_core::EngineError;
use nisinp_engine::{
    ReminderSweep, RetentionSweep, Sweep, SweepOptions, DEFAULT_RETENTION_DAYS,
};
use nisinp_notify::NotificationKind;
use nisinp_state::{ReviewDecision, ReviewStatus};

use common::{early_warning, harness, notification, t0};

#[tokio::test]
async fn full_lifecycle_notifies_each_step() {
    let h = harness();
    let incident = h.open("LU-2026-0300").await;

    let opening = h.notifier.of_kind(NotificationKind::Opening);
    assert_eq!(opening.len(), 1);
    assert_eq!(opening[0].subject, "Incident LU-2026-0300 registered");
    assert_eq!(
        opening[0].body,
        "Incident LU-2026-0300 notified on 2026-03-02. See https://notify.example.lu."
    );

    // Early warning, sent back for revision, then resubmitted.
    h.clock.advance_hours(4);
    let first = h.service.submit_step(incident, 1, early_warning()).await.unwrap();
    assert_eq!(first.review_status, ReviewStatus::UnderReview);
    let reviewed = h
        .service
        .review_submission(
            first.id,
            ReviewDecision::RequireRevision,
            Some("Cause missing detail".into()),
        )
        .await
        .unwrap();
    assert_eq!(reviewed.review_status, ReviewStatus::RevisionRequired);
    assert_eq!(reviewed.comment.as_deref(), Some("Cause missing detail"));

    let overview = h.service.step_overview(incident).await.unwrap();
    assert!(overview[0].revisable);
    assert!(!overview[0].fillable);
    assert!(overview[1].fillable);

    h.clock.advance_hours(2);
    let second = h.service.submit_step(incident, 1, early_warning()).await.unwrap();
    assert_ne!(second.id, first.id);

    // Only the latest submission of a step can be reviewed.
    let stale = h
        .service
        .review_submission(first.id, ReviewDecision::Pass, None)
        .await
        .unwrap_err();
    assert!(matches!(stale, EngineError::StaleWriteConflict { position: 1, .. }));
    h.service
        .review_submission(second.id, ReviewDecision::Pass, None)
        .await
        .unwrap();

    // Notification report, within 16h of the latest early warning.
    h.clock.advance_hours(10);
    let report = h.service.submit_step(incident, 2, notification()).await.unwrap();
    assert_eq!(report.review_status, ReviewStatus::UnderReview);

    let state = h.service.incident_state(incident).await.unwrap();
    assert_eq!(state.history(1).len(), 2);
    assert_eq!(state.latest_submission(1).unwrap().review_status, ReviewStatus::Passed);

    h.service.close_incident(incident).await.unwrap();
    let err = h.service.submit_step(incident, 2, notification()).await.unwrap_err();
    assert!(matches!(err, EngineError::IncidentClosed(_)));

    let kinds: Vec<NotificationKind> = h.notifier.messages().iter().map(|m| m.kind).collect();
    assert_eq!(
        kinds,
        vec![
            NotificationKind::Opening,
            NotificationKind::Submission,
            NotificationKind::StatusChanged,
            NotificationKind::Submission,
            NotificationKind::StatusChanged,
            NotificationKind::Submission,
            NotificationKind::Closing,
        ]
    );
    assert!(h
        .notifier
        .messages()
        .iter()
        .all(|m| m.incident_id == incident
            && m.recipients
                == [
                    "soc@operator.example",
                    "incidents@ilr.example.lu",
                    "cert@govcert.example.lu",
                ]));
}

#[tokio::test]
async fn reminder_sent_once_at_its_hour_mark() {
    let h = harness();
    let incident = h.open("LU-2026-0301").await;
    h.notifier.clear();
    let sweep = ReminderSweep::new(h.ctx.clone(), SweepOptions::default());

    sweep.run(t0().plus_hours(11)).await.unwrap();
    assert_eq!(h.notifier.count(), 0);

    let report = sweep.run(t0().plus_hours(12)).await.unwrap();
    assert_eq!(report.notified, 1);
    sweep.run(t0().plus_hours(12).plus_secs(1800)).await.unwrap();
    sweep.run(t0().plus_hours(13)).await.unwrap();

    let reminders = h.notifier.of_kind(NotificationKind::Reminder);
    assert_eq!(reminders.len(), 1);
    assert_eq!(reminders[0].incident_id, incident);
    assert_eq!(reminders[0].step_position, Some(1));
    assert_eq!(reminders[0].subject, "Incident LU-2026-0301: early warning due");
    assert_eq!(h.repository.reminder_count(), 1);
}

#[tokio::test]
async fn no_reminder_for_submitted_step() {
    let h = harness();
    let incident = h.open("LU-2026-0302").await;
    h.clock.advance_hours(1);
    h.service.submit_step(incident, 1, early_warning()).await.unwrap();
    h.notifier.clear();

    ReminderSweep::new(h.ctx.clone(), SweepOptions::default())
        .run(t0().plus_hours(12))
        .await
        .unwrap();
    assert_eq!(h.notifier.count(), 0);
}

#[tokio::test]
async fn retention_deletes_only_old_closed_incidents() {
    let h = harness();
    let closed = h.open("LU-2026-0303").await;
    let ongoing = h.open("LU-2026-0304").await;
    h.service.close_incident(closed).await.unwrap();
    let sweep = RetentionSweep::new(h.ctx.clone(), DEFAULT_RETENTION_DAYS);

    let early = sweep.run(t0().plus_hours(300 * 24)).await.unwrap();
    assert_eq!(early.changes, 0);
    assert_eq!(h.repository.incident_count(), 2);

    let report = sweep.run(t0().plus_hours(400 * 24)).await.unwrap();
    assert_eq!(report.changes, 1);
    assert_eq!(h.repository.incident_count(), 1);
    assert!(h.service.incident_state(closed).await.is_err());
    assert!(h.service.incident_state(ongoing).await.is_ok());
}

#[tokio::test]
async fn notifier_outage_keeps_state_changes() {
    let h = harness();
    let incident = h.open("LU-2026-0305").await;
    h.notifier.set_failing(true);

    h.clock.advance_hours(2);
    let submission = h.service.submit_step(incident, 1, early_warning()).await.unwrap();
    assert_eq!(submission.review_status, ReviewStatus::UnderReview);

    let state = h.service.incident_state(incident).await.unwrap();
    assert!(state.has_submission(1));
    assert_eq!(h.notifier.of_kind(NotificationKind::Submission).len(), 0);
}
