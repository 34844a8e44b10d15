//! # Workflow Properties
//!
//! Property tests over the pure workflow rules (fillability, the overdue
//! boundary) and invariants of the assembled engine (idempotent
//! reconciliation, historical schema stability).

mod common;

use proptest::prelude::*;

use nisinp_core::{
    CategoryId, PlacementId, QuestionId, RegulationId, RegulatorId, ReportId, SectorId,
    StepGraphId, Timestamp,
};
use nisinp_engine::{ReconciliationSweep, Sweep, SweepOptions};
use nisinp_notify::NotificationKind;
use nisinp_state::{Incident, IncidentState, IncidentWorkflow, ReviewStatus};
use nisinp_workflow::{
    CategoryDefinition, DeadlineEvaluator, PlacementState, QuestionKind, SchemaHistory, Sequencer,
    StepDefinition, StepGraph, TriggerKind,
};

use common::{early_warning, harness, t0};

fn graph(steps: &[(TriggerKind, u32)]) -> StepGraph {
    StepGraph::new(
        StepGraphId::new("g"),
        RegulationId::new("NIS2"),
        RegulatorId::new("ILR"),
        SectorId::new("energy"),
        steps
            .iter()
            .enumerate()
            .map(|(i, &(trigger, delay_hours))| StepDefinition {
                position: i as i32 + 1,
                name: format!("Step {}", i + 1),
                report: ReportId::new(format!("r{}", i + 1)),
                trigger,
                delay_hours,
                submission_email: None,
                reminders: Vec::new(),
            })
            .collect(),
    )
    .unwrap()
}

fn new_state(notified: Timestamp) -> IncidentState {
    IncidentState::new(Incident::new(
        "REF",
        StepGraphId::new("g"),
        RegulationId::new("NIS2"),
        RegulatorId::new("ILR"),
        SectorId::new("energy"),
        notified,
    ))
}

// ---------------------------------------------------------------------------
// 1. Monotone fillability
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn fillability_is_monotone(
        steps in 2usize..6,
        attempts in prop::collection::vec(1i32..7, 1..24),
    ) {
        let graph = graph(&vec![(TriggerKind::None, 0); steps]);
        let sequencer = Sequencer::new(&graph);
        let mut state = new_state(t0());
        let mut filled: Vec<i32> = Vec::new();

        for (i, position) in attempts.into_iter().enumerate() {
            if sequencer.is_fillable(&state, position) {
                state.push_submission(IncidentWorkflow::record(
                    state.incident.id,
                    position,
                    ReportId::new(format!("r{position}")),
                    t0().plus_hours(i as i64),
                    false,
                    Vec::new(),
                ));
                filled.push(position);
            }

            for &p in &filled {
                prop_assert!(!sequencer.is_fillable(&state, p));
                if let Some(next) = graph.steps().iter().find(|s| s.position > p) {
                    let open = !state.has_submission(next.position)
                        && !state.has_submission_after(next.position);
                    prop_assert_eq!(sequencer.is_fillable(&state, next.position), open);
                }
            }
        }

        // Only a prefix of the graph can ever be filled.
        let mut sorted = filled.clone();
        sorted.sort_unstable();
        prop_assert_eq!(&sorted, &filled);
        prop_assert!(filled.iter().enumerate().all(|(i, &p)| p == i as i32 + 1));
    }
}

// ---------------------------------------------------------------------------
// 2. Boundary inclusivity
// ---------------------------------------------------------------------------

proptest! {
    #[test]
    fn overdue_exactly_from_delay_hours(delay in 1u32..=720, secs in 0i64..3600) {
        let graph = graph(&[(TriggerKind::NotificationDate, delay)]);
        let evaluator = DeadlineEvaluator::new(&graph);
        let step = graph.step(1).unwrap();
        let state = new_state(t0());
        let delay = i64::from(delay);

        prop_assert_eq!(
            evaluator.evaluate(step, &state, t0().plus_hours(delay - 1).plus_secs(secs)),
            ReviewStatus::Unsubmitted
        );
        prop_assert_eq!(
            evaluator.evaluate(step, &state, t0().plus_hours(delay).plus_secs(secs)),
            ReviewStatus::Overdue
        );
    }

    #[test]
    fn previous_step_boundary(delay in 1u32..=168, offset in 0i64..500) {
        let graph = graph(&[(TriggerKind::None, 0), (TriggerKind::PreviousStep, delay)]);
        let evaluator = DeadlineEvaluator::new(&graph);
        let mut state = new_state(t0());
        let t1 = t0().plus_hours(offset);
        state.push_submission(IncidentWorkflow::record(
            state.incident.id,
            1,
            ReportId::new("r1"),
            t1,
            false,
            Vec::new(),
        ));
        let step = graph.step(2).unwrap();
        let delay = i64::from(delay);

        prop_assert_eq!(
            evaluator.evaluate(step, &state, t1.plus_hours(delay - 1)),
            ReviewStatus::Unsubmitted
        );
        prop_assert_eq!(evaluator.evaluate(step, &state, t1.plus_hours(delay)), ReviewStatus::Overdue);
    }
}

// ---------------------------------------------------------------------------
// 3. Idempotent reconciliation
// ---------------------------------------------------------------------------

#[tokio::test]
async fn reconciliation_is_idempotent_per_instant() {
    let h = harness();
    let mut incidents = Vec::new();
    for (i, opened_hours_ago) in [30i64, 24, 23, 2].into_iter().enumerate() {
        h.clock.set(t0().plus_hours(30 - opened_hours_ago));
        incidents.push(h.open(&format!("LU-2026-01{i:02}")).await);
    }
    h.notifier.clear();
    let sweep = ReconciliationSweep::new(h.ctx.clone(), SweepOptions::default());
    let now = t0().plus_hours(30);

    let first = sweep.run(now).await.unwrap();
    let statuses = |h: &common::Harness| {
        let incidents = incidents.clone();
        let service = h.service.clone();
        async move {
            let mut out = Vec::new();
            for id in incidents {
                out.push(service.incident_state(id).await.unwrap().stored_status(1));
            }
            out
        }
    };
    let after_first = statuses(&h).await;

    let second = sweep.run(now).await.unwrap();
    let after_second = statuses(&h).await;

    assert_eq!(
        after_first,
        vec![
            ReviewStatus::Overdue,
            ReviewStatus::Overdue,
            ReviewStatus::Unsubmitted,
            ReviewStatus::Unsubmitted,
        ]
    );
    assert_eq!(after_first, after_second);
    assert_eq!(first.changes, 2);
    assert_eq!(second.changes, 0);
    assert_eq!(h.notifier.of_kind(NotificationKind::StatusChanged).len(), 2);
    assert_eq!(h.notifier.count(), 2);
}

// ---------------------------------------------------------------------------
// 4. Historical schema stability
// ---------------------------------------------------------------------------

#[tokio::test]
async fn submissions_render_on_their_own_schema() {
    let h = harness();
    let incident = h.open("LU-2026-0200").await;
    h.clock.advance_hours(2);
    let submission = h.service.submit_step(incident, 1, early_warning()).await.unwrap();

    let schema = &h.ctx.catalog.schema;
    let report = ReportId::new("early-warning");
    let cause = PlacementId::new("early-warning-cause");
    let before_edit = schema.resolve(&report, submission.timestamp);

    // The fixture relabels the cause question on 10 March and removes it
    // on 1 April.
    let after_edit = schema.resolve(&report, Timestamp::parse("2026-03-15T00:00:00Z").unwrap());
    let after_removal = schema.resolve(&report, Timestamp::parse("2026-04-02T00:00:00Z").unwrap());
    assert_eq!(after_edit.question(&cause).unwrap().label, "Suspected cause");
    assert!(after_removal.question(&cause).is_none());
    assert_eq!(before_edit.question(&cause).unwrap().options.len(), 2);

    let rendered = h.service.render_submission(submission.id).await.unwrap();
    assert_eq!(rendered.as_of, submission.timestamp);
    assert!(rendered.unplaced.is_empty());
    let answers = &rendered.sections[0].answers;
    assert_eq!(answers.len(), 2);
    assert_eq!(
        answers[1].label,
        "Is the incident suspected to be caused by unlawful or malicious acts?"
    );
    assert_eq!(answers[1].selected, vec!["Unlawful or malicious act"]);
}

#[test]
fn later_edits_leave_earlier_resolution_unchanged() {
    let report = ReportId::new("ew");
    let placement = PlacementId::new("ew-cause");
    let state = |label: &str| PlacementState {
        question: QuestionId::new("q-cause"),
        category: CategoryId::new("general"),
        position: 1,
        label: label.into(),
        kind: QuestionKind::FreeText,
        options: Vec::new(),
        mandatory: true,
    };
    let mut schema = SchemaHistory::new();
    schema
        .add_category(CategoryDefinition {
            id: CategoryId::new("general"),
            label: "General".into(),
            position: 1,
        })
        .unwrap();
    schema
        .add(placement.clone(), report.clone(), state("Cause"), t0())
        .unwrap();

    let submitted_at = t0().plus_hours(5);
    let snapshot = schema.resolve(&report, submitted_at);

    schema
        .edit(&placement, state("Root cause"), t0().plus_hours(10))
        .unwrap();
    assert_eq!(schema.resolve(&report, submitted_at), snapshot);
    schema.remove(&placement, t0().plus_hours(20)).unwrap();
    assert_eq!(schema.resolve(&report, submitted_at), snapshot);

    assert_eq!(
        schema.resolve(&report, t0().plus_hours(15)).question(&placement).unwrap().label,
        "Root cause"
    );
    assert!(schema.resolve(&report, t0().plus_hours(21)).is_empty());
}
