//! # Deadline Evaluation
//!
//! Computes the review status of one step of one incident at an instant.
//!
//! ## Rules
//!
//! 1. A step with a submission has the status of its latest submission.
//! 2. Otherwise the step's trigger selects a reference time:
//!    - `NOTIFICATION_DATE`: the incident's notification date.
//!    - `DETECTION_DATE`: the detection date; missing until it is set.
//!    - `PREVIOUS_STEP`: the latest submission of the preceding step; missing
//!      until that step is submitted.
//!    - `NONE`: no deadline.
//! 3. With a reference time, `floor((now - reference) / 1h) >= delay_hours`
//!    is OVERDUE, anything less UNSUBMITTED. A missing reference is not an
//!    error: the step is simply UNSUBMITTED.
//!
//! A closed incident is never re-evaluated: its steps keep their stored
//! status. OVERDUE is sticky for an unsubmitted step.

use nisinp_core::Timestamp;
use nisinp_state::{IncidentState, ReviewStatus};

use crate::graph::{StepDefinition, StepGraph, TriggerKind};

/// The instant a deadline counts from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReferenceTime {
    /// The deadline counts from this instant.
    At(Timestamp),
    /// The trigger needs a date the incident does not carry yet.
    Missing,
    /// The trigger has no deadline.
    Never,
}

impl ReferenceTime {
    /// The instant, if there is one.
    pub fn instant(&self) -> Option<Timestamp> {
        match self {
            Self::At(t) => Some(*t),
            Self::Missing | Self::Never => None,
        }
    }
}

/// Whether `delay_hours` whole hours have elapsed from `reference` to `now`.
///
/// The boundary is inclusive: exactly `delay_hours` counts as exceeded.
pub fn is_deadline_exceeded(reference: Timestamp, delay_hours: u32, now: Timestamp) -> bool {
    now.elapsed_hours_since(reference) >= i64::from(delay_hours)
}

/// Deadline rules evaluated against one step graph.
#[derive(Debug, Clone, Copy)]
pub struct DeadlineEvaluator<'g> {
    graph: &'g StepGraph,
}

impl<'g> DeadlineEvaluator<'g> {
    /// Evaluate deadlines of `graph`.
    pub fn new(graph: &'g StepGraph) -> Self {
        Self { graph }
    }

    /// The reference time `trigger` selects for the step at `position`.
    pub fn reference_time(
        &self,
        trigger: TriggerKind,
        position: i32,
        state: &IncidentState,
    ) -> ReferenceTime {
        let found = |t: Option<Timestamp>| t.map_or(ReferenceTime::Missing, ReferenceTime::At);
        match trigger {
            TriggerKind::None => ReferenceTime::Never,
            TriggerKind::NotificationDate => ReferenceTime::At(state.incident.notification_date),
            TriggerKind::DetectionDate => found(state.incident.detection_date),
            TriggerKind::PreviousStep => found(
                self.graph
                    .previous(position)
                    .and_then(|prev| state.latest_submission(prev.position))
                    .map(|s| s.timestamp),
            ),
        }
    }

    /// The instant the step becomes overdue, when it can be known. A delay
    /// reaching past the representable calendar has no deadline.
    pub fn deadline(&self, step: &StepDefinition, state: &IncidentState) -> Option<Timestamp> {
        self.reference_time(step.trigger, step.position, state)
            .instant()
            .and_then(|r| r.checked_plus_hours(i64::from(step.delay_hours)))
    }

    /// Whether the step's deadline has passed at `at`, ignoring submissions.
    ///
    /// Decides LATE_SUBMISSION vs UNDER_REVIEW for a submission created at
    /// `at`.
    pub fn is_exceeded_at(&self, step: &StepDefinition, state: &IncidentState, at: Timestamp) -> bool {
        if state.stored_status(step.position) == ReviewStatus::Overdue {
            return true;
        }
        match self.reference_time(step.trigger, step.position, state) {
            ReferenceTime::At(reference) => is_deadline_exceeded(reference, step.delay_hours, at),
            ReferenceTime::Missing | ReferenceTime::Never => false,
        }
    }

    /// The status of an unsubmitted step at `now`: UNSUBMITTED or OVERDUE.
    pub fn deadline_status(
        &self,
        step: &StepDefinition,
        state: &IncidentState,
        now: Timestamp,
    ) -> ReviewStatus {
        if self.is_exceeded_at(step, state, now) {
            ReviewStatus::Overdue
        } else {
            ReviewStatus::Unsubmitted
        }
    }

    /// The current review status of a step.
    pub fn evaluate(&self, step: &StepDefinition, state: &IncidentState, now: Timestamp) -> ReviewStatus {
        if let Some(submission) = state.latest_submission(step.position) {
            return submission.review_status;
        }
        if !state.incident.is_ongoing() {
            return state.stored_status(step.position);
        }
        let status = self.deadline_status(step, state, now);
        tracing::debug!(
            incident_id = %state.incident.id,
            step = step.position,
            %status,
            "evaluated step deadline"
        );
        status
    }
}
