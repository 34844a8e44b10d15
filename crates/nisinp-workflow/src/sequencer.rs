//! # Sequencer — Fillability and Next Step
//!
//! Reports are filed in strict graph order:
//!
//! - Nothing is fillable on a closed incident.
//! - The first step is fillable while no step at all has a submission.
//! - A later step is fillable once its predecessor has a submission, as long
//!   as neither it nor any step after it has one.
//!
//! Submissions are append-only, so "has a submission" only ever flips from
//! false to true and a step, once filled, is never fillable again. A
//! regulator asking for a revision re-opens one step through
//! [`Sequencer::is_revisable`] without touching the forward sequence.

use nisinp_state::{IncidentState, ReviewStatus};

use crate::graph::{StepDefinition, StepGraph};

/// Why a step cannot be filled now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Blocked {
    /// The incident is closed.
    IncidentClosed,
    /// The graph has no such step.
    UnknownStep,
    /// The step already has a submission.
    AlreadySubmitted,
    /// The first step cannot follow another step's submission.
    OtherStepSubmitted,
    /// The preceding step, at this position, has no submission yet.
    PreviousMissing(i32),
    /// A step after this one already has a submission.
    LaterStepSubmitted,
}

impl std::fmt::Display for Blocked {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::IncidentClosed => f.write_str("incident is closed"),
            Self::UnknownStep => f.write_str("no such step"),
            Self::AlreadySubmitted => f.write_str("step already submitted"),
            Self::OtherStepSubmitted => f.write_str("another step was submitted first"),
            Self::PreviousMissing(p) => write!(f, "step {p} has not been submitted"),
            Self::LaterStepSubmitted => f.write_str("a later step was already submitted"),
        }
    }
}

/// Sequencing rules over one step graph.
#[derive(Debug, Clone, Copy)]
pub struct Sequencer<'g> {
    graph: &'g StepGraph,
}

impl<'g> Sequencer<'g> {
    /// Sequence the steps of `graph`.
    pub fn new(graph: &'g StepGraph) -> Self {
        Self { graph }
    }

    /// The first step in graph order without a submission.
    pub fn next_step(&self, state: &IncidentState) -> Option<&'g StepDefinition> {
        self.graph
            .steps()
            .iter()
            .find(|s| !state.has_submission(s.position))
    }

    /// Check whether the step at `position` may be filled now.
    pub fn fillability(&self, state: &IncidentState, position: i32) -> Result<(), Blocked> {
        if !state.incident.is_ongoing() {
            return Err(Blocked::IncidentClosed);
        }
        let step = self.graph.step(position).ok_or(Blocked::UnknownStep)?;
        if state.has_submission(step.position) {
            return Err(Blocked::AlreadySubmitted);
        }
        match self.graph.previous(step.position) {
            None => {
                if state.has_submission_other_than(step.position) {
                    return Err(Blocked::OtherStepSubmitted);
                }
            }
            Some(previous) => {
                if !state.has_submission(previous.position) {
                    return Err(Blocked::PreviousMissing(previous.position));
                }
                if state.has_submission_after(step.position) {
                    return Err(Blocked::LaterStepSubmitted);
                }
            }
        }
        Ok(())
    }

    /// Whether the step at `position` may be filled now.
    pub fn is_fillable(&self, state: &IncidentState, position: i32) -> bool {
        self.fillability(state, position).is_ok()
    }

    /// Whether the regulator has asked for a new submission of this step.
    pub fn is_revisable(&self, state: &IncidentState, position: i32) -> bool {
        state.incident.is_ongoing()
            && self.graph.step(position).is_some()
            && state
                .latest_submission(position)
                .is_some_and(|s| s.review_status == ReviewStatus::RevisionRequired)
    }
}
