//! # Incident Aggregate
//!
//! `IncidentState` is everything the deadline evaluator and the sequencer
//! need to know about one incident: the incident itself, its complete
//! append-only submission history, and the deadline status persisted for
//! steps that have no submission yet (written only by the status sweep).

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::incident::Incident;
use crate::review::ReviewStatus;
use crate::submission::IncidentWorkflow;

/// An incident with its submissions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentState {
    /// The incident.
    pub incident: Incident,
    /// Every submission ever made, in no particular order.
    pub submissions: Vec<IncidentWorkflow>,
    /// Persisted deadline status per unsubmitted step position.
    #[serde(default)]
    pub step_statuses: BTreeMap<i32, ReviewStatus>,
}

impl IncidentState {
    /// A freshly opened incident with no history.
    pub fn new(incident: Incident) -> Self {
        Self {
            incident,
            submissions: Vec::new(),
            step_statuses: BTreeMap::new(),
        }
    }

    /// The most recent submission for a step (greatest timestamp; on a tie
    /// the one appended last).
    pub fn latest_submission(&self, position: i32) -> Option<&IncidentWorkflow> {
        self.submissions
            .iter()
            .filter(|s| s.step_position == position)
            .max_by_key(|s| s.timestamp)
    }

    /// The latest submission of every step that has one, keyed by position.
    pub fn latest_per_step(&self) -> BTreeMap<i32, &IncidentWorkflow> {
        let mut latest: BTreeMap<i32, &IncidentWorkflow> = BTreeMap::new();
        for submission in &self.submissions {
            match latest.get(&submission.step_position) {
                Some(current) if current.timestamp > submission.timestamp => {}
                _ => {
                    latest.insert(submission.step_position, submission);
                }
            }
        }
        latest
    }

    /// All submissions of a step, oldest first.
    pub fn history(&self, position: i32) -> Vec<&IncidentWorkflow> {
        let mut history: Vec<_> = self
            .submissions
            .iter()
            .filter(|s| s.step_position == position)
            .collect();
        history.sort_by_key(|s| s.timestamp);
        history
    }

    /// Whether any submission exists for a step.
    pub fn has_submission(&self, position: i32) -> bool {
        self.submissions.iter().any(|s| s.step_position == position)
    }

    /// Whether any step positioned after `position` has a submission.
    pub fn has_submission_after(&self, position: i32) -> bool {
        self.submissions.iter().any(|s| s.step_position > position)
    }

    /// Whether any step other than `position` has a submission.
    pub fn has_submission_other_than(&self, position: i32) -> bool {
        self.submissions.iter().any(|s| s.step_position != position)
    }

    /// The stored status of a step: the latest submission's review status if
    /// one exists, else the persisted deadline status, else UNSUBMITTED.
    pub fn stored_status(&self, position: i32) -> ReviewStatus {
        if let Some(submission) = self.latest_submission(position) {
            return submission.review_status;
        }
        self.step_statuses
            .get(&position)
            .copied()
            .unwrap_or(ReviewStatus::Unsubmitted)
    }

    /// Append a submission to the history.
    pub fn push_submission(&mut self, submission: IncidentWorkflow) {
        self.submissions.push(submission);
    }
}
