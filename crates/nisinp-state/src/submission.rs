//! # Report Submissions
//!
//! An `IncidentWorkflow` is one submission of one report step. The
//! submission timestamp doubles as the version key: the question set used
//! to render it later is the one active at this instant.

use serde::{Deserialize, Serialize};

use nisinp_core::{IncidentId, PlacementId, ReportId, StateError, SubmissionId, Timestamp};

use crate::review::{ReviewDecision, ReviewStatus};

/// The answer to one question placement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Answer {
    /// The question placement answered.
    pub placement: PlacementId,
    /// Free-text part of the answer, if any.
    #[serde(default)]
    pub text: Option<String>,
    /// Codes of the predefined options selected.
    #[serde(default)]
    pub selected: Vec<String>,
}

impl Answer {
    /// A free-text answer.
    pub fn text(placement: PlacementId, text: impl Into<String>) -> Self {
        Self {
            placement,
            text: Some(text.into()),
            selected: Vec::new(),
        }
    }

    /// An answer choosing predefined options.
    pub fn choice(placement: PlacementId, selected: Vec<String>) -> Self {
        Self {
            placement,
            text: None,
            selected,
        }
    }

    /// Whether the answer carries non-blank text or a selected option.
    pub fn is_given(&self) -> bool {
        !self.selected.is_empty() || self.text.as_deref().is_some_and(|t| !t.trim().is_empty())
    }
}

/// One submission of one report step for an incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IncidentWorkflow {
    /// Unique identifier.
    pub id: SubmissionId,
    /// Owning incident.
    pub incident: IncidentId,
    /// Position of the step in the incident's step graph.
    pub step_position: i32,
    /// The report form that was filled.
    pub report: ReportId,
    /// Creation time; also the schema version key.
    pub timestamp: Timestamp,
    /// Review status, the only lifecycle field that changes after creation.
    pub review_status: ReviewStatus,
    /// Regulator comment attached with the review.
    pub comment: Option<String>,
    /// The submitted answers.
    pub answers: Vec<Answer>,
}

impl IncidentWorkflow {
    /// Record a new submission.
    ///
    /// `deadline_exceeded` is the deadline rule evaluated at `timestamp`;
    /// it decides between UNDER_REVIEW and LATE_SUBMISSION.
    pub fn record(
        incident: IncidentId,
        step_position: i32,
        report: ReportId,
        timestamp: Timestamp,
        deadline_exceeded: bool,
        answers: Vec<Answer>,
    ) -> Self {
        Self {
            id: SubmissionId::new(),
            incident,
            step_position,
            report,
            timestamp,
            review_status: ReviewStatus::on_submission(deadline_exceeded),
            comment: None,
            answers,
        }
    }

    /// Apply a regulator decision, replacing the comment.
    pub fn apply_review(
        &mut self,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<ReviewStatus, StateError> {
        let next = self.review_status.apply(decision)?;
        self.review_status = next;
        self.comment = comment;
        Ok(next)
    }

    /// The answer recorded for a placement, if any.
    pub fn answer_for(&self, placement: &PlacementId) -> Option<&Answer> {
        self.answers.iter().find(|a| &a.placement == placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_submission(late: bool) -> IncidentWorkflow {
        IncidentWorkflow::record(
            IncidentId::new(),
            1,
            ReportId::new("early-warning"),
            Timestamp::parse("2026-03-01T10:00:00Z").unwrap(),
            late,
            vec![Answer::text(PlacementId::new("ew-summary"), "Substation outage")],
        )
    }

    #[test]
    fn test_record_on_time_and_late() {
        assert_eq!(make_submission(false).review_status, ReviewStatus::UnderReview);
        assert_eq!(make_submission(true).review_status, ReviewStatus::LateSubmission);
    }

    #[test]
    fn test_apply_review_sets_comment() {
        let mut submission = make_submission(false);
        let status = submission
            .apply_review(ReviewDecision::RequireRevision, Some("Missing impact".into()))
            .unwrap();
        assert_eq!(status, ReviewStatus::RevisionRequired);
        assert_eq!(submission.comment.as_deref(), Some("Missing impact"));

        submission.apply_review(ReviewDecision::Pass, None).unwrap();
        assert_eq!(submission.review_status, ReviewStatus::Passed);
        assert_eq!(submission.comment, None);
    }

    #[test]
    fn test_answer_lookup() {
        let submission = make_submission(false);
        assert!(submission.answer_for(&PlacementId::new("ew-summary")).is_some());
        assert!(submission.answer_for(&PlacementId::new("ew-other")).is_none());
    }
}
