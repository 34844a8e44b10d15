//! # Report Review Status
//!
//! ```text
//!                  submit (on time)            regulator
//! UNSUBMITTED ─────────────────────▶ UNDER_REVIEW ──────▶ PASSED
//!      │                                   │                 ▲ │
//!      │ deadline elapsed                  └──────▶ REVISION_REQUIRED
//!      ▼                                                    │
//!   OVERDUE ── submit (late) ──▶ LATE_SUBMISSION ──▶ PASSED | REVISION_REQUIRED
//! ```
//!
//! PASSED and REVISION_REQUIRED are final for a given submission but a newer
//! submission for the same step starts the machine again at UNDER_REVIEW or
//! LATE_SUBMISSION.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nisinp_core::StateError;

/// The review status of one report step of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ReviewStatus {
    /// No submission yet and the deadline, if any, has not elapsed.
    Unsubmitted,
    /// Submitted on time, awaiting the regulator.
    UnderReview,
    /// Regulator accepted the submission.
    Passed,
    /// Regulator asked for a corrected submission.
    RevisionRequired,
    /// No submission and the deadline has elapsed.
    Overdue,
    /// Submitted after the deadline, awaiting the regulator.
    LateSubmission,
}

/// A regulator's verdict on a submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewDecision {
    /// Accept the report.
    Pass,
    /// Ask for a corrected report.
    RequireRevision,
}

impl ReviewStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [ReviewStatus; 6] = [
        Self::Unsubmitted,
        Self::UnderReview,
        Self::Passed,
        Self::RevisionRequired,
        Self::Overdue,
        Self::LateSubmission,
    ];

    /// Initial status of a new submission.
    pub fn on_submission(deadline_exceeded: bool) -> Self {
        if deadline_exceeded {
            Self::LateSubmission
        } else {
            Self::UnderReview
        }
    }

    /// Whether a submission exists behind this status.
    pub fn is_submitted(&self) -> bool {
        !matches!(self, Self::Unsubmitted | Self::Overdue)
    }

    /// Whether the regulator has ruled on the submission.
    pub fn is_decided(&self) -> bool {
        matches!(self, Self::Passed | Self::RevisionRequired)
    }

    /// Whether the status is still driven by the deadline clock.
    pub fn awaits_deadline(&self) -> bool {
        matches!(self, Self::Unsubmitted)
    }

    /// Apply a regulator decision to a submission in this status.
    ///
    /// Any submitted status accepts a decision, so a regulator may revisit a
    /// verdict. Statuses without a submission behind them reject it.
    pub fn apply(&self, decision: ReviewDecision) -> Result<Self, StateError> {
        let target = match decision {
            ReviewDecision::Pass => Self::Passed,
            ReviewDecision::RequireRevision => Self::RevisionRequired,
        };
        if !self.is_submitted() {
            return Err(StateError::InvalidTransition {
                from: self.to_string(),
                to: target.to_string(),
                reason: "nothing has been submitted for this step".to_string(),
            });
        }
        Ok(target)
    }

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Unsubmitted => "UNSUBMITTED",
            Self::UnderReview => "UNDER_REVIEW",
            Self::Passed => "PASSED",
            Self::RevisionRequired => "REVISION_REQUIRED",
            Self::Overdue => "OVERDUE",
            Self::LateSubmission => "LATE_SUBMISSION",
        }
    }
}

impl std::fmt::Display for ReviewStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ReviewStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| StateError::InvalidTransition {
                from: s.to_string(),
                to: "?".to_string(),
                reason: "unknown review status".to_string(),
            })
    }
}
