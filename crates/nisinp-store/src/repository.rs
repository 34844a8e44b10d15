//! # Repository Interface
//!
//! Explicit queries returning `Option`/`Result`; nothing is lazily
//! evaluated. "Latest" submission of a step is always the one with the
//! greatest timestamp, ties going to the one stored last.

use async_trait::async_trait;

use nisinp_core::{IncidentId, SubmissionId, Timestamp};
use nisinp_state::{Incident, IncidentState, IncidentWorkflow, ReviewStatus};
use nisinp_workflow::ReminderKey;

use crate::error::StoreError;

/// Persistence of incidents and their submissions.
#[async_trait]
pub trait IncidentRepository: Send + Sync {
    /// Store a new incident.
    async fn insert_incident(&self, incident: &Incident) -> Result<(), StoreError>;

    /// Fetch an incident.
    async fn get_incident(&self, id: IncidentId) -> Result<Incident, StoreError>;

    /// Replace the mutable fields of an incident (status, dates, closure).
    async fn update_incident(&self, incident: &Incident) -> Result<(), StoreError>;

    /// Ids of every ONGOING incident.
    async fn list_ongoing_incidents(&self) -> Result<Vec<IncidentId>, StoreError>;

    /// An incident with its complete submission history and persisted step
    /// statuses.
    async fn load_state(&self, id: IncidentId) -> Result<IncidentState, StoreError>;

    /// The latest submission of one step.
    async fn find_latest_submission(
        &self,
        incident: IncidentId,
        position: i32,
    ) -> Result<Option<IncidentWorkflow>, StoreError>;

    /// Fetch a submission.
    async fn get_submission(&self, id: SubmissionId) -> Result<IncidentWorkflow, StoreError>;

    /// Append a submission if the step's latest submission is still
    /// `expected_latest` (`None`: the step has none). `Conflict` otherwise;
    /// `Closed` when the incident is closed.
    async fn insert_submission(
        &self,
        submission: &IncidentWorkflow,
        expected_latest: Option<SubmissionId>,
    ) -> Result<(), StoreError>;

    /// Set a submission's review status and comment if its status is still
    /// `expected`. `Conflict` otherwise.
    async fn set_review_status(
        &self,
        submission: SubmissionId,
        expected: ReviewStatus,
        new: ReviewStatus,
        comment: Option<String>,
    ) -> Result<(), StoreError>;

    /// Move the persisted deadline status of an unsubmitted step from
    /// `expected` to `new`. Returns `false`, writing nothing, when the
    /// current status differs, the step has a submission, or the incident
    /// is closed.
    async fn transition_step_status(
        &self,
        incident: IncidentId,
        position: i32,
        expected: ReviewStatus,
        new: ReviewStatus,
    ) -> Result<bool, StoreError>;

    /// Record a reminder dispatch. Returns `false` if it was already recorded.
    async fn mark_reminder_sent(&self, key: &ReminderKey, at: Timestamp) -> Result<bool, StoreError>;

    /// Delete CLOSED incidents notified before `cutoff`, with everything
    /// they own. Returns how many incidents were deleted.
    async fn delete_closed_before(&self, cutoff: Timestamp) -> Result<u64, StoreError>;

    /// Check the backend is reachable.
    async fn ping(&self) -> Result<(), StoreError>;
}
