//! # In-Memory Repository
//!
//! All tables live behind one `parking_lot::RwLock`, so every
//! compare-and-swap is a read-validate-update under a single write guard.
//! The lock is never held across an `.await`.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::RwLock;

use nisinp_core::{IncidentId, SubmissionId, Timestamp};
use nisinp_state::{Incident, IncidentState, IncidentStatus, IncidentWorkflow, ReviewStatus};
use nisinp_workflow::ReminderKey;

use crate::error::{Missing, StoreError};
use crate::repository::IncidentRepository;

#[derive(Debug, Default)]
struct Tables {
    incidents: HashMap<IncidentId, Incident>,
    submissions: HashMap<SubmissionId, IncidentWorkflow>,
    /// Submission ids per incident in insertion order.
    by_incident: HashMap<IncidentId, Vec<SubmissionId>>,
    step_statuses: HashMap<IncidentId, BTreeMap<i32, ReviewStatus>>,
    reminders: HashSet<ReminderKey>,
}

impl Tables {
    fn incident(&self, id: IncidentId) -> Result<&Incident, StoreError> {
        self.incidents
            .get(&id)
            .ok_or(StoreError::NotFound(Missing::Incident(id)))
    }

    fn submissions_of(&self, id: IncidentId) -> impl Iterator<Item = &IncidentWorkflow> {
        self.by_incident
            .get(&id)
            .into_iter()
            .flatten()
            .filter_map(|sid| self.submissions.get(sid))
    }

    fn latest(&self, id: IncidentId, position: i32) -> Option<&IncidentWorkflow> {
        self.submissions_of(id)
            .filter(|s| s.step_position == position)
            .max_by_key(|s| s.timestamp)
    }
}

/// Thread-safe, cloneable in-memory incident store.
#[derive(Debug, Clone, Default)]
pub struct MemoryRepository {
    tables: Arc<RwLock<Tables>>,
}

impl MemoryRepository {
    /// An empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of incidents stored.
    pub fn incident_count(&self) -> usize {
        self.tables.read().incidents.len()
    }

    /// Number of reminders recorded as sent.
    pub fn reminder_count(&self) -> usize {
        self.tables.read().reminders.len()
    }
}

#[async_trait]
impl IncidentRepository for MemoryRepository {
    async fn insert_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        if tables.incidents.contains_key(&incident.id) {
            return Err(StoreError::Backend(format!("{} already exists", incident.id)));
        }
        tables.incidents.insert(incident.id, incident.clone());
        Ok(())
    }

    async fn get_incident(&self, id: IncidentId) -> Result<Incident, StoreError> {
        self.tables.read().incident(id).cloned()
    }

    async fn update_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        match tables.incidents.get_mut(&incident.id) {
            Some(stored) => {
                *stored = incident.clone();
                Ok(())
            }
            None => Err(StoreError::NotFound(Missing::Incident(incident.id))),
        }
    }

    async fn list_ongoing_incidents(&self) -> Result<Vec<IncidentId>, StoreError> {
        let tables = self.tables.read();
        let mut ids: Vec<_> = tables
            .incidents
            .values()
            .filter(|i| i.status == IncidentStatus::Ongoing)
            .map(|i| i.id)
            .collect();
        ids.sort();
        Ok(ids)
    }

    async fn load_state(&self, id: IncidentId) -> Result<IncidentState, StoreError> {
        let tables = self.tables.read();
        let incident = tables.incident(id)?.clone();
        Ok(IncidentState {
            incident,
            submissions: tables.submissions_of(id).cloned().collect(),
            step_statuses: tables.step_statuses.get(&id).cloned().unwrap_or_default(),
        })
    }

    async fn find_latest_submission(
        &self,
        incident: IncidentId,
        position: i32,
    ) -> Result<Option<IncidentWorkflow>, StoreError> {
        let tables = self.tables.read();
        tables.incident(incident)?;
        Ok(tables.latest(incident, position).cloned())
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<IncidentWorkflow, StoreError> {
        self.tables
            .read()
            .submissions
            .get(&id)
            .cloned()
            .ok_or(StoreError::NotFound(Missing::Submission(id)))
    }

    async fn insert_submission(
        &self,
        submission: &IncidentWorkflow,
        expected_latest: Option<SubmissionId>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let incident = tables.incident(submission.incident)?;
        if !incident.is_ongoing() {
            return Err(StoreError::Closed(incident.id));
        }
        let current = tables
            .latest(submission.incident, submission.step_position)
            .map(|s| s.id);
        if current != expected_latest {
            return Err(StoreError::Conflict {
                incident: submission.incident,
                position: submission.step_position,
            });
        }
        tables.submissions.insert(submission.id, submission.clone());
        tables
            .by_incident
            .entry(submission.incident)
            .or_default()
            .push(submission.id);
        Ok(())
    }

    async fn set_review_status(
        &self,
        submission: SubmissionId,
        expected: ReviewStatus,
        new: ReviewStatus,
        comment: Option<String>,
    ) -> Result<(), StoreError> {
        let mut tables = self.tables.write();
        let stored = tables
            .submissions
            .get_mut(&submission)
            .ok_or(StoreError::NotFound(Missing::Submission(submission)))?;
        if stored.review_status != expected {
            return Err(StoreError::Conflict {
                incident: stored.incident,
                position: stored.step_position,
            });
        }
        stored.review_status = new;
        stored.comment = comment;
        Ok(())
    }

    async fn transition_step_status(
        &self,
        incident: IncidentId,
        position: i32,
        expected: ReviewStatus,
        new: ReviewStatus,
    ) -> Result<bool, StoreError> {
        let mut tables = self.tables.write();
        if !tables.incident(incident)?.is_ongoing() || tables.latest(incident, position).is_some() {
            return Ok(false);
        }
        let statuses = tables.step_statuses.entry(incident).or_default();
        let current = statuses
            .get(&position)
            .copied()
            .unwrap_or(ReviewStatus::Unsubmitted);
        if current != expected {
            return Ok(false);
        }
        statuses.insert(position, new);
        Ok(true)
    }

    async fn mark_reminder_sent(&self, key: &ReminderKey, _at: Timestamp) -> Result<bool, StoreError> {
        Ok(self.tables.write().reminders.insert(key.clone()))
    }

    async fn delete_closed_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let mut tables = self.tables.write();
        let doomed: Vec<IncidentId> = tables
            .incidents
            .values()
            .filter(|i| i.status == IncidentStatus::Closed && i.notification_date < cutoff)
            .map(|i| i.id)
            .collect();
        for id in &doomed {
            tables.incidents.remove(id);
            for sid in tables.by_incident.remove(id).unwrap_or_default() {
                tables.submissions.remove(&sid);
            }
            tables.step_statuses.remove(id);
            tables.reminders.retain(|k| &k.incident != id);
        }
        Ok(doomed.len() as u64)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
