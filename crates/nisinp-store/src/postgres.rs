//! # PostgreSQL Repository
//!
//! Incident state in PostgreSQL via SQLx runtime queries. Status enums are
//! stored by their wire names; answers as JSONB.
//!
//! Submission writes take `SELECT ... FOR UPDATE` on the incident row inside
//! a transaction, so the "latest submission is still X" check and the insert
//! cannot interleave with another writer of the same incident. Step status
//! transitions are a single conditional `UPDATE`/`INSERT`.

use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::postgres::{PgPool, PgPoolOptions};
use uuid::Uuid;

use nisinp_core::{
    IncidentId, RegulationId, RegulatorId, ReportId, SectorId, StepGraphId, SubmissionId,
    Timestamp,
};
use nisinp_state::{
    Answer, Incident, IncidentState, IncidentStatus, IncidentWorkflow, ReviewStatus,
};
use nisinp_workflow::ReminderKey;

use crate::error::{Missing, StoreError};
use crate::repository::IncidentRepository;

/// Initialize the connection pool from `DATABASE_URL` and run migrations.
///
/// Returns `None` if `DATABASE_URL` is not set (in-memory mode).
pub async fn init_pool() -> Result<Option<PgPool>, StoreError> {
    let url = match std::env::var("DATABASE_URL") {
        Ok(url) => url,
        Err(_) => {
            tracing::warn!(
                "DATABASE_URL not set, running with the in-memory store. \
                 Incidents will not survive restarts."
            );
            return Ok(None);
        }
    };
    connect(&url).await.map(Some)
}

/// Connect to `url` and run migrations.
pub async fn connect(url: &str) -> Result<PgPool, StoreError> {
    let pool = PgPoolOptions::new()
        .max_connections(20)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(5))
        .connect(url)
        .await?;
    tracing::info!("Connected to PostgreSQL");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .map_err(|e| StoreError::Backend(format!("migration failed: {e}")))?;
    tracing::info!("Database migrations applied");
    Ok(pool)
}

/// Incident repository backed by PostgreSQL.
#[derive(Debug, Clone)]
pub struct PgRepository {
    pool: PgPool,
}

impl PgRepository {
    /// Wrap a connected pool.
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

const INCIDENT_COLUMNS: &str = "id, reference, step_graph, regulation, regulator, sector, status, \
     notification_date, detection_date, starting_date, timezone, contact_email, closed_at";

const SUBMISSION_COLUMNS: &str =
    "id, incident_id, step_position, report, \"timestamp\", review_status, comment, answers";

#[async_trait]
impl IncidentRepository for PgRepository {
    async fn insert_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        sqlx::query(
            "INSERT INTO incidents (id, reference, step_graph, regulation, regulator, sector, status,
                 notification_date, detection_date, starting_date, timezone, contact_email, closed_at)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)",
        )
        .bind(incident.id.0)
        .bind(&incident.reference)
        .bind(incident.step_graph.as_str())
        .bind(incident.regulation.as_str())
        .bind(incident.regulator.as_str())
        .bind(incident.sector.as_str())
        .bind(incident.status.as_str())
        .bind(utc(incident.notification_date))
        .bind(incident.detection_date.map(utc))
        .bind(incident.starting_date.map(utc))
        .bind(&incident.timezone)
        .bind(&incident.contact_email)
        .bind(incident.closed_at.map(utc))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    async fn get_incident(&self, id: IncidentId) -> Result<Incident, StoreError> {
        let row = sqlx::query_as::<_, IncidentRow>(&format!(
            "SELECT {INCIDENT_COLUMNS} FROM incidents WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound(Missing::Incident(id)))?
            .into_record()
    }

    async fn update_incident(&self, incident: &Incident) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE incidents SET status = $1, detection_date = $2, starting_date = $3,
                 contact_email = $4, closed_at = $5
             WHERE id = $6",
        )
        .bind(incident.status.as_str())
        .bind(incident.detection_date.map(utc))
        .bind(incident.starting_date.map(utc))
        .bind(&incident.contact_email)
        .bind(incident.closed_at.map(utc))
        .bind(incident.id.0)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound(Missing::Incident(incident.id)));
        }
        Ok(())
    }

    async fn list_ongoing_incidents(&self) -> Result<Vec<IncidentId>, StoreError> {
        let ids: Vec<(Uuid,)> =
            sqlx::query_as("SELECT id FROM incidents WHERE status = $1 ORDER BY id")
                .bind(IncidentStatus::Ongoing.as_str())
                .fetch_all(&self.pool)
                .await?;
        Ok(ids.into_iter().map(|(id,)| IncidentId(id)).collect())
    }

    async fn load_state(&self, id: IncidentId) -> Result<IncidentState, StoreError> {
        let incident = self.get_incident(id).await?;
        let rows = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM incident_workflows
             WHERE incident_id = $1 ORDER BY \"timestamp\", seq"
        ))
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;
        let submissions = rows
            .into_iter()
            .map(SubmissionRow::into_record)
            .collect::<Result<Vec<_>, _>>()?;

        let statuses: Vec<(i32, String)> = sqlx::query_as(
            "SELECT step_position, status FROM incident_step_status WHERE incident_id = $1",
        )
        .bind(id.0)
        .fetch_all(&self.pool)
        .await?;
        let step_statuses = statuses
            .into_iter()
            .map(|(position, status)| parse_review_status(&status).map(|s| (position, s)))
            .collect::<Result<_, StoreError>>()?;

        Ok(IncidentState {
            incident,
            submissions,
            step_statuses,
        })
    }

    async fn find_latest_submission(
        &self,
        incident: IncidentId,
        position: i32,
    ) -> Result<Option<IncidentWorkflow>, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM incident_workflows
             WHERE incident_id = $1 AND step_position = $2
             ORDER BY \"timestamp\" DESC, seq DESC LIMIT 1"
        ))
        .bind(incident.0)
        .bind(position)
        .fetch_optional(&self.pool)
        .await?;
        row.map(SubmissionRow::into_record).transpose()
    }

    async fn get_submission(&self, id: SubmissionId) -> Result<IncidentWorkflow, StoreError> {
        let row = sqlx::query_as::<_, SubmissionRow>(&format!(
            "SELECT {SUBMISSION_COLUMNS} FROM incident_workflows WHERE id = $1"
        ))
        .bind(id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.ok_or(StoreError::NotFound(Missing::Submission(id)))?
            .into_record()
    }

    async fn insert_submission(
        &self,
        submission: &IncidentWorkflow,
        expected_latest: Option<SubmissionId>,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;

        let status: Option<(String,)> =
            sqlx::query_as("SELECT status FROM incidents WHERE id = $1 FOR UPDATE")
                .bind(submission.incident.0)
                .fetch_optional(&mut *tx)
                .await?;
        let (status,) = status.ok_or(StoreError::NotFound(Missing::Incident(submission.incident)))?;
        if parse_incident_status(&status)? != IncidentStatus::Ongoing {
            return Err(StoreError::Closed(submission.incident));
        }

        let current: Option<(Uuid,)> = sqlx::query_as(
            "SELECT id FROM incident_workflows
             WHERE incident_id = $1 AND step_position = $2
             ORDER BY \"timestamp\" DESC, seq DESC LIMIT 1",
        )
        .bind(submission.incident.0)
        .bind(submission.step_position)
        .fetch_optional(&mut *tx)
        .await?;
        if current.map(|(id,)| SubmissionId(id)) != expected_latest {
            return Err(StoreError::Conflict {
                incident: submission.incident,
                position: submission.step_position,
            });
        }

        let answers = serde_json::to_value(&submission.answers)
            .map_err(|e| StoreError::Corrupt(format!("failed to serialize answers: {e}")))?;
        sqlx::query(
            "INSERT INTO incident_workflows
                 (id, incident_id, step_position, report, \"timestamp\", review_status, comment, answers)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(submission.id.0)
        .bind(submission.incident.0)
        .bind(submission.step_position)
        .bind(submission.report.as_str())
        .bind(utc(submission.timestamp))
        .bind(submission.review_status.as_str())
        .bind(&submission.comment)
        .bind(&answers)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(())
    }

    async fn set_review_status(
        &self,
        submission: SubmissionId,
        expected: ReviewStatus,
        new: ReviewStatus,
        comment: Option<String>,
    ) -> Result<(), StoreError> {
        let result = sqlx::query(
            "UPDATE incident_workflows SET review_status = $1, comment = $2
             WHERE id = $3 AND review_status = $4",
        )
        .bind(new.as_str())
        .bind(&comment)
        .bind(submission.0)
        .bind(expected.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            let stored = self.get_submission(submission).await?;
            return Err(StoreError::Conflict {
                incident: stored.incident,
                position: stored.step_position,
            });
        }
        Ok(())
    }

    async fn transition_step_status(
        &self,
        incident: IncidentId,
        position: i32,
        expected: ReviewStatus,
        new: ReviewStatus,
    ) -> Result<bool, StoreError> {
        // A missing row reads as UNSUBMITTED, so the insert path only
        // applies when that is what the caller expects.
        let result = sqlx::query(
            "WITH eligible AS (
                 SELECT i.id FROM incidents i
                 WHERE i.id = $1 AND i.status = $5
                   AND NOT EXISTS (
                       SELECT 1 FROM incident_workflows w
                       WHERE w.incident_id = i.id AND w.step_position = $2)
             )
             INSERT INTO incident_step_status (incident_id, step_position, status, updated_at)
             SELECT id, $2, $4, now() FROM eligible
             WHERE $3 = $6
             ON CONFLICT (incident_id, step_position) DO UPDATE
                 SET status = EXCLUDED.status, updated_at = EXCLUDED.updated_at
                 WHERE incident_step_status.status = $3",
        )
        .bind(incident.0)
        .bind(position)
        .bind(expected.as_str())
        .bind(new.as_str())
        .bind(IncidentStatus::Ongoing.as_str())
        .bind(ReviewStatus::Unsubmitted.as_str())
        .execute(&self.pool)
        .await?;
        if result.rows_affected() > 0 {
            return Ok(true);
        }
        if expected == ReviewStatus::Unsubmitted {
            return Ok(false);
        }
        // Expected a stored non-default status: plain conditional update.
        let result = sqlx::query(
            "UPDATE incident_step_status s SET status = $1, updated_at = now()
             FROM incidents i
             WHERE s.incident_id = $2 AND s.step_position = $3 AND s.status = $4
               AND i.id = s.incident_id AND i.status = $5
               AND NOT EXISTS (
                   SELECT 1 FROM incident_workflows w
                   WHERE w.incident_id = s.incident_id AND w.step_position = s.step_position)",
        )
        .bind(new.as_str())
        .bind(incident.0)
        .bind(position)
        .bind(expected.as_str())
        .bind(IncidentStatus::Ongoing.as_str())
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn mark_reminder_sent(&self, key: &ReminderKey, at: Timestamp) -> Result<bool, StoreError> {
        let result = sqlx::query(
            "INSERT INTO reminder_log (incident_id, step_position, template_id, delay_hours, sent_at)
             VALUES ($1, $2, $3, $4, $5)
             ON CONFLICT DO NOTHING",
        )
        .bind(key.incident.0)
        .bind(key.step_position)
        .bind(key.template.as_str())
        .bind(i32::try_from(key.delay_hours).unwrap_or(i32::MAX))
        .bind(utc(at))
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    async fn delete_closed_before(&self, cutoff: Timestamp) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM incidents WHERE status = $1 AND notification_date < $2")
            .bind(IncidentStatus::Closed.as_str())
            .bind(utc(cutoff))
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1").execute(&self.pool).await?;
        Ok(())
    }
}

// ─── Row mapping ────────────────────────────────────────────────────

fn utc(ts: Timestamp) -> DateTime<Utc> {
    *ts.as_datetime()
}

fn parse_review_status(s: &str) -> Result<ReviewStatus, StoreError> {
    s.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown review status {s:?}")))
}

fn parse_incident_status(s: &str) -> Result<IncidentStatus, StoreError> {
    s.parse()
        .map_err(|_| StoreError::Corrupt(format!("unknown incident status {s:?}")))
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct IncidentRow {
    id: Uuid,
    reference: String,
    step_graph: String,
    regulation: String,
    regulator: String,
    sector: String,
    status: String,
    notification_date: DateTime<Utc>,
    detection_date: Option<DateTime<Utc>>,
    starting_date: Option<DateTime<Utc>>,
    timezone: String,
    contact_email: Option<String>,
    closed_at: Option<DateTime<Utc>>,
}

impl IncidentRow {
    fn into_record(self) -> Result<Incident, StoreError> {
        Ok(Incident {
            id: IncidentId(self.id),
            reference: self.reference,
            step_graph: StepGraphId::new(self.step_graph),
            regulation: RegulationId::new(self.regulation),
            regulator: RegulatorId::new(self.regulator),
            sector: SectorId::new(self.sector),
            status: parse_incident_status(&self.status)?,
            notification_date: Timestamp::from_utc(self.notification_date),
            detection_date: self.detection_date.map(Timestamp::from_utc),
            starting_date: self.starting_date.map(Timestamp::from_utc),
            timezone: self.timezone,
            contact_email: self.contact_email,
            closed_at: self.closed_at.map(Timestamp::from_utc),
        })
    }
}

/// Internal row type for SQLx mapping.
#[derive(sqlx::FromRow)]
struct SubmissionRow {
    id: Uuid,
    incident_id: Uuid,
    step_position: i32,
    report: String,
    timestamp: DateTime<Utc>,
    review_status: String,
    comment: Option<String>,
    answers: serde_json::Value,
}

impl SubmissionRow {
    fn into_record(self) -> Result<IncidentWorkflow, StoreError> {
        let answers: Vec<Answer> = serde_json::from_value(self.answers).map_err(|e| {
            StoreError::Corrupt(format!("answers of submission {}: {e}", self.id))
        })?;
        Ok(IncidentWorkflow {
            id: SubmissionId(self.id),
            incident: IncidentId(self.incident_id),
            step_position: self.step_position,
            report: ReportId::new(self.report),
            timestamp: Timestamp::from_utc(self.timestamp),
            review_status: parse_review_status(&self.review_status)?,
            comment: self.comment,
            answers,
        })
    }
}
