//! Store error types.

use thiserror::Error;

use nisinp_core::{EngineError, IncidentId, SubmissionId};

/// The record a lookup did not find.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Missing {
    /// An incident.
    Incident(IncidentId),
    /// A submission.
    Submission(SubmissionId),
}

impl std::fmt::Display for Missing {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Incident(id) => write!(f, "{id}"),
            Self::Submission(id) => write!(f, "{id}"),
        }
    }
}

/// Errors from repository operations.
#[derive(Error, Debug)]
pub enum StoreError {
    /// A compare-and-swap found a different current value.
    #[error("write conflict on {incident} step {position}")]
    Conflict {
        /// The incident written.
        incident: IncidentId,
        /// The contested step.
        position: i32,
    },

    /// The record does not exist.
    #[error("{0} not found")]
    NotFound(Missing),

    /// The incident is closed and accepts no new submissions.
    #[error("{0} is closed")]
    Closed(IncidentId),

    /// The backend failed (connection, query, transaction).
    #[error("storage backend error: {0}")]
    Backend(String),

    /// A stored value could not be decoded.
    #[error("corrupt stored value: {0}")]
    Corrupt(String),
}

impl From<StoreError> for EngineError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Conflict { incident, position } => {
                EngineError::StaleWriteConflict { incident, position }
            }
            StoreError::NotFound(Missing::Incident(id)) => EngineError::IncidentNotFound(id),
            StoreError::NotFound(Missing::Submission(id)) => EngineError::SubmissionNotFound(id),
            StoreError::Closed(id) => EngineError::IncidentClosed(id),
            StoreError::Backend(msg) | StoreError::Corrupt(msg) => EngineError::Storage(msg),
        }
    }
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Backend(err.to_string())
    }
}
