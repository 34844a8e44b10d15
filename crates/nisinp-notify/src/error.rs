//! Notifier error types.

use std::time::Duration;

use nisinp_core::EngineError;

/// Errors from dispatching a notification.
#[derive(Debug, thiserror::Error)]
pub enum NotifierError {
    /// The endpoint could not be reached after all retries.
    #[error("notifier unavailable: {0}")]
    Unavailable(String),
    /// The endpoint answered with a non-2xx status.
    #[error("notifier rejected the message with {status}: {body}")]
    Rejected {
        /// HTTP status code.
        status: u16,
        /// Response body, for diagnostics.
        body: String,
    },
    /// The dispatch exceeded its time budget.
    #[error("notifier timed out after {0:?}")]
    Timeout(Duration),
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

impl From<NotifierError> for EngineError {
    fn from(err: NotifierError) -> Self {
        match err {
            NotifierError::Timeout(d) => EngineError::Timeout(d),
            other => EngineError::Notifier(other.to_string()),
        }
    }
}
