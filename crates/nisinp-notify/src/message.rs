//! Notification messages.

use serde::{Deserialize, Serialize};

use nisinp_core::IncidentId;

/// The event a notification reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    /// An incident was opened.
    Opening,
    /// A report was submitted.
    Submission,
    /// A report's status changed (review decision or deadline elapsed).
    StatusChanged,
    /// A report is due soon.
    Reminder,
    /// An incident was closed.
    Closing,
}

impl NotificationKind {
    /// Every kind.
    pub const ALL: [NotificationKind; 5] = [
        Self::Opening,
        Self::Submission,
        Self::StatusChanged,
        Self::Reminder,
        Self::Closing,
    ];

    /// Stable label, used in metrics and ticket payloads.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Opening => "opening",
            Self::Submission => "submission",
            Self::StatusChanged => "status_changed",
            Self::Reminder => "reminder",
            Self::Closing => "closing",
        }
    }
}

impl std::fmt::Display for NotificationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A rendered notification about one incident.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationMessage {
    /// The incident.
    pub incident_id: IncidentId,
    /// The incident's human-facing reference.
    pub incident_reference: String,
    /// What happened.
    pub kind: NotificationKind,
    /// The step concerned, if any.
    pub step_position: Option<i32>,
    /// Rendered subject.
    pub subject: String,
    /// Rendered body.
    pub body: String,
    /// Addresses to deliver to, when known.
    #[serde(default)]
    pub recipients: Vec<String>,
}
