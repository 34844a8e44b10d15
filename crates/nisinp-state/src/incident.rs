//! # Incident Lifecycle
//!
//! ```text
//! ONGOING ──close──▶ CLOSED (terminal)
//! ```
//!
//! An incident is opened at preliminary notification and carries the dates
//! the deadline rules are computed from. Once closed, no new submission may
//! be created and no deadline transition fires.

use std::str::FromStr;

use serde::{Deserialize, Serialize};

use nisinp_core::{
    IncidentId, RegulationId, RegulatorId, SectorId, StateError, StepGraphId, Timestamp,
};

/// Top-level status of an incident.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IncidentStatus {
    /// Reporting is in progress.
    Ongoing,
    /// Reporting is finished (terminal).
    Closed,
}

impl IncidentStatus {
    /// Whether this state is terminal.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ongoing => "ONGOING",
            Self::Closed => "CLOSED",
        }
    }
}

impl std::fmt::Display for IncidentStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for IncidentStatus {
    type Err = StateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "ONGOING" => Ok(Self::Ongoing),
            "CLOSED" => Ok(Self::Closed),
            other => Err(StateError::InvalidTransition {
                from: other.to_string(),
                to: "?".to_string(),
                reason: "unknown incident status".to_string(),
            }),
        }
    }
}

/// An incident notified to a regulator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Incident {
    /// Unique identifier.
    pub id: IncidentId,
    /// Human-facing reference shown to operators and regulators.
    pub reference: String,
    /// The step graph governing this incident's reports.
    pub step_graph: StepGraphId,
    /// Regulation the incident is reported under.
    pub regulation: RegulationId,
    /// Regulator receiving the reports.
    pub regulator: RegulatorId,
    /// Sector of the affected operator.
    pub sector: SectorId,
    /// Current lifecycle status.
    pub status: IncidentStatus,
    /// When the incident was notified.
    pub notification_date: Timestamp,
    /// When the incident was detected, if known yet.
    pub detection_date: Option<Timestamp>,
    /// When the incident started, if known.
    pub starting_date: Option<Timestamp>,
    /// IANA timezone the operator reported in, used only for display.
    pub timezone: String,
    /// Contact address for the reporting operator.
    pub contact_email: Option<String>,
    /// When the incident was closed.
    pub closed_at: Option<Timestamp>,
}

impl Incident {
    /// Create an ongoing incident notified at `notification_date`.
    pub fn new(
        reference: impl Into<String>,
        step_graph: StepGraphId,
        regulation: RegulationId,
        regulator: RegulatorId,
        sector: SectorId,
        notification_date: Timestamp,
    ) -> Self {
        Self {
            id: IncidentId::new(),
            reference: reference.into(),
            step_graph,
            regulation,
            regulator,
            sector,
            status: IncidentStatus::Ongoing,
            notification_date,
            detection_date: None,
            starting_date: None,
            timezone: "UTC".to_string(),
            contact_email: None,
            closed_at: None,
        }
    }

    /// Builder: set the detection date.
    pub fn with_detection_date(mut self, detection_date: Timestamp) -> Self {
        self.detection_date = Some(detection_date);
        self
    }

    /// Builder: set the starting date.
    pub fn with_starting_date(mut self, starting_date: Timestamp) -> Self {
        self.starting_date = Some(starting_date);
        self
    }

    /// Builder: set the reporting timezone.
    pub fn with_timezone(mut self, timezone: impl Into<String>) -> Self {
        self.timezone = timezone.into();
        self
    }

    /// Builder: set the contact email.
    pub fn with_contact_email(mut self, email: impl Into<String>) -> Self {
        self.contact_email = Some(email.into());
        self
    }

    /// Whether the incident still accepts reports.
    pub fn is_ongoing(&self) -> bool {
        self.status == IncidentStatus::Ongoing
    }

    /// Record the detection date once it becomes known (ONGOING only).
    pub fn set_detection_date(&mut self, detection_date: Timestamp) -> Result<(), StateError> {
        self.require_ongoing()?;
        self.detection_date = Some(detection_date);
        Ok(())
    }

    /// Close the incident (ONGOING → CLOSED).
    pub fn close(&mut self, at: Timestamp) -> Result<(), StateError> {
        self.require_ongoing()?;
        self.status = IncidentStatus::Closed;
        self.closed_at = Some(at);
        Ok(())
    }

    fn require_ongoing(&self) -> Result<(), StateError> {
        if self.status.is_terminal() {
            return Err(StateError::TerminalState {
                machine: self.id.to_string(),
                state: self.status.to_string(),
            });
        }
        Ok(())
    }
}
