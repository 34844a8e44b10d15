//! # Domain Identity Newtypes
//!
//! Newtype wrappers for every identifier the engine handles. You cannot pass
//! a `ReportId` where a `StepGraphId` is expected.
//!
//! Two families:
//!
//! - **Runtime records** (`IncidentId`, `SubmissionId`) are random UUIDs minted
//!   when the record is created.
//! - **Catalog references** (`StepGraphId`, `ReportId`, `RegulationId`, ...) are
//!   stable string codes chosen by whoever maintains the workflow catalog, so
//!   they stay readable in configuration files and log lines.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for an incident (the aggregate root).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct IncidentId(pub Uuid);

/// Unique identifier for one report submission (an `IncidentWorkflow` record).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SubmissionId(pub Uuid);

impl IncidentId {
    /// Generate a new random incident identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for IncidentId {
    fn default() -> Self {
        Self::new()
    }
}

impl SubmissionId {
    /// Generate a new random submission identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Access the inner UUID.
    pub fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SubmissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for IncidentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "incident:{}", self.0)
    }
}

impl std::fmt::Display for SubmissionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "submission:{}", self.0)
    }
}

macro_rules! catalog_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            /// Wrap a catalog code.
            pub fn new(code: impl Into<String>) -> Self {
                Self(code.into())
            }

            /// The raw catalog code.
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, concat!($prefix, ":{}"), self.0)
            }
        }
    };
}

catalog_id!(
    /// A regulation (e.g. NIS2, GDPR) — one axis selecting a step graph.
    RegulationId,
    "regulation"
);
catalog_id!(
    /// A regulator (competent authority) — one axis selecting a step graph.
    RegulatorId,
    "regulator"
);
catalog_id!(
    /// A sector (energy, transport, ...) — one axis selecting a step graph.
    SectorId,
    "sector"
);
catalog_id!(
    /// A step graph: the ordered reports for one regulation/regulator/sector pairing.
    StepGraphId,
    "graph"
);
catalog_id!(
    /// A report definition (a "workflow" form) whose questions are versioned.
    ReportId,
    "report"
);
catalog_id!(
    /// A question, independent of where it is placed.
    QuestionId,
    "question"
);
catalog_id!(
    /// A question category used to group questions on a report.
    CategoryId,
    "category"
);
catalog_id!(
    /// The placement of one question on one report (category + position).
    PlacementId,
    "placement"
);
catalog_id!(
    /// An email / notification template.
    EmailTemplateId,
    "template"
);
