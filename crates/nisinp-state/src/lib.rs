//! # nisinp-state — Incident and Report Lifecycles
//!
//! ## State Machines
//!
//! - **Review status** (`review.rs`): the per-report lifecycle
//!   `UNSUBMITTED → UNDER_REVIEW → PASSED | REVISION_REQUIRED`, with the
//!   deadline branch `UNSUBMITTED → OVERDUE` and the late path where a
//!   submission made after the deadline starts at `LATE_SUBMISSION`.
//!
//! - **Incident status** (`incident.rs`): `ONGOING → CLOSED`, closed being
//!   terminal.
//!
//! ## Records
//!
//! - [`IncidentWorkflow`] (`submission.rs`): one report submission. Append-only;
//!   only `review_status` and `comment` change after creation.
//! - [`IncidentState`] (`aggregate.rs`): an incident with its full submission
//!   history and the persisted deadline status of steps not yet submitted.
//!   "Latest" per step is always the submission with the greatest timestamp.

pub mod aggregate;
pub mod incident;
pub mod review;
pub mod submission;

pub use aggregate::IncidentState;
pub use incident::{Incident, IncidentStatus};
pub use review::{ReviewDecision, ReviewStatus};
pub use submission::{Answer, IncidentWorkflow};
