//! # nisinp-core — Foundational Types for the Incident Notification Engine
//!
//! Every other crate in the workspace depends on `nisinp-core`; it depends on
//! nothing internal.
//!
//! ## Key Design Principles
//!
//! 1. **Newtype wrappers for identifiers.** `IncidentId`, `SubmissionId`,
//!    `StepGraphId`, `ReportId`, `RegulationId`, ... No bare strings or UUIDs
//!    cross a crate boundary.
//!
//! 2. **UTC-only, seconds-precision timestamps.** Deadline arithmetic counts
//!    whole elapsed hours between two [`Timestamp`]s, so sub-second jitter
//!    can never move a step across its deadline.
//!
//! 3. **Time is injected.** Nothing in the engine calls `Utc::now()`
//!    directly; it asks a [`TimeSource`]. Tests drive a [`ManualClock`].
//!
//! ## Crate Policy
//!
//! - No dependencies on other `nisinp-*` crates.
//! - No `unsafe` code.
//! - No `panic!()` or `.unwrap()` outside tests.

pub mod clock;
pub mod error;
pub mod identity;
pub mod temporal;

pub use clock::{ManualClock, SystemClock, TimeSource};
pub use error::{CatalogError, EngineError, StateError};
pub use identity::{
    CategoryId, EmailTemplateId, IncidentId, PlacementId, QuestionId, RegulationId, RegulatorId,
    ReportId, SectorId, StepGraphId, SubmissionId,
};
pub use temporal::Timestamp;
