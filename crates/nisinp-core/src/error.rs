//! # Error Types — Structured Error Hierarchy
//!
//! All errors use `thiserror` for derive-based `Display` and `Error`
//! implementations.
//!
//! ## Propagation Policy
//!
//! - Structural errors (`GraphNotFound`, `StaleWriteConflict`) propagate to
//!   the caller and are never retried by the engine.
//! - Missing reference dates are not errors at all: the deadline evaluator
//!   absorbs them into `UNSUBMITTED`.
//! - Side-effect failures (`Notifier`) are isolated per incident by the
//!   sweeps and logged; they never abort a sweep.

use thiserror::Error;

use crate::identity::{IncidentId, RegulationId, RegulatorId, SectorId, StepGraphId, SubmissionId};

/// Top-level error type for engine operations.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No step graph matches the requested regulation/regulator/sector.
    #[error("no step graph for {regulation} / {regulator} / {sector}")]
    GraphNotFound {
        /// Requested regulation.
        regulation: RegulationId,
        /// Requested regulator.
        regulator: RegulatorId,
        /// Requested sector.
        sector: SectorId,
    },

    /// An incident references a step graph that is not in the catalog.
    #[error("step graph {0} is not in the catalog")]
    UnknownGraph(StepGraphId),

    /// A concurrent writer created a submission for this step first.
    /// The caller must re-fetch the incident and decide again.
    #[error("stale write for {incident} step {position}: another submission was recorded first")]
    StaleWriteConflict {
        /// The incident being written.
        incident: IncidentId,
        /// The contested step position.
        position: i32,
    },

    /// The incident does not exist.
    #[error("{0} not found")]
    IncidentNotFound(IncidentId),

    /// The submission does not exist.
    #[error("{0} not found")]
    SubmissionNotFound(SubmissionId),

    /// The step graph has no step at this position.
    #[error("step graph {graph} has no step at position {position}")]
    StepNotFound {
        /// The graph searched.
        graph: StepGraphId,
        /// The missing position.
        position: i32,
    },

    /// The incident is closed; no submissions or deadline transitions apply.
    #[error("{0} is closed")]
    IncidentClosed(IncidentId),

    /// The step cannot be filled at this point of the sequence.
    #[error("step {position} of {incident} is not fillable: {reason}")]
    NotFillable {
        /// The incident.
        incident: IncidentId,
        /// The requested step.
        position: i32,
        /// Why the sequencer refused.
        reason: String,
    },

    /// State machine transition rejected.
    #[error(transparent)]
    State(#[from] StateError),

    /// Caller-supplied data failed validation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Persistence layer failure.
    #[error("storage error: {0}")]
    Storage(String),

    /// Notification dispatch failure.
    #[error("notifier error: {0}")]
    Notifier(String),

    /// An operation exceeded its time budget.
    #[error("timed out after {0:?}")]
    Timeout(std::time::Duration),
}

/// Error in state machine transitions.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StateError {
    /// Attempted an invalid state transition.
    #[error("invalid transition from {from} to {to}: {reason}")]
    InvalidTransition {
        /// Current state name.
        from: String,
        /// Attempted target state name.
        to: String,
        /// Reason the transition was rejected.
        reason: String,
    },

    /// The machine is in a terminal state.
    #[error("{machine} is in terminal state {state}")]
    TerminalState {
        /// Which state machine.
        machine: String,
        /// The terminal state.
        state: String,
    },
}

/// Errors found while loading or validating the workflow catalog.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CatalogError {
    /// Two steps of the same graph share a position.
    #[error("graph {graph}: duplicate step position {position}")]
    DuplicatePosition {
        /// The offending graph.
        graph: StepGraphId,
        /// The repeated position.
        position: i32,
    },

    /// A graph has no steps at all.
    #[error("graph {0} has no steps")]
    EmptyGraph(StepGraphId),

    /// Two graphs share an identifier.
    #[error("duplicate graph id {0}")]
    DuplicateGraph(StepGraphId),

    /// A reference to another catalog entry does not resolve.
    #[error("{owner}: unknown {kind} {reference}")]
    DanglingReference {
        /// What holds the reference.
        owner: String,
        /// Kind of the missing entry.
        kind: String,
        /// The unresolved code.
        reference: String,
    },

    /// Anything else structurally wrong with a catalog entry.
    #[error("{0}")]
    Invalid(String),
}
