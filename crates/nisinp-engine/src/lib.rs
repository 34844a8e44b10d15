//! # nisinp-engine — Incident Workflow Engine
//!
//! Wires the pure workflow rules of `nisinp-workflow` to persistence and
//! notification dispatch.
//!
//! ## Writers
//!
//! Two kinds of writer touch incident state, and both go through the same
//! `Sequencer` and `DeadlineEvaluator`:
//!
//! - [`IncidentService`]: the intake "done" handler and the regulator's
//!   actions (open, submit, review, close).
//! - The sweeps: [`ReconciliationSweep`] persists OVERDUE transitions,
//!   [`ReminderSweep`] sends hour-mark reminders, [`RetentionSweep`] deletes
//!   old closed incidents.
//!
//! ## Side-effect gating
//!
//! A notification is only dispatched after the state change that causes it
//! has been written by a compare-and-swap that this caller won. Two sweeps
//! racing over the same incident therefore notify at most once per
//! transition. Delivery itself is at-least-once at best: a failed dispatch
//! is logged and not retried.
//!
//! ## Scheduling
//!
//! [`Scheduler`] runs each sweep on its own interval, single-flight, fanning
//! incidents out over a bounded worker pool with a per-incident timeout.

pub mod catalog;
pub mod context;
pub mod locks;
pub mod metrics;
pub mod scheduler;
pub mod service;
pub mod sweep;

pub use catalog::Catalog;
pub use context::EngineContext;
pub use locks::IncidentLocks;
pub use metrics::SweepMetrics;
pub use scheduler::{Scheduler, SchedulerConfig};
pub use service::{IncidentService, OpenIncident, StepOverview};
pub use sweep::{
    ReconciliationSweep, ReminderSweep, RetentionSweep, Sweep, SweepOptions, SweepReport,
    DEFAULT_RETENTION_DAYS,
};

#[cfg(test)]
pub(crate) mod testing;
