//! # nisinp-workflow — The Reporting Workflow Engine
//!
//! Everything that decides *what may happen next* to an incident, as pure
//! functions over the catalog and an [`IncidentState`](nisinp_state::IncidentState).
//! Nothing here performs I/O; persistence and notification live in
//! `nisinp-store`, `nisinp-notify` and `nisinp-engine`.
//!
//! ## Modules
//!
//! - [`graph`]: [`StepGraph`], the ordered report steps of one
//!   regulation/regulator/sector pairing, and the [`StepGraphRegistry`]
//!   that selects one.
//! - [`schema`]: [`SchemaHistory`], question placements with an append-only
//!   snapshot history and a soft-delete window, resolved as of any instant.
//! - [`deadline`]: [`DeadlineEvaluator`], trigger reference times, whole-hour
//!   elapsed arithmetic and the `>=` overdue rule.
//! - [`sequencer`]: [`Sequencer`], strict linear fillability and next step.
//! - [`reminder`]: reminder rules matched at the exact hour mark.
//! - [`render`]: a submission laid out on its historical question set.

pub mod deadline;
pub mod graph;
pub mod reminder;
pub mod render;
pub mod schema;
pub mod sequencer;

pub use deadline::{is_deadline_exceeded, DeadlineEvaluator, ReferenceTime};
pub use graph::{ReminderRule, StepDefinition, StepGraph, StepGraphRegistry, TriggerKind};
pub use reminder::{due_reminders, DueReminder, ReminderKey};
pub use render::{render_submission, RenderedAnswer, RenderedReport, RenderedSection};
pub use schema::{
    CategoryDefinition, CategorySection, PlacementDefinition, PlacementRevision, PlacementState,
    QuestionKind, QuestionOption, QuestionSet, ResolvedQuestion, SchemaCatalog, SchemaHistory,
};
pub use sequencer::{Blocked, Sequencer};
