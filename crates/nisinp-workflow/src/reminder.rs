//! # Reminder Rules
//!
//! A reminder rule fires for an unsubmitted step when the whole hours
//! elapsed since its trigger are *exactly* `delay_hours`. This is narrower
//! than the overdue rule (`>=`): a reminder belongs to one hour mark, and a
//! sweep that misses that hour entirely skips it.
//!
//! Two sweeps inside the same hour both match; the engine records each
//! [`ReminderKey`] before dispatch so the second one finds it taken.

use serde::{Deserialize, Serialize};

use nisinp_core::{EmailTemplateId, IncidentId, Timestamp};
use nisinp_state::IncidentState;

use crate::deadline::{DeadlineEvaluator, ReferenceTime};
use crate::graph::{StepGraph, TriggerKind};

/// Identity of one reminder dispatch.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ReminderKey {
    /// The incident.
    pub incident: IncidentId,
    /// The step reminded about.
    pub step_position: i32,
    /// The reminder template.
    pub template: EmailTemplateId,
    /// The rule's delay.
    pub delay_hours: u32,
}

/// A reminder whose hour mark is now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DueReminder {
    /// Dispatch identity.
    pub key: ReminderKey,
    /// The rule's trigger.
    pub trigger: TriggerKind,
    /// The instant the delay counted from.
    pub reference: Timestamp,
}

/// Reminders due at `now` for every unsubmitted step of an ongoing incident.
pub fn due_reminders(graph: &StepGraph, state: &IncidentState, now: Timestamp) -> Vec<DueReminder> {
    if !state.incident.is_ongoing() {
        return Vec::new();
    }
    let evaluator = DeadlineEvaluator::new(graph);
    let mut due = Vec::new();
    for step in graph.steps() {
        if state.has_submission(step.position) {
            continue;
        }
        for rule in &step.reminders {
            let ReferenceTime::At(reference) =
                evaluator.reference_time(rule.trigger, step.position, state)
            else {
                continue;
            };
            if now.elapsed_hours_since(reference) == i64::from(rule.delay_hours) {
                due.push(DueReminder {
                    key: ReminderKey {
                        incident: state.incident.id,
                        step_position: step.position,
                        template: rule.template.clone(),
                        delay_hours: rule.delay_hours,
                    },
                    trigger: rule.trigger,
                    reference,
                });
            }
        }
    }
    due
}
