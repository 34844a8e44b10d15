//! # Historical Rendering
//!
//! Lays a submission's answers out on the question set resolved as of the
//! submission timestamp, so a report reads the same years later as on the
//! day it was filed. Option codes are shown with the labels they had then.

use serde::Serialize;

use nisinp_core::{CategoryId, PlacementId, ReportId, SubmissionId, Timestamp};
use nisinp_state::{Answer, IncidentWorkflow};

use crate::schema::{QuestionKind, SchemaHistory};

/// One question with the answer given.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedAnswer {
    /// The placement answered.
    pub placement: PlacementId,
    /// Question text as of the submission.
    pub label: String,
    /// Answer kind as of the submission.
    pub kind: QuestionKind,
    /// Free text given, if any.
    pub text: Option<String>,
    /// Labels of the selected options; unknown codes are kept verbatim.
    pub selected: Vec<String>,
}

impl RenderedAnswer {
    /// Whether the question was left blank.
    pub fn is_blank(&self) -> bool {
        self.text.as_deref().map_or(true, str::is_empty) && self.selected.is_empty()
    }
}

/// One category of a rendered report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedSection {
    /// Category identifier.
    pub category: CategoryId,
    /// Category label.
    pub label: String,
    /// Every question of the category, answered or not.
    pub answers: Vec<RenderedAnswer>,
}

/// A submission rendered on its historical question set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RenderedReport {
    /// The submission.
    pub submission: SubmissionId,
    /// The report form.
    pub report: ReportId,
    /// Submission timestamp, the instant the schema was resolved at.
    pub as_of: Timestamp,
    /// Categories in display order.
    pub sections: Vec<RenderedSection>,
    /// Answers whose placement was not live at `as_of`.
    pub unplaced: Vec<Answer>,
}

/// Render `submission` on the question set live at its timestamp.
pub fn render_submission(schema: &SchemaHistory, submission: &IncidentWorkflow) -> RenderedReport {
    let set = schema.resolve(&submission.report, submission.timestamp);
    let sections = set
        .sections
        .iter()
        .map(|section| RenderedSection {
            category: section.category.clone(),
            label: section.label.clone(),
            answers: section
                .questions
                .iter()
                .map(|q| {
                    let answer = submission.answer_for(&q.placement);
                    let selected = answer
                        .map(|a| {
                            a.selected
                                .iter()
                                .map(|code| {
                                    q.options
                                        .iter()
                                        .find(|o| &o.code == code)
                                        .map_or_else(|| code.clone(), |o| o.label.clone())
                                })
                                .collect()
                        })
                        .unwrap_or_default();
                    RenderedAnswer {
                        placement: q.placement.clone(),
                        label: q.label.clone(),
                        kind: q.kind,
                        text: answer.and_then(|a| a.text.clone()),
                        selected,
                    }
                })
                .collect(),
        })
        .collect();
    let unplaced = submission
        .answers
        .iter()
        .filter(|a| set.question(&a.placement).is_none())
        .cloned()
        .collect();
    RenderedReport {
        submission: submission.id,
        report: submission.report.clone(),
        as_of: submission.timestamp,
        sections,
        unplaced,
    }
}
