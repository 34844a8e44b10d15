//! # Schema History — Question Sets As Of Any Instant
//!
//! Report forms change over time: questions are added, reworded, moved
//! between categories and removed. A submission must always be rendered with
//! the question set that was live when it was made.
//!
//! ## Design
//!
//! Each question placement on a report is a live row plus an append-only list
//! of snapshots. Editing a placement pushes the state it had *before* the
//! edit, keyed by the edit instant; removing it only sets `deleted_at`.
//!
//! Resolving a report as of instant `t`:
//!
//! 1. Keep placements with `created_at <= t` and no `deleted_at`, or
//!    `deleted_at >= t`.
//! 2. For each kept placement, use the earliest snapshot with
//!    `snapshot_ts >= t`: the state that was superseded first at or after
//!    `t`, hence the one live at `t`.
//! 3. Otherwise use the live state.
//!
//! Both bounds are inclusive: at the instant of an edit the question still
//! reads as before the edit, and at the instant of a removal it is still
//! present. This holds however many later edits exist.
//!
//! Category labels and ordering are catalog data and are not versioned.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

use nisinp_core::{CatalogError, CategoryId, PlacementId, QuestionId, ReportId, Timestamp};

/// The kind of answer a question expects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QuestionKind {
    /// Free text.
    FreeText,
    /// A date.
    Date,
    /// Exactly one predefined option.
    SingleChoice,
    /// Any number of predefined options.
    MultipleChoice,
    /// One option plus optional free text.
    SingleChoiceWithText,
    /// Several options plus optional free text.
    MultipleChoiceWithText,
}

impl QuestionKind {
    /// Whether answers may carry free text.
    pub fn has_text(self) -> bool {
        !matches!(self, Self::SingleChoice | Self::MultipleChoice)
    }

    /// Most options one answer may select.
    pub fn max_selected(self) -> usize {
        match self {
            Self::FreeText | Self::Date => 0,
            Self::SingleChoice | Self::SingleChoiceWithText => 1,
            Self::MultipleChoice | Self::MultipleChoiceWithText => usize::MAX,
        }
    }
}

/// A predefined answer option.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionOption {
    /// Stable code stored in answers.
    pub code: String,
    /// Display label.
    pub label: String,
}

/// A question category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryDefinition {
    /// Category identifier.
    pub id: CategoryId,
    /// Display label.
    pub label: String,
    /// Ordering key among categories.
    pub position: i32,
}

/// Everything about a placement that an edit can change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementState {
    /// The question placed.
    pub question: QuestionId,
    /// Category the question is shown under.
    pub category: CategoryId,
    /// Ordering key within the category.
    pub position: i32,
    /// Question text.
    pub label: String,
    /// Expected answer kind.
    pub kind: QuestionKind,
    /// Predefined options, for choice kinds.
    #[serde(default)]
    pub options: Vec<QuestionOption>,
    /// Whether an answer is mandatory.
    #[serde(default)]
    pub mandatory: bool,
}

/// A superseded placement state.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Snapshot {
    snapshot_ts: Timestamp,
    state: PlacementState,
}

/// One question placed on one report, with its edit history.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Placement {
    id: PlacementId,
    report: ReportId,
    created_at: Timestamp,
    updated_at: Timestamp,
    deleted_at: Option<Timestamp>,
    current: PlacementState,
    /// Ascending by `snapshot_ts`.
    history: Vec<Snapshot>,
}

impl Placement {
    fn is_live_at(&self, as_of: Timestamp) -> bool {
        self.created_at <= as_of && self.deleted_at.map_or(true, |d| d >= as_of)
    }

    fn state_at(&self, as_of: Timestamp) -> &PlacementState {
        self.history
            .iter()
            .find(|s| s.snapshot_ts >= as_of)
            .map_or(&self.current, |s| &s.state)
    }
}

/// A question as it appeared on a report at some instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolvedQuestion {
    /// Placement the answer refers to.
    pub placement: PlacementId,
    /// The question.
    pub question: QuestionId,
    /// Question text at that instant.
    pub label: String,
    /// Answer kind at that instant.
    pub kind: QuestionKind,
    /// Options at that instant.
    pub options: Vec<QuestionOption>,
    /// Whether an answer was mandatory.
    pub mandatory: bool,
    /// Ordering key within the category.
    pub position: i32,
}

/// One category with its questions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CategorySection {
    /// Category identifier.
    pub category: CategoryId,
    /// Category label.
    pub label: String,
    /// Questions in position order.
    pub questions: Vec<ResolvedQuestion>,
}

/// The question set of one report as of one instant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct QuestionSet {
    /// The report.
    pub report: ReportId,
    /// The instant resolved.
    pub as_of: Timestamp,
    /// Categories in position order; empty categories are omitted.
    pub sections: Vec<CategorySection>,
}

impl QuestionSet {
    /// All questions in display order.
    pub fn questions(&self) -> impl Iterator<Item = &ResolvedQuestion> {
        self.sections.iter().flat_map(|s| s.questions.iter())
    }

    /// The question at a placement, if it was live.
    pub fn question(&self, placement: &PlacementId) -> Option<&ResolvedQuestion> {
        self.questions().find(|q| &q.placement == placement)
    }

    /// Number of questions.
    pub fn len(&self) -> usize {
        self.sections.iter().map(|s| s.questions.len()).sum()
    }

    /// Whether the set has no questions.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

// ─── Catalog form ───────────────────────────────────────────────────

/// A dated edit of a placement, as written in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementRevision {
    /// When the edit took effect.
    pub at: Timestamp,
    /// The state after the edit.
    pub state: PlacementState,
}

/// A placement as written in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlacementDefinition {
    /// Placement identifier.
    pub id: PlacementId,
    /// Report the question is placed on.
    pub report: ReportId,
    /// When the placement was added.
    pub created_at: Timestamp,
    /// Initial state.
    pub state: PlacementState,
    /// Later edits, oldest first.
    #[serde(default)]
    pub revisions: Vec<PlacementRevision>,
    /// When the placement was removed, if it was.
    #[serde(default)]
    pub deleted_at: Option<Timestamp>,
}

/// The question schema section of the catalog.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemaCatalog {
    /// Categories.
    #[serde(default)]
    pub categories: Vec<CategoryDefinition>,
    /// Placements with their history.
    #[serde(default)]
    pub placements: Vec<PlacementDefinition>,
}

// ─── History ────────────────────────────────────────────────────────

/// Question placements of every report with their full edit history.
#[derive(Debug, Clone, Default)]
pub struct SchemaHistory {
    categories: HashMap<CategoryId, CategoryDefinition>,
    placements: BTreeMap<PlacementId, Placement>,
}

impl SchemaHistory {
    /// An empty history.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay a catalog: add, then each revision in order, then removal.
    pub fn from_catalog(catalog: SchemaCatalog) -> Result<Self, CatalogError> {
        let mut history = Self::new();
        for category in catalog.categories {
            history.add_category(category)?;
        }
        for def in catalog.placements {
            history.add(def.id.clone(), def.report, def.state, def.created_at)?;
            for revision in def.revisions {
                history.edit(&def.id, revision.state, revision.at)?;
            }
            if let Some(at) = def.deleted_at {
                history.remove(&def.id, at)?;
            }
        }
        Ok(history)
    }

    /// Register a category.
    pub fn add_category(&mut self, category: CategoryDefinition) -> Result<(), CatalogError> {
        if self.categories.contains_key(&category.id) {
            return Err(CatalogError::Invalid(format!("duplicate {}", category.id)));
        }
        self.categories.insert(category.id.clone(), category);
        Ok(())
    }

    /// Place a question on a report at `at`.
    pub fn add(
        &mut self,
        id: PlacementId,
        report: ReportId,
        state: PlacementState,
        at: Timestamp,
    ) -> Result<(), CatalogError> {
        if self.placements.contains_key(&id) {
            return Err(CatalogError::Invalid(format!("duplicate {id}")));
        }
        self.require_category(&id, &state.category)?;
        self.placements.insert(
            id.clone(),
            Placement {
                id,
                report,
                created_at: at,
                updated_at: at,
                deleted_at: None,
                current: state,
                history: Vec::new(),
            },
        );
        Ok(())
    }

    /// Replace a placement's state at `at`, keeping the superseded state as a
    /// snapshot keyed by `at`.
    pub fn edit(
        &mut self,
        id: &PlacementId,
        state: PlacementState,
        at: Timestamp,
    ) -> Result<(), CatalogError> {
        self.require_category(id, &state.category)?;
        let placement = self.placement_mut(id)?;
        if placement.deleted_at.is_some() {
            return Err(CatalogError::Invalid(format!("{id} was removed")));
        }
        if at < placement.updated_at {
            return Err(CatalogError::Invalid(format!(
                "{id}: edit at {at} precedes last change at {}",
                placement.updated_at
            )));
        }
        let previous = std::mem::replace(&mut placement.current, state);
        placement.history.push(Snapshot {
            snapshot_ts: at,
            state: previous,
        });
        placement.updated_at = at;
        Ok(())
    }

    /// Soft-delete a placement at `at`.
    pub fn remove(&mut self, id: &PlacementId, at: Timestamp) -> Result<(), CatalogError> {
        let placement = self.placement_mut(id)?;
        if placement.deleted_at.is_some() {
            return Err(CatalogError::Invalid(format!("{id} was already removed")));
        }
        if at < placement.updated_at {
            return Err(CatalogError::Invalid(format!(
                "{id}: removal at {at} precedes last change at {}",
                placement.updated_at
            )));
        }
        placement.deleted_at = Some(at);
        Ok(())
    }

    /// The question set of `report` as it was at `as_of`.
    pub fn resolve(&self, report: &ReportId, as_of: Timestamp) -> QuestionSet {
        let mut by_category: BTreeMap<(i32, CategoryId), Vec<ResolvedQuestion>> = BTreeMap::new();
        for placement in self
            .placements
            .values()
            .filter(|p| &p.report == report && p.is_live_at(as_of))
        {
            let state = placement.state_at(as_of);
            let category_position = self
                .categories
                .get(&state.category)
                .map_or(i32::MAX, |c| c.position);
            by_category
                .entry((category_position, state.category.clone()))
                .or_default()
                .push(ResolvedQuestion {
                    placement: placement.id.clone(),
                    question: state.question.clone(),
                    label: state.label.clone(),
                    kind: state.kind,
                    options: state.options.clone(),
                    mandatory: state.mandatory,
                    position: state.position,
                });
        }
        let sections = by_category
            .into_iter()
            .map(|((_, category), mut questions)| {
                questions.sort_by(|a, b| {
                    a.position
                        .cmp(&b.position)
                        .then_with(|| a.placement.cmp(&b.placement))
                });
                let label = self
                    .categories
                    .get(&category)
                    .map(|c| c.label.clone())
                    .unwrap_or_else(|| category.as_str().to_string());
                CategorySection {
                    category,
                    label,
                    questions,
                }
            })
            .collect();
        QuestionSet {
            report: report.clone(),
            as_of,
            sections,
        }
    }

    /// Whether any placement, live or removed, exists for `report`.
    pub fn knows_report(&self, report: &ReportId) -> bool {
        self.placements.values().any(|p| &p.report == report)
    }

    fn require_category(&self, owner: &PlacementId, category: &CategoryId) -> Result<(), CatalogError> {
        if self.categories.contains_key(category) {
            Ok(())
        } else {
            Err(CatalogError::DanglingReference {
                owner: owner.to_string(),
                kind: "category".to_string(),
                reference: category.as_str().to_string(),
            })
        }
    }

    fn placement_mut(&mut self, id: &PlacementId) -> Result<&mut Placement, CatalogError> {
        self.placements
            .get_mut(id)
            .ok_or_else(|| CatalogError::Invalid(format!("unknown {id}")))
    }
}
