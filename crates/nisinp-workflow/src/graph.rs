//! # Step Graphs
//!
//! A step graph is the ordered list of reports an operator files for one
//! regulation / regulator / sector pairing, each with its deadline rule and
//! the notifications attached to it.
//!
//! ## Invariants
//!
//! - A graph has at least one step.
//! - Positions are unique within a graph. Gaps are allowed; steps are always
//!   held in ascending position order.
//! - Exactly one graph per (regulation, regulator, sector) in a registry.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde::{Deserialize, Serialize};

use nisinp_core::{
    CatalogError, EmailTemplateId, EngineError, RegulationId, RegulatorId, ReportId, SectorId,
    StepGraphId,
};

/// The event a step's deadline is counted from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TriggerKind {
    /// No deadline; the step is never overdue.
    None,
    /// The incident's notification date.
    NotificationDate,
    /// The incident's detection date, once known.
    DetectionDate,
    /// The latest submission of the preceding step.
    PreviousStep,
}

impl TriggerKind {
    /// Stable wire/storage name.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "NONE",
            Self::NotificationDate => "NOTIFICATION_DATE",
            Self::DetectionDate => "DETECTION_DATE",
            Self::PreviousStep => "PREVIOUS_STEP",
        }
    }
}

impl std::fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A reminder sent once when `delay_hours` whole hours have elapsed since
/// `trigger` and the step is still unsubmitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReminderRule {
    /// Template rendered for the reminder.
    pub template: EmailTemplateId,
    /// Event the delay counts from.
    pub trigger: TriggerKind,
    /// Hours after the trigger at which the reminder fires.
    pub delay_hours: u32,
}

/// One report step of a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepDefinition {
    /// Ordering key, unique within the graph.
    pub position: i32,
    /// Display name of the report ("Early warning", "Final report", ...).
    pub name: String,
    /// The report form whose question schema is versioned in `SchemaHistory`.
    pub report: ReportId,
    /// Event the deadline counts from.
    pub trigger: TriggerKind,
    /// Hours allowed after the trigger before the step becomes OVERDUE.
    #[serde(default)]
    pub delay_hours: u32,
    /// Template sent when this step is submitted.
    #[serde(default)]
    pub submission_email: Option<EmailTemplateId>,
    /// Reminders sent while the step is unsubmitted.
    #[serde(default)]
    pub reminders: Vec<ReminderRule>,
}

/// Serialized form of a graph, validated into [`StepGraph`].
#[derive(Debug, Clone, Deserialize)]
pub struct StepGraphDef {
    id: StepGraphId,
    regulation: RegulationId,
    regulator: RegulatorId,
    sector: SectorId,
    #[serde(default)]
    detection_date_required: bool,
    #[serde(default)]
    opening_email: Option<EmailTemplateId>,
    #[serde(default)]
    closing_email: Option<EmailTemplateId>,
    #[serde(default)]
    status_changed_email: Option<EmailTemplateId>,
    steps: Vec<StepDefinition>,
}

/// The ordered report steps of one regulation/regulator/sector pairing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(try_from = "StepGraphDef")]
pub struct StepGraph {
    /// Graph identifier.
    pub id: StepGraphId,
    /// Regulation axis.
    pub regulation: RegulationId,
    /// Regulator axis.
    pub regulator: RegulatorId,
    /// Sector axis.
    pub sector: SectorId,
    /// Whether an incident must carry a detection date when opened.
    pub detection_date_required: bool,
    /// Template sent when an incident is opened.
    pub opening_email: Option<EmailTemplateId>,
    /// Template sent when an incident is closed.
    pub closing_email: Option<EmailTemplateId>,
    /// Template sent when a report's status changes.
    pub status_changed_email: Option<EmailTemplateId>,
    steps: Vec<StepDefinition>,
}

impl TryFrom<StepGraphDef> for StepGraph {
    type Error = CatalogError;

    fn try_from(def: StepGraphDef) -> Result<Self, Self::Error> {
        let mut graph = StepGraph::new(def.id, def.regulation, def.regulator, def.sector, def.steps)?;
        graph.detection_date_required = def.detection_date_required;
        graph.opening_email = def.opening_email;
        graph.closing_email = def.closing_email;
        graph.status_changed_email = def.status_changed_email;
        Ok(graph)
    }
}

impl StepGraph {
    /// Build a graph, sorting its steps by position.
    pub fn new(
        id: StepGraphId,
        regulation: RegulationId,
        regulator: RegulatorId,
        sector: SectorId,
        mut steps: Vec<StepDefinition>,
    ) -> Result<Self, CatalogError> {
        if steps.is_empty() {
            return Err(CatalogError::EmptyGraph(id));
        }
        steps.sort_by_key(|s| s.position);
        if let Some(pair) = steps.windows(2).find(|w| w[0].position == w[1].position) {
            return Err(CatalogError::DuplicatePosition {
                graph: id,
                position: pair[0].position,
            });
        }
        Ok(Self {
            id,
            regulation,
            regulator,
            sector,
            detection_date_required: false,
            opening_email: None,
            closing_email: None,
            status_changed_email: None,
            steps,
        })
    }

    /// Builder: require a detection date at opening.
    pub fn with_detection_date_required(mut self, required: bool) -> Self {
        self.detection_date_required = required;
        self
    }

    /// Builder: set the opening, closing and status-changed templates.
    pub fn with_emails(
        mut self,
        opening: Option<EmailTemplateId>,
        closing: Option<EmailTemplateId>,
        status_changed: Option<EmailTemplateId>,
    ) -> Self {
        self.opening_email = opening;
        self.closing_email = closing;
        self.status_changed_email = status_changed;
        self
    }

    /// Steps in ascending position order.
    pub fn steps(&self) -> &[StepDefinition] {
        &self.steps
    }

    /// The step at `position`.
    pub fn step(&self, position: i32) -> Option<&StepDefinition> {
        self.steps
            .binary_search_by_key(&position, |s| s.position)
            .ok()
            .map(|i| &self.steps[i])
    }

    /// The step at `position`, or `StepNotFound`.
    pub fn require_step(&self, position: i32) -> Result<&StepDefinition, EngineError> {
        self.step(position).ok_or_else(|| EngineError::StepNotFound {
            graph: self.id.clone(),
            position,
        })
    }

    /// The first step.
    pub fn first(&self) -> Option<&StepDefinition> {
        self.steps.first()
    }

    /// Whether `position` is the first position of the graph.
    pub fn is_first(&self, position: i32) -> bool {
        self.first().is_some_and(|s| s.position == position)
    }

    /// The step with the largest position strictly below `position`.
    pub fn previous(&self, position: i32) -> Option<&StepDefinition> {
        self.steps.iter().rev().find(|s| s.position < position)
    }

    /// The step with the smallest position strictly above `position`.
    pub fn following(&self, position: i32) -> Option<&StepDefinition> {
        self.steps.iter().find(|s| s.position > position)
    }

    /// Every template this graph references, with a label of where it is used.
    pub fn template_references(&self) -> Vec<(String, &EmailTemplateId)> {
        let mut refs = Vec::new();
        for (label, template) in [
            ("opening_email", &self.opening_email),
            ("closing_email", &self.closing_email),
            ("status_changed_email", &self.status_changed_email),
        ] {
            if let Some(t) = template {
                refs.push((format!("{} {label}", self.id), t));
            }
        }
        for step in &self.steps {
            if let Some(t) = &step.submission_email {
                refs.push((format!("{} step {} submission_email", self.id, step.position), t));
            }
            for rule in &step.reminders {
                refs.push((format!("{} step {} reminder", self.id, step.position), &rule.template));
            }
        }
        refs
    }
}

// ─── Registry ───────────────────────────────────────────────────────

/// All step graphs of the catalog, indexed by id and by pairing.
#[derive(Debug, Clone, Default)]
pub struct StepGraphRegistry {
    graphs: BTreeMap<StepGraphId, StepGraph>,
    by_pairing: HashMap<(RegulationId, RegulatorId, SectorId), StepGraphId>,
}

impl StepGraphRegistry {
    /// Index a set of graphs. Graph ids and pairings must be unique.
    pub fn new(graphs: Vec<StepGraph>) -> Result<Self, CatalogError> {
        let mut registry = Self::default();
        let mut seen = HashSet::new();
        for graph in graphs {
            if !seen.insert(graph.id.clone()) {
                return Err(CatalogError::DuplicateGraph(graph.id));
            }
            let pairing = (
                graph.regulation.clone(),
                graph.regulator.clone(),
                graph.sector.clone(),
            );
            if let Some(existing) = registry.by_pairing.get(&pairing) {
                return Err(CatalogError::Invalid(format!(
                    "graphs {existing} and {} both cover {} / {} / {}",
                    graph.id, pairing.0, pairing.1, pairing.2
                )));
            }
            registry.by_pairing.insert(pairing, graph.id.clone());
            registry.graphs.insert(graph.id.clone(), graph);
        }
        Ok(registry)
    }

    /// The graph for a regulation/regulator/sector pairing.
    pub fn find(
        &self,
        regulation: &RegulationId,
        regulator: &RegulatorId,
        sector: &SectorId,
    ) -> Result<&StepGraph, EngineError> {
        self.by_pairing
            .get(&(regulation.clone(), regulator.clone(), sector.clone()))
            .and_then(|id| self.graphs.get(id))
            .ok_or_else(|| EngineError::GraphNotFound {
                regulation: regulation.clone(),
                regulator: regulator.clone(),
                sector: sector.clone(),
            })
    }

    /// The graph with this id.
    pub fn get(&self, id: &StepGraphId) -> Result<&StepGraph, EngineError> {
        self.graphs
            .get(id)
            .ok_or_else(|| EngineError::UnknownGraph(id.clone()))
    }

    /// The ordered steps of a graph.
    pub fn resolve_steps(&self, id: &StepGraphId) -> Result<&[StepDefinition], EngineError> {
        self.get(id).map(StepGraph::steps)
    }

    /// All graphs in id order.
    pub fn iter(&self) -> impl Iterator<Item = &StepGraph> {
        self.graphs.values()
    }

    /// Number of graphs.
    pub fn len(&self) -> usize {
        self.graphs.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.graphs.is_empty()
    }
}
