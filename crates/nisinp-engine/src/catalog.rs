//! # Workflow Catalog
//!
//! Step graphs, the question schema history and the email templates, loaded
//! once at startup and never mutated. Construction validates that every
//! template a graph names exists and that every report a step collects has
//! at least one question placement.

use nisinp_core::CatalogError;
use nisinp_notify::TemplateCatalog;
use nisinp_workflow::{SchemaHistory, StepGraphRegistry};

/// The validated, immutable workflow configuration.
#[derive(Debug, Clone)]
pub struct Catalog {
    /// Step graphs by regulation/regulator/sector.
    pub graphs: StepGraphRegistry,
    /// Question placements with their edit history.
    pub schema: SchemaHistory,
    /// Email templates.
    pub templates: TemplateCatalog,
}

impl Catalog {
    /// Assemble and cross-check a catalog.
    pub fn new(
        graphs: StepGraphRegistry,
        schema: SchemaHistory,
        templates: TemplateCatalog,
    ) -> Result<Self, CatalogError> {
        for graph in graphs.iter() {
            for (owner, template) in graph.template_references() {
                if !templates.contains(template) {
                    return Err(CatalogError::DanglingReference {
                        owner,
                        kind: "email template".to_string(),
                        reference: template.as_str().to_string(),
                    });
                }
            }
            for step in graph.steps() {
                if !schema.knows_report(&step.report) {
                    return Err(CatalogError::DanglingReference {
                        owner: format!("{} step {}", graph.id, step.position),
                        kind: "report".to_string(),
                        reference: step.report.as_str().to_string(),
                    });
                }
            }
        }
        Ok(Self {
            graphs,
            schema,
            templates,
        })
    }
}
