//! Shared fixtures for the engine's unit tests.

use std::sync::Arc;

use nisinp_core::{
    CategoryId, EmailTemplateId, ManualClock, PlacementId, QuestionId, RegulationId, RegulatorId,
    ReportId, SectorId, StepGraphId, Timestamp,
};
use nisinp_notify::{EmailTemplate, RecordingNotifier, TemplateCatalog};
use nisinp_store::MemoryRepository;
use nisinp_workflow::{
    CategoryDefinition, PlacementState, QuestionKind, QuestionOption, ReminderRule, SchemaHistory,
    StepDefinition, StepGraph, StepGraphRegistry, TriggerKind,
};

use crate::catalog::Catalog;
use crate::context::EngineContext;
use crate::service::OpenIncident;

pub(crate) struct Harness {
    pub ctx: EngineContext,
    pub clock: Arc<ManualClock>,
    pub notifier: RecordingNotifier,
    pub repository: MemoryRepository,
}

pub(crate) fn t0() -> Timestamp {
    Timestamp::parse("2026-03-02T09:00:00Z").unwrap()
}

fn template(id: &str, subject: &str) -> EmailTemplate {
    EmailTemplate {
        id: EmailTemplateId::new(id),
        subject: subject.into(),
        content: "Incident #INCIDENT_ID# notified #INCIDENT_NOTIFICATION_DATE#".into(),
    }
}

/// NIS2 energy: early warning 24h after notification (reminder at 12h),
/// notification 16h after the early warning, final report 720h after
/// detection.
pub(crate) fn make_graph() -> StepGraph {
    StepGraph::new(
        StepGraphId::new("nis2-energy"),
        RegulationId::new("NIS2"),
        RegulatorId::new("ILR"),
        SectorId::new("energy"),
        vec![
            StepDefinition {
                position: 1,
                name: "Early warning".into(),
                report: ReportId::new("early-warning"),
                trigger: TriggerKind::NotificationDate,
                delay_hours: 24,
                submission_email: Some(EmailTemplateId::new("submitted")),
                reminders: vec![ReminderRule {
                    template: EmailTemplateId::new("ew-reminder"),
                    trigger: TriggerKind::NotificationDate,
                    delay_hours: 12,
                }],
            },
            StepDefinition {
                position: 2,
                name: "Incident notification".into(),
                report: ReportId::new("notification"),
                trigger: TriggerKind::PreviousStep,
                delay_hours: 16,
                submission_email: None,
                reminders: Vec::new(),
            },
            StepDefinition {
                position: 3,
                name: "Final report".into(),
                report: ReportId::new("final"),
                trigger: TriggerKind::DetectionDate,
                delay_hours: 720,
                submission_email: None,
                reminders: Vec::new(),
            },
        ],
    )
    .unwrap()
    .with_emails(
        Some(EmailTemplateId::new("opening")),
        None,
        Some(EmailTemplateId::new("status-changed")),
    )
}

fn make_schema() -> SchemaHistory {
    let mut schema = SchemaHistory::new();
    schema
        .add_category(CategoryDefinition {
            id: CategoryId::new("general"),
            label: "General".into(),
            position: 1,
        })
        .unwrap();
    let since = Timestamp::parse("2026-01-01T00:00:00Z").unwrap();
    for report in ["early-warning", "notification", "final"] {
        schema
            .add(
                PlacementId::new(format!("{report}-summary")),
                ReportId::new(report),
                PlacementState {
                    question: QuestionId::new("q-summary"),
                    category: CategoryId::new("general"),
                    position: 1,
                    label: "Summary".into(),
                    kind: QuestionKind::FreeText,
                    options: Vec::new(),
                    mandatory: true,
                },
                since,
            )
            .unwrap();
    }
    schema
        .add(
            PlacementId::new("early-warning-cause"),
            ReportId::new("early-warning"),
            PlacementState {
                question: QuestionId::new("q-cause"),
                category: CategoryId::new("general"),
                position: 2,
                label: "Suspected cause".into(),
                kind: QuestionKind::SingleChoice,
                options: vec![
                    QuestionOption {
                        code: "malicious".into(),
                        label: "Malicious act".into(),
                    },
                    QuestionOption {
                        code: "failure".into(),
                        label: "System failure".into(),
                    },
                ],
                mandatory: false,
            },
            since,
        )
        .unwrap();
    schema
}

pub(crate) fn make_catalog() -> Catalog {
    let templates = TemplateCatalog::new(
        vec![
            template("opening", "Opened #INCIDENT_ID#"),
            template("submitted", "Submitted #INCIDENT_ID#"),
            template("status-changed", "Status changed #INCIDENT_ID#"),
            template("ew-reminder", "Early warning due #INCIDENT_ID#"),
        ],
        "https://serima.example",
    )
    .unwrap();
    Catalog::new(
        StepGraphRegistry::new(vec![make_graph()]).unwrap(),
        make_schema(),
        templates,
    )
    .unwrap()
}

pub(crate) fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let notifier = RecordingNotifier::new();
    let repository = MemoryRepository::new();
    let ctx = EngineContext::new(
        make_catalog(),
        Arc::new(repository.clone()),
        Arc::new(notifier.clone()),
        clock.clone(),
    );
    Harness {
        ctx,
        clock,
        notifier,
        repository,
    }
}

pub(crate) fn open_request(reference: &str) -> OpenIncident {
    let mut request = OpenIncident::new(
        reference,
        RegulationId::new("NIS2"),
        RegulatorId::new("ILR"),
        SectorId::new("energy"),
    );
    request.contact_email = Some("soc@operator.example".into());
    request
}
