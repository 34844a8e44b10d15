//! Shared fixtures: the two-step NIS2 catalog from `fixtures/two_step.yaml`
//! wired into an engine over the in-memory repository, a recording
//! notifier and a manual clock.

#![allow(dead_code)]

use std::path::Path;
use std::sync::Arc;

use nisinp_core::{IncidentId, ManualClock, PlacementId, RegulationId, RegulatorId, SectorId, Timestamp};
use nisinp_engine::{Catalog, EngineContext, IncidentService, OpenIncident};
use nisinp_notify::RecordingNotifier;
use nisinp_state::Answer;
use nisinp_store::MemoryRepository;

pub struct Harness {
    pub service: IncidentService,
    pub ctx: EngineContext,
    pub clock: Arc<ManualClock>,
    pub notifier: RecordingNotifier,
    pub repository: MemoryRepository,
}

/// Monday 2 March 2026, 09:00 UTC.
pub fn t0() -> Timestamp {
    Timestamp::parse("2026-03-02T09:00:00Z").unwrap()
}

pub fn catalog() -> Catalog {
    let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures/two_step.yaml");
    nisinp_cli::config::load_with_env(&path, |_| None)
        .unwrap()
        .catalog
}

pub fn harness() -> Harness {
    let clock = Arc::new(ManualClock::new(t0()));
    let notifier = RecordingNotifier::new();
    let repository = MemoryRepository::new();
    let ctx = EngineContext::new(
        catalog(),
        Arc::new(repository.clone()),
        Arc::new(notifier.clone()),
        clock.clone(),
    );
    Harness {
        service: IncidentService::new(ctx.clone()),
        ctx,
        clock,
        notifier,
        repository,
    }
}

pub fn open_request(reference: &str) -> OpenIncident {
    OpenIncident {
        contact_email: Some("soc@operator.example".into()),
        ..OpenIncident::new(
            reference,
            RegulationId::new("NIS2"),
            RegulatorId::new("ILR"),
            SectorId::new("energy"),
        )
    }
}

pub fn early_warning() -> Vec<Answer> {
    vec![
        Answer::text(
            PlacementId::new("early-warning-summary"),
            "SCADA gateway unreachable at two substations",
        ),
        Answer::choice(PlacementId::new("early-warning-cause"), vec!["malicious".into()]),
    ]
}

pub fn notification() -> Vec<Answer> {
    vec![Answer::text(
        PlacementId::new("notification-summary"),
        "Ransomware on the dispatch network, no customer outage",
    )]
}

impl Harness {
    /// Open an incident notified now.
    pub async fn open(&self, reference: &str) -> IncidentId {
        self.service
            .open_incident(open_request(reference))
            .await
            .unwrap()
            .id
    }
}
