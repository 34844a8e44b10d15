//! # Incident Service
//!
//! The intake "done" handler and the regulator's actions. Every operation
//! that writes holds the incident's lock from the first read to the last
//! notification, and every write is a repository compare-and-swap, so a
//! concurrent writer in another process surfaces as
//! [`EngineError::StaleWriteConflict`] rather than a duplicate submission.
//!
//! Notifications are dispatched after the write succeeds. A failed dispatch
//! is logged and does not fail the operation.

use std::collections::HashSet;

use nisinp_core::{
    EngineError, IncidentId, RegulationId, RegulatorId, ReportId, SectorId, SubmissionId,
    Timestamp,
};
use nisinp_notify::NotificationKind;
use nisinp_state::{Answer, Incident, IncidentState, IncidentWorkflow, ReviewDecision, ReviewStatus};
use nisinp_workflow::{
    render_submission, DeadlineEvaluator, RenderedReport, Sequencer, StepDefinition,
};

use crate::context::EngineContext;

/// Request to open an incident.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenIncident {
    /// Human-facing reference.
    pub reference: String,
    /// Regulation reported under.
    pub regulation: RegulationId,
    /// Regulator notified.
    pub regulator: RegulatorId,
    /// Operator sector.
    pub sector: SectorId,
    /// Notification instant; now when absent.
    pub notification_date: Option<Timestamp>,
    /// Detection instant, if known.
    pub detection_date: Option<Timestamp>,
    /// Start of the incident, if known.
    pub starting_date: Option<Timestamp>,
    /// Reporting timezone; UTC when absent.
    pub timezone: Option<String>,
    /// Operator contact address.
    pub contact_email: Option<String>,
}

impl OpenIncident {
    /// A request with only the mandatory fields set.
    pub fn new(
        reference: impl Into<String>,
        regulation: RegulationId,
        regulator: RegulatorId,
        sector: SectorId,
    ) -> Self {
        Self {
            reference: reference.into(),
            regulation,
            regulator,
            sector,
            notification_date: None,
            detection_date: None,
            starting_date: None,
            timezone: None,
            contact_email: None,
        }
    }
}

/// One step of an incident as seen at a given instant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StepOverview {
    /// Step position.
    pub position: i32,
    /// Step name.
    pub name: String,
    /// Report form collected by the step.
    pub report: ReportId,
    /// Evaluated status.
    pub status: ReviewStatus,
    /// Reference instant plus the step's delay, when the reference is known.
    pub deadline: Option<Timestamp>,
    /// The step's latest submission.
    pub latest_submission: Option<SubmissionId>,
    /// Whether a first submission may be made now.
    pub fillable: bool,
    /// Whether the regulator asked for a new submission.
    pub revisable: bool,
}

/// Incident intake and review operations.
#[derive(Debug, Clone)]
pub struct IncidentService {
    ctx: EngineContext,
}

impl IncidentService {
    /// Create a service over `ctx`.
    pub fn new(ctx: EngineContext) -> Self {
        Self { ctx }
    }

    /// The shared context.
    pub fn context(&self) -> &EngineContext {
        &self.ctx
    }

    /// Open an ONGOING incident under the graph of its pairing.
    pub async fn open_incident(&self, request: OpenIncident) -> Result<Incident, EngineError> {
        let graph = self.ctx.catalog.graphs.find(
            &request.regulation,
            &request.regulator,
            &request.sector,
        )?;
        if graph.detection_date_required && request.detection_date.is_none() {
            return Err(EngineError::InvalidInput(format!(
                "graph {} requires a detection date",
                graph.id
            )));
        }

        let notification_date = request
            .notification_date
            .unwrap_or_else(|| self.ctx.clock.now());
        let mut incident = Incident::new(
            request.reference,
            graph.id.clone(),
            request.regulation,
            request.regulator,
            request.sector,
            notification_date,
        );
        incident.detection_date = request.detection_date;
        incident.starting_date = request.starting_date;
        incident.contact_email = request.contact_email;
        if let Some(timezone) = request.timezone {
            incident.timezone = timezone;
        }

        self.ctx.repository.insert_incident(&incident).await?;
        tracing::info!(
            incident_id = %incident.id,
            reference = %incident.reference,
            graph = %graph.id,
            "incident opened"
        );
        self.ctx
            .dispatch(NotificationKind::Opening, graph.opening_email.as_ref(), &incident, None)
            .await;
        Ok(incident)
    }

    /// Record the detection date of an ONGOING incident.
    pub async fn set_detection_date(
        &self,
        incident: IncidentId,
        detection_date: Timestamp,
    ) -> Result<Incident, EngineError> {
        let _guard = self.ctx.locks.lock(incident).await;
        let mut record = self.ctx.repository.get_incident(incident).await?;
        record.set_detection_date(detection_date)?;
        self.ctx.repository.update_incident(&record).await?;
        tracing::info!(incident_id = %incident, %detection_date, "detection date set");
        Ok(record)
    }

    /// Submit the report of step `position`.
    ///
    /// Allowed when the step is fillable, or when its latest submission
    /// awaits revision. The new submission is LATE_SUBMISSION if the step's
    /// deadline has elapsed, UNDER_REVIEW otherwise.
    pub async fn submit_step(
        &self,
        incident: IncidentId,
        position: i32,
        answers: Vec<Answer>,
    ) -> Result<IncidentWorkflow, EngineError> {
        let _guard = self.ctx.locks.lock(incident).await;
        let state = self.ctx.repository.load_state(incident).await?;
        if !state.incident.is_ongoing() {
            return Err(EngineError::IncidentClosed(incident));
        }
        let graph = self.ctx.catalog.graphs.get(&state.incident.step_graph)?;
        let step = graph.require_step(position)?;

        let sequencer = Sequencer::new(graph);
        let expected_latest = match sequencer.fillability(&state, position) {
            Ok(()) => None,
            Err(_) if sequencer.is_revisable(&state, position) => {
                state.latest_submission(position).map(|s| s.id)
            }
            Err(blocked) => {
                return Err(EngineError::NotFillable {
                    incident,
                    position,
                    reason: blocked.to_string(),
                })
            }
        };

        let now = self.ctx.clock.now();
        self.check_answers(&step.report, now, &answers)?;
        let late = DeadlineEvaluator::new(graph).is_exceeded_at(step, &state, now);
        let submission =
            IncidentWorkflow::record(incident, position, step.report.clone(), now, late, answers);
        self.ctx
            .repository
            .insert_submission(&submission, expected_latest)
            .await?;
        self.ctx.metrics.record_transition(submission.review_status);
        tracing::info!(
            incident_id = %incident,
            step = position,
            submission = %submission.id,
            status = %submission.review_status,
            "step submitted"
        );

        self.ctx
            .dispatch(
                NotificationKind::Submission,
                step.submission_email.as_ref(),
                &state.incident,
                Some(position),
            )
            .await;
        Ok(submission)
    }

    /// Record the regulator's decision on the latest submission of a step.
    pub async fn review_submission(
        &self,
        submission: SubmissionId,
        decision: ReviewDecision,
        comment: Option<String>,
    ) -> Result<IncidentWorkflow, EngineError> {
        let incident_id = self.ctx.repository.get_submission(submission).await?.incident;
        let _guard = self.ctx.locks.lock(incident_id).await;

        let mut current = self.ctx.repository.get_submission(submission).await?;
        let incident = self.ctx.repository.get_incident(incident_id).await?;
        if !incident.is_ongoing() {
            return Err(EngineError::IncidentClosed(incident_id));
        }
        let latest = self
            .ctx
            .repository
            .find_latest_submission(incident_id, current.step_position)
            .await?;
        if latest.map(|s| s.id) != Some(submission) {
            return Err(EngineError::StaleWriteConflict {
                incident: incident_id,
                position: current.step_position,
            });
        }

        let expected = current.review_status;
        let status = current.apply_review(decision, comment)?;
        self.ctx
            .repository
            .set_review_status(submission, expected, status, current.comment.clone())
            .await?;
        self.ctx.metrics.record_transition(status);
        tracing::info!(
            incident_id = %incident_id,
            step = current.step_position,
            submission = %submission,
            from = %expected,
            to = %status,
            "submission reviewed"
        );

        let template = self
            .ctx
            .catalog
            .graphs
            .get(&incident.step_graph)
            .ok()
            .and_then(|g| g.status_changed_email.as_ref());
        self.ctx
            .dispatch(
                NotificationKind::StatusChanged,
                template,
                &incident,
                Some(current.step_position),
            )
            .await;
        Ok(current)
    }

    /// Close an incident. CLOSED is terminal.
    pub async fn close_incident(&self, incident: IncidentId) -> Result<Incident, EngineError> {
        let _guard = self.ctx.locks.lock(incident).await;
        let mut record = self.ctx.repository.get_incident(incident).await?;
        record.close(self.ctx.clock.now())?;
        self.ctx.repository.update_incident(&record).await?;
        tracing::info!(incident_id = %incident, "incident closed");

        let template = self
            .ctx
            .catalog
            .graphs
            .get(&record.step_graph)
            .ok()
            .and_then(|g| g.closing_email.as_ref());
        self.ctx
            .dispatch(NotificationKind::Closing, template, &record, None)
            .await;
        Ok(record)
    }

    /// An incident with its submission history.
    pub async fn incident_state(&self, incident: IncidentId) -> Result<IncidentState, EngineError> {
        Ok(self.ctx.repository.load_state(incident).await?)
    }

    /// Every step of the incident's graph, evaluated now.
    pub async fn step_overview(&self, incident: IncidentId) -> Result<Vec<StepOverview>, EngineError> {
        let state = self.ctx.repository.load_state(incident).await?;
        let graph = self.ctx.catalog.graphs.get(&state.incident.step_graph)?;
        let evaluator = DeadlineEvaluator::new(graph);
        let sequencer = Sequencer::new(graph);
        let now = self.ctx.clock.now();
        Ok(graph
            .steps()
            .iter()
            .map(|step| StepOverview {
                position: step.position,
                name: step.name.clone(),
                report: step.report.clone(),
                status: evaluator.evaluate(step, &state, now),
                deadline: evaluator.deadline(step, &state),
                latest_submission: state.latest_submission(step.position).map(|s| s.id),
                fillable: sequencer.is_fillable(&state, step.position),
                revisable: sequencer.is_revisable(&state, step.position),
            })
            .collect())
    }

    /// The first step without a submission.
    pub async fn next_step(&self, incident: IncidentId) -> Result<Option<StepDefinition>, EngineError> {
        let state = self.ctx.repository.load_state(incident).await?;
        let graph = self.ctx.catalog.graphs.get(&state.incident.step_graph)?;
        Ok(Sequencer::new(graph).next_step(&state).cloned())
    }

    /// A submission laid out on the question set live when it was made.
    pub async fn render_submission(
        &self,
        submission: SubmissionId,
    ) -> Result<RenderedReport, EngineError> {
        let record = self.ctx.repository.get_submission(submission).await?;
        Ok(render_submission(&self.ctx.catalog.schema, &record))
    }

    fn check_answers(
        &self,
        report: &ReportId,
        at: Timestamp,
        answers: &[Answer],
    ) -> Result<(), EngineError> {
        let questions = self.ctx.catalog.schema.resolve(report, at);
        let mut seen = HashSet::new();
        for answer in answers {
            let question = questions.question(&answer.placement).ok_or_else(|| {
                EngineError::InvalidInput(format!(
                    "{} is not a question of report {}",
                    answer.placement, report
                ))
            })?;
            if !seen.insert(&answer.placement) {
                return Err(EngineError::InvalidInput(format!(
                    "{} answered twice",
                    answer.placement
                )));
            }
            if answer.selected.len() > question.kind.max_selected() {
                return Err(EngineError::InvalidInput(format!(
                    "{} accepts at most {} option(s), got {}",
                    answer.placement,
                    question.kind.max_selected(),
                    answer.selected.len()
                )));
            }
            if answer.text.is_some() && !question.kind.has_text() {
                return Err(EngineError::InvalidInput(format!(
                    "{} does not accept free text",
                    answer.placement
                )));
            }
            if let Some(code) = answer
                .selected
                .iter()
                .find(|code| !question.options.iter().any(|o| &o.code == *code))
            {
                return Err(EngineError::InvalidInput(format!(
                    "{} has no option {code:?}",
                    answer.placement
                )));
            }
        }
        let given: HashSet<_> = answers
            .iter()
            .filter(|a| a.is_given())
            .map(|a| &a.placement)
            .collect();
        if let Some(missing) = questions
            .questions()
            .find(|q| q.mandatory && !given.contains(&q.placement))
        {
            return Err(EngineError::InvalidInput(format!(
                "{} is mandatory for report {}",
                missing.placement, report
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nisinp_core::PlacementId;

    use crate::testing::{harness, open_request, t0};

    fn summary(report: &str) -> Vec<Answer> {
        vec![Answer::text(
            PlacementId::new(format!("{report}-summary")),
            "Substation SCADA unreachable",
        )]
    }

    #[tokio::test]
    async fn open_dispatches_opening_notification() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0001")).await.unwrap();

        assert_eq!(incident.notification_date, t0());
        let sent = h.notifier.of_kind(NotificationKind::Opening);
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].subject, "Opened ILR-0001");
        assert_eq!(sent[0].recipients, vec!["soc@operator.example".to_string()]);
    }

    #[tokio::test]
    async fn open_unknown_pairing_is_graph_not_found() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let mut request = open_request("ILR-0002");
        request.sector = SectorId::new("banking");
        let err = service.open_incident(request).await.unwrap_err();
        assert!(matches!(err, EngineError::GraphNotFound { .. }));
        assert_eq!(h.repository.incident_count(), 0);
        assert_eq!(h.notifier.count(), 0);
    }

    #[tokio::test]
    async fn submission_on_time_is_under_review() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0003")).await.unwrap();

        h.clock.advance_hours(23);
        let submission = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap();
        assert_eq!(submission.review_status, ReviewStatus::UnderReview);
        assert_eq!(h.notifier.of_kind(NotificationKind::Submission)[0].subject, "Submitted ILR-0003");
    }

    #[tokio::test]
    async fn submission_after_deadline_is_late() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0004")).await.unwrap();

        h.clock.advance_hours(25);
        let submission = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap();
        assert_eq!(submission.review_status, ReviewStatus::LateSubmission);
    }

    #[tokio::test]
    async fn out_of_order_step_is_not_fillable() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0005")).await.unwrap();

        let err = service
            .submit_step(incident.id, 2, summary("notification"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFillable { position: 2, .. }));

        service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap();
        let err = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::NotFillable { position: 1, .. }));
        service
            .submit_step(incident.id, 2, summary("notification"))
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn revision_allows_resubmission() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0006")).await.unwrap();
        let first = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap();

        let reviewed = service
            .review_submission(
                first.id,
                ReviewDecision::RequireRevision,
                Some("Impact section incomplete".into()),
            )
            .await
            .unwrap();
        assert_eq!(reviewed.review_status, ReviewStatus::RevisionRequired);
        assert_eq!(h.notifier.of_kind(NotificationKind::StatusChanged).len(), 1);

        h.clock.advance_hours(1);
        let second = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap();
        assert_eq!(second.review_status, ReviewStatus::UnderReview);

        let err = service
            .review_submission(first.id, ReviewDecision::Pass, None)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::StaleWriteConflict { position: 1, .. }));

        let history = service.incident_state(incident.id).await.unwrap();
        assert_eq!(history.history(1).len(), 2);
    }

    #[tokio::test]
    async fn closed_incident_rejects_submissions_and_second_close() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0007")).await.unwrap();

        let closed = service.close_incident(incident.id).await.unwrap();
        assert_eq!(closed.closed_at, Some(t0()));
        let closing = h.notifier.of_kind(NotificationKind::Closing);
        assert_eq!(closing[0].subject, "Incident ILR-0007: closed");

        let err = service
            .submit_step(incident.id, 1, summary("early-warning"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::IncidentClosed(_)));
        let err = service.close_incident(incident.id).await.unwrap_err();
        assert!(matches!(err, EngineError::State(_)));
    }

    #[tokio::test]
    async fn rejects_missing_mandatory_and_extra_choices() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0011")).await.unwrap();
        let cause = |codes: &[&str]| {
            Answer::choice(
                PlacementId::new("early-warning-cause"),
                codes.iter().map(|c| c.to_string()).collect(),
            )
        };

        let err = service
            .submit_step(incident.id, 1, vec![cause(&["malicious"])])
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref m) if m.contains("mandatory")));

        let err = service
            .submit_step(
                incident.id,
                1,
                vec![Answer::text(PlacementId::new("early-warning-summary"), "  ")],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref m) if m.contains("mandatory")));

        let mut answers = summary("early-warning");
        answers.push(cause(&["malicious", "failure"]));
        let err = service.submit_step(incident.id, 1, answers).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(ref m) if m.contains("at most 1")));

        let mut answers = summary("early-warning");
        answers[0].selected.push("malicious".into());
        let err = service.submit_step(incident.id, 1, answers).await.unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!(!service
            .incident_state(incident.id)
            .await
            .unwrap()
            .has_submission(1));

        let mut answers = summary("early-warning");
        answers.push(cause(&["failure"]));
        let submission = service.submit_step(incident.id, 1, answers).await.unwrap();
        assert_eq!(submission.review_status, ReviewStatus::UnderReview);
    }

    #[tokio::test]
    async fn rejects_unknown_placements_and_options() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0008")).await.unwrap();

        let err = service
            .submit_step(incident.id, 1, summary("final"))
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));

        let err = service
            .submit_step(
                incident.id,
                1,
                vec![Answer::choice(
                    PlacementId::new("early-warning-cause"),
                    vec!["sabotage".into()],
                )],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::InvalidInput(_)));
        assert!(!service
            .incident_state(incident.id)
            .await
            .unwrap()
            .has_submission(1));
    }

    #[tokio::test]
    async fn overview_reports_deadlines_and_fillability() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0009")).await.unwrap();

        h.clock.advance_hours(24);
        let overview = service.step_overview(incident.id).await.unwrap();
        assert_eq!(overview.len(), 3);
        assert_eq!(overview[0].status, ReviewStatus::Overdue);
        assert_eq!(overview[0].deadline, Some(t0().plus_hours(24)));
        assert!(overview[0].fillable);
        assert_eq!(overview[1].deadline, None);
        assert!(!overview[1].fillable);
        assert_eq!(overview[2].status, ReviewStatus::Unsubmitted);

        let detected = t0().plus_hours(-2);
        service.set_detection_date(incident.id, detected).await.unwrap();
        let overview = service.step_overview(incident.id).await.unwrap();
        assert_eq!(overview[2].deadline, Some(detected.plus_hours(720)));

        let next = service.next_step(incident.id).await.unwrap().unwrap();
        assert_eq!(next.position, 1);
    }

    #[tokio::test]
    async fn renders_submission_on_its_question_set() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0010")).await.unwrap();
        let submission = service
            .submit_step(
                incident.id,
                1,
                vec![Answer::choice(
                    PlacementId::new("early-warning-cause"),
                    vec!["failure".into()],
                )]
                .into_iter()
                .chain(summary("early-warning"))
                .collect(),
            )
            .await
            .unwrap();

        let report = service.render_submission(submission.id).await.unwrap();
        let answers = &report.sections[0].answers;
        assert_eq!(answers.len(), 2);
        assert_eq!(answers[0].text.as_deref(), Some("Substation SCADA unreachable"));
        assert_eq!(answers[1].selected, vec!["System failure"]);
    }

    #[tokio::test]
    async fn concurrent_submissions_create_one_record() {
        let h = harness();
        let service = IncidentService::new(h.ctx.clone());
        let incident = service.open_incident(open_request("ILR-0011")).await.unwrap();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let service = service.clone();
                tokio::spawn(async move {
                    service
                        .submit_step(incident.id, 1, summary("early-warning"))
                        .await
                })
            })
            .collect();
        let mut created = 0;
        for task in tasks {
            if task.await.unwrap().is_ok() {
                created += 1;
            }
        }
        assert_eq!(created, 1);
        let state = service.incident_state(incident.id).await.unwrap();
        assert_eq!(state.history(1).len(), 1);
    }
}
