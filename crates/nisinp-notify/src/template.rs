//! # Email Templates
//!
//! A template is a subject and a body in which incident variables are
//! replaced at dispatch time:
//!
//! | Variable | Value |
//! |----------|-------|
//! | `#INCIDENT_NOTIFICATION_DATE#` | notification date, `YYYY-MM-DD` |
//! | `#INCIDENT_DETECTION_DATE#` | detection date, `YYYY-MM-DD`, or empty |
//! | `#INCIDENT_STARTING_DATE#` | starting date, `YYYY-MM-DD`, or empty |
//! | `#INCIDENT_ID#` | the incident reference |
//! | `#PUBLIC_URL#` | the platform's public URL |
//!
//! Every notification kind has a built-in default used when the catalog
//! names no template for it, so a missing template never suppresses a
//! notification.
//!
//! Recipients are the incident contact, then the notification address of
//! the incident's regulator and that regulator's observers. Duplicates are
//! dropped, first occurrence kept.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use nisinp_core::{CatalogError, EmailTemplateId, RegulatorId, Timestamp};
use nisinp_state::Incident;

use crate::message::{NotificationKind, NotificationMessage};

/// A catalog email template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EmailTemplate {
    /// Template identifier referenced by step graphs.
    pub id: EmailTemplateId,
    /// Subject line, with variables.
    pub subject: String,
    /// Body, with variables.
    pub content: String,
}

/// Where a regulator receives incident notifications.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RegulatorContact {
    /// The regulator.
    pub regulator: RegulatorId,
    /// The regulator's notification mailbox.
    #[serde(default)]
    pub email_for_notification: Option<String>,
    /// Further authorities copied on the regulator's incidents.
    #[serde(default)]
    pub observers: Vec<String>,
}

/// All templates of the catalog plus the substitution context.
#[derive(Debug, Clone, Default)]
pub struct TemplateCatalog {
    templates: HashMap<EmailTemplateId, EmailTemplate>,
    regulators: HashMap<RegulatorId, RegulatorContact>,
    public_url: String,
}

impl TemplateCatalog {
    /// Index templates. Ids must be unique.
    pub fn new(templates: Vec<EmailTemplate>, public_url: impl Into<String>) -> Result<Self, CatalogError> {
        let mut map = HashMap::with_capacity(templates.len());
        for template in templates {
            if map.contains_key(&template.id) {
                return Err(CatalogError::Invalid(format!("duplicate {}", template.id)));
            }
            map.insert(template.id.clone(), template);
        }
        Ok(Self {
            templates: map,
            regulators: HashMap::new(),
            public_url: public_url.into(),
        })
    }

    /// Attach regulator contacts. A regulator may appear once.
    pub fn with_regulators(mut self, contacts: Vec<RegulatorContact>) -> Result<Self, CatalogError> {
        for contact in contacts {
            if self.regulators.contains_key(&contact.regulator) {
                return Err(CatalogError::Invalid(format!(
                    "duplicate contact for regulator {}",
                    contact.regulator
                )));
            }
            self.regulators.insert(contact.regulator.clone(), contact);
        }
        Ok(self)
    }

    /// Addresses a notification about `incident` goes to.
    pub fn recipients(&self, incident: &Incident) -> Vec<String> {
        let contact = self.regulators.get(&incident.regulator);
        let mut recipients: Vec<String> = Vec::new();
        for address in incident
            .contact_email
            .iter()
            .chain(contact.and_then(|c| c.email_for_notification.as_ref()))
            .chain(contact.into_iter().flat_map(|c| c.observers.iter()))
        {
            if !recipients.contains(address) {
                recipients.push(address.clone());
            }
        }
        recipients
    }

    /// Whether a template exists.
    pub fn contains(&self, id: &EmailTemplateId) -> bool {
        self.templates.contains_key(id)
    }

    /// Render a notification of `kind` for `incident`, from `template` when
    /// given and known, else from the default text for `kind`.
    pub fn render(
        &self,
        kind: NotificationKind,
        template: Option<&EmailTemplateId>,
        incident: &Incident,
        step_position: Option<i32>,
    ) -> NotificationMessage {
        let found = template.and_then(|id| {
            let t = self.templates.get(id);
            if t.is_none() {
                tracing::warn!(template = %id, %kind, "unknown email template, using default text");
            }
            t
        });
        let (subject, content) = match found {
            Some(t) => (t.subject.as_str(), t.content.as_str()),
            None => default_text(kind),
        };
        NotificationMessage {
            incident_id: incident.id,
            incident_reference: incident.reference.clone(),
            kind,
            step_position,
            subject: self.substitute(subject, incident),
            body: self.substitute(content, incident),
            recipients: self.recipients(incident),
        }
    }

    /// Replace the incident variables in `content`.
    pub fn substitute(&self, content: &str, incident: &Incident) -> String {
        let date = |t: Option<Timestamp>| t.map(|t| t.to_date_string()).unwrap_or_default();
        content
            .replace("#PUBLIC_URL#", &self.public_url)
            .replace(
                "#INCIDENT_NOTIFICATION_DATE#",
                &incident.notification_date.to_date_string(),
            )
            .replace("#INCIDENT_DETECTION_DATE#", &date(incident.detection_date))
            .replace("#INCIDENT_STARTING_DATE#", &date(incident.starting_date))
            .replace("#INCIDENT_ID#", &incident.reference)
    }
}

fn default_text(kind: NotificationKind) -> (&'static str, &'static str) {
    match kind {
        NotificationKind::Opening => (
            "Incident #INCIDENT_ID#: notification received",
            "The incident #INCIDENT_ID# notified on #INCIDENT_NOTIFICATION_DATE# has been registered.",
        ),
        NotificationKind::Submission => (
            "Incident #INCIDENT_ID#: report submitted",
            "A report for incident #INCIDENT_ID# has been submitted.",
        ),
        NotificationKind::StatusChanged => (
            "Incident #INCIDENT_ID#: report status changed",
            "The status of a report for incident #INCIDENT_ID# has changed. See #PUBLIC_URL#.",
        ),
        NotificationKind::Reminder => (
            "Incident #INCIDENT_ID#: report due",
            "A report for incident #INCIDENT_ID# is due. See #PUBLIC_URL#.",
        ),
        NotificationKind::Closing => (
            "Incident #INCIDENT_ID#: closed",
            "The incident #INCIDENT_ID# has been closed.",
        ),
    }
}
