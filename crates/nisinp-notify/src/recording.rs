//! In-memory notifier for tests.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;

use nisinp_core::IncidentId;

use crate::error::NotifierError;
use crate::message::{NotificationKind, NotificationMessage};
use crate::notifier::Notifier;

#[derive(Debug, Default)]
struct Recorded {
    messages: Vec<NotificationMessage>,
    fail_all: bool,
    failing: HashSet<IncidentId>,
}

/// Keeps every delivered message. Can be told to fail, globally or for
/// chosen incidents; failed deliveries are not recorded.
#[derive(Debug, Clone, Default)]
pub struct RecordingNotifier {
    inner: Arc<Mutex<Recorded>>,
}

impl RecordingNotifier {
    /// An empty recorder that accepts everything.
    pub fn new() -> Self {
        Self::default()
    }

    /// Fail every delivery while `fail` is set.
    pub fn set_failing(&self, fail: bool) {
        self.inner.lock().fail_all = fail;
    }

    /// Fail deliveries about `incident`.
    pub fn fail_for(&self, incident: IncidentId) {
        self.inner.lock().failing.insert(incident);
    }

    /// All delivered messages, in order.
    pub fn messages(&self) -> Vec<NotificationMessage> {
        self.inner.lock().messages.clone()
    }

    /// Number of delivered messages.
    pub fn count(&self) -> usize {
        self.inner.lock().messages.len()
    }

    /// Delivered messages of one kind.
    pub fn of_kind(&self, kind: NotificationKind) -> Vec<NotificationMessage> {
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.kind == kind)
            .cloned()
            .collect()
    }

    /// Delivered messages about one incident.
    pub fn for_incident(&self, incident: IncidentId) -> Vec<NotificationMessage> {
        self.inner
            .lock()
            .messages
            .iter()
            .filter(|m| m.incident_id == incident)
            .cloned()
            .collect()
    }

    /// Forget everything delivered so far.
    pub fn clear(&self) {
        self.inner.lock().messages.clear();
    }
}

#[async_trait]
impl Notifier for RecordingNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        let mut inner = self.inner.lock();
        if inner.fail_all || inner.failing.contains(&message.incident_id) {
            return Err(NotifierError::Unavailable("recording notifier set to fail".into()));
        }
        inner.messages.push(message.clone());
        Ok(())
    }

    fn name(&self) -> &'static str {
        "recording"
    }
}
