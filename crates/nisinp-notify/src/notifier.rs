//! The notifier interface.

use async_trait::async_trait;

use crate::error::NotifierError;
use crate::message::NotificationMessage;

/// Delivers notifications.
///
/// Implementations may be called concurrently for different incidents.
/// Delivery failure is reported, never retried forever; the engine logs it
/// and moves on.
#[async_trait]
pub trait Notifier: Send + Sync {
    /// Deliver one message.
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifierError>;

    /// Short name for logs.
    fn name(&self) -> &'static str;
}

/// Writes every notification to the log and reports success.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        tracing::info!(
            incident = %message.incident_id,
            reference = %message.incident_reference,
            kind = %message.kind,
            step = ?message.step_position,
            recipients = ?message.recipients,
            subject = %message.subject,
            "notification"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "log"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use nisinp_core::IncidentId;

    use crate::message::NotificationKind;

    #[tokio::test]
    async fn log_notifier_always_succeeds() {
        let message = NotificationMessage {
            incident_id: IncidentId::new(),
            incident_reference: "REF".into(),
            kind: NotificationKind::Opening,
            step_position: None,
            subject: "s".into(),
            body: "b".into(),
            recipients: Vec::new(),
        };
        let notifier: &dyn Notifier = &LogNotifier;
        notifier.notify(&message).await.unwrap();
        assert_eq!(notifier.name(), "log");
    }
}
