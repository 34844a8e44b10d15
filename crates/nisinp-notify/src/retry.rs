//! Redelivery of tickets the webhook never received.
//!
//! A ticket is sent again only when the connection could not be made or the
//! request timed out. Any response, whatever its status, ends the delivery:
//! the webhook has seen the ticket and resending could duplicate it.

use std::future::Future;
use std::time::Duration;

use crate::message::NotificationMessage;

/// Attempts and spacing of ticket deliveries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    /// Total sends, the first included. Never less than one.
    pub attempts: u32,
    /// Wait before the second send; doubled before each later one.
    pub base_delay: Duration,
}

impl Default for Backoff {
    fn default() -> Self {
        Self {
            attempts: 4,
            base_delay: Duration::from_millis(200),
        }
    }
}

impl Backoff {
    /// Wait after the failed send numbered `attempt` (from zero).
    fn delay(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Send `message` through `send` until the webhook answers, the error is
    /// not transient, or the attempts run out.
    pub(crate) async fn deliver<F, Fut>(
        &self,
        message: &NotificationMessage,
        send: F,
    ) -> Result<reqwest::Response, reqwest::Error>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let attempts = self.attempts.max(1);
        let mut attempt = 0;
        loop {
            match send().await {
                Ok(resp) => return Ok(resp),
                Err(e) if attempt + 1 < attempts && is_transient(&e) => {
                    let delay = self.delay(attempt);
                    attempt += 1;
                    tracing::warn!(
                        incident_id = %message.incident_id,
                        kind = %message.kind,
                        attempt,
                        attempts,
                        ?delay,
                        error = %e,
                        "ticket not delivered, resending"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}

fn is_transient(e: &reqwest::Error) -> bool {
    e.is_connect() || e.is_timeout()
}
