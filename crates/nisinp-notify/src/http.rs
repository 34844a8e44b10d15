//! # HTTP Ticketing Notifier
//!
//! Each notification becomes a JSON ticket POSTed to one webhook:
//!
//! ```json
//! { "incident_id": "...", "incident_reference": "...", "kind": "reminder",
//!   "step_position": 2, "subject": "...", "body": "...", "recipients": [] }
//! ```
//!
//! Any 2xx accepts the ticket. Other statuses are rejections and are not
//! retried; connect failures and timeouts are resent per [`Backoff`].

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};

use crate::config::{ConfigError, HttpNotifierConfig};
use crate::error::NotifierError;
use crate::message::NotificationMessage;
use crate::notifier::Notifier;
use crate::retry::Backoff;

/// Notifier posting tickets to a webhook.
#[derive(Debug, Clone)]
pub struct HttpNotifier {
    http: reqwest::Client,
    url: url::Url,
    timeout: Duration,
    backoff: Backoff,
}

impl HttpNotifier {
    /// Build the HTTP client from `config`.
    pub fn new(config: &HttpNotifierConfig) -> Result<Self, NotifierError> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let mut headers = HeaderMap::new();
        if let Some(token) = &config.token {
            let mut value = HeaderValue::from_str(&format!("Bearer {}", token.as_str()))
                .map_err(|_| ConfigError::InvalidToken)?;
            value.set_sensitive(true);
            headers.insert(AUTHORIZATION, value);
        }
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| NotifierError::Unavailable(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            http,
            url: config.url.clone(),
            timeout,
            backoff: Backoff::default(),
        })
    }

    /// Replace the redelivery policy.
    pub fn with_backoff(mut self, backoff: Backoff) -> Self {
        self.backoff = backoff;
        self
    }
}

#[async_trait]
impl Notifier for HttpNotifier {
    async fn notify(&self, message: &NotificationMessage) -> Result<(), NotifierError> {
        let resp = self
            .backoff
            .deliver(message, || self.http.post(self.url.clone()).json(message).send())
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    NotifierError::Timeout(self.timeout)
                } else {
                    NotifierError::Unavailable(e.to_string())
                }
            })?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(NotifierError::Rejected {
                status: status.as_u16(),
                body,
            });
        }
        tracing::debug!(
            incident = %message.incident_id,
            kind = %message.kind,
            "ticket accepted"
        );
        Ok(())
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
