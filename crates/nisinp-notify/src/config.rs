//! HTTP notifier configuration.
//!
//! Points the notifier at a ticketing webhook. Override via environment
//! variables or explicit construction for staging/testing.

use url::Url;
use zeroize::Zeroizing;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 10;

/// Configuration for the HTTP ticketing notifier.
///
/// Custom `Debug` implementation redacts the `token` field to prevent
/// credential leakage in log output.
#[derive(Clone)]
pub struct HttpNotifierConfig {
    /// Webhook receiving ticket payloads.
    pub url: Url,
    /// Bearer token, if the webhook requires one. Zeroed on drop.
    pub token: Option<Zeroizing<String>>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for HttpNotifierConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpNotifierConfig")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "[REDACTED]"))
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl HttpNotifierConfig {
    /// Build a configuration from explicit values.
    pub fn new(url: &str, token: Option<&str>, timeout_secs: u64) -> Result<Self, ConfigError> {
        Ok(Self {
            url: parse_url("url", url)?,
            token: token.map(|t| Zeroizing::new(t.to_string())),
            timeout_secs,
        })
    }

    /// Load configuration from environment variables.
    ///
    /// Variables:
    /// - `NISINP_NOTIFIER_URL` (required)
    /// - `NISINP_NOTIFIER_TOKEN` (optional)
    /// - `NISINP_NOTIFIER_TIMEOUT_SECS` (default: 10)
    pub fn from_env() -> Result<Self, ConfigError> {
        let url = std::env::var("NISINP_NOTIFIER_URL").map_err(|_| ConfigError::MissingUrl)?;
        Ok(Self {
            url: parse_url("NISINP_NOTIFIER_URL", &url)?,
            token: std::env::var("NISINP_NOTIFIER_TOKEN").ok().map(Zeroizing::new),
            timeout_secs: std::env::var("NISINP_NOTIFIER_TIMEOUT_SECS")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
        })
    }
}

fn parse_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("NISINP_NOTIFIER_URL environment variable is required")]
    MissingUrl,
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("notifier token is not a valid header value")]
    InvalidToken,
}
