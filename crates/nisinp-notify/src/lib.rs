//! # nisinp-notify — Notification Dispatch
//!
//! The engine tells operators and regulators about incident events through a
//! [`Notifier`]: an email gateway, a ticketing system, or just the log. A
//! notifier is *not* expected to deduplicate; the engine gates every
//! dispatch behind the state transition that caused it.
//!
//! ## Modules
//!
//! - [`message`]: what is sent ([`NotificationMessage`], [`NotificationKind`]).
//! - [`template`]: email templates with `#VARIABLE#` substitution and the
//!   built-in default text per kind.
//! - [`notifier`]: the [`Notifier`] trait and [`LogNotifier`].
//! - [`http`]: [`HttpNotifier`], JSON tickets POSTed to a webhook.
//! - [`retry`]: [`Backoff`], redelivery after connect and timeout failures.
//! - `recording` (feature `test-util`): `RecordingNotifier` for tests.

pub mod config;
pub mod error;
pub mod http;
pub mod message;
pub mod notifier;
#[cfg(any(test, feature = "test-util"))]
pub mod recording;
pub mod retry;
pub mod template;

pub use config::{ConfigError, HttpNotifierConfig};
pub use error::NotifierError;
pub use http::HttpNotifier;
pub use message::{NotificationKind, NotificationMessage};
pub use notifier::{LogNotifier, Notifier};
pub use retry::Backoff;
#[cfg(any(test, feature = "test-util"))]
pub use recording::RecordingNotifier;
pub use template::{EmailTemplate, RegulatorContact, TemplateCatalog};
