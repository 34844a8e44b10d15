//! # Runtime Wiring
//!
//! Builds the repository, notifier and [`EngineContext`] from a resolved
//! [`AppConfig`]. The repository is PostgreSQL when `DATABASE_URL` is set
//! (and the `postgres` feature is compiled in), memory otherwise.

use std::sync::Arc;

use nisinp_core::SystemClock;
use nisinp_engine::EngineContext;
use nisinp_notify::{HttpNotifier, LogNotifier, Notifier, NotifierError};
use nisinp_store::{IncidentRepository, MemoryRepository, StoreError};

use crate::config::{AppConfig, NotifierChoice};

/// Open the incident repository selected by the environment.
#[cfg(feature = "postgres")]
pub async fn open_repository() -> Result<Arc<dyn IncidentRepository>, StoreError> {
    match nisinp_store::postgres::init_pool().await? {
        Some(pool) => {
            tracing::info!("using the PostgreSQL incident repository");
            Ok(Arc::new(nisinp_store::PgRepository::new(pool)))
        }
        None => Ok(Arc::new(MemoryRepository::new())),
    }
}

/// Open the incident repository selected by the environment.
#[cfg(not(feature = "postgres"))]
pub async fn open_repository() -> Result<Arc<dyn IncidentRepository>, StoreError> {
    if std::env::var_os("DATABASE_URL").is_some() {
        tracing::warn!(
            "DATABASE_URL is set but this build has no PostgreSQL support; \
             running with the in-memory store"
        );
    }
    Ok(Arc::new(MemoryRepository::new()))
}

/// Build the configured notifier.
pub fn build_notifier(choice: &NotifierChoice) -> Result<Arc<dyn Notifier>, NotifierError> {
    match choice {
        NotifierChoice::Log => Ok(Arc::new(LogNotifier)),
        NotifierChoice::Http(config) => {
            tracing::info!(url = %config.url, "notifications go to the HTTP notifier");
            Ok(Arc::new(HttpNotifier::new(config)?))
        }
    }
}

/// Assemble the engine over `repository` on the system clock.
pub fn build_context(
    config: &AppConfig,
    repository: Arc<dyn IncidentRepository>,
) -> Result<EngineContext, NotifierError> {
    let notifier = build_notifier(&config.notifier)?;
    Ok(EngineContext::new(
        config.catalog.clone(),
        repository,
        notifier,
        Arc::new(SystemClock),
    ))
}
