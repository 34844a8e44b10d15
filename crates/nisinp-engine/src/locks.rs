//! Per-incident serialisation.
//!
//! Every write path holds the incident's async mutex for the whole
//! read-decide-write-notify sequence. The repository compare-and-swap still
//! guards against writers in other processes; the lock keeps writers in
//! this one from racing to a conflict in the first place.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use nisinp_core::IncidentId;

/// A map of per-incident async mutexes.
///
/// Entries nobody holds or waits on are dropped on the next acquisition,
/// so the map only ever holds incidents with a writer in flight.
#[derive(Debug, Clone, Default)]
pub struct IncidentLocks {
    inner: Arc<parking_lot::Mutex<HashMap<IncidentId, Arc<Mutex<()>>>>>,
}

impl IncidentLocks {
    /// An empty lock map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `incident`.
    pub async fn lock(&self, incident: IncidentId) -> OwnedMutexGuard<()> {
        let mutex = {
            let mut map = self.inner.lock();
            map.retain(|_, m| Arc::strong_count(m) > 1);
            map.entry(incident).or_default().clone()
        };
        mutex.lock_owned().await
    }

    /// Number of incidents with a writer in flight.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .values()
            .filter(|m| Arc::strong_count(m) > 1)
            .count()
    }

    /// Whether no incident has a writer in flight.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
