//! # nisinp-store — Incident Persistence
//!
//! The incident store is the only shared mutable resource of the engine.
//! Both writers, the intake service and the sweeps, go through
//! [`IncidentRepository`], whose write operations are compare-and-swaps so a
//! lost race surfaces as [`StoreError::Conflict`] or a `false` result rather
//! than a silent overwrite.
//!
//! ## Backends
//!
//! - [`MemoryRepository`]: `parking_lot` maps behind one lock. Development
//!   and tests.
//! - `PgRepository` (feature `postgres`): PostgreSQL via SQLx. Selected when
//!   `DATABASE_URL` is set; see [`postgres::init_pool`].
//!
//! ## What is NOT stored here
//!
//! Step graphs, question schemas and email templates are catalog
//! configuration, loaded once at startup.

pub mod error;
pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;
pub mod repository;

pub use error::{Missing, StoreError};
pub use memory::MemoryRepository;
#[cfg(feature = "postgres")]
pub use postgres::PgRepository;
pub use repository::IncidentRepository;
