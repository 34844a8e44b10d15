//! # nisinp-cli — Incident Engine Binary
//!
//! Library half of the `nisinp` binary, so subcommands can be tested
//! without spawning a process.
//!
//! ## Subcommands
//!
//! - `serve`: the sweep scheduler plus `/health/*` and `/metrics`.
//! - `sweep`: one run of selected sweeps, then exit.
//! - `catalog validate`: load the catalog and print every graph.
//!
//! ## Configuration
//!
//! One YAML file (see [`config`]) with environment overrides for
//! deployment secrets and addresses. `DATABASE_URL` selects the
//! PostgreSQL repository; without it incidents live in memory.

pub mod catalog;
pub mod config;
pub mod http;
pub mod runtime;
pub mod serve;
pub mod sweep;
