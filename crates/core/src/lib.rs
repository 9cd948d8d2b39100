//! Shared domain vocabulary for the integration-test orchestrator.
//!
//! - [`types::RunId`]: the correlation token threading through one run.
//! - [`verdict`]: verdict records reported by triggered handlers and the
//!   outcome derived from them.
//! - [`run_state`]: the coordinator's lifecycle states.
//! - [`error::CoreError`]: domain-level errors shared by every crate.

pub mod error;
pub mod run_state;
pub mod types;
pub mod verdict;
