//! Shared domain model for the edge commissioning orchestrator.
//!
//! This crate carries no I/O and no async runtime — it is the wire/storage
//! shape both the orchestrator binary and any future client or test harness
//! agree on.

pub mod bundle;
pub mod error;
pub mod model;

pub use bundle::{hash_bundle, ExtrinsicsBundle};
pub use error::OrchestratorError;
