//! Error kinds shared across the orchestrator core, per spec.md §7.
//!
//! Kept as a flat `thiserror` enum rather than per-component error types —
//! every component boundary converts into this one shape before crossing
//! into the HTTP layer.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum OrchestratorError {
    #[error("bad request: {0}")]
    BadRequest(String),

    #[error("not found: {0}")]
    NotFound(String),

    #[error("gateway offline: {0}")]
    GatewayOffline(String),

    #[error("mesh directory unavailable: {0}")]
    DirectoryUnavailable(String),

    #[error("remote error {status}: {body}")]
    RemoteError { status: u16, body: String },

    #[error("deadline exceeded")]
    Timeout,

    #[error("coordinator busy for venue {0}")]
    CoordinatorBusy(String),

    #[error("uniqueness violation: {0}")]
    UniquenessViolation(String),

    #[error("internal error: {0}")]
    Internal(String),
}

impl OrchestratorError {
    /// HTTP status this error kind maps to, per spec.md §7. `Timeout` maps
    /// to 504 by default; the set-address RPC path never constructs this
    /// variant for its own success-as-timeout case (see `edge_rpc`).
    pub fn status_code(&self) -> u16 {
        match self {
            OrchestratorError::BadRequest(_) => 400,
            OrchestratorError::NotFound(_) => 404,
            OrchestratorError::DirectoryUnavailable(_) => 503,
            OrchestratorError::GatewayOffline(_) => 502,
            OrchestratorError::RemoteError { .. } => 502,
            OrchestratorError::Timeout => 504,
            OrchestratorError::CoordinatorBusy(_) => 409,
            OrchestratorError::UniquenessViolation(_) => 409,
            OrchestratorError::Internal(_) => 500,
        }
    }
}

impl From<anyhow::Error> for OrchestratorError {
    fn from(err: anyhow::Error) -> Self {
        OrchestratorError::Internal(err.to_string())
    }
}
