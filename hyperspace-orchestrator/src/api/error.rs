//! Local wrapper around [`OrchestratorError`] implementing axum's
//! `IntoResponse`. The orphan rule blocks `impl IntoResponse for
//! OrchestratorError` directly, since neither the trait nor the type live
//! in this crate — a newtype at the boundary is the usual fix whenever an
//! axum service's errors live in a shared, non-axum-aware crate.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use hyperspace_protocol::error::OrchestratorError;
use serde_json::json;

pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = StatusCode::from_u16(self.0.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let body = Json(json!({ "error": self.0.to_string() }));
        (status, body).into_response()
    }
}
