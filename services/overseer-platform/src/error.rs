//! Mapping of [`OverseerError`] onto HTTP responses

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use overseer_core::OverseerError;
use serde_json::json;
use tracing::error;

#[derive(Debug)]
pub struct ApiError(pub OverseerError);

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            OverseerError::AgentNotFound { .. } => StatusCode::NOT_FOUND,
            OverseerError::DuplicateAgent { .. } => StatusCode::CONFLICT,
            OverseerError::InvalidConfig { .. } => StatusCode::BAD_REQUEST,
            e if e.is_graph_error() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<OverseerError> for ApiError {
    fn from(e: OverseerError) -> Self {
        Self(e)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            error!(error = %self.0, "Request failed");
        }
        (status, Json(json!({ "error": self.0.to_string() }))).into_response()
    }
}
