use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use plate_orchestrator::OrchestratorError;
use plate_types::ErrorKind;

/// Maps a submission failure onto the three HTTP-visible error kinds:
/// `INVALID_ARGUMENT`, `UNAUTHENTICATED`, `UNAVAILABLE`. Anything else
/// surfaced here is a bug in the orchestrator's own error taxonomy, not a
/// client-facing case, so it falls back to 500.
pub struct ApiError(pub OrchestratorError);

impl From<OrchestratorError> for ApiError {
    fn from(err: OrchestratorError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let code = match self.0.kind() {
            ErrorKind::Validation => "INVALID_ARGUMENT",
            ErrorKind::AuthMismatch => "UNAUTHENTICATED",
            ErrorKind::DependencyDown => "UNAVAILABLE",
            _ => "INTERNAL",
        };
        let status = match self.0.kind() {
            ErrorKind::Validation => StatusCode::BAD_REQUEST,
            ErrorKind::AuthMismatch => StatusCode::UNAUTHORIZED,
            ErrorKind::DependencyDown => StatusCode::SERVICE_UNAVAILABLE,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        };
        let body = Json(serde_json::json!({ "error": { "code": code, "message": self.0.to_string() } }));
        (status, body).into_response()
    }
}
