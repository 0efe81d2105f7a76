use axum::extract::State;
use axum::Json;
use plate_types::Submission;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubmitResponse {
    pub request_id: String,
    #[serde(skip_serializing_if = "std::ops::Not::not")]
    pub deduplicated: bool,
}

/// `POST /v1/search`: the submission interface. The caller's
/// identity (`owner_user_id`) is left `None` here — wiring an auth layer
/// ahead of this handler is transport-framing detail out of scope.
pub async fn submit(State(state): State<AppState>, Json(submission): Json<Submission>) -> Result<Json<SubmitResponse>, ApiError> {
    let outcome = state.orchestrator.submit(submission, None).await?;
    Ok(Json(SubmitResponse { request_id: outcome.request_id, deduplicated: outcome.deduplicated }))
}
