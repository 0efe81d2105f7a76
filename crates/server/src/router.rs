use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;
use crate::{submit, ws};

/// Builds the full route table. `allowedOrigins` governs both the CORS
/// layer for `/v1/search` and the Origin check performed on websocket
/// upgrade in [`ws::upgrade`].
pub fn build_router(state: AppState) -> Router {
    let cors = make_cors(&state.transport.allowed_origins);

    Router::new()
        .route("/v1/search", post(submit::submit))
        .route("/v1/ws", get(ws::upgrade))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn make_cors(allowed_origins: &[String]) -> CorsLayer {
    let origin = if allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::any()
    } else {
        let parsed = allowed_origins.iter().filter_map(|o| o.parse().ok()).collect::<Vec<_>>();
        AllowOrigin::list(parsed)
    };

    CorsLayer::new()
        .allow_methods([axum::http::Method::GET, axum::http::Method::POST])
        .allow_origin(origin)
        .allow_headers(Any)
}
