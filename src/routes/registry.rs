//! Registry introspection and API documentation routes.

use crate::handlers::{openapi_json, registry_summary};
use crate::state::AppState;
use axum::{routing::get, Router};

/// GET /registry, GET /api/docs.json.
pub fn registry_routes(state: AppState) -> Router {
    Router::new()
        .route("/registry", get(registry_summary))
        .route("/api/docs.json", get(openapi_json))
        .with_state(state)
}
