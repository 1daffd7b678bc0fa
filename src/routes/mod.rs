//! Route tables and the assembled application router.

mod common;
mod entity;
mod registry;

pub use common::common_routes;
pub use entity::entity_routes;
pub use registry::registry_routes;

use crate::error::AppError;
use crate::state::AppState;
use axum::{http::Uri, Router};
use tower::ServiceBuilder;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

async fn fallback(uri: Uri) -> AppError {
    AppError::NotFound(format!("route {}", uri.path()))
}

/// Every route of the service, with request tracing and a request body limit.
pub fn app_router(state: AppState, max_body_bytes: usize) -> Router {
    Router::new()
        .merge(common_routes(state.clone()))
        .merge(registry_routes(state.clone()))
        .merge(entity_routes(state))
        .fallback(fallback)
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(RequestBodyLimitLayer::new(max_body_bytes)),
        )
}
