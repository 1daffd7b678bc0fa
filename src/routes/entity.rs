//! Resource CRUD routes under `/api`. Paths are parameterized; handlers resolve the resource from
//! the segment, so every exposed resource shares one route table.

use crate::handlers::entity::{bulk_create, bulk_update, create, delete, list, read, update};
use crate::state::AppState;
use axum::{routing::get, routing::post, Router};

pub fn entity_routes(state: AppState) -> Router {
    Router::new()
        .route("/api/:path_segment", get(list).post(create))
        .route("/api/:path_segment/bulk", post(bulk_create).patch(bulk_update))
        .route("/api/:path_segment/:id", get(read).patch(update).delete(delete))
        .with_state(state)
}
