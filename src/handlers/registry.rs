//! Introspection handlers: composition root summary and OpenAPI document.

use crate::openapi::openapi_document;
use crate::registry::CompositionSummary;
use crate::response::{success_one_ok, SuccessOne};
use crate::state::AppState;
use axum::{extract::State, http::StatusCode, Json};
use utoipa::openapi::OpenApi;

pub async fn registry_summary(State(state): State<AppState>) -> (StatusCode, Json<SuccessOne<CompositionSummary>>) {
    success_one_ok(state.composition.summary())
}

pub async fn openapi_json(State(state): State<AppState>) -> Json<OpenApi> {
    Json(openapi_document(&state.model, &state.composition.environment))
}
