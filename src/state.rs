//! Shared application state for all routes. Built once at startup, immutable afterwards.

use crate::config::ResolvedModel;
use crate::registry::CompositionRoot;
use crate::service::ServiceContainer;
use sqlx::PgPool;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub model: Arc<ResolvedModel>,
    pub services: Arc<ServiceContainer>,
    pub composition: Arc<CompositionRoot>,
}
