//! Startup composition: module registry → validated model → service container.

use crate::config::{resolve, ResolvedModel};
use crate::error::ConfigError;
use crate::registry::{CompositionRoot, ModuleRegistry};
use crate::service::{ServiceCatalog, ServiceContainer};
use crate::settings::Settings;
use crate::state::AppState;
use sqlx::PgPool;
use std::sync::Arc;

/// Everything built from the module tree before any connection is opened.
#[derive(Debug)]
pub struct Application {
    pub composition: CompositionRoot,
    pub model: ResolvedModel,
    pub services: ServiceContainer,
}

impl Application {
    pub fn into_state(self, pool: PgPool) -> AppState {
        AppState {
            pool,
            model: Arc::new(self.model),
            services: Arc::new(self.services),
            composition: Arc::new(self.composition),
        }
    }
}

/// Discover and merge the module fragments, resolve the resource model and instantiate the
/// services. Any failure is fatal; nothing is partially registered.
pub fn compose(settings: &Settings, catalog: &ServiceCatalog) -> Result<Application, ConfigError> {
    let composition = ModuleRegistry::new(&settings.modules_dir, &settings.app_env)
        .require_base_fragment(settings.require_base_fragment)
        .build()?;
    let model = resolve(&composition, &settings.database_schema)?;
    let services = ServiceContainer::build(&composition, catalog)?;

    let summary = composition.summary();
    tracing::info!(
        environment = %summary.environment,
        modules = summary.modules.len(),
        services = services.len(),
        entities = summary.entities,
        resources = summary.resources,
        "application composed"
    );
    for m in &summary.modules {
        tracing::info!(
            module = %m.name,
            fragments = m.fragments.len(),
            resources = ?m.entries.resources,
            "module registered"
        );
    }
    Ok(Application {
        composition,
        model,
        services,
    })
}
