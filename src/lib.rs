//! API skeleton: per-module configuration fragments composed at startup into REST resources
//! over PostgreSQL.

pub mod app;
pub mod case;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod migration;
pub mod openapi;
pub mod registry;
pub mod response;
pub mod routes;
pub mod service;
pub mod settings;
pub mod sql;
pub mod state;

pub use app::{compose, Application};
pub use config::{resolve, validate, ResolvedEntity, ResolvedModel};
pub use db::{connect, ensure_database_exists};
pub use error::{AppError, ConfigError, RegistryError};
pub use migration::{ddl_statements, sync_schema};
pub use openapi::openapi_document;
pub use registry::{build_composition_root, CompositionRoot, ModuleRegistry, Role};
pub use response::{success_many, success_one};
pub use routes::{app_router, common_routes, entity_routes, registry_routes};
pub use service::{CrudService, ResourceProcessor, ServiceCatalog, ServiceContainer};
pub use settings::Settings;
pub use state::AppState;
