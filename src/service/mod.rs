//! Business-logic services, request validation and generic CRUD on top of the SQL builder.

mod catalog;
mod container;
mod crud;
pub mod processors;
mod query;
mod repository;
mod unit_of_work;
mod validation;

pub use catalog::{ServiceCatalog, ServiceFactory};
pub use container::ServiceContainer;
pub use crud::{CrudService, Page, BULK_LIMIT};
pub use processors::{ProcessContext, ResourceProcessor};
pub use query::row_to_json;
pub use repository::EntityRepository;
pub use unit_of_work::UnitOfWork;
pub use validation::RequestValidator;
