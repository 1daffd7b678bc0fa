//! HTTP handlers for resource CRUD and registry introspection.

pub mod entity;
pub mod registry;
pub use registry::*;
