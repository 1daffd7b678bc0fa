//! Module registry: discovers per-module configuration fragments and merges them into one
//! composition root at startup.
//!
//! Layout: `<root>/<Module>/<stem>[_<env>].<json|yaml|yml|toml>` where the stem names the role
//! (`services`, `persistence`, `api`). Roles are merged in that order; within a role the
//! unsuffixed fragments come first, then the active environment's, each group sorted by path.
//! Dropping a new module directory into the root activates it on the next start.

pub mod composition;
pub mod discovery;
pub mod fragment;
pub mod loader;
pub mod merge;
pub mod role;

pub use composition::{CompositionRoot, CompositionSummary, ModuleInfo, Registered};
pub use discovery::{discover, DiscoveredModule, FragmentFile};
pub use loader::{build_composition_root, ModuleRegistry};
pub use role::{Format, Role, RoleStems};
