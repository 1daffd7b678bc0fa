//! Typed wiring definitions and the runtime model resolved from them.

pub mod resolved;
pub mod resolver;
pub mod types;
pub mod validator;

pub use resolved::{ColumnInfo, PkType, ResolvedEntity, ResolvedModel};
pub use resolver::{resolve, TIMESTAMP_COLUMNS};
pub use types::*;
pub use validator::{path_segment, validate};
