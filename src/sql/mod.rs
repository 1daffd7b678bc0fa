//! Statement building for resolved entities. Identifiers are quoted from the composed
//! model; request values only ever travel as bind parameters.

mod builder;
pub mod params;

pub use builder::{count, delete, insert, qualified_table, quoted, select_by_id, select_list, update, QueryBuf};
pub use params::PgBindValue;
