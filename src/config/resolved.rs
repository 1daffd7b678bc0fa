//! Resolved resource model: composition validated and flattened for runtime use.

use crate::config::{KeyCase, Operation, PaginationConfig, ValidationRule};
use std::collections::{HashMap, HashSet};

/// Primary key type for parsing path/body ids.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PkType {
    Uuid,
    BigInt,
    Int,
    Text,
}

#[derive(Clone, Debug)]
pub struct ColumnInfo {
    pub name: String,
    pub pk_type: Option<PkType>,
    pub nullable: bool,
    /// Whether the column has a DB default (e.g. gen_random_uuid(), NOW()).
    pub has_default: bool,
    /// Declared type, lowercased (e.g. "integer", "varchar").
    pub data_type: String,
    /// PostgreSQL type name for SQL casts (e.g. "timestamptz") when binding string values.
    pub pg_cast: Option<String>,
}

impl ColumnInfo {
    pub fn is_integer(&self) -> bool {
        matches!(self.pk_type, Some(PkType::Int | PkType::BigInt))
            || self.data_type.contains("int")
            || self.data_type.contains("serial")
    }

    pub fn is_bool(&self) -> bool {
        self.data_type.starts_with("bool")
    }
}

/// One exposed resource joined with the entity mapping behind it.
#[derive(Clone, Debug)]
pub struct ResolvedEntity {
    /// Resource name in the composition root.
    pub resource: String,
    /// Persistence entity name.
    pub entity: String,
    pub module: String,
    pub schema_name: String,
    pub table_name: String,
    pub path_segment: String,
    pub pk_columns: Vec<String>,
    pub pk_type: PkType,
    pub columns: Vec<ColumnInfo>,
    pub operations: Vec<Operation>,
    /// Column names to strip from all API responses (sensitive data).
    pub sensitive_columns: HashSet<String>,
    pub validation: HashMap<String, ValidationRule>,
    pub processors: Vec<String>,
    pub key_case: KeyCase,
    pub pagination: PaginationConfig,
    pub description: Option<String>,
}

impl ResolvedEntity {
    pub fn allows(&self, op: Operation) -> bool {
        self.operations.contains(&op)
    }

    pub fn column(&self, name: &str) -> Option<&ColumnInfo> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn primary_key(&self) -> &str {
        &self.pk_columns[0]
    }
}

#[derive(Clone, Debug, Default)]
pub struct ResolvedModel {
    pub entities: Vec<ResolvedEntity>,
    pub entity_by_path: HashMap<String, ResolvedEntity>,
}

impl ResolvedModel {
    pub fn entity_by_path(&self, path: &str) -> Option<&ResolvedEntity> {
        self.entity_by_path.get(path)
    }
}
