//! Typed entry definitions for the three fragment roles.

use serde::{Deserialize, Deserializer, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Service wiring entry. `kind` selects a factory in the [`ServiceCatalog`](crate::service::ServiceCatalog).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceDefinition {
    pub kind: String,
    #[serde(default)]
    pub arguments: serde_json::Map<String, serde_json::Value>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Disabled services stay in the composition root but are never instantiated.
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default)]
    pub description: Option<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TableCheck {
    pub name: String,
    pub expression: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PrimaryKeyConfig {
    Single(String),
    Composite(Vec<String>),
}

impl PrimaryKeyConfig {
    pub fn columns(&self) -> Vec<&str> {
        match self {
            PrimaryKeyConfig::Single(s) => vec![s.as_str()],
            PrimaryKeyConfig::Composite(v) => v.iter().map(String::as_str).collect(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ColumnTypeConfig {
    Simple(String),
    Parameterized { name: String, params: Option<Vec<u32>> },
}

impl ColumnTypeConfig {
    pub fn name(&self) -> &str {
        match self {
            ColumnTypeConfig::Simple(s) => s,
            ColumnTypeConfig::Parameterized { name, .. } => name,
        }
    }

    /// DDL spelling, e.g. `varchar(255)`.
    pub fn sql(&self) -> String {
        match self {
            ColumnTypeConfig::Simple(s) => s.clone(),
            ColumnTypeConfig::Parameterized { name, params } => match params.as_deref() {
                Some(p) if !p.is_empty() => {
                    let p: Vec<String> = p.iter().map(u32::to_string).collect();
                    format!("{}({})", name, p.join(", "))
                }
                _ => name.clone(),
            },
        }
    }
}

/// Column default: strings are quoted literals, numbers and booleans are emitted as written,
/// `{ expression: ... }` is raw SQL.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub enum ColumnDefaultConfig {
    Literal(String),
    Number(serde_json::Number),
    Bool(bool),
    Expression { expression: String },
}

impl<'de> Deserialize<'de> for ColumnDefaultConfig {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        use serde_json::Value;
        match Value::deserialize(deserializer)? {
            Value::String(s) => Ok(ColumnDefaultConfig::Literal(s)),
            Value::Number(n) => Ok(ColumnDefaultConfig::Number(n)),
            Value::Bool(b) => Ok(ColumnDefaultConfig::Bool(b)),
            Value::Object(mut obj) => {
                if let Some(Value::String(s)) = obj.remove("expression") {
                    return Ok(ColumnDefaultConfig::Expression { expression: s });
                }
                if let Some(Value::String(s)) = obj.remove("value") {
                    return Ok(ColumnDefaultConfig::Literal(s));
                }
                Err(serde::de::Error::custom(
                    "column default object needs an \"expression\" or \"value\" string",
                ))
            }
            _ => Err(serde::de::Error::custom(
                "column default must be a scalar or { \"expression\": \"...\" }",
            )),
        }
    }
}

impl ColumnDefaultConfig {
    /// SQL for `DEFAULT ...`.
    pub fn sql(&self) -> String {
        match self {
            ColumnDefaultConfig::Expression { expression } => expression.clone(),
            ColumnDefaultConfig::Number(n) => n.to_string(),
            ColumnDefaultConfig::Bool(b) => b.to_string(),
            ColumnDefaultConfig::Literal(s) => format!("'{}'", s.replace('\'', "''")),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ColumnConfig {
    pub name: String,
    #[serde(rename = "type")]
    pub type_: ColumnTypeConfig,
    #[serde(default = "default_true")]
    pub nullable: bool,
    #[serde(default)]
    pub default: Option<ColumnDefaultConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

fn default_true() -> bool {
    true
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum IndexColumnEntry {
    Name(String),
    Spec { name: String, direction: Option<String> },
    Expression { expression: String },
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct IndexConfig {
    pub name: String,
    #[serde(default)]
    pub method: Option<String>,
    #[serde(default)]
    pub unique: bool,
    pub columns: Vec<IndexColumnEntry>,
    #[serde(default, rename = "where")]
    pub where_: Option<String>,
}

/// Persistence wiring entry: how a logical entity maps onto a table.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct EntityMapping {
    pub table: String,
    /// Falls back to the configured default schema.
    #[serde(default)]
    pub schema: Option<String>,
    pub primary_key: PrimaryKeyConfig,
    pub columns: Vec<ColumnConfig>,
    #[serde(default)]
    pub unique: Vec<Vec<String>>,
    #[serde(default)]
    pub check: Vec<TableCheck>,
    #[serde(default)]
    pub indexes: Vec<IndexConfig>,
    #[serde(default)]
    pub comment: Option<String>,
}

impl EntityMapping {
    pub fn column(&self, name: &str) -> Option<&ColumnConfig> {
        self.columns.iter().find(|c| c.name == name)
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ValidationRule {
    #[serde(default)]
    pub required: Option<bool>,
    #[serde(default)]
    pub format: Option<String>,
    #[serde(default)]
    pub max_length: Option<u32>,
    #[serde(default)]
    pub min_length: Option<u32>,
    #[serde(default)]
    pub pattern: Option<String>,
    #[serde(default)]
    pub allowed: Option<Vec<serde_json::Value>>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
}

/// CRUD operations a resource can expose.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    List,
    Read,
    Create,
    Update,
    Delete,
    BulkCreate,
    BulkUpdate,
}

impl Operation {
    pub const ALL: [Operation; 7] = [
        Operation::List,
        Operation::Read,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
        Operation::BulkCreate,
        Operation::BulkUpdate,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Operation::List => "list",
            Operation::Read => "read",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
            Operation::BulkCreate => "bulk_create",
            Operation::BulkUpdate => "bulk_update",
        }
    }

    pub fn is_write(self) -> bool {
        !matches!(self, Operation::List | Operation::Read | Operation::Delete)
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Key style of request and response bodies. Columns are always snake_case.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KeyCase {
    #[default]
    Snake,
    Camel,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PaginationConfig {
    #[serde(default = "default_limit")]
    pub default_limit: u32,
    #[serde(default = "max_limit")]
    pub max_limit: u32,
}

fn default_limit() -> u32 {
    100
}

fn max_limit() -> u32 {
    1000
}

impl Default for PaginationConfig {
    fn default() -> Self {
        PaginationConfig {
            default_limit: default_limit(),
            max_limit: max_limit(),
        }
    }
}

/// Api exposure entry: publishes a persistence entity as a REST resource.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ApiResource {
    pub entity: String,
    /// URL segment; defaults to the resource name.
    #[serde(default)]
    pub path: Option<String>,
    pub operations: Vec<Operation>,
    /// Column names that must never be exposed in API responses (e.g. password hashes, secrets).
    #[serde(default)]
    pub sensitive_columns: Vec<String>,
    #[serde(default)]
    pub validation: BTreeMap<String, ValidationRule>,
    /// Service names run, in order, on every write before validation.
    #[serde(default)]
    pub processors: Vec<String>,
    #[serde(default)]
    pub key_case: KeyCase,
    #[serde(default)]
    pub pagination: PaginationConfig,
    #[serde(default)]
    pub description: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn resource_defaults() {
        let r: ApiResource = serde_json::from_value(json!({
            "entity": "order",
            "operations": ["list", "read", "bulk_create"]
        }))
        .unwrap();
        assert_eq!(r.path, None);
        assert_eq!(r.key_case, KeyCase::Snake);
        assert_eq!(r.pagination, PaginationConfig::default());
        assert_eq!(r.operations[2], Operation::BulkCreate);
    }

    #[test]
    fn unknown_operation_is_rejected() {
        let r = serde_json::from_value::<ApiResource>(json!({
            "entity": "order",
            "operations": ["purge"]
        }));
        assert!(r.is_err());
    }

    #[test]
    fn column_defaults_accept_scalars_and_expressions() {
        let c: ColumnConfig = serde_json::from_value(json!({
            "name": "id", "type": "uuid", "nullable": false,
            "default": {"expression": "gen_random_uuid()"}
        }))
        .unwrap();
        assert_eq!(c.default.unwrap().sql(), "gen_random_uuid()");

        let c: ColumnConfig = serde_json::from_value(json!({"name": "priority", "type": "integer", "default": 3})).unwrap();
        assert_eq!(c.default.unwrap().sql(), "3");

        let c: ColumnConfig = serde_json::from_value(json!({"name": "status", "type": "text", "default": "it's new"})).unwrap();
        assert_eq!(c.default.unwrap().sql(), "'it''s new'");

        let c: ColumnConfig = serde_json::from_value(json!({"name": "active", "type": "boolean", "default": false})).unwrap();
        assert_eq!(c.default.unwrap().sql(), "false");
    }

    #[test]
    fn string_defaults_are_always_quoted() {
        for (raw, sql) in [("Infinity", "'Infinity'"), ("NaN", "'NaN'"), ("inf", "'inf'"), ("42", "'42'")] {
            let c: ColumnConfig = serde_json::from_value(json!({"name": "label", "type": "text", "default": raw})).unwrap();
            assert_eq!(c.default.unwrap().sql(), sql);
        }
    }

    #[test]
    fn parameterized_type_sql() {
        let t: ColumnTypeConfig = serde_json::from_value(json!({"name": "varchar", "params": [120]})).unwrap();
        assert_eq!(t.sql(), "varchar(120)");
        assert_eq!(t.name(), "varchar");
    }
}
