//! Flatten a validated composition root into the runtime resource model.

use crate::config::resolved::{ColumnInfo, PkType, ResolvedEntity, ResolvedModel};
use crate::config::types::*;
use crate::config::{path_segment, validate};
use crate::error::ConfigError;
use crate::registry::CompositionRoot;
use std::collections::HashSet;

/// Implicit bookkeeping columns every mapped table carries.
pub const TIMESTAMP_COLUMNS: [&str; 2] = ["created_at", "updated_at"];

/// Build resolved model from the composition root (validates first).
pub fn resolve(root: &CompositionRoot, default_schema: &str) -> Result<ResolvedModel, ConfigError> {
    validate(root)?;

    let mut entities = Vec::with_capacity(root.resources.len());
    for (name, reg) in &root.resources {
        let api = &reg.definition;
        let mapping = root.entity(&api.entity).ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: api.entity.clone(),
            owner: format!("resource {}", name),
        })?;

        let pk_names: Vec<String> = mapping.primary_key.columns().into_iter().map(String::from).collect();
        let pk_col = pk_names
            .first()
            .and_then(|pk| mapping.column(pk))
            .ok_or_else(|| ConfigError::InvalidPrimaryKey {
                entity: api.entity.clone(),
                column: pk_names.first().cloned().unwrap_or_default(),
            })?;
        let pk_type = infer_pk_type(&pk_col.type_);

        let mut columns: Vec<ColumnInfo> = mapping
            .columns
            .iter()
            .map(|c| ColumnInfo {
                name: c.name.clone(),
                pk_type: pk_names.contains(&c.name).then(|| pk_type.clone()),
                nullable: c.nullable,
                has_default: c.default.is_some() || is_serial(&c.type_),
                data_type: c.type_.name().to_lowercase(),
                pg_cast: column_pg_cast(&c.type_),
            })
            .collect();

        let declared: HashSet<String> = columns.iter().map(|c| c.name.clone()).collect();
        for ts in TIMESTAMP_COLUMNS {
            if !declared.contains(ts) {
                columns.push(ColumnInfo {
                    name: ts.to_string(),
                    pk_type: None,
                    nullable: false,
                    has_default: true,
                    data_type: "timestamptz".into(),
                    pg_cast: Some("timestamptz".into()),
                });
            }
        }

        let entity = ResolvedEntity {
            resource: name.clone(),
            entity: api.entity.clone(),
            module: reg.module.clone(),
            schema_name: mapping.schema.clone().unwrap_or_else(|| default_schema.to_string()),
            table_name: mapping.table.clone(),
            path_segment: path_segment(name, api.path.as_deref()).to_string(),
            pk_columns: pk_names,
            pk_type,
            columns,
            operations: api.operations.clone(),
            sensitive_columns: api.sensitive_columns.iter().cloned().collect(),
            validation: api.validation.clone().into_iter().collect(),
            processors: api.processors.clone(),
            key_case: api.key_case,
            pagination: api.pagination.clone(),
            description: api.description.clone(),
        };
        tracing::debug!(
            resource = %entity.resource,
            path = %entity.path_segment,
            table = %entity.table_name,
            "resource resolved"
        );
        entities.push(entity);
    }

    let entity_by_path = entities
        .iter()
        .map(|e| (e.path_segment.clone(), e.clone()))
        .collect();
    Ok(ResolvedModel {
        entities,
        entity_by_path,
    })
}

fn is_serial(ty: &ColumnTypeConfig) -> bool {
    ty.name().to_lowercase().contains("serial")
}

/// Cast applied to bound parameters so text-encoded values land in the right type.
fn column_pg_cast(ty: &ColumnTypeConfig) -> Option<String> {
    let name = ty.name();
    let lower = name.to_lowercase();
    if lower == "timestamptz" || lower == "timestamp with time zone" {
        Some("timestamptz".into())
    } else if lower == "timestamp" || lower.starts_with("timestamp ") {
        Some("timestamp".into())
    } else if lower == "date" {
        Some("date".into())
    } else if lower.contains("uuid") {
        Some("uuid".into())
    } else if lower == "numeric" || lower == "decimal" {
        Some("numeric".into())
    } else if lower == "jsonb" || lower == "json" {
        Some(lower)
    } else if name.contains('.') {
        // Schema-qualified custom type (e.g. sales.order_status)
        Some(name.to_string())
    } else {
        None
    }
}

fn infer_pk_type(ty: &ColumnTypeConfig) -> PkType {
    let t = ty.name().to_lowercase();
    if t.contains("uuid") {
        PkType::Uuid
    } else if t.contains("bigserial") || t.contains("bigint") {
        PkType::BigInt
    } else if t.contains("serial") || t.contains("int") {
        PkType::Int
    } else {
        PkType::Text
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registered;
    use serde_json::json;

    fn root() -> CompositionRoot {
        let mut root = CompositionRoot::default();
        let entity: EntityMapping = serde_json::from_value(json!({
            "table": "orders",
            "schema": "sales",
            "primary_key": "id",
            "columns": [
                {"name": "id", "type": "bigserial", "nullable": false},
                {"name": "placed_on", "type": "date"},
                {"name": "secret", "type": "text"}
            ]
        }))
        .unwrap();
        root.entities.insert(
            "order".into(),
            Registered { module: "Order".into(), sources: vec![], definition: entity },
        );
        let api: ApiResource = serde_json::from_value(json!({
            "entity": "order",
            "path": "orders",
            "operations": ["list", "read"],
            "sensitive_columns": ["secret"],
            "key_case": "camel"
        }))
        .unwrap();
        root.resources.insert(
            "order_api".into(),
            Registered { module: "Order".into(), sources: vec![], definition: api },
        );
        root
    }

    #[test]
    fn empty_primary_key_is_a_config_error() {
        let mut root = root();
        if let Some(reg) = root.entities.get_mut("order") {
            reg.definition.primary_key = PrimaryKeyConfig::Composite(vec![]);
        }
        let err = resolve(&root, "public").unwrap_err();
        assert!(matches!(err, ConfigError::Validation(ref m) if m.contains("primary key")));
    }

    #[test]
    fn resolves_resource_with_entity_mapping() {
        let model = resolve(&root(), "public").unwrap();
        let e = model.entity_by_path("orders").unwrap();
        assert_eq!(e.resource, "order_api");
        assert_eq!(e.schema_name, "sales");
        assert_eq!(e.pk_type, PkType::BigInt);
        assert!(e.column("id").unwrap().has_default);
        assert_eq!(e.column("placed_on").unwrap().pg_cast.as_deref(), Some("date"));
        assert!(e.column("created_at").is_some());
        assert!(e.column("updated_at").is_some());
        assert!(e.sensitive_columns.contains("secret"));
        assert_eq!(e.key_case, KeyCase::Camel);
        assert!(e.allows(Operation::Read));
        assert!(!e.allows(Operation::Delete));
    }

    #[test]
    fn default_schema_applies_when_mapping_has_none() {
        let mut r = root();
        r.entities.get_mut("order").unwrap().definition.schema = None;
        let model = resolve(&r, "app").unwrap();
        assert_eq!(model.entities[0].schema_name, "app");
    }

    #[test]
    fn empty_root_resolves_to_empty_model() {
        let model = resolve(&CompositionRoot::default(), "public").unwrap();
        assert!(model.entities.is_empty());
    }
}
