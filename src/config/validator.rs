//! Composition validation: cross-references between roles and API consistency.

use crate::config::{IndexColumnEntry, Operation, PrimaryKeyConfig};
use crate::error::ConfigError;
use crate::registry::CompositionRoot;
use regex::Regex;
use std::collections::HashSet;

const MAX_PAGE_LIMIT: u32 = 10_000;

/// Path segment of a resource: its explicit `path`, else its name.
pub fn path_segment<'a>(name: &'a str, path: Option<&'a str>) -> &'a str {
    path.unwrap_or(name)
}

fn valid_segment(s: &str) -> bool {
    let mut chars = s.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_lowercase() || c.is_ascii_digit())
        && chars.all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_' || c == '-')
        && s != "bulk"
}

pub fn validate(root: &CompositionRoot) -> Result<(), ConfigError> {
    for (name, reg) in &root.entities {
        let e = &reg.definition;
        if e.table.trim().is_empty() {
            return Err(ConfigError::Validation(format!("entity {}: table name is empty", name)));
        }
        let mut seen = HashSet::new();
        for c in &e.columns {
            if !seen.insert(c.name.as_str()) {
                return Err(ConfigError::DuplicateColumn {
                    entity: name.clone(),
                    column: c.name.clone(),
                });
            }
        }
        if e.primary_key.columns().iter().all(|c| c.trim().is_empty()) {
            let source = reg.sources.last().map(|p| p.display().to_string()).unwrap_or_default();
            return Err(ConfigError::Validation(format!(
                "entity {} ({}): primary key names no columns",
                name, source
            )));
        }
        for pk in e.primary_key.columns() {
            if !seen.contains(pk) {
                return Err(ConfigError::InvalidPrimaryKey {
                    entity: name.clone(),
                    column: pk.to_string(),
                });
            }
        }
        let index_columns = e.indexes.iter().flat_map(|i| &i.columns).filter_map(|c| match c {
            IndexColumnEntry::Name(n) | IndexColumnEntry::Spec { name: n, .. } => Some(n.as_str()),
            IndexColumnEntry::Expression { .. } => None,
        });
        for col in e.unique.iter().flatten().map(String::as_str).chain(index_columns) {
            if !seen.contains(col) {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: col.to_string(),
                    owner: format!("entity {}", name),
                });
            }
        }
    }

    let mut path_segments = HashSet::new();
    for (name, reg) in &root.resources {
        let r = &reg.definition;
        let owner = format!("resource {}", name);
        let entity = root.entity(&r.entity).ok_or_else(|| ConfigError::MissingReference {
            kind: "entity",
            id: r.entity.clone(),
            owner: owner.clone(),
        })?;

        let segment = path_segment(name, r.path.as_deref());
        if !valid_segment(segment) {
            return Err(ConfigError::Validation(format!(
                "{}: path '{}' must be lowercase letters, digits, '-' or '_' (and not 'bulk')",
                owner, segment
            )));
        }
        if !path_segments.insert(segment) {
            return Err(ConfigError::DuplicatePathSegment(segment.to_string()));
        }

        if r.operations.is_empty() {
            return Err(ConfigError::Validation(format!("{}: no operations enabled", owner)));
        }
        let ops: HashSet<Operation> = r.operations.iter().copied().collect();
        for (bulk, single) in [
            (Operation::BulkCreate, Operation::Create),
            (Operation::BulkUpdate, Operation::Update),
        ] {
            if ops.contains(&bulk) && !ops.contains(&single) {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' requires '{}'",
                    owner, bulk, single
                )));
            }
        }
        if matches!(entity.primary_key, PrimaryKeyConfig::Composite(ref v) if v.len() > 1) {
            let by_id = [Operation::Read, Operation::Update, Operation::Delete, Operation::BulkUpdate];
            if let Some(op) = by_id.iter().find(|op| ops.contains(*op)) {
                return Err(ConfigError::Validation(format!(
                    "{}: '{}' needs a single-column primary key",
                    owner, op
                )));
            }
        }

        for col in r.validation.keys().chain(r.sensitive_columns.iter()) {
            if entity.column(col).is_none() {
                return Err(ConfigError::MissingReference {
                    kind: "column",
                    id: col.clone(),
                    owner: owner.clone(),
                });
            }
        }
        for (col, rule) in &r.validation {
            if let Some(p) = &rule.pattern {
                Regex::new(p).map_err(|e| {
                    ConfigError::Validation(format!("{}: pattern for {}: {}", owner, col, e))
                })?;
            }
        }

        for p in &r.processors {
            match root.service(p) {
                Some(s) if s.enabled => {}
                Some(_) => {
                    return Err(ConfigError::Validation(format!(
                        "{}: processor '{}' is disabled",
                        owner, p
                    )))
                }
                None => {
                    return Err(ConfigError::MissingReference {
                        kind: "service",
                        id: p.clone(),
                        owner: owner.clone(),
                    })
                }
            }
        }

        let pg = &r.pagination;
        if pg.default_limit == 0 || pg.default_limit > pg.max_limit || pg.max_limit > MAX_PAGE_LIMIT {
            return Err(ConfigError::Validation(format!(
                "{}: pagination needs 1 <= default_limit <= max_limit <= {}",
                owner, MAX_PAGE_LIMIT
            )));
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ApiResource, EntityMapping, ServiceDefinition};
    use crate::registry::Registered;
    use serde_json::json;

    fn reg<T>(module: &str, definition: T) -> Registered<T> {
        Registered {
            module: module.into(),
            sources: vec![format!("{}/x.yaml", module).into()],
            definition,
        }
    }

    fn root_with(resource: serde_json::Value) -> CompositionRoot {
        let mut root = CompositionRoot::default();
        let entity: EntityMapping = serde_json::from_value(json!({
            "table": "orders",
            "primary_key": "id",
            "columns": [
                {"name": "id", "type": "uuid", "nullable": false},
                {"name": "reference", "type": "text"}
            ]
        }))
        .unwrap();
        root.entities.insert("order".into(), reg("Order", entity));
        let svc: ServiceDefinition = serde_json::from_value(json!({"kind": "trim_strings"})).unwrap();
        root.services.insert("order.trim".into(), reg("Order", svc));
        let r: ApiResource = serde_json::from_value(resource).unwrap();
        root.resources.insert("orders".into(), reg("Order", r));
        root
    }

    #[test]
    fn valid_root_passes() {
        let root = root_with(json!({
            "entity": "order",
            "operations": ["list", "read", "create", "bulk_create"],
            "processors": ["order.trim"],
            "validation": {"reference": {"required": true, "pattern": "^[A-Z]+$"}}
        }));
        validate(&root).unwrap();
    }

    #[test]
    fn resource_must_reference_an_entity() {
        let root = root_with(json!({"entity": "invoice", "operations": ["list"]}));
        let err = validate(&root).unwrap_err();
        assert!(matches!(err, ConfigError::MissingReference { kind: "entity", .. }));
    }

    #[test]
    fn unknown_processor_is_reported() {
        let root = root_with(json!({"entity": "order", "operations": ["list"], "processors": ["nope"]}));
        assert!(matches!(
            validate(&root).unwrap_err(),
            ConfigError::MissingReference { kind: "service", .. }
        ));
    }

    #[test]
    fn bulk_requires_single_operation() {
        let root = root_with(json!({"entity": "order", "operations": ["list", "bulk_update"]}));
        assert!(validate(&root).unwrap_err().to_string().contains("requires 'update'"));
    }

    #[test]
    fn validation_rules_must_name_columns() {
        let root = root_with(json!({
            "entity": "order",
            "operations": ["list"],
            "validation": {"total": {"minimum": 0}}
        }));
        assert!(matches!(
            validate(&root).unwrap_err(),
            ConfigError::MissingReference { kind: "column", .. }
        ));
    }

    #[test]
    fn path_segments_must_be_url_safe_and_unique() {
        let root = root_with(json!({"entity": "order", "operations": ["list"], "path": "Orders"}));
        assert!(validate(&root).is_err());

        let mut root = root_with(json!({"entity": "order", "operations": ["list"]}));
        let dup: ApiResource =
            serde_json::from_value(json!({"entity": "order", "operations": ["list"], "path": "orders"})).unwrap();
        root.resources.insert("orders_admin".into(), reg("Admin", dup));
        assert!(matches!(validate(&root).unwrap_err(), ConfigError::DuplicatePathSegment(_)));
    }

    #[test]
    fn empty_primary_key_is_rejected() {
        let mut root = root_with(json!({"entity": "order", "operations": ["list"]}));
        let entity: EntityMapping = serde_json::from_value(json!({
            "table": "orders",
            "primary_key": [],
            "columns": [{"name": "id", "type": "uuid", "nullable": false}]
        }))
        .unwrap();
        root.entities.insert("order".into(), reg("Order", entity));
        let err = validate(&root).unwrap_err();
        assert!(err.to_string().contains("primary key names no columns"));
        assert!(err.to_string().contains("Order/x.yaml"));
        assert!(crate::config::resolve(&root, "public").is_err());
    }

    #[test]
    fn bad_pagination_is_rejected() {
        let root = root_with(json!({
            "entity": "order",
            "operations": ["list"],
            "pagination": {"default_limit": 50, "max_limit": 10}
        }));
        assert!(validate(&root).is_err());
    }
}
