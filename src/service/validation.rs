//! Request validation from resource rules.

use crate::config::{ResolvedEntity, ValidationRule};
use crate::error::AppError;
use regex::Regex;
use serde_json::Value;
use std::collections::HashMap;

pub struct RequestValidator;

impl RequestValidator {
    /// Validate a create body: required fields must be present and non-null.
    pub fn validate(body: &HashMap<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        let mut cols: Vec<&String> = rules.keys().collect();
        cols.sort();
        for col in cols {
            let rule = &rules[col];
            let val = body.get(col);
            if rule.required == Some(true) && val.map_or(true, Value::is_null) {
                return Err(AppError::Validation(format!("{} is required", col)));
            }
            if let Some(v) = val {
                validate_field(col, v, rule)?;
            }
        }
        Ok(())
    }

    /// Validate only the fields present in body (for PATCH). A required field may be
    /// omitted but not set to null.
    pub fn validate_partial(body: &HashMap<String, Value>, rules: &HashMap<String, ValidationRule>) -> Result<(), AppError> {
        let mut cols: Vec<&String> = body.keys().collect();
        cols.sort();
        for col in cols {
            let Some(rule) = rules.get(col) else { continue };
            let v = &body[col];
            if rule.required == Some(true) && v.is_null() {
                return Err(AppError::Validation(format!("{} cannot be null", col)));
            }
            validate_field(col, v, rule)?;
        }
        Ok(())
    }

    /// Reject fields that are not columns of the entity, and non-nullable columns set to null.
    pub fn known_columns(body: &HashMap<String, Value>, entity: &ResolvedEntity) -> Result<(), AppError> {
        let mut cols: Vec<&String> = body.keys().collect();
        cols.sort();
        for col in cols {
            match entity.column(col) {
                None => return Err(AppError::Validation(format!("unknown field '{}'", col))),
                // a default only applies when the key is absent
                Some(c) if !c.nullable && body[col].is_null() => {
                    return Err(AppError::Validation(format!("{} cannot be null", col)))
                }
                Some(_) => {}
            }
        }
        Ok(())
    }
}

fn validate_field(col: &str, v: &Value, rule: &ValidationRule) -> Result<(), AppError> {
    if v.is_null() {
        return Ok(());
    }
    if let Some(format) = &rule.format {
        validate_format(col, v, format)?;
    }
    if let Some(s) = v.as_str() {
        let len = s.chars().count();
        if let Some(max) = rule.max_length {
            if len > max as usize {
                return Err(AppError::Validation(format!("{} must be at most {} characters", col, max)));
            }
        }
        if let Some(min) = rule.min_length {
            if len < min as usize {
                return Err(AppError::Validation(format!("{} must be at least {} characters", col, min)));
            }
        }
        if let Some(pattern) = &rule.pattern {
            let re = Regex::new(pattern).map_err(|_| AppError::Validation(format!("invalid pattern for {}", col)))?;
            if !re.is_match(s) {
                return Err(AppError::Validation(format!("{} does not match required pattern", col)));
            }
        }
    }
    if let Some(allowed) = &rule.allowed {
        if !allowed.iter().any(|a| value_eq(v, a)) {
            return Err(AppError::Validation(format!(
                "{} must be one of: {}",
                col,
                allowed.iter().map(Value::to_string).collect::<Vec<_>>().join(", ")
            )));
        }
    }
    if let Some(n) = v.as_f64() {
        if let Some(min) = rule.minimum {
            if n < min {
                return Err(AppError::Validation(format!("{} must be at least {}", col, min)));
            }
        }
        if let Some(max) = rule.maximum {
            if n > max {
                return Err(AppError::Validation(format!("{} must be at most {}", col, max)));
            }
        }
    }
    Ok(())
}

fn value_eq(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(n), Value::Number(m)) => n.as_f64() == m.as_f64(),
        _ => a == b,
    }
}

fn validate_format(col: &str, v: &Value, format: &str) -> Result<(), AppError> {
    let Some(s) = v.as_str() else {
        return Err(AppError::Validation(format!("{} must be a string", col)));
    };
    let ok = match format.to_lowercase().as_str() {
        "email" => s.split_once('@').is_some_and(|(user, host)| !user.is_empty() && host.contains('.')),
        "uuid" => uuid::Uuid::parse_str(s).is_ok(),
        "date" => chrono::NaiveDate::parse_from_str(s, "%Y-%m-%d").is_ok(),
        "date-time" | "datetime" => chrono::DateTime::parse_from_rfc3339(s).is_ok(),
        _ => true,
    };
    if ok {
        Ok(())
    } else {
        Err(AppError::Validation(format!("{} must be a valid {}", col, format)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rules(v: Value) -> HashMap<String, ValidationRule> {
        serde_json::from_value(v).unwrap()
    }

    fn body(v: Value) -> HashMap<String, Value> {
        serde_json::from_value(v).unwrap()
    }

    #[test]
    fn required_fields_must_be_present_on_create() {
        let r = rules(json!({"name": {"required": true}}));
        assert!(RequestValidator::validate(&body(json!({"name": "a"})), &r).is_ok());
        let err = RequestValidator::validate(&body(json!({"name": null})), &r).unwrap_err();
        assert_eq!(err.to_string(), "validation: name is required");
        assert!(RequestValidator::validate(&body(json!({})), &r).is_err());
    }

    #[test]
    fn partial_validation_skips_missing_fields() {
        let r = rules(json!({"name": {"required": true, "max_length": 3}}));
        assert!(RequestValidator::validate_partial(&body(json!({"priority": 1})), &r).is_ok());
        assert!(RequestValidator::validate_partial(&body(json!({"name": "abcd"})), &r).is_err());
        assert!(RequestValidator::validate_partial(&body(json!({"name": null})), &r).is_err());
    }

    #[test]
    fn ranges_patterns_and_allowed_values() {
        let r = rules(json!({
            "priority": {"minimum": 1, "maximum": 5},
            "code": {"pattern": "^[A-Z]{2}$"},
            "status": {"allowed": ["open", "closed"]}
        }));
        assert!(RequestValidator::validate(&body(json!({"priority": 3, "code": "AB", "status": "open"})), &r).is_ok());
        assert!(RequestValidator::validate(&body(json!({"priority": 9})), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({"code": "abc"})), &r).is_err());
        let err = RequestValidator::validate(&body(json!({"status": "gone"})), &r).unwrap_err();
        assert!(err.to_string().contains("\"open\", \"closed\""));
    }

    #[test]
    fn formats() {
        let r = rules(json!({"email": {"format": "email"}, "id": {"format": "uuid"}}));
        assert!(RequestValidator::validate(&body(json!({"email": "a@b.io"})), &r).is_ok());
        assert!(RequestValidator::validate(&body(json!({"email": "nope"})), &r).is_err());
        assert!(RequestValidator::validate(&body(json!({"id": "not-a-uuid"})), &r).is_err());
    }

    fn order_entity() -> ResolvedEntity {
        use crate::config::{resolve, ApiResource, EntityMapping};
        use crate::registry::{CompositionRoot, Registered};

        let mut root = CompositionRoot::default();
        let entity: EntityMapping = serde_json::from_value(json!({
            "table": "orders",
            "primary_key": "id",
            "columns": [
                {"name": "id", "type": "bigserial", "nullable": false},
                {"name": "priority", "type": "integer", "nullable": false, "default": 3},
                {"name": "note", "type": "text"}
            ]
        }))
        .unwrap();
        let api: ApiResource = serde_json::from_value(json!({"entity": "order", "operations": ["create"]})).unwrap();
        root.entities.insert("order".into(), Registered { module: "Order".into(), sources: vec![], definition: entity });
        root.resources.insert("orders".into(), Registered { module: "Order".into(), sources: vec![], definition: api });
        resolve(&root, "public").unwrap().entity_by_path("orders").unwrap().clone()
    }

    #[test]
    fn explicit_null_on_a_defaulted_not_null_column_is_rejected() {
        let e = order_entity();
        assert!(RequestValidator::known_columns(&body(json!({"note": null})), &e).is_ok());
        assert!(RequestValidator::known_columns(&body(json!({})), &e).is_ok());
        let err = RequestValidator::known_columns(&body(json!({"priority": null})), &e).unwrap_err();
        assert_eq!(err.to_string(), "validation: priority cannot be null");
        assert!(RequestValidator::known_columns(&body(json!({"colour": 1})), &e).is_err());
    }
}
