//! Resource CRUD handlers: list, create, read, update, delete, bulk.

use crate::case;
use crate::config::{Operation, PkType, ResolvedEntity};
use crate::error::AppError;
use crate::response::{success_many, success_many_created, success_one, success_one_ok, success_page};
use crate::service::{CrudService, ProcessContext, RequestValidator};
use crate::state::AppState;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde_json::Value;
use std::collections::HashMap;

/// Look up the resource behind a path segment and check the operation is enabled for it.
fn resource<'a>(state: &'a AppState, path_segment: &str, op: Operation) -> Result<&'a ResolvedEntity, AppError> {
    let entity = state
        .model
        .entity_by_path(path_segment)
        .ok_or_else(|| AppError::NotFound(format!("resource '{}'", path_segment)))?;
    if !entity.allows(op) {
        return Err(AppError::OperationNotAllowed(format!("{} on {}", op, path_segment)));
    }
    Ok(entity)
}

fn parse_id(id_str: &str, pk_type: &PkType) -> Result<Value, AppError> {
    Ok(match pk_type {
        PkType::Uuid => {
            let u = uuid::Uuid::parse_str(id_str).map_err(|_| AppError::BadRequest("invalid uuid".into()))?;
            Value::String(u.to_string())
        }
        PkType::BigInt | PkType::Int => {
            let n: i64 = id_str.parse().map_err(|_| AppError::BadRequest("invalid id".into()))?;
            Value::Number(n.into())
        }
        PkType::Text => Value::String(id_str.to_string()),
    })
}

fn body_to_map(entity: &ResolvedEntity, value: Value) -> Result<HashMap<String, Value>, AppError> {
    match value {
        Value::Object(m) => Ok(case::body_keys_in(entity.key_case, m.into_iter().collect())),
        _ => Err(AppError::BadRequest("body must be a JSON object".into())),
    }
}

fn body_to_items(entity: &ResolvedEntity, value: Value) -> Result<Vec<HashMap<String, Value>>, AppError> {
    match value {
        Value::Array(arr) => arr.into_iter().map(|v| body_to_map(entity, v)).collect(),
        _ => Err(AppError::BadRequest("body must be a JSON array".into())),
    }
}

/// Typed value for a query-string filter on `col`.
fn query_value_for_column(entity: &ResolvedEntity, col: &str, s: &str) -> Value {
    let Some(c) = entity.column(col) else {
        return Value::String(s.to_string());
    };
    if c.is_integer() {
        if let Ok(n) = s.parse::<i64>() {
            return Value::Number(n.into());
        }
    }
    if c.is_bool() {
        if s.eq_ignore_ascii_case("true") {
            return Value::Bool(true);
        }
        if s.eq_ignore_ascii_case("false") {
            return Value::Bool(false);
        }
    }
    if s == "null" && c.nullable {
        return Value::Null;
    }
    Value::String(s.to_string())
}

/// Response shape of a row: sensitive columns removed, keys in the resource's case.
fn present(entity: &ResolvedEntity, row: Value) -> Value {
    match row {
        Value::Object(mut map) => {
            map.retain(|k, _| !entity.sensitive_columns.contains(k));
            Value::Object(case::row_keys_out(entity.key_case, map))
        }
        other => other,
    }
}

fn present_all(entity: &ResolvedEntity, rows: Vec<Value>) -> Vec<Value> {
    rows.into_iter().map(|r| present(entity, r)).collect()
}

/// Processors, then column and rule checks. Runs before any database access.
async fn prepare(
    state: &AppState,
    entity: &ResolvedEntity,
    op: Operation,
    body: &mut HashMap<String, Value>,
) -> Result<(), AppError> {
    let ctx = ProcessContext {
        resource: &entity.resource,
        operation: op,
    };
    state.services.run(&entity.processors, &ctx, body).await?;
    RequestValidator::known_columns(body, entity)?;
    match op {
        Operation::Create | Operation::BulkCreate => RequestValidator::validate(body, &entity.validation),
        _ => RequestValidator::validate_partial(body, &entity.validation),
    }
}

pub async fn list(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Query(params): Query<HashMap<String, String>>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::List)?;

    let mut limit: Option<u32> = None;
    let mut offset: Option<u32> = None;
    let mut filters: Vec<(String, Value)> = Vec::new();

    let mut params: Vec<(String, String)> = params.into_iter().collect();
    params.sort();
    for (k, v) in params {
        match k.as_str() {
            "limit" => {
                limit = Some(v.parse().map_err(|_| AppError::BadRequest("limit must be a positive integer".into()))?);
            }
            "offset" => {
                offset = Some(v.parse().map_err(|_| AppError::BadRequest("offset must be a positive integer".into()))?);
            }
            _ => {
                let col = case::key_in(entity.key_case, &k);
                if entity.column(&col).is_some() && !entity.sensitive_columns.contains(&col) {
                    let val = query_value_for_column(entity, &col, &v);
                    filters.push((col, val));
                }
            }
        }
    }

    let page = CrudService::list(&state.pool, entity, &filters, limit, offset).await?;
    Ok(success_page(present_all(entity, page.rows), page.total, page.limit, page.offset))
}

pub async fn create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::Create)?;
    let mut body = body_to_map(entity, body)?;
    prepare(&state, entity, Operation::Create, &mut body).await?;
    let row = CrudService::create(&state.pool, entity, &body).await?;
    Ok(success_one(present(entity, row)))
}

pub async fn read(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::Read)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    let row = CrudService::read(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(present(entity, row)))
}

pub async fn update(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::Update)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    let mut body = body_to_map(entity, body)?;
    prepare(&state, entity, Operation::Update, &mut body).await?;
    let row = CrudService::update(&state.pool, entity, &id, &body)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(success_one_ok(present(entity, row)))
}

pub async fn delete(
    State(state): State<AppState>,
    Path((path_segment, id_str)): Path<(String, String)>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::Delete)?;
    let id = parse_id(&id_str, &entity.pk_type)?;
    CrudService::delete(&state.pool, entity, &id)
        .await?
        .ok_or_else(|| AppError::NotFound(id_str))?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn bulk_create(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::BulkCreate)?;
    let mut items = body_to_items(entity, body)?;
    for item in &mut items {
        prepare(&state, entity, Operation::BulkCreate, item).await?;
    }
    let rows = CrudService::bulk_create(&state.pool, entity, &items).await?;
    Ok(success_many_created(present_all(entity, rows)))
}

pub async fn bulk_update(
    State(state): State<AppState>,
    Path(path_segment): Path<String>,
    Json(body): Json<Value>,
) -> Result<impl IntoResponse, AppError> {
    let entity = resource(&state, &path_segment, Operation::BulkUpdate)?;
    let mut items = body_to_items(entity, body)?;
    for item in &mut items {
        prepare(&state, entity, Operation::BulkUpdate, item).await?;
    }
    let rows = CrudService::bulk_update(&state.pool, entity, &items).await?;
    Ok(success_many(present_all(entity, rows)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn ids_are_parsed_by_key_type() {
        assert_eq!(parse_id("42", &PkType::BigInt).unwrap(), json!(42));
        assert!(parse_id("x", &PkType::Int).is_err());
        assert!(parse_id("not-a-uuid", &PkType::Uuid).is_err());
        assert_eq!(parse_id("abc", &PkType::Text).unwrap(), json!("abc"));
    }
}
