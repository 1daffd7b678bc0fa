//! Execute built statements and turn rows into JSON.

use crate::error::AppError;
use crate::sql::{PgBindValue, QueryBuf};
use serde_json::Value;
use sqlx::postgres::{PgArguments, PgRow};
use sqlx::query::Query;
use sqlx::{Column, PgConnection, PgPool, Postgres, Row, TypeInfo};

fn bind(q: &QueryBuf) -> Query<'_, Postgres, PgArguments> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "query");
    q.params
        .iter()
        .fold(sqlx::query(&q.sql), |query, p| query.bind(PgBindValue::from(p)))
}

pub async fn fetch_optional(pool: &PgPool, q: &QueryBuf) -> Result<Option<Value>, AppError> {
    let row = bind(q).fetch_optional(pool).await?;
    Ok(row.as_ref().map(row_to_json))
}

pub async fn fetch_all(pool: &PgPool, q: &QueryBuf) -> Result<Vec<Value>, AppError> {
    let rows = bind(q).fetch_all(pool).await?;
    Ok(rows.iter().map(row_to_json).collect())
}

pub async fn fetch_optional_in(conn: &mut PgConnection, q: &QueryBuf) -> Result<Option<Value>, AppError> {
    let row = bind(q).fetch_optional(&mut *conn).await?;
    Ok(row.as_ref().map(row_to_json))
}

pub async fn fetch_count(pool: &PgPool, q: &QueryBuf) -> Result<i64, AppError> {
    tracing::debug!(sql = %q.sql, params = ?q.params, "count");
    let query = q
        .params
        .iter()
        .fold(sqlx::query_scalar::<Postgres, i64>(&q.sql), |query, p| query.bind(PgBindValue::from(p)));
    Ok(query.fetch_one(pool).await?)
}

pub fn row_to_json(row: &PgRow) -> Value {
    let mut map = serde_json::Map::new();
    for (i, col) in row.columns().iter().enumerate() {
        map.insert(col.name().to_string(), cell_to_value(row, i, col.type_info().name()));
    }
    Value::Object(map)
}

/// Decode one cell by its Postgres type; anything unrecognised is tried as text.
fn cell_to_value(row: &PgRow, i: usize, type_name: &str) -> Value {
    fn get<'r, T>(row: &'r PgRow, i: usize) -> Option<T>
    where
        T: sqlx::Decode<'r, Postgres> + sqlx::Type<Postgres>,
    {
        row.try_get::<Option<T>, _>(i).ok().flatten()
    }

    let v = match type_name {
        "INT2" => get::<i16>(row, i).map(Value::from),
        "INT4" => get::<i32>(row, i).map(Value::from),
        "INT8" => get::<i64>(row, i).map(Value::from),
        "FLOAT4" => get::<f32>(row, i).and_then(|n| serde_json::Number::from_f64(n as f64)).map(Value::Number),
        "FLOAT8" => get::<f64>(row, i).and_then(serde_json::Number::from_f64).map(Value::Number),
        "BOOL" => get::<bool>(row, i).map(Value::Bool),
        "UUID" => get::<uuid::Uuid>(row, i).map(|u| Value::String(u.to_string())),
        "TIMESTAMPTZ" => get::<chrono::DateTime<chrono::Utc>>(row, i).map(|d| Value::String(d.to_rfc3339())),
        "TIMESTAMP" => get::<chrono::NaiveDateTime>(row, i)
            .map(|d| Value::String(d.format("%Y-%m-%dT%H:%M:%S%.f").to_string())),
        "DATE" => get::<chrono::NaiveDate>(row, i).map(|d| Value::String(d.format("%Y-%m-%d").to_string())),
        "JSON" | "JSONB" => get::<Value>(row, i),
        _ => get::<String>(row, i).map(Value::String),
    };
    v.unwrap_or(Value::Null)
}
