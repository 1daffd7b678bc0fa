//! Builds parameterized INSERT, SELECT, UPDATE, DELETE from a resolved entity.

use crate::config::{ColumnInfo, ResolvedEntity};
use serde_json::Value;
use std::collections::{HashMap, HashSet};

/// Quote identifier for PostgreSQL (safe: only from config).
pub fn quoted(s: &str) -> String {
    format!("\"{}\"", s.replace('"', "\"\""))
}

/// Full qualified table name.
pub fn qualified_table(schema: &str, table: &str) -> String {
    format!("{}.{}", quoted(schema), quoted(table))
}

#[derive(Clone, Debug, PartialEq)]
pub struct QueryBuf {
    pub sql: String,
    pub params: Vec<Value>,
}

impl QueryBuf {
    fn new() -> Self {
        QueryBuf {
            sql: String::new(),
            params: Vec::new(),
        }
    }

    /// Push a value and return its placeholder, cast when the column needs one.
    fn placeholder(&mut self, v: Value, column: Option<&ColumnInfo>) -> String {
        self.params.push(v);
        let n = self.params.len();
        match column.and_then(|c| c.pg_cast.as_deref()) {
            Some(t) => format!("${}::{}", n, t),
            None => format!("${}", n),
        }
    }
}

fn table_of(entity: &ResolvedEntity) -> String {
    qualified_table(&entity.schema_name, &entity.table_name)
}

/// SELECT list: custom enum (schema.typename) and numeric columns come back as text.
fn select_column_list(entity: &ResolvedEntity) -> String {
    entity
        .columns
        .iter()
        .map(|c| {
            let q = quoted(&c.name);
            let cast = c.pg_cast.as_deref().unwrap_or("");
            if cast.contains('.') || cast == "numeric" {
                format!("{}::text AS {}", q, q)
            } else {
                q
            }
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// SELECT by primary key (single column PK only). Binds id as $1.
pub fn select_by_id(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = entity.primary_key();
    let ph = q.placeholder(id.clone(), entity.column(pk));
    q.sql = format!(
        "SELECT {} FROM {} WHERE {} = {}",
        select_column_list(entity),
        table_of(entity),
        quoted(pk),
        ph
    );
    q
}

/// SELECT list with exact-match filters on known columns, ordered by primary key.
pub fn select_list(entity: &ResolvedEntity, filters: &[(String, Value)], limit: u32, offset: u32) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, entity, filters);
    let order: Vec<String> = entity.pk_columns.iter().map(|c| quoted(c)).collect();
    q.sql = format!(
        "SELECT {} FROM {}{} ORDER BY {} LIMIT {} OFFSET {}",
        select_column_list(entity),
        table_of(entity),
        where_clause,
        order.join(", "),
        limit,
        offset
    );
    q
}

/// COUNT(*) with the same filters as [`select_list`].
pub fn count(entity: &ResolvedEntity, filters: &[(String, Value)]) -> QueryBuf {
    let mut q = QueryBuf::new();
    let where_clause = where_clause(&mut q, entity, filters);
    q.sql = format!("SELECT COUNT(*) FROM {}{}", table_of(entity), where_clause);
    q
}

fn where_clause(q: &mut QueryBuf, entity: &ResolvedEntity, filters: &[(String, Value)]) -> String {
    let mut parts = Vec::new();
    for (col, val) in filters {
        let Some(c) = entity.column(col) else { continue };
        if val.is_null() {
            parts.push(format!("{} IS NULL", quoted(col)));
            continue;
        }
        let ph = q.placeholder(val.clone(), Some(c));
        parts.push(format!("{} = {}", quoted(col), ph));
    }
    if parts.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", parts.join(" AND "))
    }
}

/// INSERT: columns from entity, values from body. Columns with a DB default are omitted
/// when the body does not provide them, so the database fills them in.
pub fn insert(entity: &ResolvedEntity, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let mut cols = Vec::new();
    let mut placeholders = Vec::new();
    for c in &entity.columns {
        let val = match body.get(&c.name) {
            Some(v) => v.clone(),
            None if c.has_default => continue,
            None => Value::Null,
        };
        placeholders.push(q.placeholder(val, Some(c)));
        cols.push(quoted(&c.name));
    }
    q.sql = if cols.is_empty() {
        format!(
            "INSERT INTO {} DEFAULT VALUES RETURNING {}",
            table_of(entity),
            select_column_list(entity)
        )
    } else {
        format!(
            "INSERT INTO {} ({}) VALUES ({}) RETURNING {}",
            table_of(entity),
            cols.join(", "),
            placeholders.join(", "),
            select_column_list(entity)
        )
    };
    q
}

/// UPDATE by id: SET only known, non-key columns present in body; always bumps `updated_at`.
pub fn update(entity: &ResolvedEntity, id: &Value, body: &HashMap<String, Value>) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = entity.primary_key();
    let pk_set: HashSet<&str> = entity.pk_columns.iter().map(String::as_str).collect();

    // Sorted so the statement text is stable for a given body.
    let mut keys: Vec<&String> = body.keys().collect();
    keys.sort();

    let mut sets = Vec::new();
    for k in keys {
        if pk_set.contains(k.as_str()) || k == "created_at" || k == "updated_at" {
            continue;
        }
        let Some(c) = entity.column(k) else { continue };
        let ph = q.placeholder(body[k].clone(), Some(c));
        sets.push(format!("{} = {}", quoted(k), ph));
    }
    if entity.column("updated_at").is_some() {
        sets.push(format!("{} = NOW()", quoted("updated_at")));
    }
    let id_ph = q.placeholder(id.clone(), entity.column(pk));
    q.sql = format!(
        "UPDATE {} SET {} WHERE {} = {} RETURNING {}",
        table_of(entity),
        sets.join(", "),
        quoted(pk),
        id_ph,
        select_column_list(entity)
    );
    q
}

/// DELETE by id, returning the removed row.
pub fn delete(entity: &ResolvedEntity, id: &Value) -> QueryBuf {
    let mut q = QueryBuf::new();
    let pk = entity.primary_key();
    let ph = q.placeholder(id.clone(), entity.column(pk));
    q.sql = format!(
        "DELETE FROM {} WHERE {} = {} RETURNING {}",
        table_of(entity),
        quoted(pk),
        ph,
        select_column_list(entity)
    );
    q
}
