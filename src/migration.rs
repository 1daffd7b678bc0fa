//! Schema sync: idempotent DDL for every entity mapping in the composition root.
//! Creates schemas, tables (with implicit timestamps, unique and check constraints) and indexes.
//! Existing tables are left alone; there is no migration history.

use crate::config::types::*;
use crate::config::TIMESTAMP_COLUMNS;
use crate::error::AppError;
use crate::registry::CompositionRoot;
use crate::sql::{qualified_table, quoted};
use sqlx::PgPool;
use std::collections::BTreeSet;

fn literal(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

/// DDL for the whole composition root, in execution order.
pub fn ddl_statements(root: &CompositionRoot, default_schema: &str) -> Vec<String> {
    let mut out = Vec::new();

    let schemas: BTreeSet<&str> = root
        .entities
        .values()
        .map(|r| r.definition.schema.as_deref().unwrap_or(default_schema))
        .collect();
    for s in schemas {
        out.push(format!("CREATE SCHEMA IF NOT EXISTS {}", quoted(s)));
    }

    for reg in root.entities.values() {
        let e = &reg.definition;
        let schema = e.schema.as_deref().unwrap_or(default_schema);
        out.extend(table_ddl(e, schema));
    }
    out
}

fn table_ddl(e: &EntityMapping, schema: &str) -> Vec<String> {
    let table = qualified_table(schema, &e.table);
    let mut defs: Vec<String> = e.columns.iter().map(column_def).collect();

    for ts in TIMESTAMP_COLUMNS {
        if e.column(ts).is_none() {
            defs.push(format!("{} TIMESTAMPTZ NOT NULL DEFAULT NOW()", quoted(ts)));
        }
    }

    let pk: Vec<String> = e.primary_key.columns().into_iter().map(quoted).collect();
    defs.push(format!("PRIMARY KEY ({})", pk.join(", ")));
    for u in &e.unique {
        let cols: Vec<String> = u.iter().map(|s| quoted(s)).collect();
        defs.push(format!("UNIQUE ({})", cols.join(", ")));
    }
    for ch in &e.check {
        defs.push(format!("CONSTRAINT {} CHECK ({})", quoted(&ch.name), ch.expression));
    }

    let mut out = vec![format!(
        "CREATE TABLE IF NOT EXISTS {} (\n  {}\n)",
        table,
        defs.join(",\n  ")
    )];

    for idx in &e.indexes {
        out.push(index_ddl(idx, &table));
    }

    if let Some(c) = &e.comment {
        out.push(format!("COMMENT ON TABLE {} IS {}", table, literal(c)));
    }
    for c in &e.columns {
        if let Some(comment) = &c.comment {
            out.push(format!(
                "COMMENT ON COLUMN {}.{} IS {}",
                table,
                quoted(&c.name),
                literal(comment)
            ));
        }
    }
    out
}

fn column_def(c: &ColumnConfig) -> String {
    let mut def = format!("{} {}", quoted(&c.name), c.type_.sql());
    if !c.nullable {
        def.push_str(" NOT NULL");
    }
    if let Some(d) = &c.default {
        def.push_str(" DEFAULT ");
        def.push_str(&d.sql());
    }
    def
}

fn index_ddl(idx: &IndexConfig, table: &str) -> String {
    let cols: Vec<String> = idx
        .columns
        .iter()
        .map(|col| match col {
            IndexColumnEntry::Name(n) => quoted(n),
            IndexColumnEntry::Spec { name, direction } => match direction {
                Some(d) => format!("{} {}", quoted(name), d.to_uppercase()),
                None => quoted(name),
            },
            IndexColumnEntry::Expression { expression } => format!("({})", expression),
        })
        .collect();
    let where_clause = idx.where_.as_ref().map(|w| format!(" WHERE {}", w)).unwrap_or_default();
    format!(
        "CREATE {}INDEX IF NOT EXISTS {} ON {} USING {} ({}){}",
        if idx.unique { "UNIQUE " } else { "" },
        quoted(&idx.name),
        table,
        idx.method.as_deref().unwrap_or("btree"),
        cols.join(", "),
        where_clause
    )
}

/// Run [`ddl_statements`] in one transaction.
pub async fn sync_schema(pool: &PgPool, root: &CompositionRoot, default_schema: &str) -> Result<(), AppError> {
    let statements = ddl_statements(root, default_schema);
    let mut tx = pool.begin().await?;
    for sql in &statements {
        tracing::debug!(sql = %sql, "schema sync");
        sqlx::query(sql).execute(&mut *tx).await?;
    }
    tx.commit().await?;
    tracing::info!(entities = root.entities.len(), statements = statements.len(), "schema synced");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Registered;
    use serde_json::json;

    fn root() -> CompositionRoot {
        let mut root = CompositionRoot::default();
        let mapping: EntityMapping = serde_json::from_value(json!({
            "table": "example",
            "primary_key": "id",
            "comment": "Example's rows",
            "columns": [
                {"name": "id", "type": "uuid", "nullable": false, "default": {"expression": "gen_random_uuid()"}},
                {"name": "name", "type": {"name": "varchar", "params": [120]}, "nullable": false},
                {"name": "priority", "type": "integer", "nullable": false, "default": 0}
            ],
            "unique": [["name"]],
            "check": [{"name": "priority_range", "expression": "priority BETWEEN 0 AND 5"}],
            "indexes": [{"name": "example_priority_idx", "columns": [{"name": "priority", "direction": "desc"}]}]
        }))
        .unwrap();
        root.entities.insert(
            "example".into(),
            Registered { module: "Example".into(), sources: vec![], definition: mapping },
        );
        root
    }

    #[test]
    fn emits_schema_table_and_index_statements() {
        let ddl = ddl_statements(&root(), "app");
        assert_eq!(ddl[0], r#"CREATE SCHEMA IF NOT EXISTS "app""#);
        let table = &ddl[1];
        assert!(table.starts_with(r#"CREATE TABLE IF NOT EXISTS "app"."example" ("#));
        assert!(table.contains(r#""id" uuid NOT NULL DEFAULT gen_random_uuid()"#));
        assert!(table.contains(r#""name" varchar(120) NOT NULL"#));
        assert!(table.contains(r#""priority" integer NOT NULL DEFAULT 0"#));
        assert!(table.contains(r#""created_at" TIMESTAMPTZ NOT NULL DEFAULT NOW()"#));
        assert!(table.contains(r#"PRIMARY KEY ("id")"#));
        assert!(table.contains(r#"UNIQUE ("name")"#));
        assert!(table.contains(r#"CONSTRAINT "priority_range" CHECK (priority BETWEEN 0 AND 5)"#));
        assert_eq!(
            ddl[2],
            r#"CREATE INDEX IF NOT EXISTS "example_priority_idx" ON "app"."example" USING btree ("priority" DESC)"#
        );
        assert_eq!(ddl[3], r#"COMMENT ON TABLE "app"."example" IS 'Example''s rows'"#);
    }

    #[test]
    fn empty_root_has_no_ddl() {
        assert!(ddl_statements(&CompositionRoot::default(), "public").is_empty());
    }
}
