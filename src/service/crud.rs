//! Generic CRUD execution against PostgreSQL.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::service::repository::EntityRepository;
use crate::service::unit_of_work::UnitOfWork;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

/// Maximum items accepted by one bulk request.
pub const BULK_LIMIT: usize = 100;

/// One page of a list query.
#[derive(Debug)]
pub struct Page {
    pub rows: Vec<Value>,
    pub total: i64,
    pub limit: u32,
    pub offset: u32,
}

pub struct CrudService;

impl CrudService {
    /// List rows with exact-match filters. `limit` defaults to and is capped by the
    /// resource's pagination settings.
    pub async fn list(
        pool: &PgPool,
        entity: &ResolvedEntity,
        filters: &[(String, Value)],
        limit: Option<u32>,
        offset: Option<u32>,
    ) -> Result<Page, AppError> {
        let limit = limit
            .unwrap_or(entity.pagination.default_limit)
            .clamp(1, entity.pagination.max_limit);
        let offset = offset.unwrap_or(0);
        let repo = EntityRepository::new(pool, entity);
        let rows = repo.find_by(filters, limit, offset).await?;
        let total = repo.count(filters).await?;
        Ok(Page {
            rows,
            total,
            limit,
            offset,
        })
    }

    pub async fn read(pool: &PgPool, entity: &ResolvedEntity, id: &Value) -> Result<Option<Value>, AppError> {
        EntityRepository::new(pool, entity).find(id).await
    }

    /// Insert one row; body may include or omit PK (if has default). Returns created row.
    pub async fn create(pool: &PgPool, entity: &ResolvedEntity, body: &HashMap<String, Value>) -> Result<Value, AppError> {
        let mut rows = Self::bulk_create(pool, entity, std::slice::from_ref(body)).await?;
        rows.pop().ok_or(AppError::Db(sqlx::Error::RowNotFound))
    }

    pub async fn update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        id: &Value,
        body: &HashMap<String, Value>,
    ) -> Result<Option<Value>, AppError> {
        let mut uow = UnitOfWork::new(pool.clone());
        EntityRepository::new(pool, entity).persist_changes(&mut uow, id, body);
        Ok(uow.flush().await?.pop().flatten())
    }

    /// Delete one row by id. Returns deleted row or None.
    pub async fn delete(pool: &PgPool, entity: &ResolvedEntity, id: &Value) -> Result<Option<Value>, AppError> {
        let mut uow = UnitOfWork::new(pool.clone());
        EntityRepository::new(pool, entity).persist_removal(&mut uow, id);
        Ok(uow.flush().await?.pop().flatten())
    }

    /// Bulk create in one transaction. Returns created rows in input order.
    pub async fn bulk_create(
        pool: &PgPool,
        entity: &ResolvedEntity,
        items: &[HashMap<String, Value>],
    ) -> Result<Vec<Value>, AppError> {
        check_bulk_size(items, "create")?;
        let repo = EntityRepository::new(pool, entity);
        let mut uow = UnitOfWork::new(pool.clone());
        for body in items {
            repo.persist_new(&mut uow, body);
        }
        Ok(uow.flush().await?.into_iter().flatten().collect())
    }

    /// Bulk update in one transaction. Each item must carry the primary key; items whose
    /// row does not exist are skipped.
    pub async fn bulk_update(
        pool: &PgPool,
        entity: &ResolvedEntity,
        items: &[HashMap<String, Value>],
    ) -> Result<Vec<Value>, AppError> {
        check_bulk_size(items, "update")?;
        let pk = entity.primary_key();
        let repo = EntityRepository::new(pool, entity);
        let mut uow = UnitOfWork::new(pool.clone());
        for body in items {
            let id = body
                .get(pk)
                .filter(|v| !v.is_null())
                .ok_or_else(|| AppError::Validation(format!("each item must have '{}'", pk)))?;
            repo.persist_changes(&mut uow, id, body);
        }
        Ok(uow.flush().await?.into_iter().flatten().collect())
    }
}

fn check_bulk_size(items: &[HashMap<String, Value>], what: &str) -> Result<(), AppError> {
    if items.is_empty() {
        return Err(AppError::BadRequest(format!("bulk {} needs at least one item", what)));
    }
    if items.len() > BULK_LIMIT {
        return Err(AppError::BadRequest(format!("bulk {} limited to {} items", what, BULK_LIMIT)));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn bulk_size_is_bounded() {
        assert!(check_bulk_size(&[], "create").is_err());
        let items = vec![HashMap::from([("a".to_string(), json!(1))]); BULK_LIMIT + 1];
        let err = check_bulk_size(&items, "update").unwrap_err();
        assert!(err.to_string().contains("limited to 100"));
        assert!(check_bulk_size(&items[..BULK_LIMIT], "update").is_ok());
    }
}
