//! Per-entity data access: reads go straight to the pool, writes are queued on a unit of work.

use crate::config::ResolvedEntity;
use crate::error::AppError;
use crate::service::query::{fetch_all, fetch_count, fetch_optional};
use crate::service::unit_of_work::UnitOfWork;
use crate::sql;
use serde_json::Value;
use sqlx::PgPool;
use std::collections::HashMap;

pub struct EntityRepository<'a> {
    pool: &'a PgPool,
    entity: &'a ResolvedEntity,
}

impl<'a> EntityRepository<'a> {
    pub fn new(pool: &'a PgPool, entity: &'a ResolvedEntity) -> Self {
        EntityRepository { pool, entity }
    }

    pub fn entity(&self) -> &ResolvedEntity {
        self.entity
    }

    pub async fn find(&self, id: &Value) -> Result<Option<Value>, AppError> {
        fetch_optional(self.pool, &sql::select_by_id(self.entity, id)).await
    }

    pub async fn find_by(&self, filters: &[(String, Value)], limit: u32, offset: u32) -> Result<Vec<Value>, AppError> {
        fetch_all(self.pool, &sql::select_list(self.entity, filters, limit, offset)).await
    }

    pub async fn count(&self, filters: &[(String, Value)]) -> Result<i64, AppError> {
        fetch_count(self.pool, &sql::count(self.entity, filters)).await
    }

    pub fn persist_new(&self, uow: &mut UnitOfWork, body: &HashMap<String, Value>) {
        uow.persist(sql::insert(self.entity, body));
    }

    pub fn persist_changes(&self, uow: &mut UnitOfWork, id: &Value, body: &HashMap<String, Value>) {
        uow.persist(sql::update(self.entity, id, body));
    }

    pub fn persist_removal(&self, uow: &mut UnitOfWork, id: &Value) {
        uow.persist(sql::delete(self.entity, id));
    }
}
