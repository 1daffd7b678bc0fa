//! Explicit persist/flush: queued statements run together in one transaction.

use crate::error::AppError;
use crate::service::query::fetch_optional_in;
use crate::sql::QueryBuf;
use serde_json::Value;
use sqlx::PgPool;

pub struct UnitOfWork {
    pool: PgPool,
    pending: Vec<QueryBuf>,
}

impl UnitOfWork {
    pub fn new(pool: PgPool) -> Self {
        UnitOfWork {
            pool,
            pending: Vec::new(),
        }
    }

    /// Queue a statement. Nothing touches the database until [`flush`](Self::flush).
    pub fn persist(&mut self, q: QueryBuf) -> &mut Self {
        self.pending.push(q);
        self
    }

    pub fn pending(&self) -> &[QueryBuf] {
        &self.pending
    }

    /// Drop every queued statement.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Execute the queue in order inside one transaction and commit. Returns the row each
    /// statement returned (None when it matched nothing). The queue is emptied either way;
    /// on error the transaction is rolled back.
    pub async fn flush(&mut self) -> Result<Vec<Option<Value>>, AppError> {
        let queue = std::mem::take(&mut self.pending);
        if queue.is_empty() {
            return Ok(Vec::new());
        }
        let mut tx = self.pool.begin().await?;
        let mut out = Vec::with_capacity(queue.len());
        for q in &queue {
            out.push(fetch_optional_in(&mut tx, q).await?);
        }
        tx.commit().await?;
        tracing::debug!(statements = queue.len(), "unit of work flushed");
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sqlx::postgres::PgPoolOptions;

    fn lazy_pool() -> PgPool {
        PgPoolOptions::new()
            .connect_lazy("postgres://localhost/unused")
            .unwrap()
    }

    fn stmt(sql: &str) -> QueryBuf {
        QueryBuf {
            sql: sql.into(),
            params: vec![],
        }
    }

    #[tokio::test]
    async fn persist_queues_and_clear_discards() {
        let mut uow = UnitOfWork::new(lazy_pool());
        uow.persist(stmt("SELECT 1")).persist(stmt("SELECT 2"));
        assert_eq!(uow.pending().len(), 2);
        assert_eq!(uow.pending()[1].sql, "SELECT 2");
        uow.clear();
        assert!(uow.pending().is_empty());
    }

    #[tokio::test]
    async fn flushing_nothing_never_opens_a_transaction() {
        let mut uow = UnitOfWork::new(lazy_pool());
        assert!(uow.flush().await.unwrap().is_empty());
    }
}
