use async_trait::async_trait;
use sqlx::{PgPool, Postgres, Transaction};

use super::map_sqlx_err;
use crate::application::ports::{TxContext, TxManager};
use crate::error::AppResult;

/// Holds the live `sqlx` transaction. `PgPool::begin` hands back a
/// `'static`-bound handle because the pool's inner connection management
/// is reference-counted, so this needs no lifetime parameter of its own.
pub struct PgTxContext {
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgTxContext {
    /// Recovers the live transaction from the trait object a repository
    /// method was handed. Panics if called with a context from a
    /// different adapter — a caller wiring the wrong adapter together is
    /// a programming error, not a recoverable one.
    pub fn from_ctx<'a>(ctx: &'a mut dyn TxContext) -> &'a mut Transaction<'static, Postgres> {
        ctx.as_any_mut()
            .downcast_mut::<PgTxContext>()
            .expect("expected a PgTxContext; is a non-Postgres TxManager wired in by mistake?")
            .tx
            .as_mut()
            .expect("transaction already consumed by commit/rollback")
    }
}

#[async_trait]
impl TxContext for PgTxContext {
    async fn commit(mut self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.take().expect("commit called twice");
        tx.commit().await.map_err(|e| map_sqlx_err("commit transaction", e))
    }

    async fn rollback(mut self: Box<Self>) -> AppResult<()> {
        let tx = self.tx.take().expect("rollback called twice");
        tx.rollback().await.map_err(|e| map_sqlx_err("rollback transaction", e))
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

pub struct PostgresTxManager {
    pool: PgPool,
}

impl PostgresTxManager {
    pub fn new(pool: PgPool) -> Self {
        PostgresTxManager { pool }
    }
}

#[async_trait]
impl TxManager for PostgresTxManager {
    async fn begin(&self) -> AppResult<Box<dyn TxContext>> {
        let tx = self.pool.begin().await.map_err(|e| map_sqlx_err("begin transaction", e))?;
        Ok(Box::new(PgTxContext { tx: Some(tx) }))
    }
}
