use async_trait::async_trait;

use crate::application::ports::{TxContext, TxManager};
use crate::error::AppResult;

/// No real transaction backs this: each in-memory repository already
/// guards its map with its own mutex, so commit/rollback are no-ops.
pub struct InMemoryTxContext;

#[async_trait]
impl TxContext for InMemoryTxContext {
    async fn commit(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }
    async fn rollback(self: Box<Self>) -> AppResult<()> {
        Ok(())
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}

#[derive(Default)]
pub struct InMemoryTxManager;

impl InMemoryTxManager {
    pub fn new() -> Self {
        InMemoryTxManager
    }
}

#[async_trait]
impl TxManager for InMemoryTxManager {
    async fn begin(&self) -> AppResult<Box<dyn TxContext>> {
        Ok(Box::new(InMemoryTxContext))
    }
}
