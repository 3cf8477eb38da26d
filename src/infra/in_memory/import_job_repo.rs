use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{ImportJobRepository, TxContext};
use crate::domain::import_job::ImportJob;
use crate::error::AppResult;
use crate::id::{ImportJobId, TenantId};

#[derive(Default)]
pub struct InMemoryImportJobRepository {
    rows: Mutex<HashMap<ImportJobId, ImportJob>>,
}

impl InMemoryImportJobRepository {
    pub fn new() -> Self {
        InMemoryImportJobRepository::default()
    }
}

#[async_trait]
impl ImportJobRepository for InMemoryImportJobRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()> {
        self.rows.lock().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn update(&self, _ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()> {
        self.rows.lock().await.insert(job.id.clone(), job.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &ImportJobId) -> AppResult<Option<ImportJob>> {
        Ok(self.rows.lock().await.get(id).cloned())
    }

    async fn find_by_id_and_tenant_id(
        &self,
        id: &ImportJobId,
        tenant_id: &TenantId,
    ) -> AppResult<Option<ImportJob>> {
        Ok(self
            .rows
            .lock()
            .await
            .get(id)
            .filter(|j| &j.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ImportJob>> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<ImportJob> = rows
            .values()
            .filter(|j| &j.tenant_id == tenant_id)
            .cloned()
            .collect();
        matching.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(matching.into_iter().skip(offset as usize).take(limit as usize).collect())
    }

    async fn count_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<u64> {
        Ok(self.rows.lock().await.values().filter(|j| &j.tenant_id == tenant_id).count() as u64)
    }
}
