use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{TenantRepository, TxContext};
use crate::domain::tenant::{Tenant, TenantStatus};
use crate::error::AppResult;
use crate::id::TenantId;

#[derive(Default)]
pub struct InMemoryTenantRepository {
    rows: Mutex<HashMap<TenantId, Tenant>>,
}

impl InMemoryTenantRepository {
    pub fn new() -> Self {
        InMemoryTenantRepository::default()
    }
}

#[async_trait]
impl TenantRepository for InMemoryTenantRepository {
    async fn find_by_id(&self, tenant_id: &TenantId) -> AppResult<Option<Tenant>> {
        Ok(self.rows.lock().await.get(tenant_id).cloned())
    }

    async fn find_by_pending_stripe_session_id(&self, session_id: &str) -> AppResult<Option<Tenant>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|t| t.pending_stripe_session_id.as_deref() == Some(session_id))
            .cloned())
    }

    async fn save(&self, _ctx: &mut dyn TxContext, tenant: &Tenant) -> AppResult<()> {
        self.rows.lock().await.insert(tenant.id.clone(), tenant.clone());
        Ok(())
    }

    async fn list_all(
        &self,
        status: Option<TenantStatus>,
        limit: u32,
        offset: u32,
    ) -> AppResult<(Vec<Tenant>, u64)> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<Tenant> = rows
            .values()
            .filter(|t| match status {
                Some(s) => t.status == s,
                None => true,
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.created_at.cmp(&b.created_at));
        let total = matching.len() as u64;
        let page = matching
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect();
        Ok((page, total))
    }
}
