use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{AdminRepository, TxContext};
use crate::domain::admin::Admin;
use crate::error::AppResult;
use crate::id::{AdminId, TenantId};

#[derive(Default)]
pub struct InMemoryAdminRepository {
    rows: Mutex<HashMap<AdminId, Admin>>,
}

impl InMemoryAdminRepository {
    pub fn new() -> Self {
        InMemoryAdminRepository::default()
    }
}

#[async_trait]
impl AdminRepository for InMemoryAdminRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, admin: &Admin) -> AppResult<()> {
        self.rows.lock().await.insert(admin.id.clone(), admin.clone());
        Ok(())
    }

    async fn find_by_id(&self, admin_id: &AdminId) -> AppResult<Option<Admin>> {
        Ok(self.rows.lock().await.get(admin_id).cloned())
    }

    async fn find_by_email_global(&self, email: &str) -> AppResult<Option<Admin>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|a| a.email.eq_ignore_ascii_case(email))
            .cloned())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|a| &a.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    // Admins are hard-deleted (spec §4.9), so "active" is simply "present".
    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>> {
        self.find_by_tenant_id(tenant_id).await
    }

    async fn delete(&self, _ctx: &mut dyn TxContext, admin_id: &AdminId) -> AppResult<()> {
        self.rows.lock().await.remove(admin_id);
        Ok(())
    }

    async fn exists_by_email_global(&self, email: &str) -> AppResult<bool> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .any(|a| a.email.eq_ignore_ascii_case(email)))
    }
}
