use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use crate::application::ports::{
    BillingAuditLogRepository, EntitlementRepository, SubscriptionRepository, TxContext,
};
use crate::domain::license::{BillingAuditLog, Entitlement, Subscription};
use crate::error::AppResult;
use crate::id::{BillingAuditLogId, EntitlementId, SubscriptionId, TenantId};

#[derive(Default)]
pub struct InMemoryEntitlementRepository {
    rows: Mutex<HashMap<EntitlementId, Entitlement>>,
}

impl InMemoryEntitlementRepository {
    pub fn new() -> Self {
        InMemoryEntitlementRepository::default()
    }
}

#[async_trait]
impl EntitlementRepository for InMemoryEntitlementRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, entitlement: &Entitlement) -> AppResult<()> {
        self.rows.lock().await.insert(entitlement.id.clone(), entitlement.clone());
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|e| &e.tenant_id == tenant_id && e.is_active())
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemorySubscriptionRepository {
    rows: Mutex<HashMap<SubscriptionId, Subscription>>,
}

impl InMemorySubscriptionRepository {
    pub fn new() -> Self {
        InMemorySubscriptionRepository::default()
    }
}

#[async_trait]
impl SubscriptionRepository for InMemorySubscriptionRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, subscription: &Subscription) -> AppResult<()> {
        self.rows.lock().await.insert(subscription.id.clone(), subscription.clone());
        Ok(())
    }

    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Option<Subscription>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|s| &s.tenant_id == tenant_id)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryBillingAuditLogRepository {
    rows: Mutex<HashMap<BillingAuditLogId, BillingAuditLog>>,
}

impl InMemoryBillingAuditLogRepository {
    pub fn new() -> Self {
        InMemoryBillingAuditLogRepository::default()
    }

    /// All rows regardless of `tenant_id`, including the `None`-tenant
    /// failed-attempt entries `find_by_tenant_id` can never surface. Test
    /// inspection only; not part of `BillingAuditLogRepository`.
    pub async fn all(&self) -> Vec<BillingAuditLog> {
        self.rows.lock().await.values().cloned().collect()
    }
}

#[async_trait]
impl BillingAuditLogRepository for InMemoryBillingAuditLogRepository {
    async fn append(&self, _ctx: &mut dyn TxContext, entry: &BillingAuditLog) -> AppResult<()> {
        self.rows.lock().await.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn append_out_of_band(&self, entry: &BillingAuditLog) -> AppResult<()> {
        self.rows.lock().await.insert(entry.id.clone(), entry.clone());
        Ok(())
    }

    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<BillingAuditLog>> {
        let rows = self.rows.lock().await;
        let mut matching: Vec<BillingAuditLog> = rows
            .values()
            .filter(|e| {
                e.tenant_id.as_ref() == Some(tenant_id)
                    && from.is_none_or_before(e.when)
                    && to.is_none_or_after(e.when)
            })
            .cloned()
            .collect();
        matching.sort_by(|a, b| a.when.cmp(&b.when));
        Ok(matching)
    }
}

trait RangeBoundExt {
    fn is_none_or_before(&self, when: DateTime<Utc>) -> bool;
    fn is_none_or_after(&self, when: DateTime<Utc>) -> bool;
}

impl RangeBoundExt for Option<DateTime<Utc>> {
    fn is_none_or_before(&self, when: DateTime<Utc>) -> bool {
        match self {
            Some(from) => when >= *from,
            None => true,
        }
    }
    fn is_none_or_after(&self, when: DateTime<Utc>) -> bool {
        match self {
            Some(to) => when <= *to,
            None => true,
        }
    }
}
