//! Admin tenant-management use case (spec §4.7, §4.9, C9): listing,
//! inspecting, and transitioning tenants; removing admins.

use std::sync::Arc;

use serde_json::json;

use crate::application::ports::{
    with_tx, AdminRepository, BillingAuditLogRepository, EntitlementRepository,
    SubscriptionRepository, TenantRepository,
};
use crate::clock::Clock;
use crate::domain::admin::Admin;
use crate::domain::license::{
    ActorType, BillingAuditLog, Entitlement, Subscription, ACTION_ADMIN_REMOVED,
    ACTION_TENANT_STATUS_CHANGE,
};
use crate::domain::tenant::{Tenant, TenantStatus};
use crate::error::AppError;
use crate::error::AppResult;
use crate::id::{AdminId, TenantId};

pub struct TenantListPage {
    pub tenants: Vec<Tenant>,
    pub total: u64,
}

pub struct TenantDetail {
    pub tenant: Tenant,
    pub entitlements: Vec<Entitlement>,
    pub subscription: Option<Subscription>,
    pub admins: Vec<Admin>,
}

/// What the caller wants the tenant's new status to be; `grace_until` is
/// required exactly when `target == Grace` (spec §4.7).
pub enum StatusChangeTarget {
    Active,
    Grace { grace_until: chrono::DateTime<chrono::Utc> },
    Suspended,
    PendingPayment { session_id: String, expires_at: chrono::DateTime<chrono::Utc> },
}

pub struct AdminTenantUseCase {
    tenants: Arc<dyn TenantRepository>,
    admins: Arc<dyn AdminRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    subscriptions: Arc<dyn SubscriptionRepository>,
    billing_audit: Arc<dyn BillingAuditLogRepository>,
    tx_manager: Arc<dyn crate::application::ports::TxManager>,
    clock: Arc<dyn Clock>,
}

const DEFAULT_LIST_LIMIT: u32 = 50;
const MAX_LIST_LIMIT: u32 = 100;

impl AdminTenantUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenants: Arc<dyn TenantRepository>,
        admins: Arc<dyn AdminRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        subscriptions: Arc<dyn SubscriptionRepository>,
        billing_audit: Arc<dyn BillingAuditLogRepository>,
        tx_manager: Arc<dyn crate::application::ports::TxManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        AdminTenantUseCase {
            tenants,
            admins,
            entitlements,
            subscriptions,
            billing_audit,
            tx_manager,
            clock,
        }
    }

    /// Default limit 50, capped at 100 (spec §4.7).
    pub async fn list(
        &self,
        status: Option<TenantStatus>,
        limit: Option<u32>,
        offset: u32,
    ) -> AppResult<TenantListPage> {
        let limit = limit.unwrap_or(DEFAULT_LIST_LIMIT).min(MAX_LIST_LIMIT);
        let (tenants, total) = self.tenants.list_all(status, limit, offset).await?;
        Ok(TenantListPage { tenants, total })
    }

    /// A not-found on subscription is recoverable (spec §4.7); any other
    /// repository error propagates.
    pub async fn get_detail(&self, tenant_id: &TenantId) -> AppResult<TenantDetail> {
        let tenant = self
            .tenants
            .find_by_id(tenant_id)
            .await?
            .ok_or_else(|| AppError::not_found("tenant"))?;
        let entitlements = self.entitlements.find_by_tenant_id(tenant_id).await?;
        let subscription = self.subscriptions.find_active_by_tenant_id(tenant_id).await?;
        let admins = self.admins.find_by_tenant_id(tenant_id).await?;
        Ok(TenantDetail {
            tenant,
            entitlements,
            subscription,
            admins,
        })
    }

    pub async fn update_status(
        &self,
        tenant_id: &TenantId,
        target: StatusChangeTarget,
        actor_admin_id: &AdminId,
    ) -> AppResult<Tenant> {
        let now = self.clock.now();
        let tenant_id = tenant_id.clone();
        let actor_admin_id = actor_admin_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let tenant_id = tenant_id.clone();
            let actor_admin_id = actor_admin_id.clone();
            Box::pin(async move {
                let mut tenant = self
                    .tenants
                    .find_by_id(&tenant_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("tenant"))?;
                let before = json!({ "status": format!("{:?}", tenant.status) });

                match target {
                    StatusChangeTarget::Active => tenant.set_status_active(now)?,
                    StatusChangeTarget::Grace { grace_until } => {
                        tenant.set_status_grace(grace_until, now)?
                    }
                    StatusChangeTarget::Suspended => tenant.set_status_suspended(now)?,
                    StatusChangeTarget::PendingPayment {
                        session_id,
                        expires_at,
                    } => tenant.set_status_pending_payment(session_id, expires_at, now)?,
                }
                self.tenants.save(ctx, &tenant).await?;

                let after = json!({ "status": format!("{:?}", tenant.status) });
                // Open question resolved (spec §9): emit only when the
                // visible state actually changed, so same-status renewal
                // callbacks don't spam the audit log with no-op rows.
                if before != after {
                    let audit = BillingAuditLog::new(
                        Some(tenant.id.clone()),
                        now,
                        ActorType::Admin,
                        Some(actor_admin_id.as_str().to_string()),
                        ACTION_TENANT_STATUS_CHANGE,
                        Some("tenant".to_string()),
                        Some(tenant.id.as_str().to_string()),
                        Some(before),
                        Some(after),
                        None,
                        None,
                    );
                    self.billing_audit.append(ctx, &audit).await?;
                }

                Ok(tenant)
            })
        })
        .await
    }

    /// Refuses to remove the last owner-role admin of a tenant (spec §4.9).
    /// Admins are hard-deleted, not soft-deleted (spec §6.1's plain
    /// `Delete` signature has no undo).
    pub async fn remove_admin(
        &self,
        tenant_id: &TenantId,
        admin_id: &AdminId,
        actor_admin_id: &AdminId,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let tenant_id = tenant_id.clone();
        let admin_id = admin_id.clone();
        let actor_admin_id = actor_admin_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let admin_id = admin_id.clone();
            let actor_admin_id = actor_admin_id.clone();
            let tenant_id = tenant_id.clone();
            Box::pin(async move {
                let target = self
                    .admins
                    .find_by_id(&admin_id)
                    .await?
                    .filter(|a| a.tenant_id == tenant_id)
                    .ok_or_else(|| AppError::not_found("admin"))?;

                if target.role == crate::domain::admin::AdminRole::Owner {
                    let remaining_owners = self
                        .admins
                        .find_by_tenant_id(&tenant_id)
                        .await?
                        .into_iter()
                        .filter(|a| a.role == crate::domain::admin::AdminRole::Owner && a.id != admin_id)
                        .count();
                    if remaining_owners == 0 {
                        return Err(AppError::invariant(
                            "テナントの最後のオーナー管理者は削除できません",
                        ));
                    }
                }

                self.admins.delete(ctx, &admin_id).await?;

                let audit = BillingAuditLog::new(
                    Some(tenant_id.clone()),
                    now,
                    ActorType::Admin,
                    Some(actor_admin_id.as_str().to_string()),
                    ACTION_ADMIN_REMOVED,
                    Some("admin".to_string()),
                    Some(admin_id.as_str().to_string()),
                    Some(json!({ "email": target.email })),
                    None,
                    None,
                    None,
                );
                self.billing_audit.append(ctx, &audit).await?;
                Ok(())
            })
        })
        .await
    }
}
