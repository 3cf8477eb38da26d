//! License-claim workflow (spec §4.2, C3 + C9): one-shot credential trades
//! for a provisioned tenant, owner admin, and lifetime entitlement.

use std::sync::Arc;

use log::{error, info, warn};
use serde_json::json;

use crate::application::ports::{
    AdminRepository, BillingAuditLogRepository, EntitlementRepository, LicenseKeyRepository,
    PasswordHasher, TenantRepository, TxManager,
};
use crate::clock::Clock;
use crate::domain::admin::{validate_password_complexity, Admin, AdminRole};
use crate::domain::license::{
    hash_license_key, normalize_license_key, validate_license_key_format, ActorType,
    BillingAuditLog, Entitlement, EntitlementSource, LicenseKeyStatus, ACTION_LICENSE_CLAIM,
    ACTION_LICENSE_CLAIM_FAILED, PLAN_CODE_LIFETIME,
};
use crate::domain::tenant::Tenant;
use crate::error::{AppError, AppResult};
use crate::id::{AdminId, TenantId};
use crate::timezone::DEFAULT_TIMEZONE;

#[derive(Clone, Debug)]
pub struct LicenseClaimInput {
    pub email: String,
    pub password: String,
    pub display_name: String,
    pub tenant_name: String,
    pub license_key: String,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

#[derive(Clone, Debug)]
pub struct LicenseClaimOutput {
    pub tenant_id: TenantId,
    pub admin_id: AdminId,
    pub tenant_name: String,
    pub email: String,
}

pub struct LicenseClaimUseCase {
    tx_manager: Arc<dyn TxManager>,
    license_keys: Arc<dyn LicenseKeyRepository>,
    tenants: Arc<dyn TenantRepository>,
    admins: Arc<dyn AdminRepository>,
    entitlements: Arc<dyn EntitlementRepository>,
    billing_audit: Arc<dyn BillingAuditLogRepository>,
    password_hasher: Arc<dyn PasswordHasher>,
    clock: Arc<dyn Clock>,
}

impl LicenseClaimUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tx_manager: Arc<dyn TxManager>,
        license_keys: Arc<dyn LicenseKeyRepository>,
        tenants: Arc<dyn TenantRepository>,
        admins: Arc<dyn AdminRepository>,
        entitlements: Arc<dyn EntitlementRepository>,
        billing_audit: Arc<dyn BillingAuditLogRepository>,
        password_hasher: Arc<dyn PasswordHasher>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        LicenseClaimUseCase {
            tx_manager,
            license_keys,
            tenants,
            admins,
            entitlements,
            billing_audit,
            password_hasher,
            clock,
        }
    }

    pub async fn execute(&self, input: LicenseClaimInput) -> AppResult<LicenseClaimOutput> {
        // Step 1: pre-tx validation, no state change.
        if input.email.trim().is_empty() {
            return Err(AppError::validation("メールアドレスを入力してください"));
        }
        if input.display_name.trim().is_empty() {
            return Err(AppError::validation("表示名を入力してください"));
        }
        if input.tenant_name.trim().is_empty() {
            return Err(AppError::validation("テナント名を入力してください"));
        }
        validate_password_complexity(&input.password)?;

        let normalized_key = normalize_license_key(&input.license_key);
        validate_license_key_format(&normalized_key)?;

        // Step 2: hash.
        let key_hash = hash_license_key(&normalized_key);

        let now = self.clock.now();
        let result = crate::application::ports::with_tx(self.tx_manager.as_ref(), |ctx| {
            let key_hash = key_hash.clone();
            let input = input.clone();
            Box::pin(async move {
                // 3a.
                let mut key = self
                    .license_keys
                    .find_by_hash_for_update(ctx, &key_hash)
                    .await?
                    .ok_or_else(|| AppError::validation("ライセンスキーが見つかりません"))?;

                // 3b.
                match key.status {
                    LicenseKeyStatus::Unused => {}
                    LicenseKeyStatus::Used => {
                        return Err(AppError::validation("このライセンスキーはすでに使用されています"))
                    }
                    LicenseKeyStatus::Revoked => {
                        return Err(AppError::validation("このライセンスキーは無効化されています"))
                    }
                }

                // 3c/3d.
                let tenant = Tenant::new_active(&input.tenant_name, DEFAULT_TIMEZONE, now)?;
                self.tenants.save(ctx, &tenant).await?;

                // 3e.
                let password_hash = self.password_hasher.hash(&input.password).await?;
                let admin = Admin::new(
                    tenant.id.clone(),
                    &input.email,
                    password_hash,
                    &input.display_name,
                    AdminRole::Owner,
                    now,
                )?;
                self.admins.save(ctx, &admin).await?;

                // 3f.
                let entitlement = Entitlement::new(
                    tenant.id.clone(),
                    PLAN_CODE_LIFETIME,
                    EntitlementSource::Booth,
                    now,
                );
                self.entitlements.save(ctx, &entitlement).await?;

                // 3g.
                key.mark_as_used(now, tenant.id.clone())?;
                self.license_keys.save(ctx, &key).await?;

                // 3h.
                let audit = BillingAuditLog::new(
                    Some(tenant.id.clone()),
                    now,
                    ActorType::User,
                    Some(admin.id.as_str().to_string()),
                    ACTION_LICENSE_CLAIM,
                    Some("tenant".to_string()),
                    Some(tenant.id.as_str().to_string()),
                    None,
                    Some(json!({
                        "tenant_id": tenant.id.as_str(),
                        "admin_id": admin.id.as_str(),
                        "tenant_name": tenant.tenant_name,
                        "email": admin.email,
                    })),
                    input.ip.clone(),
                    input.user_agent.clone(),
                );
                self.billing_audit.append(ctx, &audit).await?;

                Ok(LicenseClaimOutput {
                    tenant_id: tenant.id.clone(),
                    admin_id: admin.id.clone(),
                    tenant_name: tenant.tenant_name.clone(),
                    email: admin.email.clone(),
                })
            })
        })
        .await;

        if let Err(ref err) = result {
            warn!("license claim failed: {err}");
            let failure_audit = BillingAuditLog::new(
                None,
                now,
                ActorType::User,
                None,
                ACTION_LICENSE_CLAIM_FAILED,
                None,
                None,
                None,
                Some(json!({ "reason": err.to_string() })),
                input.ip,
                input.user_agent,
            );
            // Best-effort: runs outside the outer transaction, after
            // rollback; its own failure must never mask the original error.
            if let Err(audit_err) = self.billing_audit.append_out_of_band(&failure_audit).await {
                error!("failed to record license_claim_failed audit entry: {audit_err}");
            }
        } else {
            info!("license claim succeeded");
        }

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, Utc};
    use crate::application::ports::with_tx;
    use crate::clock::FixedClock;
    use crate::domain::license::LicenseKey;
    use crate::infra::in_memory::{
        InMemoryAdminRepository, InMemoryBillingAuditLogRepository, InMemoryEntitlementRepository,
        InMemoryLicenseKeyRepository, InMemoryPasswordHasher, InMemoryTenantRepository,
        InMemoryTxManager,
    };

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    struct Harness {
        use_case: LicenseClaimUseCase,
        license_keys: Arc<InMemoryLicenseKeyRepository>,
        billing_audit: Arc<InMemoryBillingAuditLogRepository>,
        entitlements: Arc<InMemoryEntitlementRepository>,
    }

    async fn harness_with_key(status: LicenseKeyStatus, used_by: Option<TenantId>) -> (Harness, String) {
        let tx_manager = Arc::new(InMemoryTxManager::new());
        let license_keys = Arc::new(InMemoryLicenseKeyRepository::new());
        let tenants = Arc::new(InMemoryTenantRepository::new());
        let admins = Arc::new(InMemoryAdminRepository::new());
        let entitlements = Arc::new(InMemoryEntitlementRepository::new());
        let billing_audit = Arc::new(InMemoryBillingAuditLogRepository::new());
        let password_hasher = Arc::new(InMemoryPasswordHasher::new());
        let clock = Arc::new(FixedClock::new(now()));

        let raw_key = "ABCD-1234-EF56-7890";
        let normalized = normalize_license_key(raw_key);
        let key_hash = hash_license_key(&normalized);
        let mut key = LicenseKey::new_unused(key_hash, now());
        match status {
            LicenseKeyStatus::Unused => {}
            LicenseKeyStatus::Used => {
                key.mark_as_used(now(), used_by.unwrap_or_else(TenantId::generate)).unwrap();
            }
            LicenseKeyStatus::Revoked => key.revoke(now()),
        }
        with_tx(tx_manager.as_ref(), |ctx| {
            let key = key.clone();
            Box::pin(async move { license_keys.save(ctx, &key).await })
        })
        .await
        .unwrap();

        let use_case = LicenseClaimUseCase::new(
            tx_manager,
            license_keys.clone(),
            tenants,
            admins,
            entitlements.clone(),
            billing_audit.clone(),
            password_hasher,
            clock,
        );
        (
            Harness {
                use_case,
                license_keys,
                billing_audit,
                entitlements,
            },
            raw_key.to_string(),
        )
    }

    // S1: claim success.
    #[tokio::test]
    async fn claim_success_provisions_tenant_admin_and_entitlement() {
        let (h, raw_key) = harness_with_key(LicenseKeyStatus::Unused, None).await;

        let output = h
            .use_case
            .execute(LicenseClaimInput {
                email: "test@example.com".to_string(),
                password: "Password123".to_string(),
                display_name: "Test Admin".to_string(),
                tenant_name: "Test Tenant".to_string(),
                license_key: raw_key,
                ip: None,
                user_agent: None,
            })
            .await
            .expect("claim should succeed");

        assert!(!output.tenant_id.as_str().is_empty());
        assert!(!output.admin_id.as_str().is_empty());
        assert_eq!(output.tenant_name, "Test Tenant");
        assert_eq!(output.email, "test@example.com");

        let (keys, _) = h.license_keys.list(10, 0).await.unwrap();
        let key = keys.into_iter().next().unwrap();
        assert_eq!(key.status, LicenseKeyStatus::Used);
        assert_eq!(key.used_by_tenant_id, Some(output.tenant_id.clone()));

        let entitlements = h.entitlements.find_by_tenant_id(&output.tenant_id).await.unwrap();
        assert_eq!(entitlements.len(), 1);
        assert_eq!(entitlements[0].plan_code, PLAN_CODE_LIFETIME);
        assert_eq!(entitlements[0].source, EntitlementSource::Booth);

        let audit = h.billing_audit.all().await;
        assert_eq!(audit.iter().filter(|a| a.action == ACTION_LICENSE_CLAIM).count(), 1);
    }

    // S2: claim rejected for an already-used key.
    #[tokio::test]
    async fn claim_rejected_for_used_key_leaves_no_tenant() {
        let bound_tenant = TenantId::generate();
        let (h, raw_key) = harness_with_key(LicenseKeyStatus::Used, Some(bound_tenant)).await;

        let result = h
            .use_case
            .execute(LicenseClaimInput {
                email: "someone@example.com".to_string(),
                password: "Password123".to_string(),
                display_name: "Someone".to_string(),
                tenant_name: "Someone's Tenant".to_string(),
                license_key: raw_key,
                ip: None,
                user_agent: None,
            })
            .await;

        assert!(result.is_err());
        let audit = h.billing_audit.all().await;
        assert_eq!(audit.iter().filter(|a| a.action == ACTION_LICENSE_CLAIM).count(), 0);
        assert_eq!(
            audit.iter().filter(|a| a.action == ACTION_LICENSE_CLAIM_FAILED).count(),
            1
        );
    }
}
