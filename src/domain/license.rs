//! License/billing aggregate (spec §3, §4.2, C3): license keys, entitlements,
//! subscriptions, and the billing audit log.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{BillingAuditLogId, EntitlementId, LicenseKeyId, SubscriptionId, TenantId};

// ---------------------------------------------------------------- LicenseKey

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenseKeyStatus {
    Unused,
    Used,
    Revoked,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LicenseKey {
    pub id: LicenseKeyId,
    /// Non-reversible, derived from the normalized key. Never stores the
    /// plaintext key.
    pub key_hash: String,
    pub status: LicenseKeyStatus,
    pub used_by_tenant_id: Option<TenantId>,
    pub used_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

const LICENSE_KEY_ALPHABET_LEN: usize = 16; // dashless, normalized length
const LICENSE_KEY_ALPHABET: &str = "0123456789ABCDEF";

/// Strips non-alphanumerics and uppercases (spec §4.2 step 2, §6.2).
pub fn normalize_license_key(raw: &str) -> String {
    raw.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .map(|c| c.to_ascii_uppercase())
        .collect()
}

/// Validates the normalized key against the fixed alphabet (hex in
/// practice) and fixed length (spec §3, §4.2 step 1).
pub fn validate_license_key_format(normalized: &str) -> AppResult<()> {
    if normalized.len() != LICENSE_KEY_ALPHABET_LEN {
        return Err(AppError::validation(format!(
            "ライセンスキーは正規化後に{LICENSE_KEY_ALPHABET_LEN}文字である必要があります"
        )));
    }
    if !normalized.chars().all(|c| LICENSE_KEY_ALPHABET.contains(c)) {
        return Err(AppError::validation(
            "ライセンスキーに使用できない文字が含まれています",
        ));
    }
    Ok(())
}

/// `hash(normalize(k1)) == hash(normalize(k2))` whenever k1/k2 differ only
/// in case or separators (spec §8 license-key law).
pub fn hash_license_key(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    hex::encode(hasher.finalize())
}

impl LicenseKey {
    pub fn new_unused(key_hash: impl Into<String>, now: DateTime<Utc>) -> Self {
        LicenseKey {
            id: LicenseKeyId::generate(),
            key_hash: key_hash.into(),
            status: LicenseKeyStatus::Unused,
            used_by_tenant_id: None,
            used_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Marks the key as used. Fails if the key is not currently `unused`
    /// (spec §3 invariant: a used key cannot be reused).
    pub fn mark_as_used(&mut self, now: DateTime<Utc>, tenant_id: TenantId) -> AppResult<()> {
        match self.status {
            LicenseKeyStatus::Unused => {
                self.status = LicenseKeyStatus::Used;
                self.used_by_tenant_id = Some(tenant_id);
                self.used_at = Some(now);
                self.updated_at = now;
                Ok(())
            }
            LicenseKeyStatus::Used => Err(AppError::validation("このライセンスキーはすでに使用されています")),
            LicenseKeyStatus::Revoked => Err(AppError::validation("このライセンスキーは無効化されています")),
        }
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        self.status = LicenseKeyStatus::Revoked;
        self.updated_at = now;
    }
}

impl HasTimestamps for LicenseKey {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

// -------------------------------------------------------------- Entitlement

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntitlementSource {
    Booth,
    Stripe,
}

pub const PLAN_CODE_LIFETIME: &str = "LIFETIME";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Entitlement {
    pub id: EntitlementId,
    pub tenant_id: TenantId,
    pub plan_code: String,
    pub source: EntitlementSource,
    pub starts_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
}

impl Entitlement {
    pub fn new(
        tenant_id: TenantId,
        plan_code: impl Into<String>,
        source: EntitlementSource,
        starts_at: DateTime<Utc>,
    ) -> Self {
        Entitlement {
            id: EntitlementId::generate(),
            tenant_id,
            plan_code: plan_code.into(),
            source,
            starts_at,
            revoked_at: None,
        }
    }

    pub fn is_active(&self) -> bool {
        self.revoked_at.is_none()
    }

    pub fn revoke(&mut self, now: DateTime<Utc>) {
        if self.revoked_at.is_none() {
            self.revoked_at = Some(now);
        }
    }
}

// ------------------------------------------------------------- Subscription

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Subscription {
    pub id: SubscriptionId,
    pub tenant_id: TenantId,
    pub stripe_customer_id: String,
    pub stripe_subscription_id: String,
    pub status: String,
    pub current_period_end: Option<DateTime<Utc>>,
}

// ------------------------------------------------------------ BillingAuditLog

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActorType {
    User,
    Admin,
    System,
}

/// One audit entry (spec §6.3). `tenant_id` is optional because a failed
/// license claim has no tenant yet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct BillingAuditLog {
    pub id: BillingAuditLogId,
    pub tenant_id: Option<TenantId>,
    pub when: DateTime<Utc>,
    pub actor_type: ActorType,
    pub actor_id: Option<String>,
    pub action: String,
    pub subject_type: Option<String>,
    pub subject_id: Option<String>,
    pub before_json: Option<serde_json::Value>,
    pub after_json: Option<serde_json::Value>,
    pub ip: Option<String>,
    pub user_agent: Option<String>,
}

pub const ACTION_LICENSE_CLAIM: &str = "license_claim";
pub const ACTION_LICENSE_CLAIM_FAILED: &str = "license_claim_failed";
pub const ACTION_TENANT_STATUS_CHANGE: &str = "tenant_status_change";
pub const ACTION_ADMIN_REMOVED: &str = "admin_removed";

impl BillingAuditLog {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: Option<TenantId>,
        when: DateTime<Utc>,
        actor_type: ActorType,
        actor_id: Option<String>,
        action: impl Into<String>,
        subject_type: Option<String>,
        subject_id: Option<String>,
        before_json: Option<serde_json::Value>,
        after_json: Option<serde_json::Value>,
        ip: Option<String>,
        user_agent: Option<String>,
    ) -> Self {
        BillingAuditLog {
            id: BillingAuditLogId::generate(),
            tenant_id,
            when,
            actor_type,
            actor_id,
            action: action.into(),
            subject_type,
            subject_id,
            before_json,
            after_json,
            ip,
            user_agent,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_dashes_and_case() {
        assert_eq!(normalize_license_key("ABCD-1234-EF56-7890"), "ABCD1234EF567890");
        assert_eq!(normalize_license_key("abcd-1234-ef56-7890"), "ABCD1234EF567890");
    }

    #[test]
    fn hash_is_stable_across_equivalent_representations() {
        let k1 = normalize_license_key("ABCD-1234-EF56-7890");
        let k2 = normalize_license_key("abcd1234ef567890");
        assert_eq!(hash_license_key(&k1), hash_license_key(&k2));
    }

    #[test]
    fn format_validation_rejects_wrong_length_and_alphabet() {
        assert!(validate_license_key_format("ABCD1234EF567890").is_ok());
        assert!(validate_license_key_format("ABCD1234EF56789").is_err()); // 15 chars
        assert!(validate_license_key_format("ABCD1234EFGH7890").is_err()); // G, H not hex
    }

    #[test]
    fn mark_as_used_is_single_shot() {
        let now = "2025-01-15T00:00:00Z".parse().unwrap();
        let mut key = LicenseKey::new_unused("hash", now);
        let tenant_id = TenantId::generate();
        key.mark_as_used(now, tenant_id.clone()).unwrap();
        assert_eq!(key.status, LicenseKeyStatus::Used);
        assert_eq!(key.used_by_tenant_id, Some(tenant_id.clone()));

        let err = key.mark_as_used(now, tenant_id).unwrap_err();
        assert!(matches!(err, AppError::Validation { .. }));
    }

    #[test]
    fn entitlement_active_iff_not_revoked() {
        let now = "2025-01-15T00:00:00Z".parse().unwrap();
        let mut ent = Entitlement::new(TenantId::generate(), PLAN_CODE_LIFETIME, EntitlementSource::Booth, now);
        assert!(ent.is_active());
        ent.revoke(now);
        assert!(!ent.is_active());
    }
}
