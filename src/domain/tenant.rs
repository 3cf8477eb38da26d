//! Tenant aggregate and status state machine (spec §4.1, C2).

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HasTimestamps, SoftDeletable};
use crate::error::{sentinel, AppError, AppResult};
use crate::id::TenantId;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TenantStatus {
    PendingPayment,
    Active,
    Grace,
    Suspended,
}

impl TenantStatus {
    fn label(self) -> &'static str {
        match self {
            TenantStatus::PendingPayment => "pending_payment",
            TenantStatus::Active => "active",
            TenantStatus::Grace => "grace",
            TenantStatus::Suspended => "suspended",
        }
    }

    /// Legal-transition table from spec §4.1 (self-loops always allowed,
    /// to support idempotent renewal callbacks — spec §9 Open Question).
    fn can_transition_to(self, target: TenantStatus) -> bool {
        if self == target {
            return true;
        }
        use TenantStatus::*;
        matches!(
            (self, target),
            (PendingPayment, Active)
                | (PendingPayment, Suspended)
                | (Active, Grace)
                | (Active, Suspended)
                | (Grace, Active)
                | (Grace, Suspended)
                | (Suspended, PendingPayment)
                | (Suspended, Active)
        )
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Tenant {
    pub id: TenantId,
    pub tenant_name: String,
    pub timezone: String,
    pub status: TenantStatus,
    pub grace_until: Option<DateTime<Utc>>,
    pub pending_expires_at: Option<DateTime<Utc>>,
    pub pending_stripe_session_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

const MAX_TENANT_NAME_LEN: usize = 255;

impl Tenant {
    /// Creates a new tenant in `pending_payment` status by default; callers
    /// that provision via the license-claim workflow transition it to
    /// `active` as part of the same aggregate construction (spec §4.2
    /// step 3c creates the tenant directly, not through pending_payment —
    /// see `Tenant::new_active`).
    pub fn new(
        tenant_name: impl Into<String>,
        timezone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let tenant_name = tenant_name.into();
        let timezone = timezone.into();
        validate_tenant_name(&tenant_name)?;
        crate::timezone::load(&timezone).map_err(AppError::validation)?;
        Ok(Tenant {
            id: TenantId::generate(),
            tenant_name,
            timezone,
            status: TenantStatus::PendingPayment,
            grace_until: None,
            pending_expires_at: None,
            pending_stripe_session_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// Construct a tenant already in `active` status, used by the
    /// license-claim workflow (spec §4.2 step 3c): a claimed license
    /// provisions a ready-to-use tenant, not one awaiting payment.
    pub fn new_active(
        tenant_name: impl Into<String>,
        timezone: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let mut tenant = Self::new(tenant_name, timezone, now)?;
        tenant.status = TenantStatus::Active;
        Ok(tenant)
    }

    pub fn can_write(&self) -> bool {
        !self.is_deleted() && matches!(self.status, TenantStatus::Active)
    }

    pub fn can_read(&self) -> bool {
        !self.is_deleted()
            && matches!(
                self.status,
                TenantStatus::Active | TenantStatus::Grace | TenantStatus::Suspended
            )
    }

    fn transition(&mut self, target: TenantStatus, now: DateTime<Utc>) -> AppResult<()> {
        if !self.status.can_transition_to(target) {
            return Err(sentinel::illegal_tenant_transition(
                self.status.label(),
                target.label(),
            ));
        }
        self.status = target;
        self.updated_at = now;
        Ok(())
    }

    pub fn set_status_active(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TenantStatus::Active, now)?;
        self.grace_until = None;
        self.pending_expires_at = None;
        self.pending_stripe_session_id = None;
        Ok(())
    }

    pub fn set_status_grace(&mut self, grace_until: DateTime<Utc>, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TenantStatus::Grace, now)?;
        self.grace_until = Some(grace_until);
        self.pending_expires_at = None;
        self.pending_stripe_session_id = None;
        Ok(())
    }

    pub fn set_status_suspended(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        self.transition(TenantStatus::Suspended, now)?;
        self.grace_until = None;
        self.pending_expires_at = None;
        self.pending_stripe_session_id = None;
        Ok(())
    }

    pub fn set_status_pending_payment(
        &mut self,
        session_id: impl Into<String>,
        expires_at: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        self.transition(TenantStatus::PendingPayment, now)?;
        self.grace_until = None;
        self.pending_expires_at = Some(expires_at);
        self.pending_stripe_session_id = Some(session_id.into());
        Ok(())
    }

    /// Soft-delete is idempotent: a second call is a no-op (spec §9
    /// same-status-transition philosophy applied to deletion).
    pub fn soft_delete(&mut self, now: DateTime<Utc>) {
        if self.deleted_at.is_none() {
            self.deleted_at = Some(now);
            self.updated_at = now;
        }
    }
}

impl HasTimestamps for Tenant {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

impl SoftDeletable for Tenant {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

fn validate_tenant_name(name: &str) -> AppResult<()> {
    let len = name.chars().count();
    if len == 0 || len > MAX_TENANT_NAME_LEN {
        return Err(AppError::validation(
            "テナント名は1文字以上255文字以下で入力してください",
        ));
    }
    Ok(())
}

/// Composes a grace-period mutation on subscription period end: `grace_until
/// = period_end + 14 days` (spec §4.1, §8 grace-math law). Billing flows
/// must route through this helper rather than computing the date inline.
pub fn calculate_grace_until(period_end: DateTime<Utc>, grace_days: i64) -> DateTime<Utc> {
    period_end + Duration::days(grace_days)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn grace_math_adds_fourteen_days() {
        let period_end = now();
        assert_eq!(
            calculate_grace_until(period_end, 14),
            period_end + Duration::days(14)
        );
    }

    #[test]
    fn legal_transitions_succeed() {
        let mut tenant = Tenant::new_active("Acme", "Asia/Tokyo", now()).unwrap();
        tenant.set_status_grace(now() + Duration::days(1), now()).unwrap();
        assert_eq!(tenant.status, TenantStatus::Grace);
        assert!(tenant.grace_until.is_some());
        tenant.set_status_active(now()).unwrap();
        assert_eq!(tenant.status, TenantStatus::Active);
        assert!(tenant.grace_until.is_none());
    }

    #[test]
    fn illegal_transition_is_rejected_and_entity_untouched() {
        let mut tenant = Tenant::new(" Acme ".trim(), "Asia/Tokyo", now()).unwrap();
        assert_eq!(tenant.status, TenantStatus::PendingPayment);
        let err = tenant.set_status_grace(now(), now()).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));
        assert_eq!(tenant.status, TenantStatus::PendingPayment);
    }

    #[test]
    fn self_loop_is_a_legal_noop() {
        let mut tenant = Tenant::new_active("Acme", "Asia/Tokyo", now()).unwrap();
        tenant.set_status_active(now() + Duration::seconds(1)).unwrap();
        assert_eq!(tenant.status, TenantStatus::Active);
    }

    #[test]
    fn access_policy_by_status() {
        let mut tenant = Tenant::new_active("Acme", "Asia/Tokyo", now()).unwrap();
        assert!(tenant.can_write() && tenant.can_read());

        tenant.set_status_grace(now(), now()).unwrap();
        assert!(!tenant.can_write() && tenant.can_read());

        tenant.set_status_suspended(now()).unwrap();
        assert!(!tenant.can_write() && tenant.can_read());

        tenant
            .set_status_pending_payment("sess", now(), now())
            .unwrap();
        assert!(!tenant.can_write() && !tenant.can_read());
    }

    #[test]
    fn soft_delete_blocks_access_regardless_of_status_and_is_idempotent() {
        let mut tenant = Tenant::new_active("Acme", "Asia/Tokyo", now()).unwrap();
        tenant.soft_delete(now());
        assert!(!tenant.can_write() && !tenant.can_read());
        let first_deleted_at = tenant.deleted_at;
        tenant.soft_delete(now() + Duration::days(1));
        assert_eq!(tenant.deleted_at, first_deleted_at);
    }

    #[test]
    fn tenant_name_boundaries() {
        assert!(Tenant::new("x".repeat(255), "Asia/Tokyo", now()).is_ok());
        assert!(Tenant::new("x".repeat(256), "Asia/Tokyo", now()).is_err());
        assert!(Tenant::new("", "Asia/Tokyo", now()).is_err());
    }

    #[test]
    fn unknown_timezone_rejected_at_construction() {
        assert!(Tenant::new("Acme", "Not/AZone", now()).is_err());
    }
}
