//! Repository ports and the transactional boundary (spec §5, §6.1, C10).
//!
//! All repositories are "context-aware": every write method takes a
//! `&mut dyn TxContext` obtained from `TxManager::begin`, so the adapter can
//! route the call through the same underlying transaction. Reads that are
//! allowed to run outside a transaction take no context.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::attendance_collection::{
    AttendanceCollection, AttendanceResponse, CollectionGroupAssignment, CollectionRoleAssignment,
    TargetDate,
};
use crate::domain::date_schedule::{CandidateDate, DateSchedule, ScheduleResponse};
use crate::domain::event::{Event, EventBusinessDay};
use crate::domain::import_job::ImportJob;
use crate::domain::license::{BillingAuditLog, Entitlement, LicenseKey, Subscription};
use crate::domain::member::Member;
use crate::domain::position::Position;
use crate::domain::shift::{ShiftAssignment, ShiftSlot};
use crate::domain::tenant::{Tenant, TenantStatus};
use crate::domain::admin::Admin;
use crate::error::AppResult;
use crate::id::{
    AdminId, AttendanceCollectionId, BusinessDayId, DateScheduleId, EventId, ImportJobId,
    LicenseKeyId, MemberId, PositionId, ShiftSlotId, TenantId,
};

/// A live transaction handle. Adapters downcast or hold their own
/// connection state behind this marker; the application layer only ever
/// threads it through, never inspects it.
#[async_trait]
pub trait TxContext: Send + Sync {
    async fn commit(self: Box<Self>) -> AppResult<()>;
    async fn rollback(self: Box<Self>) -> AppResult<()>;

    /// Lets a concrete adapter (e.g. `infra::postgres`) recover its own
    /// transaction handle from the trait object it handed the caller.
    /// In-memory adapters never need to downcast; real ones do, since the
    /// underlying `sqlx::Transaction` has to be threaded through every
    /// query issued inside `with_tx`.
    fn as_any_mut(&mut self) -> &mut dyn std::any::Any;
}

#[async_trait]
pub trait TxManager: Send + Sync {
    async fn begin(&self) -> AppResult<Box<dyn TxContext>>;
}

pub type TxFuture<'c, T> = std::pin::Pin<Box<dyn std::future::Future<Output = AppResult<T>> + Send + 'c>>;

/// Runs `f` inside a transaction: commits on `Ok`, rolls back on `Err`
/// (spec §5 `WithTx` guarantees). A panic inside `f` unwinds past the open
/// transaction, so the adapter's `Drop` (if any) is responsible for an
/// implicit rollback — matching the teacher's commit-or-rollback contract
/// without requiring `catch_unwind` here.
///
/// `f` must return an explicitly boxed future (`Box::pin(async move { .. })`)
/// rather than a bare `async` block: the closure's future borrows `ctx`, and
/// only a named, lifetime-parameterized return type like `TxFuture<'c, T>`
/// lets that borrow's lifetime vary per call the way a plain `impl Future`
/// return can't.
pub async fn with_tx<'a, F, T>(tx_manager: &'a (dyn TxManager + 'a), f: F) -> AppResult<T>
where
    F: for<'c> FnOnce(&'c mut dyn TxContext) -> TxFuture<'c, T>,
{
    let mut tx = tx_manager.begin().await?;
    match f(tx.as_mut()).await {
        Ok(value) => {
            tx.commit().await?;
            Ok(value)
        }
        Err(err) => {
            // Best-effort: a rollback failure must not mask the original error.
            let _ = tx.rollback().await;
            Err(err)
        }
    }
}

/// Password hashing is a collaborator (spec §1 "password-hashing library"
/// out of scope); the core only depends on this narrow port.
#[async_trait]
pub trait PasswordHasher: Send + Sync {
    async fn hash(&self, password: &str) -> AppResult<String>;
}

#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, tenant_id: &TenantId) -> AppResult<Option<Tenant>>;
    async fn find_by_pending_stripe_session_id(&self, session_id: &str) -> AppResult<Option<Tenant>>;
    async fn save(&self, ctx: &mut dyn TxContext, tenant: &Tenant) -> AppResult<()>;
    async fn list_all(
        &self,
        status: Option<TenantStatus>,
        limit: u32,
        offset: u32,
    ) -> AppResult<(Vec<Tenant>, u64)>;
}

#[async_trait]
pub trait AdminRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, admin: &Admin) -> AppResult<()>;
    async fn find_by_id(&self, admin_id: &AdminId) -> AppResult<Option<Admin>>;
    async fn find_by_email_global(&self, email: &str) -> AppResult<Option<Admin>>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>>;
    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>>;
    async fn delete(&self, ctx: &mut dyn TxContext, admin_id: &AdminId) -> AppResult<()>;
    async fn exists_by_email_global(&self, email: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait LicenseKeyRepository: Send + Sync {
    /// Locking read; the row lock is held until the enclosing transaction
    /// commits or rolls back (spec §5 concurrency boundary).
    async fn find_by_hash_for_update(
        &self,
        ctx: &mut dyn TxContext,
        key_hash: &str,
    ) -> AppResult<Option<LicenseKey>>;
    async fn save(&self, ctx: &mut dyn TxContext, key: &LicenseKey) -> AppResult<()>;
    async fn save_batch(&self, ctx: &mut dyn TxContext, keys: &[LicenseKey]) -> AppResult<()>;
    async fn find_by_id(&self, id: &LicenseKeyId) -> AppResult<Option<LicenseKey>>;
    async fn list(&self, limit: u32, offset: u32) -> AppResult<(Vec<LicenseKey>, u64)>;
    async fn count_by_status(&self, status: crate::domain::license::LicenseKeyStatus) -> AppResult<u64>;
    async fn revoke_batch(&self, ctx: &mut dyn TxContext, ids: &[LicenseKeyId]) -> AppResult<u64>;
    async fn find_by_hash_and_tenant(
        &self,
        key_hash: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<LicenseKey>>;
}

#[async_trait]
pub trait EntitlementRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, entitlement: &Entitlement) -> AppResult<()>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>>;
    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Entitlement>>;
}

#[async_trait]
pub trait SubscriptionRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, subscription: &Subscription) -> AppResult<()>;
    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Option<Subscription>>;
}

#[async_trait]
pub trait BillingAuditLogRepository: Send + Sync {
    async fn append(&self, ctx: &mut dyn TxContext, entry: &BillingAuditLog) -> AppResult<()>;
    /// Out-of-band append used by the best-effort failure-path logger (spec
    /// §5 "must not hold the request transaction open"); its own failure
    /// never propagates.
    async fn append_out_of_band(&self, entry: &BillingAuditLog) -> AppResult<()>;
    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        from: Option<DateTime<Utc>>,
        to: Option<DateTime<Utc>>,
    ) -> AppResult<Vec<BillingAuditLog>>;
}

#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, member: &Member) -> AppResult<()>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Member>>;
    async fn find_by_id(&self, tenant_id: &TenantId, member_id: &MemberId) -> AppResult<Option<Member>>;
    async fn exists_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<bool>;
}

#[async_trait]
pub trait EventRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, event: &Event) -> AppResult<()>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Event>>;
    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Event>>;
}

#[async_trait]
pub trait BusinessDayRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, business_day: &EventBusinessDay) -> AppResult<()>;
    async fn find_by_tenant_id_and_date_range(
        &self,
        tenant_id: &TenantId,
        from: chrono::NaiveDate,
        to: chrono::NaiveDate,
    ) -> AppResult<Vec<EventBusinessDay>>;
    async fn find_by_id(&self, business_day_id: &BusinessDayId) -> AppResult<Option<EventBusinessDay>>;
}

#[async_trait]
pub trait PositionRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, position: &Position) -> AppResult<()>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Position>>;
    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Position>>;
}

#[async_trait]
pub trait ShiftSlotRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, slot: &ShiftSlot) -> AppResult<()>;
    async fn find_by_business_day_id_and_slot_name(
        &self,
        business_day_id: &BusinessDayId,
        slot_name: &str,
    ) -> AppResult<Option<ShiftSlot>>;
    async fn find_by_business_day_id(&self, business_day_id: &BusinessDayId) -> AppResult<Vec<ShiftSlot>>;
}

#[async_trait]
pub trait ShiftAssignmentRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, assignment: &ShiftAssignment) -> AppResult<()>;
    async fn exists_by_slot_id_and_member_id(
        &self,
        slot_id: &ShiftSlotId,
        member_id: &MemberId,
    ) -> AppResult<bool>;
}

#[async_trait]
pub trait ImportJobRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()>;
    async fn update(&self, ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()>;
    async fn find_by_id(&self, id: &ImportJobId) -> AppResult<Option<ImportJob>>;
    async fn find_by_id_and_tenant_id(
        &self,
        id: &ImportJobId,
        tenant_id: &TenantId,
    ) -> AppResult<Option<ImportJob>>;
    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ImportJob>>;
    async fn count_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<u64>;
}

#[async_trait]
pub trait AttendanceCollectionRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, collection: &AttendanceCollection) -> AppResult<()>;
    async fn find_by_id(
        &self,
        tenant_id: &TenantId,
        id: &AttendanceCollectionId,
    ) -> AppResult<Option<AttendanceCollection>>;
    async fn find_by_token(&self, token: &str) -> AppResult<Option<AttendanceCollection>>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<AttendanceCollection>>;

    async fn upsert_response(&self, ctx: &mut dyn TxContext, response: &AttendanceResponse) -> AppResult<()>;
    async fn find_responses_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<AttendanceResponse>>;

    /// Set-difference replace preserving responses on unchanged ids (spec
    /// §4.5, §8 invariant 9). Callers build the diff via
    /// `domain::attendance_collection::diff_target_dates`.
    async fn replace_target_dates(
        &self,
        ctx: &mut dyn TxContext,
        collection_id: &AttendanceCollectionId,
        new_list: &[TargetDate],
    ) -> AppResult<()>;
    /// Unconditional wipe-and-reinsert (spec §4.5) — destroys responses
    /// attached to every existing target date. Not used by
    /// `AttendanceUseCase`; kept for completeness of the port (spec §6.1
    /// lists both `ReplaceTargetDates` and `SaveTargetDates`).
    async fn save_target_dates(
        &self,
        ctx: &mut dyn TxContext,
        collection_id: &AttendanceCollectionId,
        dates: &[TargetDate],
    ) -> AppResult<()>;
    async fn find_target_dates_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<TargetDate>>;

    async fn save_group_assignments(
        &self,
        ctx: &mut dyn TxContext,
        assignments: &[CollectionGroupAssignment],
    ) -> AppResult<()>;
    async fn save_role_assignments(
        &self,
        ctx: &mut dyn TxContext,
        assignments: &[CollectionRoleAssignment],
    ) -> AppResult<()>;
    async fn find_group_assignments_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<CollectionGroupAssignment>>;
    async fn find_role_assignments_by_collection_id(
        &self,
        collection_id: &AttendanceCollectionId,
    ) -> AppResult<Vec<CollectionRoleAssignment>>;
}

#[async_trait]
pub trait DateScheduleRepository: Send + Sync {
    async fn save(&self, ctx: &mut dyn TxContext, schedule: &DateSchedule) -> AppResult<()>;
    async fn find_by_id(&self, tenant_id: &TenantId, id: &DateScheduleId) -> AppResult<Option<DateSchedule>>;
    async fn find_by_token(&self, token: &str) -> AppResult<Option<DateSchedule>>;
    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<DateSchedule>>;

    async fn save_candidates(
        &self,
        ctx: &mut dyn TxContext,
        schedule_id: &DateScheduleId,
        candidates: &[CandidateDate],
    ) -> AppResult<()>;
    async fn find_candidates_by_schedule_id(
        &self,
        schedule_id: &DateScheduleId,
    ) -> AppResult<Vec<CandidateDate>>;

    async fn upsert_response(&self, ctx: &mut dyn TxContext, response: &ScheduleResponse) -> AppResult<()>;
    async fn find_responses_by_schedule_id(
        &self,
        schedule_id: &DateScheduleId,
    ) -> AppResult<Vec<ScheduleResponse>>;
}
