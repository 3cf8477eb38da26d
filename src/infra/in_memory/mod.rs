//! In-memory repository adapters: always-available test doubles used by
//! use-case unit tests and by any caller that doesn't need real
//! persistence (spec §9 "mocks implement only the methods touched" —
//! here we implement the full port once and reuse it everywhere).
//!
//! None of these types hold a real transaction: every map is behind its
//! own `tokio::sync::Mutex` and each operation is already atomic, so
//! `InMemoryTxContext` is a no-op marker. A real adapter (see
//! `infra::postgres`) needs the boundary; this one doesn't.

mod admin_repo;
mod attendance_repo;
mod billing_repo;
mod import_job_repo;
mod license_repo;
mod password_hasher;
mod schedule_repo;
mod shift_data_repo;
mod tenant_repo;
mod tx;

pub use admin_repo::InMemoryAdminRepository;
pub use attendance_repo::InMemoryAttendanceCollectionRepository;
pub use billing_repo::{InMemoryBillingAuditLogRepository, InMemoryEntitlementRepository, InMemorySubscriptionRepository};
pub use import_job_repo::InMemoryImportJobRepository;
pub use license_repo::InMemoryLicenseKeyRepository;
pub use password_hasher::InMemoryPasswordHasher;
pub use schedule_repo::InMemoryDateScheduleRepository;
pub use shift_data_repo::{
    InMemoryBusinessDayRepository, InMemoryEventRepository, InMemoryMemberRepository,
    InMemoryPositionRepository, InMemoryShiftAssignmentRepository, InMemoryShiftSlotRepository,
};
pub use tenant_repo::InMemoryTenantRepository;
pub use tx::{InMemoryTxContext, InMemoryTxManager};
