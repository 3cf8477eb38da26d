//! Postgres-backed repository adapters, gated behind the
//! `postgres-repositories` feature (spec §5, §6.1). Grounded on the
//! teacher's `PostgresRuntimeRepository` (pool construction, unique-
//! violation mapping) but expressed natively async: this crate's ports
//! are already `async_trait`, so there is no need for the teacher's
//! dedicated bridging runtime.
//!
//! `AttendanceCollectionRepository` and `DateScheduleRepository` have no
//! Postgres adapter here — see DESIGN.md for why; use `infra::in_memory`
//! for those two until one is added.

mod admin_repo;
mod billing_repo;
mod import_job_repo;
mod license_repo;
mod shift_data_repo;
mod tenant_repo;
mod tx;

pub use admin_repo::PostgresAdminRepository;
pub use billing_repo::{
    PostgresBillingAuditLogRepository, PostgresEntitlementRepository, PostgresSubscriptionRepository,
};
pub use import_job_repo::PostgresImportJobRepository;
pub use license_repo::PostgresLicenseKeyRepository;
pub use shift_data_repo::{
    PostgresBusinessDayRepository, PostgresEventRepository, PostgresMemberRepository,
    PostgresPositionRepository, PostgresShiftAssignmentRepository, PostgresShiftSlotRepository,
};
pub use tenant_repo::PostgresTenantRepository;
pub use tx::{PgTxContext, PostgresTxManager};

use sqlx::postgres::PgPoolOptions;
use sqlx::PgPool;

/// Opens a connection pool the way the teacher's
/// `PostgresRuntimeRepository::new` does: bounded max connections, no
/// retry loop here (the caller decides whether a failed connect is
/// fatal at startup).
pub async fn connect(database_url: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new().max_connections(10).connect(database_url).await
}

fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505"))
}

fn map_sqlx_err(context: &str, err: sqlx::Error) -> crate::error::AppError {
    crate::error::AppError::infrastructure(context, err)
}
