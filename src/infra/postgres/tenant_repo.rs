use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{TenantRepository, TxContext};
use crate::domain::tenant::{Tenant, TenantStatus};
use crate::error::AppResult;
use crate::id::TenantId;

pub struct PostgresTenantRepository {
    pool: PgPool,
}

impl PostgresTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresTenantRepository { pool }
    }
}

fn status_label(status: TenantStatus) -> &'static str {
    match status {
        TenantStatus::PendingPayment => "pending_payment",
        TenantStatus::Active => "active",
        TenantStatus::Grace => "grace",
        TenantStatus::Suspended => "suspended",
    }
}

/// Unrecognized values fold to `Suspended` rather than panicking — a
/// corrupted or future-version status should never be silently treated as
/// a more permissive one.
fn parse_status(label: &str) -> TenantStatus {
    match label {
        "pending_payment" => TenantStatus::PendingPayment,
        "active" => TenantStatus::Active,
        "grace" => TenantStatus::Grace,
        "suspended" => TenantStatus::Suspended,
        _ => TenantStatus::Suspended,
    }
}

fn row_to_tenant(row: &sqlx::postgres::PgRow) -> Tenant {
    Tenant {
        id: TenantId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_name: row.get("tenant_name"),
        timezone: row.get("timezone"),
        status: parse_status(row.get::<String, _>("status").as_str()),
        grace_until: row.get("grace_until"),
        pending_expires_at: row.get("pending_expires_at"),
        pending_stripe_session_id: row.get("pending_stripe_session_id"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

#[async_trait]
impl TenantRepository for PostgresTenantRepository {
    async fn find_by_id(&self, tenant_id: &TenantId) -> AppResult<Option<Tenant>> {
        sqlx::query("SELECT * FROM tenants WHERE id = $1")
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_tenant))
            .map_err(|e| map_sqlx_err("find tenant by id", e))
    }

    async fn find_by_pending_stripe_session_id(&self, session_id: &str) -> AppResult<Option<Tenant>> {
        sqlx::query("SELECT * FROM tenants WHERE pending_stripe_session_id = $1")
            .bind(session_id)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_tenant))
            .map_err(|e| map_sqlx_err("find tenant by pending stripe session", e))
    }

    async fn save(&self, ctx: &mut dyn TxContext, tenant: &Tenant) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO tenants (id, tenant_name, timezone, status, grace_until, \
             pending_expires_at, pending_stripe_session_id, created_at, updated_at, deleted_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10) \
             ON CONFLICT (id) DO UPDATE SET \
             tenant_name = EXCLUDED.tenant_name, timezone = EXCLUDED.timezone, \
             status = EXCLUDED.status, grace_until = EXCLUDED.grace_until, \
             pending_expires_at = EXCLUDED.pending_expires_at, \
             pending_stripe_session_id = EXCLUDED.pending_stripe_session_id, \
             updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at",
        )
        .bind(tenant.id.as_str())
        .bind(&tenant.tenant_name)
        .bind(&tenant.timezone)
        .bind(status_label(tenant.status))
        .bind(tenant.grace_until)
        .bind(tenant.pending_expires_at)
        .bind(&tenant.pending_stripe_session_id)
        .bind(tenant.created_at)
        .bind(tenant.updated_at)
        .bind(tenant.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save tenant", e))?;
        Ok(())
    }

    async fn list_all(
        &self,
        status: Option<TenantStatus>,
        limit: u32,
        offset: u32,
    ) -> AppResult<(Vec<Tenant>, u64)> {
        let status_label = status.map(status_label);
        let rows = sqlx::query(
            "SELECT * FROM tenants WHERE $1::text IS NULL OR status = $1 \
             ORDER BY created_at ASC LIMIT $2 OFFSET $3",
        )
        .bind(status_label)
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("list tenants", e))?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM tenants WHERE $1::text IS NULL OR status = $1")
            .bind(status_label)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("count tenants", e))?;
        Ok((rows.iter().map(row_to_tenant).collect(), total as u64))
    }
}
