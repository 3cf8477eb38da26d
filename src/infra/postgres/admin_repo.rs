use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{AdminRepository, TxContext};
use crate::domain::admin::{Admin, AdminRole};
use crate::error::AppResult;
use crate::id::{AdminId, TenantId};

pub struct PostgresAdminRepository {
    pool: PgPool,
}

impl PostgresAdminRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresAdminRepository { pool }
    }
}

fn role_label(role: AdminRole) -> &'static str {
    match role {
        AdminRole::Owner => "owner",
        AdminRole::Manager => "manager",
    }
}

/// Unrecognized values fold to `Manager` rather than panicking — a
/// corrupted role should never be silently treated as the more
/// privileged `Owner`.
fn parse_role(label: &str) -> AdminRole {
    match label {
        "owner" => AdminRole::Owner,
        "manager" => AdminRole::Manager,
        _ => AdminRole::Manager,
    }
}

fn row_to_admin(row: &sqlx::postgres::PgRow) -> Admin {
    Admin {
        id: AdminId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        email: row.get("email"),
        password_hash: row.get("password_hash"),
        display_name: row.get("display_name"),
        role: parse_role(row.get::<String, _>("role").as_str()),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl AdminRepository for PostgresAdminRepository {
    async fn save(&self, ctx: &mut dyn TxContext, admin: &Admin) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO admins (id, tenant_id, email, password_hash, display_name, role, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8) \
             ON CONFLICT (id) DO UPDATE SET \
             email = EXCLUDED.email, password_hash = EXCLUDED.password_hash, \
             display_name = EXCLUDED.display_name, role = EXCLUDED.role, updated_at = EXCLUDED.updated_at",
        )
        .bind(admin.id.as_str())
        .bind(admin.tenant_id.as_str())
        .bind(&admin.email)
        .bind(&admin.password_hash)
        .bind(&admin.display_name)
        .bind(role_label(admin.role))
        .bind(admin.created_at)
        .bind(admin.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save admin", e))?;
        Ok(())
    }

    async fn find_by_id(&self, admin_id: &AdminId) -> AppResult<Option<Admin>> {
        sqlx::query("SELECT * FROM admins WHERE id = $1")
            .bind(admin_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_admin))
            .map_err(|e| map_sqlx_err("find admin by id", e))
    }

    async fn find_by_email_global(&self, email: &str) -> AppResult<Option<Admin>> {
        sqlx::query("SELECT * FROM admins WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_admin))
            .map_err(|e| map_sqlx_err("find admin by email", e))
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>> {
        sqlx::query("SELECT * FROM admins WHERE tenant_id = $1 ORDER BY created_at ASC")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_admin).collect())
            .map_err(|e| map_sqlx_err("find admins by tenant", e))
    }

    // Admins are hard-deleted (spec §4.9), so every present row is active.
    async fn find_active_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Admin>> {
        self.find_by_tenant_id(tenant_id).await
    }

    async fn delete(&self, ctx: &mut dyn TxContext, admin_id: &AdminId) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query("DELETE FROM admins WHERE id = $1")
            .bind(admin_id.as_str())
            .execute(&mut **tx)
            .await
            .map_err(|e| map_sqlx_err("delete admin", e))?;
        Ok(())
    }

    async fn exists_by_email_global(&self, email: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM admins WHERE lower(email) = lower($1)")
            .bind(email)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("check admin email existence", e))?;
        Ok(count > 0)
    }
}
