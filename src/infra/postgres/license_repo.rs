use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{LicenseKeyRepository, TxContext};
use crate::domain::license::{LicenseKey, LicenseKeyStatus};
use crate::error::AppResult;
use crate::id::{LicenseKeyId, TenantId};

pub struct PostgresLicenseKeyRepository {
    pool: PgPool,
}

impl PostgresLicenseKeyRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresLicenseKeyRepository { pool }
    }
}

fn status_label(status: LicenseKeyStatus) -> &'static str {
    match status {
        LicenseKeyStatus::Unused => "unused",
        LicenseKeyStatus::Used => "used",
        LicenseKeyStatus::Revoked => "revoked",
    }
}

/// Unrecognized values fold to `Revoked` rather than panicking — a
/// corrupted status should never be silently treated as claimable.
fn parse_status(label: &str) -> LicenseKeyStatus {
    match label {
        "unused" => LicenseKeyStatus::Unused,
        "used" => LicenseKeyStatus::Used,
        "revoked" => LicenseKeyStatus::Revoked,
        _ => LicenseKeyStatus::Revoked,
    }
}

fn row_to_key(row: &sqlx::postgres::PgRow) -> LicenseKey {
    LicenseKey {
        id: LicenseKeyId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        key_hash: row.get("key_hash"),
        status: parse_status(row.get::<String, _>("status").as_str()),
        used_by_tenant_id: row
            .get::<Option<String>, _>("used_by_tenant_id")
            .map(|s| TenantId::parse(s).expect("stored id is a valid SID")),
        used_at: row.get("used_at"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl LicenseKeyRepository for PostgresLicenseKeyRepository {
    /// Holds the row lock until the enclosing transaction commits or rolls
    /// back (spec §5 concurrency boundary), so two concurrent claims on the
    /// same key serialize instead of racing.
    async fn find_by_hash_for_update(
        &self,
        ctx: &mut dyn TxContext,
        key_hash: &str,
    ) -> AppResult<Option<LicenseKey>> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query("SELECT * FROM license_keys WHERE key_hash = $1 FOR UPDATE")
            .bind(key_hash)
            .fetch_optional(&mut **tx)
            .await
            .map(|row| row.as_ref().map(row_to_key))
            .map_err(|e| map_sqlx_err("find license key for update", e))
    }

    async fn save(&self, ctx: &mut dyn TxContext, key: &LicenseKey) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO license_keys (id, key_hash, status, used_by_tenant_id, used_at, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7) \
             ON CONFLICT (id) DO UPDATE SET \
             status = EXCLUDED.status, used_by_tenant_id = EXCLUDED.used_by_tenant_id, \
             used_at = EXCLUDED.used_at, updated_at = EXCLUDED.updated_at",
        )
        .bind(key.id.as_str())
        .bind(&key.key_hash)
        .bind(status_label(key.status))
        .bind(key.used_by_tenant_id.as_ref().map(|t| t.as_str().to_string()))
        .bind(key.used_at)
        .bind(key.created_at)
        .bind(key.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save license key", e))?;
        Ok(())
    }

    async fn save_batch(&self, ctx: &mut dyn TxContext, keys: &[LicenseKey]) -> AppResult<()> {
        for key in keys {
            self.save(ctx, key).await?;
        }
        Ok(())
    }

    async fn find_by_id(&self, id: &LicenseKeyId) -> AppResult<Option<LicenseKey>> {
        sqlx::query("SELECT * FROM license_keys WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_key))
            .map_err(|e| map_sqlx_err("find license key by id", e))
    }

    async fn list(&self, limit: u32, offset: u32) -> AppResult<(Vec<LicenseKey>, u64)> {
        let rows = sqlx::query("SELECT * FROM license_keys ORDER BY created_at ASC LIMIT $1 OFFSET $2")
            .bind(limit as i64)
            .bind(offset as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("list license keys", e))?;
        let total: i64 = sqlx::query_scalar("SELECT count(*) FROM license_keys")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("count license keys", e))?;
        Ok((rows.iter().map(row_to_key).collect(), total as u64))
    }

    async fn count_by_status(&self, status: LicenseKeyStatus) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM license_keys WHERE status = $1")
            .bind(status_label(status))
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("count license keys by status", e))?;
        Ok(count as u64)
    }

    async fn revoke_batch(&self, ctx: &mut dyn TxContext, ids: &[LicenseKeyId]) -> AppResult<u64> {
        let tx = PgTxContext::from_ctx(ctx);
        let id_strings: Vec<String> = ids.iter().map(|id| id.as_str().to_string()).collect();
        let result = sqlx::query(
            "UPDATE license_keys SET status = 'revoked', updated_at = now() WHERE id = ANY($1)",
        )
        .bind(&id_strings)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("revoke license keys", e))?;
        Ok(result.rows_affected())
    }

    async fn find_by_hash_and_tenant(
        &self,
        key_hash: &str,
        tenant_id: &TenantId,
    ) -> AppResult<Option<LicenseKey>> {
        sqlx::query("SELECT * FROM license_keys WHERE key_hash = $1 AND used_by_tenant_id = $2")
            .bind(key_hash)
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_key))
            .map_err(|e| map_sqlx_err("find license key by hash and tenant", e))
    }
}
