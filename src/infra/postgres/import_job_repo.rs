use async_trait::async_trait;
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{ImportJobRepository, TxContext};
use crate::domain::import_job::{ImportJob, ImportRowError, ImportStatus, ImportType};
use crate::error::AppResult;
use crate::id::{AdminId, ImportJobId, TenantId};

pub struct PostgresImportJobRepository {
    pool: PgPool,
}

impl PostgresImportJobRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresImportJobRepository { pool }
    }
}

fn import_type_label(t: ImportType) -> &'static str {
    match t {
        ImportType::ActualAttendance => "actual_attendance",
        ImportType::Members => "members",
    }
}

/// Unrecognized values fold to `ActualAttendance` rather than panicking.
fn parse_import_type(label: &str) -> ImportType {
    match label {
        "actual_attendance" => ImportType::ActualAttendance,
        "members" => ImportType::Members,
        _ => ImportType::ActualAttendance,
    }
}

fn status_label(status: ImportStatus) -> &'static str {
    match status {
        ImportStatus::Pending => "pending",
        ImportStatus::Processing => "processing",
        ImportStatus::Completed => "completed",
        ImportStatus::Failed => "failed",
    }
}

/// Unrecognized values fold to `Failed` rather than panicking — a
/// corrupted status should never be silently treated as still in flight
/// or already completed.
fn parse_status(label: &str) -> ImportStatus {
    match label {
        "pending" => ImportStatus::Pending,
        "processing" => ImportStatus::Processing,
        "completed" => ImportStatus::Completed,
        "failed" => ImportStatus::Failed,
        _ => ImportStatus::Failed,
    }
}

fn row_to_job(row: &sqlx::postgres::PgRow) -> ImportJob {
    let options: serde_json::Value = row.get("options_json");
    let errors: serde_json::Value = row.get("errors_json");
    ImportJob {
        id: ImportJobId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        created_by: AdminId::parse(row.get::<String, _>("created_by")).expect("stored id is a valid SID"),
        import_type: parse_import_type(row.get::<String, _>("import_type").as_str()),
        status: parse_status(row.get::<String, _>("status").as_str()),
        file_name: row.get("file_name"),
        options: serde_json::from_value(options).expect("stored options_json is well-formed"),
        total_rows: row.get::<i32, _>("total_rows") as u32,
        success_count: row.get::<i32, _>("success_count") as u32,
        skip_count: row.get::<i32, _>("skip_count") as u32,
        error_count: row.get::<i32, _>("error_count") as u32,
        errors: serde_json::from_value::<Vec<ImportRowError>>(errors).expect("stored errors_json is well-formed"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        completed_at: row.get("completed_at"),
    }
}

impl PostgresImportJobRepository {
    async fn upsert(&self, ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        let options_json =
            serde_json::to_value(&job.options).expect("ImportOptions always serializes");
        let errors_json = serde_json::to_value(&job.errors).expect("ImportRowError always serializes");
        sqlx::query(
            "INSERT INTO import_jobs \
             (id, tenant_id, created_by, import_type, status, file_name, options_json, \
              total_rows, success_count, skip_count, error_count, errors_json, \
              created_at, updated_at, completed_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15) \
             ON CONFLICT (id) DO UPDATE SET \
             status = EXCLUDED.status, total_rows = EXCLUDED.total_rows, \
             success_count = EXCLUDED.success_count, skip_count = EXCLUDED.skip_count, \
             error_count = EXCLUDED.error_count, errors_json = EXCLUDED.errors_json, \
             updated_at = EXCLUDED.updated_at, completed_at = EXCLUDED.completed_at",
        )
        .bind(job.id.as_str())
        .bind(job.tenant_id.as_str())
        .bind(job.created_by.as_str())
        .bind(import_type_label(job.import_type))
        .bind(status_label(job.status))
        .bind(&job.file_name)
        .bind(options_json)
        .bind(job.total_rows as i32)
        .bind(job.success_count as i32)
        .bind(job.skip_count as i32)
        .bind(job.error_count as i32)
        .bind(errors_json)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.completed_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save import job", e))?;
        Ok(())
    }
}

#[async_trait]
impl ImportJobRepository for PostgresImportJobRepository {
    async fn save(&self, ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()> {
        self.upsert(ctx, job).await
    }

    async fn update(&self, ctx: &mut dyn TxContext, job: &ImportJob) -> AppResult<()> {
        self.upsert(ctx, job).await
    }

    async fn find_by_id(&self, id: &ImportJobId) -> AppResult<Option<ImportJob>> {
        sqlx::query("SELECT * FROM import_jobs WHERE id = $1")
            .bind(id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_job))
            .map_err(|e| map_sqlx_err("find import job by id", e))
    }

    async fn find_by_id_and_tenant_id(
        &self,
        id: &ImportJobId,
        tenant_id: &TenantId,
    ) -> AppResult<Option<ImportJob>> {
        sqlx::query("SELECT * FROM import_jobs WHERE id = $1 AND tenant_id = $2")
            .bind(id.as_str())
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_job))
            .map_err(|e| map_sqlx_err("find import job by id and tenant", e))
    }

    async fn find_by_tenant_id(
        &self,
        tenant_id: &TenantId,
        limit: u32,
        offset: u32,
    ) -> AppResult<Vec<ImportJob>> {
        sqlx::query(
            "SELECT * FROM import_jobs WHERE tenant_id = $1 ORDER BY created_at DESC LIMIT $2 OFFSET $3",
        )
        .bind(tenant_id.as_str())
        .bind(limit as i64)
        .bind(offset as i64)
        .fetch_all(&self.pool)
        .await
        .map(|rows| rows.iter().map(row_to_job).collect())
        .map_err(|e| map_sqlx_err("find import jobs by tenant", e))
    }

    async fn count_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<u64> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM import_jobs WHERE tenant_id = $1")
            .bind(tenant_id.as_str())
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("count import jobs by tenant", e))?;
        Ok(count as u64)
    }
}
