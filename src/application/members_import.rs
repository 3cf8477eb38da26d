//! Members-CSV import use case (SPEC_FULL §4.8): companion to the
//! actual-attendance importer, sharing `ImportJob` and the CSV parser.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use log::{info, warn};

use crate::application::ports::{with_tx, ImportJobRepository, MemberRepository, TxContext, TxManager};
use crate::clock::Clock;
use crate::csv;
use crate::domain::import_job::{ImportJob, ImportOptions, ImportType};
use crate::domain::member::Member;
use crate::error::AppResult;
use crate::id::{AdminId, TenantId};

const REQUIRED_COLUMNS: [&str; 1] = ["name"];
const ROW_LIMIT: usize = super::actual_attendance_import::ROW_LIMIT;

pub struct MembersImportInput {
    pub tenant_id: TenantId,
    pub actor_admin_id: AdminId,
    pub file_name: String,
    pub raw_bytes: Vec<u8>,
    pub options: ImportOptions,
}

pub struct ImportMembersUseCase {
    import_jobs: Arc<dyn ImportJobRepository>,
    members: Arc<dyn MemberRepository>,
    tx_manager: Arc<dyn TxManager>,
    clock: Arc<dyn Clock>,
}

impl ImportMembersUseCase {
    pub fn new(
        import_jobs: Arc<dyn ImportJobRepository>,
        members: Arc<dyn MemberRepository>,
        tx_manager: Arc<dyn TxManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ImportMembersUseCase {
            import_jobs,
            members,
            tx_manager,
            clock,
        }
    }

    /// Runs job creation, parse, row-cap check, per-row processing, and
    /// completion inside one transactional boundary (spec §1, §5), the same
    /// way `ActualAttendanceImportUseCase::execute` does.
    pub async fn execute(&self, input: MembersImportInput) -> AppResult<ImportJob> {
        let now = self.clock.now();
        let input = Arc::new(input);
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let input = input.clone();
            Box::pin(async move { self.run(ctx, &input, now).await })
        })
        .await
    }

    async fn run(
        &self,
        ctx: &mut dyn TxContext,
        input: &MembersImportInput,
        now: DateTime<Utc>,
    ) -> AppResult<ImportJob> {
        let mut job = ImportJob::new(
            input.tenant_id.clone(),
            input.actor_admin_id.clone(),
            ImportType::Members,
            &input.file_name,
            input.options.clone(),
            now,
        );
        self.import_jobs.save(ctx, &job).await?;

        let parsed = match csv::parse(&input.raw_bytes, &REQUIRED_COLUMNS) {
            Ok(parsed) => parsed,
            Err(err) => return self.fail_and_commit(ctx, &mut job, format!("CSVの読み込みに失敗しました: {err}"), now).await,
        };

        if parsed.count_rows() > ROW_LIMIT {
            return self
                .fail_and_commit(
                    ctx,
                    &mut job,
                    format!("行数 {} が上限 {ROW_LIMIT} を超えています", parsed.count_rows()),
                    now,
                )
                .await;
        }

        job.start(parsed.count_rows() as u32, now)?;
        self.import_jobs.update(ctx, &job).await?;

        for row in parsed.rows() {
            let Some(name) = row.get_non_empty("name") else {
                job.record_error(row.row_number, "nameは必須です");
                continue;
            };
            let display_name = row.get_non_empty("display_name").unwrap_or(name).to_string();
            let note = row.get_non_empty("note").map(|s| s.to_string());

            match self.members.exists_by_name(&input.tenant_id, name).await {
                Ok(true) => {
                    // Members CSV has no `skip_existing` flag: a duplicate
                    // *name* is always a skip, never an error, since admins
                    // re-upload full rosters repeatedly.
                    job.record_skip();
                }
                Ok(false) => {
                    match Member::new(input.tenant_id.clone(), name, display_name, note, now) {
                        Ok(member) => match self.members.save(ctx, &member).await {
                            Ok(()) => job.record_success(),
                            Err(e) => job.record_error(row.row_number, e.to_string()),
                        },
                        Err(e) => job.record_error(row.row_number, e.to_string()),
                    }
                }
                Err(e) => job.record_error(row.row_number, e.to_string()),
            }
        }

        job.complete(now)?;
        self.import_jobs.update(ctx, &job).await?;
        info!(
            "members import {} completed: success={} error={} skipped={}",
            job.id, job.success_count, job.error_count, job.skip_count
        );
        Ok(job)
    }

    /// On parse/row-cap failure: `Fail(reason)` and commit the synthesized
    /// snapshot rather than rolling the transaction back (spec §4.3 step 2).
    async fn fail_and_commit(
        &self,
        ctx: &mut dyn TxContext,
        job: &mut ImportJob,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<ImportJob> {
        let reason = reason.into();
        warn!("members import {} failed: {reason}", job.id);
        job.fail(reason, now)?;
        self.import_jobs.update(ctx, job).await?;
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::import_job::ImportStatus;
    use crate::infra::in_memory::{InMemoryImportJobRepository, InMemoryMemberRepository, InMemoryTxManager};

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    fn build_use_case() -> (ImportMembersUseCase, TenantId) {
        let tenant_id = TenantId::generate();
        let use_case = ImportMembersUseCase::new(
            Arc::new(InMemoryImportJobRepository::new()),
            Arc::new(InMemoryMemberRepository::new()),
            Arc::new(InMemoryTxManager::new()),
            Arc::new(crate::clock::FixedClock::new(now())),
        );
        (use_case, tenant_id)
    }

    fn csv_bytes(body: &str) -> Vec<u8> {
        format!("name,display_name,note\n{body}").into_bytes()
    }

    // Re-uploading the same roster is always a skip, never an error — the
    // CSV has no `skip_existing` flag of its own (members-CSV idempotence).
    #[tokio::test]
    async fn reupload_of_same_name_is_skipped_not_errored() {
        let (use_case, tenant_id) = build_use_case();

        let first = use_case
            .execute(MembersImportInput {
                tenant_id: tenant_id.clone(),
                actor_admin_id: AdminId::generate(),
                file_name: "members.csv".to_string(),
                raw_bytes: csv_bytes("たろう,,\n"),
                options: ImportOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(first.status, ImportStatus::Completed);
        assert_eq!(first.success_count, 1);
        assert_eq!(first.skip_count, 0);

        let second = use_case
            .execute(MembersImportInput {
                tenant_id,
                actor_admin_id: AdminId::generate(),
                file_name: "members.csv".to_string(),
                raw_bytes: csv_bytes("たろう,,\n"),
                options: ImportOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(second.status, ImportStatus::Completed);
        assert_eq!(second.success_count, 0);
        assert_eq!(second.skip_count, 1);
        assert_eq!(second.error_count, 0);
    }

    #[tokio::test]
    async fn missing_name_is_a_row_error() {
        let (use_case, tenant_id) = build_use_case();

        let job = use_case
            .execute(MembersImportInput {
                tenant_id,
                actor_admin_id: AdminId::generate(),
                file_name: "members.csv".to_string(),
                raw_bytes: csv_bytes(",表示名だけ,\n"),
                options: ImportOptions::default(),
            })
            .await
            .unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.success_count, 0);
        assert_eq!(job.error_count, 1);
    }
}
