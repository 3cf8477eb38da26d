//! ImportJob aggregate (spec §4.3, §6.2): tracks one CSV bulk-import run
//! (actual-attendance or members) end to end, including per-row errors.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{AdminId, ImportJobId, TenantId};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportType {
    ActualAttendance,
    Members,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ImportStatus {
    Pending,
    Processing,
    Completed,
    Failed,
}

/// Per-row failure recorded during a run (spec §4.3 step 9).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportRowError {
    pub row_number: u32,
    pub message: String,
}

/// Matches the `options` JSON documented in spec §6.2. `fuzzy_member_match`
/// is the wire name; `Members` import code also reads it via the
/// `fuzzy_match` alias some older clients still send.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ImportOptions {
    pub skip_existing: bool,
    pub update_existing: bool,
    pub default_role_ids: Vec<String>,
    pub default_group_ids: Vec<String>,
    pub create_missing_events: bool,
    pub create_missing_slots: bool,
    #[serde(alias = "fuzzy_match")]
    pub fuzzy_member_match: bool,
    pub default_event_id: Option<String>,
    pub create_missing_business_days: bool,
}

impl Default for ImportOptions {
    fn default() -> Self {
        ImportOptions {
            skip_existing: false,
            update_existing: false,
            default_role_ids: Vec::new(),
            default_group_ids: Vec::new(),
            create_missing_events: false,
            create_missing_slots: false,
            fuzzy_member_match: false,
            default_event_id: None,
            create_missing_business_days: false,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ImportJob {
    pub id: ImportJobId,
    pub tenant_id: TenantId,
    pub created_by: AdminId,
    pub import_type: ImportType,
    pub status: ImportStatus,
    pub file_name: String,
    pub options: ImportOptions,
    pub total_rows: u32,
    pub success_count: u32,
    pub skip_count: u32,
    pub error_count: u32,
    pub errors: Vec<ImportRowError>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
}

impl ImportJob {
    pub fn new(
        tenant_id: TenantId,
        created_by: AdminId,
        import_type: ImportType,
        file_name: impl Into<String>,
        options: ImportOptions,
        now: DateTime<Utc>,
    ) -> Self {
        ImportJob {
            id: ImportJobId::generate(),
            tenant_id,
            created_by,
            import_type,
            status: ImportStatus::Pending,
            file_name: file_name.into(),
            options,
            total_rows: 0,
            success_count: 0,
            skip_count: 0,
            error_count: 0,
            errors: Vec::new(),
            created_at: now,
            updated_at: now,
            completed_at: None,
        }
    }

    pub fn start(&mut self, total_rows: u32, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ImportStatus::Pending {
            return Err(AppError::invariant(
                "インポートジョブは保留中の状態からのみ開始できます",
            ));
        }
        self.status = ImportStatus::Processing;
        self.total_rows = total_rows;
        self.updated_at = now;
        Ok(())
    }

    pub fn record_success(&mut self) {
        self.success_count += 1;
    }

    pub fn record_skip(&mut self) {
        self.skip_count += 1;
    }

    pub fn record_error(&mut self, row_number: u32, message: impl Into<String>) {
        self.error_count += 1;
        self.errors.push(ImportRowError {
            row_number,
            message: message.into(),
        });
    }

    /// Every row must land in exactly one bucket (spec §8 invariant:
    /// "success_count + skip_count + error_count == total_rows on
    /// completion").
    pub fn processed_count(&self) -> u32 {
        self.success_count + self.skip_count + self.error_count
    }

    pub fn complete(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ImportStatus::Processing {
            return Err(AppError::invariant(
                "インポートジョブは処理中の状態からのみ完了できます",
            ));
        }
        self.status = ImportStatus::Completed;
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }

    /// A job can fail from `pending` (e.g. the file itself didn't parse) or
    /// from `processing` (an infrastructure error mid-run); it never fails
    /// from a terminal state.
    pub fn fail(&mut self, reason: impl Into<String>, now: DateTime<Utc>) -> AppResult<()> {
        if matches!(self.status, ImportStatus::Completed | ImportStatus::Failed) {
            return Err(AppError::invariant(
                "すでに終了状態のインポートジョブを失敗として扱うことはできません",
            ));
        }
        self.status = ImportStatus::Failed;
        self.error_count += 1;
        self.errors.push(ImportRowError {
            row_number: 0,
            message: reason.into(),
        });
        self.updated_at = now;
        self.completed_at = Some(now);
        Ok(())
    }
}

impl HasTimestamps for ImportJob {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn options_defaults_and_alias() {
        let opts: ImportOptions = serde_json::from_str("{\"fuzzy_match\": true}").unwrap();
        assert!(opts.fuzzy_member_match);
        assert!(!opts.skip_existing);
    }

    #[test]
    fn lifecycle_and_row_accounting() {
        let mut job = ImportJob::new(
            TenantId::generate(),
            AdminId::generate(),
            ImportType::ActualAttendance,
            "attendance.csv",
            ImportOptions::default(),
            now(),
        );
        job.start(3, now()).unwrap();
        job.record_success();
        job.record_skip();
        job.record_error(3, "member not found");
        assert_eq!(job.processed_count(), job.total_rows);
        job.complete(now()).unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert!(job.complete(now()).is_err());
    }

    #[test]
    fn fail_is_rejected_from_terminal_states() {
        let mut job = ImportJob::new(
            TenantId::generate(),
            AdminId::generate(),
            ImportType::Members,
            "members.csv",
            ImportOptions::default(),
            now(),
        );
        job.start(0, now()).unwrap();
        job.complete(now()).unwrap();
        assert!(job.fail("late failure", now()).is_err());
    }
}
