//! Actual-attendance CSV import use case (spec §4.3, C7 + C8): the
//! highest-complexity pipeline in the core — parse, prefetch, resolve,
//! create-on-demand, and classify every row under one transaction.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};
use log::{info, warn};

use crate::application::ports::{
    with_tx, BusinessDayRepository, EventRepository, ImportJobRepository, MemberRepository,
    PositionRepository, ShiftAssignmentRepository, ShiftSlotRepository, TxContext, TxManager,
};
use crate::clock::Clock;
use crate::csv::{self, MatchKind, MemberMatcher};
use crate::domain::import_job::{ImportJob, ImportOptions, ImportType};
use crate::domain::shift::{validate_time_of_day, validate_time_range, ShiftAssignment, ShiftSlot, DEFAULT_SLOT_NAME};
use crate::error::AppResult;
use crate::id::{AdminId, BusinessDayId, EventId, MemberId, TenantId};

pub const ROW_LIMIT: usize = 10_000;
const REQUIRED_COLUMNS: [&str; 2] = ["date", "member_name"];

enum RowOutcome {
    Success,
    Skipped,
}

pub struct ActualAttendanceImportInput {
    pub tenant_id: TenantId,
    pub actor_admin_id: AdminId,
    pub file_name: String,
    pub raw_bytes: Vec<u8>,
    pub options: ImportOptions,
}

pub struct ActualAttendanceImportUseCase {
    import_jobs: Arc<dyn ImportJobRepository>,
    members: Arc<dyn MemberRepository>,
    events: Arc<dyn EventRepository>,
    business_days: Arc<dyn BusinessDayRepository>,
    positions: Arc<dyn PositionRepository>,
    shift_slots: Arc<dyn ShiftSlotRepository>,
    shift_assignments: Arc<dyn ShiftAssignmentRepository>,
    tx_manager: Arc<dyn TxManager>,
    clock: Arc<dyn Clock>,
}

impl ActualAttendanceImportUseCase {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        import_jobs: Arc<dyn ImportJobRepository>,
        members: Arc<dyn MemberRepository>,
        events: Arc<dyn EventRepository>,
        business_days: Arc<dyn BusinessDayRepository>,
        positions: Arc<dyn PositionRepository>,
        shift_slots: Arc<dyn ShiftSlotRepository>,
        shift_assignments: Arc<dyn ShiftAssignmentRepository>,
        tx_manager: Arc<dyn TxManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ActualAttendanceImportUseCase {
            import_jobs,
            members,
            events,
            business_days,
            positions,
            shift_slots,
            shift_assignments,
            tx_manager,
            clock,
        }
    }

    /// Runs the entire import — job creation, parse, row-cap check,
    /// per-row processing, and completion — inside one transactional
    /// boundary (spec §1, §5): a mid-run infrastructure failure rolls the
    /// whole run back rather than leaving partially-committed assignments
    /// with the job stuck in `processing`. Per-row errors are not
    /// infrastructure failures: they are folded into the job's own error
    /// list and the transaction still commits with the job `completed` (or,
    /// for a pre-start parse/row-cap failure, `failed`).
    pub async fn execute(&self, input: ActualAttendanceImportInput) -> AppResult<ImportJob> {
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
        input: &ActualAttendanceImportInput,
        now: DateTime<Utc>,
    ) -> AppResult<ImportJob> {
        let mut job = ImportJob::new(
            input.tenant_id.clone(),
            input.actor_admin_id.clone(),
            ImportType::ActualAttendance,
            &input.file_name,
            input.options.clone(),
            now,
        );
        self.import_jobs.save(ctx, &job).await?;

        // Step 2: parse.
        let parsed = match csv::parse(&input.raw_bytes, &REQUIRED_COLUMNS) {
            Ok(parsed) => parsed,
            Err(err) => return self.fail_and_commit(ctx, &mut job, format!("CSVの読み込みに失敗しました: {err}"), now).await,
        };

        // Step 3: row cap (spec §8 boundary: 10000 accepted, 10001 rejected).
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

        // Step 4: start.
        job.start(parsed.count_rows() as u32, now)?;
        self.import_jobs.update(ctx, &job).await?;

        // Step 5: date range over parseable rows.
        let mut min_date: Option<NaiveDate> = None;
        let mut max_date: Option<NaiveDate> = None;
        for row in parsed.rows() {
            if let Some(date_str) = row.get_non_empty("date") {
                if let Ok(date) = NaiveDate::parse_from_str(date_str, "%Y-%m-%d") {
                    min_date = Some(min_date.map_or(date, |m| m.min(date)));
                    max_date = Some(max_date.map_or(date, |m| m.max(date)));
                }
            }
        }
        let (min_date, max_date) = match (min_date, max_date) {
            (Some(min), Some(max)) => (min, max),
            _ => {
                return self
                    .fail_and_commit(ctx, &mut job, "CSVに有効な日付がありません", now)
                    .await
            }
        };

        // Step 6: bulk prefetch.
        let members = self.members.find_by_tenant_id(&input.tenant_id).await?;
        let events = self.events.find_by_tenant_id(&input.tenant_id).await?;
        let business_days = self
            .business_days
            .find_by_tenant_id_and_date_range(&input.tenant_id, min_date, max_date)
            .await?;
        let positions = self.positions.find_by_tenant_id(&input.tenant_id).await?;

        // Step 7: lookup structures.
        let matcher = MemberMatcher::build(
            &members.iter().map(|m| (m.id.clone(), m.display_name.clone())).collect::<Vec<_>>(),
            input.options.fuzzy_member_match,
        );
        let event_by_name: HashMap<String, EventId> =
            events.iter().map(|e| (e.name.clone(), e.id.clone())).collect();
        let mut business_day_by_date_and_event: HashMap<(NaiveDate, EventId), BusinessDayId> =
            HashMap::new();
        let mut business_days_by_date: HashMap<NaiveDate, Vec<(EventId, BusinessDayId)>> = HashMap::new();
        for bd in &business_days {
            business_day_by_date_and_event.insert((bd.date, bd.event_id.clone()), bd.id.clone());
            business_days_by_date
                .entry(bd.date)
                .or_default()
                .push((bd.event_id.clone(), bd.id.clone()));
        }
        let position_by_name: HashMap<String, crate::id::PositionId> =
            positions.iter().map(|p| (p.name.clone(), p.id.clone())).collect();

        // Step 8: per-row processing, deterministic in input order. A
        // row's own error never aborts the run; it is recorded on the job.
        for row in parsed.rows() {
            match self
                .process_row(
                    ctx,
                    row,
                    input,
                    &matcher,
                    &event_by_name,
                    &business_day_by_date_and_event,
                    &business_days_by_date,
                    &position_by_name,
                    now,
                )
                .await
            {
                Ok(RowOutcome::Success) => job.record_success(),
                Ok(RowOutcome::Skipped) => job.record_skip(),
                Err(msg) => job.record_error(row.row_number, msg),
            }
        }

        // Step 9: complete.
        job.complete(now)?;
        self.import_jobs.update(ctx, &job).await?;
        info!(
            "actual-attendance import {} completed: success={} error={} skipped={}",
            job.id, job.success_count, job.error_count, job.skip_count
        );
        Ok(job)
    }

    #[allow(clippy::too_many_arguments)]
    async fn process_row(
        &self,
        ctx: &mut dyn TxContext,
        row: &crate::csv::CsvRow,
        input: &ActualAttendanceImportInput,
        matcher: &MemberMatcher,
        event_by_name: &HashMap<String, EventId>,
        business_day_by_date_and_event: &HashMap<(NaiveDate, EventId), BusinessDayId>,
        business_days_by_date: &HashMap<NaiveDate, Vec<(EventId, BusinessDayId)>>,
        position_by_name: &HashMap<String, crate::id::PositionId>,
        now: DateTime<Utc>,
    ) -> Result<RowOutcome, String> {
        // 8a.
        let date_str = row.get_non_empty("date").ok_or("dateは必須です")?;
        let member_name = row.get_non_empty("member_name").ok_or("member_nameは必須です")?;

        // 8b.
        let date = NaiveDate::parse_from_str(date_str, "%Y-%m-%d")
            .map_err(|_| format!("日付 '{date_str}' が不正です。YYYY-MM-DD形式で入力してください"))?;

        // 8c.
        let member_id = self
            .resolve_member(matcher, member_name)
            .map_err(|e| e.to_string())?
            .ok_or_else(|| format!("メンバー '{member_name}' が見つかりません"))?;

        // 8d.
        let business_day_id = self
            .resolve_business_day(
                row,
                date,
                input.options.default_event_id.as_deref(),
                event_by_name,
                business_day_by_date_and_event,
                business_days_by_date,
            )?
            .ok_or_else(|| format!("{date} の営業日が見つかりません"))?;

        // 8e.
        let slot_name = row.get_non_empty("slot_name").unwrap_or(DEFAULT_SLOT_NAME).to_string();
        let existing_slot = self
            .shift_slots
            .find_by_business_day_id_and_slot_name(&business_day_id, &slot_name)
            .await
            .map_err(|e| e.to_string())?;

        let slot_id = match existing_slot {
            Some(slot) => slot.id,
            None if !input.options.create_missing_slots => {
                return Err(format!(
                    "{date} にシフト枠 '{slot_name}' が見つかりません（create_missing_slotsが無効です）"
                ));
            }
            None => {
                // 8g.
                let position_name = row
                    .get_non_empty("position_name")
                    .ok_or("不足しているシフト枠を作成するにはposition_nameが必要です")?;
                let position_id = position_by_name
                    .get(position_name)
                    .cloned()
                    .ok_or_else(|| format!("役職 '{position_name}' が見つかりません"))?;
                let start_time = row
                    .get_non_empty("start_time")
                    .ok_or("不足しているシフト枠を作成するにはstart_timeが必要です")?;
                let end_time = row
                    .get_non_empty("end_time")
                    .ok_or("不足しているシフト枠を作成するにはend_timeが必要です")?;
                validate_time_range(Some(start_time), Some(end_time)).map_err(|e| e.to_string())?;
                validate_time_of_day(start_time).map_err(|e| e.to_string())?;

                let slot = ShiftSlot::new_from_import(
                    input.tenant_id.clone(),
                    business_day_id.clone(),
                    position_id,
                    slot_name.clone(),
                    start_time.to_string(),
                    end_time.to_string(),
                    now,
                )
                .map_err(|e| e.to_string())?;
                let slot_id = slot.id.clone();
                self.shift_slots.save(ctx, &slot).await.map_err(|e| e.to_string())?;
                slot_id
            }
        };

        // 8h.
        let already_assigned = self
            .shift_assignments
            .exists_by_slot_id_and_member_id(&slot_id, &member_id)
            .await
            .map_err(|e| e.to_string())?;

        if already_assigned {
            if input.options.skip_existing {
                return Ok(RowOutcome::Skipped);
            }
            return Err(format!("メンバー '{member_name}' はすでに {date} に割り当て済みです"));
        }

        let assignment = ShiftAssignment::new_manual(input.tenant_id.clone(), slot_id, member_id, now);
        self.shift_assignments
            .save(ctx, &assignment)
            .await
            .map_err(|e| e.to_string())?;
        Ok(RowOutcome::Success)
    }

    fn resolve_member(&self, matcher: &MemberMatcher, name: &str) -> AppResult<Option<MemberId>> {
        matcher.find(name)
    }

    fn resolve_business_day(
        &self,
        row: &crate::csv::CsvRow,
        date: NaiveDate,
        default_event_id: Option<&str>,
        event_by_name: &HashMap<String, EventId>,
        business_day_by_date_and_event: &HashMap<(NaiveDate, EventId), BusinessDayId>,
        business_days_by_date: &HashMap<NaiveDate, Vec<(EventId, BusinessDayId)>>,
    ) -> Result<Option<BusinessDayId>, String> {
        // §4.4.2: explicit event_name wins.
        if let Some(event_name) = row.get_non_empty("event_name") {
            let event_id = event_by_name
                .get(event_name)
                .ok_or_else(|| format!("イベント '{event_name}' が見つかりません"))?;
            return business_day_by_date_and_event
                .get(&(date, event_id.clone()))
                .cloned()
                .map(Some)
                .ok_or_else(|| format!("イベント '{event_name}' の {date} における営業日がありません"));
        }

        // Else default_event_id, if configured and present for this date.
        if let Some(default_event_id) = default_event_id {
            if let Ok(event_id) = EventId::parse(default_event_id.to_string()) {
                if let Some(bd) = business_day_by_date_and_event.get(&(date, event_id)) {
                    return Ok(Some(bd.clone()));
                }
            }
        }

        // Else collect all business days on that date.
        match business_days_by_date.get(&date) {
            None => Ok(None),
            Some(candidates) if candidates.len() == 1 => Ok(Some(candidates[0].1.clone())),
            Some(_) => Err(format!("{date} に複数のイベントがあります。event_nameを指定してください")),
        }
    }

    /// On parse/prefetch failure: `Fail(reason)` and commit the synthesized
    /// snapshot rather than rolling the transaction back (spec §4.3 step 2)
    /// — a failed import is a normal business outcome, not an infra error.
    async fn fail_and_commit(
        &self,
        ctx: &mut dyn TxContext,
        job: &mut ImportJob,
        reason: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<ImportJob> {
        let reason = reason.into();
        warn!("actual-attendance import {} failed: {reason}", job.id);
        job.fail(reason, now)?;
        self.import_jobs.update(ctx, job).await?;
        Ok(job.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::event::{Event, EventBusinessDay};
    use crate::domain::import_job::ImportStatus;
    use crate::domain::member::Member;
    use crate::domain::position::Position;
    use crate::infra::in_memory::{
        InMemoryBusinessDayRepository, InMemoryEventRepository, InMemoryImportJobRepository,
        InMemoryMemberRepository, InMemoryPositionRepository, InMemoryShiftAssignmentRepository,
        InMemoryShiftSlotRepository, InMemoryTxManager,
    };

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    struct Fixture {
        use_case: ActualAttendanceImportUseCase,
        tenant_id: TenantId,
    }

    async fn build_fixture() -> Fixture {
        let tenant_id = TenantId::generate();
        let actor_admin_id = AdminId::generate();

        let members = Arc::new(InMemoryMemberRepository::new());
        let events = Arc::new(InMemoryEventRepository::new());
        let business_days = Arc::new(InMemoryBusinessDayRepository::new());
        let positions = Arc::new(InMemoryPositionRepository::new());
        let shift_slots = Arc::new(InMemoryShiftSlotRepository::new());
        let shift_assignments = Arc::new(InMemoryShiftAssignmentRepository::new());
        let import_jobs = Arc::new(InMemoryImportJobRepository::new());
        let tx_manager = Arc::new(InMemoryTxManager::new());

        let member = Member::new(tenant_id.clone(), "たろう", "", None, now()).unwrap();
        let event = Event::new(tenant_id.clone(), "週末イベント", now()).unwrap();
        let business_day = EventBusinessDay::new(
            tenant_id.clone(),
            event.id.clone(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            now(),
        );
        let position = Position::new(tenant_id.clone(), "スタッフ", now()).unwrap();

        with_tx(tx_manager.as_ref(), |ctx| {
            let members = members.clone();
            let events = events.clone();
            let business_days = business_days.clone();
            let positions = positions.clone();
            let member = member.clone();
            let event = event.clone();
            let business_day = business_day.clone();
            let position = position.clone();
            Box::pin(async move {
                members.save(ctx, &member).await?;
                events.save(ctx, &event).await?;
                business_days.save(ctx, &business_day).await?;
                positions.save(ctx, &position).await?;
                Ok(())
            })
        })
        .await
        .unwrap();

        let use_case = ActualAttendanceImportUseCase::new(
            import_jobs,
            members,
            events,
            business_days,
            positions,
            shift_slots,
            shift_assignments,
            tx_manager,
            Arc::new(crate::clock::FixedClock::new(now())),
        );
        Fixture { use_case, tenant_id }
    }

    fn csv_bytes(body: &str) -> Vec<u8> {
        format!("date,member_name,event_name,slot_name\n{body}").into_bytes()
    }

    // S3: import happy path.
    #[tokio::test]
    async fn happy_path_creates_slot_and_assignment() {
        let fixture = build_fixture().await;
        let input = ActualAttendanceImportInput {
            tenant_id: fixture.tenant_id.clone(),
            actor_admin_id: AdminId::generate(),
            file_name: "attendance.csv".to_string(),
            raw_bytes: csv_bytes("2025-01-15,たろう,週末イベント,受付\n"),
            options: ImportOptions {
                create_missing_slots: true,
                ..ImportOptions::default()
            },
        };

        let job = fixture.use_case.execute(input).await.unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.success_count, 1);
        assert_eq!(job.error_count, 0);
        assert_eq!(job.skip_count, 0);
    }

    // S4: duplicate row with skip_existing=true is skipped, not an error.
    #[tokio::test]
    async fn duplicate_row_with_skip_existing_is_skipped() {
        let fixture = build_fixture().await;
        let body = "2025-01-15,たろう,週末イベント,受付\n2025-01-15,たろう,週末イベント,受付\n";
        let input = ActualAttendanceImportInput {
            tenant_id: fixture.tenant_id.clone(),
            actor_admin_id: AdminId::generate(),
            file_name: "attendance.csv".to_string(),
            raw_bytes: csv_bytes(body),
            options: ImportOptions {
                create_missing_slots: true,
                skip_existing: true,
                ..ImportOptions::default()
            },
        };

        let job = fixture.use_case.execute(input).await.unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.success_count, 1);
        assert_eq!(job.skip_count, 1);
        assert_eq!(job.error_count, 0);
    }

    // S5: duplicate row without skip_existing is a per-row error, not an
    // aborted run.
    #[tokio::test]
    async fn duplicate_row_without_skip_existing_is_an_error() {
        let fixture = build_fixture().await;
        let body = "2025-01-15,たろう,週末イベント,受付\n2025-01-15,たろう,週末イベント,受付\n";
        let input = ActualAttendanceImportInput {
            tenant_id: fixture.tenant_id.clone(),
            actor_admin_id: AdminId::generate(),
            file_name: "attendance.csv".to_string(),
            raw_bytes: csv_bytes(body),
            options: ImportOptions {
                create_missing_slots: true,
                skip_existing: false,
                ..ImportOptions::default()
            },
        };

        let job = fixture.use_case.execute(input).await.unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.success_count, 1);
        assert_eq!(job.error_count, 1);
        assert!(job.errors[0].message.contains("たろう"));
    }

    // S6: unknown member name is a per-row error; the job still completes.
    #[tokio::test]
    async fn missing_member_is_a_row_error_and_job_still_completes() {
        let fixture = build_fixture().await;
        let input = ActualAttendanceImportInput {
            tenant_id: fixture.tenant_id.clone(),
            actor_admin_id: AdminId::generate(),
            file_name: "attendance.csv".to_string(),
            raw_bytes: csv_bytes("2025-01-15,いない人,週末イベント,受付\n"),
            options: ImportOptions {
                create_missing_slots: true,
                ..ImportOptions::default()
            },
        };

        let job = fixture.use_case.execute(input).await.unwrap();
        assert_eq!(job.status, ImportStatus::Completed);
        assert_eq!(job.success_count, 0);
        assert_eq!(job.error_count, 1);
        assert!(job.errors[0].message.contains("いない人"));
    }
}
