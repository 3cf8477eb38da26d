//! Date-schedule use case (spec §4.6, C6): create, close, decide, and
//! respond to a public-token addressed scheduling poll.

use std::sync::Arc;

use chrono::{DateTime, NaiveDate, Utc};

use crate::application::ports::{with_tx, DateScheduleRepository, TxManager};
use crate::clock::Clock;
use crate::domain::date_schedule::{Availability, CandidateDate, DateSchedule, ScheduleResponse};
use crate::error::{AppError, AppResult};
use crate::id::{CandidateDateId, DateScheduleId, MemberId, TenantId};

pub struct CreateScheduleInput {
    pub tenant_id: TenantId,
    pub title: String,
    pub deadline: Option<DateTime<Utc>>,
    pub candidate_dates: Vec<NaiveDate>,
}

pub struct ScheduleView {
    pub schedule: DateSchedule,
    pub candidates: Vec<CandidateDate>,
}

pub struct ScheduleUseCase {
    schedules: Arc<dyn DateScheduleRepository>,
    tx_manager: Arc<dyn TxManager>,
    clock: Arc<dyn Clock>,
}

impl ScheduleUseCase {
    pub fn new(
        schedules: Arc<dyn DateScheduleRepository>,
        tx_manager: Arc<dyn TxManager>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        ScheduleUseCase {
            schedules,
            tx_manager,
            clock,
        }
    }

    pub async fn create(&self, input: CreateScheduleInput) -> AppResult<DateSchedule> {
        let now = self.clock.now();
        let schedule = DateSchedule::new(input.tenant_id, input.title, input.deadline, now)?;
        let candidates: Vec<CandidateDate> = input
            .candidate_dates
            .iter()
            .enumerate()
            .map(|(i, date)| CandidateDate::new(schedule.id.clone(), *date, i as u32))
            .collect();

        let schedule_for_tx = schedule.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let schedule = schedule_for_tx.clone();
            let candidates = candidates.clone();
            Box::pin(async move {
                self.schedules.save(ctx, &schedule).await?;
                self.schedules.save_candidates(ctx, &schedule.id, &candidates).await?;
                Ok(())
            })
        })
        .await?;

        Ok(schedule)
    }

    pub async fn close(&self, tenant_id: &TenantId, schedule_id: &DateScheduleId) -> AppResult<DateSchedule> {
        let now = self.clock.now();
        let tenant_id = tenant_id.clone();
        let schedule_id = schedule_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let tenant_id = tenant_id.clone();
            let schedule_id = schedule_id.clone();
            Box::pin(async move {
                let mut schedule = self
                    .schedules
                    .find_by_id(&tenant_id, &schedule_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("date schedule"))?;
                schedule.close(now)?;
                self.schedules.save(ctx, &schedule).await?;
                Ok(schedule)
            })
        })
        .await
    }

    /// Decides one candidate as final; the candidate-membership check the
    /// domain requires is performed here, against the persisted candidate
    /// list (spec §4.6).
    pub async fn decide(
        &self,
        tenant_id: &TenantId,
        schedule_id: &DateScheduleId,
        candidate_id: CandidateDateId,
    ) -> AppResult<DateSchedule> {
        let now = self.clock.now();
        let tenant_id = tenant_id.clone();
        let schedule_id = schedule_id.clone();
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let tenant_id = tenant_id.clone();
            let schedule_id = schedule_id.clone();
            let candidate_id = candidate_id.clone();
            Box::pin(async move {
                let mut schedule = self
                    .schedules
                    .find_by_id(&tenant_id, &schedule_id)
                    .await?
                    .ok_or_else(|| AppError::not_found("date schedule"))?;
                let candidates = self.schedules.find_candidates_by_schedule_id(&schedule_id).await?;
                let belongs = candidates.iter().any(|c| c.id == candidate_id);
                schedule.decide(candidate_id, belongs, now)?;
                self.schedules.save(ctx, &schedule).await?;
                Ok(schedule)
            })
        })
        .await
    }

    pub async fn respond(
        &self,
        schedule_token: &str,
        member_id: MemberId,
        candidate_id: CandidateDateId,
        availability: Availability,
    ) -> AppResult<()> {
        let now = self.clock.now();
        let schedule = self
            .schedules
            .find_by_token(schedule_token)
            .await?
            .ok_or_else(|| AppError::not_found("date schedule"))?;
        schedule.can_respond(now)?;

        let response = ScheduleResponse {
            id: crate::id::ScheduleResponseId::generate(),
            schedule_id: schedule.id.clone(),
            member_id,
            candidate_id,
            availability,
            updated_at: now,
        };
        with_tx(self.tx_manager.as_ref(), move |ctx| {
            let response = response.clone();
            Box::pin(async move { self.schedules.upsert_response(ctx, &response).await })
        })
        .await
    }

    pub async fn view_by_token(&self, token: &str) -> AppResult<Option<ScheduleView>> {
        let Some(schedule) = self.schedules.find_by_token(token).await? else {
            return Ok(None);
        };
        let candidates = self.schedules.find_candidates_by_schedule_id(&schedule.id).await?;
        Ok(Some(ScheduleView { schedule, candidates }))
    }
}
