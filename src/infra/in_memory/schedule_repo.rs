use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::application::ports::{DateScheduleRepository, TxContext};
use crate::domain::date_schedule::{CandidateDate, DateSchedule, ScheduleResponse};
use crate::error::AppResult;
use crate::id::{DateScheduleId, TenantId};

#[derive(Default)]
struct Store {
    schedules: HashMap<DateScheduleId, DateSchedule>,
    candidates: HashMap<DateScheduleId, Vec<CandidateDate>>,
    responses: Vec<ScheduleResponse>,
}

#[derive(Default)]
pub struct InMemoryDateScheduleRepository {
    store: Mutex<Store>,
}

impl InMemoryDateScheduleRepository {
    pub fn new() -> Self {
        InMemoryDateScheduleRepository::default()
    }
}

#[async_trait]
impl DateScheduleRepository for InMemoryDateScheduleRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, schedule: &DateSchedule) -> AppResult<()> {
        self.store.lock().await.schedules.insert(schedule.id.clone(), schedule.clone());
        Ok(())
    }

    async fn find_by_id(&self, tenant_id: &TenantId, id: &DateScheduleId) -> AppResult<Option<DateSchedule>> {
        Ok(self
            .store
            .lock()
            .await
            .schedules
            .get(id)
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned())
    }

    async fn find_by_token(&self, token: &str) -> AppResult<Option<DateSchedule>> {
        Ok(self
            .store
            .lock()
            .await
            .schedules
            .values()
            .find(|s| s.public_token.as_str() == token)
            .cloned())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<DateSchedule>> {
        Ok(self
            .store
            .lock()
            .await
            .schedules
            .values()
            .filter(|s| &s.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn save_candidates(
        &self,
        _ctx: &mut dyn TxContext,
        schedule_id: &DateScheduleId,
        candidates: &[CandidateDate],
    ) -> AppResult<()> {
        self.store
            .lock()
            .await
            .candidates
            .insert(schedule_id.clone(), candidates.to_vec());
        Ok(())
    }

    async fn find_candidates_by_schedule_id(
        &self,
        schedule_id: &DateScheduleId,
    ) -> AppResult<Vec<CandidateDate>> {
        Ok(self
            .store
            .lock()
            .await
            .candidates
            .get(schedule_id)
            .cloned()
            .unwrap_or_default())
    }

    async fn upsert_response(&self, _ctx: &mut dyn TxContext, response: &ScheduleResponse) -> AppResult<()> {
        let mut store = self.store.lock().await;
        if let Some(existing) = store.responses.iter_mut().find(|r| {
            r.schedule_id == response.schedule_id
                && r.member_id == response.member_id
                && r.candidate_id == response.candidate_id
        }) {
            *existing = response.clone();
        } else {
            store.responses.push(response.clone());
        }
        Ok(())
    }

    async fn find_responses_by_schedule_id(
        &self,
        schedule_id: &DateScheduleId,
    ) -> AppResult<Vec<ScheduleResponse>> {
        Ok(self
            .store
            .lock()
            .await
            .responses
            .iter()
            .filter(|r| &r.schedule_id == schedule_id)
            .cloned()
            .collect())
    }
}
