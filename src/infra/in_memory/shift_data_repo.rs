//! In-memory repositories for the shift-data model (members, events,
//! business days, positions, slots, assignments) that the CSV importers
//! prefetch in bulk (spec §4.3 step 6).

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::NaiveDate;
use tokio::sync::Mutex;

use crate::application::ports::{
    BusinessDayRepository, EventRepository, MemberRepository, PositionRepository,
    ShiftAssignmentRepository, ShiftSlotRepository, TxContext,
};
use crate::domain::event::{Event, EventBusinessDay};
use crate::domain::member::Member;
use crate::domain::position::Position;
use crate::domain::shift::{ShiftAssignment, ShiftSlot};
use crate::error::AppResult;
use crate::id::{BusinessDayId, EventId, MemberId, PositionId, ShiftSlotId, TenantId};

#[derive(Default)]
pub struct InMemoryMemberRepository {
    rows: Mutex<HashMap<MemberId, Member>>,
}

impl InMemoryMemberRepository {
    pub fn new() -> Self {
        InMemoryMemberRepository::default()
    }
}

#[async_trait]
impl MemberRepository for InMemoryMemberRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, member: &Member) -> AppResult<()> {
        self.rows.lock().await.insert(member.id.clone(), member.clone());
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Member>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|m| &m.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, tenant_id: &TenantId, member_id: &MemberId) -> AppResult<Option<Member>> {
        Ok(self
            .rows
            .lock()
            .await
            .get(member_id)
            .filter(|m| &m.tenant_id == tenant_id)
            .cloned())
    }

    async fn exists_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<bool> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .any(|m| &m.tenant_id == tenant_id && m.name == name))
    }
}

#[derive(Default)]
pub struct InMemoryEventRepository {
    rows: Mutex<HashMap<EventId, Event>>,
}

impl InMemoryEventRepository {
    pub fn new() -> Self {
        InMemoryEventRepository::default()
    }
}

#[async_trait]
impl EventRepository for InMemoryEventRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, event: &Event) -> AppResult<()> {
        self.rows.lock().await.insert(event.id.clone(), event.clone());
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Event>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|e| &e.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Event>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|e| &e.tenant_id == tenant_id && e.name == name)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryBusinessDayRepository {
    rows: Mutex<HashMap<BusinessDayId, EventBusinessDay>>,
}

impl InMemoryBusinessDayRepository {
    pub fn new() -> Self {
        InMemoryBusinessDayRepository::default()
    }
}

#[async_trait]
impl BusinessDayRepository for InMemoryBusinessDayRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, business_day: &EventBusinessDay) -> AppResult<()> {
        self.rows.lock().await.insert(business_day.id.clone(), business_day.clone());
        Ok(())
    }

    async fn find_by_tenant_id_and_date_range(
        &self,
        tenant_id: &TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<EventBusinessDay>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|bd| &bd.tenant_id == tenant_id && bd.date >= from && bd.date <= to)
            .cloned()
            .collect())
    }

    async fn find_by_id(&self, business_day_id: &BusinessDayId) -> AppResult<Option<EventBusinessDay>> {
        Ok(self.rows.lock().await.get(business_day_id).cloned())
    }
}

#[derive(Default)]
pub struct InMemoryPositionRepository {
    rows: Mutex<HashMap<PositionId, Position>>,
}

impl InMemoryPositionRepository {
    pub fn new() -> Self {
        InMemoryPositionRepository::default()
    }
}

#[async_trait]
impl PositionRepository for InMemoryPositionRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, position: &Position) -> AppResult<()> {
        self.rows.lock().await.insert(position.id.clone(), position.clone());
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Position>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|p| &p.tenant_id == tenant_id)
            .cloned()
            .collect())
    }

    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Position>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|p| &p.tenant_id == tenant_id && p.name == name)
            .cloned())
    }
}

#[derive(Default)]
pub struct InMemoryShiftSlotRepository {
    rows: Mutex<HashMap<ShiftSlotId, ShiftSlot>>,
}

impl InMemoryShiftSlotRepository {
    pub fn new() -> Self {
        InMemoryShiftSlotRepository::default()
    }
}

#[async_trait]
impl ShiftSlotRepository for InMemoryShiftSlotRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, slot: &ShiftSlot) -> AppResult<()> {
        self.rows.lock().await.insert(slot.id.clone(), slot.clone());
        Ok(())
    }

    async fn find_by_business_day_id_and_slot_name(
        &self,
        business_day_id: &BusinessDayId,
        slot_name: &str,
    ) -> AppResult<Option<ShiftSlot>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .find(|s| &s.business_day_id == business_day_id && s.slot_name == slot_name)
            .cloned())
    }

    async fn find_by_business_day_id(&self, business_day_id: &BusinessDayId) -> AppResult<Vec<ShiftSlot>> {
        Ok(self
            .rows
            .lock()
            .await
            .values()
            .filter(|s| &s.business_day_id == business_day_id)
            .cloned()
            .collect())
    }
}

#[derive(Default)]
pub struct InMemoryShiftAssignmentRepository {
    rows: Mutex<Vec<ShiftAssignment>>,
}

impl InMemoryShiftAssignmentRepository {
    pub fn new() -> Self {
        InMemoryShiftAssignmentRepository::default()
    }
}

#[async_trait]
impl ShiftAssignmentRepository for InMemoryShiftAssignmentRepository {
    async fn save(&self, _ctx: &mut dyn TxContext, assignment: &ShiftAssignment) -> AppResult<()> {
        self.rows.lock().await.push(assignment.clone());
        Ok(())
    }

    async fn exists_by_slot_id_and_member_id(
        &self,
        slot_id: &ShiftSlotId,
        member_id: &MemberId,
    ) -> AppResult<bool> {
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .any(|a| &a.slot_id == slot_id && &a.member_id == member_id))
    }
}
