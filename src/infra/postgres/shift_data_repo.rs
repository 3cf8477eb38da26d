//! Postgres repositories for the shift-data model (members, events,
//! business days, positions, slots, assignments) mirroring
//! `infra::in_memory::shift_data_repo` one port at a time.

use async_trait::async_trait;
use chrono::NaiveDate;
use sqlx::{PgPool, Row};

use super::{map_sqlx_err, tx::PgTxContext};
use crate::application::ports::{
    BusinessDayRepository, EventRepository, MemberRepository, PositionRepository,
    ShiftAssignmentRepository, ShiftSlotRepository, TxContext,
};
use crate::domain::event::{Event, EventBusinessDay};
use crate::domain::member::Member;
use crate::domain::position::Position;
use crate::domain::shift::{AssignmentMethod, ShiftAssignment, ShiftSlot};
use crate::error::AppResult;
use crate::id::{BusinessDayId, EventId, MemberId, PositionId, ShiftSlotId, TenantId};

// -------------------------------------------------------------------- Member

pub struct PostgresMemberRepository {
    pool: PgPool,
}

impl PostgresMemberRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresMemberRepository { pool }
    }
}

fn row_to_member(row: &sqlx::postgres::PgRow) -> Member {
    Member {
        id: MemberId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        name: row.get("name"),
        display_name: row.get("display_name"),
        note: row.get("note"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        deleted_at: row.get("deleted_at"),
    }
}

#[async_trait]
impl MemberRepository for PostgresMemberRepository {
    async fn save(&self, ctx: &mut dyn TxContext, member: &Member) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO members (id, tenant_id, name, display_name, note, created_at, updated_at, deleted_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8) \
             ON CONFLICT (id) DO UPDATE SET \
             name = EXCLUDED.name, display_name = EXCLUDED.display_name, note = EXCLUDED.note, \
             updated_at = EXCLUDED.updated_at, deleted_at = EXCLUDED.deleted_at",
        )
        .bind(member.id.as_str())
        .bind(member.tenant_id.as_str())
        .bind(&member.name)
        .bind(&member.display_name)
        .bind(&member.note)
        .bind(member.created_at)
        .bind(member.updated_at)
        .bind(member.deleted_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save member", e))?;
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Member>> {
        sqlx::query("SELECT * FROM members WHERE tenant_id = $1")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_member).collect())
            .map_err(|e| map_sqlx_err("find members by tenant", e))
    }

    async fn find_by_id(&self, tenant_id: &TenantId, member_id: &MemberId) -> AppResult<Option<Member>> {
        sqlx::query("SELECT * FROM members WHERE id = $1 AND tenant_id = $2")
            .bind(member_id.as_str())
            .bind(tenant_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_member))
            .map_err(|e| map_sqlx_err("find member by id", e))
    }

    async fn exists_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar("SELECT count(*) FROM members WHERE tenant_id = $1 AND name = $2")
            .bind(tenant_id.as_str())
            .bind(name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| map_sqlx_err("check member name existence", e))?;
        Ok(count > 0)
    }
}

// --------------------------------------------------------------------- Event

pub struct PostgresEventRepository {
    pool: PgPool,
}

impl PostgresEventRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresEventRepository { pool }
    }
}

fn row_to_event(row: &sqlx::postgres::PgRow) -> Event {
    Event {
        id: EventId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl EventRepository for PostgresEventRepository {
    async fn save(&self, ctx: &mut dyn TxContext, event: &Event) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO events (id, tenant_id, name, created_at, updated_at) VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at",
        )
        .bind(event.id.as_str())
        .bind(event.tenant_id.as_str())
        .bind(&event.name)
        .bind(event.created_at)
        .bind(event.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save event", e))?;
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Event>> {
        sqlx::query("SELECT * FROM events WHERE tenant_id = $1")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_event).collect())
            .map_err(|e| map_sqlx_err("find events by tenant", e))
    }

    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Event>> {
        sqlx::query("SELECT * FROM events WHERE tenant_id = $1 AND name = $2")
            .bind(tenant_id.as_str())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_event))
            .map_err(|e| map_sqlx_err("find event by name", e))
    }
}

// -------------------------------------------------------------- BusinessDay

pub struct PostgresBusinessDayRepository {
    pool: PgPool,
}

impl PostgresBusinessDayRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresBusinessDayRepository { pool }
    }
}

fn row_to_business_day(row: &sqlx::postgres::PgRow) -> EventBusinessDay {
    EventBusinessDay {
        id: BusinessDayId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        event_id: EventId::parse(row.get::<String, _>("event_id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        date: row.get("date"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl BusinessDayRepository for PostgresBusinessDayRepository {
    async fn save(&self, ctx: &mut dyn TxContext, business_day: &EventBusinessDay) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO event_business_days (id, event_id, tenant_id, date, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6) \
             ON CONFLICT (id) DO UPDATE SET updated_at = EXCLUDED.updated_at",
        )
        .bind(business_day.id.as_str())
        .bind(business_day.event_id.as_str())
        .bind(business_day.tenant_id.as_str())
        .bind(business_day.date)
        .bind(business_day.created_at)
        .bind(business_day.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save business day", e))?;
        Ok(())
    }

    async fn find_by_tenant_id_and_date_range(
        &self,
        tenant_id: &TenantId,
        from: NaiveDate,
        to: NaiveDate,
    ) -> AppResult<Vec<EventBusinessDay>> {
        sqlx::query("SELECT * FROM event_business_days WHERE tenant_id = $1 AND date >= $2 AND date <= $3")
            .bind(tenant_id.as_str())
            .bind(from)
            .bind(to)
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_business_day).collect())
            .map_err(|e| map_sqlx_err("find business days by date range", e))
    }

    async fn find_by_id(&self, business_day_id: &BusinessDayId) -> AppResult<Option<EventBusinessDay>> {
        sqlx::query("SELECT * FROM event_business_days WHERE id = $1")
            .bind(business_day_id.as_str())
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_business_day))
            .map_err(|e| map_sqlx_err("find business day by id", e))
    }
}

// ------------------------------------------------------------------ Position

pub struct PostgresPositionRepository {
    pool: PgPool,
}

impl PostgresPositionRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresPositionRepository { pool }
    }
}

fn row_to_position(row: &sqlx::postgres::PgRow) -> Position {
    Position {
        id: PositionId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        name: row.get("name"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl PositionRepository for PostgresPositionRepository {
    async fn save(&self, ctx: &mut dyn TxContext, position: &Position) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO positions (id, tenant_id, name, created_at, updated_at) VALUES ($1,$2,$3,$4,$5) \
             ON CONFLICT (id) DO UPDATE SET name = EXCLUDED.name, updated_at = EXCLUDED.updated_at",
        )
        .bind(position.id.as_str())
        .bind(position.tenant_id.as_str())
        .bind(&position.name)
        .bind(position.created_at)
        .bind(position.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save position", e))?;
        Ok(())
    }

    async fn find_by_tenant_id(&self, tenant_id: &TenantId) -> AppResult<Vec<Position>> {
        sqlx::query("SELECT * FROM positions WHERE tenant_id = $1")
            .bind(tenant_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_position).collect())
            .map_err(|e| map_sqlx_err("find positions by tenant", e))
    }

    async fn find_by_name(&self, tenant_id: &TenantId, name: &str) -> AppResult<Option<Position>> {
        sqlx::query("SELECT * FROM positions WHERE tenant_id = $1 AND name = $2")
            .bind(tenant_id.as_str())
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_position))
            .map_err(|e| map_sqlx_err("find position by name", e))
    }
}

// ------------------------------------------------------------------ ShiftSlot

pub struct PostgresShiftSlotRepository {
    pool: PgPool,
}

impl PostgresShiftSlotRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresShiftSlotRepository { pool }
    }
}

fn row_to_slot(row: &sqlx::postgres::PgRow) -> ShiftSlot {
    ShiftSlot {
        id: ShiftSlotId::parse(row.get::<String, _>("id")).expect("stored id is a valid SID"),
        tenant_id: TenantId::parse(row.get::<String, _>("tenant_id")).expect("stored id is a valid SID"),
        business_day_id: BusinessDayId::parse(row.get::<String, _>("business_day_id"))
            .expect("stored id is a valid SID"),
        position_id: PositionId::parse(row.get::<String, _>("position_id")).expect("stored id is a valid SID"),
        slot_name: row.get("slot_name"),
        start_time: row.get("start_time"),
        end_time: row.get("end_time"),
        required_count: row.get::<i32, _>("required_count") as u32,
        priority: row.get("priority"),
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
    }
}

#[async_trait]
impl ShiftSlotRepository for PostgresShiftSlotRepository {
    async fn save(&self, ctx: &mut dyn TxContext, slot: &ShiftSlot) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO shift_slots \
             (id, tenant_id, business_day_id, position_id, slot_name, start_time, end_time, \
              required_count, priority, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11) \
             ON CONFLICT (id) DO UPDATE SET \
             slot_name = EXCLUDED.slot_name, start_time = EXCLUDED.start_time, \
             end_time = EXCLUDED.end_time, required_count = EXCLUDED.required_count, \
             priority = EXCLUDED.priority, updated_at = EXCLUDED.updated_at",
        )
        .bind(slot.id.as_str())
        .bind(slot.tenant_id.as_str())
        .bind(slot.business_day_id.as_str())
        .bind(slot.position_id.as_str())
        .bind(&slot.slot_name)
        .bind(&slot.start_time)
        .bind(&slot.end_time)
        .bind(slot.required_count as i32)
        .bind(slot.priority)
        .bind(slot.created_at)
        .bind(slot.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save shift slot", e))?;
        Ok(())
    }

    async fn find_by_business_day_id_and_slot_name(
        &self,
        business_day_id: &BusinessDayId,
        slot_name: &str,
    ) -> AppResult<Option<ShiftSlot>> {
        sqlx::query("SELECT * FROM shift_slots WHERE business_day_id = $1 AND slot_name = $2")
            .bind(business_day_id.as_str())
            .bind(slot_name)
            .fetch_optional(&self.pool)
            .await
            .map(|row| row.as_ref().map(row_to_slot))
            .map_err(|e| map_sqlx_err("find shift slot by name", e))
    }

    async fn find_by_business_day_id(&self, business_day_id: &BusinessDayId) -> AppResult<Vec<ShiftSlot>> {
        sqlx::query("SELECT * FROM shift_slots WHERE business_day_id = $1")
            .bind(business_day_id.as_str())
            .fetch_all(&self.pool)
            .await
            .map(|rows| rows.iter().map(row_to_slot).collect())
            .map_err(|e| map_sqlx_err("find shift slots by business day", e))
    }
}

// ------------------------------------------------------------ ShiftAssignment

pub struct PostgresShiftAssignmentRepository {
    pool: PgPool,
}

impl PostgresShiftAssignmentRepository {
    pub fn new(pool: PgPool) -> Self {
        PostgresShiftAssignmentRepository { pool }
    }
}

fn method_label(method: AssignmentMethod) -> &'static str {
    match method {
        AssignmentMethod::Auto => "auto",
        AssignmentMethod::Manual => "manual",
    }
}

#[async_trait]
impl ShiftAssignmentRepository for PostgresShiftAssignmentRepository {
    async fn save(&self, ctx: &mut dyn TxContext, assignment: &ShiftAssignment) -> AppResult<()> {
        let tx = PgTxContext::from_ctx(ctx);
        sqlx::query(
            "INSERT INTO shift_assignments \
             (id, tenant_id, slot_id, member_id, plan_id, method, is_outside_preference, created_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9)",
        )
        .bind(assignment.id.as_str())
        .bind(assignment.tenant_id.as_str())
        .bind(assignment.slot_id.as_str())
        .bind(assignment.member_id.as_str())
        .bind(&assignment.plan_id)
        .bind(method_label(assignment.method))
        .bind(assignment.is_outside_preference)
        .bind(assignment.created_at)
        .bind(assignment.updated_at)
        .execute(&mut **tx)
        .await
        .map_err(|e| map_sqlx_err("save shift assignment", e))?;
        Ok(())
    }

    async fn exists_by_slot_id_and_member_id(
        &self,
        slot_id: &ShiftSlotId,
        member_id: &MemberId,
    ) -> AppResult<bool> {
        let count: i64 = sqlx::query_scalar(
            "SELECT count(*) FROM shift_assignments WHERE slot_id = $1 AND member_id = $2",
        )
        .bind(slot_id.as_str())
        .bind(member_id.as_str())
        .fetch_one(&self.pool)
        .await
        .map_err(|e| map_sqlx_err("check shift assignment existence", e))?;
        Ok(count > 0)
    }
}
