//! ShiftSlot + ShiftAssignment entities (spec §3, C4).

use std::sync::OnceLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::domain::HasTimestamps;
use crate::error::{AppError, AppResult};
use crate::id::{BusinessDayId, MemberId, PositionId, ShiftAssignmentId, ShiftSlotId, TenantId};

/// `^([01]\d|2[0-3]):([0-5]\d)$` (spec §4.5).
fn time_of_day_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^([01]\d|2[0-3]):([0-5]\d)$").unwrap())
}

pub fn validate_time_of_day(value: &str) -> AppResult<()> {
    if !time_of_day_re().is_match(value) {
        return Err(AppError::validation(format!(
            "'{value}' は HH:MM 形式の時刻として不正です"
        )));
    }
    Ok(())
}

/// Validates an optional `(start_time, end_time)` pair: each must match
/// `HH:MM` when present, and `start_time < end_time` when both are present
/// (spec §4.5).
pub fn validate_time_range(start: Option<&str>, end: Option<&str>) -> AppResult<()> {
    if let Some(s) = start {
        validate_time_of_day(s)?;
    }
    if let Some(e) = end {
        validate_time_of_day(e)?;
    }
    if let (Some(s), Some(e)) = (start, end) {
        if s >= e {
            return Err(AppError::validation("開始時刻は終了時刻より前である必要があります"));
        }
    }
    Ok(())
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftSlot {
    pub id: ShiftSlotId,
    pub tenant_id: TenantId,
    pub business_day_id: BusinessDayId,
    pub position_id: PositionId,
    pub slot_name: String,
    pub start_time: String,
    pub end_time: String,
    pub required_count: u32,
    pub priority: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sentinel slot name used when a CSV row omits `slot_name` (spec §4.3
/// step 8e): "通常シフト" ("default shift").
pub const DEFAULT_SLOT_NAME: &str = "通常シフト";

impl ShiftSlot {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        tenant_id: TenantId,
        business_day_id: BusinessDayId,
        position_id: PositionId,
        slot_name: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        required_count: u32,
        priority: i32,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let start_time = start_time.into();
        let end_time = end_time.into();
        validate_time_range(Some(&start_time), Some(&end_time))?;
        Ok(ShiftSlot {
            id: ShiftSlotId::generate(),
            tenant_id,
            business_day_id,
            position_id,
            slot_name: slot_name.into(),
            start_time,
            end_time,
            required_count,
            priority,
            created_at: now,
            updated_at: now,
        })
    }

    /// Slot created on-demand by the CSV importer (spec §4.3 step 8g):
    /// `required_count=1, priority=0`.
    pub fn new_from_import(
        tenant_id: TenantId,
        business_day_id: BusinessDayId,
        position_id: PositionId,
        slot_name: impl Into<String>,
        start_time: impl Into<String>,
        end_time: impl Into<String>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        Self::new(
            tenant_id,
            business_day_id,
            position_id,
            slot_name,
            start_time,
            end_time,
            1,
            0,
            now,
        )
    }
}

impl HasTimestamps for ShiftSlot {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssignmentMethod {
    Auto,
    Manual,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ShiftAssignment {
    pub id: ShiftAssignmentId,
    pub tenant_id: TenantId,
    pub slot_id: ShiftSlotId,
    pub member_id: MemberId,
    /// Null for manual assignments (spec §3).
    pub plan_id: Option<String>,
    pub method: AssignmentMethod,
    pub is_outside_preference: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ShiftAssignment {
    /// A manual assignment created by the CSV importer (spec §4.3 step 8h):
    /// `plan_id=null, method=manual, is_outside_preference=false`.
    pub fn new_manual(
        tenant_id: TenantId,
        slot_id: ShiftSlotId,
        member_id: MemberId,
        now: DateTime<Utc>,
    ) -> Self {
        ShiftAssignment {
            id: ShiftAssignmentId::generate(),
            tenant_id,
            slot_id,
            member_id,
            plan_id: None,
            method: AssignmentMethod::Manual,
            is_outside_preference: false,
            created_at: now,
            updated_at: now,
        }
    }
}

impl HasTimestamps for ShiftAssignment {
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

    #[test]
    fn time_of_day_regex_boundaries() {
        assert!(validate_time_of_day("00:00").is_ok());
        assert!(validate_time_of_day("23:59").is_ok());
        assert!(validate_time_of_day("24:00").is_err());
        assert!(validate_time_of_day("9:00").is_err());
        assert!(validate_time_of_day("09:60").is_err());
    }

    #[test]
    fn time_range_requires_start_before_end() {
        assert!(validate_time_range(Some("09:00"), Some("17:00")).is_ok());
        assert!(validate_time_range(Some("17:00"), Some("09:00")).is_err());
        assert!(validate_time_range(Some("09:00"), Some("09:00")).is_err());
        assert!(validate_time_range(None, None).is_ok());
    }
}
