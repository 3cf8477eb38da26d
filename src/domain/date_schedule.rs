//! Date-schedule aggregate (spec §3, §4.6, C6): a poll that asks members
//! for their availability across a set of candidate dates, then lets an
//! admin decide one candidate as final.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::{HasTimestamps, SoftDeletable};
use crate::error::{sentinel, AppError, AppResult};
use crate::id::{CandidateDateId, DateScheduleId, MemberId, PublicToken, ScheduleResponseId, TenantId};

const MAX_TITLE_LEN: usize = 255;

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScheduleStatus {
    Open,
    Closed,
    Decided,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DateSchedule {
    pub id: DateScheduleId,
    pub tenant_id: TenantId,
    pub title: String,
    pub public_token: PublicToken,
    pub status: ScheduleStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub decided_candidate_id: Option<CandidateDateId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl DateSchedule {
    pub fn new(
        tenant_id: TenantId,
        title: impl Into<String>,
        deadline: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> AppResult<Self> {
        let title = title.into();
        let len = title.chars().count();
        if len == 0 || len > MAX_TITLE_LEN {
            return Err(AppError::validation(
                "タイトルは1文字以上255文字以下で入力してください",
            ));
        }
        Ok(DateSchedule {
            id: DateScheduleId::generate(),
            tenant_id,
            title,
            public_token: PublicToken::generate(),
            status: ScheduleStatus::Open,
            deadline,
            decided_candidate_id: None,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    pub fn can_respond(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ScheduleStatus::Open {
            return Err(sentinel::collection_closed());
        }
        if let Some(deadline) = self.deadline {
            if now > deadline {
                return Err(sentinel::deadline_passed());
            }
        }
        Ok(())
    }

    /// `open -> closed` only; closing twice is an error, not a no-op
    /// (spec §4.6, mirrors `AttendanceCollection::close`).
    pub fn close(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != ScheduleStatus::Open {
            return Err(sentinel::already_closed());
        }
        self.status = ScheduleStatus::Closed;
        self.updated_at = now;
        Ok(())
    }

    /// `closed -> decided`. The chosen candidate must belong to this
    /// schedule; callers are expected to have already verified that via
    /// the candidate-date repository (spec §4.6 invariant: "a decided
    /// candidate must belong to the schedule it's decided on").
    pub fn decide(
        &mut self,
        candidate_id: CandidateDateId,
        candidate_belongs_to_schedule: bool,
        now: DateTime<Utc>,
    ) -> AppResult<()> {
        if self.status != ScheduleStatus::Closed {
            return Err(AppError::invariant(
                "候補日を決定する前に募集を締め切ってください",
            ));
        }
        if !candidate_belongs_to_schedule {
            return Err(AppError::invariant(
                "決定する候補日はこの募集に属している必要があります",
            ));
        }
        self.decided_candidate_id = Some(candidate_id);
        self.status = ScheduleStatus::Decided;
        self.updated_at = now;
        Ok(())
    }
}

impl HasTimestamps for DateSchedule {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
impl SoftDeletable for DateSchedule {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Ordered by `display_order` (spec §3).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct CandidateDate {
    pub id: CandidateDateId,
    pub schedule_id: DateScheduleId,
    pub date: NaiveDate,
    pub display_order: u32,
}

impl CandidateDate {
    pub fn new(schedule_id: DateScheduleId, date: NaiveDate, display_order: u32) -> Self {
        CandidateDate {
            id: CandidateDateId::generate(),
            schedule_id,
            date,
            display_order,
        }
    }
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Availability {
    Available,
    Unavailable,
    Maybe,
}

/// Upserted by `(schedule, member, candidate)` (spec §4.6).
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ScheduleResponse {
    pub id: ScheduleResponseId,
    pub schedule_id: DateScheduleId,
    pub member_id: MemberId,
    pub candidate_id: CandidateDateId,
    pub availability: Availability,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn lifecycle_close_then_decide() {
        let mut schedule = DateSchedule::new(TenantId::generate(), "Offsite", None, now()).unwrap();
        let candidate = CandidateDate::new(
            schedule.id.clone(),
            NaiveDate::from_ymd_opt(2025, 2, 1).unwrap(),
            0,
        );

        assert!(schedule
            .decide(candidate.id.clone(), true, now())
            .is_err());

        schedule.close(now()).unwrap();
        assert_eq!(schedule.status, ScheduleStatus::Closed);
        assert!(schedule.close(now()).is_err());

        schedule.decide(candidate.id.clone(), true, now()).unwrap();
        assert_eq!(schedule.status, ScheduleStatus::Decided);
        assert_eq!(schedule.decided_candidate_id, Some(candidate.id));
    }

    #[test]
    fn decide_rejects_foreign_candidate() {
        let mut schedule = DateSchedule::new(TenantId::generate(), "Offsite", None, now()).unwrap();
        schedule.close(now()).unwrap();
        let foreign = CandidateDateId::generate();
        let err = schedule.decide(foreign, false, now()).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));
    }
}
