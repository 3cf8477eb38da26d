//! Attendance-collection aggregate (spec §3, §4.5, C5): a public-token
//! addressed poll asking members whether they'll attend specific target
//! dates.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::domain::{HasTimestamps, SoftDeletable};
use crate::error::{sentinel, AppError, AppResult};
use crate::id::{
    AttendanceCollectionId, AttendanceResponseId, MemberId, PublicToken, TargetDateId, TenantId,
};

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetType {
    Event,
    BusinessDay,
}

#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CollectionStatus {
    Open,
    Closed,
}

const MAX_TITLE_LEN: usize = 255;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttendanceCollection {
    pub id: AttendanceCollectionId,
    pub tenant_id: TenantId,
    pub title: String,
    pub target_type: TargetType,
    pub target_id: String,
    pub public_token: PublicToken,
    pub status: CollectionStatus,
    pub deadline: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub deleted_at: Option<DateTime<Utc>>,
}

impl AttendanceCollection {
    pub fn new(
        tenant_id: TenantId,
        title: impl Into<String>,
        target_type: TargetType,
        target_id: impl Into<String>,
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
        Ok(AttendanceCollection {
            id: AttendanceCollectionId::generate(),
            tenant_id,
            title,
            target_type,
            target_id: target_id.into(),
            public_token: PublicToken::generate(),
            status: CollectionStatus::Open,
            deadline,
            created_at: now,
            updated_at: now,
            deleted_at: None,
        })
    }

    /// `open` and (`deadline` nil or `now <= deadline`) (spec §4.5).
    pub fn can_respond(&self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status != CollectionStatus::Open {
            return Err(sentinel::collection_closed());
        }
        if let Some(deadline) = self.deadline {
            if now > deadline {
                return Err(sentinel::deadline_passed());
            }
        }
        Ok(())
    }

    /// Idempotent in state: calling on an already-closed collection errors,
    /// but the state stays closed (spec §4.5, §8 invariant 8).
    pub fn close(&mut self, now: DateTime<Utc>) -> AppResult<()> {
        if self.status == CollectionStatus::Closed {
            return Err(sentinel::already_closed());
        }
        self.status = CollectionStatus::Closed;
        self.updated_at = now;
        Ok(())
    }
}

impl HasTimestamps for AttendanceCollection {
    fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }
    fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }
}
impl SoftDeletable for AttendanceCollection {
    fn deleted_at(&self) -> Option<DateTime<Utc>> {
        self.deleted_at
    }
}

/// Per-collection ordered candidate date (spec §3).
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct TargetDate {
    pub id: TargetDateId,
    pub collection_id: AttendanceCollectionId,
    pub date: NaiveDate,
    pub display_order: u32,
}

impl TargetDate {
    pub fn new(collection_id: AttendanceCollectionId, date: NaiveDate, display_order: u32) -> Self {
        TargetDate {
            id: TargetDateId::generate(),
            collection_id,
            date,
            display_order,
        }
    }
}

/// The decision of `AttendanceCollection::diff_target_dates`: which
/// `target_date_id`s to update in place (preserving responses), which rows
/// are brand new, and which existing ids to delete (cascading responses).
#[derive(Debug, Default)]
pub struct TargetDateDiff {
    pub to_update: Vec<TargetDate>,
    pub to_insert: Vec<TargetDate>,
    pub to_delete_ids: Vec<TargetDateId>,
}

/// Set-difference over stable child ids (spec §4.5, §9): the naive
/// "delete all, re-insert" shortcut would destroy member responses attached
/// to unchanged dates, so callers must route through this instead of
/// `save_target_dates` (full wipe) whenever responses must survive.
pub fn diff_target_dates(existing: &[TargetDate], new: &[TargetDate]) -> TargetDateDiff {
    let existing_ids: HashSet<&TargetDateId> = existing.iter().map(|t| &t.id).collect();
    let new_ids: HashSet<&TargetDateId> = new.iter().map(|t| &t.id).collect();

    let mut diff = TargetDateDiff::default();
    for item in new {
        if existing_ids.contains(&item.id) {
            diff.to_update.push(item.clone());
        } else {
            diff.to_insert.push(item.clone());
        }
    }
    for item in existing {
        if !new_ids.contains(&item.id) {
            diff.to_delete_ids.push(item.id.clone());
        }
    }
    diff
}

/// Response value for an attendance poll. Not explicitly enumerated in the
/// distilled spec; resolved here the same way `ScheduleResponse::availability`
/// is enumerated for date-schedules (see DESIGN.md Open Question).
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttendanceStatus {
    Attending,
    NotAttending,
    Undecided,
}

/// Upserted by `(collection, member, target_date)` (spec §4.5); the domain
/// does not hold these in memory — repositories own persistence.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AttendanceResponse {
    pub id: AttendanceResponseId,
    pub collection_id: AttendanceCollectionId,
    pub member_id: MemberId,
    pub target_date_id: TargetDateId,
    pub status: AttendanceStatus,
    pub updated_at: DateTime<Utc>,
}

/// Unordered `(collection_id, subject_id)` ACL-gating pairs (spec §4.5).
#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CollectionGroupAssignment {
    pub collection_id: AttendanceCollectionId,
    pub group_id: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
pub struct CollectionRoleAssignment {
    pub collection_id: AttendanceCollectionId,
    pub role_id: String,
}

/// Visible iff no gating assignments exist for the collection, or the
/// subject's groups/roles intersect the gating sets.
pub fn is_visible_to(
    group_assignments: &[CollectionGroupAssignment],
    role_assignments: &[CollectionRoleAssignment],
    subject_group_ids: &[String],
    subject_role_ids: &[String],
) -> bool {
    if group_assignments.is_empty() && role_assignments.is_empty() {
        return true;
    }
    let group_match = group_assignments
        .iter()
        .any(|a| subject_group_ids.iter().any(|g| *g == a.group_id));
    let role_match = role_assignments
        .iter()
        .any(|a| subject_role_ids.iter().any(|r| *r == a.role_id));
    group_match || role_match
}

#[cfg(test)]
mod tests {
    use super::*;

    fn now() -> DateTime<Utc> {
        "2025-01-15T00:00:00Z".parse().unwrap()
    }

    #[test]
    fn lifecycle_deadline_and_close_idempotence() {
        let mut collection = AttendanceCollection::new(
            TenantId::generate(),
            "Weekend Event",
            TargetType::Event,
            "evt-1",
            Some(now() + chrono::Duration::hours(1)),
            now(),
        )
        .unwrap();

        assert!(collection.can_respond(now()).is_ok());
        let err = collection
            .can_respond(now() + chrono::Duration::hours(2))
            .unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));

        collection.close(now()).unwrap();
        assert_eq!(collection.status, CollectionStatus::Closed);
        let err = collection.close(now()).unwrap_err();
        assert!(matches!(err, AppError::InvariantViolation { .. }));
        assert_eq!(collection.status, CollectionStatus::Closed);
    }

    #[test]
    fn title_length_boundaries() {
        let tenant = TenantId::generate();
        assert!(AttendanceCollection::new(
            tenant.clone(),
            "x".repeat(255),
            TargetType::Event,
            "evt-1",
            None,
            now()
        )
        .is_ok());
        assert!(AttendanceCollection::new(
            tenant,
            "x".repeat(256),
            TargetType::Event,
            "evt-1",
            None,
            now()
        )
        .is_err());
    }

    #[test]
    fn diff_preserves_unchanged_ids() {
        let collection_id = AttendanceCollectionId::generate();
        let keep = TargetDate::new(
            collection_id.clone(),
            NaiveDate::from_ymd_opt(2025, 1, 15).unwrap(),
            0,
        );
        let remove = TargetDate::new(
            collection_id.clone(),
            NaiveDate::from_ymd_opt(2025, 1, 16).unwrap(),
            1,
        );
        let existing = vec![keep.clone(), remove.clone()];

        let mut keep_updated = keep.clone();
        keep_updated.display_order = 5;
        let add = TargetDate::new(
            collection_id,
            NaiveDate::from_ymd_opt(2025, 1, 17).unwrap(),
            2,
        );
        let new_list = vec![keep_updated.clone(), add.clone()];

        let diff = diff_target_dates(&existing, &new_list);
        assert_eq!(diff.to_update, vec![keep_updated]);
        assert_eq!(diff.to_insert, vec![add]);
        assert_eq!(diff.to_delete_ids, vec![remove.id]);
    }
}
